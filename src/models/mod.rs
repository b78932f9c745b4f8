mod error;
mod order;
mod product;
mod user;

pub use error::StoreError;
pub use order::{Order, OrderItem, OrderStatus};
pub use product::{Category, Product};
pub use user::{Address, User};

/// `Option` wrapper around the driver's chrono serde helper, for timestamps
/// that are unset until an update fills them in.
pub(crate) mod optional_chrono_datetime_as_bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.map(bson::DateTime::from_chrono).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(Option::<bson::DateTime>::deserialize(deserializer)?.map(bson::DateTime::to_chrono))
    }
}
