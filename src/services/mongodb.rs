use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Bson};
use mongodb::options::{ClientOptions, FindOptions, ServerApi, ServerApiVersion};
use mongodb::{Client, Collection, Database};
use serde::Deserialize;

use crate::config::Settings;
use crate::models::{Category, Order, OrderStatus, Product, StoreError, User};

pub const USERS: &str = "users";
pub const PRODUCTS: &str = "products";
pub const ORDERS: &str = "orders";

/// Typed handle on the shop database. Constructed once at process start and
/// passed by reference into every operation; dropping it releases the
/// connection on all exit paths.
#[derive(Clone)]
pub struct MongoDBService {
    db: Database,
    users: Collection<User>,
    products: Collection<Product>,
    orders: Collection<Order>,
}

/// Subset of the `collStats` command output shown by the stats view.
#[derive(Debug, Clone)]
pub struct CollectionStats {
    pub name: String,
    pub count: i64,
    pub size_bytes: i64,
    pub index_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct ProductPriceRow {
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Deserialize)]
pub struct UserSpendRow {
    #[serde(rename = "_id")]
    pub user_id: ObjectId,
    pub total_spent: f64,
    pub order_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct OrderWithUserRow {
    pub total_amount: f64,
    pub status: OrderStatus,
    pub user_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryAvgRow {
    #[serde(rename = "_id")]
    pub category: Category,
    pub avg_price: f64,
}

impl MongoDBService {
    /// Connects and verifies the connection with a ping. Failures here are
    /// fatal `Connection` errors; nothing is retried.
    pub async fn init(settings: &Settings) -> Result<Self, StoreError> {
        let mut client_options = ClientOptions::parse(&settings.uri)
            .await
            .map_err(StoreError::Connection)?;

        let server_api = ServerApi::builder()
            .version(ServerApiVersion::V1)
            .strict(true)
            .deprecation_errors(true)
            .build();
        client_options.server_api = Some(server_api);

        client_options.connect_timeout = Some(std::time::Duration::from_secs(10));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options).map_err(StoreError::Connection)?;

        // Test connection
        client
            .database("admin")
            .run_command(doc! {"ping": 1}, None)
            .await
            .map_err(StoreError::Connection)?;

        log::info!("Successfully connected to MongoDB at {}", settings.uri);

        let db = client.database(&settings.database);
        let users = db.collection(USERS);
        let products = db.collection(PRODUCTS);
        let orders = db.collection(ORDERS);

        Ok(Self {
            db,
            users,
            products,
            orders,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // ---- users ----

    pub async fn insert_user(&self, user: &User) -> Result<ObjectId, StoreError> {
        let result = self.users.insert_one(user, None).await?;
        inserted_object_id(result.inserted_id)
    }

    pub async fn get_user(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        Ok(self.users.find_one(doc! { "_id": id }, None).await?)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.find_one(doc! { "email": email }, None).await?)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.find(None, None).await?.try_collect().await?)
    }

    pub async fn find_users_by_city(&self, city: &str) -> Result<Vec<User>, StoreError> {
        Ok(self
            .users
            .find(doc! { "address.city": city }, None)
            .await?
            .try_collect()
            .await?)
    }

    pub async fn touch_last_login(&self, email: &str) -> Result<u64, StoreError> {
        let result = self
            .users
            .update_one(
                doc! { "email": email },
                doc! { "$set": { "last_login": bson::DateTime::now() } },
                None,
            )
            .await?;
        Ok(result.modified_count)
    }

    pub async fn delete_user_by_email(&self, email: &str) -> Result<u64, StoreError> {
        let result = self.users.delete_one(doc! { "email": email }, None).await?;
        Ok(result.deleted_count)
    }

    // ---- products ----

    pub async fn insert_product(&self, product: &Product) -> Result<ObjectId, StoreError> {
        let result = self.products.insert_one(product, None).await?;
        inserted_object_id(result.inserted_id)
    }

    pub async fn insert_products(&self, batch: &[Product]) -> Result<usize, StoreError> {
        if batch.is_empty() {
            return Ok(0);
        }
        let result = self.products.insert_many(batch, None).await?;
        Ok(result.inserted_ids.len())
    }

    pub async fn get_product(&self, id: &ObjectId) -> Result<Option<Product>, StoreError> {
        Ok(self.products.find_one(doc! { "_id": id }, None).await?)
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.products.find(None, None).await?.try_collect().await?)
    }

    /// Products cheaper than `max_price`, cheapest first.
    pub async fn find_products_under(&self, max_price: f64) -> Result<Vec<Product>, StoreError> {
        let options = FindOptions::builder().sort(doc! { "price": 1 }).build();
        Ok(self
            .products
            .find(doc! { "price": { "$lt": max_price } }, options)
            .await?
            .try_collect()
            .await?)
    }

    pub async fn find_products_over(
        &self,
        min_price: f64,
        limit: i64,
    ) -> Result<Vec<Product>, StoreError> {
        let options = FindOptions::builder().limit(limit).build();
        Ok(self
            .products
            .find(doc! { "price": { "$gt": min_price } }, options)
            .await?
            .try_collect()
            .await?)
    }

    pub async fn find_products_by_category_min_rating(
        &self,
        category: Category,
        min_rating: f64,
    ) -> Result<Vec<Product>, StoreError> {
        let filter = doc! {
            "category": category.to_string(),
            "rating": { "$gt": min_rating }
        };
        Ok(self
            .products
            .find(filter, None)
            .await?
            .try_collect()
            .await?)
    }

    pub async fn set_product_price(&self, id: &ObjectId, price: f64) -> Result<bool, StoreError> {
        let result = self
            .products
            .update_one(doc! { "_id": id }, doc! { "$set": { "price": price } }, None)
            .await?;
        Ok(result.modified_count > 0)
    }

    /// Multiplies the price of every product in `category` by `factor`.
    pub async fn raise_category_prices(
        &self,
        category: Category,
        factor: f64,
    ) -> Result<u64, StoreError> {
        let result = self
            .products
            .update_many(
                doc! { "category": category.to_string() },
                doc! { "$mul": { "price": factor } },
                None,
            )
            .await?;
        Ok(result.modified_count)
    }

    pub async fn delete_product(&self, id: &ObjectId) -> Result<u64, StoreError> {
        let result = self.products.delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count)
    }

    // ---- orders ----

    pub async fn insert_orders(&self, batch: &[Order]) -> Result<usize, StoreError> {
        if batch.is_empty() {
            return Ok(0);
        }
        let result = self.orders.insert_many(batch, None).await?;
        Ok(result.inserted_ids.len())
    }

    pub async fn get_order(&self, id: &ObjectId) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.find_one(doc! { "_id": id }, None).await?)
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self.orders.find(None, None).await?.try_collect().await?)
    }

    /// Moves one order from `from` to `to`. Status transitions are not
    /// constrained by the store.
    pub async fn advance_one_order(
        &self,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, StoreError> {
        let result = self
            .orders
            .update_one(
                doc! { "status": from.to_string() },
                doc! { "$set": { "status": to.to_string() } },
                None,
            )
            .await?;
        Ok(result.modified_count > 0)
    }

    pub async fn set_order_status(
        &self,
        id: &ObjectId,
        status: OrderStatus,
    ) -> Result<bool, StoreError> {
        let result = self
            .orders
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "status": status.to_string() } },
                None,
            )
            .await?;
        Ok(result.modified_count > 0)
    }

    // ---- aggregations ----

    /// Top `limit` products by price, most expensive first.
    pub async fn top_expensive_products(
        &self,
        limit: i64,
    ) -> Result<Vec<ProductPriceRow>, StoreError> {
        let pipeline = vec![
            doc! { "$sort": { "price": -1 } },
            doc! { "$limit": limit },
            doc! { "$project": { "name": 1, "price": 1 } },
        ];
        Ok(self
            .products
            .aggregate(pipeline, None)
            .await?
            .with_type::<ProductPriceRow>()
            .try_collect()
            .await?)
    }

    /// Total spend and order count per user, biggest spender first.
    pub async fn spend_by_user(&self) -> Result<Vec<UserSpendRow>, StoreError> {
        let pipeline = vec![
            doc! { "$group": {
                "_id": "$user_id",
                "total_spent": { "$sum": "$total_amount" },
                "order_count": { "$sum": 1 }
            }},
            doc! { "$sort": { "total_spent": -1 } },
        ];
        Ok(self
            .orders
            .aggregate(pipeline, None)
            .await?
            .with_type::<UserSpendRow>()
            .try_collect()
            .await?)
    }

    /// Orders joined with the referencing user's name via `$lookup`.
    pub async fn orders_with_user_names(
        &self,
        limit: i64,
    ) -> Result<Vec<OrderWithUserRow>, StoreError> {
        let pipeline = vec![
            doc! { "$lookup": {
                "from": USERS,
                "localField": "user_id",
                "foreignField": "_id",
                "as": "user_info"
            }},
            doc! { "$unwind": "$user_info" },
            doc! { "$project": {
                "total_amount": 1,
                "status": 1,
                "user_name": "$user_info.name"
            }},
            doc! { "$limit": limit },
        ];
        Ok(self
            .orders
            .aggregate(pipeline, None)
            .await?
            .with_type::<OrderWithUserRow>()
            .try_collect()
            .await?)
    }

    pub async fn average_price_per_category(&self) -> Result<Vec<CategoryAvgRow>, StoreError> {
        let pipeline = vec![doc! { "$group": {
            "_id": "$category",
            "avg_price": { "$avg": "$price" }
        }}];
        Ok(self
            .products
            .aggregate(pipeline, None)
            .await?
            .with_type::<CategoryAvgRow>()
            .try_collect()
            .await?)
    }

    // ---- stats ----

    pub async fn collection_stats(&self, name: &str) -> Result<CollectionStats, StoreError> {
        let stats = self.db.run_command(doc! { "collStats": name }, None).await?;
        Ok(CollectionStats {
            name: name.to_string(),
            count: bson_as_i64(stats.get("count")),
            size_bytes: bson_as_i64(stats.get("size")),
            index_count: bson_as_i64(stats.get("nindexes")),
        })
    }

    pub async fn all_collection_stats(&self) -> Result<Vec<CollectionStats>, StoreError> {
        let mut out = Vec::with_capacity(3);
        for name in [USERS, PRODUCTS, ORDERS] {
            out.push(self.collection_stats(name).await?);
        }
        Ok(out)
    }
}

// Inserting with id: None yields a driver-generated ObjectId; anything else
// in the acknowledgement is a protocol-level surprise worth surfacing.
fn inserted_object_id(inserted_id: Bson) -> Result<ObjectId, StoreError> {
    inserted_id.as_object_id().ok_or_else(|| {
        StoreError::UnexpectedReply(format!("insert acknowledged with non-ObjectId _id: {}", inserted_id))
    })
}

// collStats reports numerics as int32, int64 or double depending on server
// version and value size.
fn bson_as_i64(value: Option<&Bson>) -> i64 {
    match value {
        Some(Bson::Int32(v)) => i64::from(*v),
        Some(Bson::Int64(v)) => *v,
        Some(Bson::Double(v)) => *v as i64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_object_id_maps_acknowledgement() {
        let id = ObjectId::new();
        assert_eq!(inserted_object_id(Bson::ObjectId(id)).unwrap(), id);

        let err = inserted_object_id(Bson::String("custom-key".to_string())).unwrap_err();
        assert!(matches!(err, StoreError::UnexpectedReply(_)));
    }

    #[test]
    fn bson_as_i64_covers_server_numeric_types() {
        assert_eq!(bson_as_i64(Some(&Bson::Int32(7))), 7);
        assert_eq!(bson_as_i64(Some(&Bson::Int64(1 << 40))), 1 << 40);
        assert_eq!(bson_as_i64(Some(&Bson::Double(12.0))), 12);
        assert_eq!(bson_as_i64(None), 0);
    }

    #[test]
    fn aggregation_rows_deserialize_from_documents() {
        let row: UserSpendRow = bson::from_document(doc! {
            "_id": ObjectId::new(),
            "total_spent": 89999.0,
            "order_count": 2_i32,
        })
        .unwrap();
        assert_eq!(row.order_count, 2);

        let row: CategoryAvgRow = bson::from_document(doc! {
            "_id": "Books",
            "avg_price": 499.0,
        })
        .unwrap();
        assert_eq!(row.category, Category::Books);

        let row: OrderWithUserRow = bson::from_document(doc! {
            "total_amount": 2495.0,
            "status": "pending",
            "user_name": "Ivan Petrov",
        })
        .unwrap();
        assert_eq!(row.status, OrderStatus::Pending);
    }
}
