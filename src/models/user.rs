use chrono::{DateTime, Utc};
use mongodb::bson::{self, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::models::StoreError;

/// Postal address. Only the city is queried (indexed as `address.city`).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Address {
    pub city: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::optional_chrono_datetime_as_bson_datetime"
    )]
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Builds a user, enforcing the collection's schema constraints at the
    /// application boundary so behavior does not depend on server-side
    /// validator support.
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        phone: Option<String>,
        address: Option<Address>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        let email = email.into();
        let name = name.into();

        if email.trim().is_empty() || !email.contains('@') {
            return Err(StoreError::Validation(format!(
                "invalid email address: {:?}",
                email
            )));
        }
        if name.chars().count() < 2 {
            return Err(StoreError::Validation(
                "user name must be at least 2 characters".to_string(),
            ));
        }

        Ok(User {
            id: None,
            email,
            name,
            phone,
            address,
            created_at,
            last_login: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_minimal_user() {
        let user = User::new("a@b.com", "Al", None, None, Utc::now()).unwrap();
        assert_eq!(user.email, "a@b.com");
        assert!(user.id.is_none());
        assert!(user.last_login.is_none());
    }

    #[test]
    fn rejects_one_character_name() {
        let err = User::new("a@b.com", "A", None, None, Utc::now()).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn rejects_malformed_email() {
        assert!(User::new("not-an-email", "Alice", None, None, Utc::now()).is_err());
        assert!(User::new("", "Alice", None, None, Utc::now()).is_err());
    }

    #[test]
    fn last_login_round_trips_as_bson_date() {
        use chrono::TimeZone;

        let mut user = User::new("a@b.com", "Alice", None, None, Utc::now()).unwrap();
        user.last_login = Some(Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap());

        let doc = bson::to_document(&user).unwrap();
        assert!(doc.get_datetime("last_login").is_ok());

        let back: User = bson::from_document(doc).unwrap();
        assert_eq!(back.last_login, user.last_login);
    }

    #[test]
    fn optional_fields_are_omitted_from_bson() {
        let user = User::new("a@b.com", "Alice", None, None, Utc::now()).unwrap();
        let doc = bson::to_document(&user).unwrap();
        assert!(!doc.contains_key("_id"));
        assert!(!doc.contains_key("phone"));
        assert!(!doc.contains_key("last_login"));
        assert!(doc.get_datetime("created_at").is_ok());
    }
}
