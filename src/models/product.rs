use chrono::{DateTime, Utc};
use mongodb::bson::{self, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::models::StoreError;

/// The fixed product categories accepted by the `products` validator.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Electronics,
    Clothing,
    Books,
    Home,
    Sports,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Electronics,
        Category::Clothing,
        Category::Books,
        Category::Home,
        Category::Sports,
    ];

    /// The enum values as stored, for the `$jsonSchema` validator.
    pub fn names() -> Vec<&'static str> {
        vec!["Electronics", "Clothing", "Books", "Home", "Sports"]
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Electronics => write!(f, "Electronics"),
            Category::Clothing => write!(f, "Clothing"),
            Category::Books => write!(f, "Books"),
            Category::Home => write!(f, "Home"),
            Category::Sports => write!(f, "Sports"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Product {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    pub category: Category,
    pub stock: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        price: f64,
        category: Category,
        stock: i32,
        rating: Option<f64>,
        tags: Option<Vec<String>>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        let name = name.into();

        if name.trim().is_empty() {
            return Err(StoreError::Validation(
                "product name cannot be empty".to_string(),
            ));
        }
        if !price.is_finite() || price < 0.0 {
            return Err(StoreError::Validation(format!(
                "product price must be >= 0, got {}",
                price
            )));
        }
        if stock < 0 {
            return Err(StoreError::Validation(format!(
                "product stock must be >= 0, got {}",
                stock
            )));
        }
        if let Some(r) = rating {
            if !(0.0..=5.0).contains(&r) {
                return Err(StoreError::Validation(format!(
                    "product rating must be within 0..=5, got {}",
                    r
                )));
            }
        }

        Ok(Product {
            id: None,
            name,
            description,
            price,
            category,
            stock,
            rating,
            tags,
            created_at,
        })
    }
}
