use chrono::{DateTime, Utc};
use mongodb::bson::{self, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::models::{Address, StoreError};

/// Order lifecycle states. Transitions are unconstrained; the store records
/// whatever status the caller sets.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// The enum values as stored, for the `$jsonSchema` validator.
    pub fn names() -> Vec<&'static str> {
        vec!["pending", "processing", "shipped", "delivered", "cancelled"]
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Processing => write!(f, "processing"),
            OrderStatus::Shipped => write!(f, "shipped"),
            OrderStatus::Delivered => write!(f, "delivered"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One order line. `price` is the unit price at purchase time.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OrderItem {
    pub product_id: ObjectId,
    pub quantity: i32,
    pub price: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Order {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub status: OrderStatus,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub order_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::optional_chrono_datetime_as_bson_datetime"
    )]
    pub delivery_date: Option<DateTime<Utc>>,
}

impl Order {
    /// Builds an order. `total_amount` is taken as given rather than derived
    /// from the items; callers that want the two reconciled can compare
    /// against [`Order::items_total`]. Referenced ids are not checked for
    /// existence (denormalized references, no referential integrity).
    pub fn new(
        user_id: ObjectId,
        items: Vec<OrderItem>,
        total_amount: f64,
        status: OrderStatus,
        order_date: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        if items.is_empty() {
            return Err(StoreError::Validation(
                "order must contain at least one item".to_string(),
            ));
        }
        if !total_amount.is_finite() || total_amount < 0.0 {
            return Err(StoreError::Validation(format!(
                "order total must be >= 0, got {}",
                total_amount
            )));
        }

        Ok(Order {
            id: None,
            user_id,
            items,
            total_amount,
            status,
            order_date,
            shipping_address: None,
            delivery_date: None,
        })
    }

    /// Sum of line totals (quantity times unit price).
    pub fn items_total(&self) -> f64 {
        self.items
            .iter()
            .map(|item| f64::from(item.quantity) * item.price)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_item(price: f64, quantity: i32) -> Vec<OrderItem> {
        vec![OrderItem {
            product_id: ObjectId::new(),
            quantity,
            price,
        }]
    }

    #[test]
    fn rejects_empty_items() {
        let err = Order::new(
            ObjectId::new(),
            Vec::new(),
            0.0,
            OrderStatus::Pending,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn rejects_negative_total() {
        assert!(Order::new(
            ObjectId::new(),
            one_item(10.0, 1),
            -5.0,
            OrderStatus::Pending,
            Utc::now(),
        )
        .is_err());
    }

    #[test]
    fn total_amount_is_not_reconciled_with_items() {
        // The supplied total is stored verbatim even when it disagrees with
        // the line sum; items_total exposes the derived value.
        let order = Order::new(
            ObjectId::new(),
            one_item(499.0, 5),
            2495.0,
            OrderStatus::Pending,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(order.total_amount, 2495.0);
        assert_eq!(order.items_total(), 2495.0);

        let mismatched = Order::new(
            ObjectId::new(),
            one_item(499.0, 5),
            100.0,
            OrderStatus::Pending,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(mismatched.total_amount, 100.0);
    }

    #[test]
    fn delivery_date_round_trips_as_bson_date() {
        use chrono::TimeZone;

        let mut order = Order::new(
            ObjectId::new(),
            one_item(10.0, 1),
            10.0,
            OrderStatus::Delivered,
            Utc::now(),
        )
        .unwrap();
        order.delivery_date = Some(Utc.with_ymd_and_hms(2024, 3, 18, 9, 0, 0).unwrap());

        let doc = bson::to_document(&order).unwrap();
        assert!(doc.get_datetime("delivery_date").is_ok());

        let back: Order = bson::from_document(doc).unwrap();
        assert_eq!(back.delivery_date, order.delivery_date);
    }

    #[test]
    fn status_serializes_lowercase() {
        let order = Order::new(
            ObjectId::new(),
            one_item(89999.0, 1),
            89999.0,
            OrderStatus::Delivered,
            Utc::now(),
        )
        .unwrap();
        let doc = bson::to_document(&order).unwrap();
        assert_eq!(doc.get_str("status").unwrap(), "delivered");
        assert!(OrderStatus::names().contains(&doc.get_str("status").unwrap()));
    }
}
