//! Baseline seed data: 3 users, 6 products, 4 orders cross-referencing them.

use chrono::{DateTime, TimeZone, Utc};
use mongodb::bson::oid::ObjectId;

use crate::models::{Address, Category, Order, OrderItem, OrderStatus, Product, StoreError, User};

fn day(year: i32, month: u32, date: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, date, 0, 0, 0)
        .single()
        .expect("fixture dates are valid")
}

fn city(name: &str) -> Option<Address> {
    Some(Address {
        city: name.to_string(),
    })
}

pub fn baseline_users() -> Result<Vec<User>, StoreError> {
    Ok(vec![
        User::new(
            "ivan.petrov@example.com",
            "Ivan Petrov",
            Some("+7 900 123-45-67".to_string()),
            city("Moscow"),
            day(2024, 1, 15),
        )?,
        User::new(
            "maria.ivanova@example.com",
            "Maria Ivanova",
            Some("+7 900 234-56-78".to_string()),
            city("Saint Petersburg"),
            day(2024, 2, 20),
        )?,
        User::new(
            "alex.smirnov@example.com",
            "Alex Smirnov",
            Some("+7 900 345-67-89".to_string()),
            city("Yekaterinburg"),
            day(2024, 3, 10),
        )?,
    ])
}

pub fn baseline_products() -> Result<Vec<Product>, StoreError> {
    let rows: [(&str, &str, f64, Category, i32, f64, &[&str], DateTime<Utc>); 6] = [
        (
            "ASUS ROG Laptop",
            "Gaming laptop",
            89999.0,
            Category::Electronics,
            15,
            4.7,
            &["gaming", "laptop"],
            day(2024, 1, 1),
        ),
        (
            "Samsung S24 Smartphone",
            "2024 flagship",
            79999.0,
            Category::Electronics,
            30,
            4.8,
            &["smartphone"],
            day(2024, 2, 1),
        ),
        (
            "Levi's 501 Jeans",
            "A classic",
            5999.0,
            Category::Clothing,
            50,
            4.5,
            &["jeans"],
            day(2024, 1, 15),
        ),
        (
            "The Master and Margarita",
            "Bulgakov",
            499.0,
            Category::Books,
            100,
            4.9,
            &["book"],
            day(2024, 1, 10),
        ),
        (
            "DeLonghi Coffee Machine",
            "Fully automatic",
            35999.0,
            Category::Home,
            20,
            4.6,
            &["coffee"],
            day(2024, 2, 15),
        ),
        (
            "Nike Air Sneakers",
            "Running shoes",
            8999.0,
            Category::Sports,
            40,
            4.7,
            &["shoes"],
            day(2024, 3, 1),
        ),
    ];

    rows.into_iter()
        .map(|(name, desc, price, category, stock, rating, tags, created)| {
            Product::new(
                name,
                Some(desc.to_string()),
                price,
                category,
                stock,
                Some(rating),
                Some(tags.iter().map(|t| t.to_string()).collect()),
                created,
            )
        })
        .collect()
}

/// Baseline orders reference seeded users and products by position, so at
/// least 3 user ids and 6 product ids must be known.
pub fn baseline_orders(
    user_ids: &[ObjectId],
    product_ids: &[ObjectId],
) -> Result<Vec<Order>, StoreError> {
    if user_ids.len() < 3 {
        return Err(StoreError::DependencyMissing(format!(
            "order fixtures need 3 user ids, have {}",
            user_ids.len()
        )));
    }
    if product_ids.len() < 6 {
        return Err(StoreError::DependencyMissing(format!(
            "order fixtures need 6 product ids, have {}",
            product_ids.len()
        )));
    }

    let rows = [
        (user_ids[0], product_ids[0], 1, 89999.0, 89999.0, OrderStatus::Delivered, day(2024, 10, 15)),
        (user_ids[1], product_ids[1], 1, 79999.0, 79999.0, OrderStatus::Shipped, day(2024, 11, 10)),
        (user_ids[2], product_ids[4], 1, 35999.0, 35999.0, OrderStatus::Processing, day(2024, 11, 13)),
        (user_ids[0], product_ids[3], 5, 499.0, 2495.0, OrderStatus::Pending, day(2024, 11, 14)),
    ];

    rows.into_iter()
        .map(|(user_id, product_id, quantity, price, total, status, date)| {
            Order::new(
                user_id,
                vec![OrderItem {
                    product_id,
                    quantity,
                    price,
                }],
                total,
                status,
                date,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<ObjectId> {
        (0..n).map(|_| ObjectId::new()).collect()
    }

    #[test]
    fn baseline_counts() {
        assert_eq!(baseline_users().unwrap().len(), 3);
        assert_eq!(baseline_products().unwrap().len(), 6);
        assert_eq!(
            baseline_orders(&ids(3), &ids(6)).unwrap().len(),
            4
        );
    }

    #[test]
    fn every_product_satisfies_the_declared_constraints() {
        for product in baseline_products().unwrap() {
            assert!(product.price >= 0.0);
            assert!(product.stock >= 0);
            assert!(Category::ALL.contains(&product.category));
            let rating = product.rating.unwrap();
            assert!((0.0..=5.0).contains(&rating));
        }
    }

    #[test]
    fn user_emails_are_distinct() {
        let users = baseline_users().unwrap();
        let mut emails: Vec<_> = users.iter().map(|u| u.email.as_str()).collect();
        emails.sort();
        emails.dedup();
        assert_eq!(emails.len(), users.len());
    }

    #[test]
    fn first_order_is_the_delivered_laptop_purchase() {
        let user_ids = ids(3);
        let product_ids = ids(6);
        let orders = baseline_orders(&user_ids, &product_ids).unwrap();

        let first = &orders[0];
        assert_eq!(first.user_id, user_ids[0]);
        assert_eq!(first.items.len(), 1);
        assert_eq!(first.items[0].product_id, product_ids[0]);
        assert_eq!(first.items[0].quantity, 1);
        assert_eq!(first.items[0].price, 89999.0);
        assert_eq!(first.total_amount, 89999.0);
        assert_eq!(first.status, OrderStatus::Delivered);
    }

    #[test]
    fn order_fixtures_fail_without_reference_ids() {
        assert!(matches!(
            baseline_orders(&[], &ids(6)),
            Err(StoreError::DependencyMissing(_))
        ));
        assert!(matches!(
            baseline_orders(&ids(3), &ids(5)),
            Err(StoreError::DependencyMissing(_))
        ));
    }
}
