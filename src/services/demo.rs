//! Synthetic demo-data generation. Pure: no I/O, all randomness comes from
//! the caller-supplied `Rng`, so a seeded `StdRng` makes batches
//! reproducible.

use chrono::{Duration, Utc};
use mongodb::bson::oid::ObjectId;
use rand::Rng;

use crate::models::{Category, Order, OrderItem, OrderStatus, Product, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoKind {
    Product,
    Order,
}

/// Identifier sets that generated documents may reference.
#[derive(Debug, Default, Clone)]
pub struct KnownIds {
    pub user_ids: Vec<ObjectId>,
    pub product_ids: Vec<ObjectId>,
}

#[derive(Debug, Clone)]
pub enum DemoBatch {
    Products(Vec<Product>),
    Orders(Vec<Order>),
}

const ADJECTIVES: [&str; 12] = [
    "Compact", "Premium", "Classic", "Modern", "Sturdy", "Sleek", "Portable", "Wireless",
    "Ergonomic", "Vintage", "Durable", "Smart",
];

const NOUNS: [&str; 12] = [
    "Speaker", "Backpack", "Kettle", "Notebook", "Lamp", "Jacket", "Monitor", "Blender",
    "Chair", "Watch", "Headphones", "Tent",
];

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}

/// Produces `count` synthetic documents of `kind`. Orders reference user and
/// product ids drawn uniformly at random from `known`; generating them before
/// those sets exist is a `DependencyMissing` error.
pub fn generate_demo_batch<R: Rng + ?Sized>(
    kind: DemoKind,
    count: usize,
    rng: &mut R,
    known: &KnownIds,
) -> Result<DemoBatch, StoreError> {
    match kind {
        DemoKind::Product => generate_products(count, rng).map(DemoBatch::Products),
        DemoKind::Order => generate_orders(count, rng, known).map(DemoBatch::Orders),
    }
}

fn generate_products<R: Rng + ?Sized>(
    count: usize,
    rng: &mut R,
) -> Result<Vec<Product>, StoreError> {
    let mut products = Vec::with_capacity(count);
    for _ in 0..count {
        let adjective = *pick(rng, &ADJECTIVES);
        let noun = *pick(rng, &NOUNS);
        products.push(Product::new(
            format!("{} {}", adjective, noun),
            Some(format!("A {} {} for everyday use.", adjective.to_lowercase(), noun.to_lowercase())),
            round2(rng.gen_range(100.0..=50000.0)),
            *pick(rng, &Category::ALL),
            rng.gen_range(0..=500),
            None,
            None,
            Utc::now(),
        )?);
    }
    Ok(products)
}

fn generate_orders<R: Rng + ?Sized>(
    count: usize,
    rng: &mut R,
    known: &KnownIds,
) -> Result<Vec<Order>, StoreError> {
    if known.user_ids.is_empty() {
        return Err(StoreError::DependencyMissing(
            "cannot generate orders: no user ids known".to_string(),
        ));
    }
    if known.product_ids.is_empty() {
        return Err(StoreError::DependencyMissing(
            "cannot generate orders: no product ids known".to_string(),
        ));
    }

    let mut orders = Vec::with_capacity(count);
    for _ in 0..count {
        let items: Vec<OrderItem> = (0..rng.gen_range(1..=4))
            .map(|_| OrderItem {
                product_id: *pick(rng, &known.product_ids),
                quantity: rng.gen_range(1..=3),
                price: round2(rng.gen_range(100.0..=1000.0)),
            })
            .collect();

        // Unlike the seed fixtures, generated totals always equal the sum of
        // the line totals.
        let total: f64 = items
            .iter()
            .map(|item| f64::from(item.quantity) * item.price)
            .sum();

        orders.push(Order::new(
            *pick(rng, &known.user_ids),
            items,
            round2(total),
            *pick(rng, &OrderStatus::ALL),
            Utc::now() - Duration::days(rng.gen_range(0..365)),
        )?);
    }
    Ok(orders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn known(users: usize, products: usize) -> KnownIds {
        KnownIds {
            user_ids: (0..users).map(|_| ObjectId::new()).collect(),
            product_ids: (0..products).map(|_| ObjectId::new()).collect(),
        }
    }

    #[test]
    fn generates_requested_product_count() {
        let mut rng = StdRng::seed_from_u64(7);
        let batch =
            generate_demo_batch(DemoKind::Product, 50, &mut rng, &KnownIds::default()).unwrap();
        match batch {
            DemoBatch::Products(products) => assert_eq!(products.len(), 50),
            DemoBatch::Orders(_) => unreachable!(),
        }
    }

    #[test]
    fn products_are_deterministic_under_a_fixed_seed() {
        let generate = || {
            let mut rng = StdRng::seed_from_u64(42);
            match generate_demo_batch(DemoKind::Product, 10, &mut rng, &KnownIds::default())
                .unwrap()
            {
                DemoBatch::Products(p) => p,
                DemoBatch::Orders(_) => unreachable!(),
            }
        };
        let first = generate();
        let second = generate();
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.price, b.price);
            assert_eq!(a.category, b.category);
            assert_eq!(a.stock, b.stock);
        }
    }

    #[test]
    fn generated_products_satisfy_the_schema_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let batch =
            generate_demo_batch(DemoKind::Product, 50, &mut rng, &KnownIds::default()).unwrap();
        let products = match batch {
            DemoBatch::Products(p) => p,
            DemoBatch::Orders(_) => unreachable!(),
        };
        for product in products {
            assert!(product.price >= 100.0 && product.price <= 50000.0);
            assert!((0..=500).contains(&product.stock));
            assert!(Category::ALL.contains(&product.category));
        }
    }

    #[test]
    fn orders_reference_only_known_ids_and_sum_their_items() {
        let known = known(3, 6);
        let mut rng = StdRng::seed_from_u64(11);
        let batch = generate_demo_batch(DemoKind::Order, 30, &mut rng, &known).unwrap();
        let orders = match batch {
            DemoBatch::Orders(o) => o,
            DemoBatch::Products(_) => unreachable!(),
        };
        assert_eq!(orders.len(), 30);
        for order in orders {
            assert!(known.user_ids.contains(&order.user_id));
            assert!((1..=4).contains(&order.items.len()));
            for item in &order.items {
                assert!(known.product_ids.contains(&item.product_id));
                assert!((1..=3).contains(&item.quantity));
            }
            assert!((order.total_amount - order.items_total()).abs() < 0.005);
        }
    }

    #[test]
    fn order_generation_requires_both_id_sets() {
        let mut rng = StdRng::seed_from_u64(0);
        let no_users = KnownIds {
            user_ids: Vec::new(),
            product_ids: vec![ObjectId::new()],
        };
        assert!(matches!(
            generate_demo_batch(DemoKind::Order, 1, &mut rng, &no_users),
            Err(StoreError::DependencyMissing(_))
        ));

        let no_products = KnownIds {
            user_ids: vec![ObjectId::new()],
            product_ids: Vec::new(),
        };
        assert!(matches!(
            generate_demo_batch(DemoKind::Order, 1, &mut rng, &no_products),
            Err(StoreError::DependencyMissing(_))
        ));
    }
}
