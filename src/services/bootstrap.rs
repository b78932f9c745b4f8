use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::error::ErrorKind;
use mongodb::options::{CreateCollectionOptions, IndexOptions};
use mongodb::{Collection, Database, IndexModel};

use crate::models::{Category, Order, OrderStatus, Product, StoreError, User};
use crate::services::fixtures;
use crate::services::mongodb::{ORDERS, PRODUCTS, USERS};

/// Brings the shop database from "absent/unknown" to "ready for querying".
///
/// Each step is independently idempotent and performs no retries; a failing
/// step leaves whatever partial state the server accepted, and re-running the
/// whole sequence is safe. No transaction wraps the sequence.
pub struct BootstrapService {
    db: Database,
    users: Collection<User>,
    products: Collection<Product>,
    orders: Collection<Order>,
}

/// What `seed_if_empty` inserted, per collection. Zero means the collection
/// already held documents and was left untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeedReport {
    pub users_inserted: usize,
    pub products_inserted: usize,
    pub orders_inserted: usize,
}

/// Which collections `seed_if_empty` will insert into, decided from document
/// counts observed before any insert. Only a count of exactly zero triggers a
/// seed; a partially populated collection is somebody else's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedPlan {
    pub users: bool,
    pub products: bool,
    pub orders: bool,
}

impl SeedPlan {
    pub fn from_counts(users: u64, products: u64, orders: u64) -> Self {
        SeedPlan {
            users: users == 0,
            products: products == 0,
            orders: orders == 0,
        }
    }

    pub fn is_noop(&self) -> bool {
        !(self.users || self.products || self.orders)
    }
}

/// One index wanted on a collection. Index identity is (collection, keys,
/// options): re-creating an identical index is a server-side no-op.
#[derive(Debug, Clone)]
pub struct IndexSpec {
    pub collection: &'static str,
    pub keys: Document,
    pub unique: bool,
}

impl IndexSpec {
    fn plain(collection: &'static str, keys: Document) -> Self {
        IndexSpec {
            collection,
            keys,
            unique: false,
        }
    }

    fn unique(collection: &'static str, keys: Document) -> Self {
        IndexSpec {
            collection,
            keys,
            unique: true,
        }
    }

    fn into_model(self) -> IndexModel {
        let options = self
            .unique
            .then(|| IndexOptions::builder().unique(true).build());
        IndexModel::builder().keys(self.keys).options(options).build()
    }
}

/// The full index set for the three collections.
pub fn index_specs() -> Vec<IndexSpec> {
    vec![
        IndexSpec::unique(USERS, doc! { "email": 1 }),
        IndexSpec::plain(USERS, doc! { "created_at": -1 }),
        IndexSpec::plain(USERS, doc! { "address.city": 1 }),
        IndexSpec::plain(PRODUCTS, doc! { "name": "text", "description": "text" }),
        IndexSpec::plain(PRODUCTS, doc! { "category": 1, "price": 1 }),
        IndexSpec::plain(PRODUCTS, doc! { "price": 1 }),
        IndexSpec::plain(PRODUCTS, doc! { "rating": -1 }),
        IndexSpec::plain(PRODUCTS, doc! { "tags": 1 }),
        IndexSpec::plain(ORDERS, doc! { "user_id": 1, "order_date": -1 }),
        IndexSpec::plain(ORDERS, doc! { "status": 1 }),
        IndexSpec::plain(ORDERS, doc! { "order_date": -1 }),
        IndexSpec::plain(ORDERS, doc! { "items.product_id": 1 }),
    ]
}

/// `$jsonSchema` validators, one per collection.
pub fn collection_validators() -> Vec<(&'static str, Document)> {
    vec![
        (USERS, users_validator()),
        (PRODUCTS, products_validator()),
        (ORDERS, orders_validator()),
    ]
}

fn users_validator() -> Document {
    doc! {
        "$jsonSchema": {
            "bsonType": "object",
            "required": ["email", "name", "created_at"],
            "properties": {
                "email": { "bsonType": "string" },
                "name": { "bsonType": "string", "minLength": 2 },
                "phone": { "bsonType": "string" },
                "address": { "bsonType": "object" },
                "created_at": { "bsonType": "date" },
                "last_login": { "bsonType": "date" }
            }
        }
    }
}

fn products_validator() -> Document {
    let categories: Vec<Bson> = Category::names().into_iter().map(Bson::from).collect();
    doc! {
        "$jsonSchema": {
            "bsonType": "object",
            "required": ["name", "price", "category", "stock"],
            "properties": {
                "name": { "bsonType": "string" },
                "description": { "bsonType": "string" },
                "price": { "bsonType": ["double", "int"], "minimum": 0 },
                "category": { "enum": categories },
                "stock": { "bsonType": "int", "minimum": 0 },
                "rating": { "bsonType": ["double", "int"], "minimum": 0, "maximum": 5 },
                "tags": { "bsonType": "array" },
                "created_at": { "bsonType": "date" }
            }
        }
    }
}

fn orders_validator() -> Document {
    let statuses: Vec<Bson> = OrderStatus::names().into_iter().map(Bson::from).collect();
    doc! {
        "$jsonSchema": {
            "bsonType": "object",
            "required": ["user_id", "items", "total_amount", "status", "order_date"],
            "properties": {
                "user_id": { "bsonType": "objectId" },
                "items": { "bsonType": "array", "minItems": 1 },
                "total_amount": { "bsonType": ["double", "int"], "minimum": 0 },
                "status": { "enum": statuses },
                "order_date": { "bsonType": "date" },
                "shipping_address": { "bsonType": "object" },
                "delivery_date": { "bsonType": "date" }
            }
        }
    }
}

impl BootstrapService {
    pub fn new(db: &Database) -> Self {
        BootstrapService {
            db: db.clone(),
            users: db.collection(USERS),
            products: db.collection(PRODUCTS),
            orders: db.collection(ORDERS),
        }
    }

    /// Runs schema, index and seed steps in order. Callers wanting per-step
    /// error policy should invoke the steps individually.
    pub async fn run(&self) -> Result<SeedReport, StoreError> {
        self.ensure_schema().await?;
        self.ensure_indexes().await?;
        self.seed_if_empty().await
    }

    /// Creates each collection with its `$jsonSchema` validator, or applies
    /// the validator via `collMod` when the collection already exists. A
    /// server that rejects validator options is tolerated: the step logs a
    /// warning and continues, and constraint enforcement falls back to the
    /// model constructors.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let existing = self.db.list_collection_names(None).await?;

        for (name, validator) in collection_validators() {
            if existing.iter().any(|c| c == name) {
                let command = doc! { "collMod": name, "validator": validator };
                match self.db.run_command(command, None).await {
                    Ok(_) => log::debug!("validator applied to existing collection '{}'", name),
                    Err(e) if is_command_rejection(&e) => {
                        log::warn!("server rejected validator for '{}', skipping: {}", name, e);
                    }
                    Err(e) => return Err(e.into()),
                }
                continue;
            }

            let options = CreateCollectionOptions::builder()
                .validator(validator)
                .build();
            match self.db.create_collection(name, options).await {
                Ok(()) => log::info!("created collection '{}' with validator", name),
                Err(e) if is_command_rejection(&e) => {
                    log::warn!(
                        "server rejected validator for '{}', creating without: {}",
                        name,
                        e
                    );
                    self.db.create_collection(name, None).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    /// Creates the full index set. Identical field-spec + options is a
    /// server-side no-op, so calling this repeatedly never duplicates an
    /// index and never fails on an existing one.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let specs = index_specs();
        let total = specs.len();
        for spec in specs {
            let collection = self.db.collection::<Document>(spec.collection);
            collection.create_index(spec.into_model(), None).await?;
        }
        log::info!("ensured {} indexes", total);
        Ok(())
    }

    /// Seeds each empty collection with the baseline fixture (3 users,
    /// 6 products, 4 orders); non-empty collections are left untouched. Each
    /// collection is one `insert_many`, so a batch commits wholly or not at
    /// all (per the server's batch guarantee).
    ///
    /// Known limitation: the empty-check and the insert are not atomic across
    /// processes. Two concurrent bootstraps can both observe "empty" and both
    /// insert.
    pub async fn seed_if_empty(&self) -> Result<SeedReport, StoreError> {
        let plan = SeedPlan::from_counts(
            self.users.count_documents(None, None).await?,
            self.products.count_documents(None, None).await?,
            self.orders.count_documents(None, None).await?,
        );
        let mut report = SeedReport::default();
        if plan.is_noop() {
            log::info!("all collections populated, nothing to seed");
            return Ok(report);
        }

        if plan.users {
            let users = fixtures::baseline_users()?;
            let result = self.users.insert_many(&users, None).await?;
            report.users_inserted = result.inserted_ids.len();
            log::info!("seeded {} users", report.users_inserted);
        }

        if plan.products {
            let products = fixtures::baseline_products()?;
            let result = self.products.insert_many(&products, None).await?;
            report.products_inserted = result.inserted_ids.len();
            log::info!("seeded {} products", report.products_inserted);
        }

        if plan.orders {
            let user_ids = self.collection_ids(USERS).await?;
            let product_ids = self.collection_ids(PRODUCTS).await?;
            let orders = fixtures::baseline_orders(&user_ids, &product_ids)?;
            let result = self.orders.insert_many(&orders, None).await?;
            report.orders_inserted = result.inserted_ids.len();
            log::info!("seeded {} orders", report.orders_inserted);
        }

        Ok(report)
    }

    /// All `_id` values of a collection, for wiring references into
    /// generated data.
    pub async fn collection_ids(&self, name: &str) -> Result<Vec<ObjectId>, StoreError> {
        let values = self
            .db
            .collection::<Document>(name)
            .distinct("_id", None, None)
            .await?;
        Ok(values
            .into_iter()
            .filter_map(|v| v.as_object_id())
            .collect())
    }
}

fn is_command_rejection(error: &mongodb::error::Error) -> bool {
    matches!(*error.kind, ErrorKind::Command(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_plan_skips_populated_collections() {
        let plan = SeedPlan::from_counts(3, 6, 4);
        assert!(!plan.users);
        assert!(!plan.products);
        assert!(!plan.orders);
        assert!(plan.is_noop());

        // A single surviving document is enough to skip that collection.
        let plan = SeedPlan::from_counts(1, 0, 0);
        assert!(!plan.users);
        assert!(plan.products);
        assert!(plan.orders);
        assert!(!plan.is_noop());
    }

    #[test]
    fn seed_plan_targets_only_empty_collections() {
        assert_eq!(
            SeedPlan::from_counts(0, 0, 0),
            SeedPlan {
                users: true,
                products: true,
                orders: true,
            }
        );
        assert_eq!(
            SeedPlan::from_counts(3, 0, 4),
            SeedPlan {
                users: false,
                products: true,
                orders: false,
            }
        );
    }

    #[test]
    fn index_set_is_duplicate_free_by_identity() {
        let specs = index_specs();
        assert_eq!(specs.len(), 12);
        for (i, a) in specs.iter().enumerate() {
            for b in specs.iter().skip(i + 1) {
                assert!(
                    !(a.collection == b.collection && a.keys == b.keys && a.unique == b.unique),
                    "duplicate index spec on {}: {:?}",
                    a.collection,
                    a.keys
                );
            }
        }
    }

    #[test]
    fn index_set_is_stable_across_calls() {
        // ensure_indexes twice must target the same identities as once.
        let first: Vec<_> = index_specs()
            .into_iter()
            .map(|s| (s.collection, s.keys, s.unique))
            .collect();
        let second: Vec<_> = index_specs()
            .into_iter()
            .map(|s| (s.collection, s.keys, s.unique))
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn only_user_email_is_unique() {
        let uniques: Vec<_> = index_specs().into_iter().filter(|s| s.unique).collect();
        assert_eq!(uniques.len(), 1);
        assert_eq!(uniques[0].collection, USERS);
        assert_eq!(uniques[0].keys, doc! { "email": 1 });
    }

    #[test]
    fn every_collection_has_a_validator() {
        let validators = collection_validators();
        let names: Vec<_> = validators.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec![USERS, PRODUCTS, ORDERS]);
        for (_, validator) in &validators {
            assert!(validator.get_document("$jsonSchema").is_ok());
        }
    }

    #[test]
    fn product_validator_bounds_match_model_constraints() {
        let schema = products_validator();
        let schema = schema.get_document("$jsonSchema").unwrap();
        let required = schema.get_array("required").unwrap();
        for field in ["name", "price", "category", "stock"] {
            assert!(required.iter().any(|v| v.as_str() == Some(field)));
        }

        let properties = schema.get_document("properties").unwrap();
        let categories = properties
            .get_document("category")
            .unwrap()
            .get_array("enum")
            .unwrap();
        assert_eq!(categories.len(), Category::names().len());
        let stock = properties.get_document("stock").unwrap();
        assert_eq!(stock.get_i32("minimum").unwrap(), 0);
        let rating = properties.get_document("rating").unwrap();
        assert_eq!(rating.get_i32("maximum").unwrap(), 5);
    }

    #[test]
    fn order_validator_requires_non_empty_items() {
        let schema = orders_validator();
        let schema = schema.get_document("$jsonSchema").unwrap();
        let items = schema
            .get_document("properties")
            .unwrap()
            .get_document("items")
            .unwrap();
        assert_eq!(items.get_i32("minItems").unwrap(), 1);

        let statuses = schema
            .get_document("properties")
            .unwrap()
            .get_document("status")
            .unwrap()
            .get_array("enum")
            .unwrap();
        assert_eq!(statuses.len(), OrderStatus::names().len());
    }
}
