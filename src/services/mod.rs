mod bootstrap;
mod demo;
mod fixtures;
mod mongodb;

pub use bootstrap::{collection_validators, index_specs, BootstrapService, SeedReport};
pub use demo::{generate_demo_batch, DemoBatch, DemoKind, KnownIds};
pub use self::mongodb::{
    CategoryAvgRow, CollectionStats, MongoDBService, OrderWithUserRow, ProductPriceRow,
    UserSpendRow, ORDERS, PRODUCTS, USERS,
};
