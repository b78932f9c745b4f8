mod config;
mod models;
mod services;
mod shell;

use clap::Parser;
use dotenv::dotenv;
use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use config::Settings;
use models::StoreError;
use services::{
    generate_demo_batch, BootstrapService, DemoBatch, DemoKind, KnownIds, MongoDBService,
    PRODUCTS, USERS,
};

/// Bootstrap the shop database (validators, indexes, seed data) and explore
/// it through a fixed query pass and an interactive menu.
#[derive(Parser, Debug)]
#[command(name = "shop-bootstrap")]
struct Cli {
    /// MongoDB connection string (overrides MONGODB_URI)
    #[arg(long)]
    uri: Option<String>,

    /// Logical database name (overrides MONGODB_DATABASE)
    #[arg(long)]
    database: Option<String>,

    /// Insert this many generated products after seeding
    #[arg(long, default_value_t = 0)]
    demo_products: usize,

    /// Insert this many generated orders after seeding
    #[arg(long, default_value_t = 0)]
    demo_orders: usize,

    /// Skip the interactive menu
    #[arg(long)]
    no_menu: bool,
}

#[tokio::main]
async fn main() {
    // Load .env file
    dotenv().ok();
    let cli = Cli::parse();

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(log_level));

    let mut settings = Settings::load();
    if let Some(uri) = cli.uri.as_ref() {
        settings.uri = uri.clone();
    }
    if let Some(database) = cli.database.as_ref() {
        settings.database = database.clone();
    }

    if let Err(e) = run(&settings, &cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(settings: &Settings, cli: &Cli) -> Result<(), StoreError> {
    let service = MongoDBService::init(settings).await?;
    let bootstrap = BootstrapService::new(service.database());

    let report = bootstrap.run().await?;
    info!(
        "seed report: {} users, {} products, {} orders inserted",
        report.users_inserted, report.products_inserted, report.orders_inserted
    );

    if cli.demo_products > 0 || cli.demo_orders > 0 {
        generate_demo_data(&service, &bootstrap, cli.demo_products, cli.demo_orders).await?;
    }

    shell::crud_walkthrough(&service).await?;
    shell::product_round_trip(&service).await?;
    shell::complex_queries(&service).await?;
    shell::show_stats(&service).await?;

    if !cli.no_menu {
        tokio::select! {
            result = shell::run_menu(&service) => result?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                info!("interrupted, shutting down");
            }
        }
    }

    // Dropping the service releases the connection.
    info!("done");
    Ok(())
}

async fn generate_demo_data(
    service: &MongoDBService,
    bootstrap: &BootstrapService,
    products: usize,
    orders: usize,
) -> Result<(), StoreError> {
    let mut rng = StdRng::from_entropy();

    if products > 0 {
        let batch = generate_demo_batch(
            DemoKind::Product,
            products,
            &mut rng,
            &KnownIds::default(),
        )?;
        if let DemoBatch::Products(batch) = batch {
            let inserted = service.insert_products(&batch).await?;
            info!("inserted {} generated products", inserted);
        }
    }

    if orders > 0 {
        // Pick up ids from both the seed and any just-generated products.
        let known = KnownIds {
            user_ids: bootstrap.collection_ids(USERS).await?,
            product_ids: bootstrap.collection_ids(PRODUCTS).await?,
        };
        let batch = generate_demo_batch(DemoKind::Order, orders, &mut rng, &known)?;
        if let DemoBatch::Orders(batch) = batch {
            let inserted = service.insert_orders(&batch).await?;
            info!("inserted {} generated orders", inserted);
        }
    }

    Ok(())
}
