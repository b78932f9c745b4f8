//! Console front-end: the numbered menu and the fixed demo walkthroughs.
//! Owns all stdin/stdout handling; everything else goes through the service.

use std::io::{self, Write};

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::models::{Address, Category, OrderStatus, Product, StoreError, User};
use crate::services::MongoDBService;

type Input = Lines<BufReader<Stdin>>;

const MENU: &str = "\
============================================================
MENU
============================================================
1. List users
2. List products
3. List orders
4. Add a user
5. Run complex queries
6. Show statistics
0. Exit
============================================================";

fn heading(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{}", title);
    println!("{}", "=".repeat(60));
}

async fn read_line(input: &mut Input, prompt: &str) -> io::Result<Option<String>> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let line = input.next_line().await?; // None on EOF
    Ok(line.map(|l| l.trim().to_string()))
}

/// Runs the menu loop until the user exits or stdin closes.
pub async fn run_menu(service: &MongoDBService) -> Result<(), StoreError> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        println!("{}", MENU);
        let choice = match read_line(&mut input, "\nChoose an action: ").await {
            Ok(Some(choice)) => choice,
            Ok(None) => {
                println!("\nGoodbye!");
                return Ok(());
            }
            Err(e) => {
                log::error!("failed to read menu choice: {}", e);
                return Ok(());
            }
        };

        let outcome = match choice.as_str() {
            "1" => list_users(service).await,
            "2" => list_products(service).await,
            "3" => list_orders(service).await,
            "4" => add_user(service, &mut input).await,
            "5" => complex_queries(service).await,
            "6" => show_stats(service).await,
            "0" => {
                println!("\nGoodbye!");
                return Ok(());
            }
            _ => {
                println!("Invalid choice");
                Ok(())
            }
        };

        // Menu actions report their own failures; the loop keeps going.
        if let Err(e) = outcome {
            println!("Error: {}", e);
        }
    }
}

async fn list_users(service: &MongoDBService) -> Result<(), StoreError> {
    println!("\nUsers:");
    for user in service.list_users().await? {
        let city = user
            .address
            .as_ref()
            .map(|a| a.city.as_str())
            .unwrap_or("N/A");
        println!("  - {} ({}) - {}", user.name, user.email, city);
    }
    Ok(())
}

async fn list_products(service: &MongoDBService) -> Result<(), StoreError> {
    println!("\nProducts:");
    for product in service.list_products().await? {
        println!(
            "  - {}: {:.2} ({} in stock)",
            product.name, product.price, product.stock
        );
    }
    Ok(())
}

async fn list_orders(service: &MongoDBService) -> Result<(), StoreError> {
    println!("\nOrders:");
    for order in service.list_orders().await? {
        println!("  - {:.2} ({})", order.total_amount, order.status);
    }
    Ok(())
}

async fn add_user(service: &MongoDBService, input: &mut Input) -> Result<(), StoreError> {
    println!("\nAdd a user");
    let (email, name, city) = match (
        read_line(input, "Email: ").await,
        read_line(input, "Name: ").await,
        read_line(input, "City: ").await,
    ) {
        (Ok(Some(email)), Ok(Some(name)), Ok(Some(city))) => (email, name, city),
        _ => {
            println!("Aborted");
            return Ok(());
        }
    };

    let address = if city.is_empty() {
        None
    } else {
        Some(Address { city })
    };
    let user = User::new(email, name, None, address, Utc::now())?;
    let id = service.insert_user(&user).await?;
    match service.get_user(&id).await? {
        Some(created) => println!("User created with id: {} ({})", id, created.email),
        None => println!("User created with id: {}", id),
    }
    Ok(())
}

/// Fixed CRUD pass: one insert, three filtered reads, three updates, one
/// delete. Mirrors what the bootstrap demo showcases on every run.
pub async fn crud_walkthrough(service: &MongoDBService) -> Result<(), StoreError> {
    heading("CREATE");
    let user = User::new(
        "new.user@example.com",
        "New User",
        Some("+7 900 456-78-90".to_string()),
        Some(Address {
            city: "Kazan".to_string(),
        }),
        Utc::now(),
    )?;
    let id = service.insert_user(&user).await?;
    println!("Created user with id: {}", id);

    heading("READ");
    println!("\nUsers from Moscow:");
    for user in service.find_users_by_city("Moscow").await? {
        println!("  - {} ({})", user.name, user.email);
    }

    println!("\nProducts under 10000:");
    for product in service.find_products_under(10000.0).await? {
        println!("  - {}: {:.2}", product.name, product.price);
    }

    println!("\nElectronics rated above 4.5:");
    for product in service
        .find_products_by_category_min_rating(Category::Electronics, 4.5)
        .await?
    {
        println!(
            "  - {}: {}",
            product.name,
            product.rating.unwrap_or_default()
        );
    }

    println!("\nProducts over 1000 (first 3):");
    for product in service.find_products_over(1000.0, 3).await? {
        println!("  - {}: {:.2}", product.name, product.price);
    }

    heading("UPDATE");
    let touched = service.touch_last_login("ivan.petrov@example.com").await?;
    println!("Updated {} users", touched);
    if let Some(user) = service.find_user_by_email("ivan.petrov@example.com").await? {
        println!(
            "  last_login is now {}",
            user.last_login
                .map(|t| t.to_string())
                .unwrap_or_else(|| "unset".to_string())
        );
    }

    let repriced = service
        .raise_category_prices(Category::Electronics, 1.1)
        .await?;
    println!("Updated {} products (price +10%)", repriced);

    if service
        .advance_one_order(OrderStatus::Pending, OrderStatus::Processing)
        .await?
    {
        println!("Advanced one pending order to processing");
    }

    // Statuses only move when explicitly updated; show that on a delivered
    // order read back by id.
    let delivered = service
        .list_orders()
        .await?
        .into_iter()
        .find(|o| o.status == OrderStatus::Delivered);
    if let Some(order) = delivered {
        if let Some(id) = order.id {
            service.set_order_status(&id, OrderStatus::Processing).await?;
            if let Some(updated) = service.get_order(&id).await? {
                println!("Order {} moved from delivered to {}", id, updated.status);
            }
        }
    }

    heading("DELETE");
    let deleted = service.delete_user_by_email("new.user@example.com").await?;
    println!("Deleted {} users", deleted);

    Ok(())
}

/// Inserts a throwaway product, updates its price, reads it back and deletes
/// it again. Exercises the by-id round trip.
pub async fn product_round_trip(service: &MongoDBService) -> Result<(), StoreError> {
    heading("PRODUCT ROUND TRIP");
    let product = Product::new(
        "Test Product 123",
        Some("A test product description.".to_string()),
        99.99,
        Category::Electronics,
        10,
        None,
        None,
        Utc::now(),
    )?;
    let id = service.insert_product(&product).await?;
    println!("Created product with id: {}", id);

    service.set_product_price(&id, 129.99).await?;
    match service.get_product(&id).await? {
        Some(updated) => println!("New price: {:.2}", updated.price),
        None => println!("Product vanished after update"),
    }

    let deleted = service.delete_product(&id).await?;
    println!("Deleted {} products", deleted);
    Ok(())
}

pub async fn complex_queries(service: &MongoDBService) -> Result<(), StoreError> {
    heading("COMPLEX QUERIES");

    println!("\nTop 3 most expensive products:");
    for row in service.top_expensive_products(3).await? {
        println!("  - {}: {:.2}", row.name, row.price);
    }

    println!("\nOrder totals per user:");
    for row in service.spend_by_user().await? {
        println!(
            "  - User {}: {:.2} ({} orders)",
            row.user_id, row.total_spent, row.order_count
        );
    }

    println!("\nOrders with user info (join):");
    for row in service.orders_with_user_names(3).await? {
        println!(
            "  - {}: {:.2} ({})",
            row.user_name, row.total_amount, row.status
        );
    }

    println!("\nAverage product price per category:");
    for row in service.average_price_per_category().await? {
        println!("  - {}: {:.2}", row.category, row.avg_price);
    }

    Ok(())
}

pub async fn show_stats(service: &MongoDBService) -> Result<(), StoreError> {
    heading("STATISTICS");
    for stats in service.all_collection_stats().await? {
        println!("\n{}:", stats.name);
        println!("  Documents: {}", stats.count);
        println!("  Size: {} bytes", stats.size_bytes);
        println!("  Indexes: {}", stats.index_count);
    }
    Ok(())
}
