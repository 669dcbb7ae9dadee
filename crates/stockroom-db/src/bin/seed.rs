//! # Seed Data Generator
//!
//! Populates the database with a demo catalog for development.
//!
//! ## Usage
//! ```bash
//! # Generate 500 products (default) into $STOCKROOM_DB_PATH or ./stockroom.db
//! cargo run -p stockroom-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p stockroom-db --bin seed -- --count 2000
//!
//! # Specify database path
//! cargo run -p stockroom-db --bin seed -- --db ./data/stockroom.db
//! ```
//!
//! ## Generated Products
//! Every product is `{base name} {size}` with:
//! - Price: $1.99 - $9.99 plus a size addon
//! - Stock: 0 - 100 (some start at or below the low-stock threshold)
//! - Description naming its category

use std::env;
use std::time::Instant;

use stockroom_core::{timestamp_now, Product};
use stockroom_db::{generate_product_id, Database, DbConfig, ProductStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Product categories for realistic test data
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Beverages",
        &[
            "Cola", "Lemon Soda", "Sparkling Water", "Still Water", "Orange Juice",
            "Apple Juice", "Iced Tea", "Cold Brew", "Energy Drink", "Lemonade",
        ],
    ),
    (
        "Snacks",
        &[
            "Salted Chips", "Tortilla Chips", "Pretzels", "Popcorn", "Trail Mix",
            "Granola Bar", "Chocolate Bar", "Gummy Bears", "Oat Cookies", "Crackers",
        ],
    ),
    (
        "Dairy",
        &[
            "Whole Milk", "Oat Milk", "Cheddar", "Mozzarella", "Butter",
            "Greek Yogurt", "Sour Cream", "Cream Cheese", "Eggs", "Parmesan",
        ],
    ),
    (
        "Grocery",
        &[
            "Spaghetti", "Penne", "White Rice", "Brown Rice", "Canned Beans",
            "Canned Tomatoes", "Oatmeal", "Peanut Butter", "Honey", "Flour",
        ],
    ),
];

/// Size variants with their price addon in cents
const SIZES: &[(&str, i64)] = &[
    ("Small", 0),
    ("Medium", 100),
    ("Large", 200),
    ("Family", 350),
    ("6-Pack", 300),
];

const DEFAULT_COUNT: usize = 500;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count = DEFAULT_COUNT;
    let mut config = DbConfig::from_env();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(DEFAULT_COUNT);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockroom Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: {DEFAULT_COUNT})");
                println!("  -d, --db <PATH>    Database file path (default: $STOCKROOM_DB_PATH or ./stockroom.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(
        path = %config.database_path.display(),
        count,
        "Seeding demo catalog"
    );

    let db = Database::new(config).await?;
    let products = db.products();

    let existing = products.count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products; skipping seed");
        return Ok(());
    }

    let start = Instant::now();
    let mut generated = 0;

    'outer: for (category, names) in CATEGORIES {
        for name in names.iter() {
            for (size, price_addon) in SIZES {
                if generated >= count {
                    break 'outer;
                }

                let product = generate_product(category, name, size, *price_addon, generated);
                if let Err(e) = products.insert(&product).await {
                    warn!(name = %product.name, error = %e, "Failed to insert product");
                    continue;
                }

                generated += 1;
                if generated % 100 == 0 {
                    info!(generated, "Progress");
                }
            }
        }
    }

    let elapsed = start.elapsed();
    info!(
        generated,
        elapsed_ms = elapsed.as_millis() as u64,
        "Seed complete"
    );

    let low = products.low_stock(10, 5).await?;
    info!(low_stock = low.len(), "Products at or below 10 units (first 5)");

    db.close().await;
    Ok(())
}

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - Default: `info,stockroom=debug,sqlx=warn`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stockroom=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Generates a single product with deterministic demo data.
fn generate_product(category: &str, name: &str, size: &str, price_addon: i64, seed: usize) -> Product {
    let now = timestamp_now();

    // $1.99 - $9.99 + size addon
    let base_price = 199 + ((seed * 17) % 800) as i64;

    Product {
        id: generate_product_id(),
        name: format!("{name} {size}"),
        description: Some(format!("{category} / {size}")),
        price_cents: base_price + price_addon,
        quantity: ((seed * 7) % 101) as i64,
        created_at: now,
        updated_at: now,
    }
}
