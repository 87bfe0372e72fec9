//! # Seed Data Generator
//!
//! Populates a database with a small catalogue, a few clients and a run of
//! sales and purchases, all posted through the ledger.
//!
//! ## Usage
//! ```bash
//! # Seed ./tally_dev.db with 20 transactions (default)
//! cargo run -p tally-db --bin seed
//!
//! # Custom amount
//! cargo run -p tally-db --bin seed -- --count 200
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```
//!
//! Logging follows `RUST_LOG` (default `info,tally_db=debug,sqlx=warn`).

use std::env;

use chrono::{Days, Utc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tally_core::request::{
    DiscountSpec, LineItem, NewCategory, NewClient, NewProduct, TransactionRequest,
};
use tally_core::{Money, PaymentStatus, Product, Rate, TransactionType};
use tally_db::{Database, DbConfig, LedgerConfig};

/// Categories with their products: (sku, name, price cents, cost cents, opening stock).
const CATALOGUE: &[(&str, &[(&str, &str, i64, i64, i64)])] = &[
    (
        "Grains",
        &[
            ("RICE-5KG", "Basmati Rice 5kg", 2400, 1900, 40),
            ("ATTA-10KG", "Wheat Flour 10kg", 1800, 1450, 25),
            ("DAAL-1KG", "Red Lentils 1kg", 450, 320, 60),
        ],
    ),
    (
        "Oils",
        &[
            ("OIL-1L", "Cooking Oil 1L", 650, 520, 30),
            ("GHEE-1KG", "Desi Ghee 1kg", 2200, 1750, 8),
        ],
    ),
    (
        "Beverages",
        &[
            ("TEA-500G", "Black Tea 500g", 900, 640, 50),
            ("MILK-1L", "Packed Milk 1L", 280, 230, 100),
        ],
    ),
];

const CLIENTS: &[(&str, i64)] = &[
    ("Ahmed Traders", 100_000),
    ("Bismillah Store", 50_000),
    ("City Wholesale", 0),
];

/// Standard VAT, 13%.
const VAT_BPS: u32 = 1300;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tally_db=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 20;
    let mut db_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(20);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of transactions to post (default: 20)");
                println!("  -d, --db <PATH>    Database file path (default: $TALLY_DB_PATH)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = match db_path {
        Some(path) => DbConfig::new(path),
        None => DbConfig::from_env(),
    };
    let db = Database::new(config).await?;
    let ledger = db.ledger(LedgerConfig::from_env());

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        return Ok(());
    }

    let mut products: Vec<Product> = Vec::new();
    for (category_name, items) in CATALOGUE {
        let category = ledger
            .create_category(&NewCategory {
                name: category_name.to_string(),
                description: None,
            })
            .await?;

        for (sku, name, price, cost, stock) in items.iter() {
            let product = ledger
                .create_product(&NewProduct {
                    category_id: category.id.clone(),
                    name: name.to_string(),
                    sku: sku.to_string(),
                    price: Money::from_cents(*price),
                    cost: Money::from_cents(*cost),
                    stock_quantity: *stock,
                    min_stock_level: 10,
                })
                .await?;
            products.push(product);
        }
    }
    info!(products = products.len(), "Catalogue created");

    let mut clients = Vec::new();
    for (name, credit_limit) in CLIENTS {
        let client = ledger
            .create_client(&NewClient {
                credit_limit: Money::from_cents(*credit_limit),
                ..NewClient::named(*name)
            })
            .await?;
        clients.push(client);
    }

    let start = std::time::Instant::now();
    let today = Utc::now().date_naive();
    let mut posted = 0;

    for seed in 0..count {
        let date = today
            .checked_sub_days(Days::new((count - seed) as u64 / 3))
            .unwrap_or(today);

        let first = &products[seed % products.len()];
        let second = &products[(seed * 7 + 3) % products.len()];
        let quantity = 1 + (seed % 4) as i64;

        let request = if seed % 5 == 4 {
            // Restock from the wholesaler at cost.
            TransactionRequest::new(
                TransactionType::Purchase,
                date,
                vec![LineItem::new(&first.id, quantity * 10, first.cost())],
            )
            .with_client(&clients[2].id)
            .with_payment_status(PaymentStatus::Paid)
        } else {
            let mut request = TransactionRequest::new(
                TransactionType::Sale,
                date,
                vec![
                    LineItem::new(&first.id, quantity, first.price()),
                    LineItem::new(&second.id, 1, second.price()),
                ],
            )
            .with_client(&clients[seed % 2].id)
            .with_payment_status(PaymentStatus::Credit);

            if seed % 3 == 0 {
                request = request.with_discount(DiscountSpec::Percentage(Rate::from_bps(500)));
            }
            if seed % 2 == 0 {
                request = request.with_vat(Rate::from_bps(VAT_BPS));
            }
            request
        };

        match ledger.post_transaction(&request).await {
            Ok(_) => posted += 1,
            Err(e) => error!(error = %e, "Failed to post seed transaction"),
        }
    }

    info!(
        posted,
        elapsed = ?start.elapsed(),
        "Transactions posted"
    );

    for client in db.clients().list().await? {
        info!(client = %client.name, balance = %client.balance(), "Client balance");
    }
    let low = ledger.low_stock_products().await?;
    info!(
        low_stock = low.len(),
        stock_value = %ledger.stock_value().await?,
        "Seed complete"
    );

    Ok(())
}
