//! # Seed Data Generator
//!
//! Populates the database with a demo jewelry store for development.
//!
//! ## Usage
//! ```bash
//! # 5 pieces of every product (default)
//! cargo run -p aurum-db --bin seed
//!
//! # Custom piece count
//! cargo run -p aurum-db --bin seed -- --pieces 20
//!
//! # Specify database path (otherwise AURUM_DATABASE_PATH or ./aurum.db)
//! cargo run -p aurum-db --bin seed -- --db ./data/aurum.db
//! ```
//!
//! ## Generated Data
//! - Gold categories K24, K22, K18 and K16 with today's board prices
//! - A store with two display trays and a warehouse with a safe
//! - Rings, necklaces, bracelets and earrings per category
//! - A handful of loyalty members
//! - `--pieces` received stock items per product, all in the store
//!
//! Finishes by reporting whether today's price revision is still due,
//! using the store calendar from `AURUM_STORE_UTC_OFFSET_MINUTES`.

use std::env;

use aurum_core::{
    GoldCategory, Location, LocationType, Money, NewMember, Product, ReceiveStockRequest, StorageBox,
    Weight, MAX_RECEIVE_QUANTITY,
};
use aurum_db::telemetry::init_tracing;
use aurum_db::{AppConfig, Database, DbConfig};
use chrono::Utc;

/// (code, name, purity, buy per gram, sell per gram)
const CATEGORIES: &[(&str, &str, &str, i64, i64)] = &[
    ("K24", "24 Karat", "99.9%", 1_150_000, 1_250_000),
    ("K22", "22 Karat", "91.6%", 1_040_000, 1_140_000),
    ("K18", "18 Karat", "75%", 850_000, 940_000),
    ("K16", "16 Karat", "70%", 780_000, 860_000),
];

/// (barcode stem, name, jewelry type, weight in milligrams)
const DESIGNS: &[(&str, &str, &str, i64)] = &[
    ("RG", "Plain band ring", "ring", 2_000),
    ("RS", "Solitaire ring", "ring", 3_250),
    ("NK", "Rope necklace", "necklace", 8_500),
    ("NP", "Pendant necklace", "necklace", 5_100),
    ("BR", "Bangle", "bracelet", 10_000),
    ("BC", "Chain bracelet", "bracelet", 6_400),
    ("ER", "Stud earrings", "earring", 1_500),
];

const MEMBERS: &[(&str, &str)] = &[
    ("Siti Rahmawati", "081234500001"),
    ("Budi Santoso", "081234500002"),
    ("Dewi Lestari", "081234500003"),
    ("Agus Pratama", "081234500004"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let app = AppConfig::from_env()?;
    init_tracing(&app.log_filter);

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut pieces: u32 = 5;
    let mut db_path = app.database_path.display().to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--pieces" | "-p" => {
                if i + 1 < args.len() {
                    pieces = args[i + 1].parse().unwrap_or(5);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Aurum POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --pieces <N>   Stock items received per product (default: 5)");
                println!("  -d, --db <PATH>    Database file path (default: AURUM_DATABASE_PATH)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }
    let pieces = pieces.clamp(1, MAX_RECEIVE_QUANTITY);

    println!("🌱 Aurum POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Pieces per product: {}", pieces);
    println!();

    let db = Database::new(DbConfig::new(&db_path).max_connections(app.max_connections)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let catalog = db.catalog();
    let existing = catalog.list_gold_categories(false).await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} gold categories", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Locations
    let store = Location::new("STORE1", "Toko Emas Pusat", LocationType::Store);
    catalog.create_location(&store).await?;
    let tray_a = StorageBox::new(store.id.clone(), "A1", "Display tray A1");
    let tray_b = StorageBox::new(store.id.clone(), "B1", "Display tray B1");
    catalog.create_storage_box(&tray_a).await?;
    catalog.create_storage_box(&tray_b).await?;

    let warehouse = Location::new("WH1", "Gudang", LocationType::Warehouse);
    catalog.create_location(&warehouse).await?;
    catalog
        .create_storage_box(&StorageBox::new(warehouse.id.clone(), "S1", "Safe 1"))
        .await?;

    println!("✓ Created 2 locations and 3 storage boxes");

    // Catalog and stock
    let stocks = db.stocks();
    let mut received = 0usize;
    let start = std::time::Instant::now();

    for (category_idx, (code, name, purity, buy, sell)) in CATEGORIES.iter().enumerate() {
        let category = GoldCategory::new(
            *code,
            *name,
            Some(purity.to_string()),
            Money::from_rupiah(*buy),
            Money::from_rupiah(*sell),
        );
        catalog.create_gold_category(&category).await?;

        for (design_idx, (stem, design, jewelry_type, milligrams)) in DESIGNS.iter().enumerate() {
            let mut product = Product::new(
                format!("{}-{}-{:03}", stem, code, category_idx * 100 + design_idx),
                format!("{} {}", design, code),
                category.id.clone(),
                Weight::from_milligrams(*milligrams),
            );
            product.jewelry_type = Some(jewelry_type.to_string());
            catalog.create_product(&product).await?;

            // Alternate trays so label printing has two boxes to work with
            let tray = if design_idx % 2 == 0 { &tray_a } else { &tray_b };
            let batch = stocks
                .receive(&ReceiveStockRequest {
                    product_id: product.id.clone(),
                    location_id: store.id.clone(),
                    storage_box_id: tray.id.clone(),
                    quantity: pieces,
                    supplier_name: Some("Seed supplier".to_string()),
                    notes: None,
                })
                .await?;
            received += batch.len();
        }
    }

    println!(
        "✓ Created {} categories, {} products, {} stock items in {:?}",
        CATEGORIES.len(),
        CATEGORIES.len() * DESIGNS.len(),
        received,
        start.elapsed()
    );

    // Members
    let members = db.members();
    for (name, phone) in MEMBERS {
        let member = members
            .create(&NewMember {
                name: name.to_string(),
                phone: Some(phone.to_string()),
                email: None,
                address: None,
                id_number: None,
            })
            .await?;
        println!("  Member {} ({})", member.member_code, member.name);
    }

    // Board prices are revised per store calendar day
    let prices = db
        .prices()
        .needs_update_today(app.store_offset, Utc::now())
        .await?;
    if prices.needs_update {
        println!(
            "⚠ No price revision yet today (UTC{}); revise the {} gold categories before opening",
            app.store_offset,
            prices.categories.len()
        );
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
