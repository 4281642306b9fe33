//! # Seed Data Generator
//!
//! Populates a fresh database with sample companies, brands and frames for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed the database named by JAZZY_DB_PATH (default ./jazzy.db)
//! cargo run -p jazzy-db --bin seed
//!
//! # Specify database path
//! cargo run -p jazzy-db --bin seed -- --db ./data/jazzy.db
//! ```
//!
//! ## Generated Data
//! - Companies: Kering, Marcolin, Salt Optics
//! - Brands: 1001 Gucci, 3001 Tom Ford, 7000 Salt
//! - Nine frames, each received through an opening ORDER of one unit dated
//!   2025-12-01, so every frame has a cost and a retail price

use chrono::{TimeZone, Utc};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use jazzy_core::{FrameIdentity, Gender, IntakeIntent, Money, NewBrand, SystemClock};
use jazzy_db::telemetry::init_tracing;
use jazzy_db::{AppConfig, Catalog, Database, InventoryEngine};

/// (company, brand id, brand name, allocation)
const BRANDS: &[(&str, i64, &str, i64)] = &[
    ("Kering", 1001, "Gucci", 12),
    ("Marcolin", 3001, "Tom Ford", 8),
    ("Salt Optics", 7000, "Salt", 10),
];

struct SampleFrame {
    brand_id: i64,
    style: &'static str,
    color: &'static str,
    size: &'static str,
    gender: Gender,
    frame_type: &'static str,
    product_type: &'static str,
    cost_dollars: i64,
    retail_dollars: i64,
}

const fn frame(
    brand_id: i64,
    style: &'static str,
    color: &'static str,
    size: &'static str,
    gender: Gender,
    frame_type: &'static str,
    product_type: &'static str,
    cost_dollars: i64,
    retail_dollars: i64,
) -> SampleFrame {
    SampleFrame {
        brand_id,
        style,
        color,
        size,
        gender,
        frame_type,
        product_type,
        cost_dollars,
        retail_dollars,
    }
}

const FRAMES: &[SampleFrame] = &[
    frame(1001, "GG0002", "TRT", "54", Gender::Men, "Zyl", "Optical", 180, 450),
    frame(1001, "GG0003", "GLD", "51", Gender::Unisex, "Semi-rimless", "Sunglasses", 195, 485),
    frame(3001, "TF5001", "BLK", "55", Gender::Men, "Zyl", "Optical", 210, 525),
    frame(3001, "TF5002", "HVN", "53", Gender::Women, "Zyl", "Sunglasses", 220, 550),
    frame(7000, "SALT001", "BLK", "50", Gender::Unisex, "Metal", "Optical", 160, 400),
    frame(7000, "SALT002", "SLV", "52", Gender::Men, "Metal", "Optical", 165, 410),
    frame(7000, "SALT003", "GRY", "49", Gender::Women, "Semi-rimless", "Optical", 155, 390),
    frame(7000, "SALT004", "BRN", "54", Gender::Unisex, "Zyl", "Sunglasses", 170, 425),
    frame(7000, "SALT005", "TRT", "51", Gender::Women, "Zyl", "Sunglasses", 168, 420),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut config = AppConfig::from_env();

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Jazzy Eyes Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $JAZZY_DB_PATH or ./jazzy.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Jazzy Eyes Seed Data Generator");
    println!("=================================");
    println!("Database: {}", config.database_path.display());
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.frames().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} frames", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let catalog = Catalog::new(db.clone());
    let engine = InventoryEngine::new(db.clone(), &config, Arc::new(SystemClock)).await?;

    println!();
    println!("Creating companies and brands...");
    for (company_name, brand_id, brand_name, allocation) in BRANDS {
        let company = match catalog.create_company(company_name).await {
            Ok(company) => company,
            Err(e) => {
                eprintln!("Failed to create company {}: {}", company_name, e);
                continue;
            }
        };

        catalog
            .create_brand(NewBrand {
                id: *brand_id,
                brand_name: brand_name.to_string(),
                company_id: company.id,
                allocation_quantity: *allocation,
            })
            .await?;
        println!("  ✓ {} ({}) under {}", brand_name, brand_id, company_name);
    }

    println!();
    println!("Receiving frames...");
    let invoice_date = Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).single();

    let mut received = 0;
    for sample in FRAMES {
        let intent = IntakeIntent {
            identity: FrameIdentity::new(sample.brand_id, sample.style, sample.color, sample.size),
            gender: sample.gender,
            frame_type: sample.frame_type.to_string(),
            product_type: sample.product_type.to_string(),
            quantity: Some(1),
            unit_cost: Money::from_dollars(sample.cost_dollars),
            unit_price: Money::from_dollars(sample.retail_dollars),
            invoice_date,
            notes: Some("Seed data".to_string()),
        };

        match engine.intake(intent).await {
            Ok(outcome) => {
                received += 1;
                println!(
                    "  ✓ {} at {}",
                    outcome.frame.composite_id,
                    Money::from_cents(outcome.entry.unit_price_cents)
                );
            }
            Err(e) => eprintln!("Failed to receive {}-{}: {}", sample.brand_id, sample.style, e),
        }
    }

    println!();
    println!("✓ Received {} frames", received);

    let listing = db.frames().search("GG", None, 10).await?;
    println!("  Search 'GG': {} results", listing.len());

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
