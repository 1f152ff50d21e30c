//! # Seed Data Generator
//!
//! Populates the database with demo factories and a tiered catalog.
//!
//! ## Usage
//! ```bash
//! # Default database path
//! cargo run -p stitch-db --bin seed
//!
//! # Specify database path
//! cargo run -p stitch-db --bin seed -- --db ./data/stitch.db
//!
//! # More products per factory
//! cargo run -p stitch-db --bin seed -- --per-factory 12
//! ```
//!
//! ## Generated Data
//! - One factory per entry in [`FACTORIES`], the first half verified
//! - Products cycling through [`GARMENTS`], each with three price tiers
//!   derived from its base price (-10% from 100 pieces, -20% from 500)
//! - MOQ of 50 or 100 pieces, sample price of 1.5 × base

use chrono::Utc;
use rust_decimal::Decimal;
use std::env;
use stitch_core::tiers::validate_tier_set;
use stitch_core::{Factory, PriceTier, Product, TierRecord};
use stitch_db::{Database, DbConfig};
use uuid::Uuid;

/// (name, location, specialties)
const FACTORIES: &[(&str, &str, &str)] = &[
    ("Nile Fleece Works", "Mahalla", "fleece, knitwear"),
    ("Delta Denim Co.", "10th of Ramadan", "denim, workwear"),
    ("Alexandria Cotton Mills", "Alexandria", "t-shirts, polos"),
    ("Sinai Sportswear", "Suez", "activewear"),
    ("Giza Uniform House", "Giza", "uniforms, workwear"),
    ("Red Sea Knits", "Hurghada", "knitwear, sweaters"),
];

/// (name, category, base price in cents)
const GARMENTS: &[(&str, &str, i64)] = &[
    ("Heavyweight Hoodie", "outerwear", 12_000),
    ("Classic Crew T-Shirt", "tops", 3_500),
    ("Pique Polo", "tops", 5_500),
    ("Slim Fit Jeans", "denim", 9_000),
    ("Work Jacket", "outerwear", 15_000),
    ("Jogger Pants", "bottoms", 6_500),
    ("Cable Knit Sweater", "knitwear", 11_000),
    ("Performance Tee", "activewear", 4_500),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut per_factory: usize = 4;
    let mut db_path = String::from("./stitch_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--per-factory" | "-p" => {
                if i + 1 < args.len() {
                    per_factory = args[i + 1].parse().unwrap_or(4);
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
                println!("Stitch Market Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --per-factory <N>  Products per factory (default: 4)");
                println!("  -d, --db <PATH>        Database file path (default: ./stitch_dev.db)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Stitch Market Seed Data Generator");
    println!("=================================");
    println!("Database: {}", db_path);
    println!("Products per factory: {}", per_factory);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.factories().search("", 1).await?;
    if !existing.is_empty() {
        println!("⚠ Database already has factories");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut products = 0;

    for (factory_idx, (name, location, specialties)) in FACTORIES.iter().enumerate() {
        let factory = generate_factory(name, location, specialties, factory_idx);
        db.factories().insert(&factory).await?;
        if factory_idx < FACTORIES.len() / 2 {
            db.factories().set_verified(&factory.id, true).await?;
        }

        for slot in 0..per_factory {
            let seed = factory_idx * per_factory + slot;
            let (product, tiers) = generate_product(&factory.id, seed)?;

            if let Err(e) = db.products().insert(&product, &tiers).await {
                eprintln!("Failed to insert {}: {}", product.name, e);
                continue;
            }
            products += 1;
        }

        println!("  {} ({} products)", factory.name, per_factory);
    }

    println!();
    println!(
        "✓ Generated {} factories and {} products in {:?}",
        FACTORIES.len(),
        products,
        start.elapsed()
    );

    let hoodies = db.products().search("hoodie", None, 10).await?;
    println!("  Search 'hoodie': {} results", hoodies.len());
    println!("  Categories: {}", db.products().categories().await?.join(", "));

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn generate_factory(name: &str, location: &str, specialties: &str, seed: usize) -> Factory {
    let now = Utc::now();

    Factory {
        id: Uuid::new_v4().to_string(),
        owner_id: format!("seed-owner-{}", seed + 1),
        name: name.to_string(),
        location: location.to_string(),
        description: Some(format!("{} manufacturer based in {}", specialties, location)),
        specialties: Some(specialties.to_string()),
        is_verified: false,
        created_at: now,
        updated_at: now,
    }
}

/// Builds a product and its tiers, checked the same way a factory's
/// tier form is.
fn generate_product(factory_id: &str, seed: usize) -> Result<(Product, Vec<PriceTier>), Box<dyn std::error::Error>> {
    let now = Utc::now();
    let (name, category, base_cents) = GARMENTS[seed % GARMENTS.len()];

    let base_price = Decimal::new(base_cents, 2);
    let moq = if seed % 2 == 0 { 50 } else { 100 };

    let records = vec![
        tier_record(1, Some(99), base_price),
        tier_record(100, Some(499), base_price * Decimal::new(90, 2)),
        tier_record(500, None, base_price * Decimal::new(80, 2)),
    ];
    let tiers = validate_tier_set(&records)?;

    let product = Product {
        id: Uuid::new_v4().to_string(),
        factory_id: factory_id.to_string(),
        name: name.to_string(),
        description: None,
        category: Some(category.to_string()),
        base_price,
        moq,
        sample_price: Some((base_price * Decimal::new(15, 1)).round_dp(2)),
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    Ok((product, tiers))
}

fn tier_record(min_quantity: i64, max_quantity: Option<i64>, price: Decimal) -> TierRecord {
    TierRecord {
        min_quantity,
        max_quantity,
        price: price.round_dp(2).to_string(),
    }
}
