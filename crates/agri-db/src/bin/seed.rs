//! # Seed Data Generator
//!
//! Populates the registry with demo farmers for development.
//!
//! ## Usage
//! ```bash
//! # Register the demo farmers in ./agri_dev.db
//! cargo run -p agri-db --bin seed
//!
//! # Specify database path
//! cargo run -p agri-db --bin seed -- --db ./data/agri.db
//! ```
//!
//! Every demo farmer gets an identifier `F{NNN}` and two or three crops
//! drawn from the registration crop list.

use agri_core::{FarmerRecord, CROP_OPTIONS};
use agri_db::{Database, DbConfig, DbError};
use std::env;

/// Demo farmer names.
const NAMES: &[&str] = &[
    "Jane Doe",
    "Amina Njoroge",
    "Baraka Otieno",
    "Chidi Okafor",
    "Dilnoza Karimova",
    "Esperanza Quispe",
    "Farida Haidari",
    "Gustavo Pereira",
    "Hoang Van Minh",
    "Ifeoma Eze",
    "Joseph Mwangi",
    "Kavita Rao",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./agri_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Agri Station Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./agri_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Agri Station Seed Data Generator");
    println!("==================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let mut registered = 0;
    let mut skipped = 0;

    for (index, name) in NAMES.iter().enumerate() {
        let farmer = FarmerRecord::new(format!("F{:03}", index + 1), *name, demo_crops(index))?;

        match db.farmers().create(&farmer).await {
            Ok(_) => registered += 1,
            Err(DbError::UniqueViolation { .. }) => skipped += 1,
            Err(e) => {
                eprintln!("Failed to register {}: {}", farmer.id, e);
            }
        }
    }

    println!();
    println!("✓ Registered {} farmers", registered);
    if skipped > 0 {
        println!("  Skipped {} already registered", skipped);
    }
    println!("  Registry now holds {} farmers", db.farmers().count().await?);

    db.close().await;
    Ok(())
}

/// Picks two or three crops for the farmer at `index`.
fn demo_crops(index: usize) -> Vec<String> {
    let count = 2 + index % 2;
    (0..count)
        .map(|offset| CROP_OPTIONS[(index * 3 + offset) % CROP_OPTIONS.len()].to_string())
        .collect()
}
