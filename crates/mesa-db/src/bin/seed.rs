//! # Seed Data Generator
//!
//! Populates the database with demo data for development: rooms with
//! tables, a product catalog, cashiers and the parameters singleton
//! (already seeded by the migration).
//!
//! ## Usage
//! ```bash
//! cargo run -p mesa-db --bin seed
//!
//! # Specify database path
//! cargo run -p mesa-db --bin seed -- --db ./data/mesa.db
//! ```

use std::env;

use mesa_db::{Database, DbConfig};

/// Rooms and how many tables each gets.
const ROOMS: &[(&str, usize)] = &[("Salón principal", 12), ("Terraza", 6), ("Barra", 4)];

/// Catalog groups with (name, short name, price in cents, quick menu).
const GROUPS: &[(&str, &[(&str, &str, i64, bool)])] = &[
    (
        "Bebidas",
        &[
            ("Refresco natural", "Refresco", 1200, true),
            ("Café negro", "Café", 900, true),
            ("Cerveza nacional", "Cerveza", 1500, true),
            ("Batido de frutas", "Batido", 1800, false),
            ("Agua embotellada", "Agua", 800, true),
        ],
    ),
    (
        "Platos fuertes",
        &[
            ("Casado con pollo", "Casado pollo", 4500, true),
            ("Casado con carne", "Casado carne", 4800, true),
            ("Arroz con camarones", "Arroz camar.", 5500, false),
            ("Chifrijo", "Chifrijo", 3800, true),
            ("Olla de carne", "Olla carne", 5200, false),
        ],
    ),
    (
        "Entradas",
        &[
            ("Nachos con queso", "Nachos", 2800, true),
            ("Patacones", "Patacones", 2200, true),
            ("Empanadas (3 uds)", "Empanadas", 1800, false),
        ],
    ),
    (
        "Postres",
        &[
            ("Tres leches", "Tres leches", 2000, false),
            ("Flan de coco", "Flan", 1700, false),
        ],
    ),
];

/// Demo cashiers.
const CASHIERS: &[&str] = &["Ana Rojas", "Carlos Mora", "María Jiménez"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./mesa_dev.db");

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
                println!("Mesa POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./mesa_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Mesa POS Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Idempotence: skip if the catalog is already populated
    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Seeding floor plan...");
    let mut tables = 0usize;
    for (room_name, table_count) in ROOMS {
        let room = db.floor().create_room(room_name).await?;
        for n in 1..=*table_count {
            let identifier = format!("{}-{:02}", &room_name[..1], n);
            db.floor()
                .create_table(&room.id, &identifier, (n % 4) as f64, (n / 4) as f64)
                .await?;
            tables += 1;
        }
        println!("  {} ({} tables)", room_name, table_count);
    }

    println!();
    println!("Seeding catalog...");
    let mut products = 0usize;
    for (group_name, entries) in GROUPS {
        let group = db.products().create_group(group_name).await?;
        for (name, short_name, price_cents, quick_menu) in *entries {
            db.products()
                .create(&group.id, name, short_name, *price_cents, *quick_menu)
                .await?;
            products += 1;
        }
        println!("  {} ({} products)", group_name, entries.len());
    }

    println!();
    println!("Seeding cashiers...");
    for name in CASHIERS {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO users (id, name, is_active) VALUES (?1, ?2, 1)")
            .bind(&id)
            .bind(name)
            .execute(db.pool())
            .await?;
        println!("  {}", name);
    }

    let params = db.params().get().await?;

    println!();
    println!("✓ Seed complete!");
    println!(
        "  {} tables, {} products, {} cashiers",
        tables,
        products,
        CASHIERS.len()
    );
    println!(
        "  Taxes: sales {} bps, service {} bps, max discount {} bps",
        params.sales_tax_bps, params.service_tax_bps, params.max_discount_bps
    );

    Ok(())
}
