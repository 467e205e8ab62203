//! Shared helpers for repository tests: an in-memory database plus seeded
//! users, tables, products and open tabs.

use uuid::Uuid;

use crate::pool::{Database, DbConfig};
use mesa_core::commands::{CreateOrder, NewLine, SettleTerms};

/// Fresh, fully migrated in-memory database.
pub async fn mem_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

/// Inserts an active cashier and returns its id.
pub async fn seed_user(db: &Database) -> String {
    let id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO users (id, name, is_active) VALUES (?1, ?2, 1)")
        .bind(&id)
        .bind("Cajero de prueba")
        .execute(db.pool())
        .await
        .expect("seed user");
    id
}

/// Creates a room with one table and returns the table id.
pub async fn seed_table(db: &Database) -> String {
    let room = db.floor().create_room("Salón").await.expect("seed room");
    let identifier = format!("T-{}", &Uuid::new_v4().to_string()[..4]);
    db.floor()
        .create_table(&room.id, &identifier, 0.0, 0.0)
        .await
        .expect("seed table")
        .id
}

/// Creates a product (with its own group) and returns its id.
pub async fn seed_product(db: &Database, name: &str, price_cents: i64) -> String {
    let group = db
        .products()
        .create_group("Grupo de prueba")
        .await
        .expect("seed group");
    db.products()
        .create(&group.id, name, name, price_cents, false)
        .await
        .expect("seed product")
        .id
}

/// Opens an empty bar tab for the user and returns the order id.
pub async fn open_bar_tab(db: &Database, user_id: &str) -> String {
    db.orders()
        .create(CreateOrder {
            user_id: user_id.to_string(),
            table_id: None,
            notes: None,
            lines: vec![],
        })
        .await
        .expect("open bar tab")
        .id
}

/// Opens an order with one product line (no table) and returns the order id.
pub async fn open_order_with_product(
    db: &Database,
    user_id: &str,
    product_id: &str,
    quantity: i64,
) -> String {
    db.orders()
        .create(CreateOrder {
            user_id: user_id.to_string(),
            table_id: None,
            notes: None,
            lines: vec![NewLine {
                product_id: product_id.to_string(),
                quantity,
                unit_price_cents: None,
            }],
        })
        .await
        .expect("open order")
        .id
}

/// Opens an order on a table with one product line and returns the order id.
pub async fn open_order_on_table(
    db: &Database,
    user_id: &str,
    table_id: &str,
    product_id: &str,
    quantity: i64,
) -> String {
    db.orders()
        .create(CreateOrder {
            user_id: user_id.to_string(),
            table_id: Some(table_id.to_string()),
            notes: None,
            lines: vec![NewLine {
                product_id: product_id.to_string(),
                quantity,
                unit_price_cents: None,
            }],
        })
        .await
        .expect("open order on table")
        .id
}

/// Cash-only settle terms: both taxes on, no discount, no customer.
pub fn terms_cash(cash_cents: i64) -> SettleTerms {
    SettleTerms {
        customer_id: None,
        apply_sales_tax: true,
        apply_service_tax: true,
        discount_bps: 0,
        cash_cents,
        card_cents: 0,
    }
}
