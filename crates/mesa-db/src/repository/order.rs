//! # Order Repository
//!
//! Open-tab lifecycle: create, line mutations, cancel, settle-side
//! transitions and the open-order queries the floor reconciliation uses.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CREATE (one transaction)                                            │
//! │     └── create() → Order { status: Open }                               │
//! │         lines resolved against the catalog, prices snapshotted          │
//! │         table (if any) marked occupied                                  │
//! │                                                                         │
//! │  2. MUTATE (while Open)                                                 │
//! │     └── add_line()        merge semantics per product                   │
//! │     └── update_line_qty() exact quantity, ownership-checked             │
//! │     └── remove_line()                                                   │
//! │         every mutation bumps the order version                          │
//! │                                                                         │
//! │  3. CLOSE (one-way, never reversed)                                     │
//! │     └── cancel()         → Cancelled, table freed here                  │
//! │     └── mark_invoiced()  → Invoiced, table freed by the settlement      │
//! │                            engine (avoids double-free when several      │
//! │                            orders share one table)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{not_found, DbError, PosError, PosResult};
use crate::repository::table;
use mesa_core::commands::{AddLine, CreateOrder, NewLine, SetLineQuantity};
use mesa_core::{CoreError, Order, OrderLine, OrderStatus, Product, TableStatus};

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Opens a tab.
    ///
    /// The user is mandatory; the table is optional. An empty line list is
    /// the bar-tab pattern (legal because the order starts OPEN). Duplicate
    /// products in the initial lines merge into one line. Each line
    /// resolves its product, defaults the unit price to the current catalog
    /// price, and snapshots it.
    ///
    /// Side effect: occupies the table if one is given.
    pub async fn create(&self, cmd: CreateOrder) -> PosResult<Order> {
        cmd.validate()?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let user_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1 AND is_active = 1)",
        )
        .bind(&cmd.user_id)
        .fetch_one(&mut *tx)
        .await?;
        if !user_exists {
            return Err(not_found("user", &cmd.user_id));
        }

        if let Some(table_id) = &cmd.table_id {
            let table_exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM dining_tables WHERE id = ?1)")
                    .bind(table_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if !table_exists {
                return Err(not_found("table", table_id));
            }
        }

        let order = Order {
            id: Uuid::new_v4().to_string(),
            table_id: cmd.table_id.clone(),
            user_id: cmd.user_id.clone(),
            status: OrderStatus::Open,
            notes: cmd.notes.clone(),
            created_at: Utc::now(),
            version: 0,
        };

        sqlx::query(
            r#"
            INSERT INTO orders (id, table_id, user_id, status, notes, created_at, version)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&order.id)
        .bind(&order.table_id)
        .bind(&order.user_id)
        .bind(order.status)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.version)
        .execute(&mut *tx)
        .await?;

        for line in merge_new_lines(cmd.lines) {
            let product = fetch_product(&mut *tx, &line.product_id).await?;
            let unit_price = line.unit_price_cents.unwrap_or(product.price_cents);
            insert_line(&mut *tx, &order.id, &product.id, line.quantity, unit_price).await?;
        }

        if let Some(table_id) = &order.table_id {
            table::set_status_on(&mut *tx, table_id, TableStatus::Occupied).await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_id = %order.id,
            table_id = ?order.table_id,
            user_id = %order.user_id,
            "Order created"
        );

        Ok(order)
    }

    /// Gets an order by id.
    pub async fn get(&self, order_id: &str) -> PosResult<Order> {
        let order: Option<Order> = sqlx::query_as("SELECT * FROM orders WHERE id = ?1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        order.ok_or_else(|| not_found("order", order_id))
    }

    /// Gets the lines of an order, in ring-up order.
    pub async fn lines(&self, order_id: &str) -> PosResult<Vec<OrderLine>> {
        let lines: Vec<OrderLine> =
            sqlx::query_as("SELECT * FROM order_lines WHERE order_id = ?1 ORDER BY created_at, id")
                .bind(order_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(lines)
    }

    /// Adds a product to an open order.
    ///
    /// Merge semantics: if the order already has a line for this product,
    /// its quantity increases and the unit price refreshes from the catalog
    /// — an order never carries duplicate lines for one product.
    pub async fn add_line(&self, cmd: AddLine) -> PosResult<OrderLine> {
        cmd.validate()?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let order = fetch_order(&mut *tx, &cmd.order_id).await?;
        require_open(&order)?;
        bump_order_version(&mut *tx, &order).await?;

        let product = fetch_product(&mut *tx, &cmd.product_id).await?;

        let existing: Option<OrderLine> =
            sqlx::query_as("SELECT * FROM order_lines WHERE order_id = ?1 AND product_id = ?2")
                .bind(&cmd.order_id)
                .bind(&cmd.product_id)
                .fetch_optional(&mut *tx)
                .await?;

        let line = match existing {
            Some(mut line) => {
                line.quantity += cmd.quantity;
                line.unit_price_cents = product.price_cents;
                line.subtotal_cents = line.quantity * line.unit_price_cents;

                sqlx::query(
                    r#"
                    UPDATE order_lines
                    SET quantity = ?2, unit_price_cents = ?3, subtotal_cents = ?4
                    WHERE id = ?1
                    "#,
                )
                .bind(&line.id)
                .bind(line.quantity)
                .bind(line.unit_price_cents)
                .bind(line.subtotal_cents)
                .execute(&mut *tx)
                .await?;

                debug!(
                    order_id = %cmd.order_id,
                    product_id = %cmd.product_id,
                    quantity = line.quantity,
                    "Merged quantity into existing line"
                );
                line
            }
            None => {
                insert_line(
                    &mut *tx,
                    &cmd.order_id,
                    &product.id,
                    cmd.quantity,
                    product.price_cents,
                )
                .await?
            }
        };

        tx.commit().await.map_err(DbError::from)?;
        Ok(line)
    }

    /// Sets the exact quantity of a line, refreshing the unit price from
    /// the catalog and recomputing the subtotal.
    ///
    /// Fails `LineNotInOrder` if the line belongs to a different order.
    pub async fn update_line_qty(&self, cmd: SetLineQuantity) -> PosResult<OrderLine> {
        cmd.validate()?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let mut line = fetch_line(&mut *tx, &cmd.line_id).await?;
        if line.order_id != cmd.order_id {
            return Err(PosError::Domain(CoreError::LineNotInOrder {
                line_id: cmd.line_id.clone(),
                order_id: cmd.order_id.clone(),
            }));
        }

        let order = fetch_order(&mut *tx, &cmd.order_id).await?;
        require_open(&order)?;
        bump_order_version(&mut *tx, &order).await?;

        let product = fetch_product(&mut *tx, &line.product_id).await?;

        line.quantity = cmd.quantity;
        line.unit_price_cents = product.price_cents;
        line.subtotal_cents = line.quantity * line.unit_price_cents;

        sqlx::query(
            r#"
            UPDATE order_lines
            SET quantity = ?2, unit_price_cents = ?3, subtotal_cents = ?4
            WHERE id = ?1
            "#,
        )
        .bind(&line.id)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.subtotal_cents)
        .execute(&mut *tx)
        .await?;

        tx.commit().await.map_err(DbError::from)?;
        Ok(line)
    }

    /// Removes a line from its (open) order.
    pub async fn remove_line(&self, line_id: &str) -> PosResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let line = fetch_line(&mut *tx, line_id).await?;
        let order = fetch_order(&mut *tx, &line.order_id).await?;
        require_open(&order)?;
        bump_order_version(&mut *tx, &order).await?;

        sqlx::query("DELETE FROM order_lines WHERE id = ?1")
            .bind(line_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await.map_err(DbError::from)?;

        debug!(line_id = %line_id, order_id = %line.order_id, "Line removed");
        Ok(())
    }

    /// Cancels an open order and frees its table, if any.
    pub async fn cancel(&self, order_id: &str) -> PosResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let order = fetch_order(&mut *tx, order_id).await?;
        require_open(&order)?;

        let result = sqlx::query(
            "UPDATE orders SET status = 'cancelled', version = version + 1 WHERE id = ?1 AND status = 'open' AND version = ?2",
        )
        .bind(order_id)
        .bind(order.version)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(PosError::Domain(CoreError::version_conflict(
                "order", order_id,
            )));
        }

        if let Some(table_id) = &order.table_id {
            table::set_status_on(&mut *tx, table_id, TableStatus::Free).await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(order_id = %order_id, "Order cancelled");
        Ok(())
    }

    /// Marks an open order INVOICED.
    ///
    /// Does NOT free the table: that is the settlement engine's job, so a
    /// table shared by several consolidated orders is freed exactly once.
    pub async fn mark_invoiced(&self, order_id: &str) -> PosResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let order = fetch_order(&mut *tx, order_id).await?;
        require_open(&order)?;
        mark_invoiced_on(&mut *tx, order_id, order.version).await?;

        tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }

    /// Lists all open orders, oldest first.
    pub async fn find_open(&self) -> PosResult<Vec<Order>> {
        let orders: Vec<Order> =
            sqlx::query_as("SELECT * FROM orders WHERE status = 'open' ORDER BY created_at, id")
                .fetch_all(&self.pool)
                .await?;

        Ok(orders)
    }

    /// Lists the open orders of a table, oldest first.
    pub async fn find_open_by_table(&self, table_id: &str) -> PosResult<Vec<Order>> {
        let orders: Vec<Order> = sqlx::query_as(
            "SELECT * FROM orders WHERE table_id = ?1 AND status = 'open' ORDER BY created_at, id",
        )
        .bind(table_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Ground truth for occupancy reconciliation: does any open order
    /// reference this table?
    pub async fn has_open_order(&self, table_id: &str) -> PosResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM orders WHERE table_id = ?1 AND status = 'open')",
        )
        .bind(table_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

// =============================================================================
// Transaction-joining helpers (used by the settlement engine too)
// =============================================================================

/// Fetches an order on an existing connection.
pub(crate) async fn fetch_order(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> PosResult<Order> {
    let order: Option<Order> = sqlx::query_as("SELECT * FROM orders WHERE id = ?1")
        .bind(order_id)
        .fetch_optional(conn)
        .await?;

    order.ok_or_else(|| not_found("order", order_id))
}

/// Fetches the lines of an order on an existing connection.
pub(crate) async fn fetch_lines(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> PosResult<Vec<OrderLine>> {
    let lines: Vec<OrderLine> =
        sqlx::query_as("SELECT * FROM order_lines WHERE order_id = ?1 ORDER BY created_at, id")
            .bind(order_id)
            .fetch_all(conn)
            .await?;

    Ok(lines)
}

/// Fails `OrderNotOpen` unless the order is still OPEN.
pub(crate) fn require_open(order: &Order) -> PosResult<()> {
    if !order.is_open() {
        return Err(PosError::Domain(CoreError::OrderNotOpen {
            order_id: order.id.clone(),
            status: order.status.as_str().to_string(),
        }));
    }
    Ok(())
}

/// Transitions an open order to INVOICED with an optimistic version check.
/// A losing transaction gets `VersionConflict` and must be retried by the
/// caller after re-reading state.
pub(crate) async fn mark_invoiced_on(
    conn: &mut SqliteConnection,
    order_id: &str,
    expected_version: i64,
) -> PosResult<()> {
    let result = sqlx::query(
        "UPDATE orders SET status = 'invoiced', version = version + 1 WHERE id = ?1 AND status = 'open' AND version = ?2",
    )
    .bind(order_id)
    .bind(expected_version)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(PosError::Domain(CoreError::version_conflict(
            "order", order_id,
        )));
    }

    debug!(order_id = %order_id, "Order marked invoiced");
    Ok(())
}

// =============================================================================
// Private helpers
// =============================================================================

/// Merges duplicate products in an initial line list: quantities sum, the
/// first explicit price override wins.
fn merge_new_lines(lines: Vec<NewLine>) -> Vec<NewLine> {
    let mut merged: Vec<NewLine> = Vec::with_capacity(lines.len());

    for line in lines {
        match merged.iter_mut().find(|l| l.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity += line.quantity;
                if existing.unit_price_cents.is_none() {
                    existing.unit_price_cents = line.unit_price_cents;
                }
            }
            None => merged.push(line),
        }
    }

    merged
}

async fn fetch_product(conn: &mut SqliteConnection, product_id: &str) -> PosResult<Product> {
    let product: Option<Product> =
        sqlx::query_as("SELECT * FROM products WHERE id = ?1 AND is_active = 1")
            .bind(product_id)
            .fetch_optional(conn)
            .await?;

    product.ok_or_else(|| not_found("product", product_id))
}

async fn fetch_line(conn: &mut SqliteConnection, line_id: &str) -> PosResult<OrderLine> {
    let line: Option<OrderLine> = sqlx::query_as("SELECT * FROM order_lines WHERE id = ?1")
        .bind(line_id)
        .fetch_optional(conn)
        .await?;

    line.ok_or_else(|| not_found("line", line_id))
}

/// Bumps the order version so concurrent settlements see the mutation.
async fn bump_order_version(conn: &mut SqliteConnection, order: &Order) -> PosResult<()> {
    let result = sqlx::query(
        "UPDATE orders SET version = version + 1 WHERE id = ?1 AND status = 'open' AND version = ?2",
    )
    .bind(&order.id)
    .bind(order.version)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(PosError::Domain(CoreError::version_conflict(
            "order", &order.id,
        )));
    }

    Ok(())
}

async fn insert_line(
    conn: &mut SqliteConnection,
    order_id: &str,
    product_id: &str,
    quantity: i64,
    unit_price_cents: i64,
) -> PosResult<OrderLine> {
    let line = OrderLine {
        id: Uuid::new_v4().to_string(),
        order_id: order_id.to_string(),
        product_id: product_id.to_string(),
        quantity,
        unit_price_cents,
        subtotal_cents: quantity * unit_price_cents,
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO order_lines (id, order_id, product_id, quantity, unit_price_cents, subtotal_cents, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&line.id)
    .bind(&line.order_id)
    .bind(&line.product_id)
    .bind(line.quantity)
    .bind(line.unit_price_cents)
    .bind(line.subtotal_cents)
    .bind(line.created_at)
    .execute(conn)
    .await?;

    Ok(line)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use mesa_core::commands::{AddLine, CreateOrder, NewLine, SetLineQuantity};
    use mesa_core::TableStatus;

    #[tokio::test]
    async fn create_order_with_lines_snapshots_prices() {
        let db = testing::mem_db().await;
        let user = testing::seed_user(&db).await;
        let product = testing::seed_product(&db, "Casado", 4500).await;

        let order = db
            .orders()
            .create(CreateOrder {
                user_id: user.clone(),
                table_id: None,
                notes: None,
                lines: vec![NewLine {
                    product_id: product.clone(),
                    quantity: 2,
                    unit_price_cents: None,
                }],
            })
            .await
            .unwrap();

        let lines = db.orders().lines(&order.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[0].unit_price_cents, 4500);
        assert_eq!(lines[0].subtotal_cents, 9000);

        // price changes later do not touch the snapshot
        db.products().update_price(&product, 5000).await.unwrap();
        let lines = db.orders().lines(&order.id).await.unwrap();
        assert_eq!(lines[0].unit_price_cents, 4500);
    }

    #[tokio::test]
    async fn create_order_occupies_its_table() {
        let db = testing::mem_db().await;
        let user = testing::seed_user(&db).await;
        let table = testing::seed_table(&db).await;

        db.orders()
            .create(CreateOrder {
                user_id: user,
                table_id: Some(table.clone()),
                notes: None,
                lines: vec![],
            })
            .await
            .unwrap();

        assert_eq!(
            db.floor().get_table(&table).await.unwrap().status,
            TableStatus::Occupied
        );
        assert!(db.orders().has_open_order(&table).await.unwrap());
    }

    #[tokio::test]
    async fn create_bar_tab_without_lines() {
        let db = testing::mem_db().await;
        let user = testing::seed_user(&db).await;

        let order = db
            .orders()
            .create(CreateOrder {
                user_id: user,
                table_id: None,
                notes: Some("barra".to_string()),
                lines: vec![],
            })
            .await
            .unwrap();

        assert!(order.is_open());
        assert!(db.orders().lines(&order.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_order_with_unknown_product_writes_nothing() {
        let db = testing::mem_db().await;
        let user = testing::seed_user(&db).await;

        let err = db
            .orders()
            .create(CreateOrder {
                user_id: user,
                table_id: None,
                notes: None,
                lines: vec![NewLine {
                    product_id: "550e8400-e29b-41d4-a716-446655440000".to_string(),
                    quantity: 1,
                    unit_price_cents: None,
                }],
            })
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(db.orders().find_open().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_merges_duplicate_products_in_initial_lines() {
        let db = testing::mem_db().await;
        let user = testing::seed_user(&db).await;
        let product = testing::seed_product(&db, "Cerveza", 1500).await;

        let order = db
            .orders()
            .create(CreateOrder {
                user_id: user,
                table_id: None,
                notes: None,
                lines: vec![
                    NewLine {
                        product_id: product.clone(),
                        quantity: 2,
                        unit_price_cents: None,
                    },
                    NewLine {
                        product_id: product.clone(),
                        quantity: 1,
                        unit_price_cents: None,
                    },
                ],
            })
            .await
            .unwrap();

        let lines = db.orders().lines(&order.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);
    }

    #[tokio::test]
    async fn add_line_merges_and_refreshes_price() {
        let db = testing::mem_db().await;
        let user = testing::seed_user(&db).await;
        let product = testing::seed_product(&db, "Cerveza", 1500).await;

        let order = testing::open_bar_tab(&db, &user).await;
        db.orders()
            .add_line(AddLine {
                order_id: order.clone(),
                product_id: product.clone(),
                quantity: 2,
            })
            .await
            .unwrap();

        // price drifts, then the same product is added again
        db.products().update_price(&product, 1700).await.unwrap();
        let line = db
            .orders()
            .add_line(AddLine {
                order_id: order.clone(),
                product_id: product.clone(),
                quantity: 3,
            })
            .await
            .unwrap();

        assert_eq!(line.quantity, 5);
        assert_eq!(line.unit_price_cents, 1700);
        assert_eq!(line.subtotal_cents, 8500);

        let lines = db.orders().lines(&order).await.unwrap();
        assert_eq!(lines.len(), 1, "no duplicate lines for one product");
    }

    #[tokio::test]
    async fn update_line_qty_checks_ownership() {
        let db = testing::mem_db().await;
        let user = testing::seed_user(&db).await;
        let product = testing::seed_product(&db, "Cerveza", 1500).await;

        let order_a = testing::open_bar_tab(&db, &user).await;
        let order_b = testing::open_bar_tab(&db, &user).await;
        let line = db
            .orders()
            .add_line(AddLine {
                order_id: order_a.clone(),
                product_id: product,
                quantity: 1,
            })
            .await
            .unwrap();

        let err = db
            .orders()
            .update_line_qty(SetLineQuantity {
                order_id: order_b,
                line_id: line.id.clone(),
                quantity: 4,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PosError::Domain(CoreError::LineNotInOrder { .. })
        ));

        let updated = db
            .orders()
            .update_line_qty(SetLineQuantity {
                order_id: order_a,
                line_id: line.id,
                quantity: 4,
            })
            .await
            .unwrap();
        assert_eq!(updated.quantity, 4);
        assert_eq!(updated.subtotal_cents, 6000);
    }

    #[tokio::test]
    async fn remove_line_deletes_it() {
        let db = testing::mem_db().await;
        let user = testing::seed_user(&db).await;
        let product = testing::seed_product(&db, "Cerveza", 1500).await;

        let order = testing::open_bar_tab(&db, &user).await;
        let line = db
            .orders()
            .add_line(AddLine {
                order_id: order.clone(),
                product_id: product,
                quantity: 1,
            })
            .await
            .unwrap();

        db.orders().remove_line(&line.id).await.unwrap();
        assert!(db.orders().lines(&order).await.unwrap().is_empty());
        assert!(db.orders().remove_line(&line.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn cancel_frees_the_table() {
        let db = testing::mem_db().await;
        let user = testing::seed_user(&db).await;
        let table = testing::seed_table(&db).await;
        let product = testing::seed_product(&db, "Cerveza", 1500).await;

        let order = testing::open_order_on_table(&db, &user, &table, &product, 1).await;
        db.orders().cancel(&order).await.unwrap();

        assert_eq!(
            db.orders().get(&order).await.unwrap().status,
            OrderStatus::Cancelled
        );
        assert_eq!(
            db.floor().get_table(&table).await.unwrap().status,
            TableStatus::Free
        );
    }

    #[tokio::test]
    async fn closed_orders_reject_mutation_and_second_close() {
        let db = testing::mem_db().await;
        let user = testing::seed_user(&db).await;
        let product = testing::seed_product(&db, "Cerveza", 1500).await;

        let order = testing::open_bar_tab(&db, &user).await;
        db.orders().cancel(&order).await.unwrap();

        let err = db
            .orders()
            .add_line(AddLine {
                order_id: order.clone(),
                product_id: product,
                quantity: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PosError::Domain(CoreError::OrderNotOpen { .. })
        ));

        assert!(matches!(
            db.orders().cancel(&order).await.unwrap_err(),
            PosError::Domain(CoreError::OrderNotOpen { .. })
        ));
        assert!(matches!(
            db.orders().mark_invoiced(&order).await.unwrap_err(),
            PosError::Domain(CoreError::OrderNotOpen { .. })
        ));
    }

    #[tokio::test]
    async fn mark_invoiced_leaves_table_occupied() {
        let db = testing::mem_db().await;
        let user = testing::seed_user(&db).await;
        let table = testing::seed_table(&db).await;
        let product = testing::seed_product(&db, "Cerveza", 1500).await;

        let order = testing::open_order_on_table(&db, &user, &table, &product, 1).await;
        db.orders().mark_invoiced(&order).await.unwrap();

        // freeing is the settlement engine's responsibility
        assert_eq!(
            db.floor().get_table(&table).await.unwrap().status,
            TableStatus::Occupied
        );
    }

    #[tokio::test]
    async fn open_order_queries() {
        let db = testing::mem_db().await;
        let user = testing::seed_user(&db).await;
        let table = testing::seed_table(&db).await;
        let product = testing::seed_product(&db, "Cerveza", 1500).await;

        let first = testing::open_order_on_table(&db, &user, &table, &product, 1).await;
        let second = testing::open_order_on_table(&db, &user, &table, &product, 2).await;

        let open = db.orders().find_open_by_table(&table).await.unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(open[0].id, first);
        assert_eq!(open[1].id, second);

        db.orders().cancel(&first).await.unwrap();
        db.orders().cancel(&second).await.unwrap();
        assert!(!db.orders().has_open_order(&table).await.unwrap());
    }
}
