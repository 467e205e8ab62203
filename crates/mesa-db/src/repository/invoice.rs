//! # Invoice Repository — the Settlement Engine
//!
//! Turns open tabs (or a direct line list) into one priced, taxed,
//! discounted, paid invoice, keeping orders, tables, cash sessions and
//! product counters consistent.
//!
//! ## Settlement Pipeline (one transaction)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    settle_from_order / _table / _direct                 │
//! │                                                                         │
//! │  resolve order(s)            OPEN only; table variant loads ALL open    │
//! │       │                      orders of the table                        │
//! │       ▼                                                                 │
//! │  copy + consolidate lines    independent snapshot; duplicate products   │
//! │       │                      merge into one line (summed quantity)      │
//! │       ▼                                                                 │
//! │  read rates (Parameters)                                                │
//! │       ▼                                                                 │
//! │  compute breakdown           pure arithmetic in mesa-core; discount     │
//! │       │                      ceiling + payment checks fail BEFORE       │
//! │       │                      any write                                  │
//! │       ▼                                                                 │
//! │  link cash session           get-or-open for the resolved cashier       │
//! │       ▼                                                                 │
//! │  persist invoice + lines                                                │
//! │       ▼                                                                 │
//! │  mark order(s) INVOICED      optimistic version check on every order;   │
//! │       │                      a losing transaction rolls back entirely   │
//! │       ▼                                                                 │
//! │  free table (exactly once)                                              │
//! │       ▼                                                                 │
//! │  bump product counters       best-effort: logged-and-continue           │
//! │       ▼                                                                 │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Settlement has side effects and is therefore NOT safe to auto-retry
//! blindly; callers must re-check order state (or use an idempotency key
//! at the API layer) before retrying a failed call.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{not_found, DbError, PosError, PosResult};
use crate::repository::{order, params, product, session, table};
use mesa_core::commands::{SettleDirect, SettleOrder, SettleTable, SettleTerms};
use mesa_core::settlement::{self, SettleLine};
use mesa_core::{CoreError, Invoice, InvoiceLine, InvoiceStatus, Order};

/// Repository for invoice database operations and the settlement engine.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    // =========================================================================
    // Settlement
    // =========================================================================

    /// Settles one open order into an invoice.
    ///
    /// The cashier is the explicit `cashier_id` if given, else the order's
    /// owning user. The order's lines are copied into invoice-line
    /// snapshots, the order is marked INVOICED and its table (if any) is
    /// freed.
    pub async fn settle_from_order(&self, cmd: SettleOrder) -> PosResult<Invoice> {
        cmd.validate()?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let target = order::fetch_order(&mut *tx, &cmd.order_id).await?;
        order::require_open(&target)?;

        // the free at the end is checked against this version snapshot
        let table_version = match &target.table_id {
            Some(table_id) => Some(fetch_table_version(&mut tx, table_id).await?),
            None => None,
        };

        let cashier_id = resolve_cashier(cmd.cashier_id.as_deref(), Some(&target))?;
        let lines = load_settle_lines(&mut tx, &target.id).await?;

        let invoice = finalize(
            &mut tx,
            Some(target.id.as_str()),
            &cashier_id,
            &cmd.terms,
            lines,
        )
        .await?;

        order::mark_invoiced_on(&mut *tx, &target.id, target.version).await?;
        if let (Some(table_id), Some(version)) = (&target.table_id, table_version) {
            table::free_versioned_on(&mut *tx, table_id, version).await?;
        }
        bump_sale_counters(&mut tx, &invoice.id).await;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            invoice_id = %invoice.id,
            order_id = %target.id,
            total = invoice.total_cents,
            "Order settled"
        );

        Ok(invoice)
    }

    /// Settles ALL open orders of a table into one consolidated invoice.
    ///
    /// Lines are merged by product across the orders (quantities summed
    /// into one invoice line). Every consolidated order is marked INVOICED
    /// with its own optimistic version check and the table is freed exactly
    /// once. Fails not-found when the table has no open orders.
    pub async fn settle_from_table(&self, cmd: SettleTable) -> PosResult<Invoice> {
        cmd.validate()?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let table_version = fetch_table_version(&mut tx, &cmd.table_id).await?;

        let open_orders: Vec<Order> = sqlx::query_as(
            "SELECT * FROM orders WHERE table_id = ?1 AND status = 'open' ORDER BY created_at, id",
        )
        .bind(&cmd.table_id)
        .fetch_all(&mut *tx)
        .await?;

        if open_orders.is_empty() {
            return Err(not_found("open order for table", &cmd.table_id));
        }

        let cashier_id = resolve_cashier(cmd.cashier_id.as_deref(), open_orders.first())?;

        let mut lines = Vec::new();
        for open_order in &open_orders {
            lines.extend(load_settle_lines(&mut tx, &open_order.id).await?);
        }
        let lines = settlement::consolidate(lines);

        let invoice = finalize(
            &mut tx,
            open_orders.first().map(|o| o.id.as_str()),
            &cashier_id,
            &cmd.terms,
            lines,
        )
        .await?;

        for open_order in &open_orders {
            order::mark_invoiced_on(&mut *tx, &open_order.id, open_order.version).await?;
        }
        table::free_versioned_on(&mut *tx, &cmd.table_id, table_version).await?;
        bump_sale_counters(&mut tx, &invoice.id).await;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            invoice_id = %invoice.id,
            table_id = %cmd.table_id,
            orders = open_orders.len(),
            total = invoice.total_cents,
            "Table settled"
        );

        Ok(invoice)
    }

    /// Settles a direct sale (walk-up / bar) with no backing order.
    ///
    /// Lines are supplied directly: each resolves its product, defaults the
    /// unit price to the current catalog price, and duplicate products
    /// merge. The invoice carries no order reference.
    pub async fn settle_direct(&self, cmd: SettleDirect) -> PosResult<Invoice> {
        cmd.validate()?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let mut lines = Vec::with_capacity(cmd.lines.len());
        for entry in &cmd.lines {
            let found: Option<(String, i64)> = sqlx::query_as(
                "SELECT name, price_cents FROM products WHERE id = ?1 AND is_active = 1",
            )
            .bind(&entry.product_id)
            .fetch_optional(&mut *tx)
            .await?;

            let (name, price_cents) =
                found.ok_or_else(|| not_found("product", &entry.product_id))?;
            let unit_price = entry.unit_price_cents.unwrap_or(price_cents);
            lines.push(SettleLine::new(
                entry.product_id.clone(),
                name,
                entry.quantity,
                unit_price,
            ));
        }
        let lines = settlement::consolidate(lines);

        let invoice = finalize(&mut tx, None, &cmd.cashier_id, &cmd.terms, lines).await?;
        bump_sale_counters(&mut tx, &invoice.id).await;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            invoice_id = %invoice.id,
            cashier_id = %cmd.cashier_id,
            total = invoice.total_cents,
            "Direct sale settled"
        );

        Ok(invoice)
    }

    // =========================================================================
    // Void
    // =========================================================================

    /// Voids an invoice: the ACTIVE→VOID status flip and nothing else.
    ///
    /// Orders stay INVOICED, the table stays as settlement left it, the
    /// session link and product counters are preserved as audit trail.
    /// Session math is the only void-aware consumer: VOID invoices are
    /// excluded from system totals and live totals.
    pub async fn void(&self, invoice_id: &str) -> PosResult<Invoice> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let invoice: Option<Invoice> = sqlx::query_as("SELECT * FROM invoices WHERE id = ?1")
            .bind(invoice_id)
            .fetch_optional(&mut *tx)
            .await?;
        let invoice = invoice.ok_or_else(|| not_found("invoice", invoice_id))?;

        if invoice.status == InvoiceStatus::Void {
            return Err(PosError::Domain(CoreError::InvoiceAlreadyVoid {
                invoice_id: invoice_id.to_string(),
            }));
        }

        let result = sqlx::query(
            "UPDATE invoices SET status = 'void', version = version + 1 WHERE id = ?1 AND status = 'active' AND version = ?2",
        )
        .bind(invoice_id)
        .bind(invoice.version)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(PosError::Domain(CoreError::version_conflict(
                "invoice", invoice_id,
            )));
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(invoice_id = %invoice_id, "Invoice voided");
        self.get(invoice_id).await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Gets an invoice by id.
    pub async fn get(&self, invoice_id: &str) -> PosResult<Invoice> {
        let invoice: Option<Invoice> = sqlx::query_as("SELECT * FROM invoices WHERE id = ?1")
            .bind(invoice_id)
            .fetch_optional(&self.pool)
            .await?;

        invoice.ok_or_else(|| not_found("invoice", invoice_id))
    }

    /// Gets the line snapshots of an invoice.
    pub async fn lines(&self, invoice_id: &str) -> PosResult<Vec<InvoiceLine>> {
        let lines: Vec<InvoiceLine> =
            sqlx::query_as("SELECT * FROM invoice_lines WHERE invoice_id = ?1 ORDER BY rowid")
                .bind(invoice_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(lines)
    }

    /// Lists the invoices of a cash session, oldest first.
    pub async fn find_by_session(&self, session_id: &str) -> PosResult<Vec<Invoice>> {
        let invoices: Vec<Invoice> = sqlx::query_as(
            "SELECT * FROM invoices WHERE session_id = ?1 ORDER BY created_at, id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }

    /// Lists invoices in a created-at range, oldest first.
    pub async fn find_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PosResult<Vec<Invoice>> {
        let invoices: Vec<Invoice> = sqlx::query_as(
            "SELECT * FROM invoices WHERE created_at >= ?1 AND created_at < ?2 ORDER BY created_at, id",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }
}

// =============================================================================
// Pipeline helpers
// =============================================================================

/// Resolves the responsible cashier: explicit id wins, else the (first)
/// order's owning user.
fn resolve_cashier(explicit: Option<&str>, fallback: Option<&Order>) -> PosResult<String> {
    let resolved = explicit
        .map(str::to_string)
        .or_else(|| fallback.map(|o| o.user_id.clone()))
        .filter(|id| !id.trim().is_empty());

    resolved.ok_or(PosError::Domain(CoreError::CashierUnresolved))
}

/// Reads a table's current version (not-found if the table is missing).
async fn fetch_table_version(
    tx: &mut Transaction<'_, Sqlite>,
    table_id: &str,
) -> PosResult<i64> {
    let version: Option<i64> = sqlx::query_scalar("SELECT version FROM dining_tables WHERE id = ?1")
        .bind(table_id)
        .fetch_optional(&mut **tx)
        .await?;

    version.ok_or_else(|| not_found("table", table_id))
}

/// Loads an order's lines joined with product names, as settlement input.
async fn load_settle_lines(
    tx: &mut Transaction<'_, Sqlite>,
    order_id: &str,
) -> PosResult<Vec<SettleLine>> {
    let rows: Vec<(String, String, i64, i64, i64)> = sqlx::query_as(
        r#"
        SELECT ol.product_id, p.name, ol.quantity, ol.unit_price_cents, ol.subtotal_cents
        FROM order_lines ol
        JOIN products p ON p.id = ol.product_id
        WHERE ol.order_id = ?1
        ORDER BY ol.created_at, ol.id
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(product_id, name, quantity, unit_price_cents, subtotal_cents)| SettleLine {
                product_id,
                name,
                quantity,
                unit_price_cents,
                subtotal_cents,
            },
        )
        .collect())
}

/// The shared tail of every settlement variant: customer check, rates,
/// pure computation, session link, invoice + line persistence.
///
/// All business-rule failures (discount ceiling, insufficient payment)
/// surface here, before the first write of the settlement.
async fn finalize(
    tx: &mut Transaction<'_, Sqlite>,
    origin_order_id: Option<&str>,
    cashier_id: &str,
    terms: &SettleTerms,
    lines: Vec<SettleLine>,
) -> PosResult<Invoice> {
    if let Some(customer_id) = &terms.customer_id {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM customers WHERE id = ?1)")
            .bind(customer_id)
            .fetch_one(&mut **tx)
            .await?;
        if !exists {
            return Err(not_found("customer", customer_id));
        }
    }

    let rates = params::rates_on(&mut **tx).await?;
    let breakdown = settlement::compute(&lines, rates, terms.charges(), terms.tender())?;

    let cash_session = session::get_or_open_on(&mut **tx, cashier_id).await?;

    let invoice = Invoice {
        id: Uuid::new_v4().to_string(),
        order_id: origin_order_id.map(str::to_string),
        customer_id: terms.customer_id.clone(),
        cashier_id: cashier_id.to_string(),
        session_id: cash_session.id,
        subtotal_cents: breakdown.subtotal.cents(),
        tax_sales_cents: breakdown.tax_sales.cents(),
        tax_service_cents: breakdown.tax_service.cents(),
        discount_cents: breakdown.discount.cents(),
        total_cents: breakdown.total.cents(),
        cash_cents: breakdown.cash.cents(),
        card_cents: breakdown.card.cents(),
        change_cents: breakdown.change.cents(),
        status: InvoiceStatus::Active,
        created_at: Utc::now(),
        version: 0,
    };

    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, order_id, customer_id, cashier_id, session_id,
            subtotal_cents, tax_sales_cents, tax_service_cents,
            discount_cents, total_cents, cash_cents, card_cents, change_cents,
            status, created_at, version
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.order_id)
    .bind(&invoice.customer_id)
    .bind(&invoice.cashier_id)
    .bind(&invoice.session_id)
    .bind(invoice.subtotal_cents)
    .bind(invoice.tax_sales_cents)
    .bind(invoice.tax_service_cents)
    .bind(invoice.discount_cents)
    .bind(invoice.total_cents)
    .bind(invoice.cash_cents)
    .bind(invoice.card_cents)
    .bind(invoice.change_cents)
    .bind(invoice.status)
    .bind(invoice.created_at)
    .bind(invoice.version)
    .execute(&mut **tx)
    .await?;

    for line in &lines {
        sqlx::query(
            r#"
            INSERT INTO invoice_lines (
                id, invoice_id, product_id, name_snapshot,
                quantity, unit_price_cents, subtotal_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&invoice.id)
        .bind(&line.product_id)
        .bind(&line.name)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.subtotal_cents)
        .execute(&mut **tx)
        .await?;
    }

    Ok(invoice)
}

/// Increments the catalog sale counters for an invoice's lines.
///
/// Best-effort: a failure is logged and settlement continues — the counter
/// is not part of any financial invariant.
async fn bump_sale_counters(tx: &mut Transaction<'_, Sqlite>, invoice_id: &str) {
    let rows: Result<Vec<(String, i64)>, sqlx::Error> =
        sqlx::query_as("SELECT product_id, quantity FROM invoice_lines WHERE invoice_id = ?1")
            .bind(invoice_id)
            .fetch_all(&mut **tx)
            .await;

    let rows = match rows {
        Ok(rows) => rows,
        Err(e) => {
            warn!(invoice_id = %invoice_id, error = %e, "Skipping sale counters");
            return;
        }
    };

    for (product_id, quantity) in rows {
        if let Err(e) = product::increment_sales_on(&mut **tx, &product_id, quantity).await {
            warn!(
                product_id = %product_id,
                error = %e,
                "Failed to bump sale counter, continuing"
            );
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
