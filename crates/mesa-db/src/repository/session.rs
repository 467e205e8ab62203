//! # Cash Session Repository
//!
//! Per-cashier open/close session lifecycle and totals reconciliation.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Cash Session Lifecycle                             │
//! │                                                                         │
//! │  1. OPEN (explicit or lazy)                                             │
//! │     └── open() / get_or_open() → CashSession { status: Open }           │
//! │         Guard: partial unique index on (cashier_id) WHERE status='open' │
//! │         — the INSERT itself is the check, never read-then-insert        │
//! │                                                                         │
//! │  2. COLLECT                                                             │
//! │     └── every settlement links its invoice to the open session          │
//! │                                                                         │
//! │  3. CLOSE                                                               │
//! │     └── close(declared_cash, declared_card)                             │
//! │         system_* recomputed from ACTIVE invoices (VOID excluded)        │
//! │         diff_* = declared − system   (negative ⇒ drawer short)          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{not_found, DbError, PosError, PosResult};
use mesa_core::commands::CloseSession;
use mesa_core::validation::validate_id;
use mesa_core::{CashSession, CoreError, SessionStatus, SessionTotals};

/// Repository for cash session database operations.
#[derive(Debug, Clone)]
pub struct CashSessionRepository {
    pool: SqlitePool,
}

impl CashSessionRepository {
    /// Creates a new CashSessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CashSessionRepository { pool }
    }

    /// Opens a session for a cashier.
    ///
    /// ## Errors
    /// - `SessionAlreadyOpen` if the cashier already has one — enforced by
    ///   the storage-level unique index, so a concurrent second open loses
    ///   even when both raced past any prior read
    pub async fn open(&self, cashier_id: &str) -> PosResult<CashSession> {
        validate_id("cashier_id", cashier_id)?;

        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        open_on(&mut *conn, cashier_id).await
    }

    /// Returns the cashier's open session, opening one if none exists.
    ///
    /// Used by the settlement engine so every invoice is always linked to
    /// exactly one session.
    pub async fn get_or_open(&self, cashier_id: &str) -> PosResult<CashSession> {
        validate_id("cashier_id", cashier_id)?;

        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        get_or_open_on(&mut *conn, cashier_id).await
    }

    /// Gets a session by id.
    pub async fn get(&self, session_id: &str) -> PosResult<CashSession> {
        let session: Option<CashSession> =
            sqlx::query_as("SELECT * FROM cash_sessions WHERE id = ?1")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?;

        session.ok_or_else(|| not_found("cash session", session_id))
    }

    /// Finds the cashier's currently open session, if any.
    pub async fn find_open_by_cashier(&self, cashier_id: &str) -> PosResult<Option<CashSession>> {
        let session: Option<CashSession> =
            sqlx::query_as("SELECT * FROM cash_sessions WHERE cashier_id = ?1 AND status = 'open'")
                .bind(cashier_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(session)
    }

    /// Lists a cashier's sessions, newest first.
    pub async fn find_by_cashier(&self, cashier_id: &str) -> PosResult<Vec<CashSession>> {
        let sessions: Vec<CashSession> = sqlx::query_as(
            "SELECT * FROM cash_sessions WHERE cashier_id = ?1 ORDER BY opened_at DESC",
        )
        .bind(cashier_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    /// Closes a session against the cashier's counted drawer.
    ///
    /// Recomputes system totals from the session's ACTIVE invoices (VOID
    /// excluded), computes `diff_* = declared − system`, and transitions to
    /// CLOSED — all in one transaction.
    ///
    /// ## Errors
    /// - `SessionAlreadyClosed` on a second close
    pub async fn close(&self, cmd: CloseSession) -> PosResult<CashSession> {
        cmd.validate()?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let session: Option<CashSession> =
            sqlx::query_as("SELECT * FROM cash_sessions WHERE id = ?1")
                .bind(&cmd.session_id)
                .fetch_optional(&mut *tx)
                .await?;
        let session = session.ok_or_else(|| not_found("cash session", &cmd.session_id))?;

        if session.status == SessionStatus::Closed {
            return Err(PosError::Domain(CoreError::SessionAlreadyClosed {
                session_id: cmd.session_id.clone(),
            }));
        }

        // System totals from active invoices only
        let (system_cash, system_card): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(cash_cents), 0), COALESCE(SUM(card_cents), 0)
            FROM invoices
            WHERE session_id = ?1 AND status = 'active'
            "#,
        )
        .bind(&cmd.session_id)
        .fetch_one(&mut *tx)
        .await?;

        let diff_cash = cmd.declared_cash_cents - system_cash;
        let diff_card = cmd.declared_card_cents - system_card;
        let closed_at = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE cash_sessions SET
                declared_cash_cents = ?2,
                declared_card_cents = ?3,
                system_cash_cents = ?4,
                system_card_cents = ?5,
                diff_cash_cents = ?6,
                diff_card_cents = ?7,
                status = 'closed',
                closed_at = ?8,
                version = version + 1
            WHERE id = ?1 AND status = 'open' AND version = ?9
            "#,
        )
        .bind(&cmd.session_id)
        .bind(cmd.declared_cash_cents)
        .bind(cmd.declared_card_cents)
        .bind(system_cash)
        .bind(system_card)
        .bind(diff_cash)
        .bind(diff_card)
        .bind(closed_at)
        .bind(session.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PosError::Domain(CoreError::version_conflict(
                "cash session",
                &cmd.session_id,
            )));
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            session_id = %cmd.session_id,
            system_cash, system_card, diff_cash, diff_card,
            "Cash session closed"
        );

        self.get(&cmd.session_id).await
    }

    /// Live totals over the cashier's open session: invoice count and
    /// cash/card sums of its ACTIVE invoices. Read-only; zeros when the
    /// cashier has no open session.
    pub async fn totals(&self, cashier_id: &str) -> PosResult<SessionTotals> {
        validate_id("cashier_id", cashier_id)?;

        let session = match self.find_open_by_cashier(cashier_id).await? {
            Some(session) => session,
            None => return Ok(SessionTotals::default()),
        };

        let (invoice_count, cash_cents, card_cents): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(id), COALESCE(SUM(cash_cents), 0), COALESCE(SUM(card_cents), 0)
            FROM invoices
            WHERE session_id = ?1 AND status = 'active'
            "#,
        )
        .bind(&session.id)
        .fetch_one(&self.pool)
        .await?;

        Ok(SessionTotals {
            invoice_count,
            cash_cents,
            card_cents,
        })
    }
}

// =============================================================================
// Transaction-joining helpers
// =============================================================================

/// Opens a session on an existing connection. The partial unique index is
/// the only guard: a lost race surfaces as `SessionAlreadyOpen`.
pub(crate) async fn open_on(
    conn: &mut SqliteConnection,
    cashier_id: &str,
) -> PosResult<CashSession> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1 AND is_active = 1)")
            .bind(cashier_id)
            .fetch_one(&mut *conn)
            .await?;
    if !exists {
        return Err(not_found("user", cashier_id));
    }

    let session = CashSession {
        id: Uuid::new_v4().to_string(),
        cashier_id: cashier_id.to_string(),
        opened_at: Utc::now(),
        closed_at: None,
        declared_cash_cents: None,
        declared_card_cents: None,
        system_cash_cents: 0,
        system_card_cents: 0,
        diff_cash_cents: None,
        diff_card_cents: None,
        status: SessionStatus::Open,
        version: 0,
    };

    let inserted = sqlx::query(
        r#"
        INSERT INTO cash_sessions (
            id, cashier_id, opened_at, closed_at,
            declared_cash_cents, declared_card_cents,
            system_cash_cents, system_card_cents,
            diff_cash_cents, diff_card_cents,
            status, version
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&session.id)
    .bind(&session.cashier_id)
    .bind(session.opened_at)
    .bind(session.closed_at)
    .bind(session.declared_cash_cents)
    .bind(session.declared_card_cents)
    .bind(session.system_cash_cents)
    .bind(session.system_card_cents)
    .bind(session.diff_cash_cents)
    .bind(session.diff_card_cents)
    .bind(session.status)
    .bind(session.version)
    .execute(conn)
    .await;

    match inserted {
        Ok(_) => {
            debug!(session_id = %session.id, cashier_id = %cashier_id, "Cash session opened");
            Ok(session)
        }
        Err(e) => {
            let db_err = DbError::from(e);
            if db_err.is_unique_violation_on("cashier_id") {
                Err(PosError::Domain(CoreError::SessionAlreadyOpen {
                    cashier_id: cashier_id.to_string(),
                }))
            } else {
                Err(PosError::Storage(db_err))
            }
        }
    }
}

/// Returns the cashier's open session on an existing connection, opening
/// one if none exists. A lost open race re-reads the winner's row.
pub(crate) async fn get_or_open_on(
    conn: &mut SqliteConnection,
    cashier_id: &str,
) -> PosResult<CashSession> {
    let existing: Option<CashSession> =
        sqlx::query_as("SELECT * FROM cash_sessions WHERE cashier_id = ?1 AND status = 'open'")
            .bind(cashier_id)
            .fetch_optional(&mut *conn)
            .await?;

    if let Some(session) = existing {
        return Ok(session);
    }

    match open_on(&mut *conn, cashier_id).await {
        Ok(session) => Ok(session),
        Err(PosError::Domain(CoreError::SessionAlreadyOpen { .. })) => {
            let session: Option<CashSession> = sqlx::query_as(
                "SELECT * FROM cash_sessions WHERE cashier_id = ?1 AND status = 'open'",
            )
            .bind(cashier_id)
            .fetch_optional(conn)
            .await?;

            session.ok_or_else(|| not_found("cash session", cashier_id))
        }
        Err(e) => Err(e),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[tokio::test]
    async fn open_twice_without_close_fails() {
        let db = testing::mem_db().await;
        let cashier = testing::seed_user(&db).await;

        db.sessions().open(&cashier).await.unwrap();
        let err = db.sessions().open(&cashier).await.unwrap_err();

        assert!(matches!(
            err,
            PosError::Domain(CoreError::SessionAlreadyOpen { .. })
        ));
    }

    #[tokio::test]
    async fn open_close_reopen_cycle() {
        let db = testing::mem_db().await;
        let cashier = testing::seed_user(&db).await;

        let first = db.sessions().open(&cashier).await.unwrap();
        db.sessions()
            .close(CloseSession {
                session_id: first.id.clone(),
                declared_cash_cents: 0,
                declared_card_cents: 0,
            })
            .await
            .unwrap();

        // a new session can open once the first is closed
        let second = db.sessions().open(&cashier).await.unwrap();
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn get_or_open_reuses_the_open_session() {
        let db = testing::mem_db().await;
        let cashier = testing::seed_user(&db).await;

        let a = db.sessions().get_or_open(&cashier).await.unwrap();
        let b = db.sessions().get_or_open(&cashier).await.unwrap();
        assert_eq!(a.id, b.id);
    }

    #[tokio::test]
    async fn close_twice_fails() {
        let db = testing::mem_db().await;
        let cashier = testing::seed_user(&db).await;
        let session = db.sessions().open(&cashier).await.unwrap();

        let cmd = CloseSession {
            session_id: session.id.clone(),
            declared_cash_cents: 0,
            declared_card_cents: 0,
        };
        db.sessions().close(cmd.clone()).await.unwrap();
        let err = db.sessions().close(cmd).await.unwrap_err();

        assert!(matches!(
            err,
            PosError::Domain(CoreError::SessionAlreadyClosed { .. })
        ));
    }

    #[tokio::test]
    async fn close_computes_diffs_against_declared() {
        let db = testing::mem_db().await;
        let cashier = testing::seed_user(&db).await;
        let session = db.sessions().open(&cashier).await.unwrap();

        // no invoices: system totals are zero, diffs equal declared
        let closed = db
            .sessions()
            .close(CloseSession {
                session_id: session.id.clone(),
                declared_cash_cents: 5000,
                declared_card_cents: 2000,
            })
            .await
            .unwrap();

        assert_eq!(closed.system_cash_cents, 0);
        assert_eq!(closed.system_card_cents, 0);
        assert_eq!(closed.diff_cash_cents, Some(5000));
        assert_eq!(closed.diff_card_cents, Some(2000));
        assert_eq!(closed.status, SessionStatus::Closed);
        assert!(closed.closed_at.is_some());
    }

    #[tokio::test]
    async fn totals_without_open_session_are_zero() {
        let db = testing::mem_db().await;
        let cashier = testing::seed_user(&db).await;

        let totals = db.sessions().totals(&cashier).await.unwrap();
        assert_eq!(totals.invoice_count, 0);
        assert_eq!(totals.cash_cents, 0);
        assert_eq!(totals.card_cents, 0);
    }

    #[tokio::test]
    async fn open_for_unknown_cashier_fails() {
        let db = testing::mem_db().await;
        let err = db
            .sessions()
            .open("550e8400-e29b-41d4-a716-446655440000")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
