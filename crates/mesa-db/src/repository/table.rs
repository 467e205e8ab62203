//! # Floor Repository
//!
//! Rooms, dining tables, and occupancy.
//!
//! ## Occupancy Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A table is OCCUPIED iff at least one OPEN order references it.         │
//! │                                                                         │
//! │  Writers keep it true per operation:                                    │
//! │    create order w/ table ──► occupy                                     │
//! │    cancel order           ──► free                                      │
//! │    settle table/order     ──► free (exactly once per settlement)        │
//! │                                                                         │
//! │  There is no single transaction spanning every writer, so the invariant │
//! │  can drift (crash between commits, manual edits). `reconcile()` is the  │
//! │  explicit repair pass: it re-derives occupancy from open-order ground   │
//! │  truth, corrects drift, and logs every fix. `list_tables()` runs it     │
//! │  before returning, so readers always see a consistent floor.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `occupy`/`free` are idempotent setters: re-applying the current state is
//! not an error (two orders on one table both "occupy" it).

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{not_found, PosError, PosResult};
use mesa_core::validation::{validate_id, validate_name};
use mesa_core::{CoreError, DiningTable, Room, TableStatus};

/// Repository for floor-plan database operations.
#[derive(Debug, Clone)]
pub struct FloorRepository {
    pool: SqlitePool,
}

impl FloorRepository {
    /// Creates a new FloorRepository.
    pub fn new(pool: SqlitePool) -> Self {
        FloorRepository { pool }
    }

    // =========================================================================
    // Rooms
    // =========================================================================

    /// Creates a room.
    pub async fn create_room(&self, name: &str) -> PosResult<Room> {
        validate_name("name", name)?;

        let room = Room {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO rooms (id, name, is_active, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&room.id)
            .bind(&room.name)
            .bind(room.is_active)
            .bind(room.created_at)
            .execute(&self.pool)
            .await?;

        debug!(id = %room.id, name = %room.name, "Room created");
        Ok(room)
    }

    /// Lists active rooms.
    pub async fn list_rooms(&self) -> PosResult<Vec<Room>> {
        let rooms: Vec<Room> =
            sqlx::query_as("SELECT * FROM rooms WHERE is_active = 1 ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        Ok(rooms)
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Creates a table in a room. `identifier` is unique per room.
    pub async fn create_table(
        &self,
        room_id: &str,
        identifier: &str,
        position_x: f64,
        position_y: f64,
    ) -> PosResult<DiningTable> {
        validate_id("room_id", room_id)?;
        validate_name("identifier", identifier)?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM rooms WHERE id = ?1)")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(not_found("room", room_id));
        }

        let table = DiningTable {
            id: Uuid::new_v4().to_string(),
            room_id: room_id.to_string(),
            identifier: identifier.trim().to_string(),
            position_x,
            position_y,
            status: TableStatus::Free,
            version: 0,
        };

        sqlx::query(
            r#"
            INSERT INTO dining_tables (id, room_id, identifier, position_x, position_y, status, version)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&table.id)
        .bind(&table.room_id)
        .bind(&table.identifier)
        .bind(table.position_x)
        .bind(table.position_y)
        .bind(table.status)
        .bind(table.version)
        .execute(&self.pool)
        .await?;

        debug!(id = %table.id, identifier = %table.identifier, "Table created");
        Ok(table)
    }

    /// Gets a table by id.
    pub async fn get_table(&self, table_id: &str) -> PosResult<DiningTable> {
        let table: Option<DiningTable> =
            sqlx::query_as("SELECT * FROM dining_tables WHERE id = ?1")
                .bind(table_id)
                .fetch_optional(&self.pool)
                .await?;

        table.ok_or_else(|| not_found("table", table_id))
    }

    /// Updates the floor-plan position of a table.
    pub async fn move_table(&self, table_id: &str, x: f64, y: f64) -> PosResult<()> {
        let result = sqlx::query(
            "UPDATE dining_tables SET position_x = ?2, position_y = ?3, version = version + 1 WHERE id = ?1",
        )
        .bind(table_id)
        .bind(x)
        .bind(y)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found("table", table_id));
        }

        Ok(())
    }

    /// Marks a table occupied. Idempotent.
    pub async fn occupy(&self, table_id: &str) -> PosResult<()> {
        let mut conn = self.pool.acquire().await.map_err(crate::error::DbError::from)?;
        set_status_on(&mut *conn, table_id, TableStatus::Occupied).await
    }

    /// Marks a table free. Idempotent.
    pub async fn free(&self, table_id: &str) -> PosResult<()> {
        let mut conn = self.pool.acquire().await.map_err(crate::error::DbError::from)?;
        set_status_on(&mut *conn, table_id, TableStatus::Free).await
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Repairs occupancy drift against open-order ground truth.
    ///
    /// Corrects every table whose persisted status disagrees with
    /// "has at least one OPEN order", logs each fix, and returns the number
    /// of corrections. Zero on a consistent floor.
    pub async fn reconcile(&self) -> PosResult<u64> {
        #[derive(sqlx::FromRow)]
        struct Drifted {
            id: String,
            status: TableStatus,
        }

        let drifted: Vec<Drifted> = sqlx::query_as(
            r#"
            SELECT t.id, t.status
            FROM dining_tables t
            WHERE (t.status = 'occupied'
                   AND NOT EXISTS (SELECT 1 FROM orders o
                                   WHERE o.table_id = t.id AND o.status = 'open'))
               OR (t.status = 'free'
                   AND EXISTS (SELECT 1 FROM orders o
                               WHERE o.table_id = t.id AND o.status = 'open'))
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut corrected = 0u64;
        for table in drifted {
            let target = match table.status {
                TableStatus::Occupied => TableStatus::Free,
                TableStatus::Free => TableStatus::Occupied,
            };

            let result = sqlx::query(
                "UPDATE dining_tables SET status = ?2, version = version + 1 WHERE id = ?1 AND status = ?3",
            )
            .bind(&table.id)
            .bind(target)
            .bind(table.status)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() > 0 {
                warn!(
                    table_id = %table.id,
                    from = ?table.status,
                    to = ?target,
                    "Corrected table occupancy drift"
                );
                corrected += 1;
            }
        }

        Ok(corrected)
    }

    /// Lists all tables, reconciling occupancy first so the returned floor
    /// state is consistent with order activity.
    pub async fn list_tables(&self) -> PosResult<Vec<DiningTable>> {
        self.reconcile().await?;

        let tables: Vec<DiningTable> =
            sqlx::query_as("SELECT * FROM dining_tables ORDER BY room_id, identifier")
                .fetch_all(&self.pool)
                .await?;

        Ok(tables)
    }

    /// Lists the tables of one room, reconciled.
    pub async fn list_tables_in_room(&self, room_id: &str) -> PosResult<Vec<DiningTable>> {
        self.reconcile().await?;

        let tables: Vec<DiningTable> =
            sqlx::query_as("SELECT * FROM dining_tables WHERE room_id = ?1 ORDER BY identifier")
                .bind(room_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(tables)
    }
}

/// Frees a table with an optimistic version check, joining the caller's
/// transaction.
///
/// Settlement paths use this instead of the idempotent setter: a
/// concurrent floor mutation between the settlement's read and its free
/// fails the whole transaction, which the caller retries after re-reading
/// state.
pub(crate) async fn free_versioned_on(
    conn: &mut SqliteConnection,
    table_id: &str,
    expected_version: i64,
) -> PosResult<()> {
    let result = sqlx::query(
        "UPDATE dining_tables SET status = 'free', version = version + 1 WHERE id = ?1 AND version = ?2",
    )
    .bind(table_id)
    .bind(expected_version)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(PosError::Domain(CoreError::version_conflict(
            "table", table_id,
        )));
    }

    Ok(())
}

/// Sets a table's occupancy on an existing connection, joining the caller's
/// transaction. Idempotent: already being in the target state is success;
/// only a missing table is an error.
pub(crate) async fn set_status_on(
    conn: &mut SqliteConnection,
    table_id: &str,
    status: TableStatus,
) -> PosResult<()> {
    let result = sqlx::query(
        "UPDATE dining_tables SET status = ?2, version = version + 1 WHERE id = ?1 AND status <> ?2",
    )
    .bind(table_id)
    .bind(status)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM dining_tables WHERE id = ?1)")
                .bind(table_id)
                .fetch_one(conn)
                .await?;
        if !exists {
            return Err(not_found("table", table_id));
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::testing;
    use mesa_core::TableStatus;

    #[tokio::test]
    async fn occupy_and_free_are_idempotent() {
        let db = testing::mem_db().await;
        let room = db.floor().create_room("Salón principal").await.unwrap();
        let table = db.floor().create_table(&room.id, "T-01", 0.0, 0.0).await.unwrap();

        db.floor().occupy(&table.id).await.unwrap();
        db.floor().occupy(&table.id).await.unwrap();
        assert_eq!(
            db.floor().get_table(&table.id).await.unwrap().status,
            TableStatus::Occupied
        );

        db.floor().free(&table.id).await.unwrap();
        db.floor().free(&table.id).await.unwrap();
        assert_eq!(
            db.floor().get_table(&table.id).await.unwrap().status,
            TableStatus::Free
        );
    }

    #[tokio::test]
    async fn occupy_missing_table_fails() {
        let db = testing::mem_db().await;
        let err = db.floor().occupy("ghost").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn duplicate_identifier_in_room_is_rejected() {
        let db = testing::mem_db().await;
        let room = db.floor().create_room("Terraza").await.unwrap();
        db.floor().create_table(&room.id, "T-01", 0.0, 0.0).await.unwrap();

        let err = db
            .floor()
            .create_table(&room.id, "T-01", 1.0, 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::PosError::Storage(_)));
    }

    #[tokio::test]
    async fn reconcile_frees_orphaned_occupied_table() {
        let db = testing::mem_db().await;
        let table = testing::seed_table(&db).await;

        // occupied, but no open order references it
        db.floor().occupy(&table).await.unwrap();

        let corrected = db.floor().reconcile().await.unwrap();
        assert_eq!(corrected, 1);
        assert_eq!(
            db.floor().get_table(&table).await.unwrap().status,
            TableStatus::Free
        );

        // second pass finds nothing to fix
        assert_eq!(db.floor().reconcile().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_tables_repairs_before_returning() {
        let db = testing::mem_db().await;
        let user = testing::seed_user(&db).await;
        let table = testing::seed_table(&db).await;
        let product = testing::seed_product(&db, "Cerveza", 1500).await;

        testing::open_order_on_table(&db, &user, &table, &product, 1).await;

        // force drift: order is open but table says free
        sqlx::query("UPDATE dining_tables SET status = 'free' WHERE id = ?1")
            .bind(&table)
            .execute(db.pool())
            .await
            .unwrap();

        let tables = db.floor().list_tables().await.unwrap();
        let listed = tables.iter().find(|t| t.id == table).unwrap();
        assert_eq!(listed.status, TableStatus::Occupied);
    }
}
