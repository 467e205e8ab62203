//! # Parameters Repository
//!
//! The singleton configuration row: tax rates, the discount ceiling and
//! restaurant identity. Seeded by the initial migration so `get()` always
//! resolves on a migrated database.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::{not_found, PosResult};
use mesa_core::settlement::Rates;
use mesa_core::validation::validate_bps;
use mesa_core::Parameters;

/// Repository for the parameters singleton.
#[derive(Debug, Clone)]
pub struct ParamsRepository {
    pool: SqlitePool,
}

impl ParamsRepository {
    /// Creates a new ParamsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ParamsRepository { pool }
    }

    /// Gets the parameters row.
    pub async fn get(&self) -> PosResult<Parameters> {
        let params: Option<Parameters> = sqlx::query_as("SELECT * FROM parameters WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        params.ok_or_else(|| not_found("parameters", "1"))
    }

    /// Gets the configured rates for settlement.
    pub async fn rates(&self) -> PosResult<Rates> {
        Ok(self.get().await?.rates())
    }

    /// Updates the tax/discount rates, version-guarded.
    pub async fn update_rates(
        &self,
        sales_tax_bps: u32,
        service_tax_bps: u32,
        max_discount_bps: u32,
    ) -> PosResult<Parameters> {
        validate_bps("sales_tax", sales_tax_bps)?;
        validate_bps("service_tax", service_tax_bps)?;
        validate_bps("max_discount", max_discount_bps)?;

        sqlx::query(
            r#"
            UPDATE parameters SET
                sales_tax_bps = ?1,
                service_tax_bps = ?2,
                max_discount_bps = ?3,
                version = version + 1
            WHERE id = 1
            "#,
        )
        .bind(sales_tax_bps)
        .bind(service_tax_bps)
        .bind(max_discount_bps)
        .execute(&self.pool)
        .await?;

        info!(
            sales_tax_bps,
            service_tax_bps, max_discount_bps, "Parameters updated"
        );

        self.get().await
    }
}

/// Reads the rates on an existing connection, joining the caller's
/// transaction.
pub(crate) async fn rates_on(conn: &mut SqliteConnection) -> PosResult<Rates> {
    let params: Option<Parameters> = sqlx::query_as("SELECT * FROM parameters WHERE id = 1")
        .fetch_optional(conn)
        .await?;

    Ok(params.ok_or_else(|| not_found("parameters", "1"))?.rates())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::testing;

    #[tokio::test]
    async fn defaults_are_seeded() {
        let db = testing::mem_db().await;
        let rates = db.params().rates().await.unwrap();

        assert_eq!(rates.sales.bps(), 1300);
        assert_eq!(rates.service.bps(), 1000);
        assert_eq!(rates.max_discount.bps(), 1000);
    }

    #[tokio::test]
    async fn update_rates_roundtrips() {
        let db = testing::mem_db().await;
        let params = db.params().update_rates(1300, 1000, 1500).await.unwrap();

        assert_eq!(params.max_discount_bps, 1500);
        assert_eq!(params.version, 1);
    }

    #[tokio::test]
    async fn update_rejects_out_of_range_bps() {
        let db = testing::mem_db().await;
        assert!(db.params().update_rates(10001, 0, 0).await.is_err());
    }
}
