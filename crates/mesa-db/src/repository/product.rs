//! # Product Repository
//!
//! Catalog operations: groups, products, and the best-effort sale counter
//! the settlement engine bumps after every invoice.
//!
//! ## Snapshot Boundary
//! The catalog is the source of *current* prices. Orders and invoices
//! snapshot prices at add/settlement time and never read back through here,
//! so price updates only affect future lines.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{not_found, PosResult};
use mesa_core::validation::{validate_amount_cents, validate_id, validate_name};
use mesa_core::{Product, ProductGroup};

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product group.
    pub async fn create_group(&self, name: &str) -> PosResult<ProductGroup> {
        validate_name("name", name)?;

        let group = ProductGroup {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
        };

        sqlx::query("INSERT INTO product_groups (id, name) VALUES (?1, ?2)")
            .bind(&group.id)
            .bind(&group.name)
            .execute(&self.pool)
            .await?;

        Ok(group)
    }

    /// Creates a product in a group.
    pub async fn create(
        &self,
        group_id: &str,
        name: &str,
        short_name: &str,
        price_cents: i64,
        quick_menu: bool,
    ) -> PosResult<Product> {
        validate_id("group_id", group_id)?;
        validate_name("name", name)?;
        validate_name("short_name", short_name)?;
        validate_amount_cents("price", price_cents)?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM product_groups WHERE id = ?1)")
                .bind(group_id)
                .fetch_one(&self.pool)
                .await?;
        if !exists {
            return Err(not_found("product group", group_id));
        }

        let product = Product {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            name: name.trim().to_string(),
            short_name: short_name.trim().to_string(),
            price_cents,
            quick_menu,
            total_sales: 0,
            is_active: true,
            version: 0,
        };

        debug!(id = %product.id, name = %product.name, "Creating product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, group_id, name, short_name, price_cents,
                quick_menu, total_sales, is_active, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.group_id)
        .bind(&product.name)
        .bind(&product.short_name)
        .bind(product.price_cents)
        .bind(product.quick_menu)
        .bind(product.total_sales)
        .bind(product.is_active)
        .bind(product.version)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets an active product by id.
    ///
    /// Inactive (soft-deleted) products resolve as not found: they can no
    /// longer be rung up.
    pub async fn get(&self, product_id: &str) -> PosResult<Product> {
        let product: Option<Product> =
            sqlx::query_as("SELECT * FROM products WHERE id = ?1 AND is_active = 1")
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;

        product.ok_or_else(|| not_found("product", product_id))
    }

    /// Lists all active products, quick-menu entries first.
    pub async fn list_active(&self) -> PosResult<Vec<Product>> {
        let products: Vec<Product> = sqlx::query_as(
            "SELECT * FROM products WHERE is_active = 1 ORDER BY quick_menu DESC, name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Lists active products of one group.
    pub async fn list_by_group(&self, group_id: &str) -> PosResult<Vec<Product>> {
        let products: Vec<Product> = sqlx::query_as(
            "SELECT * FROM products WHERE group_id = ?1 AND is_active = 1 ORDER BY name",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Updates a product's current price. Existing order/invoice lines keep
    /// their snapshots.
    pub async fn update_price(&self, product_id: &str, price_cents: i64) -> PosResult<()> {
        validate_amount_cents("price", price_cents)?;

        let result = sqlx::query(
            "UPDATE products SET price_cents = ?2, version = version + 1 WHERE id = ?1 AND is_active = 1",
        )
        .bind(product_id)
        .bind(price_cents)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found("product", product_id));
        }

        Ok(())
    }

    /// Increments a product's sale counter.
    ///
    /// Best-effort: callers treat failures as non-fatal (the counter is not
    /// part of any financial invariant).
    pub async fn increment_sales(&self, product_id: &str, qty: i64) -> PosResult<()> {
        sqlx::query(
            "UPDATE products SET total_sales = total_sales + ?2, version = version + 1 WHERE id = ?1",
        )
        .bind(product_id)
        .bind(qty)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deactivates a product (soft delete).
    pub async fn deactivate(&self, product_id: &str) -> PosResult<()> {
        let result = sqlx::query(
            "UPDATE products SET is_active = 0, version = version + 1 WHERE id = ?1 AND is_active = 1",
        )
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found("product", product_id));
        }

        Ok(())
    }

    /// Counts all products (active and inactive).
    pub async fn count(&self) -> PosResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Bumps the sale counter on an existing connection, joining the caller's
/// transaction.
pub(crate) async fn increment_sales_on(
    conn: &mut SqliteConnection,
    product_id: &str,
    qty: i64,
) -> PosResult<()> {
    sqlx::query(
        "UPDATE products SET total_sales = total_sales + ?2, version = version + 1 WHERE id = ?1",
    )
    .bind(product_id)
    .bind(qty)
    .execute(conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::testing;

    #[tokio::test]
    async fn create_and_get_product() {
        let db = testing::mem_db().await;
        let group = db.products().create_group("Bebidas").await.unwrap();
        let product = db
            .products()
            .create(&group.id, "Batido de mora", "Batido", 1800, true)
            .await
            .unwrap();

        let fetched = db.products().get(&product.id).await.unwrap();
        assert_eq!(fetched.name, "Batido de mora");
        assert_eq!(fetched.price_cents, 1800);
        assert_eq!(fetched.total_sales, 0);
    }

    #[tokio::test]
    async fn get_missing_or_inactive_product_fails() {
        let db = testing::mem_db().await;
        let err = db.products().get("nope").await.unwrap_err();
        assert!(err.is_not_found());

        let product = testing::seed_product(&db, "Cerveza", 1500).await;
        db.products().deactivate(&product).await.unwrap();
        assert!(db.products().get(&product).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn increment_sales_accumulates() {
        let db = testing::mem_db().await;
        let product = testing::seed_product(&db, "Cerveza", 1500).await;

        db.products().increment_sales(&product, 2).await.unwrap();
        db.products().increment_sales(&product, 3).await.unwrap();

        // counter visible even though get() filters actives only
        let fetched = db.products().get(&product).await.unwrap();
        assert_eq!(fetched.total_sales, 5);
    }

    #[tokio::test]
    async fn update_price_only_affects_future_reads() {
        let db = testing::mem_db().await;
        let product = testing::seed_product(&db, "Cerveza", 1500).await;

        db.products().update_price(&product, 1700).await.unwrap();
        assert_eq!(db.products().get(&product).await.unwrap().price_cents, 1700);
    }
}
