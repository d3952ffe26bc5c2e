//! # Product Repository
//!
//! Point reads and writes keyed by product id.
//!
//! ## Stock Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ❌ Read-modify-write (loses concurrent sales)                      │
//! │     let p = get(id); p.stock -= 2; update(p)                        │
//! │                                                                     │
//! │  ✅ Delta in SQL, floored at zero                                   │
//! │     UPDATE products SET stock = MAX(stock + ?delta, 0) ...          │
//! │                                                                     │
//! │  set_stock is reserved for writing a tracked product's derived     │
//! │  count into its cache.                                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use handset_core::Product;

const PRODUCT_COLUMNS: &str = "id, name, sku, price_cents, cost_cents, stock, min_stock, \
     product_model_id, created_at, updated_at, deleted_at";

#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a live product by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE id = ?1 AND deleted_at IS NULL",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists live products by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE deleted_at IS NULL ORDER BY name, id",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, sku, price_cents, cost_cents, stock, min_stock,
                product_model_id, created_at, updated_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(&product.product_model_id)
        .bind(product.created_at)
        .bind(product.updated_at)
        .bind(product.deleted_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Updates catalog fields. Stock is left alone; use the stock methods.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                sku = ?3,
                price_cents = ?4,
                cost_cents = ?5,
                min_stock = ?6,
                product_model_id = ?7,
                updated_at = ?8
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.min_stock)
        .bind(&product.product_model_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Applies a stock delta, floored at zero. Returns the new stock.
    ///
    /// ## Arguments
    /// * `delta` - negative for sales, positive for restocks and reversals
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<i64> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let stock: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock = MAX(stock + ?2, 0), updated_at = ?3
            WHERE id = ?1 AND deleted_at IS NULL
            RETURNING stock
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        stock.ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Overwrites the stored stock counter.
    pub async fn set_stock(&self, id: &str, stock: i64) -> DbResult<()> {
        debug!(id = %id, stock = %stock, "Setting cached stock");

        let result = sqlx::query(
            "UPDATE products SET stock = MAX(?2, 0), updated_at = ?3 \
             WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(stock)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}
