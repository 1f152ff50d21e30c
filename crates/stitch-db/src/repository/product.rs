//! # Product Repository
//!
//! Database operations for products and their price tiers.
//!
//! ## Storage Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products                           price_tiers                         │
//! │  ┌──────────────────────────┐       ┌──────────────────────────────┐   │
//! │  │ id           p-1         │◄──────│ product_id   p-1             │   │
//! │  │ base_price   "120"       │       │ min_quantity 1               │   │
//! │  │ moq          10          │       │ max_quantity 49              │   │
//! │  │ sample_price "15.50"     │       │ price        "100"           │   │
//! │  └──────────────────────────┘       └──────────────────────────────┘   │
//! │                                                                         │
//! │  Prices are TEXT. Product prices are parsed strictly when a row is     │
//! │  loaded; tier rows come back as TierRecord and are parsed by the       │
//! │  caller (strict on write, lenient at order time).                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{begin_write, generate_id, like_pattern, parse_decimal};
use stitch_core::{PriceTier, Product, TierRecord};

const PRODUCT_COLUMNS: &str = "id, factory_id, name, description, category, base_price, moq, \
                               sample_price, is_active, created_at, updated_at";

/// Raw `products` row; decimals still as text.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    factory_id: String,
    name: String,
    description: Option<String>,
    category: Option<String>,
    base_price: String,
    moq: i64,
    sample_price: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let base_price = parse_decimal("Product", &row.id, "base_price", &row.base_price)?;
        let sample_price = row
            .sample_price
            .as_deref()
            .map(|price| parse_decimal("Product", &row.id, "sample_price", price))
            .transpose()?;

        Ok(Product {
            id: row.id,
            factory_id: row.factory_id,
            name: row.name,
            description: row.description,
            category: row.category,
            base_price,
            moq: row.moq,
            sample_price,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> DbResult<Vec<Product>> {
    rows.into_iter().map(Product::try_from).collect()
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Searches active products by name or description, optionally within
    /// one category.
    pub async fn search(&self, query: &str, category: Option<&str>, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();
        let category = category.map(str::trim).filter(|c| !c.is_empty());

        debug!(query = %query, category = ?category, limit = %limit, "Searching products");

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE is_active = 1
               AND (?1 = '' OR name LIKE ?2 ESCAPE '\\' OR description LIKE ?2 ESCAPE '\\')
               AND (?3 IS NULL OR category = ?3)
             ORDER BY name
             LIMIT ?4"
        );

        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(query)
            .bind(like_pattern(query))
            .bind(category)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Search returned products");
        into_products(rows)
    }

    /// Lists a factory's active products.
    pub async fn list_by_factory(&self, factory_id: &str) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE factory_id = ?1 AND is_active = 1
             ORDER BY name"
        );

        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(factory_id)
            .fetch_all(&self.pool)
            .await?;

        into_products(rows)
    }

    /// Gets a product by its ID (active or not).
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");

        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Product::try_from).transpose()
    }

    /// Returns the stored tier rows of a product, lowest range first.
    ///
    /// Rows are returned unparsed; see [`stitch_core::tiers`].
    pub async fn tier_records(&self, product_id: &str) -> DbResult<Vec<TierRecord>> {
        let records = sqlx::query_as::<_, TierRecord>(
            r#"
            SELECT min_quantity, max_quantity, price
            FROM price_tiers
            WHERE product_id = ?1
            ORDER BY min_quantity
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Inserts a product together with its (already validated) tiers.
    pub async fn insert(&self, product: &Product, tiers: &[PriceTier]) -> DbResult<()> {
        debug!(id = %product.id, tiers = tiers.len(), "Inserting product");

        let mut tx = begin_write(&self.pool).await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, factory_id, name, description, category,
                base_price, moq, sample_price, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.factory_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.base_price.to_string())
        .bind(product.moq)
        .bind(product.sample_price.map(|p| p.to_string()))
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;

        insert_tiers(&mut tx, &product.id, tiers).await?;

        tx.commit().await?;

        info!(id = %product.id, factory_id = %product.factory_id, "Product created");
        Ok(())
    }

    /// Replaces every tier of a product in one transaction.
    ///
    /// ## Errors
    /// `DbError::NotFound` if the product does not exist.
    pub async fn replace_tiers(&self, product_id: &str, tiers: &[PriceTier]) -> DbResult<()> {
        debug!(product_id = %product_id, tiers = tiers.len(), "Replacing price tiers");

        let mut tx = begin_write(&self.pool).await?;

        let touched = sqlx::query("UPDATE products SET updated_at = ?2 WHERE id = ?1")
            .bind(product_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        if touched.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        sqlx::query("DELETE FROM price_tiers WHERE product_id = ?1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        insert_tiers(&mut tx, product_id, tiers).await?;

        tx.commit().await?;

        info!(product_id = %product_id, tiers = tiers.len(), "Price tiers replaced");
        Ok(())
    }

    /// Lists or unlists a product. Placed orders are unaffected.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Distinct categories of active products, for the catalog filter.
    pub async fn categories(&self) -> DbResult<Vec<String>> {
        let categories: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT category FROM products
            WHERE is_active = 1 AND category IS NOT NULL
            ORDER BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }
}

async fn insert_tiers(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    product_id: &str,
    tiers: &[PriceTier],
) -> DbResult<()> {
    for tier in tiers {
        let record = TierRecord::from(tier);
        sqlx::query(
            r#"
            INSERT INTO price_tiers (id, product_id, min_quantity, max_quantity, price)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(generate_id())
        .bind(product_id)
        .bind(record.min_quantity)
        .bind(record.max_quantity)
        .bind(record.price)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
