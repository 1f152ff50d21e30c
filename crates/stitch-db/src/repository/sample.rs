//! # Sample Request Repository
//!
//! Database operations for sample requests.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use stitch_core::orders::sample_charge;
use stitch_core::{Product, SampleRequest, SampleStatus};

const SAMPLE_COLUMNS: &str = "id, buyer_id, factory_id, product_id, quantity, charge_cents, \
                              notes, status, created_at, updated_at";

/// Repository for sample request database operations.
#[derive(Debug, Clone)]
pub struct SampleRepository {
    pool: SqlitePool,
}

impl SampleRepository {
    /// Creates a new SampleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SampleRepository { pool }
    }

    /// Records a sample request; the charge is computed from the product.
    pub async fn create(
        &self,
        buyer_id: &str,
        product: &Product,
        quantity: i64,
        notes: Option<String>,
    ) -> DbResult<SampleRequest> {
        let charge = sample_charge(product, quantity)?;
        let now = Utc::now();

        let sample = SampleRequest {
            id: generate_id(),
            buyer_id: buyer_id.to_string(),
            factory_id: product.factory_id.clone(),
            product_id: product.id.clone(),
            quantity,
            charge_cents: charge.cents(),
            notes,
            status: SampleStatus::Requested,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %sample.id, product_id = %sample.product_id, quantity, "Inserting sample request");

        sqlx::query(
            r#"
            INSERT INTO sample_requests (
                id, buyer_id, factory_id, product_id, quantity, charge_cents,
                notes, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&sample.id)
        .bind(&sample.buyer_id)
        .bind(&sample.factory_id)
        .bind(&sample.product_id)
        .bind(sample.quantity)
        .bind(sample.charge_cents)
        .bind(&sample.notes)
        .bind(sample.status)
        .bind(sample.created_at)
        .bind(sample.updated_at)
        .execute(&self.pool)
        .await?;

        info!(id = %sample.id, charge_cents = sample.charge_cents, "Sample requested");
        Ok(sample)
    }

    /// Gets a sample request by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<SampleRequest>> {
        let sql = format!("SELECT {SAMPLE_COLUMNS} FROM sample_requests WHERE id = ?1");

        let sample = sqlx::query_as::<_, SampleRequest>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sample)
    }

    /// Lists sample requests received by a factory, newest first.
    pub async fn list_for_factory(&self, factory_id: &str, limit: u32) -> DbResult<Vec<SampleRequest>> {
        let sql = format!(
            "SELECT {SAMPLE_COLUMNS} FROM sample_requests
             WHERE factory_id = ?1 ORDER BY created_at DESC LIMIT ?2"
        );

        let samples = sqlx::query_as::<_, SampleRequest>(&sql)
            .bind(factory_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(samples)
    }

    /// Moves a sample request from `from` to `to` (conditional on `from`).
    pub async fn update_status(&self, id: &str, from: SampleStatus, to: SampleStatus) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sample_requests SET status = ?3, updated_at = ?4
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(id).await? {
                Some(_) => Err(DbError::conflict("Sample request", id)),
                None => Err(DbError::not_found("Sample request", id)),
            };
        }

        info!(id = %id, status = %to, "Sample request status changed");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
