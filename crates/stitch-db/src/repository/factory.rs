//! # Factory Repository
//!
//! Database operations for factories.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::like_pattern;
use stitch_core::Factory;

const FACTORY_COLUMNS: &str = "id, owner_id, name, location, description, specialties, \
                               is_verified, created_at, updated_at";

/// Repository for factory database operations.
#[derive(Debug, Clone)]
pub struct FactoryRepository {
    pool: SqlitePool,
}

impl FactoryRepository {
    /// Creates a new FactoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        FactoryRepository { pool }
    }

    /// Searches factories by name, location or specialty.
    ///
    /// Verified factories come first. An empty query lists all factories.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Factory>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching factories");

        let sql = format!(
            "SELECT {FACTORY_COLUMNS} FROM factories
             WHERE ?1 = '' OR name LIKE ?2 ESCAPE '\\'
                OR location LIKE ?2 ESCAPE '\\'
                OR specialties LIKE ?2 ESCAPE '\\'
             ORDER BY is_verified DESC, name
             LIMIT ?3"
        );

        let factories = sqlx::query_as::<_, Factory>(&sql)
            .bind(query)
            .bind(like_pattern(query))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = factories.len(), "Search returned factories");
        Ok(factories)
    }

    /// Gets a factory by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Factory>> {
        let sql = format!("SELECT {FACTORY_COLUMNS} FROM factories WHERE id = ?1");

        let factory = sqlx::query_as::<_, Factory>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(factory)
    }

    /// Gets the factories owned by a user.
    pub async fn list_by_owner(&self, owner_id: &str) -> DbResult<Vec<Factory>> {
        let sql = format!("SELECT {FACTORY_COLUMNS} FROM factories WHERE owner_id = ?1 ORDER BY name");

        let factories = sqlx::query_as::<_, Factory>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(factories)
    }

    /// Inserts a new factory.
    pub async fn insert(&self, factory: &Factory) -> DbResult<()> {
        debug!(id = %factory.id, name = %factory.name, "Inserting factory");

        sqlx::query(
            r#"
            INSERT INTO factories (
                id, owner_id, name, location, description, specialties,
                is_verified, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&factory.id)
        .bind(&factory.owner_id)
        .bind(&factory.name)
        .bind(&factory.location)
        .bind(&factory.description)
        .bind(&factory.specialties)
        .bind(factory.is_verified)
        .bind(factory.created_at)
        .bind(factory.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Marks a factory as verified by the marketplace.
    pub async fn set_verified(&self, id: &str, verified: bool) -> DbResult<bool> {
        let result = sqlx::query("UPDATE factories SET is_verified = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(verified)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{factory, test_db};

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let f = factory("owner-1", "Delta Knitwear", "Mahalla");
        db.factories().insert(&f).await.unwrap();

        let loaded = db.factories().get_by_id(&f.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Delta Knitwear");
        assert!(!loaded.is_verified);

        assert!(db.factories().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_orders_verified_first() {
        let db = test_db().await;
        let a = factory("o1", "Alpha Denim", "Cairo");
        let b = factory("o2", "Beta Denim", "Alexandria");
        db.factories().insert(&a).await.unwrap();
        db.factories().insert(&b).await.unwrap();
        assert!(db.factories().set_verified(&b.id, true).await.unwrap());

        let found = db.factories().search("denim", 10).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, b.id);

        let found = db.factories().search("alexandria", 10).await.unwrap();
        assert_eq!(found.len(), 1);

        assert_eq!(db.factories().search("", 10).await.unwrap().len(), 2);
        assert!(db.factories().search("100%", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_by_owner() {
        let db = test_db().await;
        db.factories().insert(&factory("o1", "One", "Giza")).await.unwrap();
        db.factories().insert(&factory("o2", "Two", "Giza")).await.unwrap();

        let owned = db.factories().list_by_owner("o1").await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].name, "One");
    }
}
