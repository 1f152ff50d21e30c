//! # stitch-db: Database Layer for Stitch Market
//!
//! SQLite storage for factories, products, price tiers, orders, sample
//! requests, invoices and payments, accessed asynchronously with sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Stitch Market Data Flow                            │
//! │                                                                         │
//! │  HTTP handler (POST /orders)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     stitch-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ OrderRepo     │    │ 001_initial  │  │   │
//! │  │   │ WAL, FKs on   │    │ InvoiceRepo   │    │ _schema.sql  │  │   │
//! │  │   │               │    │ PaymentRepo   │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (stitch.db)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per aggregate
//!
//! Business rules (pricing, status machines, payment acceptance) live in
//! `stitch-core`; repositories call them inside their transactions and
//! surface violations as [`DbError::Rule`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stitch_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./data/stitch.db")).await?;
//!
//! let records = db.products().tier_records(&product_id).await?;
//! let order = db.orders().create(&buyer_id, &product, &quote, None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::factory::FactoryRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::order::OrderRepository;
pub use repository::payment::{PaymentRepository, ReviewedPayment};
pub use repository::product::ProductRepository;
pub use repository::sample::SampleRepository;

// =============================================================================
// Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use stitch_core::invoicing::DEFAULT_PAYMENT_TERMS_DAYS;
    use stitch_core::orders::quote_order;
    use stitch_core::{Factory, Invoice, Order, OrderStatus, PriceTier, Product};

    use crate::repository::generate_id;
    use crate::{Database, DbConfig};

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// A WAL database on disk with a real multi-connection pool. Keep the
    /// directory alive for as long as the database is used.
    pub async fn file_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("stitch.db")).max_connections(5))
            .await
            .unwrap();
        (dir, db)
    }

    pub fn factory(owner_id: &str, name: &str, location: &str) -> Factory {
        let now = Utc::now();
        Factory {
            id: generate_id(),
            owner_id: owner_id.to_string(),
            name: name.to_string(),
            location: location.to_string(),
            description: None,
            specialties: Some("knitwear, fleece".to_string()),
            is_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// 1-49 @ 100, 50-199 @ 90, 200+ @ 75.
    pub fn catalog_tiers() -> Vec<PriceTier> {
        vec![
            PriceTier::new(1, Some(49), Decimal::from(100)).unwrap(),
            PriceTier::new(50, Some(199), Decimal::from(90)).unwrap(),
            PriceTier::new(200, None, Decimal::from(75)).unwrap(),
        ]
    }

    pub async fn seeded_product(db: &Database, moq: i64) -> (Factory, Product) {
        let owner = factory("factory-owner", "Nile Fleece Works", "Mahalla");
        db.factories().insert(&owner).await.unwrap();

        let now = Utc::now();
        let product = Product {
            id: generate_id(),
            factory_id: owner.id.clone(),
            name: "Heavyweight Hoodie".to_string(),
            description: Some("450gsm brushed fleece".to_string()),
            category: Some("outerwear".to_string()),
            base_price: Decimal::from(120),
            moq,
            sample_price: Some(Decimal::new(1550, 2)),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product, &catalog_tiers()).await.unwrap();

        (owner, product)
    }

    /// A pending order from `buyer-1`.
    pub async fn placed_order(db: &Database, quantity: i64) -> Order {
        let (_, product) = seeded_product(db, 1).await;
        let quote = quote_order(&product, &catalog_tiers(), quantity).unwrap();
        db.orders().create("buyer-1", &product, &quote, None).await.unwrap()
    }

    pub async fn confirmed_order(db: &Database, quantity: i64) -> Order {
        let mut order = placed_order(db, quantity).await;
        db.orders()
            .update_status(&order.id, OrderStatus::Pending, OrderStatus::Confirmed)
            .await
            .unwrap();
        order.status = OrderStatus::Confirmed;
        order
    }

    /// An unpaid invoice for 50 hoodies (4,500.00).
    pub async fn issued_invoice(db: &Database) -> Invoice {
        let order = confirmed_order(db, 50).await;
        db.invoices()
            .create_for_order(&order, DEFAULT_PAYMENT_TERMS_DAYS)
            .await
            .unwrap()
    }
}
