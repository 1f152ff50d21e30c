//! # Repository Module
//!
//! Database repository implementations for Stitch Market.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Handler                                                               │
//! │       │  db.payments().review(id, Verify, reviewer, None)              │
//! │       ▼                                                                 │
//! │  PaymentRepository                                                     │
//! │  ├── BEGIN IMMEDIATE                                                   │
//! │  ├── load payment + invoice                                            │
//! │  ├── stitch_core::invoicing::review_payment(...)  ← rule decision      │
//! │  ├── UPDATE payments ... WHERE status = 'pending'  ← conditional       │
//! │  ├── UPDATE invoices ...                                               │
//! │  └── COMMIT                                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`factory::FactoryRepository`] - Factory listing and lookup
//! - [`product::ProductRepository`] - Products and their price tiers
//! - [`order::OrderRepository`] - Orders and status changes
//! - [`sample::SampleRepository`] - Sample requests
//! - [`invoice::InvoiceRepository`] - Invoice issuance and cancellation
//! - [`payment::PaymentRepository`] - Manual payment submission and review

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use stitch_core::orders::document_number;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

pub mod factory;
pub mod invoice;
pub mod order;
pub mod payment;
pub mod product;
pub mod sample;

/// Generates a new entity ID.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Opens a transaction that takes the write lock up front.
///
/// A deferred `BEGIN` that reads and then writes fails at once with
/// `database is locked` when another writer committed in between. Taking
/// the lock at `BEGIN` makes writers queue on `busy_timeout` instead.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Next daily document number (`PREFIX-YYYYMMDD-NNNN`) for `table.column`.
///
/// Runs inside the caller's transaction; a concurrent writer that picks
/// the same number fails on the UNIQUE index and the caller retries.
pub(crate) async fn next_document_number(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    column: &str,
    prefix: &str,
    date: NaiveDate,
) -> DbResult<String> {
    let day_prefix = format!("{}-{}-", prefix, date.format("%Y%m%d"));
    let sql = format!("SELECT COUNT(*) FROM {table} WHERE {column} LIKE ?1 || '%'");

    let issued: i64 = sqlx::query_scalar(&sql)
        .bind(&day_prefix)
        .fetch_one(&mut **tx)
        .await?;

    let sequence = u32::try_from(issued + 1).unwrap_or(u32::MAX);
    Ok(document_number(prefix, date, sequence))
}

/// How many times an insert is retried after losing a document-number race.
pub(crate) const NUMBER_RETRIES: usize = 3;

/// Builds a `LIKE` pattern matching `query` anywhere, escaping `%`, `_`
/// and `\` so user input is matched literally (use with `ESCAPE '\'`).
pub(crate) fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Parses a TEXT decimal column.
pub(crate) fn parse_decimal(entity: &str, id: &str, column: &str, value: &str) -> DbResult<Decimal> {
    Decimal::from_str(value)
        .map_err(|_| DbError::invalid_data(entity, id, format!("{} '{}' is not a decimal", column, value)))
}
