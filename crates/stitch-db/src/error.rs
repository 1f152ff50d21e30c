//! # Database Errors
//!
//! ```text
//! sqlx::Error ────────┐
//! MigrateError ───────┼──► DbError ──► ApiError (apps/web)
//! CoreError (rules) ──┘
//! ```
//!
//! Constraint failures are classified so callers can react to them: a
//! `UniqueViolation` on a document number is retried, one on
//! `invoices.order_id` means the order was already invoiced.

use sqlx::error::ErrorKind;
use stitch_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// `field` is `table.column` as SQLite reports it.
    #[error("{field} already exists")]
    UniqueViolation { field: String },

    #[error("Referenced record does not exist: {0}")]
    ForeignKeyViolation(String),

    /// A conditional update matched no row.
    ///
    /// ## When This Occurs
    /// - Two reviewers verify the same payment at once
    /// - An order moved on between load and update
    #[error("{entity} {id} was modified concurrently")]
    Conflict { entity: String, id: String },

    /// A stored value could not be read back into a domain type.
    #[error("Invalid stored data in {entity} {id}: {reason}")]
    InvalidData {
        entity: String,
        id: String,
        reason: String,
    },

    /// A business rule refused the operation.
    #[error(transparent)]
    Rule(#[from] CoreError),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Database error: {0}")]
    Sqlx(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::Conflict {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn invalid_data(entity: impl Into<String>, id: impl Into<String>, reason: impl Into<String>) -> Self {
        DbError::InvalidData {
            entity: entity.into(),
            id: id.into(),
            reason: reason.into(),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    // "UNIQUE constraint failed: invoices.order_id"
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        field: message
                            .strip_prefix("UNIQUE constraint failed: ")
                            .unwrap_or(&message)
                            .to_string(),
                    },
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation(message),
                    _ => DbError::Sqlx(message),
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => DbError::ConnectionFailed(err.to_string()),
            other => DbError::Sqlx(other.to_string()),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;
