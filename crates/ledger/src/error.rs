use domain::OrderError;
use thiserror::Error;

/// Errors that can occur when reading or writing the ledger.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A record with the same key already exists.
    #[error("Duplicate {entity}: {key}")]
    Duplicate { entity: &'static str, key: String },

    /// A stored row could not be turned back into a domain value.
    #[error("Corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// A stored order violates a domain invariant.
    #[error("Order invariant violated: {0}")]
    Domain(#[from] OrderError),

    /// The store refused the operation (used to simulate outages).
    #[error("Store unavailable")]
    Unavailable,
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, StoreError>;
