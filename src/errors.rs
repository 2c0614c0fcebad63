//! Unified error types for the catalog core.
//!
//! Every failure surfaced by the core carries a stable kind so that callers
//! (request handlers, admin tooling) can map it to a transport response
//! without string matching. Soft-delete outcomes are *not* errors; they are
//! reported as distinct success values by the coordinator.

use thiserror::Error;

/// Error taxonomy for all catalog and inventory operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed required input (empty name, non-positive price,
    /// negative inventory delta, unparseable variant payload).
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Unique-constraint violations (slug, name, SKU, flavor+weight combo)
    /// and an exhausted SKU retry budget.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Business-rule rejections that are not simple uniqueness: deleting a
    /// category with children, deleting the last variant or image, deleting
    /// an in-use lookup value.
    #[error("Invariant violation: {message}")]
    InvariantViolation { message: String },

    /// Configuration error (settings file, environment).
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Blob store collaborator failure that is not absorbed by the
    /// best-effort deletion policy.
    #[error("Blob store error: {message}")]
    BlobStore { message: String },

    /// Unexpected storage error; always aborts the enclosing transaction.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O error from the local blob store backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
