//! Common error types shared across crates.
//!
//! These cover the failure modes of the external collaborators (database,
//! cache). Module-specific errors in the service crate wrap or stand next to
//! these using `#[from]`.

use thiserror::Error;

/// Database-related errors.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StorageError {
    /// Query execution failed
    #[error("query failed: {0}")]
    Query(String),

    /// Connection to the database failed
    #[error("database connection failed: {0}")]
    Connection(String),

    /// Row contained a value we could not map
    #[error("row decode failed: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => {
                StorageError::Connection(err.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StorageError::Decode(err.to_string())
            }
            _ => StorageError::Query(err.to_string()),
        }
    }
}

/// Cache-related errors (Redis hot-set and snapshot namespaces).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CacheError {
    /// Cache connection failed
    #[error("cache connection failed: {0}")]
    Connection(String),

    /// Cache read failed
    #[error("cache read failed: {0}")]
    Read(String),

    /// Cache write failed
    #[error("cache write failed: {0}")]
    Write(String),

    /// Cache serialization failed
    #[error("cache serialization error: {0}")]
    Serialization(String),

    /// Cache is unavailable (degraded mode)
    #[error("cache unavailable")]
    Unavailable,
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
            CacheError::Connection(err.to_string())
        } else {
            CacheError::Read(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}
