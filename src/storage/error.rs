//! Errors raised by store backends

use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing a memory snapshot file
    #[error("Snapshot file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot format error: {0}")]
    Serialization(String),

    #[error("Query failed: {0}")]
    Database(String),

    /// The addressed row does not exist
    #[error("No such row: {0}")]
    NotFound(String),

    #[error("Store offline: {0}")]
    Unavailable(String),

    #[error("Store misconfigured: {0}")]
    Configuration(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Cannot connect: {0}")]
    Connection(String),

    #[error("Timed out after {0:?} waiting for the store")]
    Timeout(Duration),
}

impl StorageError {
    pub fn serialization<E: fmt::Display>(err: E) -> Self {
        Self::Serialization(err.to_string())
    }

    pub fn database<E: fmt::Display>(err: E) -> Self {
        Self::Database(err.to_string())
    }

    pub fn not_found<E: fmt::Display>(item: E) -> Self {
        Self::NotFound(item.to_string())
    }

    pub fn unavailable<E: fmt::Display>(msg: E) -> Self {
        Self::Unavailable(msg.to_string())
    }

    pub fn configuration<E: fmt::Display>(msg: E) -> Self {
        Self::Configuration(msg.to_string())
    }

    pub fn transaction<E: fmt::Display>(msg: E) -> Self {
        Self::Transaction(msg.to_string())
    }

    pub fn connection<E: fmt::Display>(msg: E) -> Self {
        Self::Connection(msg.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err)
    }
}

#[cfg(feature = "mysql")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::not_found("query returned no row"),
            sqlx::Error::PoolTimedOut => Self::unavailable("connection pool timed out"),
            sqlx::Error::Io(e) => Self::connection(e),
            sqlx::Error::Tls(e) => Self::connection(e),
            sqlx::Error::Database(db_err) => Self::database(db_err),
            other => Self::database(other),
        }
    }
}
