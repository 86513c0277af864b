use thiserror::Error;

use crate::rpc::RpcError;
use crate::storage::{OrderId, StorageError};

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

/// The unified error type for a distrib-exec invocation
///
/// Every variant is fatal for the current invocation. Benign early exits
/// (blocked run, no eligible orders) are outcomes, not errors.
#[derive(Error, Debug)]
pub enum DistribError {
    #[error("[E{code:04}] Store unavailable: {message}")]
    StoreUnavailable {
        code: u16,
        message: String,
        #[source]
        source: Option<StorageError>,
    },

    #[error("[E{code:04}] Configuration field '{field}' is missing or invalid: {reason}")]
    ConfigMissing {
        code: u16,
        field: String,
        reason: String,
    },

    #[error("[E{code:04}] Run flag '{field}' holds unreadable value '{value}'")]
    CorruptRunFlag {
        code: u16,
        field: String,
        value: String,
    },

    #[error("[E{code:04}] Flag update of order {order_id} failed, batch aborted: {source}")]
    PartialWriteFailure {
        code: u16,
        order_id: OrderId,
        #[source]
        source: StorageError,
    },

    #[error("[E{code:04}] Routing call failed: {source}")]
    Rpc {
        code: u16,
        #[source]
        source: RpcError,
    },

    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl DistribError {
    /// Wrap a storage failure that prevents any safe decision
    pub fn store_unavailable(message: impl Into<String>, source: StorageError) -> Self {
        Self::StoreUnavailable {
            code: ErrorCode::STORAGE_UNAVAILABLE,
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn config_missing(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigMissing {
            code: ErrorCode::CONFIG_CHUNK_SIZE_MISSING,
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn corrupt_run_flag(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::CorruptRunFlag {
            code: ErrorCode::ADMISSION_CORRUPT_RUN_FLAG,
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn partial_write(order_id: OrderId, source: StorageError) -> Self {
        Self::PartialWriteFailure {
            code: ErrorCode::MANIFEST_PARTIAL_WRITE,
            order_id,
            source,
        }
    }

    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::CONFIG_GENERIC,
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with specific code and source
    pub fn config_with_source(
        code: u16,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } | Self::ConfigMissing { .. } => 2,
            Self::StoreUnavailable { .. }
            | Self::CorruptRunFlag { .. }
            | Self::PartialWriteFailure { .. } => 4,
            Self::Rpc { .. } => 5,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::StoreUnavailable { code, .. }
            | Self::ConfigMissing { code, .. }
            | Self::CorruptRunFlag { code, .. }
            | Self::PartialWriteFailure { code, .. }
            | Self::Rpc { code, .. }
            | Self::Config { code, .. } => *code,
        }
    }

    /// The order whose write aborted the manifest batch, if any
    pub fn failed_order(&self) -> Option<OrderId> {
        match self {
            Self::PartialWriteFailure { order_id, .. } => Some(*order_id),
            _ => None,
        }
    }
}

impl From<RpcError> for DistribError {
    fn from(source: RpcError) -> Self {
        Self::Rpc {
            code: source.code(),
            source,
        }
    }
}

/// Result type alias using DistribError
pub type Result<T> = std::result::Result<T, DistribError>;
