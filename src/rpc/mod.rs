//! Routing RPC boundary
//!
//! The routing computation runs elsewhere; this module only knows how to hand
//! it a [`RoutingRequest`] and read back its textual report.

pub mod client;
pub mod request;
pub mod wamp;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::error::ErrorCode;

pub use client::WampClient;
pub use request::RoutingRequest;

/// Invokes the routing setup procedure
#[async_trait]
pub trait RoutingRpc: Send + Sync {
    /// Run the routing setup with `request`, returning the backend's report
    async fn setup(&self, request: &RoutingRequest) -> Result<String, RpcError>;
}

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Failed to connect to router {router}: {message}")]
    Connect { router: String, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Session aborted by router: {reason}")]
    Aborted { reason: String },

    #[error("Procedure failed with {error}{}", detail_suffix(.detail))]
    CallFailed {
        error: String,
        detail: Option<String>,
    },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timeout: routing call took longer than {0:?}")]
    Timeout(Duration),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_ref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

impl RpcError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn call_failed(error: impl Into<String>, detail: Option<String>) -> Self {
        Self::CallFailed {
            error: error.into(),
            detail,
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::Connect { .. } => ErrorCode::RPC_CONNECT_FAILED,
            Self::CallFailed { .. } => ErrorCode::RPC_CALL_FAILED,
            Self::Protocol(_) | Self::Serialization(_) => ErrorCode::RPC_PROTOCOL_ERROR,
            Self::Transport(_) | Self::Aborted { .. } | Self::Timeout(_) => ErrorCode::RPC_GENERIC,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_failed_display() {
        let err = RpcError::call_failed("wamp.error.runtime_error", Some("no vehicles".into()));
        assert_eq!(
            err.to_string(),
            "Procedure failed with wamp.error.runtime_error: no vehicles"
        );
        let err = RpcError::call_failed("wamp.error.canceled", None);
        assert_eq!(err.to_string(), "Procedure failed with wamp.error.canceled");
    }
}
