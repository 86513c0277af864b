use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::rpc::{RoutingRequest, RoutingRpc, RpcError};

#[derive(Debug, Clone)]
enum Reply {
    Report(String),
    Fail { error: String, detail: Option<String> },
    Unreachable,
}

/// Routing RPC that records every request and answers with a canned reply
#[derive(Clone)]
pub struct MockRoutingRpc {
    reply: Reply,
    call_history: Arc<Mutex<Vec<RoutingRequest>>>,
}

impl MockRoutingRpc {
    pub fn builder() -> MockRoutingRpcBuilder {
        MockRoutingRpcBuilder::new()
    }

    /// Mock that answers every call with `report`
    pub fn returning(report: &str) -> Self {
        Self::builder().with_report(report).build()
    }

    pub fn get_call_history(&self) -> Vec<RoutingRequest> {
        self.history().clone()
    }

    pub fn call_count(&self) -> usize {
        self.history().len()
    }

    pub fn verify_not_called(&self) -> bool {
        self.history().is_empty()
    }

    fn history(&self) -> std::sync::MutexGuard<'_, Vec<RoutingRequest>> {
        self.call_history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RoutingRpc for MockRoutingRpc {
    async fn setup(&self, request: &RoutingRequest) -> Result<String, RpcError> {
        self.history().push(request.clone());
        match &self.reply {
            Reply::Report(report) => Ok(report.clone()),
            Reply::Fail { error, detail } => Err(RpcError::call_failed(error, detail.clone())),
            Reply::Unreachable => Err(RpcError::Connect {
                router: "ws://mock/ws".to_string(),
                message: "connection refused".to_string(),
            }),
        }
    }
}

/// Builder for [`MockRoutingRpc`]
pub struct MockRoutingRpcBuilder {
    reply: Reply,
}

impl Default for MockRoutingRpcBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRoutingRpcBuilder {
    pub fn new() -> Self {
        Self {
            reply: Reply::Report(String::new()),
        }
    }

    pub fn with_report(mut self, report: &str) -> Self {
        self.reply = Reply::Report(report.to_string());
        self
    }

    pub fn with_error(mut self, error: &str, detail: Option<&str>) -> Self {
        self.reply = Reply::Fail {
            error: error.to_string(),
            detail: detail.map(str::to_string),
        };
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.reply = Reply::Unreachable;
        self
    }

    pub fn build(self) -> MockRoutingRpc {
        MockRoutingRpc {
            reply: self.reply,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }
}
