//! One routing run: admission, partition, dispatch

use tracing::{debug, info};

use crate::error::Result;
use crate::gate::{Admission, RunAdmissionGate, RunContext};
use crate::manifest::{ManifestPartitioner, PartitionOutcome};
use crate::rpc::{RoutingRequest, RoutingRpc};
use crate::storage::Store;

/// How a run ended when nothing failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Blocked(Admission),
    NoEligibleData,
    Dispatched {
        active: usize,
        deferred: usize,
        /// Report returned by the routing backend
        response: String,
    },
}

pub struct RunOrchestrator<'a> {
    store: &'a dyn Store,
    rpc: &'a dyn RoutingRpc,
}

impl<'a> RunOrchestrator<'a> {
    pub fn new(store: &'a dyn Store, rpc: &'a dyn RoutingRpc) -> Self {
        Self { store, rpc }
    }

    pub async fn run(&self, ctx: &RunContext, request: &RoutingRequest) -> Result<RunOutcome> {
        debug!(
            "Using {} store, {} run for {}",
            self.store.backend_name(),
            if ctx.is_manual { "manual" } else { "scheduled" },
            ctx.today
        );

        let admission = RunAdmissionGate::new(self.store).decide(ctx).await?;
        if !admission.is_admitted() {
            return Ok(RunOutcome::Blocked(admission));
        }

        let (active, deferred) = match ManifestPartitioner::new(self.store)
            .partition(&ctx.distributor_suffix, ctx.today)
            .await?
        {
            PartitionOutcome::NoData => return Ok(RunOutcome::NoEligibleData),
            PartitionOutcome::Success { active, deferred } => (active, deferred),
        };

        let request = dispatch_request(ctx, request);
        info!("Dispatching routing setup for {}", request.dist_suffix);
        debug!(
            "Routing payload: {}",
            request.redacted().to_json().unwrap_or_default()
        );
        let response = self.rpc.setup(&request).await?;

        Ok(RunOutcome::Dispatched {
            active,
            deferred,
            response,
        })
    }
}

/// A manual run routes on top of the existing assignments
fn dispatch_request(ctx: &RunContext, request: &RoutingRequest) -> RoutingRequest {
    let mut request = request.clone();
    request.dist_suffix = ctx.distributor_suffix.clone();
    if ctx.is_manual {
        request.reset = false;
    }
    request
}
