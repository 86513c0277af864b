//! Manifest chunk partitioner
//!
//! Splits the orders eligible for today's manifest into an active chunk,
//! bounded by the configured chunk size, and a deferred remainder marked with
//! [`OrderFlags::FIXED`](crate::storage::OrderFlags::FIXED). The whole batch
//! is written in one transaction.

pub mod plan;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::{DistribError, Result};
use crate::storage::{
    EligibleOrderFilter, StorageError, Store, StoreTxn, CHUNK_SIZE_FIELD,
};

pub use plan::{parse_chunk_size, plan_partition, sort_for_manifest, FlagAssignment, PartitionPlan};

/// Result of a partition attempt that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionOutcome {
    /// Nothing is waiting for a manifest; the run has nothing to route
    NoData,
    Success { active: usize, deferred: usize },
}

pub struct ManifestPartitioner<'a> {
    store: &'a dyn Store,
}

impl<'a> ManifestPartitioner<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Partition the orders of `distributor_suffix` eligible on `today`
    pub async fn partition(
        &self,
        distributor_suffix: &str,
        today: NaiveDate,
    ) -> Result<PartitionOutcome> {
        let mut txn = self
            .store
            .start_transaction()
            .await
            .map_err(|e| DistribError::store_unavailable("opening manifest transaction", e))?;

        let filter = EligibleOrderFilter::for_run(distributor_suffix, today);
        match partition_in(txn.as_mut(), &filter).await {
            Ok(Some(plan)) => {
                txn.commit()
                    .await
                    .map_err(|e| DistribError::store_unavailable("committing manifest flags", e))?;
                info!(
                    "Manifest partitioned: {} active, {} deferred",
                    plan.active, plan.deferred
                );
                Ok(PartitionOutcome::Success {
                    active: plan.active,
                    deferred: plan.deferred,
                })
            }
            Ok(None) => {
                abort(txn).await;
                info!(
                    "No orders of type {}* awaiting a manifest between {} and {}",
                    filter.type_prefix, filter.window.start, filter.window.end
                );
                Ok(PartitionOutcome::NoData)
            }
            Err(e) => {
                abort(txn).await;
                Err(e)
            }
        }
    }
}

async fn partition_in(
    txn: &mut dyn StoreTxn,
    filter: &EligibleOrderFilter,
) -> Result<Option<PartitionPlan>> {
    let raw = txn
        .config()
        .get(CHUNK_SIZE_FIELD)
        .await
        .map_err(|e| DistribError::store_unavailable("reading chunk size", e))?;
    let chunk_size = parse_chunk_size(raw.as_deref())?;
    if chunk_size == 0 {
        warn!("Chunk size is 0, every eligible order will be deferred");
    }

    let orders = txn
        .orders()
        .query_eligible(filter)
        .await
        .map_err(|e| DistribError::store_unavailable("querying eligible orders", e))?;
    if orders.is_empty() {
        return Ok(None);
    }

    let plan = plan_partition(orders, chunk_size);
    if plan.clamped {
        info!(
            "Chunk size {} exceeds the {} eligible orders, using {}",
            chunk_size,
            plan.assignments.len(),
            plan.active
        );
    }

    for assignment in &plan.assignments {
        debug!(
            "Order {} -> {}",
            assignment.order_id,
            if assignment.is_deferred() { "deferred" } else { "active" }
        );
        let matched = txn
            .orders()
            .update_flags(
                assignment.order_id,
                assignment.request_group_id,
                assignment.target,
            )
            .await
            .map_err(|e| DistribError::partial_write(assignment.order_id, e))?;
        if !matched {
            return Err(DistribError::partial_write(
                assignment.order_id,
                StorageError::not_found(format!(
                    "order {} in request group {}",
                    assignment.order_id, assignment.request_group_id
                )),
            ));
        }
    }

    Ok(Some(plan))
}

async fn abort(txn: Box<dyn StoreTxn>) {
    if let Err(e) = txn.abort().await {
        warn!("Failed to abort manifest transaction: {}", e);
    }
}
