//! Pure partition planning

use crate::error::{DistribError, Result};
use crate::storage::{OrderFlags, OrderId, OrderRecord, RequestGroupId, CHUNK_SIZE_FIELD};

/// Target flags for one order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagAssignment {
    pub order_id: OrderId,
    pub request_group_id: RequestGroupId,
    pub current: OrderFlags,
    pub target: OrderFlags,
}

impl FlagAssignment {
    pub fn is_deferred(&self) -> bool {
        self.target.is_deferred()
    }

    pub fn changes(&self) -> bool {
        self.current != self.target
    }
}

/// Split of the eligible orders, in manifest order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    pub assignments: Vec<FlagAssignment>,
    pub active: usize,
    pub deferred: usize,
    /// The configured chunk size was larger than the number of orders
    pub clamped: bool,
}

/// Order by planned pickup, unplanned first, ties by id
pub fn sort_for_manifest(orders: &mut [OrderRecord]) {
    orders.sort_by_key(|order| (order.planned_pickup_time, order.id));
}

/// Compute the partition: positions `[0, k)` active, `[k, n)` deferred,
/// with `k = min(chunk_size, n)`.
pub fn plan_partition(mut orders: Vec<OrderRecord>, chunk_size: usize) -> PartitionPlan {
    sort_for_manifest(&mut orders);

    let total = orders.len();
    let active = chunk_size.min(total);
    let assignments = orders
        .iter()
        .enumerate()
        .map(|(position, order)| FlagAssignment {
            order_id: order.id,
            request_group_id: order.request_group_id,
            current: order.flags,
            target: order.flags.with_deferred(position >= active),
        })
        .collect();

    PartitionPlan {
        assignments,
        active,
        deferred: total - active,
        clamped: chunk_size > total,
    }
}

/// Interpret the stored chunk size
pub fn parse_chunk_size(raw: Option<&str>) -> Result<usize> {
    let value = match raw.map(str::trim) {
        None => return Err(DistribError::config_missing(CHUNK_SIZE_FIELD, "field is absent")),
        Some("") => return Err(DistribError::config_missing(CHUNK_SIZE_FIELD, "field is empty")),
        Some(value) => value,
    };
    value.parse::<usize>().map_err(|_| {
        DistribError::config_missing(
            CHUNK_SIZE_FIELD,
            format!("'{value}' is not a non-negative integer"),
        )
    })
}
