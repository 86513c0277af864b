//! Record types shared by the storage backends

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Config table field holding the date of the last manual run (or empty)
pub const MANUAL_RUN_FIELD: &str = "MB_distrib_exec_manual_run";

/// Config table field holding the manifest chunk size
pub const CHUNK_SIZE_FIELD: &str = "MB_distrib_chunk_size";

/// How far back `updated_at` may lie for an order to be eligible
pub const ELIGIBLE_WINDOW_DAYS: u64 = 2;

/// Order primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request group an order was submitted in (`o_req_uid`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestGroupId(pub i64);

impl fmt::Display for RequestGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of an order (`o_order_state`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderState(pub i32);

impl OrderState {
    /// Accepted and waiting to be put on a manifest
    pub const AWAITING_MANIFEST: Self = Self(2);
}

bitflags::bitflags! {
    /// Flag bits stored on each order row.
    ///
    /// Several subsystems share this column; the manifest partitioner only
    /// owns [`OrderFlags::FIXED`] and must carry every other bit through.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OrderFlags: u32 {
        const DELIVERY_NOTIFIED = 0x1;
        const PREDEFINED_TIME_WINDOW = 0x4;
        /// Deferred out of the current manifest chunk
        const FIXED = 0x8;

        const _ = !0;
    }
}

impl OrderFlags {
    /// Rewrite only the partition bit, keeping bits owned elsewhere
    pub fn with_deferred(self, deferred: bool) -> Self {
        let mut flags = self;
        flags.set(Self::FIXED, deferred);
        flags
    }

    pub fn is_deferred(self) -> bool {
        self.contains(Self::FIXED)
    }
}

/// An order row as read for manifest partitioning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub id: OrderId,
    pub request_group_id: RequestGroupId,
    pub external_id: Option<String>,
    pub state: OrderState,
    pub order_type: String,
    pub planned_pickup_time: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
    pub flags: OrderFlags,
}

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// The `days` days before `end` plus `end` itself
    pub fn trailing(end: NaiveDate, days: u64) -> Self {
        let start = end.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Selection of orders eligible for a distributor's manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleOrderFilter {
    pub state: OrderState,
    /// Orders whose type starts with this prefix (`DIST<suffix>`)
    pub type_prefix: String,
    pub window: DateWindow,
}

impl EligibleOrderFilter {
    pub fn for_run(distributor_suffix: &str, today: NaiveDate) -> Self {
        Self {
            state: OrderState::AWAITING_MANIFEST,
            type_prefix: format!("DIST{distributor_suffix}"),
            window: DateWindow::trailing(today, ELIGIBLE_WINDOW_DAYS),
        }
    }

    pub fn matches(&self, order: &OrderRecord) -> bool {
        order.state == self.state
            && order.order_type.starts_with(&self.type_prefix)
            && self.window.contains(order.updated_at.date())
    }
}
