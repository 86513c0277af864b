//! Test fixtures and data builders
//!
//! Dates are pinned around Friday 2026-10-16 so weekday rules are exercised
//! deterministically.

pub mod builders;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::storage::{OrderFlags, OrderId, OrderRecord, OrderState, RequestGroupId};

pub use builders::StoreBuilder;

/// Request group every fixture order belongs to
pub const FIXTURE_GROUP: RequestGroupId = RequestGroupId(100);

/// Order type matching the default `.SP.` distributor
pub const FIXTURE_ORDER_TYPE: &str = "DIST.SP.EXPRESS";

/// Friday
pub fn fixture_today() -> NaiveDate {
    date(2026, 10, 16)
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

/// Planned pickup `slot` quarter hours after 06:00 on the fixture day
pub fn pickup_at(slot: u32) -> NaiveDateTime {
    fixture_today().and_time(chrono::NaiveTime::MIN)
        + Duration::hours(6)
        + Duration::minutes(15 * i64::from(slot))
}

/// An eligible order with a planned pickup in `pickup_slot` and raw `flags`
pub fn order_fixture(id: i64, pickup_slot: u32, flags: u32) -> OrderRecord {
    OrderRecord {
        id: OrderId(id),
        request_group_id: FIXTURE_GROUP,
        external_id: Some(format!("EXT-{id:05}")),
        state: OrderState::AWAITING_MANIFEST,
        order_type: FIXTURE_ORDER_TYPE.to_string(),
        planned_pickup_time: Some(pickup_at(pickup_slot)),
        updated_at: fixture_today().and_time(chrono::NaiveTime::MIN) - Duration::hours(5),
        flags: OrderFlags::from_bits_retain(flags),
    }
}

/// An eligible order with no planned pickup time
pub fn unplanned_order_fixture(id: i64, flags: u32) -> OrderRecord {
    OrderRecord {
        planned_pickup_time: None,
        ..order_fixture(id, 0, flags)
    }
}

/// `n` orders with ids `1..=n` whose pickups run in reverse id order
pub fn reversed_orders(n: i64) -> Vec<OrderRecord> {
    (1..=n)
        .map(|id| order_fixture(id, (n - id) as u32, 0))
        .collect()
}
