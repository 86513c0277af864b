//! Testing utilities and fixtures
//!
//! Seeded memory stores, order fixtures and a recording routing RPC, shared by
//! the unit tests and the integration tests under `tests/`.

pub mod fixtures;
pub mod mocks;

pub use fixtures::{fixture_today, order_fixture, StoreBuilder};
pub use mocks::{MockRoutingRpc, MockRoutingRpcBuilder};
