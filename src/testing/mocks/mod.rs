//! Mock implementations for testing

pub mod rpc;

pub use rpc::{MockRoutingRpc, MockRoutingRpcBuilder};
