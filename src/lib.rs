//! # distrib-exec
//!
//! Gatekeeper for the daily distribution routing run: decides whether today's
//! run may execute, picks the chunk of pending orders it will consider, and
//! hands the run to the routing backend over WAMP.
//!
//! ## Usage
//!
//! ```bash
//! distrib-exec [--manual-run] [-S ".SP."] [-R ws://router:8080/ws] [--show-data]
//! ```
//!
//! ## Modules
//!
//! - `gate` - Run-admission rule over the persisted manual-run flag
//! - `manifest` - Splits eligible orders into an active chunk and a deferred rest
//! - `orchestrator` - Admission, partition and dispatch of one run
//! - `rpc` - Routing request payload and the WAMP client
//! - `storage` - Transactional config and order store with memory and MySQL backends
//! - `config` - Layered application configuration
//! - `cli` - Command line flags
//! - `logging` - Tracing subscriber setup
//! - `error` - Error type, codes and exit codes
//! - `testing` - Fixtures and mocks for tests
pub mod cli;
pub mod config;
pub mod error;
pub mod gate;
pub mod logging;
pub mod manifest;
pub mod orchestrator;
pub mod rpc;
pub mod storage;

pub mod testing;

pub use error::{DistribError, Result};
