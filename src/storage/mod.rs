//! Storage abstraction layer
//!
//! The config table (named scalar fields) and the order table are reached
//! through one transactional [`Store`]. Backends: an in-memory store for tests
//! and snapshot runs, and MySQL behind the default `mysql` feature.

pub mod backends;
pub mod config;
pub mod error;
pub mod factory;
pub mod traits;
pub mod types;

pub use backends::{MemoryBackend, MemorySnapshot, MemoryStats};
pub use config::{BackendType, MemoryConfig, MySqlConfig, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use factory::StorageFactory;
pub use traits::{ConfigRepo, OrderRepo, Store, StoreTxn};
pub use types::{
    DateWindow, EligibleOrderFilter, OrderFlags, OrderId, OrderRecord, OrderState,
    RequestGroupId, CHUNK_SIZE_FIELD, MANUAL_RUN_FIELD,
};
