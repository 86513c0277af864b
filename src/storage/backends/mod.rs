//! Storage backend implementations

pub mod memory;
#[cfg(feature = "mysql")]
pub mod mysql;

pub use memory::{MemoryBackend, MemorySnapshot, MemoryStats, StoredOrder};
#[cfg(feature = "mysql")]
pub use mysql::MySqlBackend;
