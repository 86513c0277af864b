//! Builders for seeded stores

use crate::storage::{
    MemoryBackend, MemorySnapshot, OrderRecord, CHUNK_SIZE_FIELD, MANUAL_RUN_FIELD,
};

/// Builder for a memory store holding both config rows and some orders
pub struct StoreBuilder {
    snapshot: MemorySnapshot,
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreBuilder {
    /// Empty run flag, chunk size 4, no orders
    pub fn new() -> Self {
        Self {
            snapshot: MemorySnapshot::default()
                .with_config(MANUAL_RUN_FIELD, "")
                .with_config(CHUNK_SIZE_FIELD, "4"),
        }
    }

    pub fn with_run_flag(mut self, value: &str) -> Self {
        self.snapshot = self.snapshot.with_config(MANUAL_RUN_FIELD, value);
        self
    }

    pub fn with_chunk_size(mut self, value: &str) -> Self {
        self.snapshot = self.snapshot.with_config(CHUNK_SIZE_FIELD, value);
        self
    }

    pub fn without_chunk_size(mut self) -> Self {
        self.snapshot.configs.remove(CHUNK_SIZE_FIELD);
        self
    }

    pub fn with_order(mut self, order: &OrderRecord) -> Self {
        self.snapshot = self.snapshot.with_order(order);
        self
    }

    pub fn with_orders<'a>(mut self, orders: impl IntoIterator<Item = &'a OrderRecord>) -> Self {
        for order in orders {
            self.snapshot = self.snapshot.with_order(order);
        }
        self
    }

    pub fn snapshot(self) -> MemorySnapshot {
        self.snapshot
    }

    pub fn build(self) -> MemoryBackend {
        MemoryBackend::from_snapshot(self.snapshot)
    }
}
