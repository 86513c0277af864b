//! Core trait definitions for the storage abstraction layer

use async_trait::async_trait;

use super::error::StorageResult;
use super::types::{EligibleOrderFilter, OrderFlags, OrderId, OrderRecord, RequestGroupId};

/// Transactional access to the config and order tables
#[async_trait]
pub trait Store: Send + Sync {
    /// Begin a transaction. Nothing written through it is visible to other
    /// transactions until [`StoreTxn::commit`].
    async fn start_transaction(&self) -> StorageResult<Box<dyn StoreTxn>>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// An open store transaction
///
/// Dropping a transaction without calling `commit` discards its writes.
#[async_trait]
pub trait StoreTxn: Send {
    fn config(&mut self) -> &mut dyn ConfigRepo;

    fn orders(&mut self) -> &mut dyn OrderRepo;

    async fn commit(self: Box<Self>) -> StorageResult<()>;

    async fn abort(self: Box<Self>) -> StorageResult<()>;
}

/// Named scalar settings, one row per field
#[async_trait]
pub trait ConfigRepo: Send {
    /// Read a field. `None` when no row exists.
    async fn get(&mut self, field: &str) -> StorageResult<Option<String>>;

    /// Overwrite an existing field. Fails with `NotFound` when the row is absent.
    async fn set(&mut self, field: &str, value: &str) -> StorageResult<()>;
}

/// Order rows
#[async_trait]
pub trait OrderRepo: Send {
    /// Every order matching the filter, in no particular order
    async fn query_eligible(&mut self, filter: &EligibleOrderFilter)
        -> StorageResult<Vec<OrderRecord>>;

    /// Set the flag column of the order matching both `id` and `group`.
    ///
    /// Returns `false` when no such row exists.
    async fn update_flags(
        &mut self,
        id: OrderId,
        group: RequestGroupId,
        flags: OrderFlags,
    ) -> StorageResult<bool>;
}
