//! In-memory storage backend
//!
//! Used by the test suite and for dry runs against a JSON snapshot. A
//! transaction holds the state lock for its whole lifetime and works on a
//! staged copy that replaces the shared state on commit.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::storage::{
    config::StorageConfig,
    error::{StorageError, StorageResult},
    traits::{ConfigRepo, OrderRepo, Store, StoreTxn},
    types::{
        EligibleOrderFilter, OrderFlags, OrderId, OrderRecord, OrderState, RequestGroupId,
    },
};

/// Serializable contents of a memory store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    #[serde(default)]
    pub configs: BTreeMap<String, String>,
    #[serde(default)]
    pub orders: Vec<StoredOrder>,
}

impl MemorySnapshot {
    pub fn with_config(mut self, field: &str, value: &str) -> Self {
        self.configs.insert(field.to_string(), value.to_string());
        self
    }

    pub fn with_order(mut self, order: &OrderRecord) -> Self {
        self.orders.push(StoredOrder::from(order));
        self
    }
}

/// An order row as kept in a snapshot file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOrder {
    pub id: i64,
    pub request_group_id: i64,
    #[serde(default)]
    pub external_id: Option<String>,
    pub state: i32,
    pub order_type: String,
    #[serde(default)]
    pub planned_pickup_time: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
    #[serde(default)]
    pub flags: u32,
}

impl From<&OrderRecord> for StoredOrder {
    fn from(order: &OrderRecord) -> Self {
        Self {
            id: order.id.0,
            request_group_id: order.request_group_id.0,
            external_id: order.external_id.clone(),
            state: order.state.0,
            order_type: order.order_type.clone(),
            planned_pickup_time: order.planned_pickup_time,
            updated_at: order.updated_at,
            flags: order.flags.bits(),
        }
    }
}

impl From<&StoredOrder> for OrderRecord {
    fn from(row: &StoredOrder) -> Self {
        Self {
            id: OrderId(row.id),
            request_group_id: RequestGroupId(row.request_group_id),
            external_id: row.external_id.clone(),
            state: OrderState(row.state),
            order_type: row.order_type.clone(),
            planned_pickup_time: row.planned_pickup_time,
            updated_at: row.updated_at,
            flags: OrderFlags::from_bits_retain(row.flags),
        }
    }
}

/// Counters for operations issued against the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub transactions: usize,
    pub commits: usize,
    pub aborts: usize,
    pub config_writes: usize,
    pub flag_updates: usize,
}

#[derive(Debug, Default)]
struct FaultPlan {
    unavailable: bool,
    fail_update_of: Option<OrderId>,
    vanished_row: Option<OrderId>,
    fail_commit: bool,
}

/// In-memory storage backend
pub struct MemoryBackend {
    state: Arc<Mutex<MemorySnapshot>>,
    faults: Arc<StdMutex<FaultPlan>>,
    stats: Arc<StdMutex<MemoryStats>>,
    persist_path: Option<PathBuf>,
    timeout: Duration,
}

impl MemoryBackend {
    /// Create a memory backend, loading the configured snapshot if any
    pub async fn new(config: &StorageConfig) -> StorageResult<Self> {
        let memory = &config.memory;
        let snapshot = match &memory.persistence_path {
            Some(path) => {
                debug!("Loading memory snapshot from {}", path.display());
                let content = tokio::fs::read_to_string(path).await?;
                serde_json::from_str(&content)?
            }
            None => MemorySnapshot::default(),
        };

        let mut backend = Self::from_snapshot(snapshot);
        backend.timeout = config.timeout;
        if memory.persist_to_disk {
            backend.persist_path = memory.persistence_path.clone();
        }
        Ok(backend)
    }

    pub fn from_snapshot(snapshot: MemorySnapshot) -> Self {
        Self {
            state: Arc::new(Mutex::new(snapshot)),
            faults: Arc::new(StdMutex::new(FaultPlan::default())),
            stats: Arc::new(StdMutex::new(MemoryStats::default())),
            persist_path: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub async fn config_value(&self, field: &str) -> Option<String> {
        self.state.lock().await.configs.get(field).cloned()
    }

    pub async fn order_flags(&self, id: OrderId) -> Option<OrderFlags> {
        self.state
            .lock()
            .await
            .orders
            .iter()
            .find(|o| o.id == id.0)
            .map(|o| OrderFlags::from_bits_retain(o.flags))
    }

    pub fn stats(&self) -> MemoryStats {
        *lock(&self.stats)
    }

    /// Make every new transaction fail as if the database were down
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.faults).unavailable = unavailable;
    }

    /// Make the flag update of one order fail
    pub fn fail_update_of(&self, id: Option<OrderId>) {
        lock(&self.faults).fail_update_of = id;
    }

    /// Make the flag update of one order match no row, as if it were
    /// deleted after the eligibility query
    pub fn vanish_row_of(&self, id: Option<OrderId>) {
        lock(&self.faults).vanished_row = id;
    }

    pub fn fail_commit(&self, fail: bool) {
        lock(&self.faults).fail_commit = fail;
    }
}

fn lock<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Store for MemoryBackend {
    async fn start_transaction(&self) -> StorageResult<Box<dyn StoreTxn>> {
        if lock(&self.faults).unavailable {
            return Err(StorageError::unavailable("memory store is offline"));
        }

        let guard = tokio::time::timeout(self.timeout, Arc::clone(&self.state).lock_owned())
            .await
            .map_err(|_| StorageError::Timeout(self.timeout))?;
        let stage = guard.clone();
        lock(&self.stats).transactions += 1;

        Ok(Box::new(MemTxn {
            guard,
            stage,
            finalized: false,
            faults: Arc::clone(&self.faults),
            stats: Arc::clone(&self.stats),
            persist_path: self.persist_path.clone(),
        }))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Transaction bound to a memory backend
struct MemTxn {
    guard: OwnedMutexGuard<MemorySnapshot>,
    stage: MemorySnapshot,
    finalized: bool,
    faults: Arc<StdMutex<FaultPlan>>,
    stats: Arc<StdMutex<MemoryStats>>,
    persist_path: Option<PathBuf>,
}

impl Drop for MemTxn {
    fn drop(&mut self) {
        if !self.finalized {
            warn!("Dropping memory transaction without commit or abort");
        }
    }
}

#[async_trait]
impl StoreTxn for MemTxn {
    fn config(&mut self) -> &mut dyn ConfigRepo {
        self
    }

    fn orders(&mut self) -> &mut dyn OrderRepo {
        self
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        let mut txn = self;
        txn.finalized = true;
        if lock(&txn.faults).fail_commit {
            lock(&txn.stats).aborts += 1;
            return Err(StorageError::transaction("injected commit failure"));
        }

        let stage = std::mem::take(&mut txn.stage);
        *txn.guard = stage;
        lock(&txn.stats).commits += 1;

        if let Some(path) = txn.persist_path.clone() {
            let content = serde_json::to_string_pretty(&*txn.guard)?;
            tokio::fs::write(path, content).await?;
        }
        Ok(())
    }

    async fn abort(self: Box<Self>) -> StorageResult<()> {
        let mut txn = self;
        txn.finalized = true;
        lock(&txn.stats).aborts += 1;
        Ok(())
    }
}

#[async_trait]
impl ConfigRepo for MemTxn {
    async fn get(&mut self, field: &str) -> StorageResult<Option<String>> {
        Ok(self.stage.configs.get(field).cloned())
    }

    async fn set(&mut self, field: &str, value: &str) -> StorageResult<()> {
        lock(&self.stats).config_writes += 1;
        match self.stage.configs.get_mut(field) {
            Some(existing) => {
                *existing = value.to_string();
                Ok(())
            }
            None => Err(StorageError::not_found(format!("config field {field}"))),
        }
    }
}

#[async_trait]
impl OrderRepo for MemTxn {
    async fn query_eligible(
        &mut self,
        filter: &EligibleOrderFilter,
    ) -> StorageResult<Vec<OrderRecord>> {
        Ok(self
            .stage
            .orders
            .iter()
            .map(OrderRecord::from)
            .filter(|order| filter.matches(order))
            .collect())
    }

    async fn update_flags(
        &mut self,
        id: OrderId,
        group: RequestGroupId,
        flags: OrderFlags,
    ) -> StorageResult<bool> {
        lock(&self.stats).flag_updates += 1;
        {
            let faults = lock(&self.faults);
            if faults.fail_update_of == Some(id) {
                return Err(StorageError::database(format!(
                    "injected failure updating order {id}"
                )));
            }
            if faults.vanished_row == Some(id) {
                return Ok(false);
            }
        }

        match self
            .stage
            .orders
            .iter_mut()
            .find(|o| o.id == id.0 && o.request_group_id == group.0)
        {
            Some(row) => {
                row.flags = flags.bits();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::MANUAL_RUN_FIELD;
    use crate::testing::fixtures::order_fixture;
    use chrono::NaiveDate;

    fn backend() -> MemoryBackend {
        MemoryBackend::from_snapshot(
            MemorySnapshot::default()
                .with_config(MANUAL_RUN_FIELD, "")
                .with_order(&order_fixture(1, 10, 8)),
        )
    }

    #[tokio::test]
    async fn test_commit_publishes_staged_writes() {
        let backend = backend();
        let mut txn = backend.start_transaction().await.unwrap();
        txn.config().set(MANUAL_RUN_FIELD, "2026-10-15").await.unwrap();
        assert!(txn
            .orders()
            .update_flags(OrderId(1), RequestGroupId(100), OrderFlags::FIXED)
            .await
            .unwrap());

        // staged only
        assert_eq!(backend.stats().commits, 0);
        txn.commit().await.unwrap();

        assert_eq!(
            backend.config_value(MANUAL_RUN_FIELD).await.as_deref(),
            Some("2026-10-15")
        );
        assert_eq!(backend.order_flags(OrderId(1)).await, Some(OrderFlags::FIXED));
    }

    #[tokio::test]
    async fn test_abort_discards_staged_writes() {
        let backend = backend();
        let mut txn = backend.start_transaction().await.unwrap();
        txn.config().set(MANUAL_RUN_FIELD, "2026-10-15").await.unwrap();
        txn.abort().await.unwrap();

        assert_eq!(backend.config_value(MANUAL_RUN_FIELD).await.as_deref(), Some(""));
        assert_eq!(backend.stats().aborts, 1);
    }

    #[tokio::test]
    async fn test_set_requires_existing_row() {
        let backend = backend();
        let mut txn = backend.start_transaction().await.unwrap();
        let err = txn.config().set("MB_unknown", "1").await.unwrap_err();
        assert!(err.is_not_found());
        txn.abort().await.unwrap();
    }

    #[tokio::test]
    async fn test_update_requires_matching_group() {
        let backend = backend();
        let mut txn = backend.start_transaction().await.unwrap();
        let matched = txn
            .orders()
            .update_flags(OrderId(1), RequestGroupId(999), OrderFlags::FIXED)
            .await
            .unwrap();
        assert!(!matched);
        txn.abort().await.unwrap();
    }

    #[tokio::test]
    async fn test_unavailable_store_refuses_transactions() {
        let backend = backend();
        backend.set_unavailable(true);
        assert!(matches!(
            backend.start_transaction().await,
            Err(StorageError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_snapshot_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let seed = MemorySnapshot::default()
            .with_config(MANUAL_RUN_FIELD, "")
            .with_order(&order_fixture(1, 10, 8));
        std::fs::write(&path, serde_json::to_string(&seed).unwrap()).unwrap();

        let backend = MemoryBackend::new(&StorageConfig::memory_file(&path))
            .await
            .unwrap();
        let mut txn = backend.start_transaction().await.unwrap();
        txn.config().set(MANUAL_RUN_FIELD, "2026-10-16").await.unwrap();
        txn.commit().await.unwrap();

        let written: MemorySnapshot =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.configs[MANUAL_RUN_FIELD], "2026-10-16");
        assert_eq!(written.orders, seed.orders);
    }

    #[tokio::test]
    async fn test_query_applies_filter() {
        let backend = backend();
        let mut txn = backend.start_transaction().await.unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();

        let found = txn
            .orders()
            .query_eligible(&EligibleOrderFilter::for_run(".SP.", today))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        let found = txn
            .orders()
            .query_eligible(&EligibleOrderFilter::for_run(".TA.", today))
            .await
            .unwrap();
        assert!(found.is_empty());
        txn.abort().await.unwrap();
    }
}
