//! MySQL storage backend implementation
//!
//! Operates on the existing `configs` and `orders` tables; it never creates
//! or migrates schema.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::mysql::{MySql, MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::{ConnectOptions, Row, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::storage::config::StorageConfig;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::traits::{ConfigRepo, OrderRepo, Store, StoreTxn};
use crate::storage::types::{
    EligibleOrderFilter, OrderFlags, OrderId, OrderRecord, OrderState, RequestGroupId,
};

/// MySQL storage backend
pub struct MySqlBackend {
    pool: MySqlPool,
}

impl MySqlBackend {
    /// Connect a pool using the configured URL
    pub async fn new(config: &StorageConfig) -> StorageResult<Self> {
        let url = config
            .mysql
            .url
            .as_deref()
            .ok_or_else(|| StorageError::configuration("MySQL backend requires a url"))?;

        info!("Initializing MySQL backend");

        let connect_options = MySqlConnectOptions::from_str(url)
            .map_err(|e| StorageError::connection(format!("Invalid connection string: {e}")))?
            .log_statements(log::LevelFilter::Debug)
            .log_slow_statements(log::LevelFilter::Warn, Duration::from_secs(1));

        let pool = MySqlPoolOptions::new()
            .max_connections(config.mysql.max_connections.max(1))
            .acquire_timeout(config.timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| StorageError::connection(format!("Failed to connect to database: {e}")))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for MySqlBackend {
    async fn start_transaction(&self) -> StorageResult<Box<dyn StoreTxn>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlTxn { tx }))
    }

    fn backend_name(&self) -> &'static str {
        "mysql"
    }
}

struct MySqlTxn {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl StoreTxn for MySqlTxn {
    fn config(&mut self) -> &mut dyn ConfigRepo {
        self
    }

    fn orders(&mut self) -> &mut dyn OrderRepo {
        self
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| StorageError::transaction(format!("commit failed: {e}")))
    }

    async fn abort(self: Box<Self>) -> StorageResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| StorageError::transaction(format!("rollback failed: {e}")))
    }
}

#[async_trait]
impl ConfigRepo for MySqlTxn {
    async fn get(&mut self, field: &str) -> StorageResult<Option<String>> {
        // Locking read: keeps the gate's read-decide-write atomic
        let value: Option<Option<String>> =
            sqlx::query_scalar("SELECT value FROM configs WHERE field = ? FOR UPDATE")
                .bind(field)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(value.map(Option::unwrap_or_default))
    }

    async fn set(&mut self, field: &str, value: &str) -> StorageResult<()> {
        // sqlx connects with CLIENT_FOUND_ROWS, so an unchanged value still counts
        let result = sqlx::query("UPDATE configs SET value = ? WHERE field = ?")
            .bind(value)
            .bind(field)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(format!("config field {field}")));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepo for MySqlTxn {
    async fn query_eligible(
        &mut self,
        filter: &EligibleOrderFilter,
    ) -> StorageResult<Vec<OrderRecord>> {
        let pattern = format!("{}%", escape_like(&filter.type_prefix));
        debug!(
            "Querying eligible orders: type LIKE '{}', updated {}..={}",
            pattern, filter.window.start, filter.window.end
        );

        let rows = sqlx::query(
            "SELECT id, o_payment_id, o_req_uid, o_external_id, o_order_state, o_type_d, \
                    o_pickup_time_planned, updated_at \
             FROM orders \
             WHERE o_order_state = ? \
               AND o_type_d LIKE ? \
               AND DATE(updated_at) BETWEEN ? AND ?",
        )
        .bind(filter.state.0)
        .bind(pattern)
        .bind(filter.window.start)
        .bind(filter.window.end)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(order_from_row).collect()
    }

    async fn update_flags(
        &mut self,
        id: OrderId,
        group: RequestGroupId,
        flags: OrderFlags,
    ) -> StorageResult<bool> {
        let result = sqlx::query("UPDATE orders SET o_payment_id = ? WHERE id = ? AND o_req_uid = ?")
            .bind(flags.bits())
            .bind(id.0)
            .bind(group.0)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn order_from_row(row: &sqlx::mysql::MySqlRow) -> StorageResult<OrderRecord> {
    let flags: Option<i64> = row.try_get("o_payment_id")?;
    Ok(OrderRecord {
        id: OrderId(row.try_get("id")?),
        request_group_id: RequestGroupId(row.try_get("o_req_uid")?),
        external_id: row.try_get("o_external_id")?,
        state: OrderState(row.try_get("o_order_state")?),
        order_type: row.try_get("o_type_d")?,
        planned_pickup_time: row.try_get::<Option<NaiveDateTime>, _>("o_pickup_time_planned")?,
        updated_at: row.try_get("updated_at")?,
        flags: flags_from_column(flags)?,
    })
}

/// `o_payment_id` is a signed column; anything outside `u32` is corrupt data
fn flags_from_column(value: Option<i64>) -> StorageResult<OrderFlags> {
    let raw = value.unwrap_or_default();
    let bits = u32::try_from(raw).map_err(|_| {
        StorageError::serialization(format!("o_payment_id {raw} does not fit the flag word"))
    })?;
    Ok(OrderFlags::from_bits_retain(bits))
}

/// Escape LIKE wildcards so the prefix matches literally
fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
