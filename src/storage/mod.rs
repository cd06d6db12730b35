//! Single-table storage.
//!
//! Every entity and every hand-built index is a row in one partitioned
//! key-value table addressed by a [`TableKey`] (partition key + sort key).
//! [`TableStore`] is the narrow set of primitives the repositories may use:
//! point reads and writes with conditions, range queries by sort-key prefix,
//! batch reads, a prefix scan, and an all-or-nothing multi-item transaction.
//!
//! Implementations:
//! - `MemoryTableStore`: in-process table, used for tests and the demo
//! - `DynamoTableStore`: AWS DynamoDB (`dynamo` feature)

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::config::{StorageConfig, StorageType};
pub use crate::keys::TableKey;

pub mod item;
pub mod memory;

#[cfg(feature = "dynamo")]
pub mod dynamo;

pub use item::{from_item, item_key, to_item, Item, PK, SK};
pub use memory::MemoryTableStore;

#[cfg(feature = "dynamo")]
pub use dynamo::DynamoTableStore;

/// Most operations a single transaction may carry.
pub const MAX_TRANSACTION_OPS: usize = 100;

/// Most keys fetched per batch read round trip.
pub const MAX_BATCH_GET_KEYS: usize = 100;

/// Why one operation of a canceled transaction was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// This operation was fine; another one canceled the transaction.
    None,
    ConditionFailed,
    Conflict,
    Other(String),
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancelReason::None => f.write_str("None"),
            CancelReason::ConditionFailed => f.write_str("ConditionalCheckFailed"),
            CancelReason::Conflict => f.write_str("TransactionConflict"),
            CancelReason::Other(code) => f.write_str(code),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Conditional check failed for {key}")]
    ConditionFailed { key: TableKey },

    #[error("Transaction canceled: [{}]", .reasons.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    TransactionCanceled { reasons: Vec<CancelReason> },

    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Transaction too large: {0} operations (max {MAX_TRANSACTION_OPS})")]
    TooManyOperations(usize),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Injected failure: {0}")]
    Injected(String),
}

impl StorageError {
    /// Whether a guard (single write or any op of a transaction) rejected the write.
    pub fn is_condition_failure(&self) -> bool {
        match self {
            StorageError::ConditionFailed { .. } => true,
            StorageError::TransactionCanceled { reasons } => {
                reasons.iter().any(|r| *r == CancelReason::ConditionFailed)
            }
            _ => false,
        }
    }

    /// Whether operation `index` of a canceled transaction failed its condition.
    pub fn condition_failed_at(&self, index: usize) -> bool {
        match self {
            StorageError::TransactionCanceled { reasons } => {
                reasons.get(index) == Some(&CancelReason::ConditionFailed)
            }
            _ => false,
        }
    }

    /// Whether the write lost a race with a concurrent writer.
    pub fn is_conflict(&self) -> bool {
        match self {
            StorageError::Conflict(_) => true,
            StorageError::TransactionCanceled { reasons } => {
                reasons.iter().any(|r| *r == CancelReason::Conflict)
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Guard evaluated against the current version of the target item.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Always,
    /// `attribute_not_exists(pk)`
    NotExists,
    /// `attribute_exists(pk)`
    Exists,
    /// The item exists and `attribute` currently equals `value`.
    Equals { attribute: String, value: Value },
}

/// How `append_to_list` treats values already in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendMode {
    /// Append unconditionally, creating the item and list if missing.
    Blind,
    /// The item must exist and none of the values may already be present.
    Unique,
}

/// One write inside a [`TableStore::transact_write`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put {
        item: Item,
        condition: Condition,
    },
    Update {
        key: TableKey,
        fields: Item,
        condition: Condition,
    },
    AppendToList {
        key: TableKey,
        attribute: String,
        values: Vec<String>,
        mode: AppendMode,
    },
    Delete {
        key: TableKey,
    },
}

impl WriteOp {
    pub fn put(item: Item, condition: Condition) -> Self {
        WriteOp::Put { item, condition }
    }

    /// Key of the item this operation touches.
    pub fn key(&self) -> Result<TableKey> {
        match self {
            WriteOp::Put { item, .. } => item_key(item),
            WriteOp::Update { key, .. }
            | WriteOp::AppendToList { key, .. }
            | WriteOp::Delete { key } => Ok(key.clone()),
        }
    }
}

/// Primitive operations over the single partitioned table.
///
/// All operations are independent request/response round trips; none holds
/// state between calls, so one store may be shared by any number of
/// concurrent callers.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Point read.
    async fn get(&self, key: &TableKey) -> Result<Option<Item>>;

    /// Write a whole item (it must carry `pk` and `sk`).
    async fn put(&self, item: Item, condition: Condition) -> Result<()>;

    /// Set attributes on an item. With `Condition::Always` this upserts.
    async fn update(&self, key: &TableKey, fields: Item, condition: Condition) -> Result<()>;

    /// `SET attribute = list_append(if_not_exists(attribute, []), values)`.
    async fn append_to_list(
        &self,
        key: &TableKey,
        attribute: &str,
        values: Vec<String>,
        mode: AppendMode,
    ) -> Result<()>;

    /// Delete an item. Deleting a missing item succeeds.
    async fn delete(&self, key: &TableKey) -> Result<()>;

    /// Items in partition `pk` whose sort key begins with `sk_prefix`,
    /// ascending by sort key.
    async fn query(&self, pk: &str, sk_prefix: &str, limit: Option<usize>) -> Result<Vec<Item>>;

    /// Read many items by key. Missing keys are skipped; order is unspecified.
    async fn batch_get(&self, keys: &[TableKey]) -> Result<Vec<Item>>;

    /// Full-table scan restricted to partitions beginning with `pk_prefix`.
    async fn scan(&self, pk_prefix: &str) -> Result<Vec<Item>>;

    /// Apply every operation or none of them.
    ///
    /// A failed condition anywhere cancels the whole transaction with
    /// `StorageError::TransactionCanceled`, one reason per operation.
    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<()>;
}

/// Initialize the table store selected by configuration.
pub async fn init_storage(
    config: &StorageConfig,
) -> std::result::Result<Arc<dyn TableStore>, Box<dyn std::error::Error>> {
    match config.storage_type {
        StorageType::Memory => {
            info!("Storage: in-memory table");
            Ok(Arc::new(MemoryTableStore::new()))
        }
        #[cfg(feature = "dynamo")]
        StorageType::Dynamo => {
            let store = DynamoTableStore::new(
                config.dynamo.table_name.clone(),
                config.dynamo.endpoint_url.as_deref(),
                config.dynamo.region.as_deref(),
            )
            .await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "dynamo"))]
        StorageType::Dynamo => {
            tracing::error!("DynamoDB storage requested but 'dynamo' feature is not enabled");
            Err("DynamoDB feature not enabled".into())
        }
    }
}
