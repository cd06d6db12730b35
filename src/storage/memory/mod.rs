//! In-memory table store.
//!
//! A single `RwLock` guards the whole table, so every operation (including a
//! multi-item transaction) is applied atomically with respect to every other.
//! Failure injection hooks let tests exercise rollback and retry paths.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::item::{item_key, Item, PK, SK};
use super::{
    AppendMode, CancelReason, Condition, Result, StorageError, TableKey, TableStore, WriteOp,
    MAX_TRANSACTION_OPS,
};

/// Partition key -> (sort key -> item).
type Table = BTreeMap<String, BTreeMap<String, Item>>;

/// Reason recorded for an operation canceled by `fail_transact_at`.
pub const INJECTED_REASON: &str = "InjectedFailure";

#[derive(Default)]
pub struct MemoryTableStore {
    table: RwLock<Table>,
    fail_on_write: RwLock<bool>,
    fail_on_append: RwLock<bool>,
    fail_transact_at: RwLock<Option<usize>>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every put, update, delete and transaction fail.
    pub async fn set_fail_on_write(&self, fail: bool) {
        *self.fail_on_write.write().await = fail;
    }

    /// Make standalone list appends fail.
    pub async fn set_fail_on_append(&self, fail: bool) {
        *self.fail_on_append.write().await = fail;
    }

    /// Cancel the next transaction as if operation `index` had failed.
    ///
    /// One-shot: the hook clears itself once it fires.
    pub async fn fail_transact_at(&self, index: usize) {
        *self.fail_transact_at.write().await = Some(index);
    }

    /// Total number of items across all partitions.
    pub async fn item_count(&self) -> usize {
        self.table.read().await.values().map(BTreeMap::len).sum()
    }

    async fn check_write_injection(&self, operation: &str) -> Result<()> {
        if *self.fail_on_write.read().await {
            return Err(StorageError::Injected(format!("{operation} disabled")));
        }
        Ok(())
    }
}

fn lookup<'a>(table: &'a Table, key: &TableKey) -> Option<&'a Item> {
    table.get(&key.pk).and_then(|partition| partition.get(&key.sk))
}

fn condition_holds(condition: &Condition, current: Option<&Item>) -> bool {
    match condition {
        Condition::Always => true,
        Condition::NotExists => current.is_none(),
        Condition::Exists => current.is_some(),
        Condition::Equals { attribute, value } => {
            current.and_then(|item| item.get(attribute)) == Some(value)
        }
    }
}

fn append_allowed(mode: AppendMode, current: Option<&Item>, attribute: &str, values: &[String]) -> bool {
    match mode {
        AppendMode::Blind => true,
        AppendMode::Unique => {
            let Some(item) = current else {
                return false;
            };
            let existing = item.get(attribute).and_then(Value::as_array);
            !values.iter().any(|value| {
                existing.is_some_and(|list| list.iter().any(|v| v.as_str() == Some(value.as_str())))
            })
        }
    }
}

/// Whether `op` may be applied against the current table state.
fn op_allowed(table: &Table, op: &WriteOp) -> Result<bool> {
    let key = op.key()?;
    let current = lookup(table, &key);
    Ok(match op {
        WriteOp::Put { condition, .. } => condition_holds(condition, current),
        WriteOp::Update {
            fields, condition, ..
        } => {
            if fields.keys().all(|name| name == PK || name == SK) {
                return Err(StorageError::InvalidItem(
                    "update carries no attributes".to_string(),
                ));
            }
            condition_holds(condition, current)
        }
        WriteOp::AppendToList {
            attribute,
            values,
            mode,
            ..
        } => {
            if current
                .and_then(|item| item.get(attribute))
                .is_some_and(|value| !value.is_array())
            {
                return Err(StorageError::InvalidItem(format!(
                    "attribute '{attribute}' of {key} is not a list"
                )));
            }
            append_allowed(*mode, current, attribute, values)
        }
        WriteOp::Delete { .. } => true,
    })
}

fn key_stub(key: &TableKey) -> Item {
    let mut item = Item::new();
    item.insert(PK.to_string(), Value::String(key.pk.clone()));
    item.insert(SK.to_string(), Value::String(key.sk.clone()));
    item
}

/// Apply an already-validated operation.
fn apply(table: &mut Table, op: WriteOp) -> Result<()> {
    match op {
        WriteOp::Put { item, .. } => {
            let key = item_key(&item)?;
            table.entry(key.pk).or_default().insert(key.sk, item);
        }
        WriteOp::Update { key, fields, .. } => {
            let item = table
                .entry(key.pk.clone())
                .or_default()
                .entry(key.sk.clone())
                .or_insert_with(|| key_stub(&key));
            for (name, value) in fields {
                if name != PK && name != SK {
                    item.insert(name, value);
                }
            }
        }
        WriteOp::AppendToList {
            key,
            attribute,
            values,
            ..
        } => {
            let item = table
                .entry(key.pk.clone())
                .or_default()
                .entry(key.sk.clone())
                .or_insert_with(|| key_stub(&key));
            let list = item
                .entry(attribute.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            match list {
                Value::Array(list) => list.extend(values.into_iter().map(Value::String)),
                _ => {
                    return Err(StorageError::InvalidItem(format!(
                        "attribute '{attribute}' of {key} is not a list"
                    )))
                }
            }
        }
        WriteOp::Delete { key } => {
            if let Some(partition) = table.get_mut(&key.pk) {
                partition.remove(&key.sk);
                if partition.is_empty() {
                    table.remove(&key.pk);
                }
            }
        }
    }
    Ok(())
}

/// Validate then apply a single non-transactional write.
fn write_one(table: &mut Table, op: WriteOp) -> Result<()> {
    if !op_allowed(table, &op)? {
        return Err(StorageError::ConditionFailed { key: op.key()? });
    }
    apply(table, op)
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn get(&self, key: &TableKey) -> Result<Option<Item>> {
        let table = self.table.read().await;
        Ok(lookup(&table, key).cloned())
    }

    async fn put(&self, item: Item, condition: Condition) -> Result<()> {
        self.check_write_injection("put").await?;
        let mut table = self.table.write().await;
        write_one(&mut table, WriteOp::Put { item, condition })
    }

    async fn update(&self, key: &TableKey, fields: Item, condition: Condition) -> Result<()> {
        self.check_write_injection("update").await?;
        let mut table = self.table.write().await;
        write_one(
            &mut table,
            WriteOp::Update {
                key: key.clone(),
                fields,
                condition,
            },
        )
    }

    async fn append_to_list(
        &self,
        key: &TableKey,
        attribute: &str,
        values: Vec<String>,
        mode: AppendMode,
    ) -> Result<()> {
        if *self.fail_on_append.read().await {
            return Err(StorageError::Injected("append disabled".to_string()));
        }
        let mut table = self.table.write().await;
        write_one(
            &mut table,
            WriteOp::AppendToList {
                key: key.clone(),
                attribute: attribute.to_string(),
                values,
                mode,
            },
        )
    }

    async fn delete(&self, key: &TableKey) -> Result<()> {
        self.check_write_injection("delete").await?;
        let mut table = self.table.write().await;
        apply(&mut table, WriteOp::Delete { key: key.clone() })
    }

    async fn query(&self, pk: &str, sk_prefix: &str, limit: Option<usize>) -> Result<Vec<Item>> {
        let table = self.table.read().await;
        let Some(partition) = table.get(pk) else {
            return Ok(Vec::new());
        };
        Ok(partition
            .range(sk_prefix.to_string()..)
            .take_while(|(sk, _)| sk.starts_with(sk_prefix))
            .take(limit.unwrap_or(usize::MAX))
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn batch_get(&self, keys: &[TableKey]) -> Result<Vec<Item>> {
        let table = self.table.read().await;
        let mut seen = HashSet::new();
        Ok(keys
            .iter()
            .filter(|key| seen.insert(*key))
            .filter_map(|key| lookup(&table, key).cloned())
            .collect())
    }

    async fn scan(&self, pk_prefix: &str) -> Result<Vec<Item>> {
        let table = self.table.read().await;
        Ok(table
            .range(pk_prefix.to_string()..)
            .take_while(|(pk, _)| pk.starts_with(pk_prefix))
            .flat_map(|(_, partition)| partition.values().cloned())
            .collect())
    }

    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }
        if ops.len() > MAX_TRANSACTION_OPS {
            return Err(StorageError::TooManyOperations(ops.len()));
        }
        self.check_write_injection("transaction").await?;

        let mut keys = HashSet::new();
        for op in &ops {
            let key = op.key()?;
            if !keys.insert(key.clone()) {
                return Err(StorageError::InvalidItem(format!(
                    "transaction touches {key} more than once"
                )));
            }
        }

        let mut table = self.table.write().await;

        if let Some(index) = self.fail_transact_at.write().await.take() {
            let reasons = (0..ops.len())
                .map(|i| {
                    if i == index {
                        CancelReason::Other(INJECTED_REASON.to_string())
                    } else {
                        CancelReason::None
                    }
                })
                .collect();
            debug!(index, "Injected transaction failure");
            return Err(StorageError::TransactionCanceled { reasons });
        }

        let mut reasons = Vec::with_capacity(ops.len());
        for op in &ops {
            reasons.push(if op_allowed(&table, op)? {
                CancelReason::None
            } else {
                CancelReason::ConditionFailed
            });
        }
        if reasons.iter().any(|r| *r != CancelReason::None) {
            return Err(StorageError::TransactionCanceled { reasons });
        }

        for op in ops {
            apply(&mut table, op)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
