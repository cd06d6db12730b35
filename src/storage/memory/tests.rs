use serde_json::json;

use super::*;
use crate::storage::item::fields;

fn row(pk: &str, sk: &str) -> Item {
    fields([("pk", json!(pk)), ("sk", json!(sk))])
}

fn seats(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_fail_on_write_rejects_put() {
    let store = MemoryTableStore::new();
    store.set_fail_on_write(true).await;

    let result = store.put(row("SHOW#1", "DETAILS"), Condition::Always).await;
    assert!(matches!(result, Err(StorageError::Injected(_))));
    assert_eq!(store.item_count().await, 0);

    store.set_fail_on_write(false).await;
    store
        .put(row("SHOW#1", "DETAILS"), Condition::Always)
        .await
        .unwrap();
    assert_eq!(store.item_count().await, 1);
}

#[tokio::test]
async fn test_fail_on_append() {
    let store = MemoryTableStore::new();
    store.set_fail_on_append(true).await;

    let key = TableKey::new("USER#h", "DETAILS");
    let result = store
        .append_to_list(&key, "venue_ids", seats(&["v1"]), AppendMode::Blind)
        .await;
    assert!(matches!(result, Err(StorageError::Injected(_))));
    assert!(store.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_injected_transaction_failure_is_one_shot() {
    let store = MemoryTableStore::new();
    store.fail_transact_at(1).await;

    let ops = vec![
        WriteOp::put(row("A", "1"), Condition::NotExists),
        WriteOp::put(row("B", "1"), Condition::NotExists),
    ];
    let err = store.transact_write(ops.clone()).await.unwrap_err();
    match err {
        StorageError::TransactionCanceled { reasons } => {
            assert_eq!(reasons[0], CancelReason::None);
            assert_eq!(reasons[1], CancelReason::Other(INJECTED_REASON.to_string()));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.item_count().await, 0);

    store.transact_write(ops).await.unwrap();
    assert_eq!(store.item_count().await, 2);
}

#[tokio::test]
async fn test_transaction_rejects_repeated_key() {
    let store = MemoryTableStore::new();
    let ops = vec![
        WriteOp::put(row("A", "1"), Condition::Always),
        WriteOp::Delete {
            key: TableKey::new("A", "1"),
        },
    ];
    let result = store.transact_write(ops).await;
    assert!(matches!(result, Err(StorageError::InvalidItem(_))));
    assert_eq!(store.item_count().await, 0);
}

#[tokio::test]
async fn test_transaction_rejects_too_many_ops() {
    let store = MemoryTableStore::new();
    let ops: Vec<WriteOp> = (0..=MAX_TRANSACTION_OPS)
        .map(|i| WriteOp::put(row("A", &i.to_string()), Condition::Always))
        .collect();
    let result = store.transact_write(ops).await;
    assert!(matches!(result, Err(StorageError::TooManyOperations(101))));
}

#[tokio::test]
async fn test_update_upserts_and_keeps_key_attributes() {
    let store = MemoryTableStore::new();
    let key = TableKey::new("SHOW#1", "DETAILS");

    store
        .update(
            &key,
            fields([("price", json!(50.0)), ("pk", json!("OTHER"))]),
            Condition::Always,
        )
        .await
        .unwrap();

    let item = store.get(&key).await.unwrap().unwrap();
    assert_eq!(item.get("pk"), Some(&json!("SHOW#1")));
    assert_eq!(item.get("price"), Some(&json!(50.0)));
}

#[tokio::test]
async fn test_append_to_non_list_is_invalid() {
    let store = MemoryTableStore::new();
    let mut item = row("SHOW#1", "DETAILS");
    item.insert("booked_seats".to_string(), json!("A1"));
    store.put(item, Condition::Always).await.unwrap();

    let result = store
        .append_to_list(
            &TableKey::new("SHOW#1", "DETAILS"),
            "booked_seats",
            seats(&["A2"]),
            AppendMode::Blind,
        )
        .await;
    assert!(matches!(result, Err(StorageError::InvalidItem(_))));
}

#[tokio::test]
async fn test_delete_drops_empty_partition() {
    let store = MemoryTableStore::new();
    store.put(row("CITY#Austin", "EVENT#1"), Condition::Always).await.unwrap();
    store.delete(&TableKey::new("CITY#Austin", "EVENT#1")).await.unwrap();

    assert!(store.scan("CITY#").await.unwrap().is_empty());
    assert_eq!(store.item_count().await, 0);
}
