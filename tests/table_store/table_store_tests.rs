//! TableStore interface tests.
//!
//! These tests verify the contract of the TableStore trait.
//! Each storage implementation should run these tests.
//!
//! Every test works in its own partitions (`TEST#<test>...`), so the suite
//! can share one table.

use serde_json::{json, Value};

use eventro::storage::{
    AppendMode, CancelReason, Condition, Item, StorageError, TableKey, TableStore, WriteOp,
};

fn item(pk: &str, sk: &str, attrs: Value) -> Item {
    let mut item = Item::new();
    item.insert("pk".to_string(), json!(pk));
    item.insert("sk".to_string(), json!(sk));
    if let Value::Object(attrs) = attrs {
        item.extend(attrs);
    }
    item
}

fn attr<'a>(item: &'a Item, name: &str) -> Option<&'a Value> {
    item.get(name)
}

// =============================================================================
// get / put tests
// =============================================================================

pub async fn test_get_missing<S: TableStore + ?Sized>(store: &S) {
    let result = store
        .get(&TableKey::new("TEST#get_missing", "DETAILS"))
        .await
        .expect("get should succeed");
    assert!(result.is_none(), "missing item should be None");
}

pub async fn test_put_and_get<S: TableStore + ?Sized>(store: &S) {
    let written = item(
        "TEST#put_get",
        "DETAILS",
        json!({"name": "The Moody", "seats": ["A1"], "price": 50.5, "blocked": false}),
    );
    store
        .put(written.clone(), Condition::Always)
        .await
        .expect("put should succeed");

    let read = store
        .get(&TableKey::new("TEST#put_get", "DETAILS"))
        .await
        .expect("get should succeed")
        .expect("item should exist");
    assert_eq!(read, written, "should return the stored item");
}

pub async fn test_put_not_exists<S: TableStore + ?Sized>(store: &S) {
    let first = item("TEST#put_not_exists", "DETAILS", json!({"version": "first"}));
    let second = item("TEST#put_not_exists", "DETAILS", json!({"version": "second"}));

    store.put(first, Condition::NotExists).await.unwrap();
    let err = store.put(second, Condition::NotExists).await.unwrap_err();
    assert!(err.is_condition_failure(), "second put should fail its guard: {err}");

    let read = store
        .get(&TableKey::new("TEST#put_not_exists", "DETAILS"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(attr(&read, "version"), Some(&json!("first")), "first write wins");
}

pub async fn test_put_exists<S: TableStore + ?Sized>(store: &S) {
    let row = item("TEST#put_exists", "DETAILS", json!({"name": "x"}));
    let err = store.put(row.clone(), Condition::Exists).await.unwrap_err();
    assert!(matches!(err, StorageError::ConditionFailed { .. }));

    store.put(row.clone(), Condition::Always).await.unwrap();
    store.put(row, Condition::Exists).await.expect("overwrite should succeed");
}

// =============================================================================
// update tests
// =============================================================================

pub async fn test_update_upserts_and_merges<S: TableStore + ?Sized>(store: &S) {
    let key = TableKey::new("TEST#update", "DETAILS");
    let mut fields = Item::new();
    fields.insert("is_blocked".to_string(), json!(false));
    store.update(&key, fields, Condition::Always).await.unwrap();

    let mut fields = Item::new();
    fields.insert("name".to_string(), json!("venue"));
    store.update(&key, fields, Condition::Exists).await.unwrap();

    let read = store.get(&key).await.unwrap().unwrap();
    assert_eq!(attr(&read, "is_blocked"), Some(&json!(false)));
    assert_eq!(attr(&read, "name"), Some(&json!("venue")));
}

pub async fn test_update_condition_equals<S: TableStore + ?Sized>(store: &S) {
    let key = TableKey::new("TEST#update_equals", "DETAILS");
    store
        .put(item(&key.pk, &key.sk, json!({"state": "open"})), Condition::Always)
        .await
        .unwrap();

    let set_state = |state: &str| {
        let mut fields = Item::new();
        fields.insert("state".to_string(), json!(state));
        fields
    };
    let expect_open = || Condition::Equals {
        attribute: "state".to_string(),
        value: json!("open"),
    };

    store
        .update(&key, set_state("closed"), expect_open())
        .await
        .expect("guard on current value should pass");
    let err = store
        .update(&key, set_state("reopened"), expect_open())
        .await
        .unwrap_err();
    assert!(err.is_condition_failure(), "stale guard should fail");

    let read = store.get(&key).await.unwrap().unwrap();
    assert_eq!(attr(&read, "state"), Some(&json!("closed")));
}

pub async fn test_update_missing_with_exists_fails<S: TableStore + ?Sized>(store: &S) {
    let mut fields = Item::new();
    fields.insert("name".to_string(), json!("ghost"));
    let key = TableKey::new("TEST#update_missing", "DETAILS");

    let err = store.update(&key, fields, Condition::Exists).await.unwrap_err();
    assert!(err.is_condition_failure());
    assert!(store.get(&key).await.unwrap().is_none(), "nothing should be created");
}

// =============================================================================
// append_to_list tests
// =============================================================================

pub async fn test_append_blind_creates_list<S: TableStore + ?Sized>(store: &S) {
    let key = TableKey::new("TEST#append_blind", "DETAILS");
    store
        .append_to_list(&key, "venue_ids", vec!["v1".to_string()], AppendMode::Blind)
        .await
        .unwrap();
    store
        .append_to_list(&key, "venue_ids", vec!["v2".to_string()], AppendMode::Blind)
        .await
        .unwrap();

    let read = store.get(&key).await.unwrap().unwrap();
    assert_eq!(attr(&read, "venue_ids"), Some(&json!(["v1", "v2"])));
}

pub async fn test_append_unique_rejects_overlap<S: TableStore + ?Sized>(store: &S) {
    let key = TableKey::new("TEST#append_unique", "DETAILS");
    store
        .put(item(&key.pk, &key.sk, json!({"booked_seats": []})), Condition::Always)
        .await
        .unwrap();

    store
        .append_to_list(
            &key,
            "booked_seats",
            vec!["A1".to_string(), "A2".to_string()],
            AppendMode::Unique,
        )
        .await
        .expect("fresh seats should append");
    let err = store
        .append_to_list(
            &key,
            "booked_seats",
            vec!["A3".to_string(), "A2".to_string()],
            AppendMode::Unique,
        )
        .await
        .unwrap_err();
    assert!(err.is_condition_failure(), "overlapping seat should fail: {err}");

    let read = store.get(&key).await.unwrap().unwrap();
    assert_eq!(attr(&read, "booked_seats"), Some(&json!(["A1", "A2"])));
}

pub async fn test_append_unique_requires_item<S: TableStore + ?Sized>(store: &S) {
    let key = TableKey::new("TEST#append_unique_missing", "DETAILS");
    let err = store
        .append_to_list(&key, "booked_seats", vec!["A1".to_string()], AppendMode::Unique)
        .await
        .unwrap_err();
    assert!(err.is_condition_failure());
    assert!(store.get(&key).await.unwrap().is_none());
}

// =============================================================================
// delete tests
// =============================================================================

pub async fn test_delete<S: TableStore + ?Sized>(store: &S) {
    let key = TableKey::new("TEST#delete", "DETAILS");
    store
        .put(item(&key.pk, &key.sk, json!({})), Condition::Always)
        .await
        .unwrap();
    store.delete(&key).await.unwrap();
    assert!(store.get(&key).await.unwrap().is_none());

    store.delete(&key).await.expect("deleting a missing item should succeed");
}

// =============================================================================
// range read tests
// =============================================================================

pub async fn test_query_prefix_order_and_limit<S: TableStore + ?Sized>(store: &S) {
    let pk = "TEST#query";
    for sk in [
        "DATE#2025-05-02T18:00#SHOW#s3",
        "DATE#2025-05-01T21:00#SHOW#s2",
        "DATE#2025-05-01T18:00#SHOW#s1",
        "DETAILS",
    ] {
        store
            .put(item(pk, sk, json!({})), Condition::Always)
            .await
            .unwrap();
    }
    let sort_keys = |items: Vec<Item>| -> Vec<String> {
        items
            .iter()
            .filter_map(|i| i.get("sk").and_then(Value::as_str).map(str::to_string))
            .collect()
    };

    let all = store.query(pk, "DATE#", None).await.unwrap();
    assert_eq!(
        sort_keys(all),
        vec![
            "DATE#2025-05-01T18:00#SHOW#s1",
            "DATE#2025-05-01T21:00#SHOW#s2",
            "DATE#2025-05-02T18:00#SHOW#s3",
        ],
        "query should return matches in ascending sort key order"
    );

    let day = store.query(pk, "DATE#2025-05-01T", None).await.unwrap();
    assert_eq!(day.len(), 2);

    let first = store.query(pk, "DATE#", Some(1)).await.unwrap();
    assert_eq!(sort_keys(first), vec!["DATE#2025-05-01T18:00#SHOW#s1"]);

    assert!(store.query("TEST#query_empty", "DATE#", None).await.unwrap().is_empty());
}

pub async fn test_batch_get<S: TableStore + ?Sized>(store: &S) {
    let mut keys = Vec::new();
    for i in 0..120 {
        let key = TableKey::new(format!("TEST#batch#{i:03}"), "DETAILS");
        if i % 2 == 0 {
            store
                .put(item(&key.pk, &key.sk, json!({"n": i})), Condition::Always)
                .await
                .unwrap();
        }
        keys.push(key);
    }

    let items = store.batch_get(&keys).await.unwrap();
    assert_eq!(items.len(), 60, "missing keys are skipped across chunks");
    assert!(store.batch_get(&[]).await.unwrap().is_empty());
}

pub async fn test_scan_prefix<S: TableStore + ?Sized>(store: &S) {
    store
        .put(item("TESTSCAN#a", "HOST#h1", json!({})), Condition::Always)
        .await
        .unwrap();
    store
        .put(item("TESTSCAN#b", "HOST#h2", json!({})), Condition::Always)
        .await
        .unwrap();
    store
        .put(item("TESTSCAX#c", "HOST#h1", json!({})), Condition::Always)
        .await
        .unwrap();

    let items = store.scan("TESTSCAN#").await.unwrap();
    assert_eq!(items.len(), 2, "scan should only return matching partitions");
}

// =============================================================================
// transaction tests
// =============================================================================

pub async fn test_transact_commits_all<S: TableStore + ?Sized>(store: &S) {
    let ops = vec![
        WriteOp::put(item("TEST#tx_ok", "DETAILS", json!({})), Condition::NotExists),
        WriteOp::put(item("TEST#tx_ok#IDX", "ENTRY#1", json!({})), Condition::Always),
        WriteOp::AppendToList {
            key: TableKey::new("TEST#tx_ok#LIST", "DETAILS"),
            attribute: "ids".to_string(),
            values: vec!["1".to_string()],
            mode: AppendMode::Blind,
        },
    ];
    store.transact_write(ops).await.unwrap();

    assert!(store.get(&TableKey::new("TEST#tx_ok", "DETAILS")).await.unwrap().is_some());
    assert!(store.get(&TableKey::new("TEST#tx_ok#IDX", "ENTRY#1")).await.unwrap().is_some());
    assert!(store
        .get(&TableKey::new("TEST#tx_ok#LIST", "DETAILS"))
        .await
        .unwrap()
        .is_some());
}

pub async fn test_transact_all_or_nothing<S: TableStore + ?Sized>(store: &S) {
    store
        .put(item("TEST#tx_fail#B", "DETAILS", json!({"v": "old"})), Condition::Always)
        .await
        .unwrap();

    let ops = vec![
        WriteOp::put(item("TEST#tx_fail#A", "DETAILS", json!({})), Condition::Always),
        WriteOp::put(
            item("TEST#tx_fail#B", "DETAILS", json!({"v": "new"})),
            Condition::NotExists,
        ),
    ];
    let err = store.transact_write(ops).await.unwrap_err();
    match &err {
        StorageError::TransactionCanceled { reasons } => {
            assert_eq!(reasons.len(), 2);
            assert_eq!(reasons[1], CancelReason::ConditionFailed);
        }
        other => panic!("expected TransactionCanceled, got {other}"),
    }
    assert!(err.condition_failed_at(1));
    assert!(!err.condition_failed_at(0));

    assert!(
        store
            .get(&TableKey::new("TEST#tx_fail#A", "DETAILS"))
            .await
            .unwrap()
            .is_none(),
        "no operation of a canceled transaction may apply"
    );
    let b = store
        .get(&TableKey::new("TEST#tx_fail#B", "DETAILS"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(b.get("v"), Some(&json!("old")));
}

pub async fn test_transact_empty<S: TableStore + ?Sized>(store: &S) {
    store.transact_write(Vec::new()).await.expect("empty transaction is a no-op");
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all TableStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_table_store_tests {
    ($store:expr) => {
        use $crate::table_store::table_store_tests::*;

        test_get_missing($store).await;
        println!("  test_get_missing: PASSED");

        test_put_and_get($store).await;
        println!("  test_put_and_get: PASSED");

        test_put_not_exists($store).await;
        println!("  test_put_not_exists: PASSED");

        test_put_exists($store).await;
        println!("  test_put_exists: PASSED");

        test_update_upserts_and_merges($store).await;
        println!("  test_update_upserts_and_merges: PASSED");

        test_update_condition_equals($store).await;
        println!("  test_update_condition_equals: PASSED");

        test_update_missing_with_exists_fails($store).await;
        println!("  test_update_missing_with_exists_fails: PASSED");

        test_append_blind_creates_list($store).await;
        println!("  test_append_blind_creates_list: PASSED");

        test_append_unique_rejects_overlap($store).await;
        println!("  test_append_unique_rejects_overlap: PASSED");

        test_append_unique_requires_item($store).await;
        println!("  test_append_unique_requires_item: PASSED");

        test_delete($store).await;
        println!("  test_delete: PASSED");

        test_query_prefix_order_and_limit($store).await;
        println!("  test_query_prefix_order_and_limit: PASSED");

        test_batch_get($store).await;
        println!("  test_batch_get: PASSED");

        test_scan_prefix($store).await;
        println!("  test_scan_prefix: PASSED");

        test_transact_commits_all($store).await;
        println!("  test_transact_commits_all: PASSED");

        test_transact_all_or_nothing($store).await;
        println!("  test_transact_all_or_nothing: PASSED");

        test_transact_empty($store).await;
        println!("  test_transact_empty: PASSED");
    };
}
