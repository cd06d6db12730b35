//! DynamoDB single-table backend.
//!
//! Table schema:
//! - pk: partition key (String)
//! - sk: sort key (String)
//! - expires_at: TTL attribute on show rows (Number, epoch seconds)
//!
//! Conditions map onto condition expressions, `query` onto
//! `pk = :pk AND begins_with(sk, :prefix)`, and `transact_write` onto
//! `TransactWriteItems`, whose per-item cancellation reasons are surfaced
//! unchanged in `StorageError::TransactionCanceled`.

mod attr;

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, CancellationReason, Delete, KeySchemaElement,
    KeyType, KeysAndAttributes, Put, ScalarAttributeType, TimeToLiveSpecification,
    TransactWriteItem, Update,
};
use aws_sdk_dynamodb::Client;
use tracing::{debug, info, warn};

use attr::{from_attr_map, key_attrs, to_attr, to_attr_map, AttrMap};

use super::item::{item_key, Item, PK, SK};
use super::{
    AppendMode, CancelReason, Condition, Result, StorageError, TableKey, TableStore, WriteOp,
    MAX_BATCH_GET_KEYS, MAX_TRANSACTION_OPS,
};

/// TTL attribute carried by show rows.
pub const TTL_ATTRIBUTE: &str = "expires_at";

/// Rounds of `UnprocessedKeys` re-submission before a batch read gives up.
const MAX_BATCH_ROUNDS: u32 = 8;

fn backend<E: std::error::Error>(operation: &str, e: E) -> StorageError {
    StorageError::Backend(format!(
        "DynamoDB {operation} failed: {}",
        DisplayErrorContext(e)
    ))
}

fn cancel_reason(reason: &CancellationReason) -> CancelReason {
    match reason.code() {
        None | Some("None") => CancelReason::None,
        Some("ConditionalCheckFailed") => CancelReason::ConditionFailed,
        Some("TransactionConflict") => CancelReason::Conflict,
        Some(code) => CancelReason::Other(code.to_string()),
    }
}

/// Placeholder names and values for one expression.
#[derive(Default)]
struct Expr {
    names: HashMap<String, String>,
    values: AttrMap,
}

impl Expr {
    fn name(&mut self, placeholder: String, attribute: &str) -> String {
        self.names.insert(placeholder.clone(), attribute.to_string());
        placeholder
    }

    fn value(&mut self, placeholder: String, value: AttributeValue) -> String {
        self.values.insert(placeholder.clone(), value);
        placeholder
    }

    fn condition(&mut self, condition: &Condition) -> Option<String> {
        match condition {
            Condition::Always => None,
            Condition::NotExists => Some(format!("attribute_not_exists({PK})")),
            Condition::Exists => Some(format!("attribute_exists({PK})")),
            Condition::Equals { attribute, value } => {
                let name = self.name("#c".to_string(), attribute);
                let value = self.value(":c".to_string(), to_attr(value));
                Some(format!("{name} = {value}"))
            }
        }
    }

    /// `SET #f0 = :f0, ...` over every non-key field.
    fn set_fields(&mut self, fields: &Item) -> Result<String> {
        let assignments: Vec<String> = fields
            .iter()
            .filter(|(name, _)| name.as_str() != PK && name.as_str() != SK)
            .enumerate()
            .map(|(i, (attribute, value))| {
                let name = self.name(format!("#f{i}"), attribute);
                let value = self.value(format!(":f{i}"), to_attr(value));
                format!("{name} = {value}")
            })
            .collect();
        if assignments.is_empty() {
            return Err(StorageError::InvalidItem(
                "update carries no attributes".to_string(),
            ));
        }
        Ok(format!("SET {}", assignments.join(", ")))
    }

    /// Update expression and optional condition for a list append.
    fn append(
        &mut self,
        attribute: &str,
        values: &[String],
        mode: AppendMode,
    ) -> (String, Option<String>) {
        let name = self.name("#a".to_string(), attribute);
        let empty = self.value(":empty".to_string(), AttributeValue::L(Vec::new()));
        let list = self.value(
            ":vals".to_string(),
            AttributeValue::L(values.iter().cloned().map(AttributeValue::S).collect()),
        );
        let update = format!("SET {name} = list_append(if_not_exists({name}, {empty}), {list})");

        let condition = match mode {
            AppendMode::Blind => None,
            AppendMode::Unique => {
                let mut clauses = vec![format!("attribute_exists({PK})")];
                for (i, value) in values.iter().enumerate() {
                    let placeholder = self.value(format!(":s{i}"), AttributeValue::S(value.clone()));
                    clauses.push(format!("NOT contains({name}, {placeholder})"));
                }
                Some(clauses.join(" AND "))
            }
        };
        (update, condition)
    }

    fn names(&self) -> Option<HashMap<String, String>> {
        (!self.names.is_empty()).then(|| self.names.clone())
    }

    fn values(&self) -> Option<AttrMap> {
        (!self.values.is_empty()).then(|| self.values.clone())
    }
}

/// DynamoDB implementation of TableStore.
pub struct DynamoTableStore {
    client: Client,
    table_name: String,
}

impl DynamoTableStore {
    /// Connect to DynamoDB.
    ///
    /// `endpoint_url` points at LocalStack or DynamoDB Local; `region`
    /// overrides the region from the default provider chain.
    pub async fn new(
        table_name: impl Into<String>,
        endpoint_url: Option<&str>,
        region: Option<&str>,
    ) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let config = loader.load().await;

        let client = if let Some(endpoint) = endpoint_url {
            let dynamo_config = aws_sdk_dynamodb::config::Builder::from(&config)
                .endpoint_url(endpoint)
                .build();
            Client::from_conf(dynamo_config)
        } else {
            Client::new(&config)
        };

        let table_name = table_name.into();
        info!(table = %table_name, "Connected to DynamoDB");

        Ok(Self { client, table_name })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Create the table (pk/sk, on-demand billing, TTL on `expires_at`) if
    /// it does not already exist.
    pub async fn ensure_table(&self) -> Result<()> {
        let key_schema = |name: &str, key_type: KeyType| {
            KeySchemaElement::builder()
                .attribute_name(name)
                .key_type(key_type)
                .build()
                .map_err(|e| backend("create_table", e))
        };
        let attribute = |name: &str| {
            AttributeDefinition::builder()
                .attribute_name(name)
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(|e| backend("create_table", e))
        };

        let result = self
            .client
            .create_table()
            .table_name(&self.table_name)
            .key_schema(key_schema(PK, KeyType::Hash)?)
            .key_schema(key_schema(SK, KeyType::Range)?)
            .attribute_definitions(attribute(PK)?)
            .attribute_definitions(attribute(SK)?)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await;

        match result {
            Ok(_) => info!(table = %self.table_name, "Created DynamoDB table"),
            Err(e) => {
                let service_err = e.into_service_error();
                if !service_err.is_resource_in_use_exception() {
                    return Err(backend("create_table", service_err));
                }
                debug!(table = %self.table_name, "DynamoDB table already exists");
                return Ok(());
            }
        }

        let ttl = TimeToLiveSpecification::builder()
            .attribute_name(TTL_ATTRIBUTE)
            .enabled(true)
            .build()
            .map_err(|e| backend("update_time_to_live", e))?;
        if let Err(e) = self
            .client
            .update_time_to_live()
            .table_name(&self.table_name)
            .time_to_live_specification(ttl)
            .send()
            .await
        {
            warn!(
                table = %self.table_name,
                error = %DisplayErrorContext(e),
                "Failed to enable TTL on expires_at"
            );
        }
        Ok(())
    }

    fn transact_item(&self, op: WriteOp) -> Result<TransactWriteItem> {
        let mut expr = Expr::default();
        let item = match op {
            WriteOp::Put { item, condition } => {
                let condition = expr.condition(&condition);
                let put = Put::builder()
                    .table_name(&self.table_name)
                    .set_item(Some(to_attr_map(&item)))
                    .set_condition_expression(condition)
                    .set_expression_attribute_names(expr.names())
                    .set_expression_attribute_values(expr.values())
                    .build()
                    .map_err(|e| backend("transact_write_items", e))?;
                TransactWriteItem::builder().put(put).build()
            }
            WriteOp::Update {
                key,
                fields,
                condition,
            } => {
                let update_expression = expr.set_fields(&fields)?;
                let condition = expr.condition(&condition);
                let update = Update::builder()
                    .table_name(&self.table_name)
                    .set_key(Some(key_attrs(&key)))
                    .update_expression(update_expression)
                    .set_condition_expression(condition)
                    .set_expression_attribute_names(expr.names())
                    .set_expression_attribute_values(expr.values())
                    .build()
                    .map_err(|e| backend("transact_write_items", e))?;
                TransactWriteItem::builder().update(update).build()
            }
            WriteOp::AppendToList {
                key,
                attribute,
                values,
                mode,
            } => {
                let (update_expression, condition) = expr.append(&attribute, &values, mode);
                let update = Update::builder()
                    .table_name(&self.table_name)
                    .set_key(Some(key_attrs(&key)))
                    .update_expression(update_expression)
                    .set_condition_expression(condition)
                    .set_expression_attribute_names(expr.names())
                    .set_expression_attribute_values(expr.values())
                    .build()
                    .map_err(|e| backend("transact_write_items", e))?;
                TransactWriteItem::builder().update(update).build()
            }
            WriteOp::Delete { key } => {
                let delete = Delete::builder()
                    .table_name(&self.table_name)
                    .set_key(Some(key_attrs(&key)))
                    .build()
                    .map_err(|e| backend("transact_write_items", e))?;
                TransactWriteItem::builder().delete(delete).build()
            }
        };
        Ok(item)
    }
}

#[async_trait]
impl TableStore for DynamoTableStore {
    async fn get(&self, key: &TableKey) -> Result<Option<Item>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(key_attrs(key)))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| backend("get_item", e))?;

        result.item.as_ref().map(from_attr_map).transpose()
    }

    async fn put(&self, item: Item, condition: Condition) -> Result<()> {
        let key = item_key(&item)?;
        let mut expr = Expr::default();
        let condition = expr.condition(&condition);

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_attr_map(&item)))
            .set_condition_expression(condition)
            .set_expression_attribute_names(expr.names())
            .set_expression_attribute_values(expr.values())
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception())
                {
                    StorageError::ConditionFailed { key: key.clone() }
                } else {
                    backend("put_item", e)
                }
            })?;

        debug!(key = %key, "Stored item in DynamoDB");
        Ok(())
    }

    async fn update(&self, key: &TableKey, fields: Item, condition: Condition) -> Result<()> {
        let mut expr = Expr::default();
        let update_expression = expr.set_fields(&fields)?;
        let condition = expr.condition(&condition);

        self.client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(key_attrs(key)))
            .update_expression(update_expression)
            .set_condition_expression(condition)
            .set_expression_attribute_names(expr.names())
            .set_expression_attribute_values(expr.values())
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception())
                {
                    StorageError::ConditionFailed { key: key.clone() }
                } else {
                    backend("update_item", e)
                }
            })?;
        Ok(())
    }

    async fn append_to_list(
        &self,
        key: &TableKey,
        attribute: &str,
        values: Vec<String>,
        mode: AppendMode,
    ) -> Result<()> {
        let mut expr = Expr::default();
        let (update_expression, condition) = expr.append(attribute, &values, mode);

        self.client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(key_attrs(key)))
            .update_expression(update_expression)
            .set_condition_expression(condition)
            .set_expression_attribute_names(expr.names())
            .set_expression_attribute_values(expr.values())
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception())
                {
                    StorageError::ConditionFailed { key: key.clone() }
                } else {
                    backend("update_item", e)
                }
            })?;
        Ok(())
    }

    async fn delete(&self, key: &TableKey) -> Result<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(key_attrs(key)))
            .send()
            .await
            .map_err(|e| backend("delete_item", e))?;
        Ok(())
    }

    async fn query(&self, pk: &str, sk_prefix: &str, limit: Option<usize>) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut start_key: Option<AttrMap> = None;

        let mut expr = Expr::default();
        let pk_name = expr.name("#pk".to_string(), PK);
        let pk_value = expr.value(":pk".to_string(), AttributeValue::S(pk.to_string()));
        let mut key_condition = format!("{pk_name} = {pk_value}");
        if !sk_prefix.is_empty() {
            let sk_name = expr.name("#sk".to_string(), SK);
            let prefix = expr.value(":prefix".to_string(), AttributeValue::S(sk_prefix.to_string()));
            key_condition.push_str(&format!(" AND begins_with({sk_name}, {prefix})"));
        }

        loop {
            let remaining = limit.map(|l| l.saturating_sub(items.len()));
            let result = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression(&key_condition)
                .set_expression_attribute_names(expr.names())
                .set_expression_attribute_values(expr.values())
                .set_limit(remaining.map(|r| i32::try_from(r).unwrap_or(i32::MAX)))
                .consistent_read(true)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| backend("query", e))?;

            for item in result.items() {
                items.push(from_attr_map(item)?);
            }

            start_key = result.last_evaluated_key;
            let limit_reached = limit.is_some_and(|l| items.len() >= l);
            if start_key.is_none() || limit_reached {
                break;
            }
        }

        debug!(pk = %pk, sk_prefix = %sk_prefix, count = items.len(), "Queried DynamoDB");
        Ok(items)
    }

    async fn batch_get(&self, keys: &[TableKey]) -> Result<Vec<Item>> {
        let mut seen = HashSet::new();
        let unique: Vec<&TableKey> = keys.iter().filter(|key| seen.insert(*key)).collect();
        let mut items = Vec::with_capacity(unique.len());

        for chunk in unique.chunks(MAX_BATCH_GET_KEYS) {
            let request = KeysAndAttributes::builder()
                .set_keys(Some(chunk.iter().map(|key| key_attrs(key)).collect()))
                .consistent_read(true)
                .build()
                .map_err(|e| backend("batch_get_item", e))?;
            let mut pending = Some(HashMap::from([(self.table_name.clone(), request)]));

            for round in 0..MAX_BATCH_ROUNDS {
                let Some(request_items) = pending.take() else {
                    break;
                };
                if round > 0 {
                    tokio::time::sleep(Duration::from_millis(25 << round)).await;
                }

                let result = self
                    .client
                    .batch_get_item()
                    .set_request_items(Some(request_items))
                    .send()
                    .await
                    .map_err(|e| backend("batch_get_item", e))?;

                if let Some(found) = result
                    .responses
                    .as_ref()
                    .and_then(|responses| responses.get(&self.table_name))
                {
                    for item in found {
                        items.push(from_attr_map(item)?);
                    }
                }

                pending = result.unprocessed_keys.filter(|unprocessed| {
                    unprocessed
                        .values()
                        .any(|request| !request.keys().is_empty())
                });
            }

            if pending.is_some() {
                return Err(StorageError::Backend(format!(
                    "DynamoDB batch_get_item left keys unprocessed after {MAX_BATCH_ROUNDS} rounds"
                )));
            }
        }

        Ok(items)
    }

    async fn scan(&self, pk_prefix: &str) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut start_key: Option<AttrMap> = None;

        loop {
            let result = self
                .client
                .scan()
                .table_name(&self.table_name)
                .filter_expression("begins_with(#pk, :prefix)")
                .expression_attribute_names("#pk", PK)
                .expression_attribute_values(":prefix", AttributeValue::S(pk_prefix.to_string()))
                .consistent_read(true)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| backend("scan", e))?;

            for item in result.items() {
                items.push(from_attr_map(item)?);
            }

            start_key = result.last_evaluated_key;
            if start_key.is_none() {
                break;
            }
        }

        debug!(pk_prefix = %pk_prefix, count = items.len(), "Scanned DynamoDB");
        Ok(items)
    }

    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }
        if ops.len() > MAX_TRANSACTION_OPS {
            return Err(StorageError::TooManyOperations(ops.len()));
        }

        let count = ops.len();
        let items = ops
            .into_iter()
            .map(|op| self.transact_item(op))
            .collect::<Result<Vec<_>>>()?;

        self.client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await
            .map_err(|e| match e.into_service_error() {
                TransactWriteItemsError::TransactionCanceledException(canceled) => {
                    StorageError::TransactionCanceled {
                        reasons: canceled
                            .cancellation_reasons()
                            .iter()
                            .map(cancel_reason)
                            .collect(),
                    }
                }
                TransactWriteItemsError::TransactionConflictException(conflict) => {
                    StorageError::Conflict(conflict.to_string())
                }
                other => backend("transact_write_items", other),
            })?;

        debug!(ops = count, "Committed DynamoDB transaction");
        Ok(())
    }
}
