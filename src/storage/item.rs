//! Item representation and row (de)serialization.
//!
//! An item is a JSON object of attributes. Repositories describe their rows
//! as `serde` structs carrying `pk` and `sk` fields and convert them with
//! [`to_item`] / [`from_item`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{Result, StorageError, TableKey};

/// Partition key attribute name.
pub const PK: &str = "pk";
/// Sort key attribute name.
pub const SK: &str = "sk";

pub type Item = Map<String, Value>;

pub fn to_item<T: Serialize>(row: &T) -> Result<Item> {
    match serde_json::to_value(row)? {
        Value::Object(item) => Ok(item),
        other => Err(StorageError::InvalidItem(format!(
            "row must serialize to an object, got {other}"
        ))),
    }
}

pub fn from_item<T: DeserializeOwned>(item: Item) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(item))?)
}

/// Extract the key attributes of an item.
pub fn item_key(item: &Item) -> Result<TableKey> {
    let attr = |name: &str| {
        item.get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StorageError::InvalidItem(format!("item is missing string '{name}'")))
    };
    Ok(TableKey::new(attr(PK)?, attr(SK)?))
}

/// Build an item holding just `fields`, for partial updates.
pub fn fields<I, K>(pairs: I) -> Item
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Read a list-of-strings attribute; absent or non-list yields an empty list.
pub fn string_list(item: &Item, attribute: &str) -> Vec<String> {
    item.get(attribute)
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
