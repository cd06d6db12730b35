//! Conversion between JSON items and DynamoDB attribute maps.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::{Number, Value};

use crate::storage::item::{Item, PK, SK};
use crate::storage::{Result, StorageError, TableKey};

pub type AttrMap = HashMap<String, AttributeValue>;

pub fn to_attr(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(values) => AttributeValue::L(values.iter().map(to_attr).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(name, value)| (name.clone(), to_attr(value)))
                .collect(),
        ),
    }
}

fn number(raw: &str) -> Result<Value> {
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(Value::Number(n.into()));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| StorageError::InvalidItem(format!("unparseable number '{raw}'")))
}

pub fn from_attr(attr: &AttributeValue) -> Result<Value> {
    Ok(match attr {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => number(n)?,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(values) => {
            Value::Array(values.iter().map(from_attr).collect::<Result<_>>()?)
        }
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(name, value)| Ok((name.clone(), from_attr(value)?)))
                .collect::<Result<_>>()?,
        ),
        AttributeValue::Ss(values) => {
            Value::Array(values.iter().cloned().map(Value::String).collect())
        }
        AttributeValue::Ns(values) => {
            Value::Array(values.iter().map(|n| number(n)).collect::<Result<_>>()?)
        }
        other => {
            return Err(StorageError::InvalidItem(format!(
                "unsupported attribute type: {other:?}"
            )))
        }
    })
}

pub fn to_attr_map(item: &Item) -> AttrMap {
    item.iter()
        .map(|(name, value)| (name.clone(), to_attr(value)))
        .collect()
}

pub fn from_attr_map(map: &AttrMap) -> Result<Item> {
    map.iter()
        .map(|(name, value)| Ok((name.clone(), from_attr(value)?)))
        .collect()
}

pub fn key_attrs(key: &TableKey) -> AttrMap {
    HashMap::from([
        (PK.to_string(), AttributeValue::S(key.pk.clone())),
        (SK.to_string(), AttributeValue::S(key.sk.clone())),
    ])
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_item_conversion_preserves_shapes() {
        let item: Item = json!({
            "pk": "SHOW#1",
            "sk": "DETAILS",
            "price": 49.5,
            "booked_seats": ["A1", "A2"],
            "is_blocked": false,
            "expires_at": 1746144000,
        })
        .as_object()
        .cloned()
        .unwrap();

        let attrs = to_attr_map(&item);
        assert_eq!(attrs.get("pk"), Some(&AttributeValue::S("SHOW#1".to_string())));
        assert_eq!(attrs.get("expires_at"), Some(&AttributeValue::N("1746144000".to_string())));
        assert_eq!(from_attr_map(&attrs).unwrap(), item);
    }

    #[test]
    fn test_whole_float_reads_back_as_integer() {
        let value = from_attr(&AttributeValue::N("50".to_string())).unwrap();
        assert_eq!(value, json!(50));
        assert_eq!(value.as_f64(), Some(50.0));
    }

    #[test]
    fn test_string_set_reads_as_list() {
        let value = from_attr(&AttributeValue::Ss(vec!["A1".to_string()])).unwrap();
        assert_eq!(value, json!(["A1"]));
    }

    #[test]
    fn test_bad_number_rejected() {
        assert!(from_attr(&AttributeValue::N("abc".to_string())).is_err());
    }
}
