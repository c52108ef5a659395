//! Result shaping.
//!
//! Converts the in-memory structures produced by the explorer into the
//! uniform output shape: an ordered sequence of key/value records, or a
//! single record. Field order is preserved (serde_json `preserve_order`).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::errors::{AppError, AppResult};

/// One output record: field name to value, in insertion order.
pub type Record = serde_json::Map<String, Value>;

/// Failure body returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorPayload {
    /// Human-readable message.
    pub msg: String,
}

impl ErrorPayload {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

/// Stateless conversion into records.
pub struct ResultAssembler;

impl ResultAssembler {
    /// Converts a slice of serializable items into an ordered sequence of records.
    pub fn sequence<T: Serialize>(items: &[T]) -> AppResult<Vec<Record>> {
        items.iter().map(Self::single).collect()
    }

    /// Converts one serializable item into a record.
    ///
    /// # Errors
    /// Returns `AppError::DataAccess` if the item does not serialize to a JSON object.
    pub fn single<T: Serialize>(item: &T) -> AppResult<Record> {
        let value = serde_json::to_value(item)
            .map_err(|e| AppError::DataAccess(format!("failed to shape result: {}", e)))?;
        match value {
            Value::Object(record) => Ok(record),
            other => Err(AppError::DataAccess(format!(
                "expected a record, got {}",
                type_label(&other)
            ))),
        }
    }
}

fn type_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnDescriptor, ColumnStats, Nullability, SchemaDescriptor};
    use serde_json::json;

    #[test]
    fn test_sequence_keeps_item_and_field_order() {
        let schemas = vec![
            SchemaDescriptor::new("public", Some("shop")),
            SchemaDescriptor::new("audit", Some("shop")),
        ];
        let records = ResultAssembler::sequence(&schemas).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], "public");
        assert_eq!(records[1]["name"], "audit");
        let keys: Vec<&str> = records[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "catalog"]);
    }

    #[test]
    fn test_column_record_shape() {
        let column = ColumnDescriptor {
            name: "id".into(),
            declared_type: "int4".into(),
            size: Some(32),
            nullable: Nullability::No,
            auto_increment: true,
            primary_key: true,
        };
        let record = ResultAssembler::single(&column).unwrap();
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["name", "type", "size", "nullable", "autoincrement", "primaryKey"]
        );
        assert_eq!(record["nullable"], json!("no"));
    }

    #[test]
    fn test_empty_stats_record_has_no_fields() {
        let record = ResultAssembler::single(&ColumnStats::default()).unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn test_non_object_is_rejected() {
        let err = ResultAssembler::single(&42).unwrap_err();
        assert!(err.to_string().contains("number"));
    }
}
