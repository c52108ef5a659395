//! Column statistics and table data models.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// One table row: column name to raw value, in column enumeration order.
pub type DataRow = serde_json::Map<String, Value>;

/// Aggregates over a single column.
///
/// A field is absent when its aggregate produced no value, e.g. on an
/// empty table. Values keep the type the database reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ColumnStats {
    #[serde(rename = "avg", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub average: Option<Value>,
    #[serde(rename = "min", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub minimum: Option<Value>,
    #[serde(rename = "max", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub maximum: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub median: Option<Value>,
}

impl ColumnStats {
    /// True when no aggregate produced a value.
    pub fn is_empty(&self) -> bool {
        self.average.is_none()
            && self.minimum.is_none()
            && self.maximum.is_none()
            && self.median.is_none()
    }
}
