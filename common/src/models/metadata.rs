//! Structural metadata descriptors.
//!
//! Produced per request from the database catalog and discarded after the
//! response is assembled.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A schema reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SchemaDescriptor {
    pub name: String,
    pub catalog: Option<String>,
}

impl SchemaDescriptor {
    pub fn new(name: impl Into<String>, catalog: Option<&str>) -> Self {
        Self {
            name: name.into(),
            catalog: catalog.map(str::to_string),
        }
    }
}

/// A base table reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TableDescriptor {
    pub catalog: Option<String>,
    pub schema: String,
    pub name: String,
}

/// Whether a column accepts NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Nullability {
    No,
    Yes,
    Unknown,
}

impl Nullability {
    /// Maps an `is_nullable` catalog value (`YES` / `NO`).
    pub fn from_catalog(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_uppercase()) {
            Some(v) if v == "YES" => Nullability::Yes,
            Some(v) if v == "NO" => Nullability::No,
            _ => Nullability::Unknown,
        }
    }
}

/// A column of one table, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Engine type name, e.g. `int4` or `varchar`.
    #[serde(rename = "type")]
    pub declared_type: String,
    /// Character length, numeric precision or datetime precision.
    pub size: Option<i32>,
    pub nullable: Nullability,
    #[serde(rename = "autoincrement")]
    pub auto_increment: bool,
    #[serde(rename = "primaryKey")]
    pub primary_key: bool,
}

/// Column names forming a table's primary key.
pub type PrimaryKeySet = BTreeSet<String>;
