//! Shared data models.

pub mod metadata;
pub mod profile;
pub mod stats;

// Re-export commonly used types
pub use metadata::{
    ColumnDescriptor, Nullability, PrimaryKeySet, SchemaDescriptor, TableDescriptor,
};
pub use profile::{ConnectionProfile, RegisterProfileRequest};
pub use stats::{ColumnStats, DataRow};
