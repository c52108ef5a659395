//! Shared building blocks for the schema explorer service.
//!
//! Configuration, the error taxonomy, response shaping, data models,
//! HTTP middleware and identifier validation live here so that the
//! service binary only wires them together.

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
pub mod utils;

pub use errors::{AppError, AppResult, ErrorKind};
