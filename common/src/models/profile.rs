//! Connection profile models.
//!
//! A profile tells the explorer how to reach one registered database instance.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Stored connection parameters for one database instance.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfile {
    /// Unique symbolic name of the instance.
    pub instance_name: String,
    /// Database host.
    pub hostname: String,
    /// Database port.
    pub port: u16,
    /// Database to open on the host.
    pub database_name: String,
    /// Login user. Absent means the driver default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Login password (not serialized in responses).
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
}

impl std::fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("instance_name", &self.instance_name)
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("database_name", &self.database_name)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Request body for registering a new instance.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterProfileRequest {
    /// Unique symbolic name.
    #[validate(length(min = 1, max = 128, message = "Instance name must be 1-128 characters"))]
    pub instance_name: String,
    /// Database host.
    #[validate(length(min = 1, max = 255, message = "Hostname must be 1-255 characters"))]
    pub hostname: String,
    /// Database port (defaults to 5432).
    #[validate(range(min = 1, message = "Port must be greater than zero"))]
    pub port: Option<u16>,
    /// Database name.
    #[validate(length(min = 1, max = 128, message = "Database name must be 1-128 characters"))]
    pub database_name: String,
    /// Login user.
    pub username: Option<String>,
    /// Login password.
    pub password: Option<String>,
}

/// PostgreSQL's well-known port.
pub const DEFAULT_PORT: u16 = 5432;

impl RegisterProfileRequest {
    /// Converts the request into a stored profile.
    pub fn into_profile(self) -> ConnectionProfile {
        ConnectionProfile {
            instance_name: self.instance_name.trim().to_string(),
            hostname: self.hostname,
            port: self.port.unwrap_or(DEFAULT_PORT),
            database_name: self.database_name,
            username: self.username.filter(|u| !u.is_empty()),
            password: self.password,
        }
    }
}
