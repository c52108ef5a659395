//! Target database connections.
//!
//! Every explorer operation opens exactly one connection through
//! [`ConnectionFactory::with_connection`] and the connection is closed before
//! the operation returns, whether the work succeeded or not. Nothing is pooled.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use common::errors::{AppError, AppResult};
use common::models::ConnectionProfile;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;

use crate::profile_store::ProfileStore;

/// Future returned by work that borrows a connection.
pub type ConnFuture<'c, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'c>>;

/// Opens connections to registered instances.
pub struct ConnectionFactory {
    profiles: Arc<dyn ProfileStore>,
    connect_timeout: Duration,
}

impl ConnectionFactory {
    pub fn new(profiles: Arc<dyn ProfileStore>, connect_timeout: Duration) -> Self {
        Self {
            profiles,
            connect_timeout,
        }
    }

    /// Opens a connection to `instance_name`.
    ///
    /// # Errors
    /// `InstanceNotFound` when no profile is registered, `ConnectionFailed`
    /// when the database cannot be reached within the connect timeout.
    pub async fn open(&self, instance_name: &str) -> AppResult<PgConnection> {
        let profile = self
            .profiles
            .find_by_instance_name(instance_name)
            .await?
            .ok_or_else(|| AppError::InstanceNotFound(instance_name.to_string()))?;

        let options = connect_options(&profile);
        let failed = |reason: String| AppError::ConnectionFailed {
            instance: instance_name.to_string(),
            reason,
        };

        let conn = tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&options))
            .await
            .map_err(|_| {
                failed(format!(
                    "timed out after {}s",
                    self.connect_timeout.as_secs_f32()
                ))
            })?
            .map_err(|e| failed(e.to_string()))?;

        tracing::debug!(
            instance = %instance_name,
            host = %profile.hostname,
            port = profile.port,
            database = %profile.database_name,
            "Connection opened"
        );
        Ok(conn)
    }

    /// Runs `work` on a fresh connection and closes it afterwards.
    ///
    /// The connection is released on both the success and the error path
    /// before the result is handed back.
    pub async fn with_connection<T, F>(&self, instance_name: &str, work: F) -> AppResult<T>
    where
        F: for<'c> FnOnce(&'c mut PgConnection) -> ConnFuture<'c, T>,
    {
        let mut conn = self.open(instance_name).await?;
        let result = work(&mut conn).await;
        release(instance_name, conn).await;
        result
    }
}

/// Builds driver options from a profile. Absent credentials fall back to the
/// driver defaults (`PGUSER`, `PGPASSWORD`, the OS user).
pub fn connect_options(profile: &ConnectionProfile) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&profile.hostname)
        .port(profile.port)
        .database(&profile.database_name)
        .application_name("explorer-service");

    if let Some(username) = profile.username.as_deref() {
        options = options.username(username);
    }
    if let Some(password) = profile.password.as_deref() {
        options = options.password(password);
    }
    options
}

async fn release(instance_name: &str, conn: PgConnection) {
    match conn.close().await {
        Ok(()) => tracing::debug!(instance = %instance_name, "Connection closed"),
        Err(e) => tracing::warn!(
            instance = %instance_name,
            error = %e,
            "Connection did not close cleanly"
        ),
    }
}
