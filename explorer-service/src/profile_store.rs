//! Connection profile store.
//!
//! Resolves an instance name to the parameters needed to reach it. Profiles
//! are persisted in a PostgreSQL metadata table when a store URL is
//! configured, otherwise kept in memory.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::ConnectionProfile;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::RwLock;

/// Keyed store of connection profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Returns the profile registered under `instance_name`, if any.
    async fn find_by_instance_name(&self, instance_name: &str)
        -> AppResult<Option<ConnectionProfile>>;

    /// Lists all profiles ordered by instance name.
    async fn list(&self) -> AppResult<Vec<ConnectionProfile>>;

    /// Registers a new profile. Fails with `InstanceExists` on a duplicate name.
    async fn add(&self, profile: ConnectionProfile) -> AppResult<()>;

    /// Removes a profile. Fails with `InstanceNotFound` if nothing was removed.
    async fn remove(&self, instance_name: &str) -> AppResult<()>;
}

/// Row from the `connection_profiles` table.
#[derive(sqlx::FromRow)]
struct ProfileRow {
    instance_name: String,
    hostname: String,
    port: i32,
    database_name: String,
    username: Option<String>,
    password: Option<String>,
}

impl ProfileRow {
    fn into_profile(self) -> AppResult<ConnectionProfile> {
        let port = u16::try_from(self.port).map_err(|_| {
            AppError::ProfileStore(format!(
                "stored port {} of `{}` is out of range",
                self.port, self.instance_name
            ))
        })?;
        Ok(ConnectionProfile {
            instance_name: self.instance_name,
            hostname: self.hostname,
            port,
            database_name: self.database_name,
            username: self.username,
            password: self.password,
        })
    }
}

/// Profile store persisted in PostgreSQL.
pub struct SqlProfileStore {
    pool: PgPool,
}

impl SqlProfileStore {
    /// Connects to the store and creates the `connection_profiles` table if needed.
    pub async fn connect(config: &AppConfig, url: &str) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.profile_store_max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| AppError::ProfileStore(format!("Failed to open profile store: {}", e)))?;

        let store = Self { pool };
        store.ensure_table().await?;
        Ok(store)
    }

    async fn ensure_table(&self) -> AppResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS connection_profiles (
                instance_name  VARCHAR(128)  PRIMARY KEY,
                hostname       VARCHAR(255)  NOT NULL,
                port           INTEGER       NOT NULL,
                database_name  VARCHAR(128)  NOT NULL,
                username       VARCHAR(128),
                password       VARCHAR(512),
                created_at     TIMESTAMPTZ   NOT NULL DEFAULT now()
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::ProfileStore(format!("Failed to create connection_profiles table: {}", e))
        })?;

        tracing::info!("Metadata table `connection_profiles` ensured");
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for SqlProfileStore {
    async fn find_by_instance_name(
        &self,
        instance_name: &str,
    ) -> AppResult<Option<ConnectionProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT instance_name, hostname, port, database_name, username, password
             FROM connection_profiles WHERE instance_name = $1",
        )
        .bind(instance_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::ProfileStore(format!("Failed to look up profile: {}", e)))?;

        row.map(ProfileRow::into_profile).transpose()
    }

    async fn list(&self) -> AppResult<Vec<ConnectionProfile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(
            "SELECT instance_name, hostname, port, database_name, username, password
             FROM connection_profiles ORDER BY instance_name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::ProfileStore(format!("Failed to list profiles: {}", e)))?;

        rows.into_iter().map(ProfileRow::into_profile).collect()
    }

    async fn add(&self, profile: ConnectionProfile) -> AppResult<()> {
        let result = sqlx::query(
            "INSERT INTO connection_profiles
                (instance_name, hostname, port, database_name, username, password)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (instance_name) DO NOTHING",
        )
        .bind(&profile.instance_name)
        .bind(&profile.hostname)
        .bind(i32::from(profile.port))
        .bind(&profile.database_name)
        .bind(&profile.username)
        .bind(&profile.password)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::ProfileStore(format!("Failed to save profile: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::InstanceExists(profile.instance_name));
        }
        Ok(())
    }

    async fn remove(&self, instance_name: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM connection_profiles WHERE instance_name = $1")
            .bind(instance_name)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::ProfileStore(format!("Failed to delete profile: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::InstanceNotFound(instance_name.to_string()));
        }
        Ok(())
    }
}

/// Process-local profile store.
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, ConnectionProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `profiles`.
    pub fn with_profiles(profiles: impl IntoIterator<Item = ConnectionProfile>) -> Self {
        let profiles = profiles
            .into_iter()
            .map(|p| (p.instance_name.clone(), p))
            .collect();
        Self {
            profiles: RwLock::new(profiles),
        }
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn find_by_instance_name(
        &self,
        instance_name: &str,
    ) -> AppResult<Option<ConnectionProfile>> {
        Ok(self.profiles.read().await.get(instance_name).cloned())
    }

    async fn list(&self) -> AppResult<Vec<ConnectionProfile>> {
        let mut profiles: Vec<_> = self.profiles.read().await.values().cloned().collect();
        profiles.sort_by(|a, b| a.instance_name.cmp(&b.instance_name));
        Ok(profiles)
    }

    async fn add(&self, profile: ConnectionProfile) -> AppResult<()> {
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.instance_name) {
            return Err(AppError::InstanceExists(profile.instance_name));
        }
        profiles.insert(profile.instance_name.clone(), profile);
        Ok(())
    }

    async fn remove(&self, instance_name: &str) -> AppResult<()> {
        self.profiles
            .write()
            .await
            .remove(instance_name)
            .map(|_| ())
            .ok_or_else(|| AppError::InstanceNotFound(instance_name.to_string()))
    }
}
