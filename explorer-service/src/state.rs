//! Application state for explorer service.

use std::sync::Arc;
use std::time::Duration;

use common::config::AppConfig;
use common::errors::AppResult;

use crate::connection_factory::ConnectionFactory;
use crate::profile_store::{InMemoryProfileStore, ProfileStore, SqlProfileStore};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub profiles: Arc<dyn ProfileStore>,
    pub connections: Arc<ConnectionFactory>,
}

impl AppState {
    /// Creates a state over an existing profile store.
    pub fn new(config: AppConfig, profiles: Arc<dyn ProfileStore>) -> Self {
        let connections = Arc::new(ConnectionFactory::new(
            profiles.clone(),
            Duration::from_secs(config.connect_timeout_secs),
        ));
        Self {
            config,
            profiles,
            connections,
        }
    }

    /// Opens the configured profile store. Without `DATABASE_URL` profiles
    /// live in memory and are lost on restart.
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        let profiles: Arc<dyn ProfileStore> = match config.profile_store_url.as_deref() {
            Some(url) => Arc::new(SqlProfileStore::connect(&config, url).await?),
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory profile store");
                Arc::new(InMemoryProfileStore::new())
            }
        };
        Ok(Self::new(config, profiles))
    }
}
