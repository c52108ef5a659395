//! Application configuration.
//!
//! Values are read from the process environment. A `.env` file in the
//! working directory is honoured for keys that are not already set.

use std::str::FromStr;

/// Log output format for the `fmt` layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable, multi-line friendly output.
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Name reported in logs and health responses.
    pub service_name: String,
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Connection URL of the profile store. `None` selects the in-memory store.
    pub profile_store_url: Option<String>,
    /// Pool size for the profile store (target databases are never pooled).
    pub profile_store_max_connections: u32,
    /// Upper bound for opening a connection to a target instance.
    pub connect_timeout_secs: u64,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "explorer-service".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            profile_store_url: None,
            profile_store_max_connections: 5,
            connect_timeout_secs: 10,
            log_format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Loads the configuration from the environment.
    pub fn load() -> Self {
        let defaults = Self::default();
        Self {
            service_name: defaults.service_name,
            host: env_or("SERVER_HOST", defaults.host),
            port: env_or("SERVER_PORT", defaults.port),
            profile_store_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            profile_store_max_connections: env_or(
                "PROFILE_STORE_MAX_CONNECTIONS",
                defaults.profile_store_max_connections,
            ),
            connect_timeout_secs: env_or("CONNECT_TIMEOUT_SECS", defaults.connect_timeout_secs),
            log_format: env_or("LOG_FORMAT", defaults.log_format),
        }
    }

    /// Loads the configuration and stamps the given service name on it.
    pub fn load_with_service(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Self::load()
        }
    }

    /// Reads `.env` from the working directory (best-effort, no error if missing).
    ///
    /// Keys already present in the environment win over the file.
    pub fn load_dotenv() {
        let Ok(content) = std::fs::read_to_string(".env") else {
            return;
        };
        for (key, value) in parse_dotenv(&content) {
            if std::env::var(key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Ignoring unparsable configuration value");
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim().trim_matches('"')))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}
