//! Typed application configuration.
//!
//! Loaded once at startup, either from a YAML file (following the teacher's
//! `SentinelConfig::from_file` convention) or from environment variables for
//! container-style deployment. Not part of the coordination design proper,
//! carried because a runnable service needs somewhere to put its tunables.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("missing or invalid environment variable {0}")]
    Env(String),
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub ticket: TicketConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    /// Address the HTTP gateway binds to, e.g. "0.0.0.0:8080".
    pub bind_addr: String,
    /// Promoter tick period in milliseconds (spec: 100ms).
    #[serde(default = "default_promote_interval_ms")]
    pub promote_interval_ms: u64,
    /// Durability worker pacing delay before each save attempt (spec: 100ms).
    #[serde(default = "default_save_pacing_ms")]
    pub save_pacing_ms: u64,
    /// Retry count for transient durability failures (spec: 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed delay between durability retries (spec: 2s).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Idle timeout for DLQ replay to self-terminate (spec: 3s).
    #[serde(default = "default_dlq_idle_ms")]
    pub dlq_idle_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TicketConfig {
    /// The single ticket identity this deployment sells (no multi-event scheduling).
    pub name: String,
    /// Initial stock, e.g. 1000.
    pub initial_stock: i64,
    /// Maximum concurrently active users in the hot path (spec: e.g. 100).
    pub max_active: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_promote_interval_ms() -> u64 {
    100
}
fn default_save_pacing_ms() -> u64 {
    100
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    2_000
}
fn default_dlq_idle_ms() -> u64 {
    3_000
}
fn default_max_connections() -> u32 {
    10
}

impl AppConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: AppConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration purely from environment variables, for deployments
    /// that prefer 12-factor style config over a mounted file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr =
            std::env::var("TICKETGATE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let ticket_name = std::env::var("TICKETGATE_TICKET_NAME")
            .map_err(|_| ConfigError::Env("TICKETGATE_TICKET_NAME".to_string()))?;
        let initial_stock = std::env::var("TICKETGATE_INITIAL_STOCK")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1000);
        let max_active = std::env::var("TICKETGATE_MAX_ACTIVE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100);
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::Env("DATABASE_URL".to_string()))?;

        Ok(AppConfig {
            service: ServiceConfig {
                bind_addr,
                promote_interval_ms: default_promote_interval_ms(),
                save_pacing_ms: default_save_pacing_ms(),
                max_retries: default_max_retries(),
                retry_delay_ms: default_retry_delay_ms(),
                dlq_idle_ms: default_dlq_idle_ms(),
            },
            ticket: TicketConfig {
                name: ticket_name,
                initial_stock,
                max_active,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: default_max_connections(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_yaml_with_defaults() {
        let yaml = r#"
service:
  bind_addr: "0.0.0.0:8080"
ticket:
  name: "concert_2026"
  initial_stock: 1000
  max_active: 100
database:
  url: "postgres://localhost/ticketgate"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.ticket.name, "concert_2026");
        assert_eq!(config.ticket.initial_stock, 1000);
        assert_eq!(config.service.promote_interval_ms, 100);
        assert_eq!(config.service.max_retries, 3);
        assert_eq!(config.database.max_connections, 10);
    }

    #[test]
    fn overrides_defaults_when_present() {
        let yaml = r#"
service:
  bind_addr: "127.0.0.1:9000"
  promote_interval_ms: 250
  max_retries: 5
ticket:
  name: "concert_2026"
  initial_stock: 500
  max_active: 50
database:
  url: "postgres://localhost/ticketgate"
  max_connections: 25
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.service.promote_interval_ms, 250);
        assert_eq!(config.service.max_retries, 5);
        assert_eq!(config.database.max_connections, 25);
    }
}
