//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use checkout::GatewayConfig;
use checkout::gateway::{DEFAULT_API_BASE, DEFAULT_CURRENCY};
use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Server configuration.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `pretty` or `json` (default: `pretty`)
/// - `DATABASE_URL` — PostgreSQL URL; without it orders live in memory
/// - `DATABASE_MAX_CONNECTIONS` — pool size (default: `10`)
/// - `CATALOG_SEED_FILE` — JSON array of products loaded at start-up
/// - `GATEWAY_KEY_ID`, `GATEWAY_KEY_SECRET` — gateway credentials (required)
/// - `GATEWAY_WEBHOOK_SECRET` — webhook signing secret
/// - `GATEWAY_API_BASE` — gateway API root
/// - `GATEWAY_TIMEOUT_SECS` — gateway request timeout (default: `30`)
/// - `CURRENCY` — order currency (default: `"INR"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub catalog_seed_file: Option<PathBuf>,
    pub gateway: GatewayConfig,
}

impl Config {
    /// Creates a config with default server settings around the given gateway.
    pub fn new(gateway: GatewayConfig) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            database_max_connections: 10,
            catalog_seed_file: None,
            gateway,
        }
    }

    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`, treating blank values as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let mut gateway = GatewayConfig::new(
            require("GATEWAY_KEY_ID")?,
            require("GATEWAY_KEY_SECRET")?,
        )
        .with_api_base(get("GATEWAY_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()))
        .with_currency(get("CURRENCY").unwrap_or_else(|| DEFAULT_CURRENCY.to_string()));
        if let Some(secret) = get("GATEWAY_WEBHOOK_SECRET") {
            gateway = gateway.with_webhook_secret(secret);
        }
        if let Some(secs) = parsed::<u64>(&get, "GATEWAY_TIMEOUT_SECS")? {
            gateway = gateway.with_timeout(Duration::from_secs(secs));
        }

        let log_format = match get("LOG_FORMAT") {
            None => LogFormat::Pretty,
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "text" => LogFormat::Pretty,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "LOG_FORMAT",
                        value,
                    });
                }
            },
        };

        let defaults = Self::new(gateway);
        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parsed(&get, "PORT")?.unwrap_or(defaults.port),
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
            database_url: get("DATABASE_URL"),
            database_max_connections: parsed(&get, "DATABASE_MAX_CONNECTIONS")?
                .unwrap_or(defaults.database_max_connections),
            catalog_seed_file: get("CATALOG_SEED_FILE").map(PathBuf::from),
            gateway: defaults.gateway,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parsed<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    get(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value })
        })
        .transpose()
}
