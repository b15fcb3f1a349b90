//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use clients::{AmqpConfig, HttpClientConfig};
use thiserror::Error;

/// A variable was set but could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value {value:?} for {key}")]
pub struct ConfigError {
    pub key: String,
    pub value: String,
}

/// Location of one HTTP collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub protocol: String,
    pub server: String,
    pub port: u16,
    pub path: String,
    pub timeout: Duration,
}

impl ClientOptions {
    /// `{protocol}://{server}:{port}{path}`, without a trailing slash.
    pub fn base_url(&self) -> String {
        let path = self.path.trim_matches('/');
        if path.is_empty() {
            format!("{}://{}:{}", self.protocol, self.server, self.port)
        } else {
            format!("{}://{}:{}/{}", self.protocol, self.server, self.port, path)
        }
    }

    pub fn http_config(&self) -> HttpClientConfig {
        HttpClientConfig::new(self.base_url(), self.timeout)
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT` bind address (default: `0.0.0.0:8080`)
/// - `RUST_LOG` tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` `json` for JSON log lines, anything else for text
/// - `CART_PROTOCOL`, `CART_SERVER`, `CART_PORT`, `CART_PATH`,
///   `CART_TIMEOUT` (seconds) and the same `CATALOG_*` set
/// - `RABBITMQ_HOST`, `RABBITMQ_PORT`, `RABBITMQ_USERNAME`,
///   `RABBITMQ_PASSWORD`, `RABBITMQ_EXCHANGE`
/// - `CHECKOUT_STEP_TIMEOUT_MS` upper bound for each saga step
/// - `SHUTDOWN_GRACE_SECS` how long in-flight requests get on shutdown
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub json_logs: bool,
    pub cart: ClientOptions,
    pub catalog: ClientOptions,
    pub rabbitmq: AmqpConfig,
    pub step_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from `lookup`, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let client = |prefix: &str, default: &ClientOptions| -> Result<ClientOptions, ConfigError> {
            Ok(ClientOptions {
                protocol: string(&format!("{prefix}_PROTOCOL"), &default.protocol),
                server: string(&format!("{prefix}_SERVER"), &default.server),
                port: parse(&lookup, &format!("{prefix}_PORT"), default.port)?,
                path: string(&format!("{prefix}_PATH"), &default.path),
                timeout: Duration::from_secs(parse(
                    &lookup,
                    &format!("{prefix}_TIMEOUT"),
                    default.timeout.as_secs(),
                )?),
            })
        };

        Ok(Self {
            host: string("HOST", &defaults.host),
            port: parse(&lookup, "PORT", defaults.port)?,
            log_level: string("RUST_LOG", &defaults.log_level),
            json_logs: lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            cart: client("CART", &defaults.cart)?,
            catalog: client("CATALOG", &defaults.catalog)?,
            rabbitmq: AmqpConfig {
                host: string("RABBITMQ_HOST", &defaults.rabbitmq.host),
                port: parse(&lookup, "RABBITMQ_PORT", defaults.rabbitmq.port)?,
                username: string("RABBITMQ_USERNAME", &defaults.rabbitmq.username),
                password: string("RABBITMQ_PASSWORD", &defaults.rabbitmq.password),
                exchange: string("RABBITMQ_EXCHANGE", &defaults.rabbitmq.exchange),
            },
            step_timeout: Duration::from_millis(parse(
                &lookup,
                "CHECKOUT_STEP_TIMEOUT_MS",
                defaults.step_timeout.as_millis() as u64,
            )?),
            shutdown_grace: Duration::from_secs(parse(
                &lookup,
                "SHUTDOWN_GRACE_SECS",
                defaults.shutdown_grace.as_secs(),
            )?),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError {
            key: key.to_string(),
            value: raw,
        }),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            json_logs: false,
            cart: ClientOptions {
                protocol: "http".to_string(),
                server: "localhost".to_string(),
                port: 8081,
                path: String::new(),
                timeout: Duration::from_secs(5),
            },
            catalog: ClientOptions {
                protocol: "http".to_string(),
                server: "localhost".to_string(),
                port: 8082,
                path: String::new(),
                timeout: Duration::from_secs(5),
            },
            rabbitmq: AmqpConfig {
                host: "localhost".to_string(),
                port: 5672,
                username: "guest".to_string(),
                password: "guest".to_string(),
                exchange: "inventory_update".to_string(),
            },
            step_timeout: Duration::from_millis(2000),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}
