//! Application configuration structs
//!
//! Loads configuration from environment variables (and an optional `.env` file).

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: ServerConfig,
    pub heartbeat: HeartbeatConfig,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            other => Err(ConfigError::InvalidValue("APP_ENV", other.to_string())),
        }
    }
}

/// Listener configuration for the gateway
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Smallest pong-wait a heartbeat will run with
const MIN_PONG_WAIT: Duration = Duration::from_millis(10);

/// Liveness and outbound queue tuning for every client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// How long a connection may stay silent (no pong) before it is dropped
    pub pong_wait: Duration,
    /// Capacity of each client's outbound queue
    pub egress_buffer: usize,
}

impl HeartbeatConfig {
    /// Create a heartbeat configuration with the given pong-wait deadline,
    /// raised to `MIN_PONG_WAIT` if shorter
    #[must_use]
    pub fn new(pong_wait: Duration) -> Self {
        Self {
            pong_wait: pong_wait.max(MIN_PONG_WAIT),
            egress_buffer: default_egress_buffer(),
        }
    }

    /// Set the outbound queue capacity
    #[must_use]
    pub fn with_egress_buffer(mut self, egress_buffer: usize) -> Self {
        self.egress_buffer = egress_buffer.max(1);
        self
    }

    /// Interval between server pings, 90% of the pong-wait deadline
    #[must_use]
    pub fn ping_interval(&self) -> Duration {
        self.pong_wait.max(MIN_PONG_WAIT) * 9 / 10
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self::new(default_pong_wait())
    }
}

// Default value functions
fn default_app_name() -> String {
    "event-hub".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_pong_wait() -> Duration {
    Duration::from_secs(10)
}

fn default_egress_buffer() -> usize {
    100
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a variable is set to a value that cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// Every variable is optional; unset keys fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = match lookup("APP_ENV") {
            Some(value) => value.parse()?,
            None => default_env(),
        };

        let pong_wait_ms: u64 = parse_var(&lookup, "HEARTBEAT_PONG_WAIT_MS")?
            .unwrap_or_else(|| default_pong_wait().as_millis() as u64);
        if pong_wait_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "HEARTBEAT_PONG_WAIT_MS",
                "must be greater than zero".to_string(),
            ));
        }

        let egress_buffer: usize =
            parse_var(&lookup, "EGRESS_BUFFER_SIZE")?.unwrap_or_else(default_egress_buffer);
        if egress_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "EGRESS_BUFFER_SIZE",
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env,
            },
            gateway: ServerConfig {
                host: lookup("GATEWAY_HOST").unwrap_or_else(default_host),
                port: parse_var(&lookup, "GATEWAY_PORT")?.unwrap_or_else(default_port),
            },
            heartbeat: HeartbeatConfig::new(Duration::from_millis(pong_wait_ms))
                .with_egress_buffer(egress_buffer),
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSettings {
                name: default_app_name(),
                env: default_env(),
            },
            gateway: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
