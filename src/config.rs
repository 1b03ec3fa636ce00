//! Environment-driven configuration for the binaries

use std::env;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PULSE_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_WORK_MULTIPLIER: u32 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

/// Deployment environment name (`ENVIRONMENT`), defaults to `sandbox`
pub fn get_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_var(&lookup, "PORT")?.unwrap_or(DEFAULT_PORT);
        Ok(Self { port })
    }
}

/// Settings for the heartbeat worker and its monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatConfig {
    pub pulse_interval: Duration,
    pub work_multiplier: u32,
    /// How long the monitor waits for any event before reporting a stall
    pub monitor_timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        let pulse_interval = Duration::from_millis(DEFAULT_PULSE_INTERVAL_MS);
        Self {
            pulse_interval,
            work_multiplier: DEFAULT_WORK_MULTIPLIER,
            monitor_timeout: pulse_interval * 2,
        }
    }
}

impl HeartbeatConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pulse_ms: u64 =
            parse_var(&lookup, "PULSE_INTERVAL_MS")?.unwrap_or(DEFAULT_PULSE_INTERVAL_MS);
        if pulse_ms == 0 {
            return Err(ConfigError::Zero {
                name: "PULSE_INTERVAL_MS",
            });
        }

        let work_multiplier: u32 =
            parse_var(&lookup, "WORK_MULTIPLIER")?.unwrap_or(DEFAULT_WORK_MULTIPLIER);
        if work_multiplier == 0 {
            return Err(ConfigError::Zero {
                name: "WORK_MULTIPLIER",
            });
        }

        let pulse_interval = Duration::from_millis(pulse_ms);
        let monitor_timeout = match parse_var::<u64, _>(&lookup, "MONITOR_TIMEOUT_MS")? {
            Some(0) => {
                return Err(ConfigError::Zero {
                    name: "MONITOR_TIMEOUT_MS",
                })
            }
            Some(ms) => Duration::from_millis(ms),
            None => pulse_interval * 2,
        };

        Ok(Self {
            pulse_interval,
            work_multiplier,
            monitor_timeout,
        })
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
