//! Application Configuration Module
//!
//! Loads the client settings from the environment (and `.env`), with
//! defaults for everything.

use std::env;
use std::time::Duration;

use tracing::Level;
use verba_core::InterruptPolicy;
use verba_core::session::RECONNECT_DELAY_MS;

pub const DEFAULT_WS_URL: &str = "ws://127.0.0.1:8000/ws";
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub ws_url: String,
    pub api_url: String,
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    pub reconnect_delay: Duration,
    pub interrupt_policy: InterruptPolicy,
    pub log_level: Level,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid value for {name}: {value}")]
    InvalidVar { name: String, value: String },
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `VERBA_WS_URL`: duplex endpoint. Defaults to "ws://127.0.0.1:8000/ws".
    // *   `VERBA_API_URL`: base URL of the HTTP side channel. Defaults to "http://127.0.0.1:8000".
    // *   `VERBA_INPUT_DEVICE` / `VERBA_OUTPUT_DEVICE`: (Optional) audio device names.
    // *   `VERBA_RECONNECT_DELAY_MS`: (Optional) delay before reconnecting. Defaults to 3000.
    // *   `VERBA_CLEAR_BUFFER_POLICY`: (Optional) "listen" or "preserve-processing".
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ws_url = lookup("VERBA_WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.to_string());
        let api_url = lookup("VERBA_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        // An empty device name means the system default.
        let input_device = lookup("VERBA_INPUT_DEVICE").filter(|name| !name.trim().is_empty());
        let output_device = lookup("VERBA_OUTPUT_DEVICE").filter(|name| !name.trim().is_empty());

        let reconnect_delay = match lookup("VERBA_RECONNECT_DELAY_MS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidVar {
                    name: "VERBA_RECONNECT_DELAY_MS".to_string(),
                    value,
                })?,
            None => Duration::from_millis(RECONNECT_DELAY_MS),
        };

        let interrupt_policy = match lookup("VERBA_CLEAR_BUFFER_POLICY") {
            Some(value) => value
                .parse::<InterruptPolicy>()
                .map_err(|_| ConfigError::InvalidVar {
                    name: "VERBA_CLEAR_BUFFER_POLICY".to_string(),
                    value,
                })?,
            None => InterruptPolicy::default(),
        };

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            ws_url,
            api_url,
            input_device,
            output_device,
            reconnect_delay,
            interrupt_policy,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.ws_url, DEFAULT_WS_URL);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.input_device, None);
        assert_eq!(config.reconnect_delay, Duration::from_millis(3000));
        assert_eq!(config.interrupt_policy, InterruptPolicy::AlwaysListen);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("VERBA_WS_URL", "wss://tutor.example/ws"),
            ("VERBA_INPUT_DEVICE", "USB Mic"),
            ("VERBA_OUTPUT_DEVICE", " "),
            ("VERBA_RECONNECT_DELAY_MS", "500"),
            ("VERBA_CLEAR_BUFFER_POLICY", "preserve-processing"),
            ("RUST_LOG", "debug"),
        ])
        .unwrap();
        assert_eq!(config.ws_url, "wss://tutor.example/ws");
        assert_eq!(config.input_device.as_deref(), Some("USB Mic"));
        assert_eq!(config.output_device, None);
        assert_eq!(config.reconnect_delay, Duration::from_millis(500));
        assert_eq!(config.interrupt_policy, InterruptPolicy::PreserveProcessing);
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("RUST_LOG", "chatty")]),
            Err(ConfigError::InvalidLogLevel(_))
        ));
        assert!(matches!(
            load(&[("VERBA_RECONNECT_DELAY_MS", "soon")]),
            Err(ConfigError::InvalidVar { .. })
        ));
        assert!(matches!(
            load(&[("VERBA_CLEAR_BUFFER_POLICY", "ignore")]),
            Err(ConfigError::InvalidVar { .. })
        ));
    }
}
