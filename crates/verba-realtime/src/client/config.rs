use std::time::Duration;

use crate::client::consts::{
    DEFAULT_CAPACITY, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_WS_URL, VERBA_WS_URL,
};

#[derive(Debug, Clone)]
pub struct Config {
    url: String,
    capacity: usize,
    connect_timeout: Duration,
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.config.url = url.to_string();
        self
    }

    /// Size of the outbound and inbound queues.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity.max(1);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    // Sets the default values, taking the endpoint from VERBA_WS_URL when set.
    pub fn new() -> Self {
        Self {
            url: std::env::var(VERBA_WS_URL).unwrap_or_else(|_| DEFAULT_WS_URL.to_string()),
            capacity: DEFAULT_CAPACITY,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
