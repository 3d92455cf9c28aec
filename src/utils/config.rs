use serde::Deserialize;
use std::time::Duration;
use config::{Config as ConfigLib, ConfigError, Environment, File};
use crate::utils::error::{Result, EngineError};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub presence: PresenceConfig,
    pub reconcile: ReconcileConfig,
    pub session: SessionConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresenceConfig {
    /// Explicit WebSocket endpoint; derived from `api.base_url` when unset.
    pub url: Option<String>,
    pub connect_timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileConfig {
    pub poll_interval: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub token_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub directory: Option<String>,
}

impl Config {
    pub fn new() -> Result<Self> {
        let config = ConfigLib::builder()
            // Start with default values
            .set_default("api.base_url", "http://localhost:5000")?
            .set_default("api.request_timeout", 10)?
            .set_default("presence.connect_timeout", 10)?
            .set_default("reconcile.poll_interval", 10)?
            .set_default("session.token_path", "data/token")?
            .set_default("log.level", "info")?

            // Load from config file
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Override with environment variables (e.g., GAMEZONE__API__BASE_URL)
            .add_source(Environment::with_prefix("GAMEZONE").separator("__"))

            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(EngineError::Config("api.base_url must be an http(s) URL".into()));
        }
        if self.reconcile.poll_interval == 0 {
            return Err(EngineError::Config("reconcile.poll_interval must be greater than 0".into()));
        }
        if self.presence.connect_timeout == 0 {
            return Err(EngineError::Config("presence.connect_timeout must be greater than 0".into()));
        }
        if self.session.token_path.is_empty() {
            return Err(EngineError::Config("session.token_path must be set".into()));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.presence.connect_timeout)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile.poll_interval)
    }

    /// WebSocket endpoint for the presence channel. Falls back to the REST
    /// base URL with the scheme swapped to ws(s) and `/socket` appended.
    pub fn presence_url(&self) -> String {
        if let Some(url) = &self.presence.url {
            return url.clone();
        }
        let base = self
            .api
            .base_url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        format!("{}/socket", base.trim_end_matches('/'))
    }
}

impl From<ConfigError> for EngineError {
    fn from(error: ConfigError) -> Self {
        EngineError::Config(error.to_string())
    }
}
