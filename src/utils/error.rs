// src/utils/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Credential rejected by server")]
    Unauthorized,

    #[error("API error: {0}")]
    Api(String),

    #[error("Presence channel error: {0}")]
    Presence(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
