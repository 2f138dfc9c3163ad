//! Error types for webtty.

use std::io;

/// Errors produced by the webtty framework.
#[derive(Debug, thiserror::Error)]
pub enum WebttyError {
    #[error("registry error: {0}")]
    Registry(String),

    #[error("command error: {0}")]
    Command(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, WebttyError>;
