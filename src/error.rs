// src/error.rs

//! Unified error handling for the watcher.

use std::fmt;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
///
/// Only [`AppError::Transport`] is recovered inside a crawl batch. Every other
/// variant aborts the batch and surfaces at the run boundary.
#[derive(Error, Debug)]
pub enum AppError {
    /// Network failure, timeout or non-success HTTP status
    #[error("Transport error for {context}: {message}")]
    Transport { context: String, message: String },

    /// Catalog responded with something we cannot interpret
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Feed document could not be produced
    #[error("Feed error: {0}")]
    Feed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a transport error with context.
    pub fn transport(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Transport {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a catalog error.
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog(message.into())
    }

    /// Create a feed rendering error.
    pub fn feed(message: impl fmt::Display) -> Self {
        Self::Feed(message.to_string())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the crawler may back off and move on to the next item.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
