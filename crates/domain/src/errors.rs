//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Clinix
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ClinixError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Integration error: {0}")]
    Integration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Clinix operations
pub type Result<T> = std::result::Result<T, ClinixError>;

impl From<serde_json::Error> for ClinixError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(format!("JSON error: {err}"))
    }
}

impl From<clinix_common::ConfigError> for ClinixError {
    fn from(err: clinix_common::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
