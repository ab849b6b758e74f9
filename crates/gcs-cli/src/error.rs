//! Error types for the gcs CLI

use color_eyre::eyre::Report;
use thiserror::Error;

/// CLI error type
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file issues
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// API communication errors
    #[error("API error: {0}")]
    Api(#[from] crate::api::ApiError),

    /// Authentication/authorization issues
    #[error(transparent)]
    Auth(#[from] crate::auth::AuthError),

    /// Environment never became usable
    #[error(transparent)]
    Readiness(#[from] crate::readiness::ReadinessError),

    /// SSH session issues
    #[error(transparent)]
    Ssh(#[from] crate::ssh::SshError),

    /// Rejected user input
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Everything else
    #[error(transparent)]
    Internal(#[from] Report),
}

impl CliError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn internal(message: impl std::fmt::Display) -> Self {
        Self::Internal(color_eyre::eyre::eyre!("{}", message))
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
