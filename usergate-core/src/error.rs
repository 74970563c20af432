//! Error types for usergate

use crate::auth::Rejection;
use crate::types::UserId;
use thiserror::Error;

/// Main error type for usergate operations
#[derive(Error, Debug)]
pub enum UsergateError {
    /// Request failed the bearer token check
    #[error("Unauthorized: {0}")]
    Unauthorized(Rejection),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Malformed path template
    #[error("Invalid path template: {0}")]
    InvalidTemplate(String),

    /// Same method and template bound to two different operations
    #[error("Route conflict: {method} {template} is already bound to {existing}")]
    RouteConflict {
        /// HTTP method of the conflicting binding
        method: String,
        /// Path template of the conflicting binding
        template: String,
        /// Operation already registered for the pair
        existing: String,
    },

    /// No user with the given id
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// User input failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Result type alias for usergate operations
pub type Result<T> = std::result::Result<T, UsergateError>;

impl From<Rejection> for UsergateError {
    fn from(rejection: Rejection) -> Self {
        UsergateError::Unauthorized(rejection)
    }
}
