use std::path::PathBuf;
use thiserror::Error;

use crate::providers::ProviderError;

/// Errors that can occur in the Simulacrum application
#[derive(Error, Debug)]
pub enum SimError {
    /// Error raised by an LLM provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The model reply could not be turned into an agent action
    #[error("Invalid agent action: {0}")]
    InvalidAction(String),

    /// No agent matches the given id or name
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// A turn ticket does not match the agent currently acting
    #[error("Turn ticket for {0} does not match the turn in progress")]
    StaleTurn(String),

    /// User supplied input was rejected
    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Error when reading or writing a file
    #[error("File access error for {path}: {message}")]
    FileAccessError { path: PathBuf, message: String },

    /// Error when serializing data
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Error related to IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    pub fn invalid_input(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn file_access(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::FileAccessError {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Type alias for Result with `SimError`
pub type Result<T> = std::result::Result<T, SimError>;
