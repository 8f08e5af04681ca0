use thiserror::Error;
use serde_json::Error as JsonError;
use std::io::Error as IoError;

use crate::security::ValidationError;

#[derive(Error, Debug)]
pub enum SecurityError {
    #[error("Entropy unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid length: {0} (must be greater than zero)")]
    InvalidLength(usize),

    #[error("Alphabet must contain at least one character")]
    InvalidAlphabet,

    #[error("Session unavailable: {0}")]
    SessionUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid redirect: {0}")]
    InvalidRedirect(String),

    #[error("IO error: {0}")]
    Io(#[from] IoError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] JsonError),

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl From<ValidationError> for SecurityError {
    fn from(err: ValidationError) -> Self {
        SecurityError::InvalidConfig(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SecurityError>;
