use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone)]
pub enum AppError {
    ChainError(String),
    ConfigError(String),
    ValidationError(String),
    NotFound(String),
    AlreadyExists(String),
    AlertError(String),
    InvalidStateTransition(String),
    ScoringError(String),
    ExternalServiceError(String),
    UnsupportedChain(u64),
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ChainError(msg) => write!(f, "Chain error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::AlreadyExists(msg) => write!(f, "Already exists: {}", msg),
            AppError::AlertError(msg) => write!(f, "Alert error: {}", msg),
            AppError::InvalidStateTransition(msg) => write!(f, "Invalid state transition: {}", msg),
            AppError::ScoringError(msg) => write!(f, "Scoring error: {}", msg),
            AppError::ExternalServiceError(msg) => write!(f, "External service error: {}", msg),
            AppError::UnsupportedChain(chain_id) => write!(f, "Unsupported chain ID: {}", chain_id),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalServiceError(format!("HTTP request error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalError(format!("JSON serialization error: {}", err))
    }
}

impl From<ScoringError> for AppError {
    fn from(err: ScoringError) -> Self {
        AppError::ScoringError(err.to_string())
    }
}

/// Failures inside a single scoring run. These never escape an assessment:
/// the scorer logs them and drops the affected contribution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("Features unavailable for {target}: {message}")]
    FeatureUnavailable { target: String, message: String },

    #[error("Risk model not registered: {model}")]
    ModelNotFound { model: String },

    #[error("Prediction failed for model {model}: {message}")]
    PredictionFailed { model: String, message: String },

    #[error("Vulnerability scan failed for {target}: {message}")]
    ScannerFailed { target: String, message: String },
}
