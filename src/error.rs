use thiserror::Error;

/// Coarse classification used to pick log levels and public messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    Backend,
    Configuration,
    Internal,
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User profile not found: {0}")]
    ProfileNotFound(String),

    #[error("No company assigned to user: {0}")]
    NoCompanyAssigned(String),

    #[error("Language model backend error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Record store error: {0}")]
    Store(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::ProfileNotFound(_) | Self::NoCompanyAssigned(_) => ErrorKind::Authorization,
            Self::Backend(_) | Self::Transport(_) => ErrorKind::Backend,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Store(_) | Self::SerializationError(_) | Self::IoError(_) => ErrorKind::Internal,
        }
    }

    /// Text that may be returned to callers in the `error` field of a failure
    /// envelope. Backend and internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(details) => details.clone(),
            Self::ProfileNotFound(_) => "User profile not found".to_string(),
            Self::NoCompanyAssigned(_) => "No company assigned to user".to_string(),
            Self::Configuration(_) => "Service is not configured".to_string(),
            Self::Store(_) => "Failed to fetch balance sheet data".to_string(),
            _ if self.kind() == ErrorKind::Backend => "Failed to get AI analysis".to_string(),
            _ => "Internal error".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
