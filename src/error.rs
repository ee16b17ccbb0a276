//! Error types for background removal operations

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for background removal operations
pub type Result<T> = std::result::Result<T, PureBgError>;

/// Failure taxonomy surfaced by the pipeline
///
/// Every variant carries a human-readable message. The stable identifier of a
/// failure is its [`ErrorKind`], available through [`PureBgError::kind`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PureBgError {
    /// Missing or placeholder credential; fatal until reconfigured
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unreadable or unsupported source file
    #[error("Decode error: {0}")]
    Decode(String),

    /// Credential rejected by the remote service
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Quota or throughput exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Requested model is not accessible to this credential
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// The remote service answered without a usable image
    #[error("Empty response: {0}")]
    EmptyResponse(String),

    /// Anything else, carrying the underlying message
    #[error("{0}")]
    Unknown(String),
}

/// Stable identifier for a [`PureBgError`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Decode,
    Auth,
    RateLimit,
    ModelUnavailable,
    EmptyResponse,
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Config => "config",
            Self::Decode => "decode",
            Self::Auth => "auth",
            Self::RateLimit => "rate_limit",
            Self::ModelUnavailable => "model_unavailable",
            Self::EmptyResponse => "empty_response",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

impl ErrorKind {
    #[must_use]
    pub fn suggested_action(self) -> &'static str {
        match self {
            Self::Config => "Set the API_KEY environment variable and retry",
            Self::Decode => "Choose another image file",
            Self::Auth => "Verify the API key and its permissions",
            Self::RateLimit => "Wait a moment and retry",
            Self::ModelUnavailable => "Verify your plan has access to the image model",
            Self::EmptyResponse => "Retry, or try a simpler image",
            Self::Unknown => "Retry",
        }
    }
}

impl PureBgError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new authentication error
    pub fn auth<S: Into<String>>(msg: S) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a new rate limit error
    pub fn rate_limit<S: Into<String>>(msg: S) -> Self {
        Self::RateLimit(msg.into())
    }

    /// Create a new model unavailable error
    pub fn model_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Create a new empty response error
    pub fn empty_response<S: Into<String>>(msg: S) -> Self {
        Self::EmptyResponse(msg.into())
    }

    /// Create a new unclassified error
    pub fn unknown<S: Into<String>>(msg: S) -> Self {
        Self::Unknown(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        Self::Decode(format!(
            "Failed to {} '{}': {}",
            operation,
            path.as_ref().display(),
            error
        ))
    }

    /// Stable kind of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Auth(_) => ErrorKind::Auth,
            Self::RateLimit(_) => ErrorKind::RateLimit,
            Self::ModelUnavailable(_) => ErrorKind::ModelUnavailable,
            Self::EmptyResponse(_) => ErrorKind::EmptyResponse,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// The message without the kind prefix
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Config(msg)
            | Self::Decode(msg)
            | Self::Auth(msg)
            | Self::RateLimit(msg)
            | Self::ModelUnavailable(msg)
            | Self::EmptyResponse(msg)
            | Self::Unknown(msg) => msg,
        }
    }

    /// Whether a fresh attempt can succeed without operator action
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }

    /// What the user should do about this failure
    #[must_use]
    pub fn suggested_action(&self) -> &'static str {
        self.kind().suggested_action()
    }
}

/// A failure as held by the pipeline: stable kind plus message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&PureBgError> for ErrorReport {
    fn from(error: &PureBgError) -> Self {
        Self {
            kind: error.kind(),
            message: error.message().to_string(),
        }
    }
}

impl From<PureBgError> for ErrorReport {
    fn from(error: PureBgError) -> Self {
        Self::from(&error)
    }
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}
