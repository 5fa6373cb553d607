use thiserror::Error;

/// Main error type for retrosock.
///
/// The protocol has a single fault category: a human-readable message plus
/// an optional underlying cause. Faults are fanned out to every registered
/// namespace handler before the connection shuts down.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct RetroSockError {
    message: String,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl RetroSockError {
    /// Create an error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// Create an error carrying a message and the underlying cause.
    pub fn with_cause(
        message: impl Into<String>,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type for retrosock operations.
pub type Result<T> = std::result::Result<T, RetroSockError>;
