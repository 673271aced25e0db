use thiserror::Error;

/// Cause of an `Error`-classified envelope.
///
/// Envelopes are broadcast to every subscriber, so the cause must be `Clone`;
/// operation failures are carried as their rendered message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("{0}")]
    Operation(String),
    #[error("request was cancelled")]
    Cancelled,
    #[error("deadline has elapsed")]
    Timeout,
}

impl RequestError {
    pub fn operation(message: impl Into<String>) -> Self {
        RequestError::Operation(message.into())
    }

    pub fn is_operation(&self) -> bool {
        matches!(self, RequestError::Operation(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RequestError::Cancelled)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RequestError::Timeout)
    }
}
