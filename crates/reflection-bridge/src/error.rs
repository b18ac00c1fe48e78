//! Bridge error types.

use thiserror::Error;

/// Failure surface shared by every bridge operation.
///
/// Callers treat all variants as "operation failed"; the variant only decides
/// how the reason is worded for the operator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// No response at all (connect refused, timeout, body read aborted).
    #[error("No response from server: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The bridge answered `success: false`. The message is shown verbatim.
    #[error("{0}")]
    Rejected(String),

    /// The envelope or its embedded payload is not well-formed.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl BridgeError {
    /// Get an error code for this error type.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TRANSPORT",
            Self::Status { .. } => "HTTP_STATUS",
            Self::Rejected(_) => "REJECTED",
            Self::InvalidResponse(_) => "INVALID_RESPONSE",
        }
    }

    /// True when the bridge was reached and explicitly refused the request.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
