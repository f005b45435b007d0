//! Judge transport error types.

use thiserror::Error;

use codejudge_core::error::EvalError;

/// Errors that can occur while talking to a judge service.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// The judge is missing an endpoint, model or credentials.
    #[error("judge configuration error: {0}")]
    Config(String),

    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// A judge run ended in a non-successful status.
    #[error("judge run {run_id} ended with status '{status}'")]
    RunFailed { run_id: String, status: String },

    /// The judge finished without producing any assistant text.
    #[error("judge returned no assistant text")]
    NoAnswer,

    /// A response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Protocol(String),

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl From<JudgeError> for EvalError {
    fn from(e: JudgeError) -> Self {
        match e {
            JudgeError::Config(message) => EvalError::Config(message),
            other => EvalError::JudgeUnavailable(other.to_string()),
        }
    }
}
