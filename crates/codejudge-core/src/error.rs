//! Error taxonomy for the evaluation engine.
//!
//! Defined in `codejudge-core` so transport crates can convert their own
//! errors into a variant the orchestrator, the retry policy and the scheduler
//! can classify without string matching.

use thiserror::Error;

use crate::model::EvaluationState;

/// Errors produced while evaluating repositories.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Required configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A repository URL does not resolve to an owner/name pair.
    #[error("invalid repository reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    /// A challenge, repository or evaluation record does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// Ranking was requested for a challenge without repositories.
    #[error("no repositories registered for challenge '{0}'")]
    NoRepositories(String),

    /// The archive download failed.
    #[error("archive fetch failed for {url}: {message}")]
    FetchFailed {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// The downloaded archive could not be unpacked or read.
    #[error("archive extraction failed: {0}")]
    Extract(String),

    /// The judge service could not be reached or did not answer.
    #[error("judge unavailable: {0}")]
    JudgeUnavailable(String),

    /// The record store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The lifecycle state machine received an event it cannot handle.
    #[error("invalid lifecycle transition from {state} on {event}")]
    InvalidTransition {
        state: EvaluationState,
        event: &'static str,
    },
}

impl EvalError {
    /// Shorthand for a [`EvalError::NotFound`].
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        EvalError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Returns `true` if the storage boundary should retry this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EvalError::Storage(_))
    }

    /// Returns `true` for network-side failures that leave a record in
    /// `UnderEvaluation` until the next trigger.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            EvalError::FetchFailed { .. } | EvalError::JudgeUnavailable(_)
        )
    }
}

impl From<std::io::Error> for EvalError {
    fn from(err: std::io::Error) -> Self {
        EvalError::Extract(err.to_string())
    }
}

/// Result alias used across the engine.
pub type Result<T> = std::result::Result<T, EvalError>;
