//! codejudge-judges: remote judge transports.
//!
//! Implements the `Judge` trait for a hosted agent service, for
//! OpenAI-compatible chat completions, and for a canned mock.

pub mod agents;
pub mod chat;
pub mod config;
pub mod error;
mod http;
pub mod mock;

pub use config::{create_judge, resolve_env_vars, JudgeConfig};
pub use error::JudgeError;
