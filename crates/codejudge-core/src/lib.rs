//! codejudge-core: evaluation lifecycle, orchestration, scheduling and ranking.
//!
//! This crate defines the data model, the error taxonomy and the traits the
//! rest of codejudge plugs into, plus the engine that drives repositories
//! through fetch, snapshot and judgment for every criterion of a challenge.

pub mod error;
pub mod judge;
pub mod lifecycle;
pub mod model;
pub mod orchestrator;
pub mod rank;
pub mod retry;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod traits;
pub mod trigger;

pub use error::{EvalError, Result};
