//! Core data model types for codejudge.
//!
//! Challenges, criteria and repositories are owned by whatever CRUD layer
//! fronts the record store; the engine only reads them. Evaluation records are
//! the one type the engine writes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named assessment campaign with criteria and registered repositories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    /// Unique identifier.
    #[serde(default)]
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// What participants are asked to build.
    #[serde(default)]
    pub description: String,
    /// What a successful submission looks like.
    #[serde(default)]
    pub expected_outcome: String,
    /// Inactive challenges are skipped by the scheduler.
    #[serde(default = "default_true")]
    pub active: bool,
    /// Judge identity provisioned for this challenge, if any.
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

/// One scored dimension a repository is judged against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criterion {
    pub id: String,
    pub challenge_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Informational weight (> 0). Never rescales the stored score.
    #[serde(default = "default_multiplier")]
    pub score_multiplier: f64,
    /// The code concept being validated.
    #[serde(default)]
    pub code_concept: String,
}

fn default_multiplier() -> f64 {
    1.0
}

/// A repository registered to a challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub challenge_id: String,
    /// Display name.
    pub name: String,
    /// Source URL; its path must start with `/{owner}/{name}`.
    pub url: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state of an evaluation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationState {
    #[default]
    NotEvaluated,
    UnderEvaluation,
    Evaluated,
}

impl fmt::Display for EvaluationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationState::NotEvaluated => write!(f, "not_evaluated"),
            EvaluationState::UnderEvaluation => write!(f, "under_evaluation"),
            EvaluationState::Evaluated => write!(f, "evaluated"),
        }
    }
}

impl FromStr for EvaluationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "not_evaluated" => Ok(EvaluationState::NotEvaluated),
            "under_evaluation" => Ok(EvaluationState::UnderEvaluation),
            "evaluated" => Ok(EvaluationState::Evaluated),
            other => Err(format!("unknown evaluation state: {other}")),
        }
    }
}

/// The persisted lifecycle and result for one (repository, criterion) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// `"{repository_id}:{criterion_id}"`.
    pub id: String,
    pub challenge_id: String,
    pub repository_id: String,
    pub criterion_id: String,
    /// Criterion name at creation time. Not kept in sync with later edits.
    #[serde(default)]
    pub criterion_name: String,
    #[serde(default)]
    pub state: EvaluationState,
    /// 0 to 100, or `None` when the judge produced no usable score.
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub suggestion: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EvaluationRecord {
    /// A fresh `NotEvaluated` record for the given pair.
    pub fn new(challenge_id: &str, repository: &Repository, criterion: &Criterion) -> Self {
        let now = Utc::now();
        Self {
            id: record_id(&repository.id, &criterion.id),
            challenge_id: challenge_id.to_string(),
            repository_id: repository.id.clone(),
            criterion_id: criterion.id.clone(),
            criterion_name: criterion.name.clone(),
            state: EvaluationState::NotEvaluated,
            score: None,
            reasoning: None,
            suggestion: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Deterministic evaluation record key for a (repository, criterion) pair.
pub fn record_id(repository_id: &str, criterion_id: &str) -> String {
    format!("{repository_id}:{criterion_id}")
}

/// One file of a repository snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFile {
    /// Path relative to the extraction root, `/`-separated.
    pub path: String,
    /// Leading characters of the file, lossily decoded.
    pub snippet: String,
}

/// Bounded textual sample of a repository, in deterministic walk order.
pub type RepositorySnapshot = Vec<SnapshotFile>;

/// Parsed output of one judge invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JudgeResult {
    pub score: Option<f64>,
    pub reasoning: Option<String>,
    pub suggestion: Option<String>,
}
