//! Core trait definitions for the record store, snapshot sources and judges.
//!
//! `RecordStore` is implemented in [`crate::store`], `SnapshotSource` by the
//! `codejudge-fetch` crate and `Judge` by the `codejudge-judges` crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    Challenge, Criterion, EvaluationRecord, Repository, RepositorySnapshot, SnapshotFile,
};

// ---------------------------------------------------------------------------
// Record store
// ---------------------------------------------------------------------------

/// Durable keyed storage for challenges, criteria, repositories and
/// evaluation records.
///
/// Writes are last-write-wins: there is no version token and no locking.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or replace an evaluation record, returning what was stored.
    async fn create_or_update_evaluation(
        &self,
        record: &EvaluationRecord,
    ) -> Result<EvaluationRecord>;

    async fn get_evaluation(
        &self,
        id: &str,
        repository_id: &str,
    ) -> Result<Option<EvaluationRecord>>;

    async fn list_evaluations_for_challenge(
        &self,
        challenge_id: &str,
    ) -> Result<Vec<EvaluationRecord>>;

    async fn list_evaluations_for_repository(
        &self,
        repository_id: &str,
    ) -> Result<Vec<EvaluationRecord>>;

    /// Repositories of a challenge, in registration order.
    async fn list_repositories(&self, challenge_id: &str) -> Result<Vec<Repository>>;

    async fn get_repository(&self, id: &str, challenge_id: &str) -> Result<Option<Repository>>;

    /// Criteria of a challenge, in registration order.
    async fn list_criteria(&self, challenge_id: &str) -> Result<Vec<Criterion>>;

    async fn list_challenges(&self) -> Result<Vec<Challenge>>;

    async fn get_challenge(&self, id: &str) -> Result<Option<Challenge>>;

    /// Insert or replace a challenge.
    async fn save_challenge(&self, challenge: &Challenge) -> Result<Challenge>;
}

// ---------------------------------------------------------------------------
// Snapshot source
// ---------------------------------------------------------------------------

/// Turns a repository URL into a bounded snapshot of its files.
///
/// Implementations own any temporary files they create and must release them
/// on every exit path.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(&self, repository_url: &str) -> Result<RepositorySnapshot>;
}

// ---------------------------------------------------------------------------
// Judge
// ---------------------------------------------------------------------------

/// Transport to a remote scoring judge.
///
/// Implementations return the judge's raw answer; parsing and degradation
/// live in [`crate::judge::JudgeClient`]. Calls must not block the executor:
/// a transport built on a blocking SDK has to go through
/// `tokio::task::spawn_blocking`.
#[async_trait]
pub trait Judge: Send + Sync {
    /// Transport name (e.g. "agents").
    fn name(&self) -> &str;

    /// Create a judge identity for a challenge and return its identifier.
    async fn provision(&self, request: &ProvisionRequest) -> Result<String>;

    /// Send a payload to the judge identified by `identity` and return the
    /// raw text of its answer.
    async fn ask(&self, identity: &str, payload: &JudgePayload) -> Result<String>;
}

/// Request to create a judge identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionRequest {
    /// Name the identity is created under.
    pub name: String,
    /// Standing instructions for the judge.
    pub instructions: String,
}

impl ProvisionRequest {
    /// Identity request for a challenge, with the default instructions
    /// extended by the challenge brief.
    pub fn for_challenge(challenge: &Challenge) -> Self {
        let mut instructions = JUDGE_INSTRUCTIONS.to_string();
        if !challenge.description.is_empty() {
            instructions.push_str("\n\nChallenge: ");
            instructions.push_str(&challenge.description);
        }
        if !challenge.expected_outcome.is_empty() {
            instructions.push_str("\nExpected outcome: ");
            instructions.push_str(&challenge.expected_outcome);
        }
        Self {
            name: format!("codejudge-{}", challenge.id),
            instructions,
        }
    }
}

/// Payload sent to the judge for one (repository, criterion) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgePayload {
    pub criteria: CriterionPayload,
    pub repository: RepositoryPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionPayload {
    pub name: String,
    pub description: String,
    pub score_multiplier: f64,
    pub code_concept: String,
}

impl From<&Criterion> for CriterionPayload {
    fn from(criterion: &Criterion) -> Self {
        Self {
            name: criterion.name.clone(),
            description: criterion.description.clone(),
            score_multiplier: criterion.score_multiplier,
            code_concept: criterion.code_concept.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryPayload {
    pub name: String,
    pub url: String,
    pub files: Vec<SnapshotFile>,
}

// ---------------------------------------------------------------------------
// Default judge instructions
// ---------------------------------------------------------------------------

/// Standing instructions given to every judge identity.
pub const JUDGE_INSTRUCTIONS: &str = "You are a code reviewer scoring a repository against one criterion. The user message is a JSON object with `criteria` and `repository` (name, url and a sample of files). Respond ONLY with a JSON object of the form {\"score\": <number 0-100>, \"reasoning\": \"<why>\", \"suggestion\": \"<how to improve>\"}.";
