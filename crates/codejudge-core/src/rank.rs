//! Ranking, status and history queries over recorded evaluations.
//!
//! These only read the record store; they never take part in the write path.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::model::{EvaluationRecord, EvaluationState, Repository};
use crate::traits::RecordStore;

/// A repository's aggregated score and status across its evaluations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    pub repository_id: String,
    pub repository_name: String,
    pub repository_url: String,
    /// Mean of the non-null scores, `None` if there are none.
    pub total_score: Option<f64>,
    pub status: EvaluationState,
    /// Some evaluation lacks a score, or nothing was scored at all.
    pub unscored: bool,
}

/// Ranked entries for a challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankReport {
    pub challenge_id: String,
    pub entries: Vec<RankEntry>,
    pub generated_at: DateTime<Utc>,
}

/// Latest evaluation state of one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryStatus {
    pub repository_id: String,
    pub repository_name: String,
    pub challenge_id: String,
    pub state: EvaluationState,
    pub last_updated: DateTime<Utc>,
}

/// A repository with all of its evaluation records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryHistory {
    pub repository: Repository,
    pub evaluations: Vec<EvaluationRecord>,
}

/// Rank the repositories of a challenge.
pub async fn rank_challenge(store: &dyn RecordStore, challenge_id: &str) -> Result<RankReport> {
    let repositories = store.list_repositories(challenge_id).await?;
    if repositories.is_empty() {
        return Err(EvalError::NoRepositories(challenge_id.to_string()));
    }
    let evaluations = store.list_evaluations_for_challenge(challenge_id).await?;

    Ok(RankReport {
        challenge_id: challenge_id.to_string(),
        entries: rank_entries(&repositories, &evaluations),
        generated_at: Utc::now(),
    })
}

/// Aggregate and order rank entries.
///
/// Scored repositories come first, highest score first. Ties and unscored
/// repositories keep the order of `repositories`.
pub fn rank_entries(repositories: &[Repository], evaluations: &[EvaluationRecord]) -> Vec<RankEntry> {
    let grouped = group_by_repository(evaluations);

    let mut entries: Vec<RankEntry> = repositories
        .iter()
        .map(|repo| {
            let records = grouped.get(repo.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            let scores: Vec<f64> = records.iter().filter_map(|r| r.score).collect();
            let total_score = if scores.is_empty() {
                None
            } else {
                Some(scores.iter().sum::<f64>() / scores.len() as f64)
            };

            RankEntry {
                repository_id: repo.id.clone(),
                repository_name: repo.name.clone(),
                repository_url: repo.url.clone(),
                total_score,
                status: aggregate_state(records),
                unscored: scores.is_empty() || scores.len() < records.len(),
            }
        })
        .collect();

    // `sort_by` is stable, so equal scores keep listing order.
    entries.sort_by(|a, b| match (a.total_score, b.total_score) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    entries
}

/// Combined state of a repository's records.
///
/// Any record mid-cycle makes the repository `UnderEvaluation`; it is
/// `Evaluated` only when every record is; otherwise `NotEvaluated`.
pub fn aggregate_state(records: &[&EvaluationRecord]) -> EvaluationState {
    if records
        .iter()
        .any(|r| r.state == EvaluationState::UnderEvaluation)
    {
        EvaluationState::UnderEvaluation
    } else if !records.is_empty() && records.iter().all(|r| r.state == EvaluationState::Evaluated)
    {
        EvaluationState::Evaluated
    } else {
        EvaluationState::NotEvaluated
    }
}

/// Per-repository status of a challenge, sorted by repository name.
pub async fn status_for_challenge(
    store: &dyn RecordStore,
    challenge_id: &str,
) -> Result<Vec<RepositoryStatus>> {
    let repositories = store.list_repositories(challenge_id).await?;
    let evaluations = store.list_evaluations_for_challenge(challenge_id).await?;
    let grouped = group_by_repository(&evaluations);

    let mut statuses: Vec<RepositoryStatus> = repositories
        .iter()
        .map(|repo| {
            let latest = grouped
                .get(repo.id.as_str())
                .and_then(|records| records.iter().max_by_key(|r| r.updated_at));
            RepositoryStatus {
                repository_id: repo.id.clone(),
                repository_name: repo.name.clone(),
                challenge_id: challenge_id.to_string(),
                state: latest.map(|r| r.state).unwrap_or_default(),
                last_updated: latest.map(|r| r.updated_at).unwrap_or(repo.created_at),
            }
        })
        .collect();

    statuses.sort_by_key(|s| s.repository_name.to_lowercase());
    Ok(statuses)
}

/// A repository of a challenge together with all its evaluations.
pub async fn repository_history(
    store: &dyn RecordStore,
    challenge_id: &str,
    repository_id: &str,
) -> Result<RepositoryHistory> {
    let repository = store
        .get_repository(repository_id, challenge_id)
        .await?
        .ok_or_else(|| EvalError::not_found("repository", repository_id))?;
    let mut evaluations = store.list_evaluations_for_repository(repository_id).await?;
    evaluations.retain(|e| e.challenge_id == challenge_id);
    Ok(RepositoryHistory {
        repository,
        evaluations,
    })
}

fn group_by_repository(evaluations: &[EvaluationRecord]) -> HashMap<&str, Vec<&EvaluationRecord>> {
    let mut grouped: HashMap<&str, Vec<&EvaluationRecord>> = HashMap::new();
    for evaluation in evaluations {
        grouped
            .entry(evaluation.repository_id.as_str())
            .or_default()
            .push(evaluation);
    }
    grouped
}
