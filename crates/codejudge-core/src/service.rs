//! Fans evaluations out over every (criterion, repository) pair of a challenge.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use crate::error::Result;
use crate::judge::JudgeClient;
use crate::model::{Criterion, EvaluationRecord, Repository};
use crate::orchestrator::EvaluationOrchestrator;
use crate::traits::{Judge, RecordStore, SnapshotSource};

/// Coordinates evaluations across repositories and criteria.
pub struct EvaluationService {
    store: Arc<dyn RecordStore>,
    source: Arc<dyn SnapshotSource>,
    judge: Arc<dyn Judge>,
}

impl EvaluationService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        source: Arc<dyn SnapshotSource>,
        judge: Arc<dyn Judge>,
    ) -> Self {
        Self {
            store,
            source,
            judge,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Evaluate every (criterion, repository) pair of a challenge.
    ///
    /// Criteria form the outer loop and repositories the inner one; pairs run
    /// one after another. `criteria_ids` restricts the criteria when it is
    /// non-empty. The first failing pair aborts the run.
    #[instrument(skip(self, criteria_ids), fields(challenge = %challenge_id))]
    pub async fn run_for_challenge(
        &self,
        challenge_id: &str,
        criteria_ids: Option<&[String]>,
    ) -> Result<()> {
        let start = Instant::now();
        let judge =
            JudgeClient::for_challenge(Arc::clone(&self.judge), self.store.as_ref(), challenge_id)
                .await?;

        let criteria = self.load_criteria(challenge_id, criteria_ids).await?;
        let repositories = self.store.list_repositories(challenge_id).await?;
        info!(
            criteria = criteria.len(),
            repositories = repositories.len(),
            "starting challenge evaluation"
        );

        for criterion in &criteria {
            for repository in &repositories {
                let record = self
                    .ensure_evaluation(challenge_id, repository, criterion)
                    .await?;
                let mut orchestrator = EvaluationOrchestrator::new(
                    Arc::clone(&self.store),
                    Arc::clone(&self.source),
                    judge.clone(),
                    record,
                    repository.clone(),
                    criterion.clone(),
                );
                orchestrator.run().await?;
            }
        }

        info!(
            pairs = criteria.len() * repositories.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "challenge evaluation finished"
        );
        Ok(())
    }

    /// Return the record for a pair, creating it in `NotEvaluated` if absent.
    pub async fn ensure_evaluation(
        &self,
        challenge_id: &str,
        repository: &Repository,
        criterion: &Criterion,
    ) -> Result<EvaluationRecord> {
        let fresh = EvaluationRecord::new(challenge_id, repository, criterion);
        if let Some(existing) = self
            .store
            .get_evaluation(&fresh.id, &repository.id)
            .await?
        {
            return Ok(existing);
        }
        self.store.create_or_update_evaluation(&fresh).await
    }

    async fn load_criteria(
        &self,
        challenge_id: &str,
        criteria_ids: Option<&[String]>,
    ) -> Result<Vec<Criterion>> {
        let mut criteria = self.store.list_criteria(challenge_id).await?;
        if let Some(ids) = criteria_ids.filter(|ids| !ids.is_empty()) {
            criteria.retain(|c| ids.contains(&c.id));
        }
        Ok(criteria)
    }
}
