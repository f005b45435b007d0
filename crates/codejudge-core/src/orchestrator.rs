//! Drives one (repository, criterion) evaluation through its lifecycle.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{EvalError, Result};
use crate::judge::JudgeClient;
use crate::lifecycle::{transition, Effect, LifecycleEvent};
use crate::model::{Criterion, EvaluationRecord, EvaluationState, JudgeResult, Repository};
use crate::traits::{CriterionPayload, JudgePayload, RecordStore, RepositoryPayload, SnapshotSource};

/// Runs the fetch -> snapshot -> judge pipeline for one evaluation record and
/// persists every lifecycle step.
///
/// Every run starts in `NotEvaluated` regardless of what the record says, so
/// re-running an evaluated pair goes back through `UnderEvaluation`. If the
/// pipeline fails the record stays in `UnderEvaluation` until the next run.
pub struct EvaluationOrchestrator {
    store: Arc<dyn RecordStore>,
    source: Arc<dyn SnapshotSource>,
    judge: JudgeClient,
    record: EvaluationRecord,
    repository: Repository,
    criterion: Criterion,
    state: EvaluationState,
}

impl EvaluationOrchestrator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        source: Arc<dyn SnapshotSource>,
        judge: JudgeClient,
        record: EvaluationRecord,
        repository: Repository,
        criterion: Criterion,
    ) -> Self {
        Self {
            store,
            source,
            judge,
            record,
            repository,
            criterion,
            state: EvaluationState::NotEvaluated,
        }
    }

    /// Run to completion, returning the judge's result.
    pub async fn run(&mut self) -> Result<JudgeResult> {
        let start = Instant::now();
        let mut judged = JudgeResult::default();

        loop {
            let event = match self.state {
                EvaluationState::NotEvaluated => LifecycleEvent::Start,
                EvaluationState::UnderEvaluation => {
                    judged = self.evaluate_repository().await?;
                    LifecycleEvent::Judged(judged.clone())
                }
                EvaluationState::Evaluated => LifecycleEvent::Confirm,
            };

            let step = transition(self.state, event)?;
            for effect in step.effects {
                self.apply(effect).await?;
            }
            debug!(record = %self.record.id, from = %self.state, to = %step.next, "transition");
            self.state = step.next;

            if step.done {
                break;
            }
        }

        info!(
            record = %self.record.id,
            repository = %self.repository.name,
            criterion = %self.criterion.name,
            score = ?judged.score,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "evaluation complete"
        );
        Ok(judged)
    }

    async fn evaluate_repository(&self) -> Result<JudgeResult> {
        let files = self.source.snapshot(&self.repository.url).await?;
        debug!(record = %self.record.id, files = files.len(), "snapshot ready");

        let payload = JudgePayload {
            criteria: CriterionPayload::from(&self.criterion),
            repository: RepositoryPayload {
                name: self.repository.name.clone(),
                url: self.repository.url.clone(),
                files,
            },
        };
        self.judge.evaluate(&payload).await
    }

    /// Read the latest copy of the record, patch it and write it back.
    async fn apply(&mut self, effect: Effect) -> Result<()> {
        let mut current = self
            .store
            .get_evaluation(&self.record.id, &self.record.repository_id)
            .await?
            .ok_or_else(|| EvalError::not_found("evaluation", self.record.id.clone()))?;

        match effect {
            Effect::PersistState(state) => current.state = state,
            Effect::PersistResult(result) => {
                current.score = result.score;
                current.reasoning = result.reasoning;
                current.suggestion = result.suggestion;
            }
        }
        current.updated_at = Utc::now();

        self.record = self.store.create_or_update_evaluation(&current).await?;
        Ok(())
    }
}
