//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use codejudge_core::error::{EvalError, Result};
use codejudge_core::model::{
    Challenge, Criterion, EvaluationRecord, EvaluationState, Repository, RepositorySnapshot,
    SnapshotFile,
};
use codejudge_core::service::EvaluationService;
use codejudge_core::store::MemoryStore;
use codejudge_core::traits::{Judge, JudgePayload, ProvisionRequest, RecordStore, SnapshotSource};

pub fn challenge(id: &str) -> Challenge {
    Challenge {
        id: id.into(),
        name: format!("Challenge {id}"),
        description: "Build something".into(),
        expected_outcome: "It works".into(),
        active: true,
        agent_id: None,
        created_at: Utc::now(),
        updated_at: None,
    }
}

pub fn criterion(challenge_id: &str, id: &str) -> Criterion {
    Criterion {
        id: id.into(),
        challenge_id: challenge_id.into(),
        name: format!("criterion {id}"),
        description: format!("checks {id}"),
        score_multiplier: 1.0,
        code_concept: id.into(),
    }
}

pub fn repository(challenge_id: &str, id: &str) -> Repository {
    Repository {
        id: id.into(),
        challenge_id: challenge_id.into(),
        name: id.into(),
        url: format!("https://github.com/acme/{id}"),
        created_at: Utc::now(),
    }
}

/// Seed a challenge with the given criteria and repositories.
pub fn seed(store: &MemoryStore, challenge_id: &str, criteria: &[&str], repos: &[&str]) {
    store.add_challenge(challenge(challenge_id)).unwrap();
    for id in criteria {
        store.add_criterion(criterion(challenge_id, id)).unwrap();
    }
    for id in repos {
        store.add_repository(repository(challenge_id, id)).unwrap();
    }
}

// ---------------------------------------------------------------------------
// Recording store
// ---------------------------------------------------------------------------

/// A memory store that remembers the state of every evaluation write.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    writes: Mutex<Vec<(String, EvaluationState)>>,
}

impl RecordingStore {
    /// States written for `id`, with consecutive duplicates collapsed.
    pub fn state_history(&self, id: &str) -> Vec<EvaluationState> {
        let mut states: Vec<EvaluationState> = self
            .writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(record, _)| record == id)
            .map(|(_, state)| *state)
            .collect();
        states.dedup();
        states
    }

    pub fn write_count(&self, id: &str) -> usize {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(record, _)| record == id)
            .count()
    }
}

#[async_trait]
impl RecordStore for RecordingStore {
    async fn create_or_update_evaluation(&self, r: &EvaluationRecord) -> Result<EvaluationRecord> {
        self.writes.lock().unwrap().push((r.id.clone(), r.state));
        self.inner.create_or_update_evaluation(r).await
    }
    async fn get_evaluation(&self, id: &str, repo: &str) -> Result<Option<EvaluationRecord>> {
        self.inner.get_evaluation(id, repo).await
    }
    async fn list_evaluations_for_challenge(&self, c: &str) -> Result<Vec<EvaluationRecord>> {
        self.inner.list_evaluations_for_challenge(c).await
    }
    async fn list_evaluations_for_repository(&self, r: &str) -> Result<Vec<EvaluationRecord>> {
        self.inner.list_evaluations_for_repository(r).await
    }
    async fn list_repositories(&self, c: &str) -> Result<Vec<Repository>> {
        self.inner.list_repositories(c).await
    }
    async fn get_repository(&self, id: &str, c: &str) -> Result<Option<Repository>> {
        self.inner.get_repository(id, c).await
    }
    async fn list_criteria(&self, c: &str) -> Result<Vec<Criterion>> {
        self.inner.list_criteria(c).await
    }
    async fn list_challenges(&self) -> Result<Vec<Challenge>> {
        self.inner.list_challenges().await
    }
    async fn get_challenge(&self, id: &str) -> Result<Option<Challenge>> {
        self.inner.get_challenge(id).await
    }
    async fn save_challenge(&self, c: &Challenge) -> Result<Challenge> {
        self.inner.save_challenge(c).await
    }
}

// ---------------------------------------------------------------------------
// Snapshot source
// ---------------------------------------------------------------------------

/// Returns a one-file snapshot per URL, or a fetch failure for URLs marked
/// as broken.
#[derive(Default)]
pub struct FakeSource {
    broken: Mutex<Vec<String>>,
    calls: AtomicU32,
}

impl FakeSource {
    pub fn break_url(&self, url: &str) {
        self.broken.lock().unwrap().push(url.to_string());
    }

    pub fn fix_all(&self) {
        self.broken.lock().unwrap().clear();
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for FakeSource {
    async fn snapshot(&self, repository_url: &str) -> Result<RepositorySnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.broken.lock().unwrap().iter().any(|u| u == repository_url) {
            return Err(EvalError::FetchFailed {
                url: repository_url.to_string(),
                status: Some(404),
                message: "HTTP 404".into(),
            });
        }
        Ok(vec![SnapshotFile {
            path: "src/lib.rs".into(),
            snippet: format!("// {repository_url}"),
        }])
    }
}

// ---------------------------------------------------------------------------
// Judge
// ---------------------------------------------------------------------------

/// Answers with a scripted reply per repository name, records the order of
/// calls and counts provisioning.
pub struct ScriptedJudge {
    answers: Mutex<HashMap<String, String>>,
    default_answer: String,
    unavailable: Mutex<bool>,
    provisioned: AtomicU32,
    calls: Mutex<Vec<(String, String, String)>>,
}

impl ScriptedJudge {
    pub fn new(default_answer: &str) -> Self {
        Self {
            answers: Mutex::new(HashMap::new()),
            default_answer: default_answer.to_string(),
            unavailable: Mutex::new(false),
            provisioned: AtomicU32::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn answer_for(&self, repository: &str, answer: &str) {
        self.answers
            .lock()
            .unwrap()
            .insert(repository.to_string(), answer.to_string());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    pub fn provisioned(&self) -> u32 {
        self.provisioned.load(Ordering::SeqCst)
    }

    /// `(identity, criterion name, repository name)` per call, in order.
    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Judge for ScriptedJudge {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn provision(&self, request: &ProvisionRequest) -> Result<String> {
        let n = self.provisioned.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("{}#{n}", request.name))
    }

    async fn ask(&self, identity: &str, payload: &JudgePayload) -> Result<String> {
        if *self.unavailable.lock().unwrap() {
            return Err(EvalError::JudgeUnavailable("connection refused".into()));
        }
        self.calls.lock().unwrap().push((
            identity.to_string(),
            payload.criteria.name.clone(),
            payload.repository.name.clone(),
        ));
        Ok(self
            .answers
            .lock()
            .unwrap()
            .get(&payload.repository.name)
            .cloned()
            .unwrap_or_else(|| self.default_answer.clone()))
    }
}

pub struct Harness {
    pub store: Arc<RecordingStore>,
    pub source: Arc<FakeSource>,
    pub judge: Arc<ScriptedJudge>,
    pub service: Arc<EvaluationService>,
}

pub fn harness(default_answer: &str) -> Harness {
    let store = Arc::new(RecordingStore::default());
    let source = Arc::new(FakeSource::default());
    let judge = Arc::new(ScriptedJudge::new(default_answer));
    let service = Arc::new(EvaluationService::new(
        store.clone(),
        source.clone(),
        judge.clone(),
    ));
    Harness {
        store,
        source,
        judge,
        service,
    }
}
