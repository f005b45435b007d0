//! Record store implementations.
//!
//! [`MemoryStore`] backs tests and embedding, [`JsonFileStore`] persists the
//! same data as one JSON document so the binary can run without a database,
//! and [`RetryingStore`] wraps any store with a [`RetryPolicy`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EvalError, Result};
use crate::model::{Challenge, Criterion, EvaluationRecord, Repository};
use crate::retry::RetryPolicy;
use crate::traits::RecordStore;

/// Everything a store holds, in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub challenges: Vec<Challenge>,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
    #[serde(default)]
    pub repositories: Vec<Repository>,
    #[serde(default)]
    pub evaluations: Vec<EvaluationRecord>,
}

impl StoreData {
    pub fn upsert_challenge(&mut self, challenge: Challenge) {
        let id = challenge.id.clone();
        upsert(&mut self.challenges, challenge, |c| c.id == id);
    }

    /// Criteria are keyed by (challenge, id).
    pub fn upsert_criterion(&mut self, criterion: Criterion) {
        let (challenge_id, id) = (criterion.challenge_id.clone(), criterion.id.clone());
        upsert(&mut self.criteria, criterion, |c| {
            c.challenge_id == challenge_id && c.id == id
        });
    }

    /// Repositories are keyed by (challenge, id).
    pub fn upsert_repository(&mut self, repository: Repository) {
        let (challenge_id, id) = (repository.challenge_id.clone(), repository.id.clone());
        upsert(&mut self.repositories, repository, |r| {
            r.challenge_id == challenge_id && r.id == id
        });
    }

    /// Evaluations are keyed by (repository, id).
    pub fn upsert_evaluation(&mut self, record: EvaluationRecord) {
        let (repository_id, id) = (record.repository_id.clone(), record.id.clone());
        upsert(&mut self.evaluations, record, |e| {
            e.repository_id == repository_id && e.id == id
        });
    }
}

fn upsert<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T) -> bool) {
    match items.iter_mut().find(|existing| same(existing)) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// A [`RecordStore`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: StoreData) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// A copy of the current contents.
    pub fn snapshot(&self) -> Result<StoreData> {
        Ok(self.read()?.clone())
    }

    pub fn add_challenge(&self, challenge: Challenge) -> Result<()> {
        self.write()?.upsert_challenge(challenge);
        Ok(())
    }

    pub fn add_criterion(&self, criterion: Criterion) -> Result<()> {
        self.write()?.upsert_criterion(criterion);
        Ok(())
    }

    pub fn add_repository(&self, repository: Repository) -> Result<()> {
        self.write()?.upsert_repository(repository);
        Ok(())
    }

    fn replace(&self, data: StoreData) -> Result<()> {
        *self.write()? = data;
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreData>> {
        self.data
            .read()
            .map_err(|_| EvalError::Storage("store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreData>> {
        self.data
            .write()
            .map_err(|_| EvalError::Storage("store lock poisoned".into()))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_or_update_evaluation(
        &self,
        record: &EvaluationRecord,
    ) -> Result<EvaluationRecord> {
        self.write()?.upsert_evaluation(record.clone());
        Ok(record.clone())
    }

    async fn get_evaluation(
        &self,
        id: &str,
        repository_id: &str,
    ) -> Result<Option<EvaluationRecord>> {
        Ok(self
            .read()?
            .evaluations
            .iter()
            .find(|e| e.id == id && e.repository_id == repository_id)
            .cloned())
    }

    async fn list_evaluations_for_challenge(
        &self,
        challenge_id: &str,
    ) -> Result<Vec<EvaluationRecord>> {
        Ok(self
            .read()?
            .evaluations
            .iter()
            .filter(|e| e.challenge_id == challenge_id)
            .cloned()
            .collect())
    }

    async fn list_evaluations_for_repository(
        &self,
        repository_id: &str,
    ) -> Result<Vec<EvaluationRecord>> {
        Ok(self
            .read()?
            .evaluations
            .iter()
            .filter(|e| e.repository_id == repository_id)
            .cloned()
            .collect())
    }

    async fn list_repositories(&self, challenge_id: &str) -> Result<Vec<Repository>> {
        Ok(self
            .read()?
            .repositories
            .iter()
            .filter(|r| r.challenge_id == challenge_id)
            .cloned()
            .collect())
    }

    async fn get_repository(&self, id: &str, challenge_id: &str) -> Result<Option<Repository>> {
        Ok(self
            .read()?
            .repositories
            .iter()
            .find(|r| r.id == id && r.challenge_id == challenge_id)
            .cloned())
    }

    async fn list_criteria(&self, challenge_id: &str) -> Result<Vec<Criterion>> {
        Ok(self
            .read()?
            .criteria
            .iter()
            .filter(|c| c.challenge_id == challenge_id)
            .cloned()
            .collect())
    }

    async fn list_challenges(&self) -> Result<Vec<Challenge>> {
        Ok(self.read()?.challenges.clone())
    }

    async fn get_challenge(&self, id: &str) -> Result<Option<Challenge>> {
        Ok(self.read()?.challenges.iter().find(|c| c.id == id).cloned())
    }

    async fn save_challenge(&self, challenge: &Challenge) -> Result<Challenge> {
        self.write()?.upsert_challenge(challenge.clone());
        Ok(challenge.clone())
    }
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

/// A [`MemoryStore`] mirrored to a JSON file after every write.
///
/// A write lands in memory only after the file has been replaced, so a
/// failed write leaves both copies as they were.
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                EvalError::Storage(format!("failed to read {}: {e}", path.display()))
            })?;
            serde_json::from_str::<StoreData>(&content).map_err(|e| {
                EvalError::Storage(format!("failed to parse {}: {e}", path.display()))
            })?
        } else {
            StoreData::default()
        };
        Ok(Self {
            path,
            inner: MemoryStore::from_data(data),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Write `data` to `path` as pretty JSON.
    pub fn save_data(path: &Path, data: &StoreData) -> Result<()> {
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| EvalError::Storage(format!("failed to serialize store: {e}")))?;
        if let Some(parent) = parent_dir(path) {
            std::fs::create_dir_all(parent)
                .map_err(|e| EvalError::Storage(format!("failed to create {}: {e}", parent.display())))?;
        }
        std::fs::write(path, json)
            .map_err(|e| EvalError::Storage(format!("failed to write {}: {e}", path.display())))
    }

    /// Apply `change` to a copy of the data, persist the copy, then adopt it.
    async fn commit(&self, change: impl FnOnce(&mut StoreData)) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut next = self.inner.snapshot()?;
        change(&mut next);
        let json = serde_json::to_string_pretty(&next)
            .map_err(|e| EvalError::Storage(format!("failed to serialize store: {e}")))?;

        if let Some(parent) = parent_dir(&self.path) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| EvalError::Storage(format!("failed to create {}: {e}", parent.display())))?;
        }
        // Write a sibling file and rename it over the target.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| EvalError::Storage(format!("failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| EvalError::Storage(format!("failed to replace {}: {e}", self.path.display())))?;

        self.inner.replace(next)?;
        debug!(path = %self.path.display(), "store flushed");
        Ok(())
    }
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn create_or_update_evaluation(
        &self,
        record: &EvaluationRecord,
    ) -> Result<EvaluationRecord> {
        self.commit(|data| data.upsert_evaluation(record.clone()))
            .await?;
        Ok(record.clone())
    }

    async fn get_evaluation(
        &self,
        id: &str,
        repository_id: &str,
    ) -> Result<Option<EvaluationRecord>> {
        self.inner.get_evaluation(id, repository_id).await
    }

    async fn list_evaluations_for_challenge(
        &self,
        challenge_id: &str,
    ) -> Result<Vec<EvaluationRecord>> {
        self.inner.list_evaluations_for_challenge(challenge_id).await
    }

    async fn list_evaluations_for_repository(
        &self,
        repository_id: &str,
    ) -> Result<Vec<EvaluationRecord>> {
        self.inner.list_evaluations_for_repository(repository_id).await
    }

    async fn list_repositories(&self, challenge_id: &str) -> Result<Vec<Repository>> {
        self.inner.list_repositories(challenge_id).await
    }

    async fn get_repository(&self, id: &str, challenge_id: &str) -> Result<Option<Repository>> {
        self.inner.get_repository(id, challenge_id).await
    }

    async fn list_criteria(&self, challenge_id: &str) -> Result<Vec<Criterion>> {
        self.inner.list_criteria(challenge_id).await
    }

    async fn list_challenges(&self) -> Result<Vec<Challenge>> {
        self.inner.list_challenges().await
    }

    async fn get_challenge(&self, id: &str) -> Result<Option<Challenge>> {
        self.inner.get_challenge(id).await
    }

    async fn save_challenge(&self, challenge: &Challenge) -> Result<Challenge> {
        self.commit(|data| data.upsert_challenge(challenge.clone()))
            .await?;
        Ok(challenge.clone())
    }
}

// ---------------------------------------------------------------------------
// Retrying wrapper
// ---------------------------------------------------------------------------

/// Applies a [`RetryPolicy`] to every call of the wrapped store.
pub struct RetryingStore {
    inner: Arc<dyn RecordStore>,
    policy: RetryPolicy,
}

impl RetryingStore {
    pub fn new(inner: Arc<dyn RecordStore>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl RecordStore for RetryingStore {
    async fn create_or_update_evaluation(
        &self,
        record: &EvaluationRecord,
    ) -> Result<EvaluationRecord> {
        self.policy
            .execute("create_or_update_evaluation", || {
                self.inner.create_or_update_evaluation(record)
            })
            .await
    }

    async fn get_evaluation(
        &self,
        id: &str,
        repository_id: &str,
    ) -> Result<Option<EvaluationRecord>> {
        self.policy
            .execute("get_evaluation", || self.inner.get_evaluation(id, repository_id))
            .await
    }

    async fn list_evaluations_for_challenge(
        &self,
        challenge_id: &str,
    ) -> Result<Vec<EvaluationRecord>> {
        self.policy
            .execute("list_evaluations_for_challenge", || {
                self.inner.list_evaluations_for_challenge(challenge_id)
            })
            .await
    }

    async fn list_evaluations_for_repository(
        &self,
        repository_id: &str,
    ) -> Result<Vec<EvaluationRecord>> {
        self.policy
            .execute("list_evaluations_for_repository", || {
                self.inner.list_evaluations_for_repository(repository_id)
            })
            .await
    }

    async fn list_repositories(&self, challenge_id: &str) -> Result<Vec<Repository>> {
        self.policy
            .execute("list_repositories", || self.inner.list_repositories(challenge_id))
            .await
    }

    async fn get_repository(&self, id: &str, challenge_id: &str) -> Result<Option<Repository>> {
        self.policy
            .execute("get_repository", || self.inner.get_repository(id, challenge_id))
            .await
    }

    async fn list_criteria(&self, challenge_id: &str) -> Result<Vec<Criterion>> {
        self.policy
            .execute("list_criteria", || self.inner.list_criteria(challenge_id))
            .await
    }

    async fn list_challenges(&self) -> Result<Vec<Challenge>> {
        self.policy
            .execute("list_challenges", || self.inner.list_challenges())
            .await
    }

    async fn get_challenge(&self, id: &str) -> Result<Option<Challenge>> {
        self.policy
            .execute("get_challenge", || self.inner.get_challenge(id))
            .await
    }

    async fn save_challenge(&self, challenge: &Challenge) -> Result<Challenge> {
        self.policy
            .execute("save_challenge", || self.inner.save_challenge(challenge))
            .await
    }
}
