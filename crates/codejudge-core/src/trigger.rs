//! Fire-and-forget evaluation triggers.
//!
//! A trigger spawns `run_for_challenge` on the runtime and returns at once.
//! Callers observe progress through status and rank queries. The registry
//! keeps every handle so outstanding runs can be aborted on shutdown.

use std::sync::{Arc, Mutex};

use tokio::task::{AbortHandle, JoinHandle};
use tracing::{error, info};

use crate::service::EvaluationService;

#[derive(Default)]
pub struct TriggerRegistry {
    handles: Mutex<Vec<(String, JoinHandle<()>)>>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start evaluating a challenge in the background.
    ///
    /// The returned handle cancels this run alone.
    pub fn trigger(
        &self,
        service: Arc<EvaluationService>,
        challenge_id: impl Into<String>,
        criteria_ids: Option<Vec<String>>,
    ) -> AbortHandle {
        let challenge_id = challenge_id.into();
        let task_challenge = challenge_id.clone();
        let handle = tokio::spawn(async move {
            match service
                .run_for_challenge(&task_challenge, criteria_ids.as_deref())
                .await
            {
                Ok(()) => info!(challenge = %task_challenge, "triggered evaluation finished"),
                Err(e) => {
                    error!(challenge = %task_challenge, error = %e, "triggered evaluation failed")
                }
            }
        });

        let abort = handle.abort_handle();
        let mut handles = self.lock();
        handles.retain(|(_, h)| !h.is_finished());
        handles.push((challenge_id, handle));
        abort
    }

    /// Challenge ids of runs that have not finished yet.
    pub fn pending(&self) -> Vec<String> {
        let mut handles = self.lock();
        handles.retain(|(_, h)| !h.is_finished());
        handles.iter().map(|(id, _)| id.clone()).collect()
    }

    /// Abort every outstanding run and wait for the tasks to unwind.
    pub async fn shutdown(&self) {
        let handles: Vec<_> = std::mem::take(&mut *self.lock());
        for (_, handle) in &handles {
            handle.abort();
        }
        for (challenge_id, handle) in handles {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    error!(challenge = %challenge_id, error = %e, "triggered evaluation panicked");
                }
            }
        }
    }

    /// Wait for every outstanding run to finish on its own.
    pub async fn drain(&self) {
        let handles: Vec<_> = std::mem::take(&mut *self.lock());
        for (challenge_id, handle) in handles {
            if let Err(e) = handle.await {
                error!(challenge = %challenge_id, error = %e, "triggered evaluation panicked");
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, JoinHandle<()>)>> {
        // A poisoned list still holds valid handles.
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
