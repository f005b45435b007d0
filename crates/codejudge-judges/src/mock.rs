//! Mock judge for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use codejudge_core::error::{EvalError, Result};
use codejudge_core::traits::{Judge, JudgePayload, ProvisionRequest};

pub const DEFAULT_MOCK_ANSWER: &str =
    r#"{"score": 50, "reasoning": "mock judge", "suggestion": "configure a real judge"}"#;

/// A judge that answers from a fixed table instead of a remote service.
///
/// Answers are picked by repository name; unmatched repositories get the
/// default answer.
pub struct MockJudge {
    /// Map of repository name → raw answer.
    answers: HashMap<String, String>,
    default_answer: String,
    unavailable: AtomicBool,
    call_count: AtomicU32,
    provision_count: AtomicU32,
    last_payload: Mutex<Option<JudgePayload>>,
}

impl MockJudge {
    pub fn new(answers: HashMap<String, String>) -> Self {
        Self {
            answers,
            default_answer: DEFAULT_MOCK_ANSWER.to_string(),
            unavailable: AtomicBool::new(false),
            call_count: AtomicU32::new(0),
            provision_count: AtomicU32::new(0),
            last_payload: Mutex::new(None),
        }
    }

    /// A mock that always returns the same answer.
    pub fn with_fixed_answer(answer: &str) -> Self {
        Self::new(HashMap::new()).with_default_answer(answer)
    }

    /// Answer unmatched repositories with `answer`.
    pub fn with_default_answer(mut self, answer: &str) -> Self {
        self.default_answer = answer.to_string();
        self
    }

    /// Make every `ask` fail as if the service were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn provision_count(&self) -> u32 {
        self.provision_count.load(Ordering::Relaxed)
    }

    pub fn last_payload(&self) -> Option<JudgePayload> {
        self.last_payload.lock().ok().and_then(|p| p.clone())
    }
}

impl Default for MockJudge {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

#[async_trait]
impl Judge for MockJudge {
    fn name(&self) -> &str {
        "mock"
    }

    async fn provision(&self, request: &ProvisionRequest) -> Result<String> {
        self.provision_count.fetch_add(1, Ordering::Relaxed);
        Ok(format!("mock-{}", request.name))
    }

    async fn ask(&self, _identity: &str, payload: &JudgePayload) -> Result<String> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_payload.lock() {
            *last = Some(payload.clone());
        }
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(EvalError::JudgeUnavailable("mock judge is unavailable".into()));
        }

        Ok(self
            .answers
            .get(&payload.repository.name)
            .cloned()
            .unwrap_or_else(|| self.default_answer.clone()))
    }
}
