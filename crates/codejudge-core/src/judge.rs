//! Judge client: identity resolution and answer parsing.
//!
//! Transport failures from [`Judge::ask`] propagate as errors. A judge that
//! answers with something unusable is not an error: the answer degrades to a
//! result without a score.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{EvalError, Result};
use crate::model::JudgeResult;
use crate::traits::{Judge, JudgePayload, ProvisionRequest, RecordStore};

/// A judge transport bound to one challenge's judge identity.
#[derive(Clone)]
pub struct JudgeClient {
    judge: Arc<dyn Judge>,
    identity: String,
}

impl JudgeClient {
    pub fn new(judge: Arc<dyn Judge>, identity: impl Into<String>) -> Self {
        Self {
            judge,
            identity: identity.into(),
        }
    }

    /// Bind to the judge identity of `challenge_id`, provisioning one and
    /// saving it onto the challenge if it has none yet.
    pub async fn for_challenge(
        judge: Arc<dyn Judge>,
        store: &dyn RecordStore,
        challenge_id: &str,
    ) -> Result<Self> {
        let mut challenge = store
            .get_challenge(challenge_id)
            .await?
            .ok_or_else(|| EvalError::not_found("challenge", challenge_id))?;

        if let Some(identity) = challenge.agent_id.as_deref().filter(|id| !id.is_empty()) {
            return Ok(Self::new(judge, identity));
        }

        let request = ProvisionRequest::for_challenge(&challenge);
        let identity = judge.provision(&request).await?;
        info!(
            challenge = %challenge_id,
            judge = judge.name(),
            identity = %identity,
            "provisioned judge identity"
        );

        challenge.agent_id = Some(identity.clone());
        challenge.updated_at = Some(Utc::now());
        store.save_challenge(&challenge).await?;

        Ok(Self::new(judge, identity))
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Ask the judge and parse its answer.
    pub async fn evaluate(&self, payload: &JudgePayload) -> Result<JudgeResult> {
        let raw = self.judge.ask(&self.identity, payload).await?;
        Ok(parse_judge_answer(&raw))
    }
}

/// Parse a judge answer of the form `{"score", "reasoning", "suggestion"}`.
///
/// The answer may be wrapped in a markdown code fence. `score` may be a
/// number or a numeric string and must lie in `0..=100`; anything else leaves
/// the score empty while keeping whatever string fields were present.
pub fn parse_judge_answer(raw: &str) -> JudgeResult {
    let text = strip_code_fence(raw);

    let parsed = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, answer = %raw, "judge answer was not valid JSON");
            return JudgeResult::default();
        }
    };

    let Some(fields) = parsed.as_object() else {
        warn!(answer = %raw, "judge answer was not a JSON object");
        return JudgeResult::default();
    };

    let score = match fields.get("score") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|s| s.is_finite() && (0.0..=100.0).contains(s));

    if score.is_none() {
        warn!(answer = %raw, "judge answer had no usable score");
    }

    let text_field = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);

    JudgeResult {
        score,
        reasoning: text_field("reasoning"),
        suggestion: text_field("suggestion"),
    }
}

/// Return the body of a single fenced block, or the trimmed input.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => return trimmed,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}
