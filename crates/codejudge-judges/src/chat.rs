//! Chat-completions judge (OpenAI-compatible API).
//!
//! Stateless: a judge "identity" is just a name. Instructions registered at
//! provisioning are kept in memory and sent as the system message; identities
//! loaded from the store after a restart fall back to the default
//! instructions.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use codejudge_core::error::Result;
use codejudge_core::traits::{Judge, JudgePayload, ProvisionRequest, JUDGE_INSTRUCTIONS};

use crate::error::JudgeError;
use crate::http::{build_client, send_json};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4.1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// OpenAI-compatible chat-completions judge.
pub struct ChatJudge {
    api_key: String,
    base_url: String,
    model: String,
    timeout_secs: u64,
    client: reqwest::Client,
    instructions: RwLock<HashMap<String, String>>,
}

impl ChatJudge {
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        model: &str,
        timeout_secs: u64,
    ) -> std::result::Result<Self, JudgeError> {
        if api_key.trim().is_empty() {
            return Err(JudgeError::Config("openai judge requires 'api_key'".into()));
        }
        if model.trim().is_empty() {
            return Err(JudgeError::Config("openai judge requires 'model'".into()));
        }
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.to_string(),
            timeout_secs,
            client: build_client(timeout_secs)?,
            instructions: RwLock::new(HashMap::new()),
        })
    }

    fn instructions_for(&self, identity: &str) -> String {
        self.instructions
            .read()
            .ok()
            .and_then(|map| map.get(identity).cloned())
            .unwrap_or_else(|| JUDGE_INSTRUCTIONS.to_string())
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    temperature: f64,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Judge for ChatJudge {
    fn name(&self) -> &str {
        "openai"
    }

    async fn provision(&self, request: &ProvisionRequest) -> Result<String> {
        if let Ok(mut map) = self.instructions.write() {
            map.insert(request.name.clone(), request.instructions.clone());
        }
        Ok(request.name.clone())
    }

    #[instrument(skip(self, payload), fields(model = %self.model, repository = %payload.repository.name))]
    async fn ask(&self, identity: &str, payload: &JudgePayload) -> Result<String> {
        let start = Instant::now();
        let content = serde_json::to_string(payload)
            .map_err(|e| JudgeError::Protocol(format!("failed to encode payload: {e}")))?;

        let body = ChatRequest {
            model: self.model.clone(),
            temperature: 0.0,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: self.instructions_for(identity),
                },
                ChatMessage {
                    role: "user",
                    content,
                },
            ],
        };

        let request = self
            .client
            .post(format!(
                "{}/v1/chat/completions",
                self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
            .json(&body);
        let response: ChatResponse = send_json(request, self.timeout_secs).await?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(JudgeError::NoAnswer)?;

        debug!(
            latency_ms = start.elapsed().as_millis() as u64,
            "judge answered"
        );
        Ok(answer)
    }
}
