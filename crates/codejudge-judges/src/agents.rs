//! Agent-service judge (assistants-style API).
//!
//! Each challenge gets its own agent, created by name with the judge
//! instructions. Asking the judge creates a thread with a single user message
//! holding the JSON payload, starts a run, polls it to a terminal status and
//! reads the newest assistant text message of that run.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use codejudge_core::error::Result;
use codejudge_core::traits::{Judge, JudgePayload, ProvisionRequest};

use crate::error::JudgeError;
use crate::http::{build_client, send_json};

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_MAX_POLLS: u32 = 300;

/// Connection settings for [`AgentsJudge`].
#[derive(Clone)]
pub struct AgentsSettings {
    pub endpoint: String,
    pub api_key: String,
    /// Model deployment new agents are created with.
    pub model: String,
    /// Appended as `?api-version=` when set.
    pub api_version: Option<String>,
    /// Use this agent for every challenge instead of creating one.
    pub agent_id: Option<String>,
    pub poll_interval: Duration,
    pub max_polls: u32,
    pub timeout_secs: u64,
}

/// Judge backed by a hosted agent service.
pub struct AgentsJudge {
    settings: AgentsSettings,
    client: reqwest::Client,
}

impl AgentsJudge {
    pub fn new(settings: AgentsSettings) -> std::result::Result<Self, JudgeError> {
        for (field, value) in [
            ("endpoint", &settings.endpoint),
            ("api_key", &settings.api_key),
            ("model", &settings.model),
        ] {
            if value.trim().is_empty() {
                return Err(JudgeError::Config(format!("agents judge requires '{field}'")));
            }
        }
        let client = build_client(settings.timeout_secs)?;
        Ok(Self { settings, client })
    }

    fn url(&self, path: &str) -> String {
        let base = self.settings.endpoint.trim_end_matches('/');
        match &self.settings.api_version {
            Some(version) if path.contains('?') => format!("{base}{path}&api-version={version}"),
            Some(version) => format!("{base}{path}?api-version={version}"),
            None => format!("{base}{path}"),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> std::result::Result<T, JudgeError> {
        let request = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.settings.api_key);
        send_json(request, self.settings.timeout_secs).await
    }

    async fn post<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<T, JudgeError> {
        let request = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.settings.api_key)
            .json(body);
        send_json(request, self.settings.timeout_secs).await
    }

    async fn wait_for_run(&self, run: RunObject) -> std::result::Result<RunObject, JudgeError> {
        let mut run = run;
        let mut polls = 0;
        while !run.is_terminal() {
            if polls >= self.settings.max_polls {
                return Err(JudgeError::RunFailed {
                    run_id: run.id,
                    status: format!("still {} after {polls} polls", run.status),
                });
            }
            tokio::time::sleep(self.settings.poll_interval).await;
            polls += 1;
            run = self
                .get(&format!("/threads/{}/runs/{}", run.thread_id, run.id))
                .await?;
            debug!(run = %run.id, status = %run.status, polls, "polled judge run");
        }

        if run.status != "completed" {
            return Err(JudgeError::RunFailed {
                run_id: run.id,
                status: run.status,
            });
        }
        Ok(run)
    }

    async fn assistant_text(&self, run: &RunObject) -> std::result::Result<String, JudgeError> {
        let messages: MessageList = self
            .get(&format!(
                "/threads/{}/messages?order=desc&run_id={}",
                run.thread_id, run.id
            ))
            .await?;
        first_assistant_text(&messages.data).ok_or(JudgeError::NoAnswer)
    }
}

#[derive(Serialize)]
struct CreateAgent<'a> {
    model: &'a str,
    name: &'a str,
    instructions: &'a str,
}

#[derive(Deserialize)]
struct AgentObject {
    id: String,
}

#[derive(Serialize)]
struct CreateThreadAndRun<'a> {
    assistant_id: &'a str,
    thread: NewThread,
}

#[derive(Serialize)]
struct NewThread {
    messages: Vec<NewMessage>,
}

#[derive(Serialize)]
struct NewMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct RunObject {
    id: String,
    thread_id: String,
    status: String,
}

impl RunObject {
    fn is_terminal(&self) -> bool {
        matches!(
            self.status.as_str(),
            "completed" | "failed" | "cancelled" | "expired" | "incomplete" | "requires_action"
        )
    }
}

#[derive(Deserialize)]
struct MessageList {
    #[serde(default)]
    data: Vec<Value>,
}

/// Text of the first assistant message in `messages`.
///
/// Text parts come either as `{"type": "text", "text": {"value": ...}}` or
/// with `text` as a plain string.
fn first_assistant_text(messages: &[Value]) -> Option<String> {
    messages
        .iter()
        .filter(|m| m.get("role").and_then(Value::as_str) == Some("assistant"))
        .flat_map(|m| {
            m.get("content")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[])
        })
        .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
        .find_map(|part| match part.get("text")? {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj
                .get("value")
                .or_else(|| obj.get("text"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
}

#[async_trait]
impl Judge for AgentsJudge {
    fn name(&self) -> &str {
        "agents"
    }

    #[instrument(skip(self, request), fields(agent = %request.name))]
    async fn provision(&self, request: &ProvisionRequest) -> Result<String> {
        if let Some(agent_id) = self.settings.agent_id.as_deref().filter(|id| !id.is_empty()) {
            return Ok(agent_id.to_string());
        }

        let agent: AgentObject = self
            .post(
                "/assistants",
                &CreateAgent {
                    model: &self.settings.model,
                    name: &request.name,
                    instructions: &request.instructions,
                },
            )
            .await?;
        info!(agent_id = %agent.id, "created judge agent");
        Ok(agent.id)
    }

    #[instrument(skip(self, payload), fields(agent = %identity, repository = %payload.repository.name))]
    async fn ask(&self, identity: &str, payload: &JudgePayload) -> Result<String> {
        let content = serde_json::to_string(payload)
            .map_err(|e| JudgeError::Protocol(format!("failed to encode payload: {e}")))?;

        let run: RunObject = self
            .post(
                "/threads/runs",
                &CreateThreadAndRun {
                    assistant_id: identity,
                    thread: NewThread {
                        messages: vec![NewMessage {
                            role: "user",
                            content,
                        }],
                    },
                },
            )
            .await?;
        debug!(run = %run.id, thread = %run.thread_id, "started judge run");

        let run = self.wait_for_run(run).await?;
        Ok(self.assistant_text(&run).await?)
    }
}
