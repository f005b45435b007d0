//! Judge configuration and factory.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use codejudge_core::error::Result;
use codejudge_core::traits::Judge;

use crate::agents::{self, AgentsJudge, AgentsSettings};
use crate::chat::{self, ChatJudge};
use crate::error::JudgeError;
use crate::mock::{MockJudge, DEFAULT_MOCK_ANSWER};

/// Configuration for the judge transport.
///
/// Debug output masks API keys.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JudgeConfig {
    /// Hosted agent service with an assistants-style API.
    Agents {
        endpoint: String,
        api_key: String,
        model: String,
        #[serde(default)]
        api_version: Option<String>,
        /// Reuse one existing agent instead of creating one per challenge.
        #[serde(default)]
        agent_id: Option<String>,
        #[serde(default = "default_poll_interval_ms")]
        poll_interval_ms: u64,
        #[serde(default = "default_max_polls")]
        max_polls: u32,
        #[serde(default = "default_agents_timeout")]
        timeout_secs: u64,
    },
    /// OpenAI-compatible chat completions.
    #[serde(rename = "openai")]
    OpenAi {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default = "default_chat_model")]
        model: String,
        #[serde(default = "default_chat_timeout")]
        timeout_secs: u64,
    },
    /// Canned answers, for demos and tests.
    Mock {
        #[serde(default = "default_mock_answer")]
        answer: String,
        #[serde(default)]
        answers: HashMap<String, String>,
    },
}

impl std::fmt::Debug for JudgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JudgeConfig::Agents {
                endpoint,
                api_key: _,
                model,
                api_version,
                agent_id,
                poll_interval_ms,
                max_polls,
                timeout_secs,
            } => f
                .debug_struct("Agents")
                .field("endpoint", endpoint)
                .field("api_key", &"***")
                .field("model", model)
                .field("api_version", api_version)
                .field("agent_id", agent_id)
                .field("poll_interval_ms", poll_interval_ms)
                .field("max_polls", max_polls)
                .field("timeout_secs", timeout_secs)
                .finish(),
            JudgeConfig::OpenAi {
                api_key: _,
                base_url,
                model,
                timeout_secs,
            } => f
                .debug_struct("OpenAi")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .field("timeout_secs", timeout_secs)
                .finish(),
            JudgeConfig::Mock { answer, answers } => f
                .debug_struct("Mock")
                .field("answer", answer)
                .field("answers", &answers.len())
                .finish(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    agents::DEFAULT_POLL_INTERVAL_MS
}
fn default_max_polls() -> u32 {
    agents::DEFAULT_MAX_POLLS
}
fn default_agents_timeout() -> u64 {
    agents::DEFAULT_TIMEOUT_SECS
}
fn default_chat_model() -> String {
    chat::DEFAULT_MODEL.to_string()
}
fn default_chat_timeout() -> u64 {
    chat::DEFAULT_TIMEOUT_SECS
}
fn default_mock_answer() -> String {
    DEFAULT_MOCK_ANSWER.to_string()
}

impl JudgeConfig {
    /// A copy with `${VAR}` references resolved from the environment.
    pub fn resolved(&self) -> JudgeConfig {
        match self.clone() {
            JudgeConfig::Agents {
                endpoint,
                api_key,
                model,
                api_version,
                agent_id,
                poll_interval_ms,
                max_polls,
                timeout_secs,
            } => JudgeConfig::Agents {
                endpoint: resolve_env_vars(&endpoint),
                api_key: resolve_env_vars(&api_key),
                model: resolve_env_vars(&model),
                api_version: api_version.map(|v| resolve_env_vars(&v)),
                agent_id: agent_id.map(|a| resolve_env_vars(&a)),
                poll_interval_ms,
                max_polls,
                timeout_secs,
            },
            JudgeConfig::OpenAi {
                api_key,
                base_url,
                model,
                timeout_secs,
            } => JudgeConfig::OpenAi {
                api_key: resolve_env_vars(&api_key),
                base_url: base_url.map(|u| resolve_env_vars(&u)),
                model: resolve_env_vars(&model),
                timeout_secs,
            },
            mock @ JudgeConfig::Mock { .. } => mock,
        }
    }

    /// Replace the API key, if this transport has one.
    pub fn set_api_key(&mut self, key: String) {
        match self {
            JudgeConfig::Agents { api_key, .. } | JudgeConfig::OpenAi { api_key, .. } => {
                *api_key = key
            }
            JudgeConfig::Mock { .. } => {}
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Unset variables resolve to the empty string. Substituted values are not
/// scanned again.
pub fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + len];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}

/// Create a judge from its configuration.
///
/// Missing endpoints, models or keys fail here with a configuration error
/// rather than on the first evaluation.
pub fn create_judge(config: &JudgeConfig) -> Result<Arc<dyn Judge>> {
    let judge: Arc<dyn Judge> = match config.resolved() {
        JudgeConfig::Agents {
            endpoint,
            api_key,
            model,
            api_version,
            agent_id,
            poll_interval_ms,
            max_polls,
            timeout_secs,
        } => Arc::new(AgentsJudge::new(AgentsSettings {
            endpoint,
            api_key,
            model,
            api_version,
            agent_id,
            poll_interval: Duration::from_millis(poll_interval_ms),
            max_polls,
            timeout_secs,
        })?),
        JudgeConfig::OpenAi {
            api_key,
            base_url,
            model,
            timeout_secs,
        } => Arc::new(ChatJudge::new(&api_key, base_url, &model, timeout_secs)?),
        JudgeConfig::Mock { answer, answers } => {
            if answer.trim().is_empty() {
                return Err(JudgeError::Config("mock judge requires 'answer'".into()).into());
            }
            Arc::new(MockJudge::new(answers).with_default_answer(&answer))
        }
    };
    Ok(judge)
}
