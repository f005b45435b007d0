//! `codejudge.toml` loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use codejudge_core::retry::RetryPolicy;
use codejudge_fetch::{FetchConfig, SnapshotConfig};
use codejudge_judges::{resolve_env_vars, JudgeConfig};

pub const CONFIG_FILE: &str = "codejudge.toml";
pub const DEFAULT_STORE_PATH: &str = "codejudge-store.json";

/// Top-level codejudge configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CodejudgeConfig {
    /// JSON document holding challenges, criteria, repositories and evaluations.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Seconds between scheduled evaluations (at least 60).
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub retry: RetrySettings,
    /// Judge transport. Required by `serve` and `run` only.
    #[serde(default)]
    pub judge: Option<JudgeConfig>,
}

/// Backoff for record store calls.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}
fn default_interval() -> u64 {
    1800
}

impl Default for CodejudgeConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            interval_secs: default_interval(),
            fetch: FetchConfig::default(),
            snapshot: SnapshotConfig::default(),
            retry: RetrySettings::default(),
            judge: None,
        }
    }
}

impl CodejudgeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.initial_backoff_ms),
            Duration::from_millis(self.retry.max_backoff_ms),
        )
    }
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order:
/// 1. `codejudge.toml` in the current directory
/// 2. `~/.config/codejudge/config.toml`
///
/// Environment variable overrides: `GITHUB_TOKEN`, `CODEJUDGE_JUDGE_KEY`.
pub fn load_config_from(path: Option<&Path>) -> Result<CodejudgeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<CodejudgeConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => CodejudgeConfig::default(),
    };

    config.fetch.token = config
        .fetch
        .token
        .as_deref()
        .map(resolve_env_vars)
        .filter(|t| !t.is_empty());
    if let Ok(token) = std::env::var("GITHUB_TOKEN") {
        if !token.is_empty() {
            config.fetch.token = Some(token);
        }
    }

    if let Some(judge) = config.judge.as_mut() {
        if let Ok(key) = std::env::var("CODEJUDGE_JUDGE_KEY") {
            judge.set_api_key(key);
        }
        *judge = judge.resolved();
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("codejudge"))
}
