//! Subcommand implementations.

pub mod history;
pub mod init;
pub mod rank;
pub mod run;
pub mod serve;
pub mod status;

use std::sync::Arc;

use anyhow::{Context, Result};

use codejudge_core::service::EvaluationService;
use codejudge_core::store::{JsonFileStore, RetryingStore};
use codejudge_core::traits::RecordStore;
use codejudge_fetch::ArchiveSnapshotSource;
use codejudge_judges::create_judge;

use crate::config::CodejudgeConfig;

/// Open the configured JSON store behind the configured retry policy.
pub(crate) fn open_store(config: &CodejudgeConfig) -> Result<Arc<dyn RecordStore>> {
    let store = JsonFileStore::open(&config.store_path)
        .with_context(|| format!("failed to open store {}", config.store_path.display()))?;
    Ok(Arc::new(RetryingStore::new(
        Arc::new(store),
        config.retry_policy(),
    )))
}

/// Wire store, archive source and judge into an evaluation service.
pub(crate) fn build_service(config: &CodejudgeConfig) -> Result<Arc<EvaluationService>> {
    let judge_config = config
        .judge
        .as_ref()
        .context("no [judge] section in config; run `codejudge init` for a sample")?;
    let judge = create_judge(judge_config).context("failed to create judge")?;
    let source = ArchiveSnapshotSource::new(config.fetch.clone(), config.snapshot.clone())
        .context("failed to create archive fetcher")?;
    let store = open_store(config)?;
    Ok(Arc::new(EvaluationService::new(
        store,
        Arc::new(source),
        judge,
    )))
}

/// Output format of the query commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub(crate) fn parse(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => anyhow::bail!("unknown format '{other}', expected text or json"),
        }
    }
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn format_score(score: Option<f64>) -> String {
    match score {
        Some(s) => format!("{s:.1}"),
        None => "-".to_string(),
    }
}
