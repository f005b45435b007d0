//! The `codejudge serve` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use codejudge_core::scheduler::Scheduler;
use codejudge_core::trigger::TriggerRegistry;

use crate::config::load_config_from;

pub async fn execute(
    triggers: Vec<String>,
    interval: Option<u64>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let service = super::build_service(&config)?;

    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.interval());
    let scheduler = Scheduler::new(Arc::clone(&service), interval);
    if scheduler.interval() != interval {
        warn!(
            requested_secs = interval.as_secs(),
            interval_secs = scheduler.interval().as_secs(),
            "interval raised to the minimum"
        );
    }

    let registry = TriggerRegistry::new();
    for challenge_id in triggers {
        info!(challenge = %challenge_id, "triggering evaluation");
        registry.trigger(Arc::clone(&service), challenge_id, None);
    }

    let cancel = CancellationToken::new();
    let scheduler_cancel = cancel.clone();
    let scheduler_task = tokio::spawn(async move { scheduler.run(scheduler_cancel).await });

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    cancel.cancel();
    registry.shutdown().await;
    if let Err(e) = scheduler_task.await {
        warn!(error = %e, "scheduler task ended abnormally");
    }
    Ok(())
}
