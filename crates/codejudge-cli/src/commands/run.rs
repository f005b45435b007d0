//! The `codejudge run` command.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};

use codejudge_core::rank::rank_challenge;

use crate::config::load_config_from;

pub async fn execute(
    challenge: String,
    criteria: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let service = super::build_service(&config)?;

    let criteria_ids: Option<Vec<String>> = criteria.map(|c| {
        c.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    });

    eprintln!("Evaluating challenge {challenge}...");
    let start = Instant::now();
    service
        .run_for_challenge(&challenge, criteria_ids.as_deref())
        .await
        .with_context(|| format!("evaluation of challenge '{challenge}' failed"))?;
    eprintln!("Finished in {:.1}s\n", start.elapsed().as_secs_f64());

    let report = rank_challenge(service.store().as_ref(), &challenge).await?;
    super::rank::print_table(&report);
    Ok(())
}
