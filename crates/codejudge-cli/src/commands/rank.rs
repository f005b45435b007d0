//! The `codejudge rank` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use codejudge_core::rank::{rank_challenge, RankReport};

use super::{format_score, OutputFormat};
use crate::config::load_config_from;

pub async fn execute(challenge: String, format: String, config_path: Option<PathBuf>) -> Result<()> {
    let format = OutputFormat::parse(&format)?;
    let config = load_config_from(config_path.as_deref())?;
    let store = super::open_store(&config)?;

    let report = rank_challenge(store.as_ref(), &challenge).await?;
    match format {
        OutputFormat::Json => super::print_json(&report)?,
        OutputFormat::Text => print_table(&report),
    }
    Ok(())
}

pub(crate) fn print_table(report: &RankReport) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Repository", "Score", "Status", "URL"]);

    for (position, entry) in report.entries.iter().enumerate() {
        let score = if entry.unscored && entry.total_score.is_some() {
            format!("{}*", format_score(entry.total_score))
        } else {
            format_score(entry.total_score)
        };
        table.add_row(vec![
            Cell::new(position + 1),
            Cell::new(&entry.repository_name),
            Cell::new(score),
            Cell::new(entry.status),
            Cell::new(&entry.repository_url),
        ]);
    }

    println!("Challenge {}", report.challenge_id);
    println!("{table}");
    if report
        .entries
        .iter()
        .any(|e| e.unscored && e.total_score.is_some())
    {
        println!("* some criteria have no score yet");
    }
}
