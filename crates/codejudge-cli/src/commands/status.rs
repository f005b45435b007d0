//! The `codejudge status` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use codejudge_core::rank::status_for_challenge;

use super::OutputFormat;
use crate::config::load_config_from;

pub async fn execute(challenge: String, format: String, config_path: Option<PathBuf>) -> Result<()> {
    let format = OutputFormat::parse(&format)?;
    let config = load_config_from(config_path.as_deref())?;
    let store = super::open_store(&config)?;

    let statuses = status_for_challenge(store.as_ref(), &challenge).await?;
    if format == OutputFormat::Json {
        return super::print_json(&statuses);
    }

    if statuses.is_empty() {
        println!("No repositories for challenge {challenge}.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Repository", "State", "Last updated"]);
    for status in &statuses {
        table.add_row(vec![
            Cell::new(&status.repository_name),
            Cell::new(status.state),
            Cell::new(status.last_updated.format("%Y-%m-%d %H:%M:%S UTC")),
        ]);
    }
    println!("{table}");
    Ok(())
}
