//! The `codejudge history` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use codejudge_core::rank::repository_history;

use super::{format_score, OutputFormat};
use crate::config::load_config_from;

pub async fn execute(
    challenge: String,
    repository: String,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let format = OutputFormat::parse(&format)?;
    let config = load_config_from(config_path.as_deref())?;
    let store = super::open_store(&config)?;

    let history = repository_history(store.as_ref(), &challenge, &repository).await?;
    if format == OutputFormat::Json {
        return super::print_json(&history);
    }

    println!(
        "{} ({})",
        history.repository.name, history.repository.url
    );
    if history.evaluations.is_empty() {
        println!("No evaluations yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Criterion", "State", "Score", "Suggestion", "Updated"]);
    for record in &history.evaluations {
        table.add_row(vec![
            Cell::new(&record.criterion_name),
            Cell::new(record.state),
            Cell::new(format_score(record.score)),
            Cell::new(record.suggestion.as_deref().unwrap_or("")),
            Cell::new(record.updated_at.format("%Y-%m-%d %H:%M:%S UTC")),
        ]);
    }
    println!("{table}");
    Ok(())
}
