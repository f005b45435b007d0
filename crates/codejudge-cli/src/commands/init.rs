//! The `codejudge init` command.

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use codejudge_core::model::{Challenge, Criterion, Repository};
use codejudge_core::store::{JsonFileStore, StoreData};

use crate::config::{CONFIG_FILE, DEFAULT_STORE_PATH};

pub fn execute() -> Result<()> {
    if Path::new(CONFIG_FILE).exists() {
        println!("{CONFIG_FILE} already exists, skipping.");
    } else {
        std::fs::write(CONFIG_FILE, SAMPLE_CONFIG)?;
        println!("Created {CONFIG_FILE}");
    }

    let store_path = Path::new(DEFAULT_STORE_PATH);
    let challenge_id = if store_path.exists() {
        println!("{DEFAULT_STORE_PATH} already exists, skipping.");
        None
    } else {
        let data = sample_store();
        let id = data.challenges.first().map(|c| c.id.clone());
        JsonFileStore::save_data(store_path, &data)?;
        println!("Created {DEFAULT_STORE_PATH}");
        id
    };

    println!("\nNext steps:");
    println!("  1. Edit {CONFIG_FILE} and pick a judge");
    println!("  2. Add challenges, criteria and repositories to {DEFAULT_STORE_PATH}");
    match challenge_id {
        Some(id) => println!("  3. Run: codejudge run {id}"),
        None => println!("  3. Run: codejudge run <challenge-id>"),
    }

    Ok(())
}

fn sample_store() -> StoreData {
    let now = Utc::now();
    let challenge_id = Uuid::new_v4().to_string();

    let challenge = Challenge {
        id: challenge_id.clone(),
        name: "Hello service".into(),
        description: "Build a small HTTP service that greets its callers.".into(),
        expected_outcome: "GET /hello returns a greeting and the service has tests.".into(),
        active: true,
        agent_id: None,
        created_at: now,
        updated_at: None,
    };
    let criteria = vec![
        Criterion {
            id: Uuid::new_v4().to_string(),
            challenge_id: challenge_id.clone(),
            name: "Functionality".into(),
            description: "The service does what the challenge asks.".into(),
            score_multiplier: 1.0,
            code_concept: "http".into(),
        },
        Criterion {
            id: Uuid::new_v4().to_string(),
            challenge_id: challenge_id.clone(),
            name: "Testing".into(),
            description: "Behavior is covered by automated tests.".into(),
            score_multiplier: 1.0,
            code_concept: "testing".into(),
        },
    ];
    let repositories = vec![Repository {
        id: Uuid::new_v4().to_string(),
        challenge_id,
        name: "hello-service".into(),
        url: "https://github.com/octocat/Hello-World".into(),
        created_at: now,
    }];

    StoreData {
        challenges: vec![challenge],
        criteria,
        repositories,
        evaluations: Vec::new(),
    }
}

const SAMPLE_CONFIG: &str = r#"# codejudge configuration

store_path = "codejudge-store.json"
# Seconds between scheduled evaluations (minimum 60)
interval_secs = 1800

[fetch]
reference = "main"
timeout_secs = 60
# token = "${GITHUB_TOKEN}"

[snapshot]
max_files = 50
max_file_bytes = 200000
max_chars = 2000

[retry]
max_attempts = 5
initial_backoff_ms = 1000
max_backoff_ms = 5000

[judge]
type = "mock"

# [judge]
# type = "openai"
# api_key = "${OPENAI_API_KEY}"
# model = "gpt-4.1"

# [judge]
# type = "agents"
# endpoint = "${AGENTS_ENDPOINT}"
# api_key = "${AGENTS_API_KEY}"
# model = "gpt-4o"
"#;
