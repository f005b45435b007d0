//! CLI integration tests using assert_cmd.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

fn codejudge() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("codejudge").unwrap()
}

fn record(repo: &str, criterion: &str, state: &str, score: Option<f64>) -> Value {
    json!({
        "id": format!("{repo}:{criterion}"),
        "challenge_id": "c1",
        "repository_id": repo,
        "criterion_id": criterion,
        "criterion_name": format!("criterion {criterion}"),
        "state": state,
        "score": score,
        "reasoning": null,
        "suggestion": score.map(|_| "add more tests"),
        "created_at": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-02T00:00:00Z",
    })
}

fn repository(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "challenge_id": "c1",
        "name": name,
        "url": format!("https://github.com/acme/{name}"),
        "created_at": "2026-01-01T00:00:00Z",
    })
}

/// A store with challenge `c1` (three repositories, two criteria) and an
/// empty challenge `c2`, plus a config pointing at it.
fn seeded_workspace(judge: Option<&str>) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let store = json!({
        "challenges": [
            {"id": "c1", "name": "Widgets"},
            {"id": "c2", "name": "Empty"}
        ],
        "criteria": [
            {"id": "k1", "challenge_id": "c1", "name": "tests"},
            {"id": "k2", "challenge_id": "c1", "name": "docs"}
        ],
        "repositories": [
            repository("alpha", "alpha"),
            repository("beta", "beta"),
            repository("gamma", "gamma")
        ],
        "evaluations": [
            record("alpha", "k1", "evaluated", Some(40.0)),
            record("alpha", "k2", "evaluated", Some(60.0)),
            record("beta", "k1", "evaluated", Some(90.0)),
            record("beta", "k2", "evaluated", Some(90.0)),
            record("gamma", "k1", "under_evaluation", None)
        ]
    });
    let store_path = dir.path().join("store.json");
    std::fs::write(&store_path, serde_json::to_string_pretty(&store).unwrap()).unwrap();

    let mut config = format!(
        "store_path = {:?}\n\n[retry]\nmax_attempts = 1\n",
        store_path.display().to_string()
    );
    if let Some(judge) = judge {
        config.push_str(&format!("\n[judge]\ntype = \"{judge}\"\n"));
    }
    let config_path = dir.path().join("codejudge.toml");
    std::fs::write(&config_path, config).unwrap();
    (dir, config_path)
}

fn with_config(cmd: &mut Command, config: &Path) {
    cmd.arg("--config").arg(config);
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    codejudge()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created codejudge.toml"))
        .stdout(predicate::str::contains("Created codejudge-store.json"));

    assert!(dir.path().join("codejudge.toml").exists());
    let store: Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("codejudge-store.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(store["challenges"].as_array().unwrap().len(), 1);
    assert_eq!(store["criteria"].as_array().unwrap().len(), 2);
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    codejudge()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    codejudge()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn rank_orders_by_score() {
    let (_dir, config) = seeded_workspace(None);
    let mut cmd = codejudge();
    cmd.arg("rank").arg("c1");
    with_config(&mut cmd, &config);

    let output = cmd.assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8(output).unwrap();
    let beta = stdout.find("beta").unwrap();
    let alpha = stdout.find("alpha").unwrap();
    let gamma = stdout.find("gamma").unwrap();
    assert!(beta < alpha && alpha < gamma, "unexpected order:\n{stdout}");
    assert!(stdout.contains("90.0"));
    assert!(stdout.contains("50.0"));
}

#[test]
fn rank_json_output() {
    let (_dir, config) = seeded_workspace(None);
    let mut cmd = codejudge();
    cmd.args(["rank", "c1", "--format", "json"]);
    with_config(&mut cmd, &config);

    let output = cmd.assert().success().get_output().stdout.clone();
    let report: Value = serde_json::from_slice(&output).unwrap();
    let entries = report["entries"].as_array().unwrap();
    let ids: Vec<&str> = entries
        .iter()
        .map(|e| e["repository_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["beta", "alpha", "gamma"]);
    assert_eq!(entries[0]["total_score"], json!(90.0));
    assert_eq!(entries[2]["total_score"], Value::Null);
    assert_eq!(entries[2]["status"], json!("under_evaluation"));
}

#[test]
fn rank_without_repositories_fails() {
    let (_dir, config) = seeded_workspace(None);
    let mut cmd = codejudge();
    cmd.args(["rank", "c2"]);
    with_config(&mut cmd, &config);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no repositories registered"));
}

#[test]
fn status_lists_each_repository() {
    let (_dir, config) = seeded_workspace(None);
    let mut cmd = codejudge();
    cmd.args(["status", "c1", "--format", "json"]);
    with_config(&mut cmd, &config);

    let output = cmd.assert().success().get_output().stdout.clone();
    let statuses: Value = serde_json::from_slice(&output).unwrap();
    let states: Vec<(&str, &str)> = statuses
        .as_array()
        .unwrap()
        .iter()
        .map(|s| {
            (
                s["repository_name"].as_str().unwrap(),
                s["state"].as_str().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        states,
        vec![
            ("alpha", "evaluated"),
            ("beta", "evaluated"),
            ("gamma", "under_evaluation")
        ]
    );
}

#[test]
fn history_shows_criterion_names() {
    let (_dir, config) = seeded_workspace(None);
    let mut cmd = codejudge();
    cmd.args(["history", "c1", "alpha"]);
    with_config(&mut cmd, &config);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("criterion k1"))
        .stdout(predicate::str::contains("add more tests"));
}

#[test]
fn history_unknown_repository_fails() {
    let (_dir, config) = seeded_workspace(None);
    let mut cmd = codejudge();
    cmd.args(["history", "c1", "nope"]);
    with_config(&mut cmd, &config);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("repository 'nope' not found"));
}

#[test]
fn run_unknown_challenge_fails() {
    let (_dir, config) = seeded_workspace(Some("mock"));
    let mut cmd = codejudge();
    cmd.args(["run", "missing"]);
    with_config(&mut cmd, &config);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error"))
        .stderr(predicate::str::contains("challenge 'missing' not found"));
}

#[test]
fn run_requires_a_judge() {
    let (_dir, config) = seeded_workspace(None);
    let mut cmd = codejudge();
    cmd.args(["run", "c1"]);
    with_config(&mut cmd, &config);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no [judge] section"));
}

#[test]
fn unknown_format_is_rejected() {
    let (_dir, config) = seeded_workspace(None);
    let mut cmd = codejudge();
    cmd.args(["rank", "c1", "--format", "xml"]);
    with_config(&mut cmd, &config);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown format"));
}

#[test]
fn missing_config_file_fails() {
    codejudge()
        .args(["rank", "c1", "--config", "/nonexistent/codejudge.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}
