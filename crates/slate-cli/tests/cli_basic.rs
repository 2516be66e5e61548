//! Basic CLI E2E tests.
//!
//! Runs the built binary against a throwaway home directory so config and
//! store files never touch the real user data.

use std::path::Path;
use std::process::Command;

/// Run a CLI command with HOME pointed at `home` and return (code, stdout, stderr).
fn run_cli(home: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_slate"))
        .args(args)
        .env("HOME", home)
        .env_remove("SLATE_ENV")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn write_fixture(dir: &Path) -> std::path::PathBuf {
    let now = chrono::Utc::now();
    let ts = |days: i64| (now - chrono::Duration::days(days)).to_rfc3339();
    let doc = serde_json::json!({
        "organizationId": "newsroom",
        "items": [
            {"id": "p1", "kind": "pitch", "status": "Pitched",
             "createdAt": ts(40), "updatedAt": ts(20), "assignedUserIds": ["ana"]},
            {"id": "s1", "kind": "story", "status": "Shooting",
             "createdAt": ts(10), "updatedAt": ts(1), "assignedUserIds": ["ben"]}
        ],
        "events": [
            {"id": "e1", "entityId": "s1", "entityKind": "story", "startDate": ts(2)}
        ]
    });
    let path = dir.join("fixture.json");
    std::fs::write(&path, doc.to_string()).unwrap();
    path
}

#[test]
fn test_import_and_alerts() {
    let home = tempfile::tempdir().unwrap();
    let fixture = write_fixture(home.path());

    let (code, stdout, stderr) = run_cli(home.path(), &["import", fixture.to_str().unwrap()]);
    assert_eq!(code, 0, "import failed: {stderr}");
    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(summary["items_imported"], 2);

    let (code, stdout, stderr) = run_cli(home.path(), &["alerts", "--org", "newsroom"]);
    assert_eq!(code, 0, "alerts failed: {stderr}");
    let alerts: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(alerts.as_array().unwrap().len(), 2);
}

#[test]
fn test_report_text() {
    let home = tempfile::tempdir().unwrap();
    let fixture = write_fixture(home.path());
    run_cli(home.path(), &["import", fixture.to_str().unwrap()]);

    let (code, stdout, _) = run_cli(home.path(), &["report", "--text", "--org", "newsroom"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Production Intelligence: newsroom"));
}

#[test]
fn test_missing_org_fails() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["workflow"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("no organization"));
}

#[test]
fn test_config_set_and_get() {
    let home = tempfile::tempdir().unwrap();

    let (code, _, stderr) = run_cli(home.path(), &["config", "set", "history.min_samples", "5"]);
    assert_eq!(code, 0, "config set failed: {stderr}");

    let (code, stdout, _) = run_cli(home.path(), &["config", "get", "history.min_samples"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "5");

    let (code, _, _) = run_cli(home.path(), &["config", "set", "history.min_samples", "0"]);
    assert_ne!(code, 0);
}

#[test]
fn test_out_of_range_days_rejected() {
    let home = tempfile::tempdir().unwrap();

    let (code, _, stderr) = run_cli(
        home.path(),
        &["schedule", "--org", "newsroom", "--days-ahead", "1000000000"],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("schedule.days_ahead"), "unexpected stderr: {stderr}");

    let (code, _, stderr) = run_cli(home.path(), &["config", "set", "history.lookback_days", "1000000000"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("must not exceed"), "unexpected stderr: {stderr}");
}
