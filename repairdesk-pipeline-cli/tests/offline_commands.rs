use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Run `pipeline` in an empty directory so no stray config file is picked up
fn pipeline(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pipeline").unwrap();
    cmd.current_dir(dir.path()).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_board_table() {
    let dir = TempDir::new().unwrap();
    pipeline(&dir)
        .args(["--offline", "board"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Maria Lopez"))
        .stdout(predicate::str::contains("Negotiation"))
        .stdout(predicate::str::contains("8 leads"));
}

#[test]
fn test_board_json_single_stage() {
    let dir = TempDir::new().unwrap();
    let output = pipeline(&dir)
        .args(["--offline", "--format", "json", "board", "--stage", "proposal"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["stage"], "proposal");
    assert_eq!(rows[0]["customer"], "Sunita Rao");
}

#[test]
fn test_board_unknown_stage_fails() {
    let dir = TempDir::new().unwrap();
    pipeline(&dir)
        .args(["--offline", "board", "--stage", "archived"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid stage: archived"));
}

#[test]
fn test_stages_yaml() {
    let dir = TempDir::new().unwrap();
    pipeline(&dir)
        .args(["--format", "yaml", "stages"])
        .assert()
        .success()
        .stdout(predicate::str::contains("id: negotiation"))
        .stdout(predicate::str::contains("label: Won"));
}

#[test]
fn test_move_between_stages() {
    let dir = TempDir::new().unwrap();
    pipeline(&dir)
        .args(["--offline", "move", "1", "new", "0", "contacted", "99"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Moved lead 1 to contacted at position 1",
        ));
}

#[test]
fn test_move_in_place_reports_unchanged() {
    let dir = TempDir::new().unwrap();
    pipeline(&dir)
        .args(["--offline", "--format", "json", "move", "2", "new", "1", "new", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"changed\": false"));
}

#[test]
fn test_move_rejects_unknown_stage() {
    let dir = TempDir::new().unwrap();
    pipeline(&dir)
        .args(["--offline", "move", "1", "new", "0", "archived", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("move rejected"));
}

#[test]
fn test_local_stats() {
    let dir = TempDir::new().unwrap();
    pipeline(&dir)
        .args(["--offline", "stats", "--local"])
        .assert()
        .success()
        .stdout(predicate::str::contains("won value 3100.00"));
}

#[test]
fn test_invalid_config_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("repairdesk.toml"),
        "[sync]\nqueue_capacity = 0\n",
    )
    .unwrap();

    pipeline(&dir)
        .args(["--offline", "stages"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("queue_capacity"));
}
