//! Runs the built `infogen` binary in an isolated home.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run(root: &Path, args: &[&str]) -> Output {
    let home = root.join("home");
    let config_home = root.join("config");
    let data_home = root.join("data");
    let workspace = root.join("ws");
    for dir in [&home, &config_home, &data_home, &workspace] {
        fs::create_dir_all(dir).unwrap();
    }
    Command::new(env!("CARGO_BIN_EXE_infogen"))
        .env("HOME", &home)
        .env("XDG_CONFIG_HOME", &config_home)
        .env("XDG_DATA_HOME", &data_home)
        .env_remove("INFOGEN_LOG")
        .env_remove("INFOGEN_LOG_OUTPUT")
        .env_remove("INFOGEN_ENV")
        .arg("--workspace")
        .arg(&workspace)
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_empty_queue_list() {
    let temp = TempDir::new().unwrap();
    let output = run(temp.path(), &["--quiet", "queue", "list"]);
    assert!(
        output.status.success(),
        "queue list should succeed: stderr={:?}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("Queue is empty"));
}

#[test]
fn test_queue_add_persists_between_invocations() {
    let temp = TempDir::new().unwrap();
    let output = run(
        temp.path(),
        &["--quiet", "queue", "add", "https://youtu.be/abc123", "--title", "Demo"],
    );
    assert!(output.status.success());

    let output = run(temp.path(), &["--quiet", "queue", "list", "--format", "json"]);
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed[0]["unit_id"], "abc123");
    assert_eq!(parsed[0]["title"], "Demo");
}

#[test]
fn test_invalid_url_exits_nonzero() {
    let temp = TempDir::new().unwrap();
    let output = run(temp.path(), &["--quiet", "generate", "ftp://example.test/a"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid source URL"));
}

#[test]
fn test_log_file_receives_startup_line() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("infogen.log");
    let output = run(
        temp.path(),
        &["--log-file", log.to_str().unwrap(), "queue", "list"],
    );
    assert!(output.status.success());
    let contents = fs::read_to_string(&log).unwrap();
    assert!(contents.contains("Infogen CLI starting"));
}
