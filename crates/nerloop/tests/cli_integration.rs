//! CLI integration tests for the nerloop command-line interface.
//!
//! Most tests check parsing and help output only. The end-to-end test
//! starts a real server on a free port with in-memory storage.

use std::net::TcpListener;
use std::process::{Child, Command as StdCommand, Stdio};
use std::time::{Duration, Instant};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the nerloop binary, isolated from user config.
fn nerloop(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("nerloop").unwrap();
    cmd.env("NERLOOP_CONFIG_DIR", home.path())
        .env_remove("NERLOOP_SERVER_URL")
        .current_dir(home.path());
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let home = TempDir::new().unwrap();
    nerloop(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("nerloop"))
        .stdout(predicate::str::contains("review NER output"));
}

#[test]
fn test_version_displays() {
    let home = TempDir::new().unwrap();
    nerloop(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nerloop"));
}

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    nerloop(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("review"))
        .stdout(predicate::str::contains("prefs"))
        .stdout(predicate::str::contains("lookup"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Global Flag Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_global_flags_accepted() {
    let home = TempDir::new().unwrap();
    nerloop(&home).args(["--verbose", "--help"]).assert().success();
    nerloop(&home).args(["--json", "--help"]).assert().success();
    nerloop(&home)
        .args(["--server", "http://localhost:9999", "--help"])
        .assert()
        .success();
}

// ─────────────────────────────────────────────────────────────────────────────
// Subcommand Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_start_help() {
    let home = TempDir::new().unwrap();
    nerloop(&home)
        .args(["start", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Start the nerloop server"))
        .stdout(predicate::str::contains("--storage"));
}

#[test]
fn test_review_requires_text() {
    let home = TempDir::new().unwrap();
    nerloop(&home)
        .arg("review")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<TEXT>"));
}

#[test]
fn test_lookup_requires_text() {
    let home = TempDir::new().unwrap();
    nerloop(&home).arg("lookup").assert().failure();
}

#[test]
fn test_start_rejects_unknown_storage() {
    let home = TempDir::new().unwrap();
    nerloop(&home)
        .args(["start", "--storage", "s3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown backend"));
}

#[test]
fn test_status_without_server_json() {
    let home = TempDir::new().unwrap();
    nerloop(&home)
        .args(["--json", "--server", "http://127.0.0.1:1", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"running\": false"));
}

#[test]
fn test_invalid_subcommand_fails() {
    let home = TempDir::new().unwrap();
    nerloop(&home).arg("train").assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// End-to-end
// ─────────────────────────────────────────────────────────────────────────────

/// Kills the server process on drop.
struct ServerProcess(Child);

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[test]
fn test_review_against_running_server() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("e2e.toml");
    std::fs::write(
        &config_path,
        r#"
[storage]
backend = "memory"

[ner.gazetteer]
PRODUCT = ["Galaxy"]
BRAND = ["Samsung"]

[logging]
json_file = false
"#,
    )
    .unwrap();

    let port = free_port();
    let url = format!("http://127.0.0.1:{port}");
    let _server = ServerProcess(
        StdCommand::new(cargo_bin("nerloop"))
            .env("NERLOOP_CONFIG_DIR", home.path())
            .current_dir(home.path())
            .args(["start", "--port", &port.to_string(), "--config"])
            .arg(&config_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap(),
    );

    let deadline = Instant::now() + Duration::from_secs(15);
    loop {
        let output = nerloop(&home)
            .args(["--json", "--server", &url, "status"])
            .output()
            .unwrap();
        if String::from_utf8_lossy(&output.stdout).contains("\"running\": true") {
            break;
        }
        assert!(Instant::now() < deadline, "server did not start");
        std::thread::sleep(Duration::from_millis(100));
    }

    nerloop(&home)
        .args([
            "--json",
            "--server",
            &url,
            "review",
            "--accept-all",
            "Samsung makes the Galaxy",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"preferences\""))
        .stdout(predicate::str::contains("Galaxy"));

    nerloop(&home)
        .args(["--json", "--server", &url, "prefs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total\": 2"));

    nerloop(&home)
        .args(["--json", "--server", &url, "lookup", "Samsung makes the Galaxy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("null"));
}
