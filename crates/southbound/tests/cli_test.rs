//! Integration tests for the `southbound` CLI binary.
//!
//! Argument parsing, inventory handling and error exit codes, all without a
//! live gNMI target.
#![allow(clippy::unwrap_used)]

use std::io::Write;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `southbound` binary with env isolation.
fn southbound_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("southbound");
    cmd.env("HOME", "/tmp/southbound-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/southbound-cli-test-nonexistent")
        .env_remove("SOUTHBOUND_CONFIG")
        .env_remove("SOUTHBOUND_DEVICE")
        .env_remove("SOUTHBOUND_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Two plaintext devices on a port nothing listens on.
const INVENTORY: &str = r#"
[defaults]
timeout = 2

[devices.leaf1]
address = "127.0.0.1:1"
plain = true

[devices.spine1]
id = "spine-1"
address = "127.0.0.1:1"
version = "2.0.0"
plain = true
"#;

fn inventory() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(INVENTORY.as_bytes()).unwrap();
    file
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = southbound_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    southbound_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("gNMI")
            .and(predicate::str::contains("capabilities"))
            .and(predicate::str::contains("subscribe"))
            .and(predicate::str::contains("devices")),
    );
}

#[test]
fn test_version_flag() {
    southbound_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("southbound"));
}

#[test]
fn test_completions_bash() {
    southbound_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_get_requires_a_request() {
    let output = southbound_cmd().arg("get").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Inventory ───────────────────────────────────────────────────────

#[test]
fn test_devices_table() {
    let file = inventory();
    southbound_cmd()
        .args(["--config", file.path().to_str().unwrap(), "devices"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("leaf1:1.0.0")
                .and(predicate::str::contains("spine-1:2.0.0"))
                .and(predicate::str::contains("plain")),
        );
}

#[test]
fn test_devices_json() {
    let file = inventory();
    let output = southbound_cmd()
        .args(["--config", file.path().to_str().unwrap(), "-o", "json", "devices"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 2);
    assert_eq!(rows[0]["name"], "leaf1");
    assert_eq!(rows[1]["session"], "spine-1:2.0.0");
}

#[test]
fn test_missing_config_file_fails() {
    let output = southbound_cmd()
        .args(["--config", "/nonexistent/devices.toml", "devices"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("config file not found"));
}

#[test]
fn test_unknown_device_is_not_found() {
    let file = inventory();
    let output = southbound_cmd()
        .args(["--config", file.path().to_str().unwrap(), "-d", "leaf9", "capabilities"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    let text = combined_output(&output);
    assert!(text.contains("leaf9"), "got:\n{text}");
    assert!(text.contains("leaf1, spine1"), "got:\n{text}");
}

#[test]
fn test_ambiguous_device_is_a_usage_error() {
    let file = inventory();
    let output = southbound_cmd()
        .args(["--config", file.path().to_str().unwrap(), "capabilities"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("No device selected"));
}

// ── Device commands ─────────────────────────────────────────────────

#[test]
fn test_bad_subscribe_mode_fails_before_connecting() {
    let file = inventory();
    let output = southbound_cmd()
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "-d",
            "leaf1",
            "subscribe",
            "--path",
            "/interfaces",
            "--mode",
            "sometimes",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("subscribe mode (sometimes) invalid"), "got:\n{text}");
    assert!(!text.contains("Could not connect"), "got:\n{text}");
}

#[test]
fn test_unreachable_device_is_a_connection_error() {
    let file = inventory();
    let output = southbound_cmd()
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "-d",
            "leaf1",
            "get",
            "path: <elem: <name: 'system'>>",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
    assert!(combined_output(&output).contains("Could not connect to 127.0.0.1:1"));
}
