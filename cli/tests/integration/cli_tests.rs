//! Argument parsing, version output and target resolution failures.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `cf-prompt` with an empty `CF_HOME` and no target variables leaking in.
fn cf_prompt(home: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cf-prompt"));
    cmd.env("NO_COLOR", "1")
        .env("CF_HOME", home.path())
        .env_remove("CF_API")
        .env_remove("CF_ACCESS_TOKEN")
        .env_remove("CF_ORG_GUID")
        .env_remove("CF_SPACE_GUID");
    cmd
}

fn home() -> TempDir {
    TempDir::new().expect("tempdir")
}

fn home_with_config(content: &str) -> TempDir {
    let dir = home();
    std::fs::create_dir_all(dir.path().join(".cf")).expect("mkdir");
    std::fs::write(dir.path().join(".cf/config.json"), content).expect("write config");
    dir
}

// --- Help and version ---

#[test]
fn test_no_args_shows_help_and_exits_two() {
    cf_prompt(&home())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_help_lists_subcommands() {
    cf_prompt(&home())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("prompt"))
        .stdout(predicate::str::contains("prompts"))
        .stdout(predicate::str::contains("prompt-init"))
        .stdout(predicate::str::contains("prompt-push"));
}

#[test]
fn test_version_command_shows_version() {
    cf_prompt(&home())
        .arg("version")
        .assert()
        .success()
        .stdout(format!("cf-prompt {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_version_command_json_outputs_valid_json() {
    let out = cf_prompt(&home())
        .args(["--json", "version"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).expect("valid JSON");
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_version_needs_no_target() {
    // An empty CF_HOME would fail target resolution for any other command.
    cf_prompt(&home()).arg("version").assert().success();
}

#[test]
fn test_conventional_no_color_values_are_accepted() {
    for value in ["1", "yes", "true", ""] {
        cf_prompt(&home())
            .env("NO_COLOR", value)
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::starts_with("cf-prompt "));
    }
}

// --- Argument validation ---

#[test]
fn test_prompt_requires_prompt_flag() {
    cf_prompt(&home())
        .args(["prompt", "myapp"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--prompt"));
}

#[test]
fn test_prompt_positional_conflicts_with_app_flag() {
    cf_prompt(&home())
        .args(["prompt", "one", "--app", "two", "-p", "hi"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_prompt_remote_conflicts_with_persistent() {
    cf_prompt(&home())
        .args(["prompt", "app", "-p", "hi", "--remote", "--persistent"])
        .assert()
        .code(2);
}

#[test]
fn test_prompts_requires_app() {
    cf_prompt(&home()).arg("prompts").assert().code(2);
}

// --- Target resolution ---

#[test]
fn test_missing_cf_config_points_at_cf_api() {
    cf_prompt(&home())
        .args(["prompts", "myapp"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("cf api"));
}

#[test]
fn test_missing_token_points_at_cf_login() {
    let home = home_with_config(r#"{"Target":"https://api.example.com"}"#);
    cf_prompt(&home)
        .args(["prompts", "myapp"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cf login"));
}

#[test]
fn test_missing_space_points_at_cf_target() {
    let home =
        home_with_config(r#"{"Target":"https://api.example.com","AccessToken":"bearer abc"}"#);
    cf_prompt(&home)
        .args(["prompt-push", "myapp", "abc1234"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cf target"));
}

#[test]
fn test_json_error_carries_configuration_code() {
    let out = cf_prompt(&home())
        .args(["--json", "prompts", "myapp"])
        .assert()
        .code(1)
        .get_output()
        .stderr
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).expect("valid JSON");
    assert_eq!(value["error"], true);
    assert_eq!(value["code"], "CONFIGURATION");
    assert!(value["message"].as_str().unwrap_or_default().contains("cf api"));
}

#[test]
fn test_unreachable_api_is_transport_error() {
    let out = cf_prompt(&home())
        .args([
            "--json",
            "--api",
            "http://127.0.0.1:1",
            "--token",
            "bearer abc",
            "--space-guid",
            "space-1",
            "prompts",
            "myapp",
        ])
        .assert()
        .code(1)
        .get_output()
        .stderr
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).expect("valid JSON");
    assert_eq!(value["code"], "TRANSPORT");
}

/// Flags that target an unreachable platform, so any network call fails.
const UNREACHABLE_TARGET: [&str; 6] = [
    "--api",
    "http://127.0.0.1:1",
    "--token",
    "bearer abc",
    "--space-guid",
    "space-1",
];

#[test]
fn test_missing_worker_binary_fails_before_network() {
    let out = cf_prompt(&home())
        .arg("--json")
        .args(UNREACHABLE_TARGET)
        .args(["prompt", "myapp", "-p", "add a footer", "--remote"])
        .args(["--worker-binary", "/nonexistent/cf-prompter"])
        .assert()
        .code(1)
        .get_output()
        .stderr
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).expect("valid JSON");
    assert_eq!(value["code"], "CONFIGURATION");
    assert!(value["message"].as_str().unwrap_or_default().contains("--worker-binary"));
}

#[test]
fn test_empty_worker_binary_fails_before_network() {
    let home = home();
    let worker = home.path().join("cf-prompter");
    std::fs::write(&worker, b"").expect("write worker");
    let out = cf_prompt(&home)
        .arg("--json")
        .args(UNREACHABLE_TARGET)
        .args(["prompt-init", "myapp", "--worker-binary"])
        .arg(&worker)
        .assert()
        .code(1)
        .get_output()
        .stderr
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).expect("valid JSON");
    assert_eq!(value["code"], "CONFIGURATION");
}
