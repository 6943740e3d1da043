//! The satellite worker reports its outcome through sentinel lines.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

const FAILURE: &str = "cf-prompter: task failed";

fn prompter() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cf-prompter"));
    cmd.env_clear().env("RUST_LOG", "off");
    cmd
}

#[test]
fn test_missing_parameters_print_failure_sentinel() {
    prompter()
        .assert()
        .failure()
        .stdout(predicate::str::contains(format!(
            "{FAILURE}: PROMPT_BASE64 environment variable is required"
        )));
}

#[test]
fn test_undecodable_prompt_prints_failure_sentinel() {
    prompter()
        .env("PROMPT_BASE64", "%%%")
        .env("CF_ACCESS_TOKEN", "abc")
        .env("CF_API", "http://127.0.0.1:1")
        .env("APP_ID", "app-guid")
        .env("SPACE_ID", "space-guid")
        .assert()
        .failure()
        .stdout(predicate::str::contains(format!(
            "{FAILURE}: failed to decode PROMPT_BASE64"
        )));
}

#[test]
fn test_unreachable_platform_prints_failure_sentinel() {
    prompter()
        .env("PROMPT_BASE64", "bWFrZSBpdCBibHVl")
        .env("CF_ACCESS_TOKEN", "abc")
        .env("CF_API", "http://127.0.0.1:1")
        .env("APP_ID", "app-guid")
        .env("SPACE_ID", "space-guid")
        .assert()
        .failure()
        .stdout(predicate::str::contains(FAILURE))
        .stdout(predicate::str::contains("task completed successfully").not());
}
