//! Smoke tests for the vanguard binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn vanguard() -> Command {
  let mut cmd = Command::cargo_bin("vanguard").unwrap();
  cmd.env_remove("MODE");
  cmd.env_remove("WORKSPACE_DIR");
  cmd.env_remove("ENV_DEFS_GIT_URL");
  cmd.env_remove("ENV_DEFS_DIR");
  cmd
}

fn write_defs(dir: &Path) {
  fs::write(dir.join("env.json"), r#"{"kind": "Environment", "name": "smoke"}"#).unwrap();
  fs::write(
    dir.join("api.json"),
    r#"{"kind": "Service", "defVersion": "v1", "name": "api",
        "runtime": {"engine": "node", "version": "20.11.0"},
        "gitURL": "https://github.com/acme/api", "runScript": "node server.js"}"#,
  )
  .unwrap();
}

#[test]
fn help_lists_the_subcommands() {
  vanguard()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("serve"))
    .stdout(predicate::str::contains("validate"))
    .stdout(predicate::str::contains("info"));
}

#[test]
fn info_prints_platform_and_workspace() {
  vanguard()
    .arg("info")
    .assert()
    .success()
    .stdout(predicate::str::contains("Platform"))
    .stdout(predicate::str::contains("/tmp/toolchains"));
}

#[test]
fn info_honors_the_configured_workspace() {
  vanguard()
    .arg("info")
    .env("WORKSPACE_DIR", "/var/lib/vanguard")
    .assert()
    .success()
    .stdout(predicate::str::contains("/var/lib/vanguard/definitions"));
}

#[test]
fn validate_resolves_a_definitions_directory() {
  let temp = TempDir::new().unwrap();
  write_defs(temp.path());

  vanguard()
    .arg("validate")
    .arg(temp.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("api"))
    .stdout(predicate::str::contains("1 services resolved"));
}

#[test]
fn validate_fails_without_an_environment() {
  let temp = TempDir::new().unwrap();
  fs::write(
    temp.path().join("api.json"),
    r#"{"kind": "Service", "name": "api", "gitURL": "https://github.com/acme/api", "runScript": "node server.js"}"#,
  )
  .unwrap();

  vanguard()
    .arg("validate")
    .arg(temp.path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("missing environment"));
}

#[test]
fn validate_rejects_a_missing_path() {
  vanguard()
    .arg("validate")
    .arg("/definitely/not/a/real/path")
    .assert()
    .failure()
    .stderr(predicate::str::contains("not a directory"));
}

#[test]
fn serve_without_definitions_config_exits_nonzero() {
  vanguard()
    .arg("serve")
    .assert()
    .failure()
    .stderr(predicate::str::contains("environment definitions incomplete"));
}
