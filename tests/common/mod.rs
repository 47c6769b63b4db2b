#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const API_KEY: &str = "test-secret-key-0123456789";

pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Script body answering like the `instantly` CLI with JSON output.
///
/// Every invocation appends one line to `$SMOKE_CALL_LOG`:
/// `<INSTANTLY_OUTPUT>|<INSTANTLY_MAX_429_RETRIES>|<args>`.
pub fn fake_cli_script(extra_cases: &str) -> String {
    format!(
        r#"#!/bin/sh
args="$*"
if [ -n "$SMOKE_CALL_LOG" ]; then
  echo "$INSTANTLY_OUTPUT|$INSTANTLY_MAX_429_RETRIES|$args" >> "$SMOKE_CALL_LOG"
fi
case "$args" in
{extra}
  "workspaces current get"*) echo '{{"id":"ws-1","name":"Smoke Workspace"}}' ;;
  "accounts list"*) echo '{{"items":[{{"email":"sender@example.com","status":1}}]}}' ;;
  "campaigns list"*) echo '{{"items":[]}}' ;;
  "workspace-members list"*) echo '{{"items":[{{"id":"owner-1","role":"owner"}},{{"id":"member-2","role":"editor"}}]}}' ;;
  "--dry-run "*) echo '{{"dry_run":true}}' ;;
  *) echo '{{"id":"generic-1"}}' ;;
esac
exit 0
"#,
        extra = extra_cases
    )
}

/// Write an executable fake CLI into `dir` and return its path
#[cfg(unix)]
pub fn write_fake_cli(dir: &Path, extra_cases: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("instantly");
    fs::write(&path, fake_cli_script(extra_cases)).expect("Failed to write fake CLI");
    let mut perms = fs::metadata(&path)
        .expect("Failed to stat fake CLI")
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("Failed to chmod fake CLI");
    path
}

pub fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("smoke.yaml");
    fs::write(&path, content).expect("Failed to write config");
    path
}

/// Lines written to the call log, one per invocation
pub fn read_calls(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .map(|content| content.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn read_report(path: &Path) -> serde_json::Value {
    let content = fs::read_to_string(path).expect("Failed to read report");
    serde_json::from_str(&content).expect("Report is not valid JSON")
}
