//! Command runner for the target CLI
//!
//! Spawns the target binary once per step with a prepared environment,
//! waits for it under a timeout, and reduces its output to what the ledger
//! needs: exit status, elapsed time, decoded stdout and a bounded stderr tail.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

use super::error::RunnerError;

/// Maximum number of characters kept from stderr
pub const STDERR_TAIL_CHARS: usize = 800;

/// Default per-invocation timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

/// Reduced output of one completed invocation
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    /// Exit code was zero
    pub success: bool,
    /// Raw exit code (-1 when terminated by a signal)
    pub exit_code: i32,
    /// Wall-clock duration
    pub seconds: f64,
    /// Decoded stdout; `None` when not requested, empty, or not valid JSON
    pub json: Option<Value>,
    /// Trimmed trailing slice of stderr
    pub stderr_tail: String,
}

/// Something that can execute the target CLI
///
/// The production implementation is [`ProcessRunner`]; tests substitute a
/// scripted fake.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the target with `argv` and wait for it to finish
    async fn run(&self, argv: &[String], parse_json: bool) -> Result<CommandOutput, RunnerError>;

    /// Display name of the target binary
    fn target(&self) -> String;
}

/// Runs the target binary as a child process
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    binary: PathBuf,
    env: BTreeMap<OsString, OsString>,
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(binary: impl AsRef<Path>) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
            env: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Exact environment for the child; nothing else is inherited
    pub fn env<K, V>(mut self, env: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<OsString>,
        V: Into<OsString>,
    {
        self.env = env
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, argv: &[String], parse_json: bool) -> Result<CommandOutput, RunnerError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(argv)
            .env_clear()
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = Instant::now();
        let child = cmd.spawn().map_err(|source| RunnerError::Spawn {
            binary: self.binary.display().to_string(),
            source,
        })?;

        // Dropping the wait future on timeout kills the child.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => return Err(RunnerError::Timeout(self.timeout)),
        };
        let seconds = start.elapsed().as_secs_f64();

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_code = output.status.code().unwrap_or(-1);

        debug!(
            exit_code,
            seconds,
            stdout_bytes = output.stdout.len(),
            "Invocation finished"
        );

        Ok(CommandOutput {
            success: output.status.success(),
            exit_code,
            seconds,
            json: if parse_json { decode_json(&stdout) } else { None },
            stderr_tail: tail(&stderr, STDERR_TAIL_CHARS),
        })
    }

    fn target(&self) -> String {
        self.binary.display().to_string()
    }
}

/// Decode stdout as a single JSON document.
///
/// Empty output, invalid JSON and a literal `null` all yield `None`.
pub fn decode_json(stdout: &str) -> Option<Value> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, "stdout is not valid JSON");
            None
        }
    }
}

/// Last `max_chars` characters of the trimmed text
pub fn tail(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    if count <= max_chars {
        return trimmed.to_string();
    }
    trimmed.chars().skip(count - max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_short_text() {
        assert_eq!(tail("  error: nope \n", 800), "error: nope");
    }

    #[test]
    fn test_tail_keeps_end() {
        let text = format!("{}END", "x".repeat(1000));
        let result = tail(&text, 800);
        assert_eq!(result.chars().count(), 800);
        assert!(result.ends_with("END"));
    }

    #[test]
    fn test_tail_counts_chars_not_bytes() {
        let text = "é".repeat(900);
        assert_eq!(tail(&text, 800).chars().count(), 800);
    }

    #[test]
    fn test_decode_json() {
        assert_eq!(decode_json(""), None);
        assert_eq!(decode_json("   \n"), None);
        assert_eq!(decode_json("not json"), None);
        assert_eq!(decode_json("null"), None);
        assert_eq!(
            decode_json("{\"id\":\"abc\"}\n"),
            Some(serde_json::json!({"id": "abc"}))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_captures_output() {
        let runner = ProcessRunner::new("/bin/sh");
        let argv: Vec<String> = vec![
            "-c".into(),
            "echo '{\"id\":\"abc123\"}'; echo 'warn' >&2; exit 3".into(),
        ];
        let output = runner.run(&argv, true).await.unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, 3);
        assert_eq!(output.json, Some(serde_json::json!({"id": "abc123"})));
        assert_eq!(output.stderr_tail, "warn");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_env_is_exact() {
        let mut env = BTreeMap::new();
        env.insert("SMOKE_MARKER".to_string(), "present".to_string());
        let runner = ProcessRunner::new("/bin/sh").env(env);
        let argv: Vec<String> = vec![
            "-c".into(),
            "printf '{\"marker\":\"%s\",\"home\":\"%s\"}' \"$SMOKE_MARKER\" \"$HOME\"".into(),
        ];
        let output = runner.run(&argv, true).await.unwrap();
        assert!(output.success);
        let json = output.json.unwrap();
        assert_eq!(json["marker"], "present");
        assert_eq!(json["home"], "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_skips_parse_when_not_requested() {
        let runner = ProcessRunner::new("/bin/sh");
        let argv: Vec<String> = vec!["-c".into(), "echo '{\"id\":\"x\"}'".into()];
        let output = runner.run(&argv, false).await.unwrap();
        assert!(output.success);
        assert_eq!(output.json, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_timeout() {
        let mut env = BTreeMap::new();
        if let Ok(path) = std::env::var("PATH") {
            env.insert("PATH".to_string(), path);
        }
        let runner = ProcessRunner::new("/bin/sh")
            .env(env)
            .timeout(Duration::from_millis(200));
        let argv: Vec<String> = vec!["-c".into(), "sleep 5".into()];
        let result = runner.run(&argv, false).await;
        match result {
            Err(e @ RunnerError::Timeout(_)) => {
                assert_eq!(e.to_string(), "Timed out after 200ms");
            }
            other => panic!("Expected timeout, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_passes_non_utf8_env() {
        use std::os::unix::ffi::OsStringExt;

        let env = vec![(
            OsString::from("SMOKE_RAW"),
            OsString::from_vec(vec![b'a', 0xff, b'b']),
        )];
        let runner = ProcessRunner::new("/bin/sh").env(env);
        let argv: Vec<String> = vec![
            "-c".into(),
            "printf '{\"len\":%s}' \"${#SMOKE_RAW}\"".into(),
        ];
        let output = runner.run(&argv, true).await.unwrap();
        assert!(output.success);
        assert!(output.json.unwrap()["len"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_process_runner_missing_binary() {
        let runner = ProcessRunner::new("/nonexistent/smoke-target");
        let result = runner.run(&[], false).await;
        assert!(matches!(result, Err(RunnerError::Spawn { .. })));
    }
}
