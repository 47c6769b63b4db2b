//! Step outcomes and the append-only run ledger

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::runner::CommandOutput;

/// How a step was executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepMode {
    /// Executed with real effect on the backend
    #[serde(rename = "live")]
    Live,
    /// Executed under the CLI's `--dry-run` mode
    #[serde(rename = "dry_run")]
    Simulated,
    /// Not attempted because a required input was missing
    #[serde(rename = "skip")]
    Skipped,
}

impl StepMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepMode::Live => "live",
            StepMode::Simulated => "dry_run",
            StepMode::Skipped => "skip",
        }
    }
}

/// Record of one attempted or skipped operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub name: String,

    /// Literal arguments passed to the target CLI (empty when skipped)
    #[serde(rename = "argv")]
    pub invocation: Vec<String>,

    pub mode: StepMode,

    #[serde(rename = "ok")]
    pub succeeded: bool,

    #[serde(rename = "rc")]
    pub exit_code: i32,

    #[serde(rename = "seconds")]
    pub duration_seconds: f64,

    /// Why the step was skipped
    #[serde(default)]
    pub note: String,

    /// Decoded stdout, when requested and decodable
    #[serde(rename = "stdout_json", default, skip_serializing_if = "Option::is_none")]
    pub parsed_output: Option<Value>,

    #[serde(rename = "stderr_tail", default)]
    pub error_excerpt: String,
}

impl StepOutcome {
    /// A step that was not attempted; skipping is never a failure
    pub fn skipped(name: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            invocation: Vec::new(),
            mode: StepMode::Skipped,
            succeeded: true,
            exit_code: 0,
            duration_seconds: 0.0,
            note: note.into(),
            parsed_output: None,
            error_excerpt: String::new(),
        }
    }

    /// A step whose subprocess ran to completion (successfully or not)
    pub fn executed(
        name: impl Into<String>,
        invocation: Vec<String>,
        mode: StepMode,
        output: CommandOutput,
    ) -> Self {
        Self {
            name: name.into(),
            invocation,
            mode,
            succeeded: output.success,
            exit_code: output.exit_code,
            duration_seconds: output.seconds,
            note: String::new(),
            parsed_output: output.json,
            error_excerpt: output.stderr_tail,
        }
    }

    /// A step whose subprocess could not be completed (spawn failure, timeout)
    pub fn aborted(
        name: impl Into<String>,
        invocation: Vec<String>,
        mode: StepMode,
        seconds: f64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            invocation,
            mode,
            succeeded: false,
            exit_code: -1,
            duration_seconds: seconds,
            note: String::new(),
            parsed_output: None,
            error_excerpt: error.into(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.mode == StepMode::Skipped
    }

    pub fn is_failure(&self) -> bool {
        !self.succeeded
    }
}

/// Ordered, append-only record of a run
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Vec<StepOutcome>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an outcome; returns its position in execution order
    pub fn record(&mut self, outcome: StepOutcome) -> usize {
        self.entries.push(outcome);
        self.entries.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&StepOutcome> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepOutcome> {
        self.entries.iter()
    }

    /// Close the ledger; nothing can be appended afterwards
    pub fn seal(self) -> SealedLedger {
        SealedLedger {
            entries: self.entries,
        }
    }
}

/// Read-only ledger handed to the report builder
#[derive(Debug, Clone, Default)]
pub struct SealedLedger {
    entries: Vec<StepOutcome>,
}

impl SealedLedger {
    pub fn steps(&self) -> &[StepOutcome] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First step with the given name
    pub fn find(&self, name: &str) -> Option<&StepOutcome> {
        self.entries.iter().find(|s| s.name == name)
    }
}
