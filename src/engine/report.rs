//! Run report, summary line and exit status

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::HarnessError;
use super::ledger::{SealedLedger, StepOutcome};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_STEP_FAILED: u8 = 1;
pub const EXIT_MISSING_CREDENTIAL: u8 = 2;
pub const EXIT_FATAL: u8 = 3;

/// Format of the report timestamp (UTC)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub total: usize,
    /// Succeeded and not skipped
    pub ok: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Counts {
    pub fn tally(steps: &[StepOutcome]) -> Self {
        steps.iter().fold(
            Counts {
                total: steps.len(),
                ..Default::default()
            },
            |mut counts, step| {
                if step.is_skipped() {
                    counts.skipped += 1;
                } else if step.succeeded {
                    counts.ok += 1;
                }
                if step.is_failure() {
                    counts.failed += 1;
                }
                counts
            },
        )
    }
}

/// Persisted report for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Target binary
    pub bin: String,

    /// Completion time, see [`TIMESTAMP_FORMAT`]
    pub ts: String,

    /// Parsed output of the first step of the first stage
    pub workspace: Option<Value>,

    pub counts: Counts,

    /// Every step outcome in execution order
    pub results: Vec<StepOutcome>,
}

#[derive(Serialize)]
struct Summary<'a> {
    report: String,
    counts: &'a Counts,
}

impl RunReport {
    pub fn build(
        bin: impl Into<String>,
        ledger: &SealedLedger,
        baseline: Option<Value>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            bin: bin.into(),
            ts: finished_at.format(TIMESTAMP_FORMAT).to_string(),
            workspace: baseline,
            counts: Counts::tally(ledger.steps()),
            results: ledger.steps().to_vec(),
        }
    }

    pub fn to_json(&self) -> Result<String, HarnessError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report in a single call
    pub fn write(&self, path: &Path) -> Result<(), HarnessError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| HarnessError::ReportWrite {
            path: path.display().to_string(),
            source,
        })
    }

    /// One-line summary for stdout: report path and counts
    pub fn summary_line(&self, path: &Path) -> Result<String, HarnessError> {
        let summary = Summary {
            report: path.display().to_string(),
            counts: &self.counts,
        };
        Ok(serde_json::to_string(&summary)?)
    }

    pub fn exit_code(&self) -> u8 {
        if self.counts.failed > 0 {
            EXIT_STEP_FAILED
        } else {
            EXIT_SUCCESS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ledger::{Ledger, StepMode};
    use crate::engine::runner::CommandOutput;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn output(success: bool) -> CommandOutput {
        CommandOutput {
            success,
            exit_code: if success { 0 } else { 1 },
            seconds: 0.5,
            json: None,
            stderr_tail: String::new(),
        }
    }

    fn sample_ledger() -> SealedLedger {
        let mut ledger = Ledger::new();
        ledger.record(StepOutcome::executed(
            "campaigns.list",
            vec!["campaigns".into(), "list".into()],
            StepMode::Live,
            output(true),
        ));
        ledger.record(StepOutcome::skipped(
            "campaigns.get",
            "no campaign id found from campaigns list",
        ));
        ledger.record(StepOutcome::executed(
            "leads.bulk-delete",
            vec!["--dry-run".into(), "leads".into(), "bulk-delete".into()],
            StepMode::Simulated,
            output(false),
        ));
        ledger.seal()
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap()
    }

    #[test]
    fn test_counts() {
        let counts = Counts::tally(sample_ledger().steps());
        assert_eq!(
            counts,
            Counts {
                total: 3,
                ok: 1,
                failed: 1,
                skipped: 1
            }
        );
    }

    #[test]
    fn test_fully_skipped_run_has_no_ok() {
        let mut ledger = Ledger::new();
        ledger.record(StepOutcome::skipped("a.get", "no a"));
        ledger.record(StepOutcome::skipped("b.get", "no b"));
        let report = RunReport::build("instantly", &ledger.seal(), None, at());
        assert_eq!(report.counts.ok, 0);
        assert_eq!(report.counts.skipped, 2);
        assert_eq!(report.exit_code(), EXIT_SUCCESS);
    }

    #[test]
    fn test_report_shape() {
        let report = RunReport::build("/usr/bin/instantly", &sample_ledger(), None, at());
        assert_eq!(report.ts, "2026-03-04T05:06:07Z");
        assert_eq!(report.exit_code(), EXIT_STEP_FAILED);

        let json: Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["bin"], "/usr/bin/instantly");
        assert!(json["workspace"].is_null());
        assert_eq!(json["counts"]["total"], 3);
        assert_eq!(json["results"][1]["mode"], "skip");
        assert_eq!(json["results"][2]["mode"], "dry_run");
        assert_eq!(json["results"][2]["argv"][0], "--dry-run");
    }

    #[test]
    fn test_build_is_deterministic() {
        let ledger = sample_ledger();
        let first = RunReport::build("instantly", &ledger, None, at());
        let second = RunReport::build("instantly", &ledger, None, at());
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }

    #[test]
    fn test_write_and_summary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = RunReport::build("instantly", &sample_ledger(), None, at());
        report.write(&path).unwrap();

        let written: RunReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.results, report.results);

        let line = report.summary_line(&path).unwrap();
        assert!(!line.contains('\n'));
        let summary: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(summary["report"], path.display().to_string());
        assert_eq!(summary["counts"]["failed"], 1);
    }

    #[test]
    fn test_write_to_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("report.json");
        let report = RunReport::build("instantly", &sample_ledger(), None, at());
        assert!(matches!(
            report.write(&path),
            Err(HarnessError::ReportWrite { .. })
        ));
    }
}
