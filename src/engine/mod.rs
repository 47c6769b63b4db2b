//! Smoke-run execution engine
//!
//! This module contains:
//! - `runner` - Spawns the target CLI and reduces its output
//! - `ledger` - Step outcomes and the append-only run ledger
//! - `harness` - Runs a plan stage by stage, chaining captured values
//! - `report` - Counts, the persisted report and the exit status
//! - `error` - Runner and harness error types

pub mod error;
pub mod harness;
pub mod ledger;
pub mod report;
pub mod runner;

pub use error::{HarnessError, RunnerError};
pub use harness::{execute, precheck, Harness, RunOutcome};
pub use ledger::{Ledger, SealedLedger, StepMode, StepOutcome};
pub use report::{
    Counts, RunReport, EXIT_FATAL, EXIT_MISSING_CREDENTIAL, EXIT_STEP_FAILED, EXIT_SUCCESS,
};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner, DEFAULT_TIMEOUT, STDERR_TAIL_CHARS};
