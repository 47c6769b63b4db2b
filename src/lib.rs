//! # Smoke Run
//!
//! A best-effort end-to-end smoke harness for the `instantly` CLI. It runs
//! every operation of the CLI against a live backend with real credentials,
//! chaining ids discovered by earlier steps into later ones, and writes an
//! ordered JSON report of what passed, failed and was skipped.
//!
//! ## Safety
//!
//! - **Reads** run live
//! - **Lifecycle** operations (create/update/delete of resources the harness
//!   created itself) run live
//! - **Destructive** operations only ever run with `--dry-run`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use smoke_run::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let env: BTreeMap<String, String> = std::env::vars().collect();
//!     let config = HarnessConfig::resolve(None, &env, Overrides::default())?;
//!
//!     let runner = ProcessRunner::new(config.resolve_binary()?)
//!         .env(config.child_env(&env))
//!         .timeout(config.timeout());
//!
//!     let report = execute(&config, &env, runner, catalog::instantly()).await?;
//!     println!("failed steps: {}", report.counts.failed);
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod plan;

// Re-export main types
pub use engine::{
    execute, precheck, CommandOutput, CommandRunner, Counts, Harness, HarnessError, Ledger,
    ProcessRunner, RunOutcome, RunReport, RunnerError, SealedLedger, StepMode, StepOutcome,
};
pub use plan::{
    catalog, ConfigError, Effect, Extractor, HarnessConfig, Operation, Overrides, Plan,
    RunContext, Stage, Step,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::engine::{
        execute, precheck, CommandRunner, Harness, HarnessError, ProcessRunner, RunReport,
        StepMode, StepOutcome,
    };
    pub use crate::plan::{
        catalog, Effect, Extractor, HarnessConfig, Operation, Overrides, Plan, RunContext, Stage,
        Step,
    };
}
