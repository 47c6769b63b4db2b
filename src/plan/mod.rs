//! Declarative definitions of what a smoke run does
//!
//! This module contains:
//! - `operation` - A single CLI invocation and its effect classification
//! - `stage` - Stages, steps, captures and the plan they form
//! - `extract` - Heuristic id/email extractors over decoded output
//! - `template` - `${{ }}` substitution in argument templates
//! - `context` - Values discovered during a run
//! - `catalog` - The built-in plan for the `instantly` CLI
//! - `config` - Harness configuration from file, environment and flags

pub mod catalog;
pub mod config;
pub mod context;
pub mod extract;
pub mod operation;
pub mod stage;
pub mod template;

pub use config::{ConfigError, EnvConfig, HarnessConfig, Overrides};
pub use context::RunContext;
pub use extract::{find_first_email, find_first_id, find_member_id, Extractor};
pub use operation::{shape_invocation, Effect, Operation, CONFIRM_FLAG, DRY_RUN_FLAG};
pub use stage::{Capture, Plan, PlanDefect, Stage, Step};
pub use template::{evaluate as evaluate_expression, ExpressionError};
