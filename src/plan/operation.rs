//! Operations against the target CLI and their effect classification
//!
//! The effect of an operation decides how the harness runs it:
//! - `Read` and `Lifecycle` operations run live
//! - `Destructive` operations only ever run under the CLI's `--dry-run` mode
//!
//! The `--dry-run` prefix is added when the invocation is rendered, never by
//! the catalogue author, so a destructive operation cannot be rendered
//! without it.

use serde::{Deserialize, Serialize};

use super::context::RunContext;
use super::template::{render_argv, ExpressionError};
use crate::engine::ledger::StepMode;

/// Global flag that asks the target CLI to validate and describe instead of acting
pub const DRY_RUN_FLAG: &str = "--dry-run";

/// Flag required by the target CLI before it accepts a mutating command
pub const CONFIRM_FLAG: &str = "--confirm";

/// What an operation does to backend state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// Side-effect free read
    Read,
    /// Mutation of a resource the harness created itself (create/update/delete)
    Lifecycle,
    /// Bulk, irreversible or externally visible mutation
    Destructive,
}

impl Effect {
    /// Execution mode for an operation whose dependencies are satisfied
    pub fn mode(self) -> StepMode {
        match self {
            Effect::Read | Effect::Lifecycle => StepMode::Live,
            Effect::Destructive => StepMode::Simulated,
        }
    }
}

/// A single invocation of the target CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Stable logical name, e.g. `leads.create`
    pub name: String,

    /// Argument vector template (without the binary)
    pub argv: Vec<String>,

    pub effect: Effect,

    /// Decode stdout as JSON
    #[serde(default)]
    pub parse_json: bool,
}

impl Operation {
    pub fn new(name: impl Into<String>, argv: &[&str], effect: Effect) -> Self {
        Self {
            name: name.into(),
            argv: argv.iter().map(|s| s.to_string()).collect(),
            effect,
            parse_json: false,
        }
    }

    pub fn read(name: impl Into<String>, argv: &[&str]) -> Self {
        Self::new(name, argv, Effect::Read)
    }

    pub fn lifecycle(name: impl Into<String>, argv: &[&str]) -> Self {
        Self::new(name, argv, Effect::Lifecycle)
    }

    pub fn destructive(name: impl Into<String>, argv: &[&str]) -> Self {
        Self::new(name, argv, Effect::Destructive)
    }

    /// Request JSON decoding of stdout
    pub fn parsed(mut self) -> Self {
        self.parse_json = true;
        self
    }

    pub fn mode(&self) -> StepMode {
        self.effect.mode()
    }

    /// Render the final argument vector for this operation
    pub fn invocation(&self, ctx: &RunContext) -> Result<Vec<String>, ExpressionError> {
        self.render(&self.argv, ctx)
    }

    /// Render an alternate template under this operation's effect
    pub fn render(&self, template: &[String], ctx: &RunContext) -> Result<Vec<String>, ExpressionError> {
        Ok(shape_invocation(self.effect, render_argv(template, ctx)?))
    }
}

/// Apply the effect-specific flags to a rendered argument vector
pub fn shape_invocation(effect: Effect, argv: Vec<String>) -> Vec<String> {
    if effect != Effect::Destructive {
        return argv;
    }

    let mut shaped = Vec::with_capacity(argv.len() + 3);
    shaped.push(DRY_RUN_FLAG.to_string());
    shaped.extend(argv.into_iter().filter(|arg| arg != DRY_RUN_FLAG));
    if !shaped.iter().any(|arg| arg == "--output" || arg.starts_with("--output=")) {
        shaped.push("--output".to_string());
        shaped.push("agent".to_string());
    }
    shaped
}
