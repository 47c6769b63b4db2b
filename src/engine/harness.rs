//! Stage execution
//!
//! One routine runs every stage of a [`Plan`]. For each step it:
//! - skips the step when a required binding is missing, unless the step has
//!   a fallback template whose bindings are all present
//! - renders the invocation; destructive operations get `--dry-run` here
//! - runs the target CLI and records the outcome, converting runner errors
//!   (spawn failures, timeouts) into failed outcomes
//! - applies the step's capture, recording a miss reason when nothing is found
//!
//! Deferred steps are collected while stages run and executed after the last
//! stage. No step outcome stops the run.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::error::HarnessError;
use super::ledger::{Ledger, SealedLedger, StepOutcome};
use super::report::RunReport;
use super::runner::CommandRunner;
use crate::plan::config::HarnessConfig;
use crate::plan::context::RunContext;
use crate::plan::operation::shape_invocation;
use crate::plan::stage::{Capture, Plan, Stage, Step};

/// Everything a finished run produced
#[derive(Debug)]
pub struct RunOutcome {
    pub ledger: SealedLedger,

    /// Parsed output of the first step of the first stage
    pub baseline: Option<Value>,

    /// Final bindings and miss reasons
    pub context: RunContext,
}

struct RunState {
    ctx: RunContext,
    ledger: Ledger,
    baseline: Option<Value>,
}

/// Runs a plan against a [`CommandRunner`]
pub struct Harness<R> {
    runner: R,
    plan: Plan,
    filter: Option<String>,
}

impl<R: CommandRunner> Harness<R> {
    pub fn new(runner: R, plan: Plan) -> Self {
        Self {
            runner,
            plan,
            filter: None,
        }
    }

    /// Only run stages whose name starts with `prefix`
    pub fn filter(mut self, prefix: Option<String>) -> Self {
        self.filter = prefix;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    #[instrument(skip_all, fields(run_id = %ctx.run_id))]
    pub async fn run(&self, ctx: RunContext) -> RunOutcome {
        info!(
            binary = %self.runner.target(),
            stages = self.plan.stages.len(),
            "Starting smoke run"
        );

        let mut state = RunState {
            ctx,
            ledger: Ledger::new(),
            baseline: None,
        };
        let mut deferred: Vec<&Step> = Vec::new();

        for (index, stage) in self.plan.stages.iter().enumerate() {
            if !stage.matches(self.filter.as_deref()) {
                debug!(stage = %stage.name, "Stage not selected");
                continue;
            }
            let held = self.execute_stage(stage, index == 0, &mut state).await;
            deferred.extend(held);
        }

        if !deferred.is_empty() {
            info!(count = deferred.len(), "Running deferred steps");
        }
        for step in deferred {
            self.execute_step(step, &mut state).await;
        }

        let ledger = state.ledger.seal();
        info!(
            steps = ledger.len(),
            failed = ledger.steps().iter().filter(|s| s.is_failure()).count(),
            "Smoke run finished"
        );

        RunOutcome {
            ledger,
            baseline: state.baseline,
            context: state.ctx,
        }
    }

    /// Run the non-deferred steps of one stage; returns the deferred ones
    #[instrument(skip_all, fields(stage = %stage.name))]
    async fn execute_stage<'p>(
        &'p self,
        stage: &'p Stage,
        is_first: bool,
        state: &mut RunState,
    ) -> Vec<&'p Step> {
        let mut deferred = Vec::new();

        for (position, step) in stage.steps.iter().enumerate() {
            if step.deferred {
                debug!(step = step.name(), "Deferring step");
                deferred.push(step);
                continue;
            }
            let index = self.execute_step(step, state).await;
            if is_first && position == 0 {
                state.baseline = state
                    .ledger
                    .get(index)
                    .and_then(|outcome| outcome.parsed_output.clone());
            }
        }

        deferred
    }

    /// Run or skip one step; returns its ledger position
    async fn execute_step(&self, step: &Step, state: &mut RunState) -> usize {
        let name = step.name();

        let template = match first_missing(step.requirements(), &state.ctx) {
            None => &step.operation.argv,
            Some(binding) => match &step.fallback {
                Some(fallback)
                    if first_missing(step.fallback_requirements(), &state.ctx).is_none() =>
                {
                    debug!(step = name, binding = %binding, "Using fallback invocation");
                    fallback
                }
                _ => {
                    let note = state.ctx.miss_note(&binding);
                    info!(step = name, note = %note, "Skipping step");
                    if let Some(capture) = &step.capture {
                        state
                            .ctx
                            .miss(&capture.binding, format!("{} ({})", capture.miss_note, note));
                    }
                    return state.ledger.record(StepOutcome::skipped(name, note));
                }
            },
        };

        let mode = step.operation.mode();
        let invocation = match step.operation.render(template, &state.ctx) {
            Ok(argv) => argv,
            Err(e) => {
                warn!(step = name, error = %e, "Could not render invocation");
                let argv = shape_invocation(step.operation.effect, template.clone());
                let outcome = StepOutcome::aborted(name, argv, mode, 0.0, e.to_string());
                return self.finish(step, outcome, state);
            }
        };

        debug!(step = name, mode = mode.as_str(), argv = ?invocation, "Running step");
        let started = Instant::now();
        let outcome = match self.runner.run(&invocation, step.wants_json()).await {
            Ok(output) => StepOutcome::executed(name, invocation, mode, output),
            Err(e) => {
                warn!(step = name, error = %e, "Invocation did not complete");
                StepOutcome::aborted(
                    name,
                    invocation,
                    mode,
                    started.elapsed().as_secs_f64(),
                    e.to_string(),
                )
            }
        };

        if outcome.succeeded {
            info!(
                step = name,
                mode = mode.as_str(),
                seconds = outcome.duration_seconds,
                "Step passed"
            );
        } else {
            warn!(
                step = name,
                mode = mode.as_str(),
                rc = outcome.exit_code,
                "Step failed"
            );
        }

        self.finish(step, outcome, state)
    }

    fn finish(&self, step: &Step, outcome: StepOutcome, state: &mut RunState) -> usize {
        if let Some(capture) = &step.capture {
            apply_capture(capture, outcome.parsed_output.as_ref(), &mut state.ctx);
        }
        state.ledger.record(outcome)
    }
}

fn first_missing(names: BTreeSet<String>, ctx: &RunContext) -> Option<String> {
    names.into_iter().find(|name| ctx.get(name).is_none())
}

fn apply_capture(capture: &Capture, parsed: Option<&Value>, ctx: &mut RunContext) {
    match parsed.and_then(|value| capture.extractor.extract(value)) {
        Some(value) => {
            debug!(binding = %capture.binding, value = %value, "Captured value");
            ctx.bind(&capture.binding, value);
        }
        None => {
            info!(
                binding = %capture.binding,
                extractor = capture.extractor.describe(),
                "Nothing to capture"
            );
            ctx.miss(&capture.binding, capture.miss_note.clone());
        }
    }
}

/// Fail unless the credential variable holds a non-blank value.
///
/// The value itself is never logged or returned.
pub fn precheck(config: &HarnessConfig, env: &BTreeMap<String, String>) -> Result<(), HarnessError> {
    if config.has_credential(env) {
        Ok(())
    } else {
        Err(HarnessError::MissingCredential(config.credential_env.clone()))
    }
}

/// Run a whole smoke test and persist its report.
///
/// Checks the credential and the plan before any invocation; nothing is
/// spawned and no report is written when either check fails.
pub async fn execute<R: CommandRunner>(
    config: &HarnessConfig,
    env: &BTreeMap<String, String>,
    runner: R,
    plan: Plan,
) -> Result<RunReport, HarnessError> {
    precheck(config, env)?;
    plan.validate()?;

    let harness = Harness::new(runner, plan).filter(config.filter.clone());
    let outcome = harness.run(RunContext::new()).await;

    let report = RunReport::build(
        harness.runner().target(),
        &outcome.ledger,
        outcome.baseline,
        Utc::now(),
    );
    report.write(&config.report_path)?;
    info!(path = %config.report_path.display(), "Report written");

    Ok(report)
}
