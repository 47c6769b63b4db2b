//! Stages, steps and the plan they form
//!
//! A stage groups the steps for one resource family. Steps chain through
//! named bindings:
//! - a step with a `capture` writes a binding from its parsed output
//! - a step referencing `${{ vars.NAME }}` requires that binding and is
//!   skipped (or switched to its `fallback`) when it is missing
//! - a `deferred` step is held back until every stage has run

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::extract::Extractor;
use super::operation::Operation;
use super::template::{check_argv, referenced_vars, ExpressionError};

/// Value captured from a step's parsed output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    /// Binding name, referenced later as `vars.<binding>`
    pub binding: String,

    pub extractor: Extractor,

    /// Recorded as the skip reason for dependents when nothing is found
    pub miss_note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub operation: Operation,

    /// Bindings required in addition to those referenced by the argv template
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture: Option<Capture>,

    /// Argv template used instead of skipping when requirements are missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Vec<String>>,

    /// Run after every stage has finished
    #[serde(default)]
    pub deferred: bool,
}

impl Step {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            requires: Vec::new(),
            capture: None,
            fallback: None,
            deferred: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.operation.name
    }

    pub fn capture(
        mut self,
        binding: impl Into<String>,
        extractor: Extractor,
        miss_note: impl Into<String>,
    ) -> Self {
        self.capture = Some(Capture {
            binding: binding.into(),
            extractor,
            miss_note: miss_note.into(),
        });
        self
    }

    pub fn requires(mut self, binding: impl Into<String>) -> Self {
        self.requires.push(binding.into());
        self
    }

    pub fn fallback(mut self, argv: &[&str]) -> Self {
        self.fallback = Some(argv.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }

    /// Every binding the primary argv needs
    pub fn requirements(&self) -> BTreeSet<String> {
        let mut names = referenced_vars(&self.operation.argv);
        names.extend(self.requires.iter().cloned());
        names
    }

    /// Bindings the fallback argv needs
    pub fn fallback_requirements(&self) -> BTreeSet<String> {
        self.fallback
            .as_deref()
            .map(referenced_vars)
            .unwrap_or_default()
    }

    /// Parse stdout when the operation asks for it or a capture needs it
    pub fn wants_json(&self) -> bool {
        self.operation.parse_json || self.capture.is_some()
    }
}

impl From<Operation> for Step {
    fn from(operation: Operation) -> Self {
        Step::new(operation)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Stage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: impl Into<Step>) -> Self {
        self.steps.push(step.into());
        self
    }

    /// Whether this stage is selected by a name-prefix filter
    pub fn matches(&self, filter: Option<&str>) -> bool {
        filter.map_or(true, |prefix| self.name.starts_with(prefix))
    }
}

/// Ordered sequence of stages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub stages: Vec<Stage>,
}

/// A step whose template cannot work
#[derive(Debug)]
pub struct PlanDefect {
    pub step: String,
    pub error: ExpressionError,
}

impl Plan {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn steps(&self) -> impl Iterator<Item = (&Stage, &Step)> {
        self.stages
            .iter()
            .flat_map(|stage| stage.steps.iter().map(move |step| (stage, step)))
    }

    pub fn step_count(&self) -> usize {
        self.stages.iter().map(|s| s.steps.len()).sum()
    }

    /// Check every template in execution order.
    ///
    /// Each expression must be well formed, and every binding a step needs
    /// must be captured by a step that runs before it (deferred steps run
    /// after all stages).
    pub fn validate(&self) -> Result<(), PlanDefect> {
        let mut captured: BTreeSet<String> = BTreeSet::new();
        let mut deferred: Vec<&Step> = Vec::new();

        for (_, step) in self.steps() {
            if step.deferred {
                deferred.push(step);
                continue;
            }
            check_step(step, &captured)?;
            if let Some(capture) = &step.capture {
                captured.insert(capture.binding.clone());
            }
        }
        for step in deferred {
            check_step(step, &captured)?;
            if let Some(capture) = &step.capture {
                captured.insert(capture.binding.clone());
            }
        }
        Ok(())
    }
}

fn check_step(step: &Step, captured: &BTreeSet<String>) -> Result<(), PlanDefect> {
    let defect = |error| PlanDefect {
        step: step.name().to_string(),
        error,
    };

    check_argv(&step.operation.argv).map_err(defect)?;
    if let Some(fallback) = &step.fallback {
        check_argv(fallback).map_err(defect)?;
    }

    let needed = step
        .requirements()
        .into_iter()
        .chain(step.fallback_requirements());
    for name in needed {
        if !captured.contains(&name) {
            return Err(defect(ExpressionError::UnknownVariable(format!(
                "vars.{}",
                name
            ))));
        }
    }
    Ok(())
}
