//! Run context for argument templates
//!
//! Holds the values discovered so far in a run (captured ids and emails), the
//! reason each missing value could not be discovered, and the per-run
//! uniqueness token used to name harness-created resources.

use std::collections::BTreeMap;

/// Runtime context threaded through every stage of a run
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// Captured values (binding name -> value)
    pub vars: BTreeMap<String, String>,

    /// Why a binding is missing (binding name -> note)
    pub misses: BTreeMap<String, String>,

    /// Uniqueness token (UTC unix seconds at run start)
    pub stamp: i64,

    /// Run ID
    pub run_id: String,
}

impl RunContext {
    /// Create a new context with a generated run ID and the current time as stamp
    pub fn new() -> Self {
        Self::with_stamp(chrono::Utc::now().timestamp())
    }

    /// Create a context with a fixed uniqueness token (for tests and replays)
    pub fn with_stamp(stamp: i64) -> Self {
        Self {
            stamp,
            run_id: uuid::Uuid::new_v4().to_string(),
            ..Default::default()
        }
    }

    /// Record a captured value, clearing any earlier miss for the same binding
    pub fn bind(&mut self, name: &str, value: String) {
        self.misses.remove(name);
        self.vars.insert(name.to_string(), value);
    }

    /// Record that a binding could not be discovered
    pub fn miss(&mut self, name: &str, note: impl Into<String>) {
        self.vars.remove(name);
        self.misses.insert(name.to_string(), note.into());
    }

    pub fn get(&self, name: &str) -> Option<&String> {
        self.vars.get(name)
    }

    /// Explanation for a missing binding; falls back to a generic note when
    /// the capturing step never ran.
    pub fn miss_note(&self, name: &str) -> String {
        self.misses
            .get(name)
            .cloned()
            .unwrap_or_else(|| format!("no {} available", name.replace('_', " ")))
    }

    /// Email used for the disposable lead created by the harness
    pub fn lead_email(&self) -> String {
        format!("smoke+{}@example.com", self.stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context() {
        let ctx = RunContext::new();
        assert!(!ctx.run_id.is_empty());
        assert!(ctx.stamp > 0);
    }

    #[test]
    fn test_bind_and_miss() {
        let mut ctx = RunContext::with_stamp(1);
        ctx.miss("campaign_id", "no campaign id found from campaigns list");
        assert_eq!(ctx.get("campaign_id"), None);
        assert_eq!(
            ctx.miss_note("campaign_id"),
            "no campaign id found from campaigns list"
        );

        ctx.bind("campaign_id", "c1".to_string());
        assert_eq!(ctx.get("campaign_id"), Some(&"c1".to_string()));
        assert!(!ctx.misses.contains_key("campaign_id"));
    }

    #[test]
    fn test_generic_miss_note() {
        let ctx = RunContext::with_stamp(1);
        assert_eq!(ctx.miss_note("sender_email"), "no sender email available");
    }

    #[test]
    fn test_lead_email_uses_stamp() {
        let ctx = RunContext::with_stamp(1700000000);
        assert_eq!(ctx.lead_email(), "smoke+1700000000@example.com");
    }
}
