//! Built-in plan for the `instantly` CLI
//!
//! One stage per resource family. Destructive operations are listed without
//! `--dry-run`; it is added when the invocation is rendered. `--confirm` is
//! listed only on commands that define it.

use super::extract::Extractor;
use super::operation::Operation;
use super::stage::{Plan, Stage, Step};

/// Role whose membership cannot always be fetched directly
pub const OWNER_ROLE: &str = "owner";

const WARMUP_START: &str = "2026-01-01";
const WARMUP_END: &str = "2026-01-31";
const SMOKE_DATA: &str = r#"{"_smoke":true}"#;

/// The full plan, in execution order
pub fn instantly() -> Plan {
    Plan::new(vec![
        workspace(),
        oauth(),
        accounts(),
        campaigns(),
        lead_lists(),
        leads(),
        emails(),
        webhooks(),
        webhook_events(),
        custom_tags(),
        block_list_entries(),
        lead_labels(),
        subsequences(),
        inbox_placement(),
        jobs(),
        crm_actions(),
        dfy_orders(),
        supersearch_enrichment(),
        account_campaign_mappings(),
        workspace_members(),
        raw_api(),
    ])
}

fn workspace() -> Stage {
    Stage::new("workspace")
        .step(
            Operation::read("workspaces.current.get", &["workspaces", "current", "get"]).parsed(),
        )
        .step(Operation::read(
            "workspace-billing.plan-details",
            &["workspace-billing", "plan-details"],
        ))
        .step(Operation::read(
            "workspace-billing.subscription-details",
            &["workspace-billing", "subscription-details"],
        ))
        .step(Operation::read(
            "audit-logs.list",
            &["audit-logs", "list", "--limit", "1"],
        ))
}

fn oauth() -> Stage {
    Stage::new("oauth")
        .step(Operation::destructive(
            "oauth.google-init",
            &["oauth", "google-init"],
        ))
        .step(Operation::destructive(
            "oauth.microsoft-init",
            &["oauth", "microsoft-init"],
        ))
        .step(Operation::destructive(
            "oauth.session-status",
            &["oauth", "session-status", "SESSION_ID"],
        ))
}

fn accounts() -> Stage {
    Stage::new("accounts")
        .step(
            Step::new(Operation::read(
                "accounts.list",
                &["accounts", "list", "--limit", "1"],
            ))
            .capture(
                "sender_email",
                Extractor::Email,
                "no account email found from accounts list",
            ),
        )
        .step(Operation::read(
            "accounts.get",
            &["accounts", "get", "${{ vars.sender_email }}"],
        ))
        .step(
            Step::new(Operation::read(
                "accounts.analytics-daily",
                &["accounts", "analytics-daily", "--limit", "1"],
            ))
            .requires("sender_email"),
        )
        .step(Operation::destructive(
            "accounts.warmup-enable",
            &["accounts", "warmup-enable", "${{ vars.sender_email }}"],
        ))
        .step(Operation::destructive(
            "accounts.warmup-disable",
            &["accounts", "warmup-disable", "${{ vars.sender_email }}"],
        ))
        .step(Operation::destructive(
            "accounts.test-vitals",
            &["accounts", "test-vitals", "${{ vars.sender_email }}"],
        ))
}

fn campaigns() -> Stage {
    Stage::new("campaigns")
        .step(
            Step::new(Operation::read(
                "campaigns.list",
                &["campaigns", "list", "--limit", "1"],
            ))
            .capture(
                "campaign_id",
                Extractor::Id,
                "no campaign id found from campaigns list",
            ),
        )
        .step(Operation::read(
            "campaigns.get",
            &["campaigns", "get", "${{ vars.campaign_id }}"],
        ))
        .step(Operation::destructive(
            "campaigns.activate",
            &["campaigns", "activate", "${{ vars.campaign_id }}"],
        ))
        .step(Operation::destructive(
            "campaigns.pause",
            &["campaigns", "pause", "${{ vars.campaign_id }}"],
        ))
        .step(Operation::read(
            "campaigns.analytics-overview",
            &[
                "campaigns",
                "analytics-overview",
                "--query",
                "campaign_id=${{ vars.campaign_id }}",
            ],
        ))
        .step(Operation::read(
            "campaigns.analytics-steps",
            &[
                "campaigns",
                "analytics-steps",
                "--query",
                "campaign_id=${{ vars.campaign_id }}",
            ],
        ))
        .step(Operation::read(
            "campaigns.search-by-contact",
            &["campaigns", "search-by-contact", "test@example.com"],
        ))
        .step(
            Step::new(Operation::read(
                "analytics.campaign",
                &["analytics", "campaign", "--campaign-id", "${{ vars.campaign_id }}"],
            ))
            .fallback(&["analytics", "campaign"]),
        )
        .step(
            Step::new(Operation::read(
                "analytics.daily",
                &["analytics", "daily", "--campaign-id", "${{ vars.campaign_id }}"],
            ))
            .fallback(&["analytics", "daily"]),
        )
        .step(Operation::read(
            "analytics.warmup",
            &[
                "analytics",
                "warmup",
                "--email",
                "${{ vars.sender_email }}",
                "--start-date",
                WARMUP_START,
                "--end-date",
                WARMUP_END,
            ],
        ))
}

fn lead_lists() -> Stage {
    Stage::new("lead-lists")
        .step(
            Step::new(Operation::lifecycle(
                "lead-lists.create",
                &["lead-lists", "create", "--name", "smoke-${{ run.stamp }}"],
            ))
            .capture(
                "lead_list_id",
                Extractor::Id,
                "lead-lists create did not return an id",
            ),
        )
        .step(Operation::read(
            "lead-lists.get",
            &["lead-lists", "get", "${{ vars.lead_list_id }}"],
        ))
        .step(Operation::lifecycle(
            "lead-lists.update",
            &[
                "lead-lists",
                "update",
                "${{ vars.lead_list_id }}",
                "--name",
                "smoke-updated-${{ run.stamp }}",
            ],
        ))
        .step(Operation::read(
            "lead-lists.verification-stats",
            &["lead-lists", "verification-stats", "${{ vars.lead_list_id }}"],
        ))
        .step(Operation::read(
            "lead-lists.list",
            &["lead-lists", "list", "--limit", "1"],
        ))
        .step(
            Step::new(Operation::lifecycle(
                "lead-lists.delete",
                &["lead-lists", "delete", "--confirm", "${{ vars.lead_list_id }}"],
            ))
            .deferred(),
        )
}

fn leads() -> Stage {
    Stage::new("leads")
        .step(
            Step::new(Operation::lifecycle(
                "leads.create",
                &["leads", "create", "--email", "${{ run.lead_email }}"],
            ))
            .capture("lead_id", Extractor::Id, "leads create did not return an id"),
        )
        .step(Operation::read(
            "leads.list",
            &["leads", "list", "--limit", "1"],
        ))
        .step(Operation::read(
            "leads.get",
            &["leads", "get", "${{ vars.lead_id }}"],
        ))
        .step(Operation::lifecycle(
            "leads.update",
            &["leads", "update", "${{ vars.lead_id }}", "--first-name", "Smoke"],
        ))
        .step(Operation::lifecycle(
            "leads.delete",
            &["leads", "delete", "--confirm", "${{ vars.lead_id }}"],
        ))
        .step(Operation::destructive(
            "leads.bulk-delete",
            &[
                "leads",
                "bulk-delete",
                "--confirm",
                "--query",
                "email=${{ run.lead_email }}",
            ],
        ))
        .step(Operation::destructive(
            "leads.merge",
            &[
                "leads",
                "merge",
                "--confirm",
                "--data-json",
                r#"{"source_lead_id":"A","target_lead_id":"B"}"#,
            ],
        ))
        .step(Operation::destructive(
            "leads.update-interest-status",
            &[
                "leads",
                "update-interest-status",
                "--confirm",
                "--data-json",
                r#"{"lead_id":"A","lt_interest_status":1}"#,
            ],
        ))
}

fn emails() -> Stage {
    Stage::new("emails")
        .step(
            Step::new(Operation::read("emails.list", &["emails", "list", "--limit", "1"]))
                .capture("email_id", Extractor::Id, "no email id found from emails list"),
        )
        .step(Operation::read("emails.unread-count", &["emails", "unread-count"]))
        .step(Operation::read(
            "emails.get",
            &["emails", "get", "${{ vars.email_id }}"],
        ))
        .step(Operation::destructive(
            "emails.update",
            &[
                "emails",
                "update",
                "${{ vars.email_id }}",
                "--data-json",
                r#"{"marked_as_done":true}"#,
            ],
        ))
        .step(Operation::destructive(
            "emails.delete",
            &["emails", "delete", "--confirm", "${{ vars.email_id }}"],
        ))
        .step(Operation::destructive(
            "emails.reply",
            &[
                "emails",
                "reply",
                "--confirm",
                "--reply-to",
                "someone@example.com",
                "--eaccount",
                "${{ vars.sender_email }}",
                "--subject",
                "Smoke",
                "--text",
                "Smoke",
            ],
        ))
        .step(Operation::destructive(
            "emails.forward",
            &[
                "emails",
                "forward",
                "--confirm",
                "--data-json",
                r#"{"email_id":"EID","to":["someone@example.com"]}"#,
            ],
        ))
        .step(Operation::read(
            "emails.verify",
            &[
                "emails",
                "verify",
                "--email",
                "test@example.com",
                "--max-wait",
                "0s",
            ],
        ))
}

fn webhooks() -> Stage {
    Stage::new("webhooks")
        .step(
            Step::new(Operation::lifecycle(
                "webhooks.create",
                &[
                    "webhooks",
                    "create",
                    "--target-url",
                    "https://example.com/webhook",
                    "--event-type",
                    "all_events",
                ],
            ))
            .capture("webhook_id", Extractor::Id, "webhooks create did not return an id"),
        )
        .step(Operation::read(
            "webhooks.list",
            &["webhooks", "list", "--limit", "1"],
        ))
        .step(Operation::read(
            "webhooks.get",
            &["webhooks", "get", "${{ vars.webhook_id }}"],
        ))
        .step(Operation::lifecycle(
            "webhooks.update",
            &[
                "webhooks",
                "update",
                "${{ vars.webhook_id }}",
                "--data-json",
                r#"{"name":"smoke-updated"}"#,
            ],
        ))
        .step(Operation::read("webhooks.event-types", &["webhooks", "event-types"]))
        .step(Operation::destructive(
            "webhooks.test",
            &["webhooks", "test", "--confirm", "${{ vars.webhook_id }}"],
        ))
        .step(Operation::lifecycle(
            "webhooks.resume",
            &["webhooks", "resume", "${{ vars.webhook_id }}"],
        ))
        .step(Operation::lifecycle(
            "webhooks.delete",
            &["webhooks", "delete", "--confirm", "${{ vars.webhook_id }}"],
        ))
}

fn webhook_events() -> Stage {
    Stage::new("webhook-events")
        .step(
            Step::new(Operation::read(
                "webhook-events.list",
                &["webhooks", "events", "list", "--limit", "1"],
            ))
            .capture(
                "event_id",
                Extractor::Id,
                "no webhook event id found from webhook events list",
            ),
        )
        .step(Operation::read(
            "webhook-events.get",
            &["webhooks", "events", "get", "${{ vars.event_id }}"],
        ))
        .step(Operation::read(
            "webhook-events.summary",
            &["webhooks", "events", "summary"],
        ))
        .step(Operation::read(
            "webhook-events.summary-by-date",
            &["webhooks", "events", "summary-by-date"],
        ))
}

fn custom_tags() -> Stage {
    Stage::new("custom-tags")
        .step(
            Step::new(Operation::lifecycle(
                "custom-tags.create",
                &["custom-tags", "create", "--name", "smoke-${{ run.stamp }}"],
            ))
            .capture("tag_id", Extractor::Id, "custom-tags create did not return an id"),
        )
        .step(Operation::read(
            "custom-tags.list",
            &["custom-tags", "list", "--limit", "1"],
        ))
        .step(Operation::read(
            "custom-tags.get",
            &["custom-tags", "get", "${{ vars.tag_id }}"],
        ))
        .step(Operation::lifecycle(
            "custom-tags.update",
            &[
                "custom-tags",
                "update",
                "${{ vars.tag_id }}",
                "--name",
                "smoke-updated-${{ run.stamp }}",
            ],
        ))
        .step(Operation::read(
            "custom-tags.mappings",
            &["custom-tags", "mappings", "--limit", "1"],
        ))
        .step(Operation::destructive(
            "custom-tags.toggle-resource",
            &[
                "custom-tags",
                "toggle-resource",
                "--tag-id",
                "${{ vars.tag_id }}",
                "--resource-id",
                "RID",
                "--resource-type",
                "lead",
                "--enabled=false",
            ],
        ))
        .step(Operation::lifecycle(
            "custom-tags.delete",
            &["custom-tags", "delete", "--confirm", "${{ vars.tag_id }}"],
        ))
}

fn block_list_entries() -> Stage {
    Stage::new("block-list-entries")
        .step(
            Step::new(Operation::lifecycle(
                "block-list-entries.create",
                &[
                    "block-list-entries",
                    "create",
                    "--data-json",
                    r#"{"value":"smoke@example.com"}"#,
                ],
            ))
            .capture(
                "block_entry_id",
                Extractor::Id,
                "block-list-entries create did not return an id",
            ),
        )
        .step(Operation::read(
            "block-list-entries.list",
            &["block-list-entries", "list", "--limit", "1"],
        ))
        .step(Operation::read(
            "block-list-entries.get",
            &["block-list-entries", "get", "${{ vars.block_entry_id }}"],
        ))
        .step(Operation::lifecycle(
            "block-list-entries.update",
            &[
                "block-list-entries",
                "update",
                "${{ vars.block_entry_id }}",
                "--data-json",
                r#"{"value":"smoke2@example.com"}"#,
            ],
        ))
        .step(Operation::lifecycle(
            "block-list-entries.delete",
            &[
                "block-list-entries",
                "delete",
                "--confirm",
                "${{ vars.block_entry_id }}",
            ],
        ))
}

fn lead_labels() -> Stage {
    Stage::new("lead-labels")
        .step(
            Step::new(Operation::lifecycle(
                "lead-labels.create",
                &["lead-labels", "create", "--name", "smoke-${{ run.stamp }}"],
            ))
            .capture("label_id", Extractor::Id, "lead-labels create did not return an id"),
        )
        .step(Operation::read(
            "lead-labels.list",
            &["lead-labels", "list", "--limit", "1"],
        ))
        .step(Operation::read(
            "lead-labels.get",
            &["lead-labels", "get", "${{ vars.label_id }}"],
        ))
        .step(Operation::lifecycle(
            "lead-labels.update",
            &[
                "lead-labels",
                "update",
                "${{ vars.label_id }}",
                "--name",
                "smoke-updated-${{ run.stamp }}",
            ],
        ))
        .step(Operation::lifecycle(
            "lead-labels.delete",
            &["lead-labels", "delete", "--confirm", "${{ vars.label_id }}"],
        ))
}

fn subsequences() -> Stage {
    Stage::new("subsequences")
        .step(
            Step::new(Operation::read(
                "subsequences.list",
                &[
                    "subsequences",
                    "list",
                    "--parent-campaign",
                    "${{ vars.campaign_id }}",
                    "--limit",
                    "1",
                ],
            ))
            .capture("subsequence_id", Extractor::Id, "no subsequence id found"),
        )
        .step(Operation::read(
            "subsequences.get",
            &["subsequences", "get", "${{ vars.subsequence_id }}"],
        ))
        .step(Operation::destructive(
            "subsequences.pause",
            &["subsequences", "pause", "${{ vars.subsequence_id }}"],
        ))
        .step(Operation::destructive(
            "subsequences.resume",
            &["subsequences", "resume", "${{ vars.subsequence_id }}"],
        ))
        .step(Operation::destructive(
            "subsequences.duplicate",
            &["subsequences", "duplicate", "${{ vars.subsequence_id }}"],
        ))
}

fn inbox_placement() -> Stage {
    Stage::new("inbox-placement")
        .step(
            Step::new(Operation::read(
                "inbox-placement.tests.list",
                &["inbox-placement", "tests", "list", "--limit", "1"],
            ))
            .capture("test_id", Extractor::Id, "no inbox placement test id available"),
        )
        .step(Operation::read(
            "inbox-placement.tests.esps",
            &["inbox-placement", "tests", "esps"],
        ))
        .step(Operation::read(
            "inbox-placement.tests.get",
            &["inbox-placement", "tests", "get", "${{ vars.test_id }}"],
        ))
        .step(
            Operation::read(
                "inbox-placement.analytics.list",
                &[
                    "inbox-placement",
                    "analytics",
                    "list",
                    "--test-id",
                    "${{ vars.test_id }}",
                    "--limit",
                    "1",
                ],
            )
            .parsed(),
        )
        .step(
            Operation::read(
                "inbox-placement.reports.list",
                &[
                    "inbox-placement",
                    "reports",
                    "list",
                    "--test-id",
                    "${{ vars.test_id }}",
                    "--limit",
                    "1",
                ],
            )
            .parsed(),
        )
        .step(Operation::read(
            "inbox-placement.analytics.stats-by-test-id",
            &[
                "inbox-placement",
                "analytics",
                "stats-by-test-id",
                "--test-id",
                "${{ vars.test_id }}",
            ],
        ))
        .step(Operation::read(
            "inbox-placement.analytics.deliverability-insights",
            &[
                "inbox-placement",
                "analytics",
                "deliverability-insights",
                "--test-id",
                "${{ vars.test_id }}",
            ],
        ))
        .step(Operation::read(
            "inbox-placement.analytics.stats-by-date",
            &[
                "inbox-placement",
                "analytics",
                "stats-by-date",
                "--test-id",
                "${{ vars.test_id }}",
                "--start-date",
                WARMUP_START,
                "--end-date",
                WARMUP_END,
            ],
        ))
        .step(Operation::destructive(
            "inbox-placement.tests.create",
            &[
                "inbox-placement",
                "tests",
                "create",
                "--confirm",
                "--data-json",
                r#"{"name":"smoke"}"#,
            ],
        ))
}

fn jobs() -> Stage {
    Stage::new("jobs")
        .step(
            Step::new(Operation::read("jobs.list", &["jobs", "list", "--limit", "1"]))
                .capture("job_id", Extractor::Id, "no job id found from jobs list"),
        )
        .step(Operation::read("jobs.get", &["jobs", "get", "${{ vars.job_id }}"]))
}

fn crm_actions() -> Stage {
    Stage::new("crm-actions").step(Operation::read(
        "crm-actions.phone-numbers.list",
        &["crm-actions", "phone-numbers", "list", "--limit", "1"],
    ))
}

fn dfy_orders() -> Stage {
    let simulated = |name: &str, command: &[&str]| {
        let mut argv = vec!["dfy-email-account-orders"];
        argv.extend_from_slice(command);
        argv.extend_from_slice(&["--confirm", "--data-json", SMOKE_DATA]);
        Operation::destructive(format!("dfy-email-account-orders.{}", name), &argv)
    };

    Stage::new("dfy-email-account-orders")
        .step(Operation::read(
            "dfy-email-account-orders.list",
            &["dfy-email-account-orders", "list", "--limit", "1"],
        ))
        .step(Operation::read(
            "dfy-email-account-orders.accounts.list",
            &["dfy-email-account-orders", "accounts", "list", "--limit", "1"],
        ))
        .step(simulated("create", &["create"]))
        .step(simulated("accounts.cancel", &["accounts", "cancel"]))
        .step(simulated("domains.check", &["domains", "check"]))
        .step(simulated("domains.similar", &["domains", "similar"]))
        .step(simulated(
            "domains.pre-warmed-up-list",
            &["domains", "pre-warmed-up-list"],
        ))
}

fn supersearch_enrichment() -> Stage {
    let on_resource = |command: &str| {
        Operation::destructive(
            format!("supersearch-enrichment.{}", command),
            &[
                "supersearch-enrichment",
                command,
                "--confirm",
                "--resource-id",
                "RID",
                "--data-json",
                SMOKE_DATA,
            ],
        )
    };

    Stage::new("supersearch-enrichment")
        .step(Operation::destructive(
            "supersearch-enrichment.create",
            &[
                "supersearch-enrichment",
                "create",
                "--confirm",
                "--data-json",
                r#"{"name":"smoke"}"#,
            ],
        ))
        .step(on_resource("run"))
        .step(on_resource("ai"))
        .step(on_resource("count-leads"))
        .step(on_resource("enrich-leads"))
}

fn account_campaign_mappings() -> Stage {
    Stage::new("account-campaign-mappings").step(Operation::read(
        "account-campaign-mappings.get",
        &["account-campaign-mappings", "get", "${{ vars.sender_email }}"],
    ))
}

fn workspace_members() -> Stage {
    Stage::new("workspace-members")
        .step(
            Step::new(Operation::read(
                "workspace-members.list",
                &["workspace-members", "list", "--limit", "1"],
            ))
            .capture(
                "member_id",
                Extractor::MemberId {
                    avoid_role: OWNER_ROLE.to_string(),
                },
                "no member id found from workspace members list",
            ),
        )
        .step(Operation::read(
            "workspace-members.get",
            &["workspace-members", "get", "${{ vars.member_id }}"],
        ))
        .step(
            Operation::read(
                "workspace-group-members.list",
                &["workspace-group-members", "list", "--limit", "1"],
            )
            .parsed(),
        )
        .step(Operation::read(
            "workspace-group-members.admin",
            &["workspace-group-members", "admin"],
        ))
        .step(Operation::destructive(
            "workspace-members.create",
            &["workspace-members", "create", "--data-json", SMOKE_DATA],
        ))
        .step(Operation::destructive(
            "workspace-members.delete",
            &["workspace-members", "delete", "--confirm", "MEMBER_ID"],
        ))
}

fn raw_api() -> Stage {
    Stage::new("api")
        .step(Operation::read(
            "api.get.accounts",
            &["api", "get", "/accounts", "--query", "limit=1"],
        ))
        .step(Operation::read(
            "api.get.workspaces.current",
            &["api", "get", "/workspaces/current"],
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::context::RunContext;
    use crate::plan::operation::{Effect, DRY_RUN_FLAG};
    use std::collections::BTreeSet;

    #[test]
    fn test_plan_is_valid() {
        let plan = instantly();
        assert!(plan.validate().is_ok());
        assert_eq!(plan.stages.len(), 21);
    }

    #[test]
    fn test_step_names_unique() {
        let plan = instantly();
        let mut seen = BTreeSet::new();
        for (_, step) in plan.steps() {
            assert!(seen.insert(step.name().to_string()), "{}", step.name());
        }
    }

    #[test]
    fn test_baseline_is_first_step() {
        let plan = instantly();
        let first = &plan.stages[0].steps[0];
        assert_eq!(first.name(), "workspaces.current.get");
        assert!(first.wants_json());
        assert_eq!(first.operation.effect, Effect::Read);
    }

    #[test]
    fn test_destructive_steps_always_simulated() {
        let mut ctx = RunContext::with_stamp(1700000000);
        for name in [
            "sender_email",
            "campaign_id",
            "email_id",
            "webhook_id",
            "tag_id",
            "subsequence_id",
        ] {
            ctx.bind(name, format!("{}-value", name));
        }

        let plan = instantly();
        let destructive: Vec<_> = plan
            .steps()
            .map(|(_, step)| step)
            .filter(|step| step.operation.effect == Effect::Destructive)
            .collect();
        assert!(destructive.len() > 20);

        for step in destructive {
            let argv = step.operation.invocation(&ctx).unwrap();
            assert_eq!(argv[0], DRY_RUN_FLAG, "{}", step.name());
        }
    }

    #[test]
    fn test_lead_list_cleanup_is_deferred() {
        let plan = instantly();
        let deferred: Vec<_> = plan
            .steps()
            .filter(|(_, step)| step.deferred)
            .map(|(_, step)| step.name().to_string())
            .collect();
        assert_eq!(deferred, vec!["lead-lists.delete"]);
    }

    #[test]
    fn test_bulk_delete_targets_run_lead() {
        let ctx = RunContext::with_stamp(42);
        let plan = instantly();
        let (_, step) = plan
            .steps()
            .find(|(_, step)| step.name() == "leads.bulk-delete")
            .unwrap();
        let argv = step.operation.invocation(&ctx).unwrap();
        assert!(argv.contains(&"--confirm".to_string()));
        assert!(argv.contains(&"email=smoke+42@example.com".to_string()));
    }
}
