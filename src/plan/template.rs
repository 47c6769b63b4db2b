//! Argument templates with `${{ }}` placeholders
//!
//! Supports:
//! - ${{ vars.NAME }} - a value captured by an earlier step
//! - ${{ run.stamp }} - the per-run uniqueness token
//! - ${{ run.lead_email }} - the disposable lead address for this run
//! - ${{ run.id }} - the run ID

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use super::context::RunContext;

static EXPRESSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{\{\s*([^}]+?)\s*\}\}").expect("expression pattern is valid")
});

/// Errors that can occur during template evaluation
#[derive(Debug, thiserror::Error)]
pub enum ExpressionError {
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Invalid expression syntax: {0}")]
    InvalidSyntax(String),
}

/// Evaluate all expressions in a string
pub fn evaluate(input: &str, ctx: &RunContext) -> Result<String, ExpressionError> {
    let mut result = String::with_capacity(input.len());
    let mut last = 0;

    for cap in EXPRESSION_REGEX.captures_iter(input) {
        let (Some(full), Some(expr)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        result.push_str(&input[last..full.start()]);
        result.push_str(&evaluate_single(expr.as_str().trim(), ctx)?);
        last = full.end();
    }
    result.push_str(&input[last..]);

    Ok(result)
}

/// Evaluate a whole argument vector
pub fn render_argv(template: &[String], ctx: &RunContext) -> Result<Vec<String>, ExpressionError> {
    template.iter().map(|arg| evaluate(arg, ctx)).collect()
}

/// Names referenced through `vars.NAME` anywhere in the argument vector
pub fn referenced_vars(template: &[String]) -> BTreeSet<String> {
    template
        .iter()
        .flat_map(|arg| EXPRESSION_REGEX.captures_iter(arg))
        .filter_map(|cap| cap.get(1))
        .filter_map(|expr| expr.as_str().trim().strip_prefix("vars.").map(str::to_string))
        .collect()
}

/// Check that every expression in the argument vector is well formed,
/// without needing any values.
pub fn check_argv(template: &[String]) -> Result<(), ExpressionError> {
    for cap in template.iter().flat_map(|arg| EXPRESSION_REGEX.captures_iter(arg)) {
        let Some(expr) = cap.get(1) else { continue };
        let expr = expr.as_str().trim();
        match expr.split('.').collect::<Vec<_>>().as_slice() {
            ["vars", name] if !name.is_empty() => {}
            ["run", "stamp" | "lead_email" | "id"] => {}
            ["vars", ..] => {
                return Err(ExpressionError::InvalidSyntax(format!(
                    "vars expressions must be vars.NAME, got: {}",
                    expr
                )))
            }
            _ => return Err(ExpressionError::UnknownVariable(expr.to_string())),
        }
    }
    Ok(())
}

/// Evaluate a single expression (without the ${{ }} wrapper)
fn evaluate_single(expr: &str, ctx: &RunContext) -> Result<String, ExpressionError> {
    let parts: Vec<&str> = expr.split('.').collect();

    match parts.as_slice() {
        ["vars", name] => ctx
            .get(name)
            .cloned()
            .ok_or_else(|| ExpressionError::UnknownVariable(format!("vars.{}", name))),
        ["run", "stamp"] => Ok(ctx.stamp.to_string()),
        ["run", "lead_email"] => Ok(ctx.lead_email()),
        ["run", "id"] => Ok(ctx.run_id.clone()),
        ["vars", ..] => Err(ExpressionError::InvalidSyntax(format!(
            "vars expressions must be vars.NAME, got: {}",
            expr
        ))),
        _ => Err(ExpressionError::UnknownVariable(expr.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_context() -> RunContext {
        let mut ctx = RunContext::with_stamp(1700000000);
        ctx.bind("campaign_id", "abc123".to_string());
        ctx
    }

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_evaluate_var() {
        let ctx = test_context();
        let result = evaluate("campaign_id=${{ vars.campaign_id }}", &ctx).unwrap();
        assert_eq!(result, "campaign_id=abc123");
    }

    #[test]
    fn test_evaluate_run_values() {
        let ctx = test_context();
        assert_eq!(
            evaluate("smoke-${{ run.stamp }}", &ctx).unwrap(),
            "smoke-1700000000"
        );
        assert_eq!(
            evaluate("email=${{run.lead_email}}", &ctx).unwrap(),
            "email=smoke+1700000000@example.com"
        );
    }

    #[test]
    fn test_evaluate_multiple() {
        let ctx = test_context();
        let result = evaluate("${{ vars.campaign_id }}-${{ run.stamp }}", &ctx).unwrap();
        assert_eq!(result, "abc123-1700000000");
    }

    #[test]
    fn test_plain_text_untouched() {
        let ctx = test_context();
        assert_eq!(
            evaluate(r#"{"value":"smoke@example.com"}"#, &ctx).unwrap(),
            r#"{"value":"smoke@example.com"}"#
        );
    }

    #[test]
    fn test_unknown_variable() {
        let ctx = test_context();
        assert!(matches!(
            evaluate("${{ vars.lead_id }}", &ctx),
            Err(ExpressionError::UnknownVariable(_))
        ));
        assert!(matches!(
            evaluate("${{ env.HOME }}", &ctx),
            Err(ExpressionError::UnknownVariable(_))
        ));
        assert!(matches!(
            evaluate("${{ vars.a.b }}", &ctx),
            Err(ExpressionError::InvalidSyntax(_))
        ));
    }

    #[test]
    fn test_referenced_vars() {
        let template = argv(&[
            "analytics",
            "--campaign-id",
            "${{ vars.campaign_id }}",
            "--email",
            "${{vars.sender_email}}",
            "smoke-${{ run.stamp }}",
        ]);
        let vars: Vec<_> = referenced_vars(&template).into_iter().collect();
        assert_eq!(vars, vec!["campaign_id", "sender_email"]);
    }

    #[test]
    fn test_check_argv() {
        assert!(check_argv(&argv(&["get", "${{ vars.lead_id }}", "${{ run.lead_email }}"])).is_ok());
        assert!(matches!(
            check_argv(&argv(&["${{ run.when }}"])),
            Err(ExpressionError::UnknownVariable(_))
        ));
        assert!(matches!(
            check_argv(&argv(&["${{ vars. }}"])),
            Err(ExpressionError::InvalidSyntax(_))
        ));
    }

    #[test]
    fn test_render_argv() {
        let ctx = test_context();
        let rendered = render_argv(&argv(&["campaigns", "get", "${{ vars.campaign_id }}"]), &ctx).unwrap();
        assert_eq!(rendered, argv(&["campaigns", "get", "abc123"]));
    }
}
