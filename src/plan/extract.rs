//! Heuristic extractors over decoded CLI output
//!
//! The harness never knows ahead of time which resources exist in the target
//! account, so later steps chain from whatever earlier steps happened to
//! return. These functions walk an arbitrary JSON document and pull out the
//! first plausible identifier or email address.
//!
//! Traversal is depth-first. Within a mapping, the mapping's own matching key
//! wins before any nested value is visited; nested values are then visited in
//! document order, and sequence elements in index order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keys checked, in priority order, by [`find_first_email`].
pub const EMAIL_KEYS: [&str; 2] = ["email", "eaccount"];

/// Which extractor a capture uses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Extractor {
    /// First non-empty string under a key named `id`
    Id,
    /// First string containing `@` under `email` or `eaccount`
    Email,
    /// First `items[]` member whose role differs from `avoid_role`, then [`Extractor::Id`]
    MemberId { avoid_role: String },
}

impl Extractor {
    /// Apply this extractor to a decoded document
    pub fn extract(&self, value: &Value) -> Option<String> {
        match self {
            Extractor::Id => find_first_id(value),
            Extractor::Email => find_first_email(value),
            Extractor::MemberId { avoid_role } => {
                find_member_id(value, avoid_role).or_else(|| find_first_id(value))
            }
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Extractor::Id => "id",
            Extractor::Email => "email",
            Extractor::MemberId { .. } => "member id",
        }
    }
}

/// Find the first non-empty string `id` anywhere in the document.
///
/// Numeric, null or blank `id` fields never match. The returned value is
/// trimmed.
pub fn find_first_id(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(id)) = map.get("id") {
                let id = id.trim();
                if !id.is_empty() {
                    return Some(id.to_string());
                }
            }
            map.values().find_map(find_first_id)
        }
        Value::Array(items) => items.iter().find_map(find_first_id),
        _ => None,
    }
}

/// Find the first email-shaped string under one of [`EMAIL_KEYS`].
pub fn find_first_email(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            for key in EMAIL_KEYS {
                if let Some(Value::String(candidate)) = map.get(key) {
                    if candidate.contains('@') {
                        return Some(candidate.clone());
                    }
                }
            }
            map.values().find_map(find_first_email)
        }
        Value::Array(items) => items.iter().find_map(find_first_email),
        _ => None,
    }
}

/// Pick a member id from a `{"items": [...]}` listing, skipping members whose
/// `role` equals `avoid_role`.
///
/// Some workspaces answer 404 when the owner membership is fetched directly,
/// so any other member is a better chaining candidate. A blank id on the
/// first candidate yields `None`.
pub fn find_member_id(value: &Value, avoid_role: &str) -> Option<String> {
    let items = value.get("items")?.as_array()?;
    let candidate = items.iter().filter_map(Value::as_object).find(|member| {
        member.get("role").and_then(Value::as_str) != Some(avoid_role)
            && member.get("id").is_some_and(Value::is_string)
    })?;
    candidate
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_prefers_earlier_branch() {
        let doc = json!({"a": {"id": "x"}, "b": [{"id": "y"}]});
        assert_eq!(find_first_id(&doc), Some("x".to_string()));
    }

    #[test]
    fn test_id_follows_document_order() {
        let doc = json!({"z": [{"id": "first"}], "a": {"id": "second"}});
        assert_eq!(find_first_id(&doc), Some("first".to_string()));
    }

    #[test]
    fn test_id_own_key_before_children() {
        let doc = json!({"child": {"id": "inner"}, "id": "outer"});
        assert_eq!(find_first_id(&doc), Some("outer".to_string()));
    }

    #[test]
    fn test_id_ignores_blank_and_non_string() {
        assert_eq!(find_first_id(&json!({"id": ""})), None);
        assert_eq!(find_first_id(&json!({"id": "   "})), None);
        assert_eq!(find_first_id(&json!({"id": 5})), None);
        assert_eq!(find_first_id(&json!({"id": null})), None);
        assert_eq!(find_first_id(&json!({"items": []})), None);
        assert_eq!(find_first_id(&json!("id")), None);
    }

    #[test]
    fn test_id_skips_invalid_then_finds_nested() {
        let doc = json!({"id": 7, "items": [{"name": "n"}, {"id": " abc123 "}]});
        assert_eq!(find_first_id(&doc), Some("abc123".to_string()));
    }

    #[test]
    fn test_email_matches_either_key() {
        assert_eq!(
            find_first_email(&json!({"eaccount": "a@b.com"})),
            Some("a@b.com".to_string())
        );
        assert_eq!(
            find_first_email(&json!({"items": [{"email": "c@d.io"}]})),
            Some("c@d.io".to_string())
        );
    }

    #[test]
    fn test_email_key_priority() {
        let doc = json!({"eaccount": "second@x.com", "email": "first@x.com"});
        assert_eq!(find_first_email(&doc), Some("first@x.com".to_string()));
    }

    #[test]
    fn test_email_rejects_non_email() {
        assert_eq!(find_first_email(&json!({"email": "not-an-email"})), None);
        assert_eq!(find_first_email(&json!({"email": 3})), None);
        assert_eq!(find_first_email(&json!({"contact": "x@y.z"})), None);
    }

    #[test]
    fn test_member_avoids_owner() {
        let doc = json!({"items": [
            {"id": "owner-1", "role": "owner"},
            {"id": "member-2", "role": "admin"}
        ]});
        let extractor = Extractor::MemberId {
            avoid_role: "owner".to_string(),
        };
        assert_eq!(extractor.extract(&doc), Some("member-2".to_string()));
    }

    #[test]
    fn test_member_blank_id_falls_back() {
        let doc = json!({"items": [
            {"id": "", "role": "editor"},
            {"id": "m2", "role": "owner"}
        ]});
        assert_eq!(find_member_id(&doc, "owner"), None);
        let extractor = Extractor::MemberId {
            avoid_role: "owner".to_string(),
        };
        assert_eq!(extractor.extract(&doc), Some("m2".to_string()));
    }

    #[test]
    fn test_member_falls_back_to_first_id() {
        let doc = json!({"items": [{"id": "owner-1", "role": "owner"}]});
        let extractor = Extractor::MemberId {
            avoid_role: "owner".to_string(),
        };
        assert_eq!(extractor.extract(&doc), Some("owner-1".to_string()));
    }

    #[test]
    fn test_member_without_items_uses_generic() {
        let doc = json!({"data": {"id": "m"}});
        assert_eq!(find_member_id(&doc, "owner"), None);
        let extractor = Extractor::MemberId {
            avoid_role: "owner".to_string(),
        };
        assert_eq!(extractor.extract(&doc), Some("m".to_string()));
    }
}
