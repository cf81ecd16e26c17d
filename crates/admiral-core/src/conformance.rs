//! # Conformance Module
//!
//! Strict checks of raw JSON bodies against the documented resource shapes.
//!
//! Typed deserialization is forgiving in ways a contract check must not be:
//! it ignores unknown fields and accepts any RFC 3339 offset. [`check`] walks
//! the raw [`serde_json::Value`] instead and reports every deviation with the
//! JSON path it was found at:
//!
//! - exactly the documented field set (missing and unexpected fields)
//! - constant `type` discriminators
//! - id prefixes
//! - enum membership
//! - canonical microsecond UTC timestamps
//! - workspace name length and hex display colors

use crate::time::Timestamp;
use crate::validate;
use crate::ErrorKind;
use serde_json::{Map, Value};
use std::fmt;

/// Resource shapes that can be checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Invite,
    InviteDeleted,
    Workspace,
    MessageBatch,
    MessageBatchDeleted,
    ErrorEnvelope,
}

impl Schema {
    /// Human-readable name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Invite => "Invite",
            Self::InviteDeleted => "Invite Deletion Receipt",
            Self::Workspace => "Workspace",
            Self::MessageBatch => "Message Batch",
            Self::MessageBatchDeleted => "Message Batch Deletion Receipt",
            Self::ErrorEnvelope => "Error",
        }
    }

    fn fields(self) -> &'static [(&'static str, Rule)] {
        match self {
            Self::Invite => &[
                ("id", Rule::Id("invite_")),
                ("type", Rule::Const("invite")),
                ("email", Rule::Email),
                ("role", Rule::OneOf(ROLES)),
                ("invited_at", Rule::Timestamp),
                ("expires_at", Rule::Timestamp),
                ("status", Rule::OneOf(STATUSES)),
            ],
            Self::InviteDeleted => &[
                ("id", Rule::Id("invite_")),
                ("type", Rule::Const("invite_deleted")),
            ],
            Self::Workspace => &[
                ("id", Rule::Id("wrkspc_")),
                ("type", Rule::Const("workspace")),
                ("name", Rule::WorkspaceName),
                ("created_at", Rule::Timestamp),
                ("archived_at", Rule::NullableTimestamp),
                ("display_color", Rule::HexColor),
            ],
            Self::MessageBatch => &[
                ("id", Rule::Id("msgbatch_")),
                ("type", Rule::Const("message_batch")),
                ("processing_status", Rule::OneOf(PROCESSING)),
                ("request_counts", Rule::Counts),
                ("ended_at", Rule::NullableTimestamp),
                ("created_at", Rule::Timestamp),
                ("expires_at", Rule::Timestamp),
                ("archived_at", Rule::NullableTimestamp),
                ("cancel_initiated_at", Rule::NullableTimestamp),
                ("results_url", Rule::NullableString),
            ],
            Self::MessageBatchDeleted => &[
                ("id", Rule::Id("msgbatch_")),
                ("type", Rule::Const("message_batch_deleted")),
            ],
            Self::ErrorEnvelope => &[("type", Rule::Const("error")), ("error", Rule::ErrorDetail)],
        }
    }
}

const ROLES: &[&str] = &["user", "developer", "billing", "admin"];
const STATUSES: &[&str] = &["accepted", "expired", "deleted", "pending"];
const PROCESSING: &[&str] = &["in_progress", "canceling", "ended"];
const COUNT_FIELDS: [&str; 5] = ["processing", "succeeded", "errored", "canceled", "expired"];

#[derive(Debug, Clone, Copy)]
enum Rule {
    Const(&'static str),
    Id(&'static str),
    Email,
    OneOf(&'static [&'static str]),
    Timestamp,
    NullableTimestamp,
    NullableString,
    WorkspaceName,
    HexColor,
    Counts,
    ErrorDetail,
}

/// A single deviation from the documented shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON path, e.g. `$.status`.
    pub path: String,
    /// What is wrong at that path.
    pub message: String,
}

impl Violation {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Check `value` against `schema`, returning every violation found.
///
/// An empty result means the body conforms.
#[must_use]
pub fn check(schema: Schema, value: &Value) -> Vec<Violation> {
    let mut out = Vec::new();
    check_object("$", schema.fields(), value, &mut out);
    out
}

/// Whether `value` conforms to `schema`.
#[must_use]
pub fn conforms(schema: Schema, value: &Value) -> bool {
    check(schema, value).is_empty()
}

fn check_object(
    path: &str,
    fields: &[(&'static str, Rule)],
    value: &Value,
    out: &mut Vec<Violation>,
) {
    let Some(map) = value.as_object() else {
        out.push(Violation::new(path, format!("expected an object, got {}", type_name(value))));
        return;
    };

    for (name, rule) in fields {
        let field_path = format!("{}.{}", path, name);
        match map.get(*name) {
            Some(field) => check_rule(&field_path, *rule, field, out),
            None => out.push(Violation::new(field_path, "missing required field")),
        }
    }
    for key in map.keys() {
        if !fields.iter().any(|(name, _)| *name == key.as_str()) {
            out.push(Violation::new(format!("{}.{}", path, key), "unexpected field"));
        }
    }
}

fn check_rule(path: &str, rule: Rule, value: &Value, out: &mut Vec<Violation>) {
    match rule {
        Rule::Const(expected) => match value.as_str() {
            Some(s) if s == expected => {}
            _ => out.push(Violation::new(
                path,
                format!("expected \"{}\", got {}", expected, value),
            )),
        },
        Rule::Id(prefix) => match value.as_str() {
            Some(s)
                if s.strip_prefix(prefix).is_some_and(|rest| {
                    !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_alphanumeric())
                }) => {}
            _ => out.push(Violation::new(
                path,
                format!("expected an id with prefix '{}', got {}", prefix, value),
            )),
        },
        Rule::Email => match value.as_str() {
            Some(s) if validate::email(s).is_ok() => {}
            _ => out.push(Violation::new(
                path,
                format!("expected an email address, got {}", value),
            )),
        },
        Rule::OneOf(allowed) => match value.as_str() {
            Some(s) if allowed.contains(&s) => {}
            _ => out.push(Violation::new(
                path,
                format!("expected one of [{}], got {}", allowed.join(", "), value),
            )),
        },
        Rule::Timestamp => check_timestamp(path, value, out),
        Rule::NullableTimestamp => {
            if !value.is_null() {
                check_timestamp(path, value, out);
            }
        }
        Rule::NullableString => {
            if !(value.is_null() || value.is_string()) {
                out.push(Violation::new(
                    path,
                    format!("expected a string or null, got {}", type_name(value)),
                ));
            }
        }
        Rule::WorkspaceName => match value.as_str() {
            Some(s) if validate::workspace_name(s).is_ok() => {}
            Some(s) if !s.is_empty() && s.trim().is_empty() => {
                out.push(Violation::new(path, "must not be blank"));
            }
            Some(s) => out.push(Violation::new(
                path,
                format!(
                    "expected 1-{} characters, got {}",
                    validate::MAX_WORKSPACE_NAME_CHARS,
                    s.chars().count()
                ),
            )),
            None => out.push(Violation::new(
                path,
                format!("expected a string, got {}", type_name(value)),
            )),
        },
        Rule::HexColor => match value.as_str() {
            Some(s) if validate::is_hex_color(s) => {}
            _ => out.push(Violation::new(path, format!("expected a #RRGGBB color, got {}", value))),
        },
        Rule::Counts => check_counts(path, value, out),
        Rule::ErrorDetail => check_error_detail(path, value, out),
    }
}

fn check_timestamp(path: &str, value: &Value, out: &mut Vec<Violation>) {
    match value.as_str() {
        Some(s) if Timestamp::is_canonical(s) => {}
        Some(s) if Timestamp::parse(s).is_ok() => out.push(Violation::new(
            path,
            format!("'{}' is RFC 3339 but not UTC with microsecond precision", s),
        )),
        _ => out.push(Violation::new(
            path,
            format!("expected an RFC 3339 timestamp, got {}", value),
        )),
    }
}

fn check_counts(path: &str, value: &Value, out: &mut Vec<Violation>) {
    let Some(map) = value.as_object() else {
        out.push(Violation::new(path, format!("expected an object, got {}", type_name(value))));
        return;
    };
    for name in COUNT_FIELDS {
        let field_path = format!("{}.{}", path, name);
        match map.get(name) {
            Some(v) if v.as_u64().is_some() => {}
            Some(v) => out.push(Violation::new(
                field_path,
                format!("expected a non-negative integer, got {}", v),
            )),
            None => out.push(Violation::new(field_path, "missing required field")),
        }
    }
    push_unexpected(path, map, &COUNT_FIELDS, out);
}

fn check_error_detail(path: &str, value: &Value, out: &mut Vec<Violation>) {
    let Some(map) = value.as_object() else {
        out.push(Violation::new(path, format!("expected an object, got {}", type_name(value))));
        return;
    };
    match map.get("type").and_then(Value::as_str) {
        Some(kind) if ErrorKind::from_wire(kind).is_some() => {}
        Some(kind) => out.push(Violation::new(
            format!("{}.type", path),
            format!("unknown error type '{}'", kind),
        )),
        None => out.push(Violation::new(format!("{}.type", path), "missing required field")),
    }
    if !map.get("message").is_some_and(Value::is_string) {
        out.push(Violation::new(format!("{}.message", path), "expected a string"));
    }
    push_unexpected(path, map, &["type", "message"], out);
}

fn push_unexpected(path: &str, map: &Map<String, Value>, known: &[&str], out: &mut Vec<Violation>) {
    for key in map.keys() {
        if !known.contains(&key.as_str()) {
            out.push(Violation::new(format!("{}.{}", path, key), "unexpected field"));
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InviteRole, InviteStatus};
    use serde_json::json;

    fn invite() -> Value {
        json!({
            "id": "invite_015gWxCN9Hfg2QhZwTK7Mdeu",
            "type": "invite",
            "email": "user@emaildomain.com",
            "role": "user",
            "invited_at": "2024-10-30T23:58:27.427722Z",
            "expires_at": "2024-11-20T23:58:27.427722Z",
            "status": "pending"
        })
    }

    fn workspace() -> Value {
        json!({
            "id": "wrkspc_01JwQvzr7rXLA5AGx3HKfFUJ",
            "type": "workspace",
            "name": "Workspace Name",
            "created_at": "2024-10-30T23:58:27.427722Z",
            "archived_at": null,
            "display_color": "#6C5BB9"
        })
    }

    #[test]
    fn documented_examples_conform() {
        assert_eq!(check(Schema::Invite, &invite()), vec![]);
        assert_eq!(check(Schema::Workspace, &workspace()), vec![]);
        assert!(conforms(
            Schema::MessageBatchDeleted,
            &json!({"id": "msgbatch_013Zva2CMHLNnXjNJJKqJ2EF", "type": "message_batch_deleted"})
        ));
    }

    #[test]
    fn every_documented_status_is_accepted() {
        for status in InviteStatus::ALL {
            let mut body = invite();
            body["status"] = json!(status.as_str());
            assert!(conforms(Schema::Invite, &body), "{}", status);
        }
    }

    #[test]
    fn every_documented_role_is_accepted() {
        for role in InviteRole::ALL {
            let mut body = invite();
            body["role"] = json!(role.as_str());
            assert!(conforms(Schema::Invite, &body), "{}", role);
        }
    }

    #[test]
    fn missing_and_extra_fields_are_both_reported() {
        let mut body = invite();
        if let Some(map) = body.as_object_mut() {
            map.remove("email");
        }
        body["nickname"] = json!("bob");
        let violations = check(Schema::Invite, &body);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].path, "$.email");
        assert_eq!(violations[0].message, "missing required field");
        assert_eq!(violations[1].path, "$.nickname");
        assert_eq!(violations[1].message, "unexpected field");
    }

    #[test]
    fn enum_prefix_and_type_violations() {
        let mut body = invite();
        body["status"] = json!("revoked");
        body["type"] = json!("invitation");
        body["id"] = json!("inv_123");
        let paths: Vec<_> = check(Schema::Invite, &body)
            .into_iter()
            .map(|v| v.path)
            .collect();
        assert_eq!(paths, vec!["$.id", "$.type", "$.status"]);
    }

    #[test]
    fn non_canonical_timestamps_are_flagged() {
        let mut body = workspace();
        body["created_at"] = json!("2024-10-30T23:58:27Z");
        body["archived_at"] = json!("2024-10-30T23:58:27.427722+00:00");
        let violations = check(Schema::Workspace, &body);
        assert_eq!(violations.len(), 2);
        assert!(violations[0].message.contains("microsecond"));
    }

    #[test]
    fn workspace_name_and_color() {
        let mut body = workspace();
        body["name"] = json!("x".repeat(41));
        body["display_color"] = json!("purple");
        let violations = check(Schema::Workspace, &body);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].path, "$.name");
        assert_eq!(violations[1].path, "$.display_color");
    }

    #[test]
    fn blank_workspace_name_is_reported_as_blank() {
        let mut body = workspace();
        body["name"] = json!("   ");
        let violations = check(Schema::Workspace, &body);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].to_string(), "$.name: must not be blank");

        body["name"] = json!("");
        let violations = check(Schema::Workspace, &body);
        assert_eq!(violations[0].to_string(), "$.name: expected 1-40 characters, got 0");
    }

    #[test]
    fn non_objects_fail_fast() {
        let violations = check(Schema::Invite, &json!([1, 2]));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].to_string(), "$: expected an object, got an array");
    }

    #[test]
    fn batch_counts_are_checked() {
        let body = json!({
            "id": "msgbatch_abc",
            "type": "message_batch",
            "processing_status": "ended",
            "request_counts": {"processing": 0, "succeeded": 0, "errored": 0, "canceled": -1},
            "ended_at": "2024-08-20T18:37:24.100435Z",
            "created_at": "2024-08-20T18:37:24.100435Z",
            "expires_at": "2024-08-21T18:37:24.100435Z",
            "archived_at": null,
            "cancel_initiated_at": null,
            "results_url": "https://api.example.com/v1/messages/batches/msgbatch_abc/results"
        });
        let paths: Vec<_> = check(Schema::MessageBatch, &body)
            .into_iter()
            .map(|v| v.path)
            .collect();
        assert_eq!(
            paths,
            vec!["$.request_counts.canceled", "$.request_counts.expired"]
        );
    }

    #[test]
    fn error_envelope() {
        let ok = json!({"type": "error", "error": {"type": "not_found_error", "message": "nope"}});
        assert!(conforms(Schema::ErrorEnvelope, &ok));

        let bad = json!({"type": "error", "error": {"type": "oops", "detail": 1}});
        let paths: Vec<_> = check(Schema::ErrorEnvelope, &bad)
            .into_iter()
            .map(|v| v.path)
            .collect();
        assert_eq!(paths, vec!["$.error.type", "$.error.message", "$.error.detail"]);
    }
}
