//! # Conformance Probe
//!
//! Calls the documented endpoints of a live server and checks every answer
//! against the published shapes.
//!
//! | Step | Request | Key | Expected body |
//! |---|---|---|---|
//! | 1 | `GET /v1/organizations/invites/{invite_id}` | admin | Invite |
//! | 2 | `POST /v1/organizations/workspaces` | admin | Workspace |
//! | 3 | `DELETE /v1/messages/batches/{message_batch_id}` | workspace | Message Batch Deletion Receipt |
//!
//! A step runs only when its inputs are configured. It passes on `200` with
//! a body that has no violations. Non-`200` answers are recorded with their
//! error envelope; the probe never retries.

use admiral_core::conformance::{self, Schema};
use admiral_core::headers::{
    KeyScope, ANTHROPIC_BETA, ANTHROPIC_VERSION, DEFAULT_VERSION, X_API_KEY,
};
use admiral_core::{ErrorKind, InviteId, MessageBatchId};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Errors that stop the probe before any step runs.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// The base URL is not an http(s) URL.
    #[error("invalid base URL '{0}': expected http:// or https://")]
    BaseUrl(String),

    /// No step had its inputs configured.
    #[error("nothing to probe: configure an invite id, a workspace name or a message batch id together with the matching key")]
    NothingToProbe,
}

// =============================================================================
// CONFIG & OUTCOME
// =============================================================================

/// What to probe, and with which credentials.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub base_url: String,
    pub admin_key: Option<String>,
    pub api_key: Option<String>,
    pub version: String,
    pub betas: Vec<String>,
    pub invite_id: Option<InviteId>,
    pub workspace_name: Option<String>,
    pub batch_id: Option<MessageBatchId>,
    pub timeout: Duration,
}

impl ProbeConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            admin_key: None,
            api_key: None,
            version: DEFAULT_VERSION.to_string(),
            betas: Vec::new(),
            invite_id: None,
            workspace_name: None,
            batch_id: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// The error envelope of a non-`200` answer.
///
/// `kind` keeps the raw wire string, so kinds this build does not know are
/// still reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteError {
    pub kind: String,
    pub message: String,
}

impl RemoteError {
    /// The kind, if it is one of the documented ones.
    pub fn known_kind(&self) -> Option<ErrorKind> {
        ErrorKind::from_wire(&self.kind)
    }
}

/// Result of one probe step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    /// e.g. `GET /v1/organizations/invites/invite_…`
    pub endpoint: String,
    /// HTTP status, absent when the request never got an answer.
    pub status: Option<u16>,
    /// Conformance violations of the body.
    pub violations: Vec<String>,
    /// Error envelope of a non-`200` answer.
    pub error: Option<RemoteError>,
    /// Transport failure (connection refused, timeout, ...).
    pub transport: Option<String>,
}

impl ProbeOutcome {
    pub fn passed(&self) -> bool {
        self.status == Some(200) && self.violations.is_empty() && self.transport.is_none()
    }
}

// =============================================================================
// PROBE
// =============================================================================

struct Step {
    method: reqwest::Method,
    path: String,
    key: Option<String>,
    body: Option<Value>,
    betas: bool,
    schema: Schema,
}

/// Run every configured step, in the documented order.
pub async fn run_probe(config: &ProbeConfig) -> Result<Vec<ProbeOutcome>, ProbeError> {
    if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
        return Err(ProbeError::BaseUrl(config.base_url.clone()));
    }
    warn_on_key_shape(config.admin_key.as_deref(), KeyScope::Admin);
    warn_on_key_shape(config.api_key.as_deref(), KeyScope::Workspace);

    let steps = plan(config);
    if steps.is_empty() {
        return Err(ProbeError::NothingToProbe);
    }

    let client = reqwest::Client::builder().timeout(config.timeout).build()?;
    let mut outcomes = Vec::with_capacity(steps.len());
    for step in steps {
        let outcome = run_step(&client, config, step).await;
        tracing::info!(
            endpoint = %outcome.endpoint,
            status = ?outcome.status,
            violations = outcome.violations.len(),
            passed = outcome.passed(),
            "probe step finished"
        );
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

fn warn_on_key_shape(key: Option<&str>, expected: KeyScope) {
    if let Some(key) = key {
        if KeyScope::of(key) != Some(expected) {
            tracing::warn!(scope = %expected, "key does not look like a {} key", expected);
        }
    }
}

fn plan(config: &ProbeConfig) -> Vec<Step> {
    let mut steps = Vec::new();
    if let (Some(key), Some(id)) = (&config.admin_key, &config.invite_id) {
        steps.push(Step {
            method: reqwest::Method::GET,
            path: format!("/v1/organizations/invites/{}", id),
            key: Some(key.clone()),
            body: None,
            betas: false,
            schema: Schema::Invite,
        });
    }
    if let (Some(key), Some(name)) = (&config.admin_key, &config.workspace_name) {
        steps.push(Step {
            method: reqwest::Method::POST,
            path: "/v1/organizations/workspaces".to_string(),
            key: Some(key.clone()),
            body: Some(json!({ "name": name })),
            betas: false,
            schema: Schema::Workspace,
        });
    }
    if let (Some(key), Some(id)) = (&config.api_key, &config.batch_id) {
        steps.push(Step {
            method: reqwest::Method::DELETE,
            path: format!("/v1/messages/batches/{}", id),
            key: Some(key.clone()),
            body: None,
            betas: true,
            schema: Schema::MessageBatchDeleted,
        });
    }
    steps
}

async fn run_step(client: &reqwest::Client, config: &ProbeConfig, step: Step) -> ProbeOutcome {
    let endpoint = format!("{} {}", step.method, step.path);
    let mut request = client
        .request(step.method, format!("{}{}", config.base_url, step.path))
        .header(ANTHROPIC_VERSION, &config.version);
    if let Some(key) = &step.key {
        request = request.header(X_API_KEY, key);
    }
    if step.betas && !config.betas.is_empty() {
        request = request.header(ANTHROPIC_BETA, config.betas.join(","));
    }
    if let Some(body) = &step.body {
        request = request.json(body);
    }

    let mut outcome = ProbeOutcome {
        endpoint,
        status: None,
        violations: Vec::new(),
        error: None,
        transport: None,
    };

    let response = match request.send().await {
        Ok(response) => response,
        Err(err) => {
            outcome.transport = Some(err.to_string());
            return outcome;
        }
    };
    let status = response.status().as_u16();
    outcome.status = Some(status);

    let text = match response.text().await {
        Ok(text) => text,
        Err(err) => {
            outcome.transport = Some(err.to_string());
            return outcome;
        }
    };
    let body: Value = match serde_json::from_str(&text) {
        Ok(body) => body,
        Err(err) => {
            outcome.violations.push(format!("$: body is not JSON ({})", err));
            return outcome;
        }
    };

    let schema = if status == 200 {
        step.schema
    } else {
        outcome.error = remote_error(&body);
        Schema::ErrorEnvelope
    };
    outcome.violations = conformance::check(schema, &body)
        .iter()
        .map(ToString::to_string)
        .collect();
    outcome
}

fn remote_error(body: &Value) -> Option<RemoteError> {
    let detail = body.get("error")?;
    Some(RemoteError {
        kind: detail.get("type")?.as_str()?.to_string(),
        message: detail
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn plan_skips_unconfigured_steps() {
        let mut config = ProbeConfig::new("http://localhost:8080/");
        assert_eq!(config.base_url, "http://localhost:8080");
        assert!(plan(&config).is_empty());

        config.workspace_name = Some("Probe".to_string());
        assert!(plan(&config).is_empty(), "needs the admin key too");

        config.admin_key = Some("sk-ant-admin01-x".to_string());
        config.batch_id = Some(MessageBatchId::parse("msgbatch_x").unwrap());
        let steps = plan(&config);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].path, "/v1/organizations/workspaces");
    }

    #[test]
    fn unknown_error_kinds_are_kept() {
        let body = json!({
            "type": "error",
            "error": {"type": "teapot_error", "message": "short and stout"}
        });
        let err = remote_error(&body).unwrap();
        assert_eq!(err.kind, "teapot_error");
        assert_eq!(err.known_kind(), None);
    }
}
