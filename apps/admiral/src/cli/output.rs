//! What commands produce, and how it is printed.

use crate::probe::ProbeOutcome;
use admiral_core::{
    BatchResultLine, Invite, InviteDeleted, MessageBatch, MessageBatchDeleted, Page, Workspace,
};
use serde::Serialize;
use std::process::ExitCode;

/// The result of a CLI command.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Output {
    Message { message: String },
    Invite(Invite),
    InviteDeleted(InviteDeleted),
    Invites(Page<Invite>),
    Workspace(Workspace),
    Workspaces(Page<Workspace>),
    Batch(MessageBatch),
    BatchDeleted(MessageBatchDeleted),
    Batches(Page<MessageBatch>),
    Results(Vec<BatchResultLine>),
    Swept { ended: usize },
    Probe(Vec<ProbeOutcome>),
}

impl Output {
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message {
            message: text.into(),
        }
    }

    /// Failure when any probe step did not pass.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Probe(outcomes) if !outcomes.iter().all(ProbeOutcome::passed) => {
                ExitCode::FAILURE
            }
            _ => ExitCode::SUCCESS,
        }
    }

    /// Render for the terminal.
    pub fn render(&self, json: bool) -> String {
        if json {
            // Results are already JSON Lines.
            if let Self::Results(lines) = self {
                return jsonl(lines);
            }
            return serde_json::to_string_pretty(self)
                .unwrap_or_else(|err| format!("{{\"error\": \"{}\"}}", err));
        }
        match self {
            Self::Message { message } => message.clone(),
            Self::Invite(invite) => invite_line(invite),
            Self::InviteDeleted(receipt) => format!("deleted {}", receipt.id),
            Self::Invites(page) => page_lines(page, invite_line),
            Self::Workspace(workspace) => workspace_line(workspace),
            Self::Workspaces(page) => page_lines(page, workspace_line),
            Self::Batch(batch) => batch_line(batch),
            Self::BatchDeleted(receipt) => format!("deleted {}", receipt.id),
            Self::Batches(page) => page_lines(page, batch_line),
            Self::Results(lines) => jsonl(lines),
            Self::Swept { ended } => format!("settled {} message batch(es)", ended),
            Self::Probe(outcomes) => probe_report(outcomes),
        }
    }
}

fn invite_line(invite: &Invite) -> String {
    format!(
        "{}  {}  {}  {}  expires {}",
        invite.id, invite.email, invite.role, invite.status, invite.expires_at
    )
}

fn workspace_line(workspace: &Workspace) -> String {
    match &workspace.archived_at {
        Some(at) => format!("{}  {}  archived {}", workspace.id, workspace.name, at),
        None => format!("{}  {}  {}", workspace.id, workspace.name, workspace.display_color),
    }
}

fn batch_line(batch: &MessageBatch) -> String {
    let counts = &batch.request_counts;
    format!(
        "{}  {}  processing={} canceled={} expired={}",
        batch.id,
        batch.processing_status.as_str(),
        counts.processing,
        counts.canceled,
        counts.expired
    )
}

fn page_lines<T>(page: &Page<T>, line: fn(&T) -> String) -> String {
    let mut out: Vec<String> = page.data.iter().map(line).collect();
    if page.data.is_empty() {
        out.push("(none)".to_string());
    }
    if page.has_more {
        if let Some(last) = &page.last_id {
            out.push(format!("... more after {}", last));
        }
    }
    out.join("\n")
}

fn jsonl(lines: &[BatchResultLine]) -> String {
    lines
        .iter()
        .filter_map(|line| serde_json::to_string(line).ok())
        .collect::<Vec<_>>()
        .join("\n")
}

fn probe_report(outcomes: &[ProbeOutcome]) -> String {
    let mut out = Vec::new();
    for outcome in outcomes {
        let verdict = if outcome.passed() { "PASS" } else { "FAIL" };
        let status = outcome
            .status
            .map_or_else(|| "---".to_string(), |s| s.to_string());
        out.push(format!("{}  {}  {}", verdict, status, outcome.endpoint));
        if let Some(err) = &outcome.error {
            out.push(format!("      {}: {}", err.kind, err.message));
        }
        if let Some(transport) = &outcome.transport {
            out.push(format!("      transport: {}", transport));
        }
        for violation in &outcome.violations {
            out.push(format!("      {}", violation));
        }
    }
    let passed = outcomes.iter().filter(|o| o.passed()).count();
    out.push(format!("{}/{} steps passed", passed, outcomes.len()));
    out.join("\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn failed_probe_sets_exit_code() {
        let failing = ProbeOutcome {
            endpoint: "GET /v1/organizations/invites/invite_x".to_string(),
            status: Some(404),
            violations: Vec::new(),
            error: None,
            transport: None,
        };
        let output = Output::Probe(vec![failing]);
        assert_eq!(output.exit_code(), ExitCode::FAILURE);
        assert!(output.render(false).contains("FAIL  404"));
        assert_eq!(Output::Swept { ended: 2 }.exit_code(), ExitCode::SUCCESS);
    }

    #[test]
    fn swept_renders_as_object() {
        let text = Output::Swept { ended: 3 }.render(true);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["ended"], 3);
    }
}
