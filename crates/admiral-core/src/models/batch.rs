//! Message batches.

use super::object_marker;
use crate::{MessageBatchId, Timestamp};
use serde::{Deserialize, Serialize};

/// Hours a batch may stay in progress before it expires.
pub const BATCH_TTL_HOURS: i64 = 24;

/// Most requests accepted in one batch.
pub const MAX_BATCH_REQUESTS: usize = 100_000;

object_marker!(
    /// `"message_batch"`
    MessageBatchObject::MessageBatch = "message_batch"
);

object_marker!(
    /// `"message_batch_deleted"`
    MessageBatchDeletedObject::MessageBatchDeleted = "message_batch_deleted"
);

/// Processing state of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    InProgress,
    Canceling,
    Ended,
}

impl ProcessingStatus {
    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Canceling => "canceling",
            Self::Ended => "ended",
        }
    }
}

/// Per-outcome request tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCounts {
    pub processing: u64,
    pub succeeded: u64,
    pub errored: u64,
    pub canceled: u64,
    pub expired: u64,
}

impl RequestCounts {
    /// Sum of every bucket.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.processing
            .saturating_add(self.succeeded)
            .saturating_add(self.errored)
            .saturating_add(self.canceled)
            .saturating_add(self.expired)
    }
}

/// An asynchronous batch of message requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBatch {
    pub id: MessageBatchId,
    #[serde(rename = "type")]
    pub object: MessageBatchObject,
    pub processing_status: ProcessingStatus,
    pub request_counts: RequestCounts,
    pub ended_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub archived_at: Option<Timestamp>,
    pub cancel_initiated_at: Option<Timestamp>,
    pub results_url: Option<String>,
}

impl MessageBatch {
    /// A freshly submitted batch of `request_count` requests.
    #[must_use]
    pub fn submitted(id: MessageBatchId, request_count: u64, now: Timestamp) -> Self {
        Self {
            id,
            object: MessageBatchObject::MessageBatch,
            processing_status: ProcessingStatus::InProgress,
            request_counts: RequestCounts {
                processing: request_count,
                ..RequestCounts::default()
            },
            ended_at: None,
            created_at: now,
            expires_at: now.plus_hours(BATCH_TTL_HOURS),
            archived_at: None,
            cancel_initiated_at: None,
            results_url: None,
        }
    }
}

/// Response of `DELETE /v1/messages/batches/{message_batch_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBatchDeleted {
    pub id: MessageBatchId,
    #[serde(rename = "type")]
    pub object: MessageBatchDeletedObject,
}

impl MessageBatchDeleted {
    #[must_use]
    pub fn new(id: MessageBatchId) -> Self {
        Self {
            id,
            object: MessageBatchDeletedObject::MessageBatchDeleted,
        }
    }
}

/// One request of `POST /v1/messages/batches`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub custom_id: String,
    pub params: serde_json::Value,
}

/// Body of `POST /v1/messages/batches`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBatchRequest {
    pub requests: Vec<BatchRequest>,
}

/// Why an ended batch stopped processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchOutcome {
    Canceled,
    Expired,
}

/// Result of a single request, as reported in the results stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchResult {
    Canceled,
    Expired,
}

impl From<BatchOutcome> for BatchResult {
    fn from(outcome: BatchOutcome) -> Self {
        match outcome {
            BatchOutcome::Canceled => Self::Canceled,
            BatchOutcome::Expired => Self::Expired,
        }
    }
}

/// One line of the JSONL results stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResultLine {
    pub custom_id: String,
    pub result: BatchResult,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deletion_receipt_matches_documented_shape() {
        let receipt =
            MessageBatchDeleted::new(
                MessageBatchId::parse("msgbatch_013Zva2CMHLNnXjNJJKqJ2EF").unwrap(),
            );
        assert_eq!(
            serde_json::to_value(&receipt).unwrap(),
            json!({"id": "msgbatch_013Zva2CMHLNnXjNJJKqJ2EF", "type": "message_batch_deleted"})
        );
        let back: MessageBatchDeleted = serde_json::from_value(json!({
            "id": "msgbatch_013Zva2CMHLNnXjNJJKqJ2EF",
            "type": "message_batch_deleted"
        }))
        .unwrap();
        assert_eq!(back, receipt);
    }

    #[test]
    fn submitted_batch_shape() {
        let now = Timestamp::parse("2024-08-20T18:37:24.100435Z").unwrap();
        let batch = MessageBatch::submitted(MessageBatchId::parse("msgbatch_abc").unwrap(), 3, now);
        assert_eq!(
            serde_json::to_value(&batch).unwrap(),
            json!({
                "id": "msgbatch_abc",
                "type": "message_batch",
                "processing_status": "in_progress",
                "request_counts": {
                    "processing": 3, "succeeded": 0, "errored": 0, "canceled": 0, "expired": 0
                },
                "ended_at": null,
                "created_at": "2024-08-20T18:37:24.100435Z",
                "expires_at": "2024-08-21T18:37:24.100435Z",
                "archived_at": null,
                "cancel_initiated_at": null,
                "results_url": null
            })
        );
        assert_eq!(batch.request_counts.total(), 3);
    }

    #[test]
    fn result_lines_are_tagged() {
        let line = BatchResultLine {
            custom_id: "req-1".to_string(),
            result: BatchOutcome::Expired.into(),
        };
        assert_eq!(
            serde_json::to_string(&line).unwrap(),
            r#"{"custom_id":"req-1","result":{"type":"expired"}}"#
        );
    }
}
