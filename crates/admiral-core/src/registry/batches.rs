//! Message batch operations.
//!
//! Lifecycle:
//!
//! ```text
//! in_progress ──cancel──► canceling ──(next observation)──► ended (canceled)
//!      │
//!      └──(expires_at reached)──────────────────────────────► ended (expired)
//! ```
//!
//! Requests are never executed here, so they only leave `processing` when
//! the batch is canceled or expires. Settling happens whenever a batch is
//! read, and in bulk through [`Registry::sweep`].

use super::Registry;
use crate::models::{
    paginate, BatchOutcome, BatchResultLine, CreateBatchRequest, MessageBatch,
    MessageBatchDeleted, Page, PageRequest, ProcessingStatus, BATCH_MAX_PAGE_LIMIT,
    MAX_BATCH_REQUESTS,
};
use crate::storage::{Collection, ReadRecords, StoreTxn};
use crate::{validate, Error, MessageBatchId, Result, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Stored form of a batch: the wire object plus what results need.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BatchRecord {
    batch: MessageBatch,
    custom_ids: Vec<String>,
    outcome: Option<BatchOutcome>,
}

fn load(tx: &StoreTxn<'_>, id: &MessageBatchId) -> Result<(u64, BatchRecord)> {
    tx.get(Collection::Batches, id.as_str())?
        .ok_or_else(|| Error::not_found(format!("message batch '{}' not found", id)))
}

fn validate_requests(request: &CreateBatchRequest) -> Result<()> {
    if request.requests.is_empty() {
        return Err(Error::invalid("requests: must contain at least one request"));
    }
    if request.requests.len() > MAX_BATCH_REQUESTS {
        return Err(Error::invalid(format!(
            "requests: at most {} requests per batch, got {}",
            MAX_BATCH_REQUESTS,
            request.requests.len()
        )));
    }

    let mut seen = BTreeSet::new();
    for (index, item) in request.requests.iter().enumerate() {
        validate::custom_id(&item.custom_id).map_err(|err| match err {
            Error::InvalidRequest(message) => {
                Error::InvalidRequest(format!("requests[{}].{}", index, message))
            }
            other => other,
        })?;
        if !seen.insert(item.custom_id.as_str()) {
            return Err(Error::invalid(format!(
                "requests[{}].custom_id: '{}' is used more than once",
                index, item.custom_id
            )));
        }
        if !item.params.is_object() {
            return Err(Error::invalid(format!(
                "requests[{}].params: must be an object",
                index
            )));
        }
    }
    Ok(())
}

impl Registry {
    fn results_url(&self, id: &MessageBatchId) -> String {
        format!("{}/v1/messages/batches/{}/results", self.public_url(), id)
    }

    /// Move a due batch to `ended`. Returns whether anything changed.
    fn settle(&self, record: &mut BatchRecord, now: Timestamp) -> bool {
        let outcome = match record.batch.processing_status {
            ProcessingStatus::Canceling => BatchOutcome::Canceled,
            ProcessingStatus::InProgress if record.batch.expires_at <= now => BatchOutcome::Expired,
            _ => return false,
        };

        let batch = &mut record.batch;
        let pending = std::mem::take(&mut batch.request_counts.processing);
        match outcome {
            BatchOutcome::Canceled => {
                batch.request_counts.canceled =
                    batch.request_counts.canceled.saturating_add(pending);
            }
            BatchOutcome::Expired => {
                batch.request_counts.expired = batch.request_counts.expired.saturating_add(pending);
            }
        }
        batch.processing_status = ProcessingStatus::Ended;
        batch.ended_at = Some(now);
        batch.results_url = Some(self.results_url(&batch.id));
        record.outcome = Some(outcome);
        true
    }

    fn load_settled(
        &self,
        tx: &StoreTxn<'_>,
        id: &MessageBatchId,
        now: Timestamp,
    ) -> Result<(u64, BatchRecord)> {
        let (seq, mut record) = load(tx, id)?;
        if self.settle(&mut record, now) {
            tx.put(Collection::Batches, id.as_str(), seq, &record)?;
        }
        Ok((seq, record))
    }

    /// Submit a batch of message requests.
    pub fn create_batch(
        &self,
        request: &CreateBatchRequest,
        now: Timestamp,
    ) -> Result<MessageBatch> {
        validate_requests(request)?;
        self.transact(|tx| {
            let seq = tx.next_sequence(Collection::Batches)?;
            let batch = MessageBatch::submitted(
                MessageBatchId::from_sequence(seq),
                request.requests.len() as u64,
                now,
            );
            let record = BatchRecord {
                batch: batch.clone(),
                custom_ids: request
                    .requests
                    .iter()
                    .map(|item| item.custom_id.clone())
                    .collect(),
                outcome: None,
            };
            tx.put(Collection::Batches, batch.id.as_str(), seq, &record)?;
            Ok(batch)
        })
    }

    pub fn get_batch(&self, id: &MessageBatchId, now: Timestamp) -> Result<MessageBatch> {
        self.transact(|tx| self.load_settled(tx, id, now))
            .map(|(_, record)| record.batch)
    }

    /// Batches, most recently created first.
    pub fn list_batches(&self, page: &PageRequest, now: Timestamp) -> Result<Page<MessageBatch>> {
        let mut batches: Vec<MessageBatch> = self.transact(|tx| {
            let mut out = Vec::new();
            for (seq, mut record) in tx.list::<BatchRecord>(Collection::Batches)? {
                if self.settle(&mut record, now) {
                    tx.put(Collection::Batches, record.batch.id.as_str(), seq, &record)?;
                }
                out.push(record.batch);
            }
            Ok(out)
        })?;
        batches.reverse();
        paginate(batches, page, BATCH_MAX_PAGE_LIMIT, |batch| batch.id.as_str())
    }

    /// Begin canceling an in-progress batch.
    pub fn cancel_batch(&self, id: &MessageBatchId, now: Timestamp) -> Result<MessageBatch> {
        self.transact(|tx| {
            let (seq, mut record) = self.load_settled(tx, id, now)?;
            match record.batch.processing_status {
                ProcessingStatus::InProgress => {
                    record.batch.processing_status = ProcessingStatus::Canceling;
                    record.batch.cancel_initiated_at = Some(now);
                    tx.put(Collection::Batches, id.as_str(), seq, &record)?;
                    Ok(record.batch)
                }
                ProcessingStatus::Canceling => Err(Error::invalid(format!(
                    "message batch '{}' is already being canceled",
                    id
                ))),
                ProcessingStatus::Ended => Err(Error::invalid(format!(
                    "message batch '{}' has already ended",
                    id
                ))),
            }
        })
    }

    /// `DELETE /v1/messages/batches/{message_batch_id}`.
    ///
    /// Only ended batches can be deleted; afterwards the id is unknown.
    pub fn delete_batch(&self, id: &MessageBatchId, now: Timestamp) -> Result<MessageBatchDeleted> {
        self.transact(|tx| {
            let (_, record) = self.load_settled(tx, id, now)?;
            if record.batch.processing_status != ProcessingStatus::Ended {
                return Err(Error::invalid(format!(
                    "message batch '{}' is still {}; cancel it and wait for it to end before deleting",
                    id,
                    record.batch.processing_status.as_str()
                )));
            }
            tx.remove(Collection::Batches, id.as_str())?;
            Ok(MessageBatchDeleted::new(id.clone()))
        })
    }

    /// Per-request results of an ended batch, in submission order.
    pub fn batch_results(
        &self,
        id: &MessageBatchId,
        now: Timestamp,
    ) -> Result<Vec<BatchResultLine>> {
        let (_, record) = self.transact(|tx| self.load_settled(tx, id, now))?;
        let Some(outcome) = record.outcome else {
            return Err(Error::invalid(format!(
                "results for message batch '{}' are not available until it has ended",
                id
            )));
        };
        Ok(record
            .custom_ids
            .into_iter()
            .map(|custom_id| BatchResultLine {
                custom_id,
                result: outcome.into(),
            })
            .collect())
    }

    /// Settle every due batch. Returns how many ended.
    pub fn sweep(&self, now: Timestamp) -> Result<usize> {
        self.transact(|tx| {
            let mut ended = 0usize;
            for (seq, mut record) in tx.list::<BatchRecord>(Collection::Batches)? {
                if self.settle(&mut record, now) {
                    tx.put(Collection::Batches, record.batch.id.as_str(), seq, &record)?;
                    ended = ended.saturating_add(1);
                }
            }
            Ok(ended)
        })
    }
}
