use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Serialized representation of a queued job.
///
/// This is what a [`QueueProvider`](super::QueueProvider) stores and what
/// crosses the broker when the worker runs in another process. An entry runs
/// once and is then dropped, so it carries no status of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEntry {
    pub id: Uuid,
    pub job_type: String,
    pub payload: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub enqueued_at: OffsetDateTime,
}

/// Receipt returned by [`enqueue`](super::enqueue).
///
/// Only confirms the queue accepted the job, not that it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobHandle {
    pub id: Uuid,
    pub enqueued_at: OffsetDateTime,
}

impl From<&JobEntry> for JobHandle {
    fn from(entry: &JobEntry) -> Self {
        Self {
            id: entry.id,
            enqueued_at: entry.enqueued_at,
        }
    }
}
