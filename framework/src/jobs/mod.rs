//! Fire-and-forget background jobs over a pluggable queue.
//!
//! # Architecture
//!
//! - [`Job`]: serializable job trait combining payload with `perform`.
//! - [`JobEntry`]: the serialized form that travels through a queue.
//! - [`QueueProvider`]: backend trait. [`MemoryQueue`] keeps entries in
//!   process, [`RedisQueue`] pushes them to an external broker, and [`Broker`]
//!   picks one at runtime.
//! - [`JobRegistry`]: maps job type strings to deserialization + execution.
//! - [`Worker`]: polls a provider and runs each claimed entry once.
//!
//! Delivery is at-most-once. A claimed entry is gone from the queue; if the
//! worker dies mid-job, the job is lost.
//!
//! # Quick Start
//!
//! ```ignore
//! let queue = MemoryQueue::new();
//! let handle = enqueue(&queue, SendEmailJob::<WorkerContext>::new("a@b.com")).await?;
//!
//! let registry = JobRegistry::new().register::<SendEmailJob<WorkerContext>>();
//! let worker = Worker::new(queue, registry, ctx).start();
//! // ...
//! worker.shutdown().await;
//! ```

mod broker;
mod entry;
mod memory;
mod redis_queue;
mod registry;
mod traits;
mod worker;

pub use broker::Broker;
pub use entry::{JobEntry, JobHandle};
pub use memory::MemoryQueue;
pub use redis_queue::RedisQueue;
pub use registry::JobRegistry;
pub use traits::{Job, JobResult, QueueProvider};
pub use worker::{Drained, Worker, WorkerHandle};

use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("broker error: {0}")]
    Broker(#[from] redis::RedisError),
    #[error("queue is full ({0} pending jobs)")]
    QueueFull(usize),
    #[error("unsupported broker url: {0}")]
    UnsupportedBroker(String),
}

/// Serialize a [`Job`] into a [`JobEntry`] ready to insert.
pub fn into_entry<J: Job>(job: &J) -> Result<JobEntry, JobError> {
    Ok(JobEntry {
        id: Uuid::new_v4(),
        job_type: J::JOB_TYPE.to_string(),
        payload: serde_json::to_value(job)?,
        enqueued_at: OffsetDateTime::now_utc(),
    })
}

/// Serialize a job and hand it to the queue. Returns as soon as the queue has
/// accepted it; the job runs later on whichever worker claims it.
pub async fn enqueue<J: Job>(queue: &impl QueueProvider, job: J) -> Result<JobHandle, JobError> {
    let entry = into_entry(&job)?;
    let handle = JobHandle::from(&entry);
    queue.insert(&entry).await?;
    Ok(handle)
}
