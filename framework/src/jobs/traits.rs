use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use super::entry::JobEntry;
use super::JobError;

/// A serializable job with typed execution logic.
///
/// The job's fields become the serialized payload, and `perform` defines the
/// execution logic. `perform` runs at most once per enqueue.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Ping { target: String }
///
/// #[async_trait]
/// impl Job for Ping {
///     const JOB_TYPE: &'static str = "ping";
///     type Context = AppState;
///
///     async fn perform(self, ctx: &AppState) -> JobResult {
///         ctx.client.ping(&self.target).await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Job: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Unique identifier for this job type (e.g. `"courier::send_email"`).
    const JOB_TYPE: &'static str;

    /// Application state provided at execution time.
    type Context: Send + Sync + 'static;

    async fn perform(self, ctx: &Self::Context) -> JobResult;
}

/// Return type of [`Job::perform`].
pub type JobResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Backend-agnostic queue storage.
///
/// Implementations hand each inserted entry to at most one `claim_next`
/// caller. A claimed entry is gone from the queue and is not redelivered.
#[async_trait]
pub trait QueueProvider: Send + Sync + Clone + 'static {
    /// Insert a new job entry into the queue.
    async fn insert(&self, entry: &JobEntry) -> Result<(), JobError>;

    /// Remove and return the oldest pending entry, or `None` when the queue
    /// is empty.
    async fn claim_next(&self) -> Result<Option<JobEntry>, JobError>;
}
