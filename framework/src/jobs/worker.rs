use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::entry::JobEntry;
use super::registry::JobRegistry;
use super::traits::QueueProvider;
use super::JobError;

const MAX_CONCURRENCY: usize = 1024;

/// Job processor that polls a [`QueueProvider`] and dispatches to handlers
/// registered in a [`JobRegistry`].
///
/// Each claimed entry is run once and then dropped. Nothing is re-queued.
///
/// ```ignore
/// let registry = JobRegistry::new().register::<SendEmailJob<WorkerContext>>();
///
/// let handle = Worker::new(queue, registry, ctx)
///     .concurrency(8)
///     .poll_interval(Duration::from_millis(500))
///     .start();
///
/// shutdown_signal().await;
/// handle.shutdown().await;
/// ```
pub struct Worker<Q: QueueProvider, S: Send + Sync + 'static> {
    queue: Q,
    registry: Arc<JobRegistry<S>>,
    ctx: Arc<S>,
    concurrency: usize,
    poll_interval: Duration,
    worker_id: String,
}

/// Outcome counts of a [`Worker::drain`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Drained {
    pub completed: usize,
    pub failed: usize,
}

impl Drained {
    pub fn total(&self) -> usize {
        self.completed + self.failed
    }
}

impl<Q: QueueProvider, S: Send + Sync + 'static> Worker<Q, S> {
    pub fn new(queue: Q, registry: JobRegistry<S>, ctx: S) -> Self {
        Self {
            queue,
            registry: Arc::new(registry),
            ctx: Arc::new(ctx),
            concurrency: 4,
            poll_interval: Duration::from_secs(1),
            worker_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Maximum number of jobs processed in parallel (default: 4).
    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// How often to poll when idle (default: 1s). Backs off slightly during
    /// idle streaks.
    pub fn poll_interval(mut self, d: Duration) -> Self {
        self.poll_interval = d;
        self
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Run every job currently in the queue, one after another.
    pub async fn drain(&self) -> Result<Drained, JobError> {
        let mut drained = Drained::default();
        while let Some(entry) = self.queue.claim_next().await? {
            match run_entry(entry, &*self.registry, self.ctx.clone(), &self.worker_id).await {
                Ok(()) => drained.completed += 1,
                Err(_) => drained.failed += 1,
            }
        }
        Ok(drained)
    }

    /// Start the worker loop on a background tokio task.
    ///
    /// The loop runs until [`WorkerHandle::shutdown`] is called or the handle
    /// is dropped.
    pub fn start(self) -> WorkerHandle {
        let Self {
            queue,
            registry,
            ctx,
            concurrency,
            poll_interval,
            worker_id,
        } = self;

        let (stop, mut stopped) = watch::channel(false);
        tracing::info!(%worker_id, concurrency, "⏳ Worker running");

        let task = tokio::spawn(async move {
            let semaphore = Arc::new(Semaphore::new(concurrency));
            let mut idle_streak: u32 = 0;

            loop {
                let permit = tokio::select! {
                    biased;
                    _ = stopped.changed() => break,
                    permit = semaphore.clone().acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };

                // Not raced against shutdown: a popped entry has already left the broker.
                let entry = match queue.claim_next().await {
                    Ok(Some(e)) => e,
                    Ok(None) => {
                        drop(permit);
                        idle_streak = idle_streak.saturating_add(1);
                        let backoff = poll_interval
                            .mul_f64((1.5_f64).min(1.0 + idle_streak as f64 * 0.1));
                        if pause(&mut stopped, backoff).await {
                            break;
                        }
                        continue;
                    }
                    Err(e) => {
                        drop(permit);
                        tracing::error!(error = %e, "failed to poll queue");
                        if pause(&mut stopped, poll_interval).await {
                            break;
                        }
                        continue;
                    }
                };

                idle_streak = 0;

                let registry = registry.clone();
                let ctx = ctx.clone();
                let worker_id = worker_id.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    // The outcome is traced inside run_entry.
                    let _ = run_entry(entry, &*registry, ctx, &worker_id).await;
                });
            }

            let in_flight = concurrency - semaphore.available_permits();
            if in_flight > 0 {
                tracing::info!(in_flight, "waiting for running jobs");
            }
            // Every running job holds one permit until it has finished.
            let _ = semaphore.acquire_many(concurrency as u32).await;
            tracing::info!(%worker_id, "worker stopped");
        });

        WorkerHandle { stop, task }
    }
}

/// Handle to a running [`Worker`] loop.
///
/// Dropping the handle also stops the loop, but only
/// [`shutdown`](Self::shutdown) waits for the jobs it already claimed.
pub struct WorkerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Stop claiming entries and wait until every claimed job has finished.
    pub async fn shutdown(self) {
        self.stop.send_replace(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "worker loop ended abnormally");
        }
    }
}

/// Sleep for `d`. Returns `true` early if shutdown was requested.
async fn pause(stopped: &mut watch::Receiver<bool>, d: Duration) -> bool {
    tokio::select! {
        _ = stopped.changed() => true,
        _ = tokio::time::sleep(d) => false,
    }
}

/// Run one claimed entry and trace its outcome. The error is the text that
/// was traced.
async fn run_entry<S: Send + Sync + 'static>(
    entry: JobEntry,
    registry: &JobRegistry<S>,
    ctx: Arc<S>,
    worker_id: &str,
) -> Result<(), String> {
    let JobEntry {
        id: job_id,
        job_type,
        payload,
        enqueued_at,
    } = entry;

    let Some(handler) = registry.get(&job_type).cloned() else {
        tracing::error!(%job_id, %job_type, "no handler registered");
        return Err("unknown job type".to_string());
    };

    let queued_ms = (OffsetDateTime::now_utc() - enqueued_at).whole_milliseconds() as i64;
    let span = tracing::info_span!("job", %job_id, %job_type, %worker_id, queued_ms);

    match handler(payload, ctx).instrument(span).await {
        Ok(()) => {
            tracing::info!(%job_id, %job_type, "job completed");
            Ok(())
        }
        Err(e) => {
            let error_msg = e.to_string();
            tracing::error!(%job_id, %job_type, %error_msg, "job failed");
            Err(error_msg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{enqueue, into_entry, Job, JobResult, MemoryQueue};
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        runs: AtomicUsize,
    }

    #[derive(Serialize, Deserialize)]
    struct CountJob {
        fail: bool,
    }

    #[async_trait]
    impl Job for CountJob {
        const JOB_TYPE: &'static str = "test::count";
        type Context = Counter;

        async fn perform(self, ctx: &Counter) -> JobResult {
            ctx.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err("boom".into());
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn successful_job_completes() {
        let registry = JobRegistry::new().register::<CountJob>();
        let entry = into_entry(&CountJob { fail: false }).unwrap();

        let counter = Arc::new(Counter::default());
        let result = run_entry(entry, &registry, counter.clone(), "w").await;
        assert_eq!(result, Ok(()));
        assert_eq!(counter.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_job_is_not_retried() {
        let queue = MemoryQueue::new();
        enqueue(&queue, CountJob { fail: true }).await.unwrap();

        let counter = Arc::new(Counter::default());
        let registry = JobRegistry::new().register::<CountJob>();
        let entry = queue.claim_next().await.unwrap().unwrap();

        let result = run_entry(entry, &registry, counter.clone(), "w").await;
        assert_eq!(result, Err("boom".to_string()));
        assert_eq!(counter.runs.load(Ordering::SeqCst), 1);
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn undecodable_payload_fails_without_running() {
        let counter = Arc::new(Counter::default());
        let registry = JobRegistry::new().register::<CountJob>();
        let mut entry = into_entry(&CountJob { fail: false }).unwrap();
        entry.payload = serde_json::json!({"unexpected": true});

        let result = run_entry(entry, &registry, counter.clone(), "w").await;
        assert!(result.unwrap_err().starts_with("invalid test::count payload"));
        assert_eq!(counter.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_job_type_fails() {
        let registry: JobRegistry<Counter> = JobRegistry::new();
        let entry = into_entry(&CountJob { fail: false }).unwrap();

        let result = run_entry(entry, &registry, Arc::new(Counter::default()), "w").await;
        assert_eq!(result, Err("unknown job type".to_string()));
    }

    #[tokio::test]
    async fn drain_counts_outcomes() {
        let queue = MemoryQueue::new();
        enqueue(&queue, CountJob { fail: false }).await.unwrap();
        enqueue(&queue, CountJob { fail: true }).await.unwrap();
        enqueue(&queue, CountJob { fail: false }).await.unwrap();

        let worker = Worker::new(queue.clone(), JobRegistry::new().register::<CountJob>(), Counter::default());
        let drained = worker.drain().await.unwrap();
        assert_eq!(drained, Drained { completed: 2, failed: 1 });
        assert!(queue.is_empty().await);
    }

    #[test]
    fn concurrency_is_clamped() {
        let worker = Worker::new(MemoryQueue::new(), JobRegistry::<Counter>::new(), Counter::default());
        assert_eq!(worker.concurrency(0).concurrency, 1);

        let worker = Worker::new(MemoryQueue::new(), JobRegistry::<Counter>::new(), Counter::default());
        assert_eq!(worker.concurrency(usize::MAX).concurrency, MAX_CONCURRENCY);
    }

    #[tokio::test]
    async fn shutdown_of_idle_worker_returns_promptly() {
        let worker = Worker::new(MemoryQueue::new(), JobRegistry::<Counter>::new(), Counter::default())
            .poll_interval(Duration::from_secs(60));
        let handle = worker.start();
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .expect("idle worker did not stop");
    }
}
