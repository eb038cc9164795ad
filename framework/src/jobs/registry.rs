use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::traits::{Job, JobResult};

type HandlerFn<S> =
    dyn Fn(serde_json::Value, Arc<S>) -> Pin<Box<dyn Future<Output = JobResult> + Send>> + Send + Sync;

pub(crate) type BoxedHandler<S> = Arc<HandlerFn<S>>;

/// Maps job type strings to deserialization + execution logic.
///
/// Register each [`Job`] type before passing the registry to a [`Worker`](super::Worker).
/// A payload that does not decode as the registered type fails the job
/// without running it.
pub struct JobRegistry<S: Send + Sync + 'static> {
    handlers: HashMap<&'static str, BoxedHandler<S>>,
}

impl<S: Send + Sync + 'static> JobRegistry<S> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a [`Job`] type. Registering the same `JOB_TYPE` twice keeps
    /// the later handler.
    pub fn register<J: Job<Context = S>>(mut self) -> Self {
        let handler: BoxedHandler<S> = Arc::new(|payload, ctx| {
            Box::pin(async move {
                let job: J = serde_json::from_value(payload)
                    .map_err(|e| format!("invalid {} payload: {e}", J::JOB_TYPE))?;
                job.perform(&ctx).await
            })
        });
        if self.handlers.insert(J::JOB_TYPE, handler).is_some() {
            tracing::warn!(job_type = J::JOB_TYPE, "job type registered twice");
        }
        self
    }

    pub(crate) fn get(&self, job_type: &str) -> Option<&BoxedHandler<S>> {
        self.handlers.get(job_type)
    }

    pub fn job_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }
}

impl<S: Send + Sync + 'static> Default for JobRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
