use std::time::Duration;

use async_trait::async_trait;

use super::entry::JobEntry;
use super::memory::MemoryQueue;
use super::redis_queue::RedisQueue;
use super::traits::QueueProvider;
use super::JobError;

/// Queue backend selected at runtime from a broker URL.
#[derive(Clone)]
pub enum Broker {
    Memory(MemoryQueue),
    Redis(RedisQueue),
}

impl Broker {
    /// `memory` gives an in-process queue; `redis://` and `rediss://` URLs
    /// give a [`RedisQueue`] on `queue_name`.
    pub fn from_url(url: &str, queue_name: &str, timeout: Duration) -> Result<Self, JobError> {
        if url == "memory" {
            return Ok(Self::Memory(MemoryQueue::new()));
        }
        if url.starts_with("redis://") || url.starts_with("rediss://") {
            return Ok(Self::Redis(RedisQueue::new(url, queue_name, timeout)?));
        }
        Err(JobError::UnsupportedBroker(url.to_string()))
    }

    /// Whether producers and workers can live in separate processes.
    pub fn is_external(&self) -> bool {
        matches!(self, Self::Redis(_))
    }
}

impl From<MemoryQueue> for Broker {
    fn from(queue: MemoryQueue) -> Self {
        Self::Memory(queue)
    }
}

impl From<RedisQueue> for Broker {
    fn from(queue: RedisQueue) -> Self {
        Self::Redis(queue)
    }
}

#[async_trait]
impl QueueProvider for Broker {
    async fn insert(&self, entry: &JobEntry) -> Result<(), JobError> {
        match self {
            Self::Memory(q) => q.insert(entry).await,
            Self::Redis(q) => q.insert(entry).await,
        }
    }

    async fn claim_next(&self) -> Result<Option<JobEntry>, JobError> {
        match self {
            Self::Memory(q) => q.claim_next().await,
            Self::Redis(q) => q.claim_next().await,
        }
    }
}
