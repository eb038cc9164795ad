use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::entry::JobEntry;
use super::traits::QueueProvider;
use super::JobError;

/// In-memory [`QueueProvider`] for a worker running in the same process.
///
/// Jobs are held in a FIFO behind a mutex and are lost on restart. An optional
/// capacity makes [`insert`](QueueProvider::insert) fail with
/// [`JobError::QueueFull`] instead of growing without bound.
#[derive(Clone, Default)]
pub struct MemoryQueue {
    entries: Arc<Mutex<VecDeque<JobEntry>>>,
    capacity: Option<usize>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounded(capacity: usize) -> Self {
        Self {
            entries: Arc::default(),
            capacity: Some(capacity),
        }
    }

    /// Number of entries waiting to be claimed.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl QueueProvider for MemoryQueue {
    async fn insert(&self, entry: &JobEntry) -> Result<(), JobError> {
        let mut entries = self.entries.lock().await;
        if let Some(cap) = self.capacity {
            if entries.len() >= cap {
                return Err(JobError::QueueFull(entries.len()));
            }
        }
        entries.push_back(entry.clone());
        Ok(())
    }

    async fn claim_next(&self) -> Result<Option<JobEntry>, JobError> {
        Ok(self.entries.lock().await.pop_front())
    }
}
