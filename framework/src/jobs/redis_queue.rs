use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use tokio::sync::OnceCell;

use super::entry::JobEntry;
use super::traits::QueueProvider;
use super::JobError;

/// [`QueueProvider`] backed by a Redis list.
///
/// Producers `LPUSH` JSON-encoded entries onto `courier:queue:<name>` and
/// workers `RPOP` them, so the list behaves as a FIFO shared between
/// processes. Popping removes the entry, which makes delivery at-most-once.
///
/// The connection is opened on first use, so a process can start while the
/// broker is down; each operation then fails with [`JobError::Broker`] until
/// a connection succeeds.
#[derive(Clone)]
pub struct RedisQueue {
    client: redis::Client,
    conn: Arc<OnceCell<ConnectionManager>>,
    key: Arc<str>,
    timeout: Duration,
}

impl RedisQueue {
    pub fn new(url: &str, queue_name: &str, timeout: Duration) -> Result<Self, JobError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            conn: Arc::new(OnceCell::new()),
            key: queue_key(queue_name).into(),
            timeout,
        })
    }

    /// Redis key holding the pending entries.
    pub fn key(&self) -> &str {
        &self.key
    }

    async fn connection(&self) -> Result<ConnectionManager, JobError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let config = ConnectionManagerConfig::new()
                    .set_connection_timeout(self.timeout)
                    .set_response_timeout(self.timeout)
                    .set_number_of_retries(1);
                tracing::debug!(key = %self.key, "connecting to broker");
                ConnectionManager::new_with_config(self.client.clone(), config).await
            })
            .await?;
        Ok(conn.clone())
    }
}

fn queue_key(queue_name: &str) -> String {
    format!("courier:queue:{queue_name}")
}

#[async_trait]
impl QueueProvider for RedisQueue {
    async fn insert(&self, entry: &JobEntry) -> Result<(), JobError> {
        let payload = serde_json::to_string(entry)?;
        let mut conn = self.connection().await?;
        conn.lpush::<_, _, ()>(&*self.key, payload).await?;
        Ok(())
    }

    async fn claim_next(&self) -> Result<Option<JobEntry>, JobError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn.rpop(&*self.key, None).await?;

        raw.map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(JobError::from)
    }
}
