use log::{debug, info, warn};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::executor::errors::ExecutionError;

/// Blockhash as last seen by the refresher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedBlockhash {
    pub hash: Hash,
    pub slot: u64,
    pub fetched_at: Instant,
}

impl CachedBlockhash {
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}

/// Recent blockhash kept warm for signing swaps.
///
/// A background task refreshes it every `update_interval`. Readers get the
/// cached value while it is younger than `max_age` and fall back to a direct
/// RPC fetch otherwise, so a stalled refresher never signs with an expired hash.
pub struct BlockhashCache {
    latest: Arc<watch::Sender<Option<CachedBlockhash>>>,
    rpc_client: Arc<RpcClient>,
    update_interval: Duration,
    max_age: Duration,
    refresher: Option<JoinHandle<()>>,
}

impl BlockhashCache {
    /// `rpc_endpoint` is the full RPC URL including any api key
    pub fn new(rpc_endpoint: String, update_interval: Duration, max_age: Duration) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            latest: Arc::new(latest),
            rpc_client: Arc::new(RpcClient::new(rpc_endpoint)),
            update_interval,
            max_age,
            refresher: None,
        }
    }

    pub fn start(&mut self) -> Result<(), ExecutionError> {
        if self.is_running() {
            return Ok(());
        }
        if self.update_interval.is_zero() {
            return Err(ExecutionError::Configuration(
                "blockhash_cache.update_interval_ms must be greater than 0".to_string(),
            ));
        }

        let latest = Arc::clone(&self.latest);
        let rpc_client = Arc::clone(&self.rpc_client);
        let update_interval = self.update_interval;

        self.refresher = Some(tokio::spawn(async move {
            info!("🔄 Blockhash refresher started, every {:?}", update_interval);
            let mut ticker = tokio::time::interval(update_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match fetch(&rpc_client).await {
                    Ok(fresh) => {
                        debug!("🔄 Blockhash {} at slot {}", fresh.hash, fresh.slot);
                        latest.send_replace(Some(fresh));
                    }
                    // keep serving the previous value until it ages out
                    Err(e) => warn!("⚠️ Blockhash refresh failed: {}", e),
                }
            }
        }));

        Ok(())
    }

    pub async fn stop(&mut self) {
        if let Some(refresher) = self.refresher.take() {
            refresher.abort();
            let _ = refresher.await;
            info!("🛑 Blockhash refresher stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.refresher.as_ref().map(|task| !task.is_finished()).unwrap_or(false)
    }

    /// Last cached value, whatever its age
    pub fn snapshot(&self) -> Option<CachedBlockhash> {
        *self.latest.borrow()
    }

    /// Cached blockhash when fresh enough, otherwise fetched and cached now
    pub async fn get_blockhash(&self) -> Result<Hash, ExecutionError> {
        match self.snapshot() {
            Some(cached) if cached.age() <= self.max_age => Ok(cached.hash),
            stale => {
                if let Some(cached) = stale {
                    warn!("⚠️ Cached blockhash is {:.1}s old, fetching a new one", cached.age().as_secs_f64());
                }
                let fresh = fetch(&self.rpc_client).await?;
                self.latest.send_replace(Some(fresh));
                Ok(fresh.hash)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn seed(&self, hash: Hash, slot: u64) {
        self.latest.send_replace(Some(CachedBlockhash { hash, slot, fetched_at: Instant::now() }));
    }
}

impl Drop for BlockhashCache {
    fn drop(&mut self) {
        if let Some(refresher) = self.refresher.take() {
            refresher.abort();
        }
    }
}

async fn fetch(rpc_client: &RpcClient) -> Result<CachedBlockhash, ExecutionError> {
    let (hash, slot) = tokio::try_join!(
        async {
            rpc_client
                .get_latest_blockhash()
                .await
                .map_err(|e| ExecutionError::Network(format!("getLatestBlockhash failed: {}", e)))
        },
        async {
            rpc_client
                .get_slot()
                .await
                .map_err(|e| ExecutionError::Network(format!("getSlot failed: {}", e)))
        },
    )?;

    Ok(CachedBlockhash { hash, slot, fetched_at: Instant::now() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> BlockhashCache {
        BlockhashCache::new(
            "http://127.0.0.1:8899".to_string(),
            Duration::from_millis(400),
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn test_new_cache_is_empty_and_idle() {
        let cache = cache();
        assert!(!cache.is_running());
        assert!(cache.snapshot().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_seed_is_served_without_rpc() {
        let cache = cache();
        let hash = Hash::new_unique();
        cache.seed(hash, 42);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.get_blockhash().await.unwrap(), hash);
        assert_eq!(cache.snapshot().map(|c| c.slot), Some(42));
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        let mut cache = BlockhashCache::new("http://127.0.0.1:8899".to_string(), Duration::ZERO, Duration::from_secs(10));
        assert!(matches!(cache.start(), Err(ExecutionError::Configuration(_))));
        assert!(!cache.is_running());
    }
}
