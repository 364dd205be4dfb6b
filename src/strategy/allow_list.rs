use anyhow::Result;
use log::{info, warn};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Mints the operator wants to snipe, read from a line-delimited file
pub struct AllowList {
    path: PathBuf,
    mints: RwLock<HashSet<Pubkey>>,
}

impl AllowList {
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let list = Self {
            path: path.as_ref().to_path_buf(),
            mints: RwLock::new(HashSet::new()),
        };
        list.reload().await?;
        Ok(list)
    }

    pub fn from_mints<I: IntoIterator<Item = Pubkey>>(mints: I) -> Self {
        Self {
            path: PathBuf::new(),
            mints: RwLock::new(mints.into_iter().collect()),
        }
    }

    pub fn parse(content: &str) -> HashSet<Pubkey> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| match Pubkey::from_str(line) {
                Ok(mint) => Some(mint),
                Err(e) => {
                    warn!("⚠️ Ignoring invalid allow-list entry '{}': {}", line, e);
                    None
                }
            })
            .collect()
    }

    /// Re-read the file; returns the new entry count
    pub async fn reload(&self) -> Result<usize> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let parsed = Self::parse(&content);
        let count = parsed.len();

        let mut mints = self.mints.write().await;
        if mints.len() != count {
            info!("📋 Loaded allow list: {} mints", count);
        }
        *mints = parsed;
        Ok(count)
    }

    pub async fn contains(&self, mint: &Pubkey) -> bool {
        self.mints.read().await.contains(mint)
    }

    pub async fn len(&self) -> usize {
        self.mints.read().await.len()
    }

    /// Reload on a fixed interval; a failed reload keeps the previous entries
    pub fn spawn_refresh(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let list = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = list.reload().await {
                    warn!("⚠️ Allow list reload failed, keeping previous entries: {}", e);
                }
            }
        })
    }
}
