use log::{debug, info, warn};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::strategy::orchestrator::LifecycleOrchestrator;

/// Which subscription an account update came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    Market,
    Pool,
    Wallet,
}

impl AccountKind {
    /// Subscription filter name used on the wire
    pub fn filter_name(&self) -> &'static str {
        match self {
            AccountKind::Market => "market",
            AccountKind::Pool => "pool",
            AccountKind::Wallet => "wallet",
        }
    }

    pub fn from_filter_name(name: &str) -> Option<Self> {
        match name {
            "market" => Some(AccountKind::Market),
            "pool" => Some(AccountKind::Pool),
            "wallet" => Some(AccountKind::Wallet),
            _ => None,
        }
    }
}

/// Raw account update from the stream
#[derive(Debug, Clone)]
pub struct AccountUpdate {
    pub kind: AccountKind,
    pub pubkey: Pubkey,
    pub data: Vec<u8>,
    pub slot: u64,
}

/// Hands every stream update to the orchestrator on its own task, so a slow
/// lifecycle never blocks the stream.
pub struct EventDispatcher {
    rx: mpsc::Receiver<AccountUpdate>,
    orchestrator: Arc<LifecycleOrchestrator>,
}

impl EventDispatcher {
    pub fn new(rx: mpsc::Receiver<AccountUpdate>, orchestrator: Arc<LifecycleOrchestrator>) -> Self {
        Self { rx, orchestrator }
    }

    /// Runs until every sender is dropped
    pub async fn run(mut self) {
        info!("📬 Event dispatcher started");
        let mut dispatched: u64 = 0;

        while let Some(update) = self.rx.recv().await {
            dispatched += 1;
            if dispatched % 1000 == 0 {
                debug!("📊 {} account updates dispatched", dispatched);
            }

            let orchestrator = Arc::clone(&self.orchestrator);
            tokio::spawn(async move {
                orchestrator.on_update(update).await;
            });
        }

        warn!("📭 Event dispatcher stopped after {} updates", dispatched);
    }
}
