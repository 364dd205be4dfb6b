use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Operator "sell now" signal. Each trigger bumps a generation counter that
/// every exit controller watches.
#[derive(Debug)]
pub struct ManualOverride {
    tx: watch::Sender<u64>,
}

impl Default for ManualOverride {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualOverride {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    pub fn trigger(&self) {
        self.tx.send_modify(|generation| *generation += 1);
        info!("🛑 Manual sell requested");
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }

    pub fn generation(&self) -> u64 {
        *self.tx.borrow()
    }

    /// Reads commands from stdin until it closes
    pub fn spawn_stdin_listener(self: &std::sync::Arc<Self>) -> JoinHandle<()> {
        let manual = std::sync::Arc::clone(self);
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                info!("⌨️ Manual exit: type \"sell\" and press enter");
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().eq_ignore_ascii_case("sell") => manual.trigger(),
                    Ok(Some(line)) => warn!("❓ Invalid input '{}'", line.trim()),
                    Ok(None) => {
                        info!("⌨️ stdin closed, manual exit disabled");
                        break;
                    }
                    Err(e) => {
                        error!("❌ Failed to read stdin: {}", e);
                        break;
                    }
                }
            }
        })
    }
}
