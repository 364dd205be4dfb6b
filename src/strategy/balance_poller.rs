use log::{info, warn};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tokio::sync::Notify;

use crate::strategy::retry::{Attempt, RetryOutcome, RetryPolicy};
use crate::utils::ChainReader;

/// Bounded polling of a wallet token account
pub struct BalancePoller {
    reader: Arc<dyn ChainReader>,
    policy: RetryPolicy,
}

impl BalancePoller {
    pub fn new(reader: Arc<dyn ChainReader>, policy: RetryPolicy) -> Self {
        Self { reader, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// First non-zero balance of `account`, or 0 once the attempt budget is spent.
    /// A notification on `wake` triggers the next poll immediately.
    pub async fn await_balance(&self, account: &Pubkey, wake: Option<&Notify>) -> u64 {
        let outcome = self
            .policy
            .run_with_wake("await_balance", wake, |_| async {
                match self.reader.get_token_account_balance(account).await {
                    Ok(0) => Attempt::Pending,
                    Ok(balance) => Attempt::Ready(balance),
                    Err(e) => Attempt::Failed(e.to_string()),
                }
            })
            .await;

        match outcome {
            RetryOutcome::Ready { value, attempts } => {
                info!("💰 Balance of {} is {} after {} check(s)", account, value, attempts);
                value
            }
            RetryOutcome::Exhausted { attempts, last_error } => {
                warn!(
                    "⏰ No balance on {} after {} check(s){}",
                    account,
                    attempts,
                    last_error.map(|e| format!(", last error: {}", e)).unwrap_or_default()
                );
                0
            }
        }
    }

    /// First balance strictly below `below`, `None` if it never drops within budget
    pub async fn await_depletion(&self, account: &Pubkey, below: u64) -> Option<u64> {
        let outcome = self
            .policy
            .run("await_depletion", |_| async {
                match self.reader.get_token_account_balance(account).await {
                    Ok(balance) if balance < below => Attempt::Ready(balance),
                    Ok(_) => Attempt::Pending,
                    Err(e) => Attempt::Failed(e.to_string()),
                }
            })
            .await;

        match outcome {
            RetryOutcome::Ready { value, .. } => Some(value),
            RetryOutcome::Exhausted { attempts, .. } => {
                warn!("⏰ Balance of {} still >= {} after {} check(s)", account, below, attempts);
                None
            }
        }
    }
}
