use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

use crate::config::TradingConfig;
use crate::executor::{ExecutionError, ExecutionResult};
use crate::strategy::correlator::MatchedPool;
use crate::strategy::position::{LifecycleError, LifecycleState, TrackedPosition};
use crate::strategy::price_oracle::PriceOracle;
use crate::strategy::retry::{Attempt, RetryOutcome, RetryPolicy};
use crate::utils::ChainReader;

/// Submits a sell of `amount` base tokens
#[async_trait]
pub trait PositionDisposer: Send + Sync {
    async fn dispose(&self, candidate: &MatchedPool, amount: u64, min_out: u64) -> Result<ExecutionResult, ExecutionError>;
}

#[derive(Debug, Clone)]
pub struct ExitSettings {
    pub take_profit_1_percent: f64,
    pub take_profit_2_percent: f64,
    pub stop_loss_percent: f64,
    /// Tier 1 sells `tp1_sell_fraction` and keeps monitoring; otherwise it sells everything
    pub sell_at_tp1: bool,
    pub tp1_sell_fraction: f64,
    pub interval: Duration,
    pub duration: Duration,
    pub sell_retry: RetryPolicy,
    pub sell_slippage_percent: f64,
}

impl ExitSettings {
    pub fn from_config(trading: &TradingConfig) -> Self {
        Self {
            take_profit_1_percent: trading.take_profit_1_percent,
            take_profit_2_percent: trading.take_profit_2_percent,
            stop_loss_percent: trading.stop_loss_percent,
            sell_at_tp1: trading.sell_at_tp1,
            tp1_sell_fraction: trading.tp1_sell_fraction,
            interval: Duration::from_millis(trading.price_check_interval_ms),
            duration: Duration::from_millis(trading.price_check_duration_ms),
            sell_retry: RetryPolicy::fixed(
                trading.max_sell_retries,
                Duration::from_millis(trading.sell_retry_interval_ms),
            ),
            sell_slippage_percent: trading.sell_slippage_percent,
        }
    }

    fn samples(&self) -> u64 {
        let interval_ms = self.interval.as_millis().max(1);
        ((self.duration.as_millis() / interval_ms) as u64).max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitTrigger {
    TakeProfit1,
    TakeProfit2,
    StopLoss,
    WindowElapsed,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Full disposal accepted by a backend
    Disposed {
        trigger: ExitTrigger,
        amount: u64,
        pre_disposal_balance: u64,
    },
    /// Wallet already empty when the full disposal was due
    NothingToDispose { trigger: ExitTrigger },
    /// Every disposal attempt failed; tokens are still held
    Exhausted {
        trigger: ExitTrigger,
        amount: u64,
        attempts: u32,
        last_error: Option<String>,
    },
}

fn pnl_percent(value: u64, cost: u64) -> f64 {
    if cost == 0 {
        return 0.0;
    }
    (value as f64 - cost as f64) / cost as f64 * 100.0
}

fn apply_slippage(value: u64, slippage_percent: f64) -> u64 {
    (value as f64 * (1.0 - slippage_percent / 100.0)).max(0.0) as u64
}

/// Watches a held position and disposes of it
pub struct ExitController {
    settings: ExitSettings,
    oracle: Arc<dyn PriceOracle>,
    disposer: Arc<dyn PositionDisposer>,
    reader: Arc<dyn ChainReader>,
    manual: Option<watch::Receiver<u64>>,
}

impl ExitController {
    pub fn new(
        settings: ExitSettings,
        oracle: Arc<dyn PriceOracle>,
        disposer: Arc<dyn PositionDisposer>,
        reader: Arc<dyn ChainReader>,
        manual: Option<watch::Receiver<u64>>,
    ) -> Self {
        Self { settings, oracle, disposer, reader, manual }
    }

    async fn manual_signal(manual: &mut Option<watch::Receiver<u64>>) {
        match manual {
            Some(rx) => {
                if rx.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
            None => std::future::pending::<()>().await,
        }
    }

    fn manual_pending(&self) -> bool {
        self.manual
            .as_ref()
            .map(|rx| rx.has_changed().unwrap_or(false))
            .unwrap_or(false)
    }

    /// Monitors `position` (must be holding) until an exit fires, then disposes
    /// of what is left. Leaves the position in `Disposing`.
    pub async fn run(&mut self, position: &mut TrackedPosition, candidate: &MatchedPool) -> Result<ExitOutcome, LifecycleError> {
        let samples = self.settings.samples();
        let mut trigger = ExitTrigger::WindowElapsed;

        info!(
            "👀 Watching {} for {:?} ({} samples every {:?})",
            position.base_mint, self.settings.duration, samples, self.settings.interval
        );

        for sample in 1..=samples {
            if self.manual_pending() {
                trigger = ExitTrigger::Manual;
                break;
            }

            if let Some(fired) = self.sample(position, candidate, sample, samples).await {
                trigger = fired;
                break;
            }

            if sample == samples {
                break;
            }

            tokio::select! {
                _ = sleep(self.settings.interval) => {}
                _ = Self::manual_signal(&mut self.manual) => {
                    trigger = ExitTrigger::Manual;
                    break;
                }
            }
        }

        info!("🏁 Exit for {}: {:?}", position.base_mint, trigger);
        self.dispose_all(position, candidate, trigger).await
    }

    /// One price observation; `Some` when a full exit fires
    async fn sample(&self, position: &mut TrackedPosition, candidate: &MatchedPool, sample: u64, samples: u64) -> Option<ExitTrigger> {
        let cost = position.remaining_cost_basis();
        let value = match self.oracle.quote_value(candidate, position.balance).await {
            Ok(value) => value,
            Err(e) => {
                warn!("⚠️ Price sample {}/{} for {} failed: {}", sample, samples, position.base_mint, e);
                return None;
            }
        };

        let pnl = pnl_percent(value, cost);
        debug!(
            "📊 {} sample {}/{}: value {} cost {} pnl {:.2}%",
            position.base_mint, sample, samples, value, cost, pnl
        );

        if pnl >= self.settings.take_profit_2_percent {
            return Some(ExitTrigger::TakeProfit2);
        }

        if pnl >= self.settings.take_profit_1_percent {
            if !self.settings.sell_at_tp1 {
                return Some(ExitTrigger::TakeProfit1);
            }
            if !position.partial_sold {
                let amount = (position.balance as f64 * self.settings.tp1_sell_fraction) as u64;
                if amount == 0 {
                    return None;
                }
                let expected = (value as f64 * self.settings.tp1_sell_fraction) as u64;
                let min_out = apply_slippage(expected, self.settings.sell_slippage_percent);

                info!("🎯 Take profit 1 hit for {} at {:.2}%, selling {}", position.base_mint, pnl, amount);
                match self.dispose_with_retry(candidate, amount, min_out).await {
                    Ok(result) => {
                        position.record_sell(expected, amount, &result);
                        position.partial_sold = true;
                    }
                    Err((attempts, last_error)) => {
                        error!(
                            "❌ Partial sell of {} failed after {} attempt(s): {}; selling everything",
                            position.base_mint,
                            attempts,
                            last_error.unwrap_or_default()
                        );
                        return Some(ExitTrigger::TakeProfit1);
                    }
                }
            }
            return None;
        }

        if pnl <= -self.settings.stop_loss_percent {
            return Some(ExitTrigger::StopLoss);
        }

        None
    }

    async fn dispose_all(&self, position: &mut TrackedPosition, candidate: &MatchedPool, trigger: ExitTrigger) -> Result<ExitOutcome, LifecycleError> {
        position.transition(LifecycleState::Disposing)?;

        let amount = if position.partial_sold {
            match self.reader.get_token_account_balance(&position.token_account).await {
                Ok(balance) => balance,
                Err(e) => {
                    warn!("⚠️ Fresh balance of {} unavailable, using tracked balance: {}", position.token_account, e);
                    position.balance
                }
            }
        } else {
            position.balance
        };
        position.balance = amount;

        if amount == 0 {
            info!("🪙 Nothing left to sell for {}", position.base_mint);
            return Ok(ExitOutcome::NothingToDispose { trigger });
        }

        let expected = self.oracle.quote_value(candidate, amount).await.unwrap_or(0);
        let min_out = apply_slippage(expected, self.settings.sell_slippage_percent);

        match self.dispose_with_retry(candidate, amount, min_out).await {
            Ok(result) => {
                position.record_sell(expected, amount, &result);
                Ok(ExitOutcome::Disposed { trigger, amount, pre_disposal_balance: amount })
            }
            Err((attempts, last_error)) => Ok(ExitOutcome::Exhausted { trigger, amount, attempts, last_error }),
        }
    }

    async fn dispose_with_retry(&self, candidate: &MatchedPool, amount: u64, min_out: u64) -> Result<ExecutionResult, (u32, Option<String>)> {
        let outcome = self
            .settings
            .sell_retry
            .run("dispose", |attempt| async move {
                info!("📤 Selling {} of {} (attempt {})", amount, candidate.base_mint(), attempt);
                match self.disposer.dispose(candidate, amount, min_out).await {
                    Ok(result) => Attempt::Ready(result),
                    Err(e) if e.is_retryable() => Attempt::Failed(e.to_string()),
                    Err(e) => Attempt::Fatal(e.to_string()),
                }
            })
            .await;

        match outcome {
            RetryOutcome::Ready { value, .. } => Ok(value),
            RetryOutcome::Exhausted { attempts, last_error } => Err((attempts, last_error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::manual_override::ManualOverride;
    use crate::strategy::test_support::{execution_result, matched_pool, MockChain, MockDisposer, MockOracle};
    use solana_sdk::pubkey::Pubkey;
    use tokio::time::Instant;

    fn settings(sell_at_tp1: bool) -> ExitSettings {
        ExitSettings {
            take_profit_1_percent: 25.0,
            take_profit_2_percent: 50.0,
            stop_loss_percent: 20.0,
            sell_at_tp1,
            tp1_sell_fraction: 0.5,
            interval: Duration::from_secs(2),
            duration: Duration::from_secs(10),
            sell_retry: RetryPolicy::fixed(3, Duration::from_secs(1)),
            sell_slippage_percent: 20.0,
        }
    }

    fn holding_position(candidate: &MatchedPool) -> TrackedPosition {
        let mut position = TrackedPosition::new(candidate.base_mint(), Pubkey::new_unique(), candidate.pool.id, None);
        position.transition(LifecycleState::Acquiring).unwrap();
        position.record_buy(1_000, &execution_result("mock"));
        position.transition(LifecycleState::Confirming).unwrap();
        position.confirm(1_000).unwrap();
        position
    }

    struct Harness {
        chain: Arc<MockChain>,
        disposer: Arc<MockDisposer>,
        controller: ExitController,
    }

    fn harness(settings: ExitSettings, prices: Vec<u64>, disposer: MockDisposer, manual: Option<watch::Receiver<u64>>) -> Harness {
        let chain = Arc::new(MockChain::new());
        let disposer = Arc::new(disposer);
        let controller = ExitController::new(
            settings,
            Arc::new(MockOracle::new(prices)),
            disposer.clone(),
            chain.clone(),
            manual,
        );
        Harness { chain, disposer, controller }
    }

    #[tokio::test(start_paused = true)]
    async fn test_tier1_partial_then_tier2_full() {
        let candidate = matched_pool();
        let mut position = holding_position(&candidate);
        let mut h = harness(settings(true), vec![1_100, 1_300, 800], MockDisposer::new(), None);
        h.chain.set_balance(position.token_account, 500);

        let outcome = h.controller.run(&mut position, &candidate).await.unwrap();
        assert_eq!(
            outcome,
            ExitOutcome::Disposed { trigger: ExitTrigger::TakeProfit2, amount: 500, pre_disposal_balance: 500 }
        );
        assert_eq!(h.disposer.disposals(), vec![500, 500]);
        assert!(position.partial_sold);
        assert_eq!(position.state, LifecycleState::Disposing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tier1_full_when_partial_disabled() {
        let candidate = matched_pool();
        let mut position = holding_position(&candidate);
        let mut h = harness(settings(false), vec![1_100, 1_300, 1_600], MockDisposer::new(), None);

        let outcome = h.controller.run(&mut position, &candidate).await.unwrap();
        assert!(matches!(outcome, ExitOutcome::Disposed { trigger: ExitTrigger::TakeProfit1, amount: 1_000, .. }));
        assert_eq!(h.disposer.disposals(), vec![1_000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_loss_sells_everything() {
        let candidate = matched_pool();
        let mut position = holding_position(&candidate);
        let mut h = harness(settings(true), vec![950, 790], MockDisposer::new(), None);

        let outcome = h.controller.run(&mut position, &candidate).await.unwrap();
        assert!(matches!(outcome, ExitOutcome::Disposed { trigger: ExitTrigger::StopLoss, amount: 1_000, .. }));
        assert_eq!(h.disposer.disposals(), vec![1_000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_elapsed_sells_everything() {
        let candidate = matched_pool();
        let mut position = holding_position(&candidate);
        let mut h = harness(settings(true), vec![1_000], MockDisposer::new(), None);

        let start = Instant::now();
        let outcome = h.controller.run(&mut position, &candidate).await.unwrap();
        assert!(matches!(outcome, ExitOutcome::Disposed { trigger: ExitTrigger::WindowElapsed, .. }));
        // five samples, four waits
        assert!(start.elapsed() >= Duration::from_secs(8) && start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_override_ends_window_early() {
        let candidate = matched_pool();
        let mut position = holding_position(&candidate);
        let manual = Arc::new(ManualOverride::new());
        let mut long_window = settings(true);
        long_window.duration = Duration::from_secs(600);
        let mut h = harness(long_window, vec![1_000], MockDisposer::new(), Some(manual.subscribe()));

        let trigger = Arc::clone(&manual);
        tokio::spawn(async move {
            sleep(Duration::from_secs(3)).await;
            trigger.trigger();
        });

        let start = Instant::now();
        let outcome = h.controller.run(&mut position, &candidate).await.unwrap();
        assert!(matches!(outcome, ExitOutcome::Disposed { trigger: ExitTrigger::Manual, .. }));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_partial_escalates_to_full() {
        let candidate = matched_pool();
        let mut position = holding_position(&candidate);
        let mut h = harness(settings(true), vec![1_300], MockDisposer::failing(3), None);

        let outcome = h.controller.run(&mut position, &candidate).await.unwrap();
        assert!(matches!(outcome, ExitOutcome::Disposed { trigger: ExitTrigger::TakeProfit1, amount: 1_000, .. }));
        assert_eq!(h.disposer.disposals(), vec![1_000]);
        assert!(!position.partial_sold);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_disposal_is_reported() {
        let candidate = matched_pool();
        let mut position = holding_position(&candidate);
        let mut h = harness(settings(true), vec![700], MockDisposer::failing(100), None);

        let outcome = h.controller.run(&mut position, &candidate).await.unwrap();
        assert!(matches!(outcome, ExitOutcome::Exhausted { trigger: ExitTrigger::StopLoss, amount: 1_000, attempts: 3, .. }));
        assert!(h.disposer.disposals().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_to_dispose_after_partial() {
        let candidate = matched_pool();
        let mut position = holding_position(&candidate);
        let mut h = harness(settings(true), vec![1_300, 300], MockDisposer::new(), None);
        h.chain.set_balance(position.token_account, 0);

        let outcome = h.controller.run(&mut position, &candidate).await.unwrap();
        assert_eq!(outcome, ExitOutcome::NothingToDispose { trigger: ExitTrigger::StopLoss });
    }
}
