use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, error, info, warn};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::config::QuoteToken;
use crate::constant::liquidity_v4;
use crate::executor::{
    ExecutionError, ExecutionResult, PriorityFee, SwapInstructionBuilder, TransactionExecutor,
};
use crate::processors::account_decoder::{decode_market, decode_pool, decode_token_account};
use crate::processors::dispatcher::{AccountKind, AccountUpdate};
use crate::strategy::balance_poller::BalancePoller;
use crate::strategy::correlator::{MatchedPool, PoolCorrelator};
use crate::strategy::dedup::{DedupRegistry, SettledMintMarker};
use crate::strategy::exit_controller::{ExitController, ExitOutcome, ExitSettings, PositionDisposer};
use crate::strategy::filter_pipeline::{CandidateContext, FilterPipeline, PipelineDecision};
use crate::strategy::manual_override::ManualOverride;
use crate::strategy::position::{AcquisitionStatus, LifecycleError, LifecycleState, TrackedPosition};
use crate::strategy::position_gate::{GatePermit, PositionGate};
use crate::strategy::price_oracle::PriceOracle;
use crate::utils::{ChainReader, EventLogger, LifecycleReport};

/// Sells through the same backends the buy used
pub struct SwapDisposer {
    builder: SwapInstructionBuilder,
    executor: Arc<dyn TransactionExecutor>,
    fee: PriorityFee,
}

impl SwapDisposer {
    pub fn new(builder: SwapInstructionBuilder, executor: Arc<dyn TransactionExecutor>, fee: PriorityFee) -> Self {
        Self { builder, executor, fee }
    }
}

#[async_trait]
impl PositionDisposer for SwapDisposer {
    async fn dispose(&self, candidate: &MatchedPool, amount: u64, min_out: u64) -> Result<ExecutionResult, ExecutionError> {
        let instructions = self.builder.build_sell(candidate, amount, min_out)?;
        self.executor.submit(instructions, self.fee).await
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub quote: QuoteToken,
    /// Spent per acquisition, raw quote units
    pub quote_amount: u64,
    pub skip_existing_pools: bool,
    /// Unix seconds; pools opening at or before this are pre-existing
    pub started_at: u64,
    pub fee: PriorityFee,
}

/// Collaborators wired into the orchestrator
pub struct OrchestratorParts {
    pub builder: SwapInstructionBuilder,
    pub pipeline: FilterPipeline,
    pub gate: Arc<PositionGate>,
    pub reader: Arc<dyn ChainReader>,
    pub executor: Arc<dyn TransactionExecutor>,
    pub oracle: Arc<dyn PriceOracle>,
    pub disposer: Arc<dyn PositionDisposer>,
    pub poller: BalancePoller,
    pub exit_settings: ExitSettings,
}

/// What happened to a matched pool
#[derive(Debug)]
pub enum ProcessOutcome {
    Rejected { filter: String, reason: String },
    /// Every position slot was taken when the pipeline accepted
    GateBusy,
    /// The lifecycle ran to a terminal state
    Completed(Box<TrackedPosition>),
}

/// Routes stream updates through dedup, correlation and filtering, and runs
/// one acquire-then-dispose lifecycle per accepted pool.
pub struct LifecycleOrchestrator {
    settings: OrchestratorSettings,
    builder: SwapInstructionBuilder,
    quote_token_account: Pubkey,
    pool_registry: DedupRegistry<Pubkey>,
    market_registry: DedupRegistry<Pubkey>,
    correlator: PoolCorrelator,
    pipeline: FilterPipeline,
    gate: Arc<PositionGate>,
    settled: SettledMintMarker,
    /// Wakes the confirming lifecycle of a mint when its wallet account shows up
    confirmations: DashMap<Pubkey, Arc<Notify>>,
    reader: Arc<dyn ChainReader>,
    executor: Arc<dyn TransactionExecutor>,
    oracle: Arc<dyn PriceOracle>,
    disposer: Arc<dyn PositionDisposer>,
    poller: BalancePoller,
    exit_settings: ExitSettings,
    manual: Option<Arc<ManualOverride>>,
    events: Option<EventLogger>,
}

impl LifecycleOrchestrator {
    pub fn new(settings: OrchestratorSettings, parts: OrchestratorParts) -> Self {
        let quote_token_account = parts.builder.quote_token_account();

        Self {
            settings,
            builder: parts.builder,
            quote_token_account,
            pool_registry: DedupRegistry::new("pools"),
            market_registry: DedupRegistry::new("markets"),
            correlator: PoolCorrelator::new(),
            pipeline: parts.pipeline,
            gate: parts.gate,
            settled: SettledMintMarker::new(),
            confirmations: DashMap::new(),
            reader: parts.reader,
            executor: parts.executor,
            oracle: parts.oracle,
            disposer: parts.disposer,
            poller: parts.poller,
            exit_settings: parts.exit_settings,
            manual: None,
            events: None,
        }
    }

    pub fn with_manual_override(mut self, manual: Arc<ManualOverride>) -> Self {
        self.manual = Some(manual);
        self
    }

    pub fn with_event_logger(mut self, events: EventLogger) -> Self {
        self.events = Some(events);
        self
    }

    pub fn correlator(&self) -> &PoolCorrelator {
        &self.correlator
    }

    pub fn settled_marker(&self) -> &SettledMintMarker {
        &self.settled
    }

    pub async fn on_update(&self, update: AccountUpdate) {
        debug!("📨 {:?} update for {} at slot {}", update.kind, update.pubkey, update.slot);

        let outcome = match update.kind {
            AccountKind::Market => self.handle_market_account(update.pubkey, &update.data).await,
            AccountKind::Pool => self.handle_pool_account(update.pubkey, &update.data).await,
            AccountKind::Wallet => {
                self.handle_wallet_account(update.pubkey, &update.data);
                None
            }
        };

        if let Some(outcome) = outcome {
            debug!("📋 {} finished: {:?}", update.pubkey, outcome);
        }
    }

    /// Records a new market and, if its pool is already known, processes the pair
    pub async fn handle_market_account(&self, pubkey: Pubkey, data: &[u8]) -> Option<ProcessOutcome> {
        let market = match decode_market(pubkey, data) {
            Ok(market) => market,
            Err(e) => {
                warn!("⚠️ Undecodable market {}: {}", pubkey, e);
                return None;
            }
        };

        if !self.market_registry.mark_seen(pubkey) {
            debug!("🔁 Market {} already recorded", pubkey);
            return None;
        }

        let matched = self.correlator.offer_market(market)?;
        Some(self.process_match(matched).await)
    }

    /// Records a new pool and, if its market is already known, processes the pair
    pub async fn handle_pool_account(&self, pubkey: Pubkey, data: &[u8]) -> Option<ProcessOutcome> {
        let pool = match decode_pool(pubkey, data) {
            Ok(pool) => pool,
            Err(e) => {
                warn!("⚠️ Undecodable pool {}: {}", pubkey, e);
                return None;
            }
        };

        if pool.state.status != liquidity_v4::STATUS_ACTIVE {
            debug!("Pool {} has status {}", pubkey, pool.state.status);
            return None;
        }

        if self.settings.skip_existing_pools && pool.state.pool_open_time <= self.settings.started_at {
            debug!("Pool {} opened before start ({})", pubkey, pool.state.pool_open_time);
            return None;
        }

        if !self.pool_registry.mark_seen(pubkey) {
            debug!("🔁 Pool {} already processed", pubkey);
            return None;
        }

        info!("🆕 New pool {} for {}", pubkey, pool.base_mint());
        let matched = self.correlator.offer_pool(pool)?;
        Some(self.process_match(matched).await)
    }

    /// Wallet token account update. True when it is the first one seen for its mint.
    pub fn handle_wallet_account(&self, pubkey: Pubkey, data: &[u8]) -> bool {
        if pubkey == self.quote_token_account {
            return false;
        }

        let account = match decode_token_account(data) {
            Ok(account) => account,
            Err(e) => {
                warn!("⚠️ Undecodable wallet token account: {}", e);
                return false;
            }
        };

        if account.mint == self.settings.quote.mint {
            return false;
        }

        if !self.settled.advance(account.mint) {
            debug!("🔁 Wallet update for {} already seen", account.mint);
            return false;
        }

        info!("👛 Wallet now holds {} of {}", account.amount, account.mint);
        if let Some(wake) = self.confirmations.get(&account.mint) {
            wake.notify_one();
        }
        true
    }

    /// Filters a matched pool and, if accepted and a slot is free, runs its lifecycle
    pub async fn process_match(&self, matched: MatchedPool) -> ProcessOutcome {
        let ctx = CandidateContext::new(matched, Arc::clone(&self.reader));

        if let PipelineDecision::Rejected { filter, reason, .. } = self.pipeline.evaluate(&ctx).await {
            return ProcessOutcome::Rejected { filter, reason };
        }

        let Some(permit) = self.gate.try_acquire() else {
            info!("🔒 Skipping {}: position limit reached", ctx.matched.base_mint());
            return ProcessOutcome::GateBusy;
        };

        let snapshot = ctx.quote_vault_snapshot();
        let position = self.run_lifecycle(ctx.matched, snapshot, permit).await;
        ProcessOutcome::Completed(Box::new(position))
    }

    /// Acquire, confirm, hold, dispose. The permit is released when this returns.
    pub async fn run_lifecycle(&self, matched: MatchedPool, quote_vault_snapshot: Option<u64>, permit: GatePermit) -> TrackedPosition {
        let mint = matched.base_mint();
        let token_account = self.builder.token_account(&mint);
        let mut position = TrackedPosition::new(mint, token_account, matched.pool.id, quote_vault_snapshot);

        let wake = Arc::new(Notify::new());
        self.confirmations.insert(mint, Arc::clone(&wake));

        let exit = match self.drive(&mut position, &matched, &wake).await {
            Ok(exit) => exit,
            Err(e) => {
                error!("❌ Lifecycle of {} stopped: {}", mint, e);
                None
            }
        };

        self.confirmations.remove(&mint);
        position.print_summary();

        if let Some(events) = &self.events {
            if let Err(e) = events.log_report(&LifecycleReport::new(&position, exit.as_ref())).await {
                warn!("⚠️ Failed to write report for {}: {}", mint, e);
            }
        }

        drop(permit);
        position
    }

    fn abandon_acquisition(position: &mut TrackedPosition) -> Result<(), LifecycleError> {
        position.acquisition = AcquisitionStatus::Failed;
        position.transition(LifecycleState::Abandoned)
    }

    async fn drive(&self, position: &mut TrackedPosition, matched: &MatchedPool, wake: &Notify) -> Result<Option<ExitOutcome>, LifecycleError> {
        let mint = position.base_mint;
        position.transition(LifecycleState::Acquiring)?;

        let submitted = match self.builder.build_buy(matched, self.settings.quote_amount, 0) {
            Ok(instructions) => self.executor.submit(instructions, self.settings.fee).await,
            Err(e) => Err(e),
        };

        match submitted {
            Ok(result) => {
                info!("🛒 Buy of {} submitted via {}: {}", mint, result.backend, result.signature);
                position.record_buy(self.settings.quote_amount, &result);
            }
            Err(e) => {
                error!("❌ Buy of {} failed: {}", mint, e);
                Self::abandon_acquisition(position)?;
                return Ok(None);
            }
        }

        position.transition(LifecycleState::Confirming)?;
        let balance = self.poller.await_balance(&position.token_account, Some(wake)).await;
        if balance == 0 {
            warn!("⏰ Buy of {} never confirmed, abandoning", mint);
            Self::abandon_acquisition(position)?;
            return Ok(None);
        }
        position.confirm(balance)?;

        let manual = self.manual.as_ref().map(|m| m.subscribe());
        let mut controller = ExitController::new(
            self.exit_settings.clone(),
            Arc::clone(&self.oracle),
            Arc::clone(&self.disposer),
            Arc::clone(&self.reader),
            manual,
        );
        let exit = controller.run(position, matched).await?;

        match &exit {
            ExitOutcome::Disposed { pre_disposal_balance, .. } => {
                match self.poller.await_depletion(&position.token_account, *pre_disposal_balance).await {
                    Some(0) => {
                        position.balance = 0;
                        position.transition(LifecycleState::Settled)?;
                    }
                    Some(remaining) => {
                        warn!("🪙 Sell of {} only partly filled, {} left", mint, remaining);
                        position.balance = remaining;
                        position.transition(LifecycleState::Settled)?;
                    }
                    None => {
                        error!("🚨 Sell of {} never landed; tokens are still held", mint);
                        position.balance = *pre_disposal_balance;
                        position.incomplete_exit = true;
                        position.transition(LifecycleState::Abandoned)?;
                    }
                }
            }
            ExitOutcome::NothingToDispose { .. } => {
                position.transition(LifecycleState::Settled)?;
            }
            ExitOutcome::Exhausted { amount, attempts, last_error, .. } => {
                error!(
                    "🚨 Incomplete exit for {}: {} tokens unsold after {} attempt(s), last error: {}",
                    mint,
                    amount,
                    attempts,
                    last_error.as_deref().unwrap_or("none")
                );
                position.balance = *amount;
                position.incomplete_exit = true;
                position.transition(LifecycleState::Abandoned)?;
            }
        }

        Ok(Some(exit))
    }

    /// Drops unpaired pool and market records older than `ttl`. None when `ttl` is zero.
    pub fn spawn_correlator_sweeper(self: &Arc<Self>, ttl: Duration) -> Option<JoinHandle<()>> {
        if ttl.is_zero() {
            return None;
        }

        let orchestrator = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(ttl);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = orchestrator.correlator.evict_stale(ttl);
                if evicted > 0 {
                    info!(
                        "🧹 Evicted {} unpaired record(s), {} still pending",
                        evicted,
                        orchestrator.correlator.pending_count()
                    );
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::accounts::WSOL_MINT;
    use crate::processors::account_decoder::fixtures;
    use crate::strategy::filter_pipeline::{PipelineSettings, SafetyChecks};
    use crate::strategy::retry::RetryPolicy;
    use crate::strategy::safety_checks::SafetyCheck;
    use crate::strategy::test_support::{market_bytes_for, CountingCheck, MockChain, MockExecutor, MockOracle};

    const QUOTE_AMOUNT: u64 = 1_000_000;

    struct Harness {
        chain: Arc<MockChain>,
        executor: Arc<MockExecutor>,
        renounced: Arc<CountingCheck>,
        gate: Arc<PositionGate>,
        builder: SwapInstructionBuilder,
        orchestrator: Arc<LifecycleOrchestrator>,
    }

    fn fee() -> PriorityFee {
        PriorityFee {
            compute_unit_limit: 100_000,
            compute_unit_price_micro_lamports: 1_000,
            tip_lamports: 0,
        }
    }

    fn exit_settings() -> ExitSettings {
        ExitSettings {
            take_profit_1_percent: 50.0,
            take_profit_2_percent: 100.0,
            stop_loss_percent: 20.0,
            sell_at_tp1: false,
            tp1_sell_fraction: 0.5,
            interval: Duration::from_secs(1),
            duration: Duration::from_secs(10),
            sell_retry: RetryPolicy::fixed(3, Duration::from_secs(1)),
            sell_slippage_percent: 10.0,
        }
    }

    fn harness(executor: MockExecutor, prices: Vec<u64>, gate: PositionGate) -> Harness {
        let chain = Arc::new(MockChain::new());
        let executor = Arc::new(executor);
        let quote = QuoteToken::resolve("WSOL").unwrap();
        let builder = SwapInstructionBuilder::new(Pubkey::new_unique(), quote);
        let gate = Arc::new(gate);

        let renounced = Arc::new(CountingCheck::passing("mint_renounced"));
        let checks = SafetyChecks {
            mint_renounced: renounced.clone() as Arc<dyn SafetyCheck>,
            socials: Arc::new(CountingCheck::passing("socials")),
            mutable: Arc::new(CountingCheck::passing("immutable_metadata")),
            burned: Arc::new(CountingCheck::passing("lp_burned")),
        };
        let pipeline_settings = PipelineSettings {
            quote,
            min_pool_size: 5,
            max_pool_size: 50,
            check_mint_renounced: true,
            check_socials: true,
            check_mutable: true,
            check_burned: true,
            wait_until_lp_burnt: false,
            lp_burn_wait: Duration::ZERO,
            lp_burn_check_interval: Duration::from_secs(1),
        };
        let pipeline = FilterPipeline::from_settings(&pipeline_settings, checks, None, Arc::clone(&gate));

        let disposer = Arc::new(SwapDisposer::new(builder.clone(), executor.clone(), fee()));
        let parts = OrchestratorParts {
            builder: builder.clone(),
            pipeline,
            gate: Arc::clone(&gate),
            reader: chain.clone(),
            executor: executor.clone(),
            oracle: Arc::new(MockOracle::new(prices)),
            disposer,
            poller: BalancePoller::new(
                chain.clone(),
                RetryPolicy::new(11, Duration::from_secs(1), Duration::from_millis(500)),
            ),
            exit_settings: exit_settings(),
        };
        let settings = OrchestratorSettings {
            quote,
            quote_amount: QUOTE_AMOUNT,
            skip_existing_pools: true,
            started_at: 50,
            fee: fee(),
        };

        Harness {
            chain,
            executor,
            renounced,
            gate,
            builder,
            orchestrator: Arc::new(LifecycleOrchestrator::new(settings, parts)),
        }
    }

    /// Pool and market account bytes for a fresh mint, pool opening at `open_time`
    struct Listing {
        mint: Pubkey,
        pool_id: Pubkey,
        pool_data: Vec<u8>,
        market_id: Pubkey,
        market_data: Vec<u8>,
        quote_vault: Pubkey,
    }

    fn listing(open_time: u64) -> Listing {
        let mint = Pubkey::new_unique();
        let market_id = Pubkey::new_unique();
        let pool_id = Pubkey::new_unique();
        let pool_data = fixtures::pool_bytes(&mint, &WSOL_MINT, &market_id, open_time);
        let quote_vault = decode_pool(pool_id, &pool_data).unwrap().state.quote_vault;

        Listing {
            mint,
            pool_id,
            pool_data,
            market_id,
            market_data: market_bytes_for(&market_id, &mint),
            quote_vault,
        }
    }

    fn completed(outcome: Option<ProcessOutcome>) -> TrackedPosition {
        match outcome {
            Some(ProcessOutcome::Completed(position)) => *position,
            other => panic!("expected a completed lifecycle, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_market_then_pool_runs_to_settled() {
        // stop loss: 0.0005 WSOL back for 0.001 spent
        let h = harness(MockExecutor::new(), vec![500_000], PositionGate::single());
        let l = listing(100);
        h.chain.set_balance(l.quote_vault, 12);
        let token_account = h.builder.token_account(&l.mint);
        h.chain.script_balances(token_account, vec![Some(0), Some(0), Some(0), Some(120), Some(120), Some(0)]);

        assert!(h.orchestrator.handle_market_account(l.market_id, &l.market_data).await.is_none());
        let position = completed(h.orchestrator.handle_pool_account(l.pool_id, &l.pool_data).await);

        assert_eq!(position.state, LifecycleState::Settled);
        assert_eq!(position.acquisition, AcquisitionStatus::Confirmed);
        assert_eq!(position.initial_balance, 120);
        assert_eq!(position.balance, 0);
        assert_eq!(position.quote_spent, QUOTE_AMOUNT);
        assert_eq!(position.quote_vault_snapshot, Some(12));
        assert_eq!(position.trades.len(), 2);
        assert!(!position.incomplete_exit);

        // buy then full sell
        assert_eq!(h.executor.submission_count(), 2);
        assert_eq!(h.gate.available(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_then_market_triggers_once() {
        let h = harness(MockExecutor::new(), vec![500_000], PositionGate::single());
        let l = listing(100);
        h.chain.set_balance(l.quote_vault, 12);
        h.chain.script_balances(h.builder.token_account(&l.mint), vec![Some(120), Some(120), Some(0)]);

        assert!(h.orchestrator.handle_pool_account(l.pool_id, &l.pool_data).await.is_none());
        let position = completed(h.orchestrator.handle_market_account(l.market_id, &l.market_data).await);
        assert_eq!(position.state, LifecycleState::Settled);

        // re-deliveries of either half never start another lifecycle
        assert!(h.orchestrator.handle_pool_account(l.pool_id, &l.pool_data).await.is_none());
        assert!(h.orchestrator.handle_market_account(l.market_id, &l.market_data).await.is_none());
        assert_eq!(h.executor.submission_count(), 2);
        assert_eq!(h.renounced.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_small_pool_rejected_before_safety_checks() {
        let h = harness(MockExecutor::new(), vec![500_000], PositionGate::single());
        let l = listing(100);
        h.chain.set_balance(l.quote_vault, 2);

        h.orchestrator.handle_market_account(l.market_id, &l.market_data).await;
        match h.orchestrator.handle_pool_account(l.pool_id, &l.pool_data).await {
            Some(ProcessOutcome::Rejected { filter, .. }) => assert_eq!(filter, "pool_size_min"),
            other => panic!("expected rejection, got {:?}", other),
        }

        assert_eq!(h.renounced.calls(), 0);
        assert_eq!(h.executor.submission_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_position_blocks_second_acquisition() {
        let h = harness(MockExecutor::new(), vec![500_000], PositionGate::single());
        let held = h.gate.try_acquire().expect("free slot");

        let l = listing(100);
        h.chain.set_balance(l.quote_vault, 12);
        h.orchestrator.handle_market_account(l.market_id, &l.market_data).await;
        let outcome = h.orchestrator.handle_pool_account(l.pool_id, &l.pool_data).await;
        assert!(matches!(outcome, Some(ProcessOutcome::Rejected { ref filter, .. }) if filter == "allow_list"));
        assert_eq!(h.executor.submission_count(), 0);

        drop(held);
        let next = listing(100);
        h.chain.set_balance(next.quote_vault, 12);
        h.chain.script_balances(h.builder.token_account(&next.mint), vec![Some(120), Some(120), Some(0)]);
        h.orchestrator.handle_market_account(next.market_id, &next.market_data).await;
        let position = completed(h.orchestrator.handle_pool_account(next.pool_id, &next.pool_data).await);
        assert_eq!(position.state, LifecycleState::Settled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_lifecycles_respect_single_position() {
        let h = harness(MockExecutor::new(), vec![500_000], PositionGate::single());
        let first = listing(100);
        let second = listing(100);
        for l in [&first, &second] {
            h.chain.set_balance(l.quote_vault, 12);
            h.chain.script_balances(h.builder.token_account(&l.mint), vec![Some(120), Some(120), Some(0)]);
            h.orchestrator.handle_market_account(l.market_id, &l.market_data).await;
        }

        let a = {
            let orchestrator = Arc::clone(&h.orchestrator);
            let (id, data) = (first.pool_id, first.pool_data.clone());
            tokio::spawn(async move { orchestrator.handle_pool_account(id, &data).await })
        };
        let b = {
            let orchestrator = Arc::clone(&h.orchestrator);
            let (id, data) = (second.pool_id, second.pool_data.clone());
            tokio::spawn(async move { orchestrator.handle_pool_account(id, &data).await })
        };

        let outcomes = [a.await.unwrap(), b.await.unwrap()];
        let completed = outcomes.iter().filter(|o| matches!(o, Some(ProcessOutcome::Completed(_)))).count();
        assert_eq!(completed, 1);
        assert_eq!(h.executor.submission_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_buy_is_abandoned_and_releases_slot() {
        let h = harness(MockExecutor::failing(1), vec![500_000], PositionGate::single());
        let l = listing(100);
        h.chain.set_balance(l.quote_vault, 12);

        h.orchestrator.handle_market_account(l.market_id, &l.market_data).await;
        let position = completed(h.orchestrator.handle_pool_account(l.pool_id, &l.pool_data).await);

        assert_eq!(position.state, LifecycleState::Abandoned);
        assert_eq!(position.acquisition, AcquisitionStatus::Failed);
        assert_eq!(h.gate.available(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfirmed_buy_is_abandoned() {
        let h = harness(MockExecutor::new(), vec![500_000], PositionGate::single());
        let l = listing(100);
        h.chain.set_balance(l.quote_vault, 12);
        let token_account = h.builder.token_account(&l.mint);

        h.orchestrator.handle_market_account(l.market_id, &l.market_data).await;
        let position = completed(h.orchestrator.handle_pool_account(l.pool_id, &l.pool_data).await);

        assert_eq!(position.state, LifecycleState::Abandoned);
        assert_eq!(position.acquisition, AcquisitionStatus::Failed);
        assert_eq!(h.chain.balance_calls(&token_account), 11);
        assert_eq!(h.executor.submission_count(), 1);
        assert_eq!(h.gate.available(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sell_that_never_lands_is_incomplete_exit() {
        let h = harness(MockExecutor::new(), vec![500_000], PositionGate::single());
        let l = listing(100);
        h.chain.set_balance(l.quote_vault, 12);
        h.chain.set_balance(h.builder.token_account(&l.mint), 120);

        h.orchestrator.handle_market_account(l.market_id, &l.market_data).await;
        let position = completed(h.orchestrator.handle_pool_account(l.pool_id, &l.pool_data).await);

        assert_eq!(position.state, LifecycleState::Abandoned);
        assert!(position.incomplete_exit);
        assert_eq!(position.balance, 120);
    }

    #[tokio::test]
    async fn test_pre_existing_pool_is_ignored() {
        let h = harness(MockExecutor::new(), vec![500_000], PositionGate::single());
        let old = listing(50);

        assert!(h.orchestrator.handle_pool_account(old.pool_id, &old.pool_data).await.is_none());
        assert_eq!(h.orchestrator.correlator().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_wallet_updates_advance_settled_marker_once() {
        let h = harness(MockExecutor::new(), vec![500_000], PositionGate::single());
        let wallet = h.builder.wallet();
        let mint = Pubkey::new_unique();

        let quote_update = fixtures::token_account_bytes(&WSOL_MINT, &wallet, 5);
        assert!(!h.orchestrator.handle_wallet_account(h.builder.quote_token_account(), &quote_update));

        let account = h.builder.token_account(&mint);
        let update = fixtures::token_account_bytes(&mint, &wallet, 120);
        assert!(h.orchestrator.handle_wallet_account(account, &update));
        assert!(!h.orchestrator.handle_wallet_account(account, &update));
        assert_eq!(h.orchestrator.settled_marker().last(), Some(mint));

        assert!(!h.orchestrator.handle_wallet_account(Pubkey::new_unique(), &[0u8; 3]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_correlator_sweeper_evicts_unpaired_records() {
        let h = harness(MockExecutor::new(), vec![500_000], PositionGate::single());
        let l = listing(100);
        h.orchestrator.handle_market_account(l.market_id, &l.market_data).await;
        assert_eq!(h.orchestrator.correlator().pending_count(), 1);

        assert!(h.orchestrator.spawn_correlator_sweeper(Duration::ZERO).is_none());
        let sweeper = h.orchestrator.spawn_correlator_sweeper(Duration::from_secs(60)).unwrap();
        tokio::time::sleep(Duration::from_secs(125)).await;
        assert_eq!(h.orchestrator.correlator().pending_count(), 0);
        sweeper.abort();
    }
}
