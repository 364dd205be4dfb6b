use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::config::{FiltersConfig, QuoteConfig, QuoteToken};
use crate::strategy::allow_list::AllowList;
use crate::strategy::correlator::MatchedPool;
use crate::strategy::position_gate::PositionGate;
use crate::strategy::retry::{Attempt, RetryOutcome, RetryPolicy};
use crate::strategy::safety_checks::{CheckOutcome, SafetyCheck};
use crate::utils::ChainReader;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterVerdict {
    Pass,
    Reject(String),
    /// Treated as a reject; the candidate is not retried
    Undetermined(String),
}

impl From<CheckOutcome> for FilterVerdict {
    fn from(outcome: CheckOutcome) -> Self {
        match outcome {
            CheckOutcome::Pass => FilterVerdict::Pass,
            CheckOutcome::Fail(reason) => FilterVerdict::Reject(reason),
            CheckOutcome::Undetermined(reason) => FilterVerdict::Undetermined(reason),
        }
    }
}

/// A matched pool under evaluation. The quote vault balance is fetched at most once.
pub struct CandidateContext {
    pub matched: MatchedPool,
    reader: Arc<dyn ChainReader>,
    quote_balance: OnceCell<u64>,
}

impl CandidateContext {
    pub fn new(matched: MatchedPool, reader: Arc<dyn ChainReader>) -> Self {
        Self {
            matched,
            reader,
            quote_balance: OnceCell::new(),
        }
    }

    pub async fn quote_vault_balance(&self) -> anyhow::Result<u64> {
        let vault = self.matched.pool.state.quote_vault;
        let balance = self
            .quote_balance
            .get_or_try_init(|| async { self.reader.get_token_account_balance(&vault).await })
            .await?;
        Ok(*balance)
    }

    /// Balance if a filter already fetched it
    pub fn quote_vault_snapshot(&self) -> Option<u64> {
        self.quote_balance.get().copied()
    }
}

#[async_trait]
pub trait PoolFilter: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self, ctx: &CandidateContext) -> FilterVerdict;
}

/// Allow-list membership, or the single-position busy check when no list is used
pub struct AllowListFilter {
    allow_list: Option<Arc<AllowList>>,
    gate: Arc<PositionGate>,
}

impl AllowListFilter {
    pub fn new(allow_list: Option<Arc<AllowList>>, gate: Arc<PositionGate>) -> Self {
        Self { allow_list, gate }
    }
}

#[async_trait]
impl PoolFilter for AllowListFilter {
    fn name(&self) -> &str {
        "allow_list"
    }

    async fn check(&self, ctx: &CandidateContext) -> FilterVerdict {
        if let Some(list) = &self.allow_list {
            return if list.contains(&ctx.matched.base_mint()).await {
                FilterVerdict::Pass
            } else {
                FilterVerdict::Reject("mint not in allow list".to_string())
            };
        }

        if self.gate.is_single_position() && self.gate.is_saturated() {
            return FilterVerdict::Reject("another acquisition is in flight".to_string());
        }
        FilterVerdict::Pass
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolSizeBound {
    Min,
    Max,
}

/// Quote vault balance against a raw threshold
pub struct PoolSizeFilter {
    bound: PoolSizeBound,
    threshold: u64,
    quote: QuoteToken,
}

impl PoolSizeFilter {
    pub fn new(bound: PoolSizeBound, threshold: u64, quote: QuoteToken) -> Self {
        Self { bound, threshold, quote }
    }
}

#[async_trait]
impl PoolFilter for PoolSizeFilter {
    fn name(&self) -> &str {
        match self.bound {
            PoolSizeBound::Min => "pool_size_min",
            PoolSizeBound::Max => "pool_size_max",
        }
    }

    async fn check(&self, ctx: &CandidateContext) -> FilterVerdict {
        let balance = match ctx.quote_vault_balance().await {
            Ok(balance) => balance,
            Err(e) => return FilterVerdict::Undetermined(format!("quote vault balance unavailable: {}", e)),
        };

        let (rejected, relation) = match self.bound {
            PoolSizeBound::Min => (balance < self.threshold, "below"),
            PoolSizeBound::Max => (balance > self.threshold, "above"),
        };

        if rejected {
            FilterVerdict::Reject(format!(
                "pool size {} {} is {} {} {}",
                self.quote.to_ui(balance),
                self.quote.symbol,
                relation,
                self.quote.to_ui(self.threshold),
                self.quote.symbol
            ))
        } else {
            FilterVerdict::Pass
        }
    }
}

/// Adapts a token-safety check to the pipeline
pub struct SafetyFilter {
    check: Arc<dyn SafetyCheck>,
}

impl SafetyFilter {
    pub fn new(check: Arc<dyn SafetyCheck>) -> Self {
        Self { check }
    }
}

#[async_trait]
impl PoolFilter for SafetyFilter {
    fn name(&self) -> &str {
        self.check.name()
    }

    async fn check(&self, ctx: &CandidateContext) -> FilterVerdict {
        self.check.check(&ctx.matched).await.into()
    }
}

/// Polls the LP burn check until it passes or the wait budget runs out
pub struct BurnWaitFilter {
    check: Arc<dyn SafetyCheck>,
    policy: RetryPolicy,
}

impl BurnWaitFilter {
    pub fn new(check: Arc<dyn SafetyCheck>, max_wait: Duration, interval: Duration) -> Self {
        let interval_ms = interval.as_millis().max(1);
        let attempts = (max_wait.as_millis() / interval_ms) as u32 + 1;
        Self {
            check,
            policy: RetryPolicy::fixed(attempts, interval),
        }
    }
}

#[async_trait]
impl PoolFilter for BurnWaitFilter {
    fn name(&self) -> &str {
        "lp_burn_wait"
    }

    async fn check(&self, ctx: &CandidateContext) -> FilterVerdict {
        info!("⏳ Waiting for LP of {} to be burnt", ctx.matched.base_mint());

        let outcome = self
            .policy
            .run("lp_burn_wait", |_| async {
                match self.check.check(&ctx.matched).await {
                    CheckOutcome::Pass => Attempt::Ready(()),
                    CheckOutcome::Fail(_) => Attempt::Pending,
                    CheckOutcome::Undetermined(reason) => Attempt::Failed(reason),
                }
            })
            .await;

        match outcome {
            RetryOutcome::Ready { .. } => FilterVerdict::Pass,
            RetryOutcome::Exhausted { attempts, .. } => FilterVerdict::Reject(format!(
                "LP not burnt after {} checks ({:?})",
                attempts,
                self.policy.max_total_wait()
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineDecision {
    Accepted,
    Rejected {
        filter: String,
        reason: String,
        undetermined: bool,
    },
}

impl PipelineDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, PipelineDecision::Accepted)
    }
}

/// Which filters run, in raw quote units
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub quote: QuoteToken,
    /// 0 disables
    pub min_pool_size: u64,
    /// 0 disables
    pub max_pool_size: u64,
    pub check_mint_renounced: bool,
    pub check_socials: bool,
    pub check_mutable: bool,
    pub check_burned: bool,
    pub wait_until_lp_burnt: bool,
    pub lp_burn_wait: Duration,
    pub lp_burn_check_interval: Duration,
}

impl PipelineSettings {
    pub fn from_config(quote: QuoteToken, quote_config: &QuoteConfig, filters: &FiltersConfig) -> Self {
        Self {
            quote,
            min_pool_size: quote.to_raw(quote_config.min_pool_size),
            max_pool_size: quote.to_raw(quote_config.max_pool_size),
            check_mint_renounced: filters.check_mint_renounced,
            check_socials: filters.check_socials,
            check_mutable: filters.check_mutable,
            check_burned: filters.check_burned,
            wait_until_lp_burnt: filters.wait_until_lp_burnt,
            lp_burn_wait: Duration::from_secs(filters.lp_burn_wait_seconds),
            lp_burn_check_interval: Duration::from_millis(filters.lp_burn_check_interval_ms),
        }
    }
}

/// The four token-safety collaborators
pub struct SafetyChecks {
    pub mint_renounced: Arc<dyn SafetyCheck>,
    pub socials: Arc<dyn SafetyCheck>,
    pub mutable: Arc<dyn SafetyCheck>,
    pub burned: Arc<dyn SafetyCheck>,
}

/// Ordered filters with short-circuit on the first non-pass
pub struct FilterPipeline {
    filters: Vec<Arc<dyn PoolFilter>>,
}

impl FilterPipeline {
    pub fn new(filters: Vec<Arc<dyn PoolFilter>>) -> Self {
        Self { filters }
    }

    pub fn from_settings(
        settings: &PipelineSettings,
        checks: SafetyChecks,
        allow_list: Option<Arc<AllowList>>,
        gate: Arc<PositionGate>,
    ) -> Self {
        let mut filters: Vec<Arc<dyn PoolFilter>> = vec![Arc::new(AllowListFilter::new(allow_list, gate))];

        if settings.min_pool_size > 0 {
            filters.push(Arc::new(PoolSizeFilter::new(PoolSizeBound::Min, settings.min_pool_size, settings.quote)));
        }
        if settings.max_pool_size > 0 {
            filters.push(Arc::new(PoolSizeFilter::new(PoolSizeBound::Max, settings.max_pool_size, settings.quote)));
        }
        if settings.check_mint_renounced {
            filters.push(Arc::new(SafetyFilter::new(checks.mint_renounced)));
        }
        if settings.check_socials {
            filters.push(Arc::new(SafetyFilter::new(checks.socials)));
        }
        if settings.check_mutable {
            filters.push(Arc::new(SafetyFilter::new(checks.mutable)));
        }
        if settings.check_burned {
            filters.push(Arc::new(SafetyFilter::new(Arc::clone(&checks.burned))));
        }
        if settings.wait_until_lp_burnt {
            filters.push(Arc::new(BurnWaitFilter::new(
                checks.burned,
                settings.lp_burn_wait,
                settings.lp_burn_check_interval,
            )));
        }

        Self::new(filters)
    }

    pub fn filter_names(&self) -> Vec<String> {
        self.filters.iter().map(|f| f.name().to_string()).collect()
    }

    pub async fn evaluate(&self, ctx: &CandidateContext) -> PipelineDecision {
        let mint = ctx.matched.base_mint();

        for filter in &self.filters {
            match filter.check(ctx).await {
                FilterVerdict::Pass => {
                    debug!("✅ [{}] passed for {}", filter.name(), mint);
                }
                FilterVerdict::Reject(reason) => {
                    info!("🚫 Skipping {} - {}: {}", mint, filter.name(), reason);
                    return PipelineDecision::Rejected {
                        filter: filter.name().to_string(),
                        reason,
                        undetermined: false,
                    };
                }
                FilterVerdict::Undetermined(reason) => {
                    warn!("⚠️ Skipping {} - {} undetermined: {}", mint, filter.name(), reason);
                    return PipelineDecision::Rejected {
                        filter: filter.name().to_string(),
                        reason,
                        undetermined: true,
                    };
                }
            }
        }

        info!("🎯 {} passed all {} filters", mint, self.filters.len());
        PipelineDecision::Accepted
    }
}
