use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;
use crate::executor::ExecutionResult;

/// Lifecycle of one trade
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Idle,
    /// Acquisition is being submitted
    Acquiring,
    /// Submitted, waiting for the wallet balance to appear
    Confirming,
    /// Balance confirmed, exit controller is watching the price
    Holding,
    /// Full disposal submitted or being retried
    Disposing,
    Settled,
    /// Gave up; the position may still be held on-chain
    Abandoned,
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Settled | LifecycleState::Abandoned)
    }

    fn can_move_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Idle, Acquiring)
                | (Acquiring, Confirming)
                | (Acquiring, Abandoned)
                | (Confirming, Holding)
                | (Confirming, Abandoned)
                | (Holding, Disposing)
                | (Holding, Settled)
                | (Disposing, Settled)
                | (Disposing, Abandoned)
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionStatus {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("illegal lifecycle transition {from:?} -> {to:?} for {mint}")]
    IllegalTransition {
        mint: Pubkey,
        from: LifecycleState,
        to: LifecycleState,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: i64,
    pub is_buy: bool,
    /// Quote spent on a buy, expected quote out on a sell (raw units)
    pub quote_amount: u64,
    /// Tokens sold; 0 for a buy, whose amount is only known after confirmation
    pub token_amount: u64,
    pub signature: String,
    pub backend: String,
    pub fee_paid: u64,
}

impl TradeRecord {
    pub fn from_execution_result(result: &ExecutionResult, is_buy: bool, quote_amount: u64, token_amount: u64) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp(),
            is_buy,
            quote_amount,
            token_amount,
            signature: result.signature.to_string(),
            backend: result.backend.clone(),
            fee_paid: result.fee_paid,
        }
    }
}

/// Correlated state of one in-flight trade, owned by its lifecycle task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedPosition {
    pub base_mint: Pubkey,
    /// Wallet's associated token account for `base_mint`
    pub token_account: Pubkey,
    pub pool: Pubkey,
    pub state: LifecycleState,
    pub acquisition: AcquisitionStatus,
    /// Last known token balance
    pub balance: u64,
    /// Balance confirmed after the buy
    pub initial_balance: u64,
    pub quote_spent: u64,
    pub partial_sold: bool,
    /// Disposal could not be completed; tokens may remain in the wallet
    pub incomplete_exit: bool,
    pub quote_vault_snapshot: Option<u64>,
    pub trades: Vec<TradeRecord>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TrackedPosition {
    pub fn new(base_mint: Pubkey, token_account: Pubkey, pool: Pubkey, quote_vault_snapshot: Option<u64>) -> Self {
        let now = chrono::Utc::now().timestamp();

        Self {
            base_mint,
            token_account,
            pool,
            state: LifecycleState::Idle,
            acquisition: AcquisitionStatus::Pending,
            balance: 0,
            initial_balance: 0,
            quote_spent: 0,
            partial_sold: false,
            incomplete_exit: false,
            quote_vault_snapshot,
            trades: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition(&mut self, next: LifecycleState) -> Result<(), LifecycleError> {
        if !self.state.can_move_to(next) {
            return Err(LifecycleError::IllegalTransition {
                mint: self.base_mint,
                from: self.state,
                to: next,
            });
        }

        log::info!("🔄 {} {:?} -> {:?}", self.base_mint, self.state, next);
        self.state = next;
        self.updated_at = chrono::Utc::now().timestamp();
        Ok(())
    }

    /// Acquisition accepted by a backend
    pub fn record_buy(&mut self, quote_amount: u64, execution_result: &ExecutionResult) {
        self.quote_spent += quote_amount;
        self.trades.push(TradeRecord::from_execution_result(execution_result, true, quote_amount, 0));
        self.updated_at = chrono::Utc::now().timestamp();

        log::info!("📈 Buy submitted - Mint: {}", self.base_mint);
        log::info!("   💰 Quote spent: {}", quote_amount);
        log::info!("   🧾 Signature: {} via {}", execution_result.signature, execution_result.backend);
    }

    /// Balance observed on-chain after the buy
    pub fn confirm(&mut self, balance: u64) -> Result<(), LifecycleError> {
        self.acquisition = AcquisitionStatus::Confirmed;
        self.balance = balance;
        self.initial_balance = balance;
        self.transition(LifecycleState::Holding)
    }

    pub fn record_sell(&mut self, expected_quote_out: u64, token_amount_sold: u64, execution_result: &ExecutionResult) {
        self.trades.push(TradeRecord::from_execution_result(execution_result, false, expected_quote_out, token_amount_sold));
        self.balance = self.balance.saturating_sub(token_amount_sold);
        self.updated_at = chrono::Utc::now().timestamp();

        log::info!("📉 Sell submitted - Mint: {}", self.base_mint);
        log::info!("   🪙 Tokens sold: {}", token_amount_sold);
        log::info!("   💰 Expected quote out: {}", expected_quote_out);
        log::info!("   🪙 Remaining (estimated): {}", self.balance);
    }

    /// Quote cost of the tokens still held
    pub fn remaining_cost_basis(&self) -> u64 {
        if self.initial_balance == 0 {
            return self.quote_spent;
        }
        ((self.quote_spent as u128 * self.balance as u128) / self.initial_balance as u128) as u64
    }

    /// Still occupying a position slot
    pub fn is_active(&self) -> bool {
        !matches!(self.state, LifecycleState::Idle) && !self.state.is_terminal()
    }

    pub fn get_holding_duration(&self) -> i64 {
        chrono::Utc::now().timestamp() - self.created_at
    }

    pub fn print_summary(&self) {
        let buys = self.trades.iter().filter(|t| t.is_buy).count();
        let sells = self.trades.len() - buys;

        log::info!("📊 Position summary - {}", self.base_mint);
        log::info!("   🏊 Pool: {}", self.pool);
        log::info!("   📈 State: {:?} (acquisition {:?})", self.state, self.acquisition);
        log::info!("   💰 Balance: {} (initial {})", self.balance, self.initial_balance);
        log::info!("   💵 Quote spent: {}", self.quote_spent);
        log::info!("   🧾 Trades: {} buy / {} sell", buys, sells);
        log::info!("   🕐 Duration: {}s", self.get_holding_duration());
        if self.incomplete_exit {
            log::error!("   ⚠️ Incomplete exit: tokens may still be held");
        }
    }
}
