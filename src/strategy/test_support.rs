//! In-crate doubles for the seam traits, shared by the strategy tests.

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::constant::accounts::{OPENBOOK, WSOL_MINT};
use crate::constant::market_v3;
use crate::executor::{ExecutionError, ExecutionResult, PriorityFee, TransactionExecutor};
use crate::processors::account_decoder::{decode_market, decode_pool, fixtures};
use crate::strategy::correlator::MatchedPool;
use crate::strategy::exit_controller::PositionDisposer;
use crate::strategy::price_oracle::PriceOracle;
use crate::strategy::safety_checks::{CheckOutcome, SafetyCheck};
use crate::utils::ChainReader;

/// Smallest nonce giving an off-curve vault signer for `market_id`
pub fn valid_vault_signer_nonce(market_id: &Pubkey) -> u64 {
    (0..=255u64)
        .find(|nonce| Pubkey::create_program_address(&[market_id.as_ref(), &nonce.to_le_bytes()[..]], &OPENBOOK).is_ok())
        .expect("vault signer nonce")
}

/// Market account bytes whose vault signer can be derived
pub fn market_bytes_for(market_id: &Pubkey, mint: &Pubkey) -> Vec<u8> {
    let mut data = fixtures::market_bytes(mint, &WSOL_MINT);
    let offset = market_v3::VAULT_SIGNER_NONCE;
    data[offset..offset + 8].copy_from_slice(&valid_vault_signer_nonce(market_id).to_le_bytes());
    data
}

/// Pool + market for a fresh mint; the quote vault is not funded
pub fn matched_pool() -> MatchedPool {
    let mint = Pubkey::new_unique();
    let market_id = Pubkey::new_unique();
    let pool = decode_pool(Pubkey::new_unique(), &fixtures::pool_bytes(&mint, &WSOL_MINT, &market_id, 100))
        .expect("pool fixture");
    let market = decode_market(market_id, &market_bytes_for(&market_id, &mint)).expect("market fixture");
    MatchedPool { pool, market }
}

/// Scripted chain: per-account balance sequences whose last value repeats.
/// `None` in a script is an RPC error.
#[derive(Default)]
pub struct MockChain {
    balances: Mutex<HashMap<Pubkey, VecDeque<Option<u64>>>>,
    accounts: Mutex<HashMap<Pubkey, Vec<u8>>>,
    balance_calls: Mutex<HashMap<Pubkey, usize>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, account: Pubkey, amount: u64) {
        self.script_balances(account, vec![Some(amount)]);
    }

    pub fn script_balances(&self, account: Pubkey, steps: Vec<Option<u64>>) {
        self.balances.lock().unwrap().insert(account, steps.into());
    }

    pub fn set_account(&self, account: Pubkey, data: Vec<u8>) {
        self.accounts.lock().unwrap().insert(account, data);
    }

    pub fn balance_calls(&self, account: &Pubkey) -> usize {
        self.balance_calls.lock().unwrap().get(account).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn get_token_account_balance(&self, account: &Pubkey) -> anyhow::Result<u64> {
        *self.balance_calls.lock().unwrap().entry(*account).or_default() += 1;

        let mut balances = self.balances.lock().unwrap();
        let step = match balances.get_mut(account) {
            Some(steps) if steps.len() > 1 => steps.pop_front().flatten(),
            Some(steps) => steps.front().copied().flatten(),
            None => Some(0),
        };
        step.ok_or_else(|| anyhow::anyhow!("rpc unavailable"))
    }

    async fn get_account_data(&self, account: &Pubkey) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.accounts.lock().unwrap().get(account).cloned())
    }
}

/// Records every submission; the first `failures` calls fail with a retryable error
pub struct MockExecutor {
    name: String,
    failures: AtomicUsize,
    pub submissions: Mutex<Vec<Vec<Instruction>>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::failing(0)
    }

    pub fn failing(failures: usize) -> Self {
        Self {
            name: "mock".to_string(),
            failures: AtomicUsize::new(failures),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

pub fn execution_result(backend: &str) -> ExecutionResult {
    ExecutionResult {
        signature: Signature::new_unique(),
        backend: backend.to_string(),
        fee_paid: 5000,
        latency_ms: 1,
    }
}

#[async_trait]
impl TransactionExecutor for MockExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn submit(&self, instructions: Vec<Instruction>, _fee: PriorityFee) -> Result<ExecutionResult, ExecutionError> {
        self.submissions.lock().unwrap().push(instructions);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ExecutionError::Network("connection reset".to_string()));
        }
        Ok(execution_result(&self.name))
    }
}

/// Returns scripted quote values in order; the last one repeats
pub struct MockOracle {
    values: Mutex<VecDeque<u64>>,
}

impl MockOracle {
    pub fn new(values: Vec<u64>) -> Self {
        Self { values: Mutex::new(values.into()) }
    }
}

#[async_trait]
impl PriceOracle for MockOracle {
    async fn quote_value(&self, _candidate: &MatchedPool, _amount: u64) -> anyhow::Result<u64> {
        let mut values = self.values.lock().unwrap();
        let value = if values.len() > 1 { values.pop_front() } else { values.front().copied() };
        value.ok_or_else(|| anyhow::anyhow!("no price"))
    }
}

/// Records disposal amounts; fails the first `failures` calls
pub struct MockDisposer {
    failures: AtomicUsize,
    pub disposals: Mutex<Vec<u64>>,
    pub attempts: AtomicUsize,
}

impl MockDisposer {
    pub fn new() -> Self {
        Self::failing(0)
    }

    pub fn failing(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            disposals: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn disposals(&self) -> Vec<u64> {
        self.disposals.lock().unwrap().clone()
    }
}

#[async_trait]
impl PositionDisposer for MockDisposer {
    async fn dispose(&self, _candidate: &MatchedPool, amount: u64, _min_out: u64) -> Result<ExecutionResult, ExecutionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ExecutionError::Network("connection reset".to_string()));
        }
        self.disposals.lock().unwrap().push(amount);
        Ok(execution_result("mock"))
    }
}

/// Safety check that counts its invocations. Scripted outcomes are served
/// first, then `outcome` on every later call.
pub struct CountingCheck {
    name: &'static str,
    script: Mutex<VecDeque<CheckOutcome>>,
    outcome: CheckOutcome,
    calls: AtomicUsize,
}

impl CountingCheck {
    pub fn new(name: &'static str, outcome: CheckOutcome) -> Self {
        Self::scripted(name, Vec::new(), outcome)
    }

    pub fn scripted(name: &'static str, script: Vec<CheckOutcome>, then: CheckOutcome) -> Self {
        Self {
            name,
            script: Mutex::new(script.into()),
            outcome: then,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn passing(name: &'static str) -> Self {
        Self::new(name, CheckOutcome::Pass)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SafetyCheck for CountingCheck {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn check(&self, _candidate: &MatchedPool) -> CheckOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.outcome.clone())
    }
}
