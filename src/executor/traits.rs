use solana_sdk::{instruction::Instruction, signature::Signature};
use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use crate::executor::errors::ExecutionError;

/// Which backend(s) receive a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Plain transaction sent to the RPC node
    Standalone,
    /// Jito bundle with a tip transfer
    Bundle,
    /// Both backends in parallel, first success wins
    All,
}

impl std::str::FromStr for ExecutionMode {
    type Err = ExecutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standalone" => Ok(ExecutionMode::Standalone),
            "bundle" | "jito" => Ok(ExecutionMode::Bundle),
            "all" => Ok(ExecutionMode::All),
            other => Err(ExecutionError::Configuration(format!(
                "Unsupported execution mode '{}'. Supported values are standalone, bundle, all",
                other
            ))),
        }
    }
}

/// Fee parameters attached to every submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityFee {
    pub compute_unit_limit: u32,
    pub compute_unit_price_micro_lamports: u64,
    /// Only used by the bundle backend
    pub tip_lamports: u64,
}

/// Result of an accepted submission
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Signature of the submitted transaction
    pub signature: Signature,
    /// Backend that accepted it
    pub backend: String,
    /// Fee paid on top of the base fee (lamports)
    pub fee_paid: u64,
    /// Submission latency (ms)
    pub latency_ms: u64,
}

/// A transport that accepts instructions and reports whether it took them.
///
/// Acceptance says nothing about on-chain confirmation; callers confirm
/// through balance polling.
#[async_trait]
pub trait TransactionExecutor: Send + Sync {
    /// Backend name used in logs and reports
    fn name(&self) -> &str;

    /// Sign and submit `instructions` as one transaction
    async fn submit(
        &self,
        instructions: Vec<Instruction>,
        fee: PriorityFee,
    ) -> Result<ExecutionResult, ExecutionError>;
}
