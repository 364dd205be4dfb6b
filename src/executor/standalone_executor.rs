use async_trait::async_trait;
use base64::prelude::*;
use reqwest::Client;
use serde_json::{json, Value};
use solana_sdk::{
    instruction::Instruction,
    signature::{Keypair, Signature},
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use log::{debug, info};

use crate::executor::{
    blockhash_cache::BlockhashCache,
    errors::ExecutionError,
    traits::{ExecutionResult, PriorityFee, TransactionExecutor},
    transaction_builder::{build_signed_transaction, compute_budget_instructions},
};

/// Base fee of a single-signature transaction
pub const BASE_FEE_LAMPORTS: u64 = 5_000;

/// Serialize a signed transaction the way `sendTransaction` expects it
pub fn encode_transaction(transaction: &VersionedTransaction) -> Result<String, ExecutionError> {
    let serialized_tx = bincode::serialize(transaction)
        .map_err(|e| ExecutionError::Serialization(format!("Failed to serialize transaction: {}", e)))?;
    Ok(BASE64_STANDARD.encode(serialized_tx))
}

/// Extract the signature from a JSON-RPC `sendTransaction` response
pub fn parse_send_response(service: &str, response: &Value) -> Result<Signature, ExecutionError> {
    if let Some(signature_str) = response.get("result").and_then(|v| v.as_str()) {
        signature_str.parse::<Signature>()
            .map_err(|e| ExecutionError::Serialization(format!("Invalid signature: {}", e)))
    } else if let Some(error) = response.get("error") {
        Err(ExecutionError::from_rpc_error("RPC Error", error))
    } else {
        Err(ExecutionError::ServiceUnavailable {
            service: service.to_string(),
            reason: "Unexpected response format".to_string(),
        })
    }
}

/// Sends signed transactions straight to the RPC node
pub struct StandaloneExecutor {
    endpoint: String,
    client: Client,
    wallet: Arc<Keypair>,
    blockhash_cache: Arc<BlockhashCache>,
}

impl StandaloneExecutor {
    pub fn new(
        endpoint: String,
        timeout: Duration,
        wallet: Arc<Keypair>,
        blockhash_cache: Arc<BlockhashCache>,
    ) -> Result<Self, ExecutionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExecutionError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            client,
            wallet,
            blockhash_cache,
        })
    }

    async fn send_transaction(&self, transaction: &VersionedTransaction) -> Result<Signature, ExecutionError> {
        let request_body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "sendTransaction",
            "params": [
                encode_transaction(transaction)?,
                {
                    "encoding": "base64",
                    "skipPreflight": true
                }
            ]
        });

        let response = self.client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ExecutionError::ServiceUnavailable {
                service: "RPC".to_string(),
                reason: format!("HTTP {}: {}", status, error_text),
            });
        }

        let result: Value = response.json().await?;
        parse_send_response("RPC", &result)
    }
}

#[async_trait]
impl TransactionExecutor for StandaloneExecutor {
    fn name(&self) -> &str {
        "standalone"
    }

    async fn submit(
        &self,
        instructions: Vec<Instruction>,
        fee: PriorityFee,
    ) -> Result<ExecutionResult, ExecutionError> {
        let start_time = Instant::now();

        let mut all_instructions = compute_budget_instructions(fee);
        all_instructions.extend(instructions);

        let recent_blockhash = self.blockhash_cache.get_blockhash().await?;
        let transaction = build_signed_transaction(&all_instructions, &self.wallet, recent_blockhash)?;
        debug!("📦 [standalone] {} instructions, blockhash {}", all_instructions.len(), recent_blockhash);

        let signature = self.send_transaction(&transaction).await?;
        let latency_ms = start_time.elapsed().as_millis() as u64;
        info!("✅ [standalone] Transaction submitted: {} ({}ms)", signature, latency_ms);

        let priority_fee = fee.compute_unit_limit as u64 * fee.compute_unit_price_micro_lamports / 1_000_000;
        Ok(ExecutionResult {
            signature,
            backend: self.name().to_string(),
            fee_paid: BASE_FEE_LAMPORTS + priority_fee,
            latency_ms,
        })
    }
}
