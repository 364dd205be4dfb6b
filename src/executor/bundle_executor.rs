use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::Client;
use serde_json::{json, Value};
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use log::{debug, info};

use crate::config::JitoConfig;
use crate::executor::{
    blockhash_cache::BlockhashCache,
    errors::ExecutionError,
    standalone_executor::{encode_transaction, BASE_FEE_LAMPORTS},
    traits::{ExecutionResult, PriorityFee, TransactionExecutor},
    transaction_builder::{build_signed_transaction, compute_budget_instructions},
};

/// Submits single-transaction Jito bundles carrying a tip transfer
pub struct BundleExecutor {
    block_engine_url: String,
    tip_accounts: Vec<Pubkey>,
    default_tip_lamports: u64,
    client: Client,
    wallet: Arc<Keypair>,
    blockhash_cache: Arc<BlockhashCache>,
}

impl BundleExecutor {
    pub fn new(
        config: &JitoConfig,
        timeout: Duration,
        wallet: Arc<Keypair>,
        blockhash_cache: Arc<BlockhashCache>,
    ) -> Result<Self, ExecutionError> {
        let tip_accounts = config.tip_accounts.iter()
            .map(|account| {
                Pubkey::from_str(account)
                    .map_err(|e| ExecutionError::Configuration(format!("Invalid tip address '{}': {}", account, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if tip_accounts.is_empty() {
            return Err(ExecutionError::Configuration("No tip addresses configured".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExecutionError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            block_engine_url: config.block_engine_url.clone(),
            tip_accounts,
            default_tip_lamports: config.tip_lamports,
            client,
            wallet,
            blockhash_cache,
        })
    }

    fn pick_tip_account(&self) -> Pubkey {
        let mut rng = rand::thread_rng();
        *self.tip_accounts.choose(&mut rng).unwrap_or(&self.tip_accounts[0])
    }

    fn tip_instruction(&self, tip_lamports: u64) -> Instruction {
        system_instruction::transfer(&self.wallet.pubkey(), &self.pick_tip_account(), tip_lamports)
    }

    async fn send_bundle(&self, encoded: String) -> Result<String, ExecutionError> {
        let request_body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "sendBundle",
            "params": [
                [encoded],
                { "encoding": "base64" }
            ]
        });

        let response = self.client
            .post(&self.block_engine_url)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ExecutionError::ServiceUnavailable {
                service: "Jito".to_string(),
                reason: format!("HTTP {}: {}", status, error_text),
            });
        }

        let result: Value = response.json().await?;
        parse_bundle_response(&result)
    }
}

/// Bundle id from a `sendBundle` response
pub fn parse_bundle_response(response: &Value) -> Result<String, ExecutionError> {
    if let Some(bundle_id) = response.get("result").and_then(|v| v.as_str()) {
        Ok(bundle_id.to_string())
    } else if let Some(error) = response.get("error") {
        Err(ExecutionError::from_rpc_error("Bundle rejected", error))
    } else {
        Err(ExecutionError::ServiceUnavailable {
            service: "Jito".to_string(),
            reason: "Unexpected response format".to_string(),
        })
    }
}

#[async_trait]
impl TransactionExecutor for BundleExecutor {
    fn name(&self) -> &str {
        "bundle"
    }

    async fn submit(
        &self,
        instructions: Vec<Instruction>,
        fee: PriorityFee,
    ) -> Result<ExecutionResult, ExecutionError> {
        let start_time = Instant::now();
        let tip_lamports = if fee.tip_lamports > 0 { fee.tip_lamports } else { self.default_tip_lamports };

        let mut all_instructions = compute_budget_instructions(fee);
        all_instructions.extend(instructions);
        all_instructions.push(self.tip_instruction(tip_lamports));

        let recent_blockhash = self.blockhash_cache.get_blockhash().await?;
        let transaction = build_signed_transaction(&all_instructions, &self.wallet, recent_blockhash)?;
        let signature = transaction.signatures.first().copied().ok_or(ExecutionError::Signature(
            "Signed transaction has no signatures".to_string(),
        ))?;

        let bundle_id = self.send_bundle(encode_transaction(&transaction)?).await?;
        let latency_ms = start_time.elapsed().as_millis() as u64;
        debug!("📦 [bundle] id {}", bundle_id);
        info!("✅ [bundle] Bundle accepted, tip: {} lamports, signature: {} ({}ms)", tip_lamports, signature, latency_ms);

        Ok(ExecutionResult {
            signature,
            backend: self.name().to_string(),
            fee_paid: BASE_FEE_LAMPORTS + tip_lamports,
            latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jito_config(tip_accounts: Vec<String>) -> JitoConfig {
        JitoConfig {
            block_engine_url: "http://127.0.0.1:1/api/v1/bundles".to_string(),
            tip_lamports: 10_000,
            tip_accounts,
        }
    }

    fn cache() -> Arc<BlockhashCache> {
        Arc::new(BlockhashCache::new(
            "http://127.0.0.1:8899".to_string(),
            Duration::from_millis(400),
            Duration::from_secs(10),
        ))
    }

    #[test]
    fn test_rejects_bad_tip_accounts() {
        let wallet = Arc::new(Keypair::new());
        assert!(BundleExecutor::new(&jito_config(vec![]), Duration::from_secs(1), wallet.clone(), cache()).is_err());
        assert!(BundleExecutor::new(&jito_config(vec!["nope".to_string()]), Duration::from_secs(1), wallet, cache()).is_err());
    }

    #[test]
    fn test_tip_goes_to_configured_account() {
        let tip_account = Pubkey::new_unique();
        let wallet = Arc::new(Keypair::new());
        let executor = BundleExecutor::new(
            &jito_config(vec![tip_account.to_string()]),
            Duration::from_secs(1),
            wallet.clone(),
            cache(),
        ).unwrap();

        let ix = executor.tip_instruction(42);
        assert_eq!(ix.accounts[0].pubkey, wallet.pubkey());
        assert_eq!(ix.accounts[1].pubkey, tip_account);
    }

    #[test]
    fn test_parse_bundle_response() {
        assert_eq!(parse_bundle_response(&json!({ "result": "abc" })).unwrap(), "abc");
        assert!(matches!(
            parse_bundle_response(&json!({ "error": { "message": "bundle dropped" } })),
            Err(ExecutionError::TransactionFailed { .. })
        ));
    }
}
