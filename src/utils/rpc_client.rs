use anyhow::Result;
use async_trait::async_trait;
use base64::Engine;
use log::debug;
use serde_json::{json, Value};
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;

/// Read-only chain queries used by the filters, pollers and price oracle
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Raw token amount held by `account`; 0 when the account does not exist yet
    async fn get_token_account_balance(&self, account: &Pubkey) -> Result<u64>;

    /// Account data, `None` when the account does not exist
    async fn get_account_data(&self, account: &Pubkey) -> Result<Option<Vec<u8>>>;
}

/// JSON-RPC client over reqwest
pub struct SolanaRpcClient {
    rpc_endpoint: String,
    commitment: String,
    client: reqwest::Client,
}

impl SolanaRpcClient {
    pub fn new(rpc_endpoint: String, commitment: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            rpc_endpoint,
            commitment,
            client,
        })
    }

    pub async fn make_rpc_request(&self, request_body: Value) -> Result<Value> {
        debug!("📡 RPC request: {}", request_body);

        let response = self.client
            .post(&self.rpc_endpoint)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(anyhow::anyhow!("RPC request failed: {} - {}", status, response_text));
        }

        let json_response: Value = serde_json::from_str(&response_text)?;
        Ok(json_response)
    }

    /// Lamports held by `account`
    pub async fn get_sol_balance(&self, account: &Pubkey) -> Result<u64> {
        let request_body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getBalance",
            "params": [account.to_string(), { "commitment": self.commitment }]
        });

        let response = self.make_rpc_request(request_body).await?;
        Self::parse_balance_response(&response)
    }

    fn parse_balance_response(response: &Value) -> Result<u64> {
        if let Some(message) = Self::rpc_error_message(response) {
            return Err(anyhow::anyhow!("getBalance failed: {}", message));
        }

        response
            .get("result")
            .and_then(|r| r.get("value"))
            .and_then(|v| v.as_u64())
            .ok_or_else(|| anyhow::anyhow!("getBalance: unexpected response {}", response))
    }

    fn rpc_error_message(response: &Value) -> Option<String> {
        response.get("error").map(|error| {
            error.get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string())
        })
    }
}

#[async_trait]
impl ChainReader for SolanaRpcClient {
    async fn get_token_account_balance(&self, account: &Pubkey) -> Result<u64> {
        let request_body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getTokenAccountBalance",
            "params": [account.to_string(), { "commitment": self.commitment }]
        });

        let response = self.make_rpc_request(request_body).await?;

        if let Some(message) = Self::rpc_error_message(&response) {
            if message.contains("could not find account") {
                return Ok(0);
            }
            return Err(anyhow::anyhow!("getTokenAccountBalance failed: {}", message));
        }

        let amount = response
            .get("result")
            .and_then(|r| r.get("value"))
            .and_then(|v| v.get("amount"))
            .and_then(|a| a.as_str())
            .ok_or_else(|| anyhow::anyhow!("getTokenAccountBalance: unexpected response {}", response))?;

        Ok(amount.parse::<u64>()?)
    }

    async fn get_account_data(&self, account: &Pubkey) -> Result<Option<Vec<u8>>> {
        let request_body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getAccountInfo",
            "params": [account.to_string(), { "encoding": "base64", "commitment": self.commitment }]
        });

        let response = self.make_rpc_request(request_body).await?;

        if let Some(message) = Self::rpc_error_message(&response) {
            return Err(anyhow::anyhow!("getAccountInfo failed: {}", message));
        }

        let value = response
            .get("result")
            .and_then(|r| r.get("value"))
            .ok_or_else(|| anyhow::anyhow!("getAccountInfo: unexpected response {}", response))?;

        if value.is_null() {
            return Ok(None);
        }

        let encoded = value
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(|d| d.as_str())
            .ok_or_else(|| anyhow::anyhow!("getAccountInfo: missing base64 data"))?;

        Ok(Some(base64::prelude::BASE64_STANDARD.decode(encoded)?))
    }
}
