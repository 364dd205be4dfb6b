use thiserror::Error;
use solana_sdk::signature::SignerError;
use solana_client::client_error::ClientError;

/// Errors raised while building or submitting transactions
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Transaction failed: {message}, signature: {signature:?}")]
    TransactionFailed {
        message: String,
        signature: Option<String>,
    },

    #[error("Service unavailable: {service} - {reason}")]
    ServiceUnavailable {
        service: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Transaction serialization error: {0}")]
    Serialization(String),

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("Blockhash not found or expired")]
    BlockhashExpired,

    #[error("All {} execution backend(s) failed", .attempts.len())]
    AllBackendsFailed {
        attempts: Vec<(String, String)>, // (backend, error message)
    },

    #[error("Failed to build instruction: {0}")]
    Instruction(String),
}

impl From<ClientError> for ExecutionError {
    fn from(err: ClientError) -> Self {
        ExecutionError::Network(err.to_string())
    }
}

impl From<SignerError> for ExecutionError {
    fn from(err: SignerError) -> Self {
        ExecutionError::Signature(err.to_string())
    }
}

impl From<serde_json::Error> for ExecutionError {
    fn from(err: serde_json::Error) -> Self {
        ExecutionError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for ExecutionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExecutionError::Timeout(err.to_string())
        } else if err.is_connect() {
            ExecutionError::Network(format!("Connection error: {}", err))
        } else {
            ExecutionError::Network(err.to_string())
        }
    }
}

impl ExecutionError {
    /// Classify a JSON-RPC `error` object returned for a submission
    pub fn from_rpc_error(context: &str, error: &serde_json::Value) -> Self {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or_default()
            .to_lowercase();
        if message.contains("blockhash not found") || message.contains("blockhash expired") {
            return ExecutionError::BlockhashExpired;
        }
        ExecutionError::TransactionFailed {
            message: format!("{}: {}", context, error),
            signature: None,
        }
    }

    /// Whether a later attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExecutionError::Network(_) |
            ExecutionError::Timeout(_) |
            ExecutionError::ServiceUnavailable { .. } |
            ExecutionError::BlockhashExpired |
            ExecutionError::TransactionFailed { .. } |
            ExecutionError::AllBackendsFailed { .. }
        )
    }
}
