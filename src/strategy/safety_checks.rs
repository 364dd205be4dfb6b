use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::processors::account_decoder::{decode_metadata, decode_mint, metadata_address, MintState, TokenMetadata};
use crate::strategy::correlator::MatchedPool;
use crate::utils::ChainReader;

/// Result of a single token-safety check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Pass,
    Fail(String),
    /// Could not decide (missing account, I/O failure)
    Undetermined(String),
}

impl CheckOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, CheckOutcome::Pass)
    }
}

#[async_trait]
pub trait SafetyCheck: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self, candidate: &MatchedPool) -> CheckOutcome;
}

async fn load_mint(reader: &dyn ChainReader, mint: &solana_sdk::pubkey::Pubkey) -> Result<MintState, CheckOutcome> {
    match reader.get_account_data(mint).await {
        Ok(Some(data)) => decode_mint(&data).map_err(|e| CheckOutcome::Undetermined(e.to_string())),
        Ok(None) => Err(CheckOutcome::Undetermined(format!("mint account {} not found", mint))),
        Err(e) => Err(CheckOutcome::Undetermined(format!("failed to load mint {}: {}", mint, e))),
    }
}

async fn load_metadata(reader: &dyn ChainReader, candidate: &MatchedPool) -> Result<TokenMetadata, CheckOutcome> {
    let address = metadata_address(&candidate.base_mint());
    match reader.get_account_data(&address).await {
        Ok(Some(data)) => decode_metadata(&data).map_err(|e| CheckOutcome::Undetermined(e.to_string())),
        Ok(None) => Err(CheckOutcome::Undetermined(format!("metadata account {} not found", address))),
        Err(e) => Err(CheckOutcome::Undetermined(format!("failed to load metadata {}: {}", address, e))),
    }
}

/// Base mint can no longer be minted
pub struct MintRenouncedCheck {
    reader: Arc<dyn ChainReader>,
}

impl MintRenouncedCheck {
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl SafetyCheck for MintRenouncedCheck {
    fn name(&self) -> &'static str {
        "mint_renounced"
    }

    async fn check(&self, candidate: &MatchedPool) -> CheckOutcome {
        match load_mint(self.reader.as_ref(), &candidate.base_mint()).await {
            Ok(mint) if mint.mint_authority_present => CheckOutcome::Fail("mint authority not renounced".to_string()),
            Ok(_) => CheckOutcome::Pass,
            Err(outcome) => outcome,
        }
    }
}

/// True when the off-chain metadata JSON carries at least one social link
pub fn has_social_links(metadata: &Value) -> bool {
    const KEYS: [&str; 4] = ["twitter", "telegram", "website", "discord"];

    let non_empty = |object: &Value| {
        KEYS.iter().any(|key| {
            object
                .get(key)
                .and_then(Value::as_str)
                .map(|s| !s.trim().is_empty())
                .unwrap_or(false)
        })
    };

    non_empty(metadata) || metadata.get("extensions").map(non_empty).unwrap_or(false)
}

/// Metadata URI points at JSON with a social link
pub struct SocialPresenceCheck {
    reader: Arc<dyn ChainReader>,
    http: reqwest::Client,
}

impl SocialPresenceCheck {
    pub fn new(reader: Arc<dyn ChainReader>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { reader, http })
    }
}

#[async_trait]
impl SafetyCheck for SocialPresenceCheck {
    fn name(&self) -> &'static str {
        "socials"
    }

    async fn check(&self, candidate: &MatchedPool) -> CheckOutcome {
        let metadata = match load_metadata(self.reader.as_ref(), candidate).await {
            Ok(metadata) => metadata,
            Err(outcome) => return outcome,
        };

        if metadata.uri.is_empty() {
            return CheckOutcome::Fail("metadata has no uri".to_string());
        }

        debug!("🌐 Fetching metadata json {}", metadata.uri);
        let response = match self.http.get(&metadata.uri).send().await {
            Ok(response) => response,
            Err(e) => return CheckOutcome::Undetermined(format!("metadata uri fetch failed: {}", e)),
        };
        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => return CheckOutcome::Undetermined(format!("metadata uri is not json: {}", e)),
        };

        if has_social_links(&body) {
            CheckOutcome::Pass
        } else {
            CheckOutcome::Fail("no social links".to_string())
        }
    }
}

/// Metadata can no longer be changed by the creator
pub struct ImmutableMetadataCheck {
    reader: Arc<dyn ChainReader>,
}

impl ImmutableMetadataCheck {
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl SafetyCheck for ImmutableMetadataCheck {
    fn name(&self) -> &'static str {
        "immutable_metadata"
    }

    async fn check(&self, candidate: &MatchedPool) -> CheckOutcome {
        match load_metadata(self.reader.as_ref(), candidate).await {
            Ok(metadata) if metadata.is_mutable => CheckOutcome::Fail("metadata is mutable".to_string()),
            Ok(_) => CheckOutcome::Pass,
            Err(outcome) => outcome,
        }
    }
}

/// Whole LP supply burned
pub struct LpBurnedCheck {
    reader: Arc<dyn ChainReader>,
}

impl LpBurnedCheck {
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl SafetyCheck for LpBurnedCheck {
    fn name(&self) -> &'static str {
        "lp_burned"
    }

    async fn check(&self, candidate: &MatchedPool) -> CheckOutcome {
        match load_mint(self.reader.as_ref(), &candidate.pool.state.lp_mint).await {
            Ok(lp) if lp.supply == 0 => CheckOutcome::Pass,
            Ok(lp) => CheckOutcome::Fail(format!("lp supply {} not burned", lp.supply)),
            Err(outcome) => outcome,
        }
    }
}
