use std::path::Path;
use crate::{
    config::AppConfig,
    constant::accounts::{USDC_MINT, WSOL_MINT},
    executor::errors::ExecutionError,
};
use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};

/// Quote side of every traded pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteToken {
    pub mint: Pubkey,
    pub decimals: u8,
    pub symbol: &'static str,
}

impl QuoteToken {
    /// Resolve the configured quote symbol (`WSOL` or `USDC`)
    pub fn resolve(symbol: &str) -> Result<Self, ExecutionError> {
        match symbol.to_uppercase().as_str() {
            "WSOL" => Ok(Self { mint: WSOL_MINT, decimals: 9, symbol: "WSOL" }),
            "USDC" => Ok(Self { mint: USDC_MINT, decimals: 6, symbol: "USDC" }),
            other => Err(ExecutionError::Configuration(format!(
                "Unsupported quote mint \"{}\". Supported values are USDC and WSOL", other
            ))),
        }
    }

    pub fn is_native(&self) -> bool {
        self.mint == WSOL_MINT
    }

    /// Convert a human amount into raw base units
    pub fn to_raw(&self, amount: f64) -> u64 {
        (amount * 10f64.powi(self.decimals as i32)).round() as u64
    }

    pub fn to_ui(&self, raw: u64) -> f64 {
        raw as f64 / 10f64.powi(self.decimals as i32)
    }
}

/// Configuration entry point.
///
/// - `AppConfig`: TOML file, structure, validation, non-secret env overrides
/// - `ConfigManager`: secrets (wallet key, gRPC token) and derived values
pub struct ConfigManager {
    pub app_config: AppConfig,
    pub grpc_x_token: Option<String>,
    pub rpc_api_key: Option<String>,
    pub wallet_keypair: Option<Keypair>,
}

impl ConfigManager {
    /// Load the config file plus secrets from the environment
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ExecutionError> {
        let app_config = AppConfig::load_with_env_override(config_path)?;

        let manager = Self {
            app_config,
            grpc_x_token: std::env::var("GRPC_X_TOKEN").ok(),
            rpc_api_key: std::env::var("RPC_API_KEY").ok(),
            wallet_keypair: Self::load_wallet_keypair()?,
        };

        manager.validate_required_config()?;

        log::info!("✅ Configuration loaded successfully");
        Ok(manager)
    }

    fn load_wallet_keypair() -> Result<Option<Keypair>, ExecutionError> {
        if let Ok(private_key_str) = std::env::var("WALLET_PRIVATE_KEY") {
            Ok(Some(Self::parse_wallet_keypair(&private_key_str)?))
        } else {
            Ok(None)
        }
    }

    /// Accepts a base58 string or a JSON byte array
    fn parse_wallet_keypair(private_key_str: &str) -> Result<Keypair, ExecutionError> {
        let private_key_str = private_key_str.trim();
        let bytes: Vec<u8> = if private_key_str.starts_with('[') && private_key_str.ends_with(']') {
            serde_json::from_str(private_key_str)
                .map_err(|e| ExecutionError::Configuration(format!("Invalid wallet key JSON format: {}", e)))?
        } else {
            bs58::decode(private_key_str)
                .into_vec()
                .map_err(|e| ExecutionError::Configuration(format!("Invalid base58 wallet key: {}", e)))?
        };

        if bytes.len() != 64 {
            return Err(ExecutionError::Configuration("Wallet private key must be 64 bytes".to_string()));
        }

        Keypair::from_bytes(&bytes)
            .map_err(|e| ExecutionError::Configuration(format!("Invalid wallet keypair: {}", e)))
    }

    fn validate_required_config(&self) -> Result<(), ExecutionError> {
        if self.wallet_keypair.is_none() {
            return Err(ExecutionError::Configuration(
                "WALLET_PRIVATE_KEY environment variable is required".to_string()
            ));
        }

        self.quote_token()?;

        log::info!("✅ Required configuration validation passed");
        Ok(())
    }

    pub fn quote_token(&self) -> Result<QuoteToken, ExecutionError> {
        QuoteToken::resolve(&self.app_config.quote.mint)
    }

    /// RPC endpoint with the optional API key appended
    pub fn rpc_endpoint(&self) -> String {
        match &self.rpc_api_key {
            Some(key) if !key.is_empty() => {
                let separator = if self.app_config.rpc.endpoint.contains('?') { '&' } else { '?' };
                format!("{}{}api_key={}", self.app_config.rpc.endpoint, separator, key)
            }
            _ => self.app_config.rpc.endpoint.clone(),
        }
    }

    pub fn get_wallet_keypair(&self) -> Result<&Keypair, ExecutionError> {
        self.wallet_keypair.as_ref()
            .ok_or_else(|| ExecutionError::Configuration("Wallet keypair not available".to_string()))
    }

    pub fn get_wallet_pubkey(&self) -> Result<Pubkey, ExecutionError> {
        Ok(self.get_wallet_keypair()?.pubkey())
    }

    pub fn generate_default_config_file<P: AsRef<Path>>(path: P) -> Result<(), ExecutionError> {
        AppConfig::default().save_to_file(path)?;
        log::info!("✅ Default configuration file generated");
        Ok(())
    }

    /// Human readable summary without secrets
    pub fn get_config_summary(&self) -> String {
        let config = &self.app_config;
        let bound = |value: f64| if value == 0.0 { "off".to_string() } else { format!("{:.2}", value) };
        format!(
            "ConfigManager Summary:\n\
            - RPC: {} (API key: {})\n\
            - gRPC: {} (x-token: {})\n\
            - Wallet: {}\n\
            - Quote: {} {} per buy\n\
            - Pool size: min {} / max {}\n\
            - Allow list: {}\n\
            - Checks: renounced={} socials={} mutable={} burned={} wait_lp_burn={}\n\
            - One token at a time: {}\n\
            - Take profit: {}% / {}% (sell at tp1: {}), stop loss: {}%\n\
            - Execution mode: {:?}\n\
            - Log level: {}",
            config.rpc.endpoint,
            if self.rpc_api_key.is_some() { "set" } else { "none" },
            config.grpc.endpoint,
            if self.grpc_x_token.is_some() { "set" } else { "none" },
            self.wallet_keypair.as_ref().map(|k| k.pubkey().to_string()).unwrap_or_else(|| "missing".to_string()),
            config.quote.amount,
            config.quote.mint,
            bound(config.quote.min_pool_size),
            bound(config.quote.max_pool_size),
            if config.filters.use_allow_list { config.filters.allow_list_path.as_str() } else { "off" },
            config.filters.check_mint_renounced,
            config.filters.check_socials,
            config.filters.check_mutable,
            config.filters.check_burned,
            config.filters.wait_until_lp_burnt,
            config.trading.one_token_at_a_time,
            config.trading.take_profit_1_percent,
            config.trading.take_profit_2_percent,
            config.trading.sell_at_tp1,
            config.trading.stop_loss_percent,
            config.executor.mode,
            config.logging.level,
        )
    }
}
