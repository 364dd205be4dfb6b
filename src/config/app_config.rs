use serde::{Serialize, Deserialize};
use crate::executor::errors::ExecutionError;
use crate::executor::ExecutionMode;

/// Connection settings of the Yellowstone account stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub endpoint: String,
    pub x_token: Option<String>,
    pub timeout_seconds: u64,
    pub commitment_level: String,
}

impl StreamConfig {
    pub fn new(endpoint: String, token: Option<String>) -> Self {
        Self {
            endpoint,
            x_token: token,
            timeout_seconds: 10,
            commitment_level: "processed".to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn with_commitment(mut self, commitment: String) -> Self {
        self.commitment_level = commitment;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub rpc: RpcConfig,
    pub grpc: GrpcConfig,
    pub quote: QuoteConfig,
    pub filters: FiltersConfig,
    pub trading: TradingConfig,
    pub executor: ExecutorConfig,
    pub blockhash_cache: BlockhashCacheConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// processed | confirmed | finalized
    pub commitment: String,
    pub network_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrpcConfig {
    pub endpoint: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteConfig {
    /// WSOL | USDC
    pub mint: String,
    /// Spent per acquisition, in quote units
    pub amount: f64,
    /// 0 disables the bound
    pub min_pool_size: f64,
    /// 0 disables the bound
    pub max_pool_size: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiltersConfig {
    pub use_allow_list: bool,
    pub allow_list_path: String,
    pub allow_list_refresh_seconds: u64,
    pub check_mint_renounced: bool,
    pub check_socials: bool,
    pub check_mutable: bool,
    pub check_burned: bool,
    pub wait_until_lp_burnt: bool,
    pub lp_burn_wait_seconds: u64,
    pub lp_burn_check_interval_ms: u64,
    /// Ignore pools whose open time is not after process start
    pub skip_existing_pools: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    pub one_token_at_a_time: bool,
    /// Concurrent lifecycles when not in single-position mode, 0 = unbounded
    pub max_positions: usize,
    pub take_profit_1_percent: f64,
    pub take_profit_2_percent: f64,
    pub stop_loss_percent: f64,
    pub sell_at_tp1: bool,
    pub tp1_sell_fraction: f64,
    pub price_check_interval_ms: u64,
    pub price_check_duration_ms: u64,
    pub sell_slippage_percent: f64,
    pub max_sell_retries: u32,
    pub sell_retry_interval_ms: u64,
    pub balance_poll_attempts: u32,
    pub balance_poll_interval_ms: u64,
    pub balance_error_backoff_ms: u64,
    /// Unpaired pool/market records older than this are dropped, 0 = keep forever
    pub unpaired_ttl_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    pub mode: ExecutionMode,
    pub compute_unit_limit: u32,
    pub compute_unit_price_micro_lamports: u64,
    pub timeout_seconds: u64,
    pub jito: JitoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JitoConfig {
    pub block_engine_url: String,
    pub tip_lamports: u64,
    pub tip_accounts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockhashCacheConfig {
    pub update_interval_ms: u64,
    pub max_age_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportingConfig {
    /// JSONL file receiving one line per finished lifecycle
    pub events_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl AppConfig {
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ExecutionError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ExecutionError::Configuration(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ExecutionError> {
        toml::from_str(content)
            .map_err(|e| ExecutionError::Configuration(format!("Failed to parse config file: {}", e)))
    }

    pub fn load_with_env_override<P: AsRef<std::path::Path>>(config_path: P) -> Result<Self, ExecutionError> {
        let mut config = Self::from_file(config_path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ExecutionError> {
        // secrets are handled by ConfigManager
        if let Ok(endpoint) = std::env::var("RPC_ENDPOINT") {
            self.rpc.endpoint = endpoint;
        }

        if let Ok(endpoint) = std::env::var("GRPC_ENDPOINT") {
            self.grpc.endpoint = endpoint;
        }

        if let Ok(mint) = std::env::var("QUOTE_MINT") {
            self.quote.mint = mint;
        }

        if let Ok(amount) = std::env::var("QUOTE_AMOUNT") {
            self.quote.amount = amount.parse()
                .map_err(|e| ExecutionError::Configuration(format!("Invalid QUOTE_AMOUNT: {}", e)))?;
        }

        if let Ok(mode) = std::env::var("EXECUTION_MODE") {
            self.executor.mode = mode.parse()?;
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ExecutionError> {
        match self.quote.mint.to_uppercase().as_str() {
            "WSOL" | "USDC" => {},
            other => return Err(ExecutionError::Configuration(format!(
                "Unsupported quote mint \"{}\". Supported values are USDC and WSOL", other
            ))),
        }

        if self.quote.amount <= 0.0 {
            return Err(ExecutionError::Configuration(
                "Quote amount must be greater than 0".to_string()
            ));
        }

        if self.quote.min_pool_size < 0.0 || self.quote.max_pool_size < 0.0 {
            return Err(ExecutionError::Configuration(
                "Pool size bounds cannot be negative".to_string()
            ));
        }

        if self.quote.max_pool_size > 0.0 && self.quote.min_pool_size > self.quote.max_pool_size {
            return Err(ExecutionError::Configuration(
                "Min pool size cannot exceed max pool size".to_string()
            ));
        }

        if self.general.network_timeout_ms < 1000 {
            return Err(ExecutionError::Configuration(
                "Network timeout must be at least 1000ms".to_string()
            ));
        }

        if self.filters.use_allow_list && self.filters.allow_list_path.trim().is_empty() {
            return Err(ExecutionError::Configuration(
                "allow_list_path is required when use_allow_list is enabled".to_string()
            ));
        }

        if self.filters.wait_until_lp_burnt && self.filters.lp_burn_check_interval_ms == 0 {
            return Err(ExecutionError::Configuration(
                "LP burn check interval must be greater than 0".to_string()
            ));
        }

        let trading = &self.trading;
        if trading.take_profit_1_percent <= 0.0 || trading.take_profit_2_percent <= 0.0 {
            return Err(ExecutionError::Configuration(
                "Take profit thresholds must be positive".to_string()
            ));
        }

        if trading.take_profit_1_percent > trading.take_profit_2_percent {
            return Err(ExecutionError::Configuration(
                "Take profit 1 cannot exceed take profit 2".to_string()
            ));
        }

        if trading.stop_loss_percent <= 0.0 || trading.stop_loss_percent > 100.0 {
            return Err(ExecutionError::Configuration(
                "Stop loss must be within (0, 100]".to_string()
            ));
        }

        if !(trading.tp1_sell_fraction > 0.0 && trading.tp1_sell_fraction < 1.0) {
            return Err(ExecutionError::Configuration(
                "tp1_sell_fraction must be within (0, 1)".to_string()
            ));
        }

        if !(0.0..100.0).contains(&trading.sell_slippage_percent) {
            return Err(ExecutionError::Configuration(
                "Sell slippage must be within [0, 100)".to_string()
            ));
        }

        if trading.price_check_interval_ms == 0 {
            return Err(ExecutionError::Configuration(
                "Price check interval must be greater than 0".to_string()
            ));
        }

        if trading.max_sell_retries == 0 || trading.balance_poll_attempts == 0 {
            return Err(ExecutionError::Configuration(
                "Retry budgets must allow at least one attempt".to_string()
            ));
        }

        if self.blockhash_cache.update_interval_ms < 50 {
            return Err(ExecutionError::Configuration(
                "Blockhash cache update interval must be at least 50ms".to_string()
            ));
        }

        if self.executor.mode != ExecutionMode::Standalone && self.executor.jito.tip_accounts.is_empty() {
            return Err(ExecutionError::Configuration(
                "Jito tip accounts cannot be empty when bundles are enabled".to_string()
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {},
            _ => return Err(ExecutionError::Configuration(
                "Invalid log level. Must be one of: trace, debug, info, warn, error".to_string()
            )),
        }

        log::info!("✅ Configuration validation passed");
        Ok(())
    }

    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ExecutionError> {
        let toml_content = toml::to_string_pretty(self)
            .map_err(|e| ExecutionError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_content)
            .map_err(|e| ExecutionError::Configuration(format!("Failed to write config file: {}", e)))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig {
                commitment: "processed".to_string(),
                network_timeout_ms: 30000,
            },
            rpc: RpcConfig {
                endpoint: "https://api.mainnet-beta.solana.com".to_string(),
            },
            grpc: GrpcConfig {
                endpoint: "https://grpc.ny.shyft.to".to_string(),
                timeout_seconds: 10,
            },
            quote: QuoteConfig {
                mint: "WSOL".to_string(),
                amount: 0.01,
                min_pool_size: 5.0,
                max_pool_size: 50.0,
            },
            filters: FiltersConfig {
                use_allow_list: false,
                allow_list_path: "allow-list.txt".to_string(),
                allow_list_refresh_seconds: 30,
                check_mint_renounced: true,
                check_socials: false,
                check_mutable: false,
                check_burned: true,
                wait_until_lp_burnt: false,
                lp_burn_wait_seconds: 60,
                lp_burn_check_interval_ms: 2000,
                skip_existing_pools: true,
            },
            trading: TradingConfig {
                one_token_at_a_time: true,
                max_positions: 0,
                take_profit_1_percent: 25.0,
                take_profit_2_percent: 50.0,
                stop_loss_percent: 20.0,
                sell_at_tp1: true,
                tp1_sell_fraction: 0.5,
                price_check_interval_ms: 2000,
                price_check_duration_ms: 600000,
                sell_slippage_percent: 20.0,
                max_sell_retries: 10,
                sell_retry_interval_ms: 1000,
                balance_poll_attempts: 11,
                balance_poll_interval_ms: 1000,
                balance_error_backoff_ms: 500,
                unpaired_ttl_seconds: 0,
            },
            executor: ExecutorConfig {
                mode: ExecutionMode::Standalone,
                compute_unit_limit: 101337,
                compute_unit_price_micro_lamports: 421197,
                timeout_seconds: 10,
                jito: JitoConfig {
                    block_engine_url: "https://mainnet.block-engine.jito.wtf/api/v1/bundles".to_string(),
                    tip_lamports: 1000000,
                    tip_accounts: vec![
                        "96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5".to_string(),
                        "HFqU5x63VTqvQss8hp11i4wVV8bD44PvwucfZ2bU7gRe".to_string(),
                        "Cw8CFyM9FkoMi7K7Crf6HNQqf4uEMzpKw6QNghXLvLkY".to_string(),
                        "ADaUMid9yfUytqMBgopwjb2DTLSokTSzL1zt6iGPaS49".to_string(),
                        "DfXygSm4jCyNCybVYYK6DwvWqjKee8pbDmJGcLWNDXjh".to_string(),
                        "ADuUkR4vqLUMWXxW9gh6D6L8pMSawimctcNZ5pGwDcEt".to_string(),
                        "DttWaMuVvTiduZRnguLF7jNxTgiMBZ1hyAumKUiL2KRL".to_string(),
                        "3AVi9Tg9Uo68tJfuvoKvqKNWKkC5wPdSSdeBnizKZ6jT".to_string(),
                    ],
                },
            },
            blockhash_cache: BlockhashCacheConfig {
                update_interval_ms: 400,
                max_age_seconds: 10,
            },
            reporting: ReportingConfig {
                events_file: Some("lifecycle_events.jsonl".to_string()),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}
