pub mod app_config;
pub mod config_manager;

pub use app_config::{
    AppConfig, GeneralConfig, RpcConfig, GrpcConfig, StreamConfig, QuoteConfig,
    FiltersConfig, TradingConfig, ExecutorConfig, JitoConfig, BlockhashCacheConfig,
    ReportingConfig, LoggingConfig,
};
pub use config_manager::{ConfigManager, QuoteToken};
