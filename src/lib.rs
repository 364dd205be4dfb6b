pub mod config;
pub mod constant;
pub mod executor;
pub mod processors;
pub mod streams;
pub mod strategy;
pub mod utils;

// Re-export commonly used types
pub use config::{AppConfig, ConfigManager, QuoteToken, StreamConfig};
pub use processors::{AccountKind, AccountUpdate, EventDispatcher};
pub use streams::{AccountFilterSpec, AccountStream};
pub use strategy::{
    FilterPipeline, LifecycleOrchestrator, LifecycleState, ManualOverride, MatchedPool,
    PositionGate, TrackedPosition,
};
pub use executor::{
    BlockhashCache, ExecutionError, ExecutionMode, ExecutionResult, ExecutorManager,
    PriorityFee, SwapInstructionBuilder, TransactionExecutor,
};
pub use utils::{ChainReader, EventLogger, SolanaRpcClient};
