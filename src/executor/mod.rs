pub mod traits;
pub mod errors;
pub mod transaction_builder;
pub mod blockhash_cache;
pub mod standalone_executor;
pub mod bundle_executor;
pub mod executor_manager;

pub use traits::{TransactionExecutor, ExecutionMode, ExecutionResult, PriorityFee};
pub use errors::ExecutionError;
pub use transaction_builder::{SwapInstructionBuilder, build_signed_transaction, compute_budget_instructions};
pub use blockhash_cache::{BlockhashCache, CachedBlockhash};
pub use standalone_executor::StandaloneExecutor;
pub use bundle_executor::BundleExecutor;
pub use executor_manager::{ExecutorManager, ExecutorManagerStats, DryRunExecutor};
