pub mod event_logger;
pub mod rpc_client;

pub use event_logger::{EventLogger, LifecycleReport};
pub use rpc_client::{ChainReader, SolanaRpcClient};
