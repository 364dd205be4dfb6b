use async_trait::async_trait;
use solana_sdk::{instruction::Instruction, signature::Keypair};
use std::sync::Arc;
use std::time::{Duration, Instant};
use log::{debug, error, info, warn};
use tokio::sync::RwLock;

use crate::config::ExecutorConfig;
use crate::executor::{
    blockhash_cache::BlockhashCache,
    bundle_executor::BundleExecutor,
    errors::ExecutionError,
    standalone_executor::StandaloneExecutor,
    traits::{ExecutionMode, ExecutionResult, PriorityFee, TransactionExecutor},
};

/// Submission statistics
#[derive(Debug, Default, Clone)]
pub struct ExecutorManagerStats {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    pub average_execution_time_ms: u64,
}

/// Fans a submission out to every configured backend and returns the first
/// acceptance.
pub struct ExecutorManager {
    mode: ExecutionMode,
    backends: Vec<Arc<dyn TransactionExecutor>>,
    pub stats: Arc<RwLock<ExecutorManagerStats>>,
}

impl ExecutorManager {
    pub fn new(mode: ExecutionMode, backends: Vec<Arc<dyn TransactionExecutor>>) -> Result<Self, ExecutionError> {
        if backends.is_empty() {
            return Err(ExecutionError::Configuration("No executors available".to_string()));
        }

        Ok(Self {
            mode,
            backends,
            stats: Arc::new(RwLock::new(ExecutorManagerStats::default())),
        })
    }

    /// Backends for the configured mode
    pub fn from_config(
        config: &ExecutorConfig,
        rpc_endpoint: String,
        wallet: Arc<Keypair>,
        blockhash_cache: Arc<BlockhashCache>,
    ) -> Result<Self, ExecutionError> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let mut backends: Vec<Arc<dyn TransactionExecutor>> = Vec::new();

        if matches!(config.mode, ExecutionMode::Standalone | ExecutionMode::All) {
            backends.push(Arc::new(StandaloneExecutor::new(
                rpc_endpoint,
                timeout,
                wallet.clone(),
                blockhash_cache.clone(),
            )?));
        }

        if matches!(config.mode, ExecutionMode::Bundle | ExecutionMode::All) {
            backends.push(Arc::new(BundleExecutor::new(
                &config.jito,
                timeout,
                wallet,
                blockhash_cache,
            )?));
        }

        let manager = Self::new(config.mode, backends)?;
        info!("🚀 Executor manager ready: mode {:?}, backends [{}]", manager.mode, manager.backend_names().join(", "));
        Ok(manager)
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn backend_names(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.name().to_string()).collect()
    }

    pub async fn get_stats(&self) -> ExecutorManagerStats {
        self.stats.read().await.clone()
    }

    async fn record(&self, success: bool, elapsed: Duration) {
        let mut stats = self.stats.write().await;
        stats.total_executions += 1;
        if success {
            stats.successful_executions += 1;
            stats.average_execution_time_ms =
                (stats.average_execution_time_ms * (stats.successful_executions - 1) + elapsed.as_millis() as u64)
                / stats.successful_executions;
        } else {
            stats.failed_executions += 1;
        }
    }
}

#[async_trait]
impl TransactionExecutor for ExecutorManager {
    fn name(&self) -> &str {
        match self.mode {
            ExecutionMode::Standalone => "standalone",
            ExecutionMode::Bundle => "bundle",
            ExecutionMode::All => "all",
        }
    }

    async fn submit(
        &self,
        instructions: Vec<Instruction>,
        fee: PriorityFee,
    ) -> Result<ExecutionResult, ExecutionError> {
        let start_time = Instant::now();

        let mut execution_tasks = Vec::with_capacity(self.backends.len());
        for backend in &self.backends {
            let backend = Arc::clone(backend);
            let instructions = instructions.clone();
            execution_tasks.push(tokio::spawn(async move {
                let name = backend.name().to_string();
                debug!("🔄 Submitting through {}", name);
                backend.submit(instructions, fee).await.map_err(|e| (name, e))
            }));
        }

        let mut attempts = Vec::new();
        let mut last_error = None;

        while !execution_tasks.is_empty() {
            let (result, _index, remaining) = futures::future::select_all(execution_tasks).await;
            execution_tasks = remaining;

            match result {
                Ok(Ok(execution_result)) => {
                    for task in &execution_tasks {
                        task.abort();
                    }
                    self.record(true, start_time.elapsed()).await;
                    return Ok(execution_result);
                }
                Ok(Err((name, e))) => {
                    warn!("❌ Backend {} failed: {}", name, e);
                    attempts.push((name, e.to_string()));
                    last_error = Some(e);
                }
                Err(join_error) => {
                    attempts.push(("task".to_string(), join_error.to_string()));
                }
            }
        }

        self.record(false, start_time.elapsed()).await;
        error!("💥 All backends failed after {}ms", start_time.elapsed().as_millis());

        // a single backend keeps its own error so retry classification survives
        match (attempts.len(), last_error) {
            (1, Some(e)) => Err(e),
            _ => Err(ExecutionError::AllBackendsFailed { attempts }),
        }
    }
}

/// Accepts nothing; every submission fails without touching the network
#[derive(Debug, Default)]
pub struct DryRunExecutor;

#[async_trait]
impl TransactionExecutor for DryRunExecutor {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn submit(
        &self,
        instructions: Vec<Instruction>,
        _fee: PriorityFee,
    ) -> Result<ExecutionResult, ExecutionError> {
        info!("🧪 [dry-run] Skipping submission of {} instructions", instructions.len());
        Err(ExecutionError::InvalidParams("dry run, transaction not submitted".to_string()))
    }
}
