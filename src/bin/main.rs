use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use pool_sniper::{
    config::ConfigManager,
    executor::{BlockhashCache, DryRunExecutor, ExecutorManager, PriorityFee, SwapInstructionBuilder, TransactionExecutor},
    processors::EventDispatcher,
    streams::{AccountFilterSpec, AccountStream},
    strategy::{
        AllowList, BalancePoller, ExitSettings, FilterPipeline, ImmutableMetadataCheck, LifecycleOrchestrator,
        LpBurnedCheck, ManualOverride, MintRenouncedCheck, OrchestratorParts, OrchestratorSettings,
        PipelineSettings, PoolPriceOracle, PositionGate, RetryPolicy, SafetyChecks, SocialPresenceCheck,
        SwapDisposer,
    },
    utils::{ChainReader, EventLogger, SolanaRpcClient},
    StreamConfig,
};
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::signer::Signer;

const UPDATE_CHANNEL_CAPACITY: usize = 10_000;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Print the config summary and exit
    #[arg(long)]
    show_config: bool,

    /// Write a default config file and exit
    #[arg(long)]
    generate_config: bool,

    /// Validate the config file and exit
    #[arg(long)]
    validate_config: bool,

    /// Stream and filter pools without submitting transactions
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    if dotenvy::dotenv().is_err() {
        eprintln!("Warning: Could not load .env file");
    }

    let args = Args::parse();

    if args.generate_config {
        env_logger::init();
        ConfigManager::generate_default_config_file(&args.config)?;
        info!("Default config written to {}", args.config);
        return Ok(());
    }

    let config_manager = match ConfigManager::load_from_file(&args.config) {
        Ok(manager) => manager,
        Err(e) => {
            env_logger::init();
            error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config_manager.app_config.logging.level.as_str()),
    )
    .init();

    if args.validate_config {
        info!("Config file is valid");
        info!("{}", config_manager.get_config_summary());
        return Ok(());
    }

    if args.show_config {
        println!("{}", config_manager.get_config_summary());
        return Ok(());
    }

    run(&config_manager, args.dry_run).await
}

async fn run(config_manager: &ConfigManager, dry_run: bool) -> Result<()> {
    let app_config = &config_manager.app_config;
    let quote = config_manager.quote_token()?;
    let wallet = Arc::new(config_manager.get_wallet_keypair()?.insecure_clone());
    let rpc_endpoint = config_manager.rpc_endpoint();
    let network_timeout = Duration::from_millis(app_config.general.network_timeout_ms);

    info!("👛 Wallet {}", wallet.pubkey());
    info!("💱 Quote {} ({}), {} per buy", quote.symbol, quote.mint, app_config.quote.amount);

    let blockhash_cache = {
        let mut cache = BlockhashCache::new(
            rpc_endpoint.clone(),
            Duration::from_millis(app_config.blockhash_cache.update_interval_ms),
            Duration::from_secs(app_config.blockhash_cache.max_age_seconds),
        );
        if !dry_run {
            if let Err(e) = cache.start() {
                warn!("⚠️ Blockhash cache failed to start: {}, fetching on demand", e);
            }
        }
        Arc::new(cache)
    };

    let executor: Arc<dyn TransactionExecutor> = if dry_run {
        info!("🧪 Dry run: transactions will not be submitted");
        Arc::new(DryRunExecutor)
    } else {
        let manager = ExecutorManager::from_config(
            &app_config.executor,
            rpc_endpoint.clone(),
            wallet.clone(),
            blockhash_cache.clone(),
        )?;
        info!("🚀 Executor mode {:?}, backends: {}", manager.mode(), manager.backend_names().join(", "));
        Arc::new(manager)
    };

    let rpc = SolanaRpcClient::new(rpc_endpoint, app_config.general.commitment.clone(), network_timeout)?;
    match rpc.get_sol_balance(&wallet.pubkey()).await {
        Ok(lamports) => info!("💰 Wallet balance {:.4} SOL", lamports as f64 / LAMPORTS_PER_SOL as f64),
        Err(e) => warn!("⚠️ Could not read wallet balance: {}", e),
    }
    let reader: Arc<dyn ChainReader> = Arc::new(rpc);

    let gate = Arc::new(PositionGate::new(
        app_config.trading.one_token_at_a_time,
        app_config.trading.max_positions,
    ));

    let allow_list = if app_config.filters.use_allow_list {
        let list = Arc::new(AllowList::load_from_file(&app_config.filters.allow_list_path).await?);
        info!("📋 Allow list loaded with {} mint(s)", list.len().await);
        if app_config.filters.allow_list_refresh_seconds > 0 {
            list.spawn_refresh(Duration::from_secs(app_config.filters.allow_list_refresh_seconds));
        }
        Some(list)
    } else {
        None
    };

    let checks = SafetyChecks {
        mint_renounced: Arc::new(MintRenouncedCheck::new(reader.clone())),
        socials: Arc::new(SocialPresenceCheck::new(reader.clone(), network_timeout)?),
        mutable: Arc::new(ImmutableMetadataCheck::new(reader.clone())),
        burned: Arc::new(LpBurnedCheck::new(reader.clone())),
    };
    let pipeline_settings = PipelineSettings::from_config(quote, &app_config.quote, &app_config.filters);
    let pipeline = FilterPipeline::from_settings(&pipeline_settings, checks, allow_list, gate.clone());
    info!("🔎 Filters: {}", pipeline.filter_names().join(" → "));

    let fee = PriorityFee {
        compute_unit_limit: app_config.executor.compute_unit_limit,
        compute_unit_price_micro_lamports: app_config.executor.compute_unit_price_micro_lamports,
        tip_lamports: app_config.executor.jito.tip_lamports,
    };
    let builder = SwapInstructionBuilder::new(wallet.pubkey(), quote);
    let poller = BalancePoller::new(
        reader.clone(),
        RetryPolicy::new(
            app_config.trading.balance_poll_attempts,
            Duration::from_millis(app_config.trading.balance_poll_interval_ms),
            Duration::from_millis(app_config.trading.balance_error_backoff_ms),
        ),
    );

    let settings = OrchestratorSettings {
        quote,
        quote_amount: quote.to_raw(app_config.quote.amount),
        skip_existing_pools: app_config.filters.skip_existing_pools,
        started_at: chrono::Utc::now().timestamp().max(0) as u64,
        fee,
    };
    let parts = OrchestratorParts {
        builder: builder.clone(),
        pipeline,
        gate,
        reader: reader.clone(),
        executor: executor.clone(),
        oracle: Arc::new(PoolPriceOracle::new(reader.clone())),
        disposer: Arc::new(SwapDisposer::new(builder, executor, fee)),
        poller,
        exit_settings: ExitSettings::from_config(&app_config.trading),
    };

    let manual = Arc::new(ManualOverride::new());
    manual.spawn_stdin_listener();

    let mut orchestrator = LifecycleOrchestrator::new(settings, parts).with_manual_override(manual);
    if let Some(events_file) = &app_config.reporting.events_file {
        let events = EventLogger::new(Some(events_file.clone()));
        info!("📝 Lifecycle reports written to {}", events.path());
        orchestrator = orchestrator.with_event_logger(events);
    }
    let orchestrator = Arc::new(orchestrator);
    orchestrator.spawn_correlator_sweeper(Duration::from_secs(app_config.trading.unpaired_ttl_seconds));

    let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
    let dispatcher = tokio::spawn(EventDispatcher::new(rx, orchestrator).run());

    let stream_config = StreamConfig::new(app_config.grpc.endpoint.clone(), config_manager.grpc_x_token.clone())
        .with_timeout(app_config.grpc.timeout_seconds)
        .with_commitment(app_config.general.commitment.clone());
    let stream = AccountStream::new(
        stream_config,
        AccountFilterSpec {
            quote_mint: quote.mint,
            wallet: wallet.pubkey(),
        },
    );

    let result = tokio::select! {
        result = stream.start_streaming(tx) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("🛑 Ctrl-C received, shutting down");
            Ok(())
        }
    };

    if let Err(e) = &result {
        error!("❌ Account stream stopped: {}", e);
    }

    dispatcher.abort();
    let metrics = stream.get_metrics().await;
    info!("📊 Stream metrics: {:?}", metrics);

    if let Ok(mut cache) = Arc::try_unwrap(blockhash_cache) {
        cache.stop().await;
    } else {
        info!("Blockhash cache still shared with executors, it stops when dropped");
    }

    result
}
