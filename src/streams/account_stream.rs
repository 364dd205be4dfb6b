use anyhow::Result;
use backoff::future::retry;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use futures_util::SinkExt;
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex, RwLock};
use tonic::transport::ClientTlsConfig;
use yellowstone_grpc_client::GeyserGrpcClient;
use yellowstone_grpc_proto::geyser::{
    subscribe_request_filter_accounts_filter::Filter,
    subscribe_request_filter_accounts_filter_memcmp::Data,
    SubscribeRequest, SubscribeRequestFilterAccounts, SubscribeRequestFilterAccountsFilter,
    SubscribeRequestFilterAccountsFilterMemcmp, SubscribeRequestPing,
};
use yellowstone_grpc_proto::prelude::{subscribe_update::UpdateOneof, CommitmentLevel};

use crate::config::StreamConfig;
use crate::constant::accounts::{OPENBOOK, RAYDIUM_AMM_V4, TOKEN_PROGRAM};
use crate::constant::{liquidity_v4, market_v3, token_account};
use crate::processors::dispatcher::{AccountKind, AccountUpdate};

#[derive(Debug, Clone, Default)]
pub struct StreamMetrics {
    pub updates_received: u64,
    pub updates_dropped: u64,
    pub connection_errors: u64,
    pub reconnection_attempts: u64,
    pub last_connection_time: Option<Instant>,
}

/// What the three account subscriptions match on
#[derive(Debug, Clone, Copy)]
pub struct AccountFilterSpec {
    pub quote_mint: Pubkey,
    pub wallet: Pubkey,
}

/// Yellowstone account subscription for new markets, new pools and the
/// wallet's token accounts
pub struct AccountStream {
    config: StreamConfig,
    filters: AccountFilterSpec,
    metrics: Arc<RwLock<StreamMetrics>>,
    zero_attempts: Arc<Mutex<bool>>,
}

impl AccountStream {
    pub fn new(config: StreamConfig, filters: AccountFilterSpec) -> Self {
        Self {
            config,
            filters,
            metrics: Arc::new(RwLock::new(StreamMetrics::default())),
            zero_attempts: Arc::new(Mutex::new(true)),
        }
    }

    pub async fn get_metrics(&self) -> StreamMetrics {
        self.metrics.read().await.clone()
    }

    /// Streams updates into `tx`, reconnecting with exponential backoff
    pub async fn start_streaming(&self, tx: mpsc::Sender<AccountUpdate>) -> Result<()> {
        info!("🚀 Starting account stream (quote mint {}, wallet {})", self.filters.quote_mint, self.filters.wallet);

        let config = self.config.clone();
        let filters = self.filters;

        retry(reconnect_backoff(), || {
            let config = config.clone();
            let metrics = Arc::clone(&self.metrics);
            let zero_attempts = Arc::clone(&self.zero_attempts);
            let tx = tx.clone();

            async move {
                let mut zero_attempts = zero_attempts.lock().await;
                if *zero_attempts {
                    *zero_attempts = false;
                } else {
                    info!("🔁 Retry to connect to the server");
                }
                drop(zero_attempts);

                let mut client = {
                    {
                        let mut metrics = metrics.write().await;
                        metrics.reconnection_attempts += 1;
                        metrics.last_connection_time = Some(Instant::now());
                    }
                    connect_client(&config).await.map_err(backoff::Error::transient)?
                };
                info!("✅ Connected to gRPC endpoint {}", config.endpoint);

                let request = build_subscribe_request(&config, &filters).map_err(backoff::Error::Permanent)?;

                geyser_subscribe(&mut client, request, metrics, tx)
                    .await
                    .map_err(backoff::Error::transient)?;

                Ok::<(), backoff::Error<anyhow::Error>>(())
            }
        })
        .await
    }
}

/// Reconnect policy for the subscription. Capped between attempts, never
/// exhausted by elapsed time, so a drop after hours of uptime still reconnects.
pub fn reconnect_backoff() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_interval(Duration::from_secs(30))
        .with_max_elapsed_time(None)
        .build()
}

async fn geyser_subscribe(
    client: &mut GeyserGrpcClient<impl yellowstone_grpc_client::Interceptor>,
    request: SubscribeRequest,
    metrics: Arc<RwLock<StreamMetrics>>,
    tx: mpsc::Sender<AccountUpdate>,
) -> Result<()> {
    let (mut subscribe_tx, mut stream) = client.subscribe_with_request(Some(request)).await?;
    info!("✅ Account stream opened");

    while let Some(message) = stream.next().await {
        match message {
            Ok(msg) => match msg.update_oneof {
                Some(UpdateOneof::Account(update)) => {
                    let Some(account) = update.account else {
                        debug!("Account update without account info");
                        continue;
                    };

                    let Some(kind) = msg.filters.iter().find_map(|name| AccountKind::from_filter_name(name)) else {
                        debug!("Account update matched no known filter: {:?}", msg.filters);
                        continue;
                    };

                    let pubkey = match Pubkey::try_from(account.pubkey.as_slice()) {
                        Ok(pubkey) => pubkey,
                        Err(_) => {
                            warn!("⚠️ Malformed account key in update ({} bytes)", account.pubkey.len());
                            continue;
                        }
                    };

                    metrics.write().await.updates_received += 1;

                    let update = AccountUpdate {
                        kind,
                        pubkey,
                        data: account.data,
                        slot: update.slot,
                    };

                    if tx.send(update).await.is_err() {
                        metrics.write().await.updates_dropped += 1;
                        warn!("📭 Update receiver closed, stopping stream");
                        return Ok(());
                    }
                }
                Some(UpdateOneof::Ping(_)) => {
                    if let Err(e) = subscribe_tx
                        .send(SubscribeRequest {
                            ping: Some(SubscribeRequestPing { id: 1 }),
                            ..Default::default()
                        })
                        .await
                    {
                        error!("Failed to send pong: {}", e);
                    }
                }
                Some(UpdateOneof::Pong(_)) => {
                    debug!("Received pong from server");
                }
                None => {
                    error!("Update not found in the message");
                    break;
                }
                _ => {
                    debug!("Received other update type");
                }
            },
            Err(error) => {
                error!("Stream error: {:?}", error);
                metrics.write().await.connection_errors += 1;
                return Err(anyhow::anyhow!("Stream error: {:?}", error));
            }
        }
    }

    warn!("Stream closed by server");
    Err(anyhow::anyhow!("stream closed by server"))
}

async fn connect_client(config: &StreamConfig) -> Result<GeyserGrpcClient<impl yellowstone_grpc_client::Interceptor>> {
    GeyserGrpcClient::build_from_shared(config.endpoint.clone())?
        .x_token(config.x_token.clone())?
        .connect_timeout(Duration::from_secs(config.timeout_seconds))
        .timeout(Duration::from_secs(config.timeout_seconds))
        .tls_config(ClientTlsConfig::new().with_native_roots())?
        .max_decoding_message_size(1024 * 1024 * 1024)
        .connect()
        .await
        .map_err(Into::into)
}

fn memcmp(offset: usize, bytes: Vec<u8>) -> SubscribeRequestFilterAccountsFilter {
    SubscribeRequestFilterAccountsFilter {
        filter: Some(Filter::Memcmp(SubscribeRequestFilterAccountsFilterMemcmp {
            offset: offset as u64,
            data: Some(Data::Bytes(bytes)),
        })),
    }
}

fn datasize(size: usize) -> SubscribeRequestFilterAccountsFilter {
    SubscribeRequestFilterAccountsFilter {
        filter: Some(Filter::Datasize(size as u64)),
    }
}

fn owned_by(owner: &Pubkey, filters: Vec<SubscribeRequestFilterAccountsFilter>) -> SubscribeRequestFilterAccounts {
    SubscribeRequestFilterAccounts {
        account: vec![],
        owner: vec![owner.to_string()],
        filters,
        nonempty_txn_signature: None,
    }
}

/// Market, pool and wallet subscriptions in one request
pub fn build_subscribe_request(config: &StreamConfig, spec: &AccountFilterSpec) -> Result<SubscribeRequest> {
    let mut accounts = HashMap::new();

    accounts.insert(
        AccountKind::Market.filter_name().to_owned(),
        owned_by(&OPENBOOK, vec![
            datasize(market_v3::SIZE),
            memcmp(market_v3::QUOTE_MINT, spec.quote_mint.to_bytes().to_vec()),
        ]),
    );

    accounts.insert(
        AccountKind::Pool.filter_name().to_owned(),
        owned_by(&RAYDIUM_AMM_V4, vec![
            datasize(liquidity_v4::SIZE),
            memcmp(liquidity_v4::QUOTE_MINT, spec.quote_mint.to_bytes().to_vec()),
            memcmp(liquidity_v4::MARKET_PROGRAM_ID, OPENBOOK.to_bytes().to_vec()),
            memcmp(liquidity_v4::STATUS, liquidity_v4::STATUS_ACTIVE.to_le_bytes().to_vec()),
        ]),
    );

    accounts.insert(
        AccountKind::Wallet.filter_name().to_owned(),
        owned_by(&TOKEN_PROGRAM, vec![
            datasize(token_account::SIZE),
            memcmp(token_account::OWNER, spec.wallet.to_bytes().to_vec()),
        ]),
    );

    let commitment = match config.commitment_level.as_str() {
        "processed" => CommitmentLevel::Processed,
        "confirmed" => CommitmentLevel::Confirmed,
        "finalized" => CommitmentLevel::Finalized,
        other => return Err(anyhow::anyhow!("unknown commitment level '{}'", other)),
    };

    Ok(SubscribeRequest {
        accounts,
        slots: HashMap::default(),
        transactions: HashMap::default(),
        transactions_status: HashMap::default(),
        blocks: HashMap::default(),
        blocks_meta: HashMap::default(),
        entry: HashMap::default(),
        commitment: Some(commitment as i32),
        accounts_data_slice: Vec::default(),
        ping: None,
        from_slot: None,
    })
}
