use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, info, warn};
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;
use tokio::time::Instant;

use crate::processors::account_decoder::{MarketRecord, PoolCandidate};

/// A pool and the market listing its base mint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPool {
    pub pool: PoolCandidate,
    pub market: MarketRecord,
}

impl MatchedPool {
    pub fn base_mint(&self) -> Pubkey {
        self.pool.base_mint()
    }
}

#[derive(Debug, Clone)]
enum JoinState {
    /// First pool seen for the mint, plus every distinct market listing it
    Pending {
        pool: Option<PoolCandidate>,
        markets: Vec<MarketRecord>,
    },
    /// Kept so later re-deliveries stay no-ops
    Matched,
}

#[derive(Debug)]
struct JoinEntry {
    state: JoinState,
    inserted_at: Instant,
}

impl JoinEntry {
    fn new(pool: Option<PoolCandidate>, markets: Vec<MarketRecord>) -> Self {
        Self {
            state: JoinState::Pending { pool, markets },
            inserted_at: Instant::now(),
        }
    }
}

/// Joins the market stream and the pool stream by base mint.
///
/// A pair only forms with the market the pool itself references
/// (`pool.state.market_id`); other markets listing the same mint are held but
/// never paired. Each entry becomes `Matched` exactly once; the offer that
/// completes a pair gets the `MatchedPool` back, every other offer gets `None`.
/// An existing record is never overwritten.
#[derive(Debug, Default)]
pub struct PoolCorrelator {
    entries: DashMap<Pubkey, JoinEntry>,
}

impl PoolCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offer_market(&self, market: MarketRecord) -> Option<MatchedPool> {
        let mut slot = match self.entries.entry(market.base_mint) {
            Entry::Vacant(slot) => {
                debug!("🏪 Market {} waiting for pool of {}", market.id, market.base_mint);
                slot.insert(JoinEntry::new(None, vec![market]));
                return None;
            }
            Entry::Occupied(slot) => slot,
        };

        let JoinState::Pending { pool, markets } = &mut slot.get_mut().state else {
            return None;
        };

        match pool {
            Some(pool) if pool.state.market_id == market.id => {
                let pool = pool.clone();
                slot.get_mut().state = JoinState::Matched;
                info!("🔗 Matched pool {} with market {} for {}", pool.id, market.id, market.base_mint);
                Some(MatchedPool { pool, market })
            }
            pool => {
                if let Some(pool) = pool {
                    warn!(
                        "⚠️ Market {} lists {} but pool {} trades on market {}",
                        market.id, market.base_mint, pool.id, pool.state.market_id
                    );
                }
                if !markets.iter().any(|known| known.id == market.id) {
                    markets.push(market);
                }
                None
            }
        }
    }

    pub fn offer_pool(&self, pool: PoolCandidate) -> Option<MatchedPool> {
        let mut slot = match self.entries.entry(pool.base_mint()) {
            Entry::Vacant(slot) => {
                debug!("🏊 Pool {} waiting for market {}", pool.id, pool.state.market_id);
                slot.insert(JoinEntry::new(Some(pool), Vec::new()));
                return None;
            }
            Entry::Occupied(slot) => slot,
        };

        let JoinState::Pending { pool: waiting, markets } = &mut slot.get_mut().state else {
            return None;
        };
        if waiting.is_some() {
            return None;
        }

        match markets.iter().find(|market| market.id == pool.state.market_id).cloned() {
            Some(market) => {
                slot.get_mut().state = JoinState::Matched;
                info!("🔗 Matched pool {} with market {} for {}", pool.id, market.id, pool.base_mint());
                Some(MatchedPool { pool, market })
            }
            None => {
                warn!(
                    "⚠️ Pool {} trades on market {}, not on any of the {} market(s) seen for {}",
                    pool.id,
                    pool.state.market_id,
                    markets.len(),
                    pool.base_mint()
                );
                *waiting = Some(pool);
                None
            }
        }
    }

    /// Drops unpaired entries older than `ttl`; matched entries are kept
    pub fn evict_stale(&self, ttl: Duration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            matches!(entry.state, JoinState::Matched) || entry.inserted_at.elapsed() < ttl
        });
        before - self.entries.len()
    }

    /// Entries still waiting for their other half
    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| !matches!(entry.state, JoinState::Matched))
            .count()
    }

    pub fn is_matched(&self, mint: &Pubkey) -> bool {
        self.entries
            .get(mint)
            .map(|entry| matches!(entry.state, JoinState::Matched))
            .unwrap_or(false)
    }
}
