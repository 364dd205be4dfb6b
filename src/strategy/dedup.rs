use dashmap::DashSet;
use solana_sdk::pubkey::Pubkey;
use std::hash::Hash;
use std::sync::RwLock;

/// Process-lifetime "seen" set. No eviction.
#[derive(Debug)]
pub struct DedupRegistry<K: Eq + Hash> {
    name: &'static str,
    seen: DashSet<K>,
}

impl<K: Eq + Hash> DedupRegistry<K> {
    pub fn new(name: &'static str) -> Self {
        Self { name, seen: DashSet::new() }
    }

    /// Records `key` and returns true the first time it is offered, false afterwards
    pub fn mark_seen(&self, key: K) -> bool {
        self.seen.insert(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Forward-only record of mints whose acquisition was already observed on the
/// wallet stream. A mint is reported as new exactly once.
#[derive(Debug, Default)]
pub struct SettledMintMarker {
    history: DashSet<Pubkey>,
    last: RwLock<Option<Pubkey>>,
}

impl SettledMintMarker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to `mint`. False when the mint was already settled (stale re-delivery).
    pub fn advance(&self, mint: Pubkey) -> bool {
        if !self.history.insert(mint) {
            return false;
        }
        if let Ok(mut last) = self.last.write() {
            *last = Some(mint);
        }
        true
    }

    pub fn last(&self) -> Option<Pubkey> {
        self.last.read().ok().and_then(|last| *last)
    }

    pub fn is_settled(&self, mint: &Pubkey) -> bool {
        self.history.contains(mint)
    }
}
