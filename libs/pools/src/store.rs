//! Pool Store
//!
//! Owns the state of every exchange, pair and pool, indexed by the pool's
//! full address, plus a token index used for discovery. Lookups hand out
//! [`PoolCell`] clones; the store itself is never locked for the duration
//! of a pool operation.

use crate::cell::PoolCell;
use crate::v1::BondingExchange;
use crate::v2::PairMarket;
use crate::v3::ConcentratedPool;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::{Address, DexResult, ProtocolVersion};

/// Handle to a pool of any generation
#[derive(Debug, Clone)]
pub enum PoolHandle {
    V1(PoolCell<BondingExchange>),
    V2(PoolCell<PairMarket>),
    V3(PoolCell<ConcentratedPool>),
}

/// Committed state of one pool, taken before a multi-pool operation
#[derive(Debug, Clone)]
pub enum PoolSnapshot {
    V1(BondingExchange),
    V2(PairMarket),
    V3(ConcentratedPool),
}

impl PoolHandle {
    pub fn address(&self) -> Address {
        match self {
            PoolHandle::V1(cell) => cell.address(),
            PoolHandle::V2(cell) => cell.address(),
            PoolHandle::V3(cell) => cell.address(),
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        match self {
            PoolHandle::V1(_) => ProtocolVersion::V1,
            PoolHandle::V2(_) => ProtocolVersion::V2,
            PoolHandle::V3(_) => ProtocolVersion::V3,
        }
    }

    pub fn snapshot(&self) -> DexResult<PoolSnapshot> {
        Ok(match self {
            PoolHandle::V1(cell) => PoolSnapshot::V1(cell.snapshot()?),
            PoolHandle::V2(cell) => PoolSnapshot::V2(cell.snapshot()?),
            PoolHandle::V3(cell) => PoolSnapshot::V3(cell.snapshot()?),
        })
    }

    /// Put back a snapshot taken from this same handle
    pub fn restore(&self, snapshot: PoolSnapshot) -> DexResult<()> {
        match (self, snapshot) {
            (PoolHandle::V1(cell), PoolSnapshot::V1(state)) => cell.restore(state),
            (PoolHandle::V2(cell), PoolSnapshot::V2(state)) => cell.restore(state),
            (PoolHandle::V3(cell), PoolSnapshot::V3(state)) => cell.restore(state),
            _ => Err(types::DexError::InvalidInput("snapshot of a different pool generation")),
        }
    }
}

/// Store statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub exchanges: usize,
    pub pairs: usize,
    pub pools: usize,
    pub indexed_tokens: usize,
}

#[derive(Debug, Default)]
pub struct PoolStore {
    exchanges: DashMap<Address, PoolCell<BondingExchange>>,
    pairs: DashMap<Address, PoolCell<PairMarket>>,
    pools: DashMap<Address, PoolCell<ConcentratedPool>>,
    /// Token address -> addresses of every venue trading it
    token_index: DashMap<Address, Vec<Address>>,
}

impl PoolStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_exchange(&self, exchange: BondingExchange) -> PoolCell<BondingExchange> {
        let address = exchange.address();
        self.index(address, &[exchange.token()]);
        let cell = PoolCell::new(address, exchange);
        self.exchanges.insert(address, cell.clone());
        cell
    }

    pub fn insert_pair(&self, pair: PairMarket) -> PoolCell<PairMarket> {
        let address = pair.address();
        self.index(address, &[pair.token0(), pair.token1()]);
        let cell = PoolCell::new(address, pair);
        self.pairs.insert(address, cell.clone());
        cell
    }

    pub fn insert_pool(&self, pool: ConcentratedPool) -> PoolCell<ConcentratedPool> {
        let address = pool.address();
        self.index(address, &[pool.token0(), pool.token1()]);
        let cell = PoolCell::new(address, pool);
        self.pools.insert(address, cell.clone());
        cell
    }

    pub fn exchange(&self, address: &Address) -> Option<PoolCell<BondingExchange>> {
        self.exchanges.get(address).map(|entry| entry.value().clone())
    }

    pub fn pair(&self, address: &Address) -> Option<PoolCell<PairMarket>> {
        self.pairs.get(address).map(|entry| entry.value().clone())
    }

    pub fn pool(&self, address: &Address) -> Option<PoolCell<ConcentratedPool>> {
        self.pools.get(address).map(|entry| entry.value().clone())
    }

    /// Any pool at `address`, whatever its generation
    pub fn handle(&self, address: &Address) -> Option<PoolHandle> {
        self.exchange(address)
            .map(PoolHandle::V1)
            .or_else(|| self.pair(address).map(PoolHandle::V2))
            .or_else(|| self.pool(address).map(PoolHandle::V3))
    }

    /// Addresses of every venue trading `token`
    pub fn venues_with_token(&self, token: &Address) -> Vec<Address> {
        self.token_index
            .get(token)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            exchanges: self.exchanges.len(),
            pairs: self.pairs.len(),
            pools: self.pools.len(),
            indexed_tokens: self.token_index.len(),
        }
    }

    fn index(&self, venue: Address, tokens: &[Address]) {
        for token in tokens {
            let mut venues = self.token_index.entry(*token).or_default();
            if !venues.contains(&venue) {
                venues.push(venue);
            }
        }
        debug!(?venue, tokens = tokens.len(), "venue indexed");
    }
}
