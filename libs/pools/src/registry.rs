//! Pool Registry
//!
//! Deterministic creation and lookup of V1 exchanges, V2 pairs and V3
//! pools, the V3 fee-tier whitelist, and the V2 protocol fee switch.
//!
//! One registry is created at startup and passed explicitly to whoever
//! needs it (the router, seeding flows, tests). Admin-gated calls compare
//! the caller against the admin fixed at construction.

use crate::cell::PoolCell;
use crate::store::{PoolHandle, PoolStore, StoreStats};
use crate::v1::BondingExchange;
use crate::v2::{FeeSwitch, PairMarket};
use crate::v3::ConcentratedPool;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use dex_config::{ExchangeConfig, BPS_DENOMINATOR, FEE_PIPS_DENOMINATOR, MAX_TICK_SPACING};
use parking_lot::RwLock;
use tracing::{info, warn};
use types::{derive_address, Address, DexError, DexResult, PairKey, PoolKey};

pub struct PoolRegistry {
    admin: Address,
    v1_fee_bps: u32,
    v2_fee_bps: u32,
    max_swap_steps: u32,
    store: PoolStore,

    /// token -> V1 exchange
    exchanges: DashMap<Address, Address>,
    /// V1 exchange -> token
    exchange_tokens: DashMap<Address, Address>,
    pairs: DashMap<PairKey, Address>,
    /// Pair addresses in creation order
    all_pairs: RwLock<Vec<Address>>,
    pools: DashMap<PoolKey, Address>,
    /// fee -> tick spacing; entries are never removed or changed
    fee_tiers: DashMap<u32, i32>,
    fee_switch: FeeSwitch,
}

impl PoolRegistry {
    /// Empty registry with the configured fee tiers already enabled
    pub fn new(admin: Address, config: &ExchangeConfig) -> DexResult<Self> {
        if admin.is_zero() {
            return Err(DexError::ZeroAddress);
        }
        if config.fees.v1_fee_bps >= BPS_DENOMINATOR || config.fees.v2_fee_bps >= BPS_DENOMINATOR {
            warn!(
                v1_fee_bps = config.fees.v1_fee_bps,
                v2_fee_bps = config.fees.v2_fee_bps,
                "rejected swap fee"
            );
            return Err(DexError::InvalidInput("swap fee must be below 10000 bps"));
        }
        let registry = Self {
            admin,
            v1_fee_bps: config.fees.v1_fee_bps,
            v2_fee_bps: config.fees.v2_fee_bps,
            max_swap_steps: config.router.max_swap_steps,
            store: PoolStore::new(),
            exchanges: DashMap::new(),
            exchange_tokens: DashMap::new(),
            pairs: DashMap::new(),
            all_pairs: RwLock::new(Vec::new()),
            pools: DashMap::new(),
            fee_tiers: DashMap::new(),
            fee_switch: FeeSwitch::default(),
        };
        for tier in &config.fee_tiers {
            registry.enable_fee_tier(admin, tier.fee, tier.tick_spacing)?;
        }
        info!(
            ?admin,
            fee_tiers = registry.fee_tiers.len(),
            "pool registry created"
        );
        Ok(registry)
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn store(&self) -> &PoolStore {
        &self.store
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    // ---- V1 ----

    /// Create the exchange for `token`
    pub fn create_exchange(&self, token: Address) -> DexResult<Address> {
        if token.is_zero() {
            return Err(DexError::ZeroAddress);
        }
        match self.exchanges.entry(token) {
            Entry::Occupied(entry) => Err(DexError::PoolAlreadyExists(*entry.get())),
            Entry::Vacant(entry) => {
                let address = derive_address(b"v1-exchange", &[token.as_bytes()]);
                self.store
                    .insert_exchange(BondingExchange::new(address, token, self.v1_fee_bps));
                self.exchange_tokens.insert(address, token);
                entry.insert(address);
                info!(?token, exchange = ?address, "V1 exchange created");
                Ok(address)
            }
        }
    }

    /// Existing exchange for `token`, creating it on first use
    pub fn get_or_create_exchange(&self, token: Address) -> DexResult<Address> {
        match self.create_exchange(token) {
            Err(DexError::PoolAlreadyExists(address)) => Ok(address),
            other => other,
        }
    }

    pub fn get_exchange(&self, token: Address) -> Option<Address> {
        self.exchanges.get(&token).map(|entry| *entry.value())
    }

    pub fn token_for_exchange(&self, exchange: Address) -> Option<Address> {
        self.exchange_tokens.get(&exchange).map(|entry| *entry.value())
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.len()
    }

    pub fn exchange_cell(&self, token: Address) -> Option<PoolCell<BondingExchange>> {
        self.get_exchange(token)
            .and_then(|address| self.store.exchange(&address))
    }

    // ---- V2 ----

    pub fn create_pair(&self, token_a: Address, token_b: Address) -> DexResult<Address> {
        let key = PairKey::new(token_a, token_b)?;
        match self.pairs.entry(key) {
            Entry::Occupied(entry) => Err(DexError::PoolAlreadyExists(*entry.get())),
            Entry::Vacant(entry) => {
                let address = derive_address(
                    b"v2-pair",
                    &[key.token0.as_bytes(), key.token1.as_bytes()],
                );
                self.store.insert_pair(PairMarket::new(
                    address,
                    key,
                    self.v2_fee_bps,
                    self.fee_switch.clone(),
                ));
                self.all_pairs.write().push(address);
                entry.insert(address);
                info!(token0 = ?key.token0, token1 = ?key.token1, pair = ?address, "V2 pair created");
                Ok(address)
            }
        }
    }

    pub fn get_or_create_pair(&self, token_a: Address, token_b: Address) -> DexResult<Address> {
        match self.create_pair(token_a, token_b) {
            Err(DexError::PoolAlreadyExists(address)) => Ok(address),
            other => other,
        }
    }

    /// Pair of two tokens in either order
    pub fn get_pair(&self, token_a: Address, token_b: Address) -> Option<Address> {
        let key = PairKey::new(token_a, token_b).ok()?;
        self.pairs.get(&key).map(|entry| *entry.value())
    }

    pub fn all_pairs(&self) -> Vec<Address> {
        self.all_pairs.read().clone()
    }

    pub fn pair_cell(&self, token_a: Address, token_b: Address) -> Option<PoolCell<PairMarket>> {
        self.get_pair(token_a, token_b)
            .and_then(|address| self.store.pair(&address))
    }

    /// Route a share of V2 swap fees to `fee_to`, or switch it off with `None`
    pub fn set_fee_to(&self, caller: Address, fee_to: Option<Address>) -> DexResult<()> {
        self.ensure_admin(caller)?;
        self.fee_switch.set(fee_to);
        info!(?fee_to, "V2 protocol fee recipient updated");
        Ok(())
    }

    pub fn fee_to(&self) -> Option<Address> {
        self.fee_switch.fee_to()
    }

    // ---- V3 ----

    pub fn create_pool(&self, token_a: Address, token_b: Address, fee: u32) -> DexResult<Address> {
        let key = PoolKey::new(token_a, token_b, fee)?;
        let tick_spacing = self
            .fee_tiers
            .get(&fee)
            .map(|entry| *entry.value())
            .ok_or(DexError::InvalidFeeTier(fee))?;
        match self.pools.entry(key) {
            Entry::Occupied(entry) => Err(DexError::PoolAlreadyExists(*entry.get())),
            Entry::Vacant(entry) => {
                let address = derive_address(
                    b"v3-pool",
                    &[key.token0.as_bytes(), key.token1.as_bytes(), &fee.to_be_bytes()],
                );
                self.store.insert_pool(ConcentratedPool::new(
                    address,
                    key,
                    tick_spacing,
                    self.max_swap_steps,
                ));
                entry.insert(address);
                info!(
                    token0 = ?key.token0,
                    token1 = ?key.token1,
                    fee,
                    tick_spacing,
                    pool = ?address,
                    "V3 pool created"
                );
                Ok(address)
            }
        }
    }

    pub fn get_or_create_pool(&self, token_a: Address, token_b: Address, fee: u32) -> DexResult<Address> {
        match self.create_pool(token_a, token_b, fee) {
            Err(DexError::PoolAlreadyExists(address)) => Ok(address),
            other => other,
        }
    }

    pub fn get_pool(&self, token_a: Address, token_b: Address, fee: u32) -> Option<Address> {
        let key = PoolKey::new(token_a, token_b, fee).ok()?;
        self.pools.get(&key).map(|entry| *entry.value())
    }

    pub fn pool_cell(&self, token_a: Address, token_b: Address, fee: u32) -> Option<PoolCell<ConcentratedPool>> {
        self.get_pool(token_a, token_b, fee)
            .and_then(|address| self.store.pool(&address))
    }

    /// Whitelist a new V3 fee tier; tiers can never be changed or removed
    pub fn enable_fee_tier(&self, caller: Address, fee: u32, tick_spacing: i32) -> DexResult<()> {
        self.ensure_admin(caller)?;
        if fee >= FEE_PIPS_DENOMINATOR {
            return Err(DexError::InvalidFeeTier(fee));
        }
        if tick_spacing <= 0 || tick_spacing >= MAX_TICK_SPACING {
            return Err(DexError::InvalidTickSpacing(tick_spacing));
        }
        match self.fee_tiers.entry(fee) {
            Entry::Occupied(_) => Err(DexError::AlreadyEnabled(fee)),
            Entry::Vacant(entry) => {
                entry.insert(tick_spacing);
                info!(fee, tick_spacing, "V3 fee tier enabled");
                Ok(())
            }
        }
    }

    pub fn tick_spacing(&self, fee: u32) -> Option<i32> {
        self.fee_tiers.get(&fee).map(|entry| *entry.value())
    }

    /// Enabled `(fee, tick_spacing)` tiers, lowest fee first
    pub fn fee_tiers(&self) -> Vec<(u32, i32)> {
        let mut tiers: Vec<(u32, i32)> = self
            .fee_tiers
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        tiers.sort_unstable();
        tiers
    }

    // ---- any version ----

    pub fn handle(&self, address: &Address) -> Option<PoolHandle> {
        self.store.handle(address)
    }

    fn ensure_admin(&self, caller: Address) -> DexResult<()> {
        if caller != self.admin {
            warn!(?caller, "rejected admin-only call");
            return Err(DexError::Unauthorized(caller));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (PoolRegistry, Address) {
        let admin = Address::from_low_u64_be(0xad);
        (PoolRegistry::new(admin, &ExchangeConfig::default()).unwrap(), admin)
    }

    fn tokens() -> (Address, Address) {
        (Address::from_low_u64_be(0xa), Address::from_low_u64_be(0xb))
    }

    #[test]
    fn test_default_fee_tiers_enabled() {
        let (registry, _) = registry();
        assert_eq!(registry.fee_tiers(), vec![(500, 10), (3000, 60), (10000, 200)]);
    }

    #[test]
    fn test_swap_fee_must_leave_something_to_trade() {
        let admin = Address::from_low_u64_be(0xad);
        let mut config = ExchangeConfig::default();
        config.fees.v2_fee_bps = BPS_DENOMINATOR;
        assert!(matches!(PoolRegistry::new(admin, &config), Err(DexError::InvalidInput(_))));

        let mut config = ExchangeConfig::default();
        config.fees.v1_fee_bps = u32::MAX;
        assert!(matches!(PoolRegistry::new(admin, &config), Err(DexError::InvalidInput(_))));

        config.fees.v1_fee_bps = BPS_DENOMINATOR - 1;
        assert!(PoolRegistry::new(admin, &config).is_ok());
    }

    #[test]
    fn test_exchange_lifecycle() {
        let (registry, _) = registry();
        let (token, _) = tokens();
        let exchange = registry.create_exchange(token).unwrap();
        assert_eq!(registry.get_exchange(token), Some(exchange));
        assert_eq!(registry.token_for_exchange(exchange), Some(token));
        assert_eq!(registry.create_exchange(token), Err(DexError::PoolAlreadyExists(exchange)));
        assert_eq!(registry.get_or_create_exchange(token), Ok(exchange));
        assert_eq!(registry.exchange_count(), 1);
        assert_eq!(registry.create_exchange(Address::zero()), Err(DexError::ZeroAddress));
    }

    #[test]
    fn test_pair_is_order_independent() {
        let (registry, _) = registry();
        let (a, b) = tokens();
        let pair = registry.create_pair(b, a).unwrap();
        assert_eq!(registry.get_pair(a, b), Some(pair));
        assert_eq!(registry.get_pair(b, a), Some(pair));
        assert_eq!(registry.create_pair(a, b), Err(DexError::PoolAlreadyExists(pair)));
        assert_eq!(registry.all_pairs(), vec![pair]);
        assert_eq!(registry.create_pair(a, a), Err(DexError::IdenticalAddresses));
        assert_eq!(registry.create_pair(a, Address::zero()), Err(DexError::ZeroAddress));
    }

    #[test]
    fn test_pool_requires_enabled_tier() {
        let (registry, admin) = registry();
        let (a, b) = tokens();
        assert_eq!(registry.create_pool(a, b, 2500), Err(DexError::InvalidFeeTier(2500)));

        registry.enable_fee_tier(admin, 2500, 50).unwrap();
        let pool = registry.create_pool(a, b, 2500).unwrap();
        assert_eq!(registry.create_pool(a, b, 2500), Err(DexError::PoolAlreadyExists(pool)));
        assert_eq!(registry.get_pool(b, a, 2500), Some(pool));
        assert_eq!(registry.pool_cell(a, b, 2500).unwrap().read().tick_spacing(), 50);

        // same pair, different tier: a distinct pool at a distinct address
        let other = registry.create_pool(a, b, 3000).unwrap();
        assert_ne!(other, pool);
    }

    #[test]
    fn test_admin_gating() {
        let (registry, admin) = registry();
        let stranger = Address::from_low_u64_be(0x5);
        assert_eq!(registry.enable_fee_tier(stranger, 100, 1), Err(DexError::Unauthorized(stranger)));
        assert_eq!(registry.enable_fee_tier(admin, 500, 10), Err(DexError::AlreadyEnabled(500)));
        assert_eq!(registry.enable_fee_tier(admin, 1_000_000, 10), Err(DexError::InvalidFeeTier(1_000_000)));
        assert_eq!(registry.enable_fee_tier(admin, 100, 0), Err(DexError::InvalidTickSpacing(0)));
        assert_eq!(registry.enable_fee_tier(admin, 100, 16_384), Err(DexError::InvalidTickSpacing(16_384)));

        assert_eq!(registry.set_fee_to(stranger, Some(stranger)), Err(DexError::Unauthorized(stranger)));
        registry.set_fee_to(admin, Some(admin)).unwrap();
        assert_eq!(registry.fee_to(), Some(admin));
    }

    #[test]
    fn test_addresses_are_deterministic() {
        let (first, _) = registry();
        let (second, _) = registry();
        let (a, b) = tokens();
        assert_eq!(first.create_pair(a, b).unwrap(), second.create_pair(b, a).unwrap());
        assert_eq!(first.create_pool(a, b, 500).unwrap(), second.create_pool(a, b, 500).unwrap());
        assert_ne!(first.get_pair(a, b), first.get_pool(a, b, 500));
    }
}
