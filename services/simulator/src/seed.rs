//! Market seeding
//!
//! Builds a complete in-memory market from a fixed token plan: one token per
//! symbol with a reference USD price, a V1 exchange and a V2 pair against the
//! wrapped native token for every token, and V3 pools on the fee tier that
//! suits each pair's volatility. Every venue is seeded at the reference
//! price, so the three generations quote the same market at different depths.

use crate::units::{from_base_units, to_base_units};
use crate::{log_pool, log_success, log_token, log_warning};
use amm::{liquidity_math, sqrt_math, FullMath, TickMath, Q96};
use anyhow::{bail, Context, Result};
use dex_config::ExchangeConfig;
use once_cell::sync::Lazy;
use pools::{PayFromBalance, PoolRegistry, StoreStats};
use router::UniversalRouter;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::sync::Arc;
use tokens::{InMemoryLedger, TokenLedger};
use types::{derive_address, sort_tokens, Address, CallContext, ProtocolVersion, U256};

/// Block time every seeding call runs at
pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// Symbol of the wrapped native token
pub const WRAPPED_NATIVE: &str = "WDEX";

/// Reference price of the native coin
pub const NATIVE_USD_PRICE: Decimal = dec!(10000);

/// USD value of each side of a V1 exchange
pub const V1_SIDE_USD: Decimal = dec!(10000);

/// USD value of each side of a V2 pair
pub const V2_SIDE_USD: Decimal = dec!(100000);

/// USD value of each side of a V3 full-range position
pub const V3_SIDE_USD: Decimal = dec!(100000);

/// A token the simulator issues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSpec {
    pub symbol: &'static str,
    pub name: &'static str,
    pub decimals: u8,
    pub usd_price: Decimal,
}

pub static TOKEN_PLAN: Lazy<Vec<TokenSpec>> = Lazy::new(|| {
    vec![
        TokenSpec { symbol: "USDT", name: "Tether USD", decimals: 6, usd_price: dec!(1) },
        TokenSpec { symbol: "USDC", name: "USD Coin", decimals: 6, usd_price: dec!(1) },
        TokenSpec { symbol: "DAI", name: "Dai Stablecoin", decimals: 18, usd_price: dec!(1) },
        TokenSpec { symbol: "BTC", name: "Bitcoin", decimals: 8, usd_price: dec!(45000) },
        TokenSpec { symbol: "ETH", name: "Ether", decimals: 18, usd_price: dec!(2500) },
        TokenSpec { symbol: "SOL", name: "Solana", decimals: 18, usd_price: dec!(100) },
        TokenSpec { symbol: "BNB", name: "BNB", decimals: 18, usd_price: dec!(300) },
    ]
});

/// V3 pools to create: stables at 0.05%, majors at 0.3%, alts at 1%
pub const V3_PLAN: [(&str, &str, u32); 9] = [
    ("USDT", WRAPPED_NATIVE, 500),
    ("USDC", WRAPPED_NATIVE, 500),
    ("DAI", WRAPPED_NATIVE, 500),
    ("USDT", "USDC", 500),
    ("BTC", WRAPPED_NATIVE, 3000),
    ("ETH", WRAPPED_NATIVE, 3000),
    ("BTC", "ETH", 3000),
    ("SOL", WRAPPED_NATIVE, 10000),
    ("BNB", WRAPPED_NATIVE, 10000),
];

/// An issued token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenSummary {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
    pub usd_price: Decimal,
}

/// A seeded venue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VenueSummary {
    pub version: ProtocolVersion,
    pub address: Address,
    pub pair: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<u32>,
    /// Combined value of both deposited sides
    pub seeded_usd: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketSummary {
    pub tokens: Vec<TokenSummary>,
    pub venues: Vec<VenueSummary>,
    pub stats: StoreStats,
}

/// A seeded market and the router over it
pub struct Market {
    pub ledger: InMemoryLedger,
    pub registry: Arc<PoolRegistry>,
    pub router: UniversalRouter,
    pub deployer: Address,
    pub summary: MarketSummary,
}

impl Market {
    /// Address and decimals of a token by symbol
    pub fn token(&self, symbol: &str) -> Result<(Address, u8)> {
        let address = self
            .ledger
            .token_by_symbol(symbol)
            .with_context(|| format!("Unknown token symbol {symbol}"))?;
        let decimals = self
            .ledger
            .metadata(address)
            .map(|meta| meta.decimals)
            .with_context(|| format!("No metadata for {symbol}"))?;
        Ok((address, decimals))
    }

    fn usd_price(&self, symbol: &str) -> Result<Decimal> {
        self.summary
            .tokens
            .iter()
            .find(|token| token.symbol == symbol)
            .map(|token| token.usd_price)
            .with_context(|| format!("No reference price for {symbol}"))
    }

    /// Base units of `symbol` worth `usd` at its reference price
    pub fn amount_for_usd(&self, symbol: &str, usd: Decimal) -> Result<U256> {
        let (_, decimals) = self.token(symbol)?;
        let price = self.usd_price(symbol)?;
        to_base_units(usd / price, decimals)
    }

    /// Human amount of `value` base units of `symbol`
    pub fn display_amount(&self, symbol: &str, value: U256) -> Result<Decimal> {
        let (_, decimals) = self.token(symbol)?;
        from_base_units(value, decimals)
    }
}

/// Issue the token plan and seed every venue
pub fn seed_market(config: &ExchangeConfig) -> Result<Market> {
    let admin = derive_address(b"dex-admin", &[]);
    let deployer = derive_address(b"dex-deployer", &[]);
    let router_address = derive_address(b"dex-router", &[]);

    let registry = Arc::new(PoolRegistry::new(admin, config).context("Failed to create pool registry")?);
    let mut ledger = InMemoryLedger::new();
    let ctx = CallContext::new(deployer, GENESIS_TIMESTAMP);

    let wrapped = ledger
        .create_wrapped_native("Wrapped DEX", WRAPPED_NATIVE)
        .context("Failed to issue the wrapped native token")?;
    ledger.mint_native(deployer, U256::exp10(30))?;
    ledger.wrap_native(deployer, U256::exp10(27))?;

    let mut tokens = vec![TokenSummary {
        symbol: WRAPPED_NATIVE.to_string(),
        address: wrapped,
        decimals: 18,
        usd_price: NATIVE_USD_PRICE,
    }];
    for spec in TOKEN_PLAN.iter() {
        let address = ledger
            .create_token(spec.name, spec.symbol, spec.decimals)
            .with_context(|| format!("Failed to issue {}", spec.symbol))?;
        ledger.mint(address, deployer, U256::exp10(40))?;
        log_token!("{} issued at {:?} ({} decimals)", spec.symbol, address, spec.decimals);
        tokens.push(TokenSummary {
            symbol: spec.symbol.to_string(),
            address,
            decimals: spec.decimals,
            usd_price: spec.usd_price,
        });
    }

    let router = UniversalRouter::new(Arc::clone(&registry), router_address, wrapped, &config.router);
    let mut market = Market {
        ledger,
        registry,
        router,
        deployer,
        summary: MarketSummary {
            tokens,
            venues: Vec::new(),
            stats: StoreStats::default(),
        },
    };

    for spec in TOKEN_PLAN.iter() {
        seed_exchange(&mut market, &ctx, spec.symbol)?;
        seed_pair(&mut market, &ctx, spec.symbol)?;
    }
    for (a, b, fee) in V3_PLAN {
        if market.registry.tick_spacing(fee).is_none() {
            log_warning!("Fee tier {} not enabled, skipping {}/{} pool", fee, a, b);
            continue;
        }
        seed_pool(&mut market, &ctx, a, b, fee)?;
    }

    market.summary.stats = market.registry.stats();
    log_success!(
        "Market seeded: {} exchanges, {} pairs, {} pools",
        market.summary.stats.exchanges,
        market.summary.stats.pairs,
        market.summary.stats.pools
    );
    Ok(market)
}

/// V1 exchange holding the native coin against `symbol`
fn seed_exchange(market: &mut Market, ctx: &CallContext, symbol: &str) -> Result<()> {
    let (token, _) = market.token(symbol)?;
    let native_amount = to_base_units(V1_SIDE_USD / NATIVE_USD_PRICE, 18)?;
    let token_amount = market.amount_for_usd(symbol, V1_SIDE_USD)?;

    let exchange = market
        .registry
        .create_exchange(token)
        .with_context(|| format!("Failed to create V1 exchange for {symbol}"))?;
    let cell = market
        .registry
        .exchange_cell(token)
        .with_context(|| format!("V1 exchange for {symbol} missing after creation"))?;

    market.ledger.approve(token, market.deployer, exchange, U256::MAX)?;
    cell.lock()?
        .add_liquidity(&mut market.ledger, ctx, native_amount, token_amount, U256::one(), ctx.timestamp)
        .with_context(|| format!("Failed to seed V1 exchange for {symbol}"))?;

    log_pool!("V1 {}/native exchange at {:?}", symbol, exchange);
    market.summary.venues.push(VenueSummary {
        version: ProtocolVersion::V1,
        address: exchange,
        pair: format!("{symbol}/native"),
        fee: None,
        seeded_usd: V1_SIDE_USD * dec!(2),
    });
    Ok(())
}

/// V2 pair of `symbol` against the wrapped native token
fn seed_pair(market: &mut Market, ctx: &CallContext, symbol: &str) -> Result<()> {
    let (token, _) = market.token(symbol)?;
    let (wrapped, _) = market.token(WRAPPED_NATIVE)?;
    let token_amount = market.amount_for_usd(symbol, V2_SIDE_USD)?;
    let wrapped_amount = market.amount_for_usd(WRAPPED_NATIVE, V2_SIDE_USD)?;

    let pair = market
        .registry
        .create_pair(token, wrapped)
        .with_context(|| format!("Failed to create V2 pair for {symbol}"))?;
    let cell = market
        .registry
        .pair_cell(token, wrapped)
        .with_context(|| format!("V2 pair for {symbol} missing after creation"))?;

    let deployer = market.deployer;
    market.ledger.approve(token, deployer, pair, U256::MAX)?;
    market.ledger.approve(wrapped, deployer, pair, U256::MAX)?;

    let mut pair_market = cell.lock()?;
    let (amount0, amount1) = if pair_market.token0() == token {
        (token_amount, wrapped_amount)
    } else {
        (wrapped_amount, token_amount)
    };
    pair_market
        .add_liquidity(
            &mut market.ledger,
            ctx,
            amount0,
            amount1,
            U256::zero(),
            U256::zero(),
            deployer,
            ctx.timestamp,
        )
        .with_context(|| format!("Failed to seed V2 pair for {symbol}"))?;
    drop(pair_market);

    log_pool!("V2 {}/{} pair at {:?}", symbol, WRAPPED_NATIVE, pair);
    market.summary.venues.push(VenueSummary {
        version: ProtocolVersion::V2,
        address: pair,
        pair: format!("{symbol}/{WRAPPED_NATIVE}"),
        fee: None,
        seeded_usd: V2_SIDE_USD * dec!(2),
    });
    Ok(())
}

/// V3 pool at the reference price with one full-range position
fn seed_pool(market: &mut Market, ctx: &CallContext, a: &str, b: &str, fee: u32) -> Result<()> {
    let (token_a, _) = market.token(a)?;
    let (token_b, _) = market.token(b)?;
    let (token0, _) = sort_tokens(token_a, token_b)?;
    let (symbol0, symbol1) = if token0 == token_a { (a, b) } else { (b, a) };
    let amount0 = market.amount_for_usd(symbol0, V3_SIDE_USD)?;
    let amount1 = market.amount_for_usd(symbol1, V3_SIDE_USD)?;
    let sqrt_price = sqrt_price_for_amounts(amount0, amount1)?;

    let pool = market
        .registry
        .create_pool(token_a, token_b, fee)
        .with_context(|| format!("Failed to create V3 pool {a}/{b} at fee {fee}"))?;
    let cell = market
        .registry
        .pool_cell(token_a, token_b, fee)
        .with_context(|| format!("V3 pool {a}/{b} missing after creation"))?;

    let mut concentrated = cell.lock()?;
    let tick = concentrated.initialize(sqrt_price)?;
    let (lower, upper) = TickMath::usable_bounds(concentrated.tick_spacing());
    let liquidity = liquidity_math::liquidity_for_amounts(
        sqrt_price,
        TickMath::get_sqrt_ratio_at_tick(lower)?,
        TickMath::get_sqrt_ratio_at_tick(upper)?,
        amount0,
        amount1,
    )?;
    if liquidity == 0 {
        bail!("Plan amounts for {a}/{b} buy no liquidity");
    }
    let deployer = market.deployer;
    concentrated
        .mint(
            &mut market.ledger,
            ctx,
            deployer,
            lower,
            upper,
            liquidity,
            &mut PayFromBalance { payer: deployer },
        )
        .with_context(|| format!("Failed to seed V3 pool {a}/{b} at fee {fee}"))?;
    drop(concentrated);

    log_pool!("V3 {}/{} pool at {:?} (fee {}, tick {}, liquidity {})", symbol0, symbol1, pool, fee, tick, liquidity);
    market.summary.venues.push(VenueSummary {
        version: ProtocolVersion::V3,
        address: pool,
        pair: format!("{symbol0}/{symbol1}"),
        fee: Some(fee),
        seeded_usd: V3_SIDE_USD * dec!(2),
    });
    Ok(())
}

/// `sqrt(amount1 / amount0)` as Q64.96, the price at which both amounts are equal value
pub fn sqrt_price_for_amounts(amount0: U256, amount1: U256) -> Result<U256> {
    if amount0.is_zero() || amount1.is_zero() {
        bail!("Cannot price an empty side");
    }
    let ratio_x192 = FullMath::mul_div(amount1, Q96 * Q96, amount0).context("Price ratio overflows Q64.192")?;
    Ok(sqrt_math::sqrt_floor(ratio_x192))
}
