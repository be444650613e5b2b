//! Router quoting and execution against a seeded three-generation market

use amm::{TickMath, Q96};
use dex_config::{ExchangeConfig, RouterConfig};
use pools::{PayFromBalance, PoolRegistry};
use router::{ExactInput, ExactInputPath, UniversalRouter, Venue};
use std::sync::Arc;
use tokens::{InMemoryLedger, TokenLedger};
use types::{Address, CallContext, DexError, ProtocolVersion, U256};

const NOW: u64 = 1_700_000_000;

fn e18(n: u64) -> U256 {
    U256::from(n) * U256::exp10(18)
}

fn admin() -> Address {
    Address::from_low_u64_be(0xad)
}

fn lp() -> Address {
    Address::from_low_u64_be(0x1)
}

fn trader() -> Address {
    Address::from_low_u64_be(0x2)
}

struct Market {
    ledger: InMemoryLedger,
    registry: Arc<PoolRegistry>,
    router: UniversalRouter,
    wdex: Address,
    usdc: Address,
    eth: Address,
    dai: Address,
}

impl Market {
    fn new() -> Self {
        let registry = Arc::new(PoolRegistry::new(admin(), &ExchangeConfig::default()).unwrap());
        let mut ledger = InMemoryLedger::new();
        let wdex = ledger.create_wrapped_native("Wrapped DEX", "WDEX").unwrap();
        let usdc = ledger.create_token("USD Coin", "USDC", 18).unwrap();
        let eth = ledger.create_token("Ether", "ETH", 18).unwrap();
        let dai = ledger.create_token("Dai", "DAI", 18).unwrap();
        for owner in [lp(), trader()] {
            ledger.mint_native(owner, e18(10_000_000)).unwrap();
            ledger.wrap_native(owner, e18(1_000_000)).unwrap();
            for token in [usdc, eth, dai] {
                ledger.mint(token, owner, e18(10_000_000)).unwrap();
            }
        }
        let router = UniversalRouter::new(
            registry.clone(),
            Address::from_low_u64_be(0x70),
            wdex,
            &RouterConfig::default(),
        );
        for token in [wdex, usdc, eth, dai] {
            ledger.approve(token, trader(), router.address(), U256::MAX).unwrap();
        }
        Self {
            ledger,
            registry,
            router,
            wdex,
            usdc,
            eth,
            dai,
        }
    }

    fn ctx(&self) -> CallContext {
        CallContext::new(trader(), NOW)
    }

    fn seed_v1(&mut self, token: Address, native: U256, tokens: U256) {
        let exchange = self.registry.create_exchange(token).unwrap();
        self.ledger.approve(token, lp(), exchange, U256::MAX).unwrap();
        self.registry
            .exchange_cell(token)
            .unwrap()
            .lock()
            .unwrap()
            .add_liquidity(&mut self.ledger, &CallContext::new(lp(), NOW), native, tokens, U256::one(), NOW)
            .unwrap();
    }

    fn seed_v2(&mut self, a: Address, b: Address, amount_a: U256, amount_b: U256) {
        let pair = self.registry.create_pair(a, b).unwrap();
        self.ledger.approve(a, lp(), pair, U256::MAX).unwrap();
        self.ledger.approve(b, lp(), pair, U256::MAX).unwrap();
        let cell = self.registry.pair_cell(a, b).unwrap();
        let mut market = cell.lock().unwrap();
        let (amount0, amount1) = if a == market.token0() { (amount_a, amount_b) } else { (amount_b, amount_a) };
        market
            .add_liquidity(
                &mut self.ledger,
                &CallContext::new(lp(), NOW),
                amount0,
                amount1,
                U256::zero(),
                U256::zero(),
                lp(),
                NOW,
            )
            .unwrap();
    }

    /// Full-range position at price 1
    fn seed_v3(&mut self, a: Address, b: Address, fee: u32, liquidity: u128) {
        self.registry.create_pool(a, b, fee).unwrap();
        let cell = self.registry.pool_cell(a, b, fee).unwrap();
        let mut pool = cell.lock().unwrap();
        pool.initialize(Q96).unwrap();
        let (lower, upper) = TickMath::usable_bounds(pool.tick_spacing());
        let mut payer = PayFromBalance { payer: lp() };
        pool.mint(&mut self.ledger, &CallContext::new(lp(), NOW), lp(), lower, upper, liquidity, &mut payer)
            .unwrap();
    }

    fn exact_input(&self, token_in: Address, token_out: Address, amount_in: U256) -> ExactInput {
        ExactInput {
            token_in,
            token_out,
            amount_in,
            min_amount_out: U256::one(),
            recipient: trader(),
            deadline: NOW,
            version: None,
        }
    }
}

#[test_log::test]
fn test_v3_only_pair_quotes_version_two() {
    let mut m = Market::new();
    m.seed_v3(m.eth, m.wdex, 3_000, 1_000_000_000_000_000_000_000);

    let quote = m.router.get_best_quote(m.eth, m.wdex, e18(1)).unwrap().unwrap();
    assert_eq!(quote.version_id(), 2);
    let pool = m.registry.get_pool(m.eth, m.wdex, 3_000).unwrap();
    assert_eq!(quote.venue, Venue::V3Pool { pool, fee: 3_000 });
    assert!(quote.amount_out > U256::zero() && quote.amount_out < e18(1));
}

#[test_log::test]
fn test_no_pool_means_no_route() {
    let mut m = Market::new();
    assert_eq!(m.router.get_best_quote(m.eth, m.dai, e18(1)), Ok(None));
    assert!(m.router.quote_all(m.eth, m.dai, e18(1)).unwrap().is_empty());

    let ctx = m.ctx();
    let params = m.exact_input(m.eth, m.dai, e18(1));
    assert_eq!(m.router.swap_exact_in(&mut m.ledger, &ctx, &params), Err(DexError::NoRoute));
}

#[test_log::test]
fn test_pool_without_liquidity_is_skipped() {
    let m = Market::new();
    m.registry.create_pair(m.eth, m.dai).unwrap();
    m.registry.create_pool(m.eth, m.dai, 500).unwrap();
    assert_eq!(m.router.get_best_quote(m.eth, m.dai, e18(1)), Ok(None));
}

#[test_log::test]
fn test_best_quote_is_largest_raw_output() {
    let mut m = Market::new();
    m.seed_v2(m.eth, m.usdc, e18(1_000), e18(1_000));
    m.seed_v3(m.eth, m.usdc, 500, 1_000_000_000_000_000_000_000);
    m.seed_v3(m.eth, m.usdc, 10_000, 1_000_000_000_000_000_000_000);

    let all = m.router.quote_all(m.eth, m.usdc, e18(10)).unwrap();
    let versions: Vec<ProtocolVersion> = all.iter().map(|q| q.version).collect();
    assert_eq!(versions, vec![ProtocolVersion::V2, ProtocolVersion::V3, ProtocolVersion::V3]);

    let best = m.router.get_best_quote(m.eth, m.usdc, e18(10)).unwrap().unwrap();
    let max = all.iter().map(|q| q.amount_out).max().unwrap();
    assert_eq!(best.amount_out, max);
    // deep pool with the lowest fee wins
    assert!(matches!(best.venue, Venue::V3Pool { fee: 500, .. }));

    let v2 = m.router.quote_version(ProtocolVersion::V2, m.eth, m.usdc, e18(10)).unwrap().unwrap();
    assert_eq!(v2.version_id(), 1);
    assert!(v2.amount_out < best.amount_out);
}

#[test_log::test]
fn test_swap_exact_in_pays_the_quote() {
    let mut m = Market::new();
    m.seed_v2(m.eth, m.usdc, e18(1_000), e18(2_000));
    let quote = m.router.get_best_quote(m.eth, m.usdc, e18(1)).unwrap().unwrap();

    let eth_before = m.ledger.balance_of(m.eth, trader());
    let usdc_before = m.ledger.balance_of(m.usdc, trader());
    let ctx = m.ctx();
    let params = m.exact_input(m.eth, m.usdc, e18(1));
    let amount_out = m.router.swap_exact_in(&mut m.ledger, &ctx, &params).unwrap();

    assert_eq!(amount_out, quote.amount_out);
    assert_eq!(m.ledger.balance_of(m.eth, trader()), eth_before - e18(1));
    assert_eq!(m.ledger.balance_of(m.usdc, trader()), usdc_before + amount_out);
    // nothing stays with the router
    assert_eq!(m.ledger.balance_of(m.eth, m.router.address()), U256::zero());
    assert_eq!(m.ledger.balance_of(m.usdc, m.router.address()), U256::zero());
}

#[test_log::test]
fn test_slippage_reverts_everything() {
    let mut m = Market::new();
    m.seed_v3(m.eth, m.usdc, 3_000, 1_000_000_000_000_000_000_000);
    let pool = m.registry.pool_cell(m.eth, m.usdc, 3_000).unwrap();
    let slot_before = pool.read().slot();

    let quote = m.router.get_best_quote(m.eth, m.usdc, e18(1)).unwrap().unwrap();
    let eth_before = m.ledger.balance_of(m.eth, trader());
    let ctx = m.ctx();
    let mut params = m.exact_input(m.eth, m.usdc, e18(1));
    params.min_amount_out = quote.amount_out + U256::one();

    assert_eq!(
        m.router.swap_exact_in(&mut m.ledger, &ctx, &params),
        Err(DexError::SlippageExceeded {
            amount_out: quote.amount_out,
            minimum: quote.amount_out + U256::one(),
        })
    );
    assert_eq!(m.ledger.balance_of(m.eth, trader()), eth_before);
    assert_eq!(pool.read().slot(), slot_before);
}

#[test_log::test]
fn test_deadline_checked_before_anything() {
    let mut m = Market::new();
    m.seed_v2(m.eth, m.usdc, e18(1_000), e18(1_000));
    let ctx = CallContext::new(trader(), NOW + 1);
    let params = m.exact_input(m.eth, m.usdc, e18(1));
    assert_eq!(
        m.router.swap_exact_in(&mut m.ledger, &ctx, &params),
        Err(DexError::DeadlineExpired { deadline: NOW, now: NOW + 1 })
    );
}

#[test_log::test]
fn test_v1_through_wrapped_native() {
    let mut m = Market::new();
    m.seed_v1(m.usdc, e18(100), e18(200));
    let exchange = m.registry.get_exchange(m.usdc).unwrap();

    let quote = m.router.get_best_quote(m.wdex, m.usdc, e18(10)).unwrap().unwrap();
    assert_eq!(quote.version_id(), 0);
    assert_eq!(quote.venue, Venue::V1NativeToToken { exchange });

    let wdex_before = m.ledger.balance_of(m.wdex, trader());
    let ctx = m.ctx();
    let mut params = m.exact_input(m.wdex, m.usdc, e18(10));
    params.version = Some(ProtocolVersion::V1);
    let bought = m.router.swap_exact_in(&mut m.ledger, &ctx, &params).unwrap();
    assert_eq!(bought, quote.amount_out);
    assert_eq!(m.ledger.balance_of(m.wdex, trader()), wdex_before - e18(10));
    assert_eq!(m.ledger.native_balance_of(exchange), e18(110));

    // and back out into the wrapped token
    let back = m.router.get_best_quote(m.usdc, m.wdex, bought).unwrap().unwrap();
    assert_eq!(back.venue, Venue::V1TokenToNative { exchange });
    let params = m.exact_input(m.usdc, m.wdex, bought);
    let native = m.router.swap_exact_in(&mut m.ledger, &ctx, &params).unwrap();
    assert_eq!(native, back.amount_out);
    assert!(native < e18(10));
}

#[test_log::test]
fn test_v1_token_to_token_chains_two_exchanges() {
    let mut m = Market::new();
    m.seed_v1(m.usdc, e18(100), e18(100));
    m.seed_v1(m.dai, e18(100), e18(100));

    let quote = m.router.quote_version(ProtocolVersion::V1, m.usdc, m.dai, e18(1)).unwrap().unwrap();
    let sell = m.registry.get_exchange(m.usdc).unwrap();
    let buy = m.registry.get_exchange(m.dai).unwrap();
    assert_eq!(quote.venue, Venue::V1TokenToToken { sell, buy });

    let ctx = m.ctx();
    let params = m.exact_input(m.usdc, m.dai, e18(1));
    assert_eq!(m.router.swap_exact_in(&mut m.ledger, &ctx, &params), Ok(quote.amount_out));
    assert_eq!(m.ledger.native_balance_of(m.router.address()), U256::zero());
}

#[test_log::test]
fn test_path_swap_is_all_or_nothing() {
    let mut m = Market::new();
    m.seed_v2(m.usdc, m.wdex, e18(1_000), e18(1_000));
    m.seed_v2(m.wdex, m.eth, e18(1_000), e18(1_000));
    let path = vec![m.usdc, m.wdex, m.eth];

    let hops = m.router.quote_path(&path, e18(1)).unwrap().unwrap();
    assert_eq!(hops.len(), 2);
    assert_eq!(hops[1].amount_in, hops[0].amount_out);
    let expected = hops[1].amount_out;

    let first = m.registry.pair_cell(m.usdc, m.wdex).unwrap();
    let reserves_before = first.read().reserves();
    let usdc_before = m.ledger.balance_of(m.usdc, trader());

    let ctx = m.ctx();
    let mut params = ExactInputPath {
        path: path.clone(),
        amount_in: e18(1),
        min_amount_out: expected + U256::one(),
        recipient: trader(),
        deadline: NOW,
    };
    assert!(matches!(
        m.router.swap_exact_in_path(&mut m.ledger, &ctx, &params),
        Err(DexError::SlippageExceeded { .. })
    ));
    assert_eq!(first.read().reserves(), reserves_before);
    assert_eq!(m.ledger.balance_of(m.usdc, trader()), usdc_before);

    params.min_amount_out = expected;
    let eth_before = m.ledger.balance_of(m.eth, trader());
    assert_eq!(m.router.swap_exact_in_path(&mut m.ledger, &ctx, &params), Ok(expected));
    assert_eq!(m.ledger.balance_of(m.eth, trader()), eth_before + expected);
}

#[test_log::test]
fn test_path_bounds() {
    let m = Market::new();
    let path = vec![m.usdc, m.wdex, m.eth, m.dai, m.usdc, m.wdex];
    assert_eq!(
        m.router.quote_path(&path, e18(1)),
        Err(DexError::PathTooLong { hops: 5, max: 4 })
    );
    assert!(matches!(
        m.router.quote_path(&[m.usdc], e18(1)),
        Err(DexError::InvalidInput(_))
    ));
}

#[test_log::test]
fn test_quotes_use_committed_state_during_an_operation() {
    let mut m = Market::new();
    m.seed_v2(m.eth, m.usdc, e18(1_000), e18(1_000));
    let cell = m.registry.pair_cell(m.eth, m.usdc).unwrap();
    let before = m.router.get_best_quote(m.eth, m.usdc, e18(1)).unwrap();
    assert!(before.is_some());

    let guard = cell.lock().unwrap();
    assert_eq!(m.router.get_best_quote(m.eth, m.usdc, e18(1)).unwrap(), before);

    let router = &m.router;
    let (eth, usdc) = (m.eth, m.usdc);
    let from_thread = std::thread::scope(|s| s.spawn(|| router.get_best_quote(eth, usdc, e18(1))).join().unwrap());
    assert_eq!(from_thread.unwrap(), before);
    drop(guard);
}
