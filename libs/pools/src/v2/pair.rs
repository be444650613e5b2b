//! Constant-product pair of two arbitrary tokens
//!
//! Deposits are measured as the difference between the pair's ledger
//! balances and its recorded reserves, so callers transfer first and call
//! `mint`/`swap` second. The convenience entry points (`add_liquidity`,
//! `remove_liquidity`) bundle both halves inside one ledger checkpoint.

use super::oracle::{PriceAccumulator, MAX_RESERVE};
use crate::shares::ShareLedger;
use amm::sqrt_math::sqrt_floor;
use amm::{AmmPool, FullMath, ReservePair, V2Math, BPS_DENOMINATOR};
use parking_lot::RwLock;
use std::sync::Arc;
use tokens::{atomically, TokenLedger};
use tracing::{debug, info};
use types::{
    Address, CallContext, DexError, DexResult, PairKey, ProtocolVersion, U256, MINIMUM_LIQUIDITY,
};

/// Protocol fee recipient shared by every pair of one registry
#[derive(Debug, Clone, Default)]
pub struct FeeSwitch(Arc<RwLock<Option<Address>>>);

impl FeeSwitch {
    pub fn fee_to(&self) -> Option<Address> {
        *self.0.read()
    }

    pub fn set(&self, fee_to: Option<Address>) {
        *self.0.write() = fee_to;
    }
}

/// Invoked by [`PairMarket::swap`] after the outputs were sent and before
/// the invariant is checked; the receiver must have paid the pair by the
/// time it returns.
pub trait FlashCallback {
    fn on_flash_swap(
        &mut self,
        ledger: &mut dyn TokenLedger,
        pair: Address,
        amount0_out: U256,
        amount1_out: U256,
    ) -> DexResult<()>;
}

/// Amounts actually deposited by [`PairMarket::add_liquidity`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deposit {
    pub amount0: U256,
    pub amount1: U256,
    pub liquidity: U256,
}

#[derive(Debug, Clone)]
pub struct PairMarket {
    address: Address,
    token0: Address,
    token1: Address,
    reserve0: U256,
    reserve1: U256,
    oracle: PriceAccumulator,
    k_last: U256,
    shares: ShareLedger,
    fee_bps: u32,
    fee_switch: FeeSwitch,
}

/// Shares owed to the protocol fee recipient before a mint or burn
struct ProtocolFee {
    fee_to: Address,
    shares: U256,
}

impl PairMarket {
    pub fn new(address: Address, key: PairKey, fee_bps: u32, fee_switch: FeeSwitch) -> Self {
        Self {
            address,
            token0: key.token0,
            token1: key.token1,
            reserve0: U256::zero(),
            reserve1: U256::zero(),
            oracle: PriceAccumulator::default(),
            k_last: U256::zero(),
            shares: ShareLedger::default(),
            fee_bps,
            fee_switch,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token0(&self) -> Address {
        self.token0
    }

    pub fn token1(&self) -> Address {
        self.token1
    }

    pub fn fee_bps(&self) -> u32 {
        self.fee_bps
    }

    /// `(reserve0, reserve1, block_timestamp_last)`
    pub fn reserves(&self) -> (U256, U256, u32) {
        (self.reserve0, self.reserve1, self.oracle.block_timestamp_last)
    }

    pub fn price0_cumulative_last(&self) -> U256 {
        self.oracle.price0_cumulative_last
    }

    pub fn price1_cumulative_last(&self) -> U256 {
        self.oracle.price1_cumulative_last
    }

    pub fn k_last(&self) -> U256 {
        self.k_last
    }

    pub fn balance_of(&self, owner: Address) -> U256 {
        self.shares.balance_of(owner)
    }

    pub fn total_supply(&self) -> U256 {
        self.shares.total_supply()
    }

    /// Move liquidity shares between holders
    pub fn transfer_shares(&mut self, ctx: &CallContext, to: Address, amount: U256) -> DexResult<()> {
        self.shares.transfer(ctx.sender, to, amount)
    }

    pub fn pricing(&self) -> ReservePair {
        ReservePair {
            version: ProtocolVersion::V2,
            token0: self.token0,
            token1: self.token1,
            reserve0: self.reserve0,
            reserve1: self.reserve1,
            fee_bps: self.fee_bps,
        }
    }

    /// Output for selling `amount_in` of `token_in` at the current reserves
    pub fn get_amount_out(&self, token_in: Address, amount_in: U256) -> DexResult<U256> {
        self.pricing().quote_exact_in(token_in, amount_in)
    }

    /// Input of the other token needed to take `amount_out` of `token_out`
    pub fn get_amount_in(&self, token_out: Address, amount_out: U256) -> DexResult<U256> {
        self.pricing().quote_exact_out(token_out, amount_out)
    }

    /// Equivalent amount of the other token at the current ratio
    pub fn quote(&self, token_a: Address, amount_a: U256) -> DexResult<U256> {
        let (reserve_a, reserve_b) = self.pricing().oriented(token_a)?;
        V2Math::quote(amount_a, reserve_a, reserve_b)
    }

    // ---- low-level entry points ----

    /// Mint shares to `to` for whatever was transferred in since the last update
    pub fn mint(&mut self, ledger: &dyn TokenLedger, ctx: &CallContext, to: Address) -> DexResult<U256> {
        let (balance0, balance1) = self.balances(ledger)?;
        let amount0 = balance0
            .checked_sub(self.reserve0)
            .ok_or(DexError::InvariantViolation("balance below reserve"))?;
        let amount1 = balance1
            .checked_sub(self.reserve1)
            .ok_or(DexError::InvariantViolation("balance below reserve"))?;

        let protocol_fee = self.protocol_fee()?;
        let total_supply = self.supply_after(&protocol_fee)?;

        let minimum = U256::from(MINIMUM_LIQUIDITY);
        let (liquidity, locked) = if total_supply.is_zero() {
            let root = sqrt_floor(amount0 * amount1);
            if root <= minimum {
                return Err(DexError::InsufficientLiquidityMinted);
            }
            (root - minimum, minimum)
        } else {
            let by0 = FullMath::mul_div(amount0, total_supply, self.reserve0)?;
            let by1 = FullMath::mul_div(amount1, total_supply, self.reserve1)?;
            (by0.min(by1), U256::zero())
        };
        if liquidity.is_zero() {
            return Err(DexError::InsufficientLiquidityMinted);
        }

        self.apply_protocol_fee(protocol_fee)?;
        if !locked.is_zero() {
            self.shares.mint(Address::zero(), locked)?;
        }
        self.shares.mint(to, liquidity)?;
        self.update(balance0, balance1, ctx.timestamp);
        self.record_k_last();

        info!(pair = ?self.address, ?to, %amount0, %amount1, %liquidity, "V2 mint");
        Ok(liquidity)
    }

    /// Burn the shares held by the pair itself and send the underlying to `to`
    pub fn burn(
        &mut self,
        ledger: &mut dyn TokenLedger,
        ctx: &CallContext,
        to: Address,
    ) -> DexResult<(U256, U256)> {
        let (balance0, balance1) = self.balances(ledger)?;
        let liquidity = self.shares.balance_of(self.address);

        let protocol_fee = self.protocol_fee()?;
        let total_supply = self.supply_after(&protocol_fee)?;
        if total_supply.is_zero() {
            return Err(DexError::InsufficientLiquidityBurned);
        }
        let amount0 = FullMath::mul_div(liquidity, balance0, total_supply)?;
        let amount1 = FullMath::mul_div(liquidity, balance1, total_supply)?;
        if amount0.is_zero() || amount1.is_zero() {
            return Err(DexError::InsufficientLiquidityBurned);
        }

        let (pair, token0, token1) = (self.address, self.token0, self.token1);
        atomically(ledger, |l| -> DexResult<()> {
            l.transfer(token0, pair, to, amount0)?;
            l.transfer(token1, pair, to, amount1)?;
            Ok(())
        })?;

        self.apply_protocol_fee(protocol_fee)?;
        self.shares.burn(self.address, liquidity)?;
        self.update(balance0 - amount0, balance1 - amount1, ctx.timestamp);
        self.record_k_last();

        info!(pair = ?self.address, ?to, %amount0, %amount1, %liquidity, "V2 burn");
        Ok((amount0, amount1))
    }

    /// Send the requested outputs to `to` and check that enough came back in
    ///
    /// Input must already sit in the pair's balance, or be paid by
    /// `callback`. Returns the amounts that were paid in.
    pub fn swap(
        &mut self,
        ledger: &mut dyn TokenLedger,
        ctx: &CallContext,
        amount0_out: U256,
        amount1_out: U256,
        to: Address,
        callback: Option<&mut dyn FlashCallback>,
    ) -> DexResult<(U256, U256)> {
        if amount0_out.is_zero() && amount1_out.is_zero() {
            return Err(DexError::InsufficientOutputAmount {
                amount: U256::zero(),
                minimum: U256::one(),
            });
        }
        if amount0_out >= self.reserve0 || amount1_out >= self.reserve1 {
            return Err(DexError::InsufficientLiquidity);
        }
        if to == self.token0 || to == self.token1 {
            return Err(DexError::InvalidInput("recipient is a pair token"));
        }

        let (pair, token0, token1) = (self.address, self.token0, self.token1);
        let (reserve0, reserve1, fee_bps) = (self.reserve0, self.reserve1, self.fee_bps);

        let (balance0, balance1, amount0_in, amount1_in) =
            atomically(ledger, |l| -> DexResult<(U256, U256, U256, U256)> {
                if !amount0_out.is_zero() {
                    l.transfer(token0, pair, to, amount0_out)?;
                }
                if !amount1_out.is_zero() {
                    l.transfer(token1, pair, to, amount1_out)?;
                }
                if let Some(callback) = callback {
                    callback.on_flash_swap(l, pair, amount0_out, amount1_out)?;
                }
                let balance0 = l.balance_of(token0, pair);
                let balance1 = l.balance_of(token1, pair);
                ensure_reserve_bound(balance0, balance1)?;

                let amount0_in = amount_in(balance0, reserve0, amount0_out);
                let amount1_in = amount_in(balance1, reserve1, amount1_out);
                if amount0_in.is_zero() && amount1_in.is_zero() {
                    return Err(DexError::InsufficientInputAmount);
                }
                check_k(
                    (balance0, balance1),
                    (amount0_in, amount1_in),
                    (reserve0, reserve1),
                    fee_bps,
                )?;
                Ok((balance0, balance1, amount0_in, amount1_in))
            })?;

        self.update(balance0, balance1, ctx.timestamp);
        debug!(
            pair = ?self.address,
            %amount0_in,
            %amount1_in,
            %amount0_out,
            %amount1_out,
            "V2 swap"
        );
        Ok((amount0_in, amount1_in))
    }

    /// Send balances above the reserves to `to`
    ///
    /// Unbounded balances are accepted, so a donation too large to sync can
    /// always be removed.
    pub fn skim(&mut self, ledger: &mut dyn TokenLedger, to: Address) -> DexResult<(U256, U256)> {
        let balance0 = ledger.balance_of(self.token0, self.address);
        let balance1 = ledger.balance_of(self.token1, self.address);
        let excess0 = balance0.saturating_sub(self.reserve0);
        let excess1 = balance1.saturating_sub(self.reserve1);
        let (pair, token0, token1) = (self.address, self.token0, self.token1);
        atomically(ledger, |l| -> DexResult<()> {
            if !excess0.is_zero() {
                l.transfer(token0, pair, to, excess0)?;
            }
            if !excess1.is_zero() {
                l.transfer(token1, pair, to, excess1)?;
            }
            Ok(())
        })?;
        Ok((excess0, excess1))
    }

    /// Set the reserves to the current balances
    pub fn sync(&mut self, ledger: &dyn TokenLedger, ctx: &CallContext) -> DexResult<()> {
        let (balance0, balance1) = self.balances(ledger)?;
        self.update(balance0, balance1, ctx.timestamp);
        Ok(())
    }

    // ---- provider conveniences ----

    /// Deposit up to the desired amounts at the current ratio from `ctx.sender`
    ///
    /// An empty pair takes both desired amounts as-is. The pair spends the
    /// sender's allowance, so the sender approves the pair address first.
    #[allow(clippy::too_many_arguments)]
    pub fn add_liquidity(
        &mut self,
        ledger: &mut dyn TokenLedger,
        ctx: &CallContext,
        amount0_desired: U256,
        amount1_desired: U256,
        amount0_min: U256,
        amount1_min: U256,
        to: Address,
        deadline: u64,
    ) -> DexResult<Deposit> {
        ctx.ensure_deadline(deadline)?;
        let (amount0, amount1) =
            self.optimal_amounts(amount0_desired, amount1_desired, amount0_min, amount1_min)?;

        let (pair, token0, token1) = (self.address, self.token0, self.token1);
        let liquidity = atomically(ledger, |l| -> DexResult<U256> {
            l.transfer_from(token0, pair, ctx.sender, pair, amount0)?;
            l.transfer_from(token1, pair, ctx.sender, pair, amount1)?;
            self.mint(l, ctx, to)
        })?;
        Ok(Deposit {
            amount0,
            amount1,
            liquidity,
        })
    }

    /// Burn `liquidity` of `ctx.sender`'s shares and send the underlying to `to`
    #[allow(clippy::too_many_arguments)]
    pub fn remove_liquidity(
        &mut self,
        ledger: &mut dyn TokenLedger,
        ctx: &CallContext,
        liquidity: U256,
        amount0_min: U256,
        amount1_min: U256,
        to: Address,
        deadline: u64,
    ) -> DexResult<(U256, U256)> {
        ctx.ensure_deadline(deadline)?;
        self.shares.transfer(ctx.sender, self.address, liquidity)?;

        let burned = self.burn(ledger, ctx, to).and_then(|(amount0, amount1)| {
            if amount0 < amount0_min {
                return Err(DexError::InsufficientOutputAmount {
                    amount: amount0,
                    minimum: amount0_min,
                });
            }
            if amount1 < amount1_min {
                return Err(DexError::InsufficientOutputAmount {
                    amount: amount1,
                    minimum: amount1_min,
                });
            }
            Ok((amount0, amount1))
        });
        if burned.is_err() {
            // burn only mutates on success, so only the share move needs undoing
            self.shares.transfer(self.address, ctx.sender, liquidity)?;
        }
        burned
    }

    fn optimal_amounts(
        &self,
        amount0_desired: U256,
        amount1_desired: U256,
        amount0_min: U256,
        amount1_min: U256,
    ) -> DexResult<(U256, U256)> {
        if amount0_desired.is_zero() || amount1_desired.is_zero() {
            return Err(DexError::InvalidInput("zero amount"));
        }
        if self.reserve0.is_zero() && self.reserve1.is_zero() {
            return Ok((amount0_desired, amount1_desired));
        }
        let amount1_optimal = V2Math::quote(amount0_desired, self.reserve0, self.reserve1)?;
        if amount1_optimal <= amount1_desired {
            if amount1_optimal < amount1_min {
                return Err(DexError::InsufficientOutputAmount {
                    amount: amount1_optimal,
                    minimum: amount1_min,
                });
            }
            return Ok((amount0_desired, amount1_optimal));
        }
        let amount0_optimal = V2Math::quote(amount1_desired, self.reserve1, self.reserve0)?;
        if amount0_optimal < amount0_min {
            return Err(DexError::InsufficientOutputAmount {
                amount: amount0_optimal,
                minimum: amount0_min,
            });
        }
        Ok((amount0_optimal, amount1_desired))
    }

    fn balances(&self, ledger: &dyn TokenLedger) -> DexResult<(U256, U256)> {
        let balance0 = ledger.balance_of(self.token0, self.address);
        let balance1 = ledger.balance_of(self.token1, self.address);
        ensure_reserve_bound(balance0, balance1)?;
        Ok((balance0, balance1))
    }

    fn update(&mut self, balance0: U256, balance1: U256, timestamp: u64) {
        self.oracle.update(self.reserve0, self.reserve1, timestamp);
        self.reserve0 = balance0;
        self.reserve1 = balance1;
    }

    fn protocol_fee(&self) -> DexResult<Option<ProtocolFee>> {
        let Some(fee_to) = self.fee_switch.fee_to() else {
            return Ok(None);
        };
        if self.k_last.is_zero() {
            return Ok(None);
        }
        let root_k = sqrt_floor(self.reserve0 * self.reserve1);
        let root_k_last = sqrt_floor(self.k_last);
        if root_k <= root_k_last {
            return Ok(None);
        }
        let numerator = self.shares.total_supply().full_mul(root_k - root_k_last);
        let denominator = root_k * U256::from(5u64) + root_k_last;
        let shares = amm::full_math::narrow(numerator / amm::full_math::widen(denominator))
            .ok_or(DexError::ArithmeticOverflow)?;
        Ok((!shares.is_zero()).then_some(ProtocolFee { fee_to, shares }))
    }

    fn supply_after(&self, fee: &Option<ProtocolFee>) -> DexResult<U256> {
        let extra = fee.as_ref().map(|f| f.shares).unwrap_or_default();
        self.shares
            .total_supply()
            .checked_add(extra)
            .ok_or(DexError::ArithmeticOverflow)
    }

    fn apply_protocol_fee(&mut self, fee: Option<ProtocolFee>) -> DexResult<()> {
        if let Some(ProtocolFee { fee_to, shares }) = fee {
            debug!(pair = ?self.address, ?fee_to, %shares, "protocol fee minted");
            self.shares.mint(fee_to, shares)?;
        }
        Ok(())
    }

    fn record_k_last(&mut self) {
        self.k_last = if self.fee_switch.fee_to().is_some() {
            self.reserve0 * self.reserve1
        } else {
            U256::zero()
        };
    }
}

impl AmmPool for PairMarket {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V2
    }

    fn quote_exact_in(&self, token_in: Address, amount_in: U256) -> DexResult<U256> {
        self.get_amount_out(token_in, amount_in)
    }

    fn quote_exact_out(&self, token_out: Address, amount_out: U256) -> DexResult<U256> {
        self.get_amount_in(token_out, amount_out)
    }

    fn fee_pips(&self) -> u32 {
        self.pricing().fee_pips()
    }
}

/// Reserves are stored in 112 bits; larger balances cannot be committed
fn ensure_reserve_bound(balance0: U256, balance1: U256) -> DexResult<()> {
    if balance0 > MAX_RESERVE || balance1 > MAX_RESERVE {
        return Err(DexError::ArithmeticOverflow);
    }
    Ok(())
}

fn amount_in(balance: U256, reserve: U256, amount_out: U256) -> U256 {
    let floor = reserve - amount_out;
    balance.saturating_sub(floor)
}

/// `(b0*D - in0*fee) * (b1*D - in1*fee) >= r0 * r1 * D^2`
fn check_k(
    balances: (U256, U256),
    amounts_in: (U256, U256),
    reserves: (U256, U256),
    fee_bps: u32,
) -> DexResult<()> {
    let denominator = U256::from(BPS_DENOMINATOR);
    let fee = U256::from(fee_bps);
    // balances are bounded by 2^112, so these products fit comfortably
    let adjusted0 = balances.0 * denominator - amounts_in.0 * fee;
    let adjusted1 = balances.1 * denominator - amounts_in.1 * fee;
    let after = adjusted0.full_mul(adjusted1);
    let before = reserves.0.full_mul(reserves.1) * amm::full_math::widen(denominator * denominator);
    if after < before {
        return Err(DexError::InvariantViolation("K"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokens::InMemoryLedger;

    fn e18(n: u64) -> U256 {
        U256::from(n) * U256::exp10(18)
    }

    struct Fixture {
        ledger: InMemoryLedger,
        pair: PairMarket,
        lp: CallContext,
    }

    fn fixture(fee_switch: FeeSwitch) -> Fixture {
        let mut ledger = InMemoryLedger::new();
        let a = ledger.create_token("Token A", "TKA", 18).unwrap();
        let b = ledger.create_token("Token B", "TKB", 18).unwrap();
        let key = PairKey::new(a, b).unwrap();
        let pair = PairMarket::new(Address::from_low_u64_be(0xbeef), key, 30, fee_switch);
        let lp = CallContext::new(Address::from_low_u64_be(1), 1_000);
        for token in [a, b] {
            ledger.mint(token, lp.sender, e18(1_000_000)).unwrap();
            ledger.approve(token, lp.sender, pair.address(), U256::MAX).unwrap();
        }
        Fixture { ledger, pair, lp }
    }

    #[test]
    fn test_first_mint_locks_minimum_liquidity() {
        let mut f = fixture(FeeSwitch::default());
        let (t0, t1, pair) = (f.pair.token0(), f.pair.token1(), f.pair.address());
        f.ledger.transfer(t0, f.lp.sender, pair, U256::from(1_000u64)).unwrap();
        f.ledger.transfer(t1, f.lp.sender, pair, U256::from(4_000u64)).unwrap();

        let minted = f.pair.mint(&f.ledger, &f.lp, f.lp.sender).unwrap();
        assert_eq!(minted, U256::from(2_000u64 - MINIMUM_LIQUIDITY));
        assert_eq!(f.pair.balance_of(Address::zero()), U256::from(MINIMUM_LIQUIDITY));
        assert_eq!(f.pair.total_supply(), U256::from(2_000u64));
        let (r0, r1, ts) = f.pair.reserves();
        assert_eq!((r0, r1, ts), (U256::from(1_000u64), U256::from(4_000u64), 1_000));
    }

    #[test]
    fn test_mint_below_minimum_fails() {
        let mut f = fixture(FeeSwitch::default());
        let (t0, t1, pair) = (f.pair.token0(), f.pair.token1(), f.pair.address());
        f.ledger.transfer(t0, f.lp.sender, pair, U256::from(1_000u64)).unwrap();
        f.ledger.transfer(t1, f.lp.sender, pair, U256::from(1_000u64)).unwrap();
        assert_eq!(
            f.pair.mint(&f.ledger, &f.lp, f.lp.sender),
            Err(DexError::InsufficientLiquidityMinted)
        );
        assert!(f.pair.total_supply().is_zero());
    }

    #[test]
    fn test_swap_respects_k() {
        let mut f = fixture(FeeSwitch::default());
        let lp = f.lp;
        f.pair
            .add_liquidity(&mut f.ledger, &lp, e18(5), e18(10), U256::zero(), U256::zero(), lp.sender, 1_000)
            .unwrap();
        let (t0, pair) = (f.pair.token0(), f.pair.address());

        let amount_in = e18(1);
        let expected = f.pair.get_amount_out(t0, amount_in).unwrap();
        assert_eq!(expected, U256::from(1_662_497_915_624_478_906u64));

        // asking for one unit more than the formula allows breaks the invariant
        f.ledger.transfer(t0, lp.sender, pair, amount_in).unwrap();
        assert_eq!(
            f.pair.swap(&mut f.ledger, &lp, U256::zero(), expected + 1, lp.sender, None),
            Err(DexError::InvariantViolation("K"))
        );
        let (in0, in1) = f
            .pair
            .swap(&mut f.ledger, &lp, U256::zero(), expected, lp.sender, None)
            .unwrap();
        assert_eq!((in0, in1), (amount_in, U256::zero()));
        let (r0, r1, _) = f.pair.reserves();
        assert_eq!((r0, r1), (e18(6), e18(10) - expected));
    }

    #[test]
    fn test_swap_argument_checks() {
        let mut f = fixture(FeeSwitch::default());
        let lp = f.lp;
        f.pair
            .add_liquidity(&mut f.ledger, &lp, e18(5), e18(10), U256::zero(), U256::zero(), lp.sender, 1_000)
            .unwrap();
        let t0 = f.pair.token0();
        assert!(matches!(
            f.pair.swap(&mut f.ledger, &lp, U256::zero(), U256::zero(), lp.sender, None),
            Err(DexError::InsufficientOutputAmount { .. })
        ));
        assert_eq!(
            f.pair.swap(&mut f.ledger, &lp, e18(5), U256::zero(), lp.sender, None),
            Err(DexError::InsufficientLiquidity)
        );
        assert_eq!(
            f.pair.swap(&mut f.ledger, &lp, U256::one(), U256::zero(), t0, None),
            Err(DexError::InvalidInput("recipient is a pair token"))
        );
        // nothing paid in: the optimistic transfer is rolled back
        let before = f.ledger.balance_of(t0, lp.sender);
        assert_eq!(
            f.pair.swap(&mut f.ledger, &lp, U256::one(), U256::zero(), lp.sender, None),
            Err(DexError::InsufficientInputAmount)
        );
        assert_eq!(f.ledger.balance_of(t0, lp.sender), before);
    }

    struct Repay {
        token: Address,
        from: Address,
        amount: U256,
    }

    impl FlashCallback for Repay {
        fn on_flash_swap(
            &mut self,
            ledger: &mut dyn TokenLedger,
            pair: Address,
            _amount0_out: U256,
            _amount1_out: U256,
        ) -> DexResult<()> {
            ledger.transfer(self.token, self.from, pair, self.amount)?;
            Ok(())
        }
    }

    #[test]
    fn test_flash_swap_repaid_in_callback() {
        let mut f = fixture(FeeSwitch::default());
        let lp = f.lp;
        f.pair
            .add_liquidity(&mut f.ledger, &lp, e18(100), e18(100), U256::zero(), U256::zero(), lp.sender, 1_000)
            .unwrap();
        let t0 = f.pair.token0();
        let borrowed = e18(1);

        // borrowing token0 and repaying exactly the principal fails the fee check
        let mut short = Repay { token: t0, from: lp.sender, amount: borrowed };
        assert_eq!(
            f.pair.swap(&mut f.ledger, &lp, borrowed, U256::zero(), lp.sender, Some(&mut short)),
            Err(DexError::InvariantViolation("K"))
        );

        // principal / 0.997 rounded up covers the fee
        let repay = borrowed * U256::from(1000u64) / U256::from(997u64) + U256::one();
        let mut enough = Repay { token: t0, from: lp.sender, amount: repay };
        let (in0, _) = f
            .pair
            .swap(&mut f.ledger, &lp, borrowed, U256::zero(), lp.sender, Some(&mut enough))
            .unwrap();
        assert_eq!(in0, repay);
    }

    #[test]
    fn test_remove_liquidity_restores_shares_on_failure() {
        let mut f = fixture(FeeSwitch::default());
        let lp = f.lp;
        let deposit = f
            .pair
            .add_liquidity(&mut f.ledger, &lp, e18(1), e18(4), U256::zero(), U256::zero(), lp.sender, 1_000)
            .unwrap();
        assert_eq!(deposit.liquidity, e18(2) - U256::from(MINIMUM_LIQUIDITY));

        assert!(matches!(
            f.pair.remove_liquidity(&mut f.ledger, &lp, deposit.liquidity, e18(1), U256::zero(), lp.sender, 1_000),
            Err(DexError::InsufficientOutputAmount { .. })
        ));
        assert_eq!(f.pair.balance_of(lp.sender), deposit.liquidity);

        let (out0, out1) = f
            .pair
            .remove_liquidity(&mut f.ledger, &lp, deposit.liquidity, U256::zero(), U256::zero(), lp.sender, 1_000)
            .unwrap();
        assert!(out0 <= deposit.amount0 && out1 <= deposit.amount1);
        assert_eq!(f.pair.total_supply(), U256::from(MINIMUM_LIQUIDITY));
    }

    #[test]
    fn test_add_liquidity_uses_current_ratio() {
        let mut f = fixture(FeeSwitch::default());
        let lp = f.lp;
        f.pair
            .add_liquidity(&mut f.ledger, &lp, e18(1), e18(4), U256::zero(), U256::zero(), lp.sender, 1_000)
            .unwrap();
        let second = f
            .pair
            .add_liquidity(&mut f.ledger, &lp, e18(2), e18(2), U256::zero(), U256::zero(), lp.sender, 1_000)
            .unwrap();
        assert_eq!(second.amount1, e18(2));
        assert_eq!(second.amount0, e18(2) / U256::from(4u64));
        assert!(matches!(
            f.pair.add_liquidity(&mut f.ledger, &lp, e18(2), e18(2), e18(1), U256::zero(), lp.sender, 1_000),
            Err(DexError::InsufficientOutputAmount { .. })
        ));
    }

    #[test]
    fn test_protocol_fee_accrues_to_fee_to() {
        let switch = FeeSwitch::default();
        let fee_to = Address::from_low_u64_be(0xfee);
        switch.set(Some(fee_to));
        let mut f = fixture(switch);
        let lp = f.lp;
        f.pair
            .add_liquidity(&mut f.ledger, &lp, e18(1_000), e18(1_000), U256::zero(), U256::zero(), lp.sender, 1_000)
            .unwrap();
        assert_eq!(f.pair.k_last(), e18(1_000) * e18(1_000));

        let (t0, pair) = (f.pair.token0(), f.pair.address());
        let amount_in = e18(100);
        let out = f.pair.get_amount_out(t0, amount_in).unwrap();
        f.ledger.transfer(t0, lp.sender, pair, amount_in).unwrap();
        f.pair.swap(&mut f.ledger, &lp, U256::zero(), out, lp.sender, None).unwrap();
        assert!(f.pair.balance_of(fee_to).is_zero());

        // the next liquidity event realizes the fee on the growth of sqrt(k)
        f.pair.sync(&f.ledger, &lp).unwrap();
        f.ledger.transfer(t0, lp.sender, pair, U256::from(10u64)).unwrap();
        f.ledger.transfer(f.pair.token1(), lp.sender, pair, U256::from(10u64)).unwrap();
        f.pair.mint(&f.ledger, &lp, lp.sender).unwrap();
        assert!(!f.pair.balance_of(fee_to).is_zero());
    }

    #[test]
    fn test_skim_and_sync() {
        let mut f = fixture(FeeSwitch::default());
        let lp = f.lp;
        f.pair
            .add_liquidity(&mut f.ledger, &lp, e18(1), e18(1), U256::zero(), U256::zero(), lp.sender, 1_000)
            .unwrap();
        let (t0, pair) = (f.pair.token0(), f.pair.address());
        f.ledger.transfer(t0, lp.sender, pair, U256::from(7u64)).unwrap();

        let skimmer = Address::from_low_u64_be(42);
        let (excess0, excess1) = f.pair.skim(&mut f.ledger, skimmer).unwrap();
        assert_eq!((excess0, excess1), (U256::from(7u64), U256::zero()));
        assert_eq!(f.ledger.balance_of(t0, skimmer), U256::from(7u64));

        f.ledger.transfer(t0, lp.sender, pair, U256::from(3u64)).unwrap();
        f.pair.sync(&f.ledger, &lp).unwrap();
        assert_eq!(f.pair.reserves().0, e18(1) + U256::from(3u64));
    }

    #[test]
    fn test_oversized_balance_overflows() {
        let mut f = fixture(FeeSwitch::default());
        let (t0, pair) = (f.pair.token0(), f.pair.address());
        f.ledger.mint(t0, pair, MAX_RESERVE + U256::one()).unwrap();
        assert_eq!(f.pair.sync(&f.ledger, &f.lp), Err(DexError::ArithmeticOverflow));
    }

    #[test]
    fn test_swap_rejects_balance_past_reserve_bound() {
        let mut f = fixture(FeeSwitch::default());
        let lp = f.lp;
        f.pair
            .add_liquidity(&mut f.ledger, &lp, e18(5), e18(10), U256::zero(), U256::zero(), lp.sender, lp.timestamp)
            .unwrap();
        let (t0, t1, pair) = (f.pair.token0(), f.pair.token1(), f.pair.address());
        let before = f.pair.reserves();

        // a donation that would push reserve0 past 2^112 - 1 once committed
        f.ledger.mint(t0, pair, MAX_RESERVE).unwrap();
        let result = f.pair.swap(&mut f.ledger, &lp, U256::zero(), U256::one(), lp.sender, None);
        assert_eq!(result, Err(DexError::ArithmeticOverflow));

        assert_eq!(f.pair.reserves(), before);
        assert_eq!(f.ledger.balance_of(t1, pair), before.1);

        // the donation can still be skimmed and the pair keeps working
        f.pair.skim(&mut f.ledger, lp.sender).unwrap();
        f.pair.sync(&f.ledger, &lp).unwrap();
        assert_eq!(f.pair.reserves().0, before.0);
    }
}
