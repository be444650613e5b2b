//! Concentrated-liquidity pool state and position management
//!
//! Position changes are planned against the current state first
//! ([`PositionChange`]), paid for through the ledger, and only then written
//! back, so a failed payment leaves ticks, bitmap and positions untouched.

use super::callback::{collect_payment, PaymentCallback};
use super::position::{PositionInfo, PositionKey};
use super::tick::{fee_growth_inside, FeeGrowth, TickInfo, TickTable};
use super::tick_bitmap::TickBitmap;
use amm::liquidity_math::{add_delta, to_delta};
use amm::{SqrtPriceMath, TickMath, MAX_TICK, MIN_TICK};
use std::collections::HashMap;
use tokens::{atomically, TokenLedger};
use tracing::{debug, info};
use types::{Address, CallContext, DexError, DexResult, PoolKey, U256};

/// Current price cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub sqrt_price_x96: U256,
    pub tick: i32,
}

#[derive(Debug, Clone)]
pub struct ConcentratedPool {
    pub(super) address: Address,
    pub(super) key: PoolKey,
    pub(super) tick_spacing: i32,
    pub(super) max_liquidity_per_tick: u128,
    /// `None` until [`ConcentratedPool::initialize`]
    pub(super) slot: Option<Slot>,
    pub(super) liquidity: u128,
    pub(super) fee_growth: FeeGrowth,
    pub(super) ticks: TickTable,
    pub(super) bitmap: TickBitmap,
    pub(super) positions: HashMap<PositionKey, PositionInfo>,
    pub(super) max_swap_steps: u32,
}

/// A fully validated position update waiting to be written back
#[derive(Debug, Clone)]
struct PositionChange {
    key: PositionKey,
    liquidity_delta: i128,
    lower: Option<(TickInfo, bool)>,
    upper: Option<(TickInfo, bool)>,
    position: PositionInfo,
    pool_liquidity: u128,
    amount0: U256,
    amount1: U256,
}

impl ConcentratedPool {
    pub fn new(address: Address, key: PoolKey, tick_spacing: i32, max_swap_steps: u32) -> Self {
        Self {
            address,
            key,
            tick_spacing,
            max_liquidity_per_tick: TickMath::max_liquidity_per_tick(tick_spacing),
            slot: None,
            liquidity: 0,
            fee_growth: FeeGrowth::default(),
            ticks: TickTable::default(),
            bitmap: TickBitmap::default(),
            positions: HashMap::new(),
            max_swap_steps,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn key(&self) -> PoolKey {
        self.key
    }

    pub fn token0(&self) -> Address {
        self.key.token0
    }

    pub fn token1(&self) -> Address {
        self.key.token1
    }

    /// Swap fee in hundredths of a basis point
    pub fn fee(&self) -> u32 {
        self.key.fee
    }

    pub fn tick_spacing(&self) -> i32 {
        self.tick_spacing
    }

    pub fn max_liquidity_per_tick(&self) -> u128 {
        self.max_liquidity_per_tick
    }

    pub fn slot(&self) -> Option<Slot> {
        self.slot
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.is_some()
    }

    /// Liquidity active at the current price
    pub fn liquidity(&self) -> u128 {
        self.liquidity
    }

    pub fn fee_growth_global(&self) -> FeeGrowth {
        self.fee_growth
    }

    pub fn tick_info(&self, tick: i32) -> TickInfo {
        self.ticks.get(tick)
    }

    pub fn ticks(&self) -> &TickTable {
        &self.ticks
    }

    pub fn is_tick_initialized(&self, tick: i32) -> bool {
        self.bitmap.is_initialized(tick, self.tick_spacing)
    }

    pub fn position(&self, owner: Address, tick_lower: i32, tick_upper: i32) -> Option<PositionInfo> {
        self.positions
            .get(&PositionKey::new(owner, tick_lower, tick_upper))
            .copied()
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Set the starting price; allowed exactly once
    pub fn initialize(&mut self, sqrt_price_x96: U256) -> DexResult<i32> {
        if self.slot.is_some() {
            return Err(DexError::AlreadyInitialized);
        }
        let tick = TickMath::get_tick_at_sqrt_ratio(sqrt_price_x96)?;
        self.slot = Some(Slot {
            sqrt_price_x96,
            tick,
        });
        info!(pool = ?self.address, %sqrt_price_x96, tick, "V3 pool initialized");
        Ok(tick)
    }

    /// Add `amount` of liquidity to `recipient`'s position over `[tick_lower, tick_upper)`
    ///
    /// Returns the token amounts `payer` delivered, rounded up.
    #[allow(clippy::too_many_arguments)]
    pub fn mint(
        &mut self,
        ledger: &mut dyn TokenLedger,
        ctx: &CallContext,
        recipient: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
        payer: &mut dyn PaymentCallback,
    ) -> DexResult<(U256, U256)> {
        if amount == 0 {
            return Err(DexError::InvalidInput("zero liquidity"));
        }
        let key = PositionKey::new(recipient, tick_lower, tick_upper);
        let change = self.plan_modify_position(key, to_delta(amount)?)?;

        let (pool, token0, token1) = (self.address, self.key.token0, self.key.token1);
        let (amount0, amount1) = (change.amount0, change.amount1);
        atomically(ledger, |l| -> DexResult<()> {
            collect_payment(l, payer, pool, token0, amount0)?;
            collect_payment(l, payer, pool, token1, amount1)?;
            Ok(())
        })?;

        self.apply_change(change)?;
        info!(
            pool = ?self.address,
            sender = ?ctx.sender,
            owner = ?recipient,
            tick_lower,
            tick_upper,
            amount,
            %amount0,
            %amount1,
            "V3 mint"
        );
        Ok((amount0, amount1))
    }

    /// Remove `amount` of `ctx.sender`'s liquidity, crediting the underlying
    /// (rounded down) to the position's owed amounts
    ///
    /// An `amount` of zero only accrues fees.
    pub fn burn(
        &mut self,
        ctx: &CallContext,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
    ) -> DexResult<(U256, U256)> {
        let key = PositionKey::new(ctx.sender, tick_lower, tick_upper);
        let delta = to_delta(amount)?
            .checked_neg()
            .ok_or(DexError::ArithmeticOverflow)?;
        let mut change = self.plan_modify_position(key, delta)?;

        let (amount0, amount1) = (change.amount0, change.amount1);
        change.position.tokens_owed0 = change
            .position
            .tokens_owed0
            .checked_add(to_u128(amount0)?)
            .ok_or(DexError::ArithmeticOverflow)?;
        change.position.tokens_owed1 = change
            .position
            .tokens_owed1
            .checked_add(to_u128(amount1)?)
            .ok_or(DexError::ArithmeticOverflow)?;

        self.apply_change(change)?;
        info!(pool = ?self.address, owner = ?ctx.sender, tick_lower, tick_upper, amount, %amount0, %amount1, "V3 burn");
        Ok((amount0, amount1))
    }

    /// Pay out up to the requested owed amounts of `ctx.sender`'s position
    ///
    /// Fees earned since the last update are credited first when the
    /// position still holds liquidity. Collecting never changes liquidity.
    #[allow(clippy::too_many_arguments)]
    pub fn collect(
        &mut self,
        ledger: &mut dyn TokenLedger,
        ctx: &CallContext,
        recipient: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount0_requested: u128,
        amount1_requested: u128,
    ) -> DexResult<(u128, u128)> {
        let key = PositionKey::new(ctx.sender, tick_lower, tick_upper);
        let current = self
            .positions
            .get(&key)
            .copied()
            .ok_or(DexError::PositionNotFound)?;
        let change = if current.liquidity > 0 {
            Some(self.plan_modify_position(key, 0)?)
        } else {
            None
        };
        let mut position = change.as_ref().map(|c| c.position).unwrap_or(current);

        let amount0 = amount0_requested.min(position.tokens_owed0);
        let amount1 = amount1_requested.min(position.tokens_owed1);

        let (pool, token0, token1) = (self.address, self.key.token0, self.key.token1);
        atomically(ledger, |l| -> DexResult<()> {
            if amount0 > 0 {
                l.transfer(token0, pool, recipient, U256::from(amount0))?;
            }
            if amount1 > 0 {
                l.transfer(token1, pool, recipient, U256::from(amount1))?;
            }
            Ok(())
        })?;

        position.tokens_owed0 -= amount0;
        position.tokens_owed1 -= amount1;
        self.store_position(key, position);
        debug!(pool = ?self.address, owner = ?ctx.sender, amount0, amount1, "V3 collect");
        Ok((amount0, amount1))
    }

    fn check_ticks(&self, tick_lower: i32, tick_upper: i32) -> DexResult<()> {
        if tick_lower >= tick_upper {
            return Err(DexError::InvalidTickRange {
                lower: tick_lower,
                upper: tick_upper,
            });
        }
        if tick_lower < MIN_TICK {
            return Err(DexError::TickOutOfBounds(tick_lower));
        }
        if tick_upper > MAX_TICK {
            return Err(DexError::TickOutOfBounds(tick_upper));
        }
        for tick in [tick_lower, tick_upper] {
            if tick % self.tick_spacing != 0 {
                return Err(DexError::TickMisaligned {
                    tick,
                    spacing: self.tick_spacing,
                });
            }
        }
        Ok(())
    }

    fn plan_modify_position(&self, key: PositionKey, liquidity_delta: i128) -> DexResult<PositionChange> {
        let slot = self.slot.ok_or(DexError::NotInitialized)?;
        self.check_ticks(key.tick_lower, key.tick_upper)?;

        let (lower, upper) = if liquidity_delta != 0 {
            let lower = self.ticks.get(key.tick_lower).updated(
                key.tick_lower,
                slot.tick,
                liquidity_delta,
                self.fee_growth,
                false,
                self.max_liquidity_per_tick,
            )?;
            let upper = self.ticks.get(key.tick_upper).updated(
                key.tick_upper,
                slot.tick,
                liquidity_delta,
                self.fee_growth,
                true,
                self.max_liquidity_per_tick,
            )?;
            (Some(lower), Some(upper))
        } else {
            (None, None)
        };
        let lower_info = lower.map(|(info, _)| info).unwrap_or_else(|| self.ticks.get(key.tick_lower));
        let upper_info = upper.map(|(info, _)| info).unwrap_or_else(|| self.ticks.get(key.tick_upper));

        let (inside0, inside1) = fee_growth_inside(
            (&lower_info, key.tick_lower),
            (&upper_info, key.tick_upper),
            slot.tick,
            self.fee_growth,
        );
        let position = self
            .positions
            .get(&key)
            .copied()
            .unwrap_or_default()
            .updated(liquidity_delta, inside0, inside1)?;

        let mut pool_liquidity = self.liquidity;
        let (mut amount0, mut amount1) = (U256::zero(), U256::zero());
        if liquidity_delta != 0 {
            let round_up = liquidity_delta > 0;
            let magnitude = liquidity_delta.unsigned_abs();
            let sqrt_lower = TickMath::get_sqrt_ratio_at_tick(key.tick_lower)?;
            let sqrt_upper = TickMath::get_sqrt_ratio_at_tick(key.tick_upper)?;

            if slot.tick < key.tick_lower {
                amount0 = SqrtPriceMath::get_amount0_delta(sqrt_lower, sqrt_upper, magnitude, round_up)?;
            } else if slot.tick < key.tick_upper {
                amount0 =
                    SqrtPriceMath::get_amount0_delta(slot.sqrt_price_x96, sqrt_upper, magnitude, round_up)?;
                amount1 =
                    SqrtPriceMath::get_amount1_delta(sqrt_lower, slot.sqrt_price_x96, magnitude, round_up)?;
                pool_liquidity = add_delta(pool_liquidity, liquidity_delta)?;
            } else {
                amount1 = SqrtPriceMath::get_amount1_delta(sqrt_lower, sqrt_upper, magnitude, round_up)?;
            }
        }

        Ok(PositionChange {
            key,
            liquidity_delta,
            lower,
            upper,
            position,
            pool_liquidity,
            amount0,
            amount1,
        })
    }

    fn apply_change(&mut self, change: PositionChange) -> DexResult<()> {
        let removing = change.liquidity_delta < 0;
        for (tick, update) in [
            (change.key.tick_lower, change.lower),
            (change.key.tick_upper, change.upper),
        ] {
            let Some((info, flipped)) = update else {
                continue;
            };
            if flipped {
                self.bitmap.flip_tick(tick, self.tick_spacing)?;
            }
            if flipped && removing {
                self.ticks.clear(tick);
            } else {
                self.ticks.set(tick, info);
            }
        }
        self.store_position(change.key, change.position);
        self.liquidity = change.pool_liquidity;
        Ok(())
    }

    fn store_position(&mut self, key: PositionKey, position: PositionInfo) {
        if position.is_empty() {
            self.positions.remove(&key);
        } else {
            self.positions.insert(key, position);
        }
    }
}

fn to_u128(value: U256) -> DexResult<u128> {
    if value > U256::from(u128::MAX) {
        return Err(DexError::ArithmeticOverflow);
    }
    Ok(value.low_u128())
}
