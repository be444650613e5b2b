//! Swap loop of the concentrated pool
//!
//! [`ConcentratedPool::simulate_swap`] runs the whole loop against the
//! committed state without touching it; quoting uses it directly and
//! [`ConcentratedPool::swap`] settles its outcome through the ledger before
//! writing it back.

use super::callback::{collect_payment, PaymentCallback};
use super::pool::{ConcentratedPool, Slot};
use super::tick::FeeGrowth;
use amm::liquidity_math::add_delta;
use amm::{compute_swap_step, AmmPool, FullMath, TickMath, MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK, Q128};
use tokens::{atomically, TokenLedger};
use tracing::{debug, trace};
use types::{Address, CallContext, DexError, DexResult, ProtocolVersion, U256};

/// What the caller fixes about a swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapAmount {
    /// Sell exactly this much of the input token (fee included)
    ExactIn(U256),
    /// Receive exactly this much of the output token
    ExactOut(U256),
}

impl SwapAmount {
    fn value(self) -> U256 {
        match self {
            SwapAmount::ExactIn(amount) | SwapAmount::ExactOut(amount) => amount,
        }
    }

    fn is_exact_in(self) -> bool {
        matches!(self, SwapAmount::ExactIn(_))
    }
}

/// Fee growth snapshot written to a tick when the price crosses it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickCrossing {
    pub tick: i32,
    pub fee_growth_outside0_x128: U256,
    pub fee_growth_outside1_x128: U256,
}

/// Result of running the swap loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOutcome {
    pub zero_for_one: bool,
    /// Input owed to the pool, fee included
    pub amount_in: U256,
    pub amount_out: U256,
    /// Part of the specified amount left unfilled at the price limit
    pub amount_remaining: U256,
    pub sqrt_price_x96: U256,
    pub tick: i32,
    pub liquidity: u128,
    pub fee_growth: FeeGrowth,
    /// Initialized ticks crossed, in the order they were crossed
    pub crossings: Vec<TickCrossing>,
    pub steps: u32,
}

impl ConcentratedPool {
    /// Default price limit: as far as the price can move in the swap direction
    pub fn default_price_limit(zero_for_one: bool) -> U256 {
        if zero_for_one {
            MIN_SQRT_RATIO + U256::one()
        } else {
            MAX_SQRT_RATIO - U256::one()
        }
    }

    /// Run the swap loop against the committed state
    pub fn simulate_swap(
        &self,
        zero_for_one: bool,
        amount: SwapAmount,
        sqrt_price_limit_x96: Option<U256>,
    ) -> DexResult<SwapOutcome> {
        let slot = self.slot.ok_or(DexError::NotInitialized)?;
        if amount.value().is_zero() {
            return Err(DexError::InvalidInput("zero amount"));
        }
        let limit = sqrt_price_limit_x96.unwrap_or_else(|| Self::default_price_limit(zero_for_one));
        let limit_ok = if zero_for_one {
            limit < slot.sqrt_price_x96 && limit > MIN_SQRT_RATIO
        } else {
            limit > slot.sqrt_price_x96 && limit < MAX_SQRT_RATIO
        };
        if !limit_ok {
            return Err(DexError::InvalidPriceLimit(limit));
        }

        let exact_in = amount.is_exact_in();
        let mut remaining = amount.value();
        let mut amount_in = U256::zero();
        let mut amount_out = U256::zero();
        let mut sqrt_price = slot.sqrt_price_x96;
        let mut tick = slot.tick;
        let mut liquidity = self.liquidity;
        // growth of the input token; the other side is unchanged by this swap
        let mut fee_growth_in = if zero_for_one {
            self.fee_growth.global0_x128
        } else {
            self.fee_growth.global1_x128
        };
        let mut crossings = Vec::new();
        let mut steps = 0u32;

        while !remaining.is_zero() && sqrt_price != limit {
            steps += 1;
            if steps > self.max_swap_steps {
                return Err(DexError::StepLimitExceeded(self.max_swap_steps));
            }

            let (tick_next, initialized) =
                match self.bitmap.next_initialized_tick(tick, self.tick_spacing, zero_for_one)? {
                    Some(next) => (next, true),
                    None if liquidity == 0 => return Err(DexError::InsufficientLiquidity),
                    None => (if zero_for_one { MIN_TICK } else { MAX_TICK }, false),
                };
            let sqrt_price_next = TickMath::get_sqrt_ratio_at_tick(tick_next)?;
            let target = if zero_for_one {
                sqrt_price_next.max(limit)
            } else {
                sqrt_price_next.min(limit)
            };

            let step = compute_swap_step(sqrt_price, target, liquidity, remaining, exact_in, self.key.fee)?;
            let step_start = sqrt_price;
            sqrt_price = step.sqrt_price_next_x96;

            let paid = step
                .amount_in
                .checked_add(step.fee_amount)
                .ok_or(DexError::ArithmeticOverflow)?;
            amount_in = amount_in.checked_add(paid).ok_or(DexError::ArithmeticOverflow)?;
            amount_out = amount_out
                .checked_add(step.amount_out)
                .ok_or(DexError::ArithmeticOverflow)?;
            remaining -= if exact_in { paid } else { step.amount_out };

            if liquidity > 0 {
                let growth = FullMath::mul_div(step.fee_amount, Q128, U256::from(liquidity))?;
                fee_growth_in = fee_growth_in.overflowing_add(growth).0;
            }

            if sqrt_price == sqrt_price_next {
                if initialized {
                    let growth = self.growth_with(zero_for_one, fee_growth_in);
                    let info = self.ticks.get(tick_next);
                    let (outside0, outside1) = info.crossed(growth);
                    crossings.push(TickCrossing {
                        tick: tick_next,
                        fee_growth_outside0_x128: outside0,
                        fee_growth_outside1_x128: outside1,
                    });
                    let net = if zero_for_one {
                        info.liquidity_net
                            .checked_neg()
                            .ok_or(DexError::ArithmeticOverflow)?
                    } else {
                        info.liquidity_net
                    };
                    liquidity = add_delta(liquidity, net)?;
                    trace!(pool = ?self.address, tick = tick_next, net, liquidity, "crossed tick");
                }
                tick = if zero_for_one { tick_next - 1 } else { tick_next };
            } else if sqrt_price != step_start {
                tick = TickMath::get_tick_at_sqrt_ratio(sqrt_price)?;
            }
        }

        Ok(SwapOutcome {
            zero_for_one,
            amount_in,
            amount_out,
            amount_remaining: remaining,
            sqrt_price_x96: sqrt_price,
            tick,
            liquidity,
            fee_growth: self.growth_with(zero_for_one, fee_growth_in),
            crossings,
            steps,
        })
    }

    /// Swap against the pool, sending output to `recipient` and collecting
    /// input from `payer`
    #[allow(clippy::too_many_arguments)]
    pub fn swap(
        &mut self,
        ledger: &mut dyn TokenLedger,
        ctx: &CallContext,
        recipient: Address,
        zero_for_one: bool,
        amount: SwapAmount,
        sqrt_price_limit_x96: Option<U256>,
        payer: &mut dyn PaymentCallback,
    ) -> DexResult<SwapOutcome> {
        let outcome = self.simulate_swap(zero_for_one, amount, sqrt_price_limit_x96)?;
        let (token_in, token_out) = if zero_for_one {
            (self.key.token0, self.key.token1)
        } else {
            (self.key.token1, self.key.token0)
        };
        let pool = self.address;
        let (amount_in, amount_out) = (outcome.amount_in, outcome.amount_out);

        atomically(ledger, |l| -> DexResult<()> {
            if !amount_out.is_zero() {
                l.transfer(token_out, pool, recipient, amount_out)?;
            }
            collect_payment(l, payer, pool, token_in, amount_in)
        })?;

        self.apply_swap(&outcome);
        debug!(
            pool = ?self.address,
            sender = ?ctx.sender,
            zero_for_one,
            %amount_in,
            %amount_out,
            tick = outcome.tick,
            crossed = outcome.crossings.len(),
            "V3 swap"
        );
        Ok(outcome)
    }

    /// Output for selling exactly `amount_in`; fails unless fully filled
    pub fn quote_exact_input(&self, zero_for_one: bool, amount_in: U256) -> DexResult<U256> {
        let outcome = self.simulate_swap(zero_for_one, SwapAmount::ExactIn(amount_in), None)?;
        if !outcome.amount_remaining.is_zero() {
            return Err(DexError::InsufficientLiquidity);
        }
        Ok(outcome.amount_out)
    }

    /// Input needed to receive exactly `amount_out`; fails unless fully filled
    pub fn quote_exact_output(&self, zero_for_one: bool, amount_out: U256) -> DexResult<U256> {
        let outcome = self.simulate_swap(zero_for_one, SwapAmount::ExactOut(amount_out), None)?;
        if !outcome.amount_remaining.is_zero() {
            return Err(DexError::InsufficientLiquidity);
        }
        Ok(outcome.amount_in)
    }

    fn apply_swap(&mut self, outcome: &SwapOutcome) {
        for crossing in &outcome.crossings {
            self.ticks.cross(
                crossing.tick,
                crossing.fee_growth_outside0_x128,
                crossing.fee_growth_outside1_x128,
            );
        }
        self.slot = Some(Slot {
            sqrt_price_x96: outcome.sqrt_price_x96,
            tick: outcome.tick,
        });
        self.liquidity = outcome.liquidity;
        self.fee_growth = outcome.fee_growth;
    }

    fn growth_with(&self, zero_for_one: bool, fee_growth_in: U256) -> FeeGrowth {
        if zero_for_one {
            FeeGrowth {
                global0_x128: fee_growth_in,
                global1_x128: self.fee_growth.global1_x128,
            }
        } else {
            FeeGrowth {
                global0_x128: self.fee_growth.global0_x128,
                global1_x128: fee_growth_in,
            }
        }
    }

    fn direction(&self, token_in: Address) -> DexResult<bool> {
        if token_in == self.key.token0 {
            Ok(true)
        } else if token_in == self.key.token1 {
            Ok(false)
        } else {
            Err(DexError::InvalidInput("token is not part of this pool"))
        }
    }
}

impl AmmPool for ConcentratedPool {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V3
    }

    fn quote_exact_in(&self, token_in: Address, amount_in: U256) -> DexResult<U256> {
        let zero_for_one = self.direction(token_in)?;
        self.quote_exact_input(zero_for_one, amount_in)
    }

    fn quote_exact_out(&self, token_out: Address, amount_out: U256) -> DexResult<U256> {
        // buying token1 means selling token0
        let zero_for_one = !self.direction(token_out)?;
        self.quote_exact_output(zero_for_one, amount_out)
    }

    fn fee_pips(&self) -> u32 {
        self.key.fee
    }
}
