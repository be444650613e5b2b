//! One step of a concentrated-liquidity swap
//!
//! A step moves the price from `sqrt_price_current` towards
//! `sqrt_price_target` (the next initialized tick or the caller's limit,
//! whichever is nearer) inside a single liquidity range.

use crate::full_math::FullMath;
use crate::sqrt_price_math::SqrtPriceMath;
use crate::FEE_PIPS_DENOMINATOR;
use tracing::trace;
use types::{DexResult, U256};

/// Outcome of [`compute_swap_step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapStep {
    pub sqrt_price_next_x96: U256,
    /// Input consumed by the price move, excluding the fee
    pub amount_in: U256,
    pub amount_out: U256,
    pub fee_amount: U256,
}

/// Compute how far a single step can go
///
/// `amount_remaining` is the unconsumed input (`exact_in`) or the
/// still-undelivered output. The direction is implied by the target:
/// a target at or below the current price is a token0 → token1 swap.
pub fn compute_swap_step(
    sqrt_price_current_x96: U256,
    sqrt_price_target_x96: U256,
    liquidity: u128,
    amount_remaining: U256,
    exact_in: bool,
    fee_pips: u32,
) -> DexResult<SwapStep> {
    let zero_for_one = sqrt_price_current_x96 >= sqrt_price_target_x96;
    let fee = U256::from(fee_pips);
    let fee_complement = U256::from(FEE_PIPS_DENOMINATOR - fee_pips);

    let mut amount_in = U256::zero();
    let mut amount_out = U256::zero();
    let sqrt_price_next_x96;

    if exact_in {
        let remaining_less_fee = FullMath::mul_div(
            amount_remaining,
            fee_complement,
            U256::from(FEE_PIPS_DENOMINATOR),
        )?;
        amount_in = if zero_for_one {
            SqrtPriceMath::get_amount0_delta(sqrt_price_target_x96, sqrt_price_current_x96, liquidity, true)?
        } else {
            SqrtPriceMath::get_amount1_delta(sqrt_price_current_x96, sqrt_price_target_x96, liquidity, true)?
        };
        sqrt_price_next_x96 = if remaining_less_fee >= amount_in {
            sqrt_price_target_x96
        } else {
            SqrtPriceMath::get_next_sqrt_price_from_input(
                sqrt_price_current_x96,
                liquidity,
                remaining_less_fee,
                zero_for_one,
            )?
        };
    } else {
        amount_out = if zero_for_one {
            SqrtPriceMath::get_amount1_delta(sqrt_price_target_x96, sqrt_price_current_x96, liquidity, false)?
        } else {
            SqrtPriceMath::get_amount0_delta(sqrt_price_current_x96, sqrt_price_target_x96, liquidity, false)?
        };
        sqrt_price_next_x96 = if amount_remaining >= amount_out {
            sqrt_price_target_x96
        } else {
            SqrtPriceMath::get_next_sqrt_price_from_output(
                sqrt_price_current_x96,
                liquidity,
                amount_remaining,
                zero_for_one,
            )?
        };
    }

    let reached_target = sqrt_price_next_x96 == sqrt_price_target_x96;

    if zero_for_one {
        if !(reached_target && exact_in) {
            amount_in = SqrtPriceMath::get_amount0_delta(
                sqrt_price_next_x96,
                sqrt_price_current_x96,
                liquidity,
                true,
            )?;
        }
        if !(reached_target && !exact_in) {
            amount_out = SqrtPriceMath::get_amount1_delta(
                sqrt_price_next_x96,
                sqrt_price_current_x96,
                liquidity,
                false,
            )?;
        }
    } else {
        if !(reached_target && exact_in) {
            amount_in = SqrtPriceMath::get_amount1_delta(
                sqrt_price_current_x96,
                sqrt_price_next_x96,
                liquidity,
                true,
            )?;
        }
        if !(reached_target && !exact_in) {
            amount_out = SqrtPriceMath::get_amount0_delta(
                sqrt_price_current_x96,
                sqrt_price_next_x96,
                liquidity,
                false,
            )?;
        }
    }

    // exact output never delivers more than was asked for
    if !exact_in && amount_out > amount_remaining {
        amount_out = amount_remaining;
    }

    let fee_amount = if exact_in && !reached_target {
        // the remainder of the input is all fee
        amount_remaining - amount_in
    } else {
        FullMath::mul_div_rounding_up(amount_in, fee, fee_complement)?
    };

    trace!(
        %sqrt_price_next_x96,
        %amount_in,
        %amount_out,
        %fee_amount,
        reached_target,
        "swap step"
    );

    Ok(SwapStep {
        sqrt_price_next_x96,
        amount_in,
        amount_out,
        fee_amount,
    })
}
