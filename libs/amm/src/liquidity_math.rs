//! Signed liquidity deltas applied to unsigned liquidity, and the
//! liquidity a pair of token amounts buys over a price range

use crate::full_math::FullMath;
use crate::Q96;
use types::{DexError, DexResult, U256};

/// `x + y` for a signed `y`; underflow is a liquidity shortfall
pub fn add_delta(x: u128, y: i128) -> DexResult<u128> {
    if y < 0 {
        x.checked_sub(y.unsigned_abs())
            .ok_or(DexError::InsufficientLiquidity)
    } else {
        x.checked_add(y as u128).ok_or(DexError::ArithmeticOverflow)
    }
}

/// Liquidity amount as a signed delta
pub fn to_delta(liquidity: u128) -> DexResult<i128> {
    i128::try_from(liquidity).map_err(|_| DexError::ArithmeticOverflow)
}

/// Liquidity bought by `amount0` of token0 over `[sqrt_a, sqrt_b]`, rounded down
pub fn liquidity_for_amount0(sqrt_a_x96: U256, sqrt_b_x96: U256, amount0: U256) -> DexResult<u128> {
    let (lower, upper) = ordered(sqrt_a_x96, sqrt_b_x96)?;
    let intermediate = FullMath::mul_div(lower, upper, Q96)?;
    to_u128(FullMath::mul_div(amount0, intermediate, upper - lower)?)
}

/// Liquidity bought by `amount1` of token1 over `[sqrt_a, sqrt_b]`, rounded down
pub fn liquidity_for_amount1(sqrt_a_x96: U256, sqrt_b_x96: U256, amount1: U256) -> DexResult<u128> {
    let (lower, upper) = ordered(sqrt_a_x96, sqrt_b_x96)?;
    to_u128(FullMath::mul_div(amount1, Q96, upper - lower)?)
}

/// Largest liquidity that neither amount limits, given the current price
pub fn liquidity_for_amounts(
    sqrt_price_x96: U256,
    sqrt_a_x96: U256,
    sqrt_b_x96: U256,
    amount0: U256,
    amount1: U256,
) -> DexResult<u128> {
    let (lower, upper) = ordered(sqrt_a_x96, sqrt_b_x96)?;
    if sqrt_price_x96 <= lower {
        liquidity_for_amount0(lower, upper, amount0)
    } else if sqrt_price_x96 < upper {
        let by0 = liquidity_for_amount0(sqrt_price_x96, upper, amount0)?;
        let by1 = liquidity_for_amount1(lower, sqrt_price_x96, amount1)?;
        Ok(by0.min(by1))
    } else {
        liquidity_for_amount1(lower, upper, amount1)
    }
}

fn ordered(a: U256, b: U256) -> DexResult<(U256, U256)> {
    let (lower, upper) = if a < b { (a, b) } else { (b, a) };
    if lower == upper {
        return Err(DexError::InvalidInput("empty price range"));
    }
    Ok((lower, upper))
}

fn to_u128(value: U256) -> DexResult<u128> {
    if value > U256::from(u128::MAX) {
        return Err(DexError::ArithmeticOverflow);
    }
    Ok(value.low_u128())
}
