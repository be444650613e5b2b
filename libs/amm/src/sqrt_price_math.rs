//! Price movement and token deltas over a liquidity range
//!
//! Rounding is always in the pool's favour: amounts owed to the pool round
//! up, amounts paid out of the pool round down, and the next price is
//! rounded so that it never over-credits the trader.

use crate::full_math::FullMath;
use crate::{MAX_U160, Q96, RESOLUTION};
use types::{DexError, DexResult, U256};

/// Sqrt-price arithmetic for concentrated liquidity
pub struct SqrtPriceMath;

impl SqrtPriceMath {
    /// Next sqrt price after adding (`add`) or removing token0, rounded up
    ///
    /// `L * √P / (L ± Δx * √P)`, falling back to `L / (L/√P ± Δx)` when the
    /// product overflows.
    pub fn get_next_sqrt_price_from_amount0_rounding_up(
        sqrt_price_x96: U256,
        liquidity: u128,
        amount: U256,
        add: bool,
    ) -> DexResult<U256> {
        if amount.is_zero() {
            return Ok(sqrt_price_x96);
        }
        let numerator1 = U256::from(liquidity) << RESOLUTION;
        let (product, overflowed) = amount.overflowing_mul(sqrt_price_x96);

        if add {
            if !overflowed {
                let (denominator, wrapped) = numerator1.overflowing_add(product);
                if !wrapped {
                    return FullMath::mul_div_rounding_up(numerator1, sqrt_price_x96, denominator);
                }
            }
            let denominator = (numerator1 / sqrt_price_x96)
                .checked_add(amount)
                .ok_or(DexError::ArithmeticOverflow)?;
            FullMath::div_rounding_up(numerator1, denominator)
        } else {
            if overflowed || numerator1 <= product {
                return Err(DexError::InsufficientLiquidity);
            }
            let denominator = numerator1 - product;
            let next = FullMath::mul_div_rounding_up(numerator1, sqrt_price_x96, denominator)?;
            if next > MAX_U160 {
                return Err(DexError::ArithmeticOverflow);
            }
            Ok(next)
        }
    }

    /// Next sqrt price after adding or removing token1, rounded down
    ///
    /// `√P ± Δy / L`
    pub fn get_next_sqrt_price_from_amount1_rounding_down(
        sqrt_price_x96: U256,
        liquidity: u128,
        amount: U256,
        add: bool,
    ) -> DexResult<U256> {
        let liquidity = U256::from(liquidity);
        if add {
            let quotient = if amount <= MAX_U160 {
                (amount << RESOLUTION) / liquidity
            } else {
                FullMath::mul_div(amount, Q96, liquidity)?
            };
            let next = sqrt_price_x96
                .checked_add(quotient)
                .ok_or(DexError::ArithmeticOverflow)?;
            if next > MAX_U160 {
                return Err(DexError::ArithmeticOverflow);
            }
            Ok(next)
        } else {
            let quotient = if amount <= MAX_U160 {
                FullMath::div_rounding_up(amount << RESOLUTION, liquidity)?
            } else {
                FullMath::mul_div_rounding_up(amount, Q96, liquidity)?
            };
            if sqrt_price_x96 <= quotient {
                return Err(DexError::InsufficientLiquidity);
            }
            Ok(sqrt_price_x96 - quotient)
        }
    }

    /// Next sqrt price given an input amount of token0 (`zero_for_one`) or token1
    pub fn get_next_sqrt_price_from_input(
        sqrt_price_x96: U256,
        liquidity: u128,
        amount_in: U256,
        zero_for_one: bool,
    ) -> DexResult<U256> {
        if sqrt_price_x96.is_zero() || liquidity == 0 {
            return Err(DexError::InsufficientLiquidity);
        }
        if zero_for_one {
            Self::get_next_sqrt_price_from_amount0_rounding_up(sqrt_price_x96, liquidity, amount_in, true)
        } else {
            Self::get_next_sqrt_price_from_amount1_rounding_down(sqrt_price_x96, liquidity, amount_in, true)
        }
    }

    /// Next sqrt price given an output amount of token1 (`zero_for_one`) or token0
    pub fn get_next_sqrt_price_from_output(
        sqrt_price_x96: U256,
        liquidity: u128,
        amount_out: U256,
        zero_for_one: bool,
    ) -> DexResult<U256> {
        if sqrt_price_x96.is_zero() || liquidity == 0 {
            return Err(DexError::InsufficientLiquidity);
        }
        if zero_for_one {
            Self::get_next_sqrt_price_from_amount1_rounding_down(sqrt_price_x96, liquidity, amount_out, false)
        } else {
            Self::get_next_sqrt_price_from_amount0_rounding_up(sqrt_price_x96, liquidity, amount_out, false)
        }
    }

    /// token0 between two prices: `L * (√Pb - √Pa) / (√Pa * √Pb)`
    pub fn get_amount0_delta(
        sqrt_ratio_a_x96: U256,
        sqrt_ratio_b_x96: U256,
        liquidity: u128,
        round_up: bool,
    ) -> DexResult<U256> {
        let (lower, upper) = if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
            (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
        } else {
            (sqrt_ratio_a_x96, sqrt_ratio_b_x96)
        };
        if lower.is_zero() {
            return Err(DexError::InvalidSqrtPrice(lower));
        }
        let numerator1 = U256::from(liquidity) << RESOLUTION;
        let numerator2 = upper - lower;

        if round_up {
            let scaled = FullMath::mul_div_rounding_up(numerator1, numerator2, upper)?;
            FullMath::div_rounding_up(scaled, lower)
        } else {
            Ok(FullMath::mul_div(numerator1, numerator2, upper)? / lower)
        }
    }

    /// token1 between two prices: `L * (√Pb - √Pa)`
    pub fn get_amount1_delta(
        sqrt_ratio_a_x96: U256,
        sqrt_ratio_b_x96: U256,
        liquidity: u128,
        round_up: bool,
    ) -> DexResult<U256> {
        let (lower, upper) = if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
            (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
        } else {
            (sqrt_ratio_a_x96, sqrt_ratio_b_x96)
        };
        let liquidity = U256::from(liquidity);
        if round_up {
            FullMath::mul_div_rounding_up(liquidity, upper - lower, Q96)
        } else {
            FullMath::mul_div(liquidity, upper - lower, Q96)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tick_math::TickMath;

    /// sqrt(reserve1 / reserve0) * 2^96 for small integer ratios
    fn encode_price_sqrt(reserve1: u64, reserve0: u64) -> U256 {
        crate::sqrt_math::sqrt_floor((U256::from(reserve1) << 192usize) / U256::from(reserve0))
    }

    #[test]
    fn test_zero_amount_returns_input_price() {
        let price = encode_price_sqrt(1, 1);
        assert_eq!(
            SqrtPriceMath::get_next_sqrt_price_from_input(price, 1_000, U256::zero(), true).unwrap(),
            price
        );
        assert_eq!(
            SqrtPriceMath::get_next_sqrt_price_from_input(price, 1_000, U256::zero(), false).unwrap(),
            price
        );
    }

    #[test]
    fn test_input_moves_price_in_swap_direction() {
        let price = encode_price_sqrt(1, 1);
        let liquidity: u128 = 10u128.pow(18);
        let amount = U256::exp10(17);

        // 0.1 token1 in at L=1, P=1: √P' = 1.1 * 2^96
        let up = SqrtPriceMath::get_next_sqrt_price_from_input(price, liquidity, amount, false).unwrap();
        assert_eq!(up, U256::from_dec_str("87150978765690771352898345369").unwrap());

        // 0.1 token0 in: √P' = 1/1.1 * 2^96, rounded up
        let down = SqrtPriceMath::get_next_sqrt_price_from_input(price, liquidity, amount, true).unwrap();
        assert_eq!(down, U256::from_dec_str("72025602285694852357767227579").unwrap());
    }

    #[test]
    fn test_output_exceeding_virtual_reserves_fails() {
        let price = encode_price_sqrt(1, 1);
        // 4 token0 out of L=2 at P=1 would need more than the virtual reserve of 2
        assert_eq!(
            SqrtPriceMath::get_next_sqrt_price_from_output(price, 2, U256::from(4u64), false),
            Err(DexError::InsufficientLiquidity)
        );
        assert_eq!(
            SqrtPriceMath::get_next_sqrt_price_from_output(price, 1, U256::from(1u64), true),
            Err(DexError::InsufficientLiquidity)
        );
    }

    #[test]
    fn test_zero_liquidity_rejected() {
        assert_eq!(
            SqrtPriceMath::get_next_sqrt_price_from_input(Q96, 0, U256::one(), true),
            Err(DexError::InsufficientLiquidity)
        );
    }

    #[test]
    fn test_amount_deltas_round_in_pool_favour() {
        let a = encode_price_sqrt(1, 1);
        let b = encode_price_sqrt(121, 100);
        let liquidity: u128 = 10u128.pow(18);

        let amount0_up = SqrtPriceMath::get_amount0_delta(a, b, liquidity, true).unwrap();
        let amount0_down = SqrtPriceMath::get_amount0_delta(a, b, liquidity, false).unwrap();
        assert_eq!(amount0_up, U256::from_dec_str("90909090909090910").unwrap());
        assert_eq!(amount0_down, amount0_up - U256::one());

        let amount1_up = SqrtPriceMath::get_amount1_delta(a, b, liquidity, true).unwrap();
        let amount1_down = SqrtPriceMath::get_amount1_delta(a, b, liquidity, false).unwrap();
        assert_eq!(amount1_up, U256::from_dec_str("100000000000000000").unwrap());
        assert_eq!(amount1_down, amount1_up - U256::one());

        // argument order is irrelevant
        assert_eq!(
            SqrtPriceMath::get_amount0_delta(b, a, liquidity, true).unwrap(),
            amount0_up
        );
    }

    #[test]
    fn test_zero_width_range_has_no_amounts() {
        let p = TickMath::get_sqrt_ratio_at_tick(100).unwrap();
        assert!(SqrtPriceMath::get_amount0_delta(p, p, 1_000_000, true)
            .unwrap()
            .is_zero());
        assert!(SqrtPriceMath::get_amount1_delta(p, p, 1_000_000, true)
            .unwrap()
            .is_zero());
    }
}
