//! Tick ↔ sqrt-price conversion in Q64.96
//!
//! `sqrt_price(tick) = sqrt(1.0001^tick) * 2^96`. The forward direction uses
//! the binary decomposition of `|tick|` with precomputed Q128.128 factors
//! `1 / sqrt(1.0001^(2^i))`; the reverse direction binary-searches the
//! forward map, so both directions agree exactly.

use types::{DexError, DexResult, U256};

/// Lowest tick: `log_1.0001(2^-128)`
pub const MIN_TICK: i32 = -887272;
/// Highest tick: `log_1.0001(2^128)`
pub const MAX_TICK: i32 = -MIN_TICK;

/// `get_sqrt_ratio_at_tick(MIN_TICK)`
pub const MIN_SQRT_RATIO: U256 = U256([4295128739, 0, 0, 0]);
/// `get_sqrt_ratio_at_tick(MAX_TICK)` = 1461446703485210103287273052203988822378723970342
pub const MAX_SQRT_RATIO: U256 = U256([0x5d951d5263988d26, 0xefd1fc6a50648849, 0xfffd8963, 0]);

const TICK_FACTORS: [u128; 19] = [
    0xfff97272373d413259a46990580e213a,
    0xfff2e50f5f656932ef12357cf3c7fdcc,
    0xffe5caca7e10e4e61c3624eaa0941cd0,
    0xffcb9843d60f6159c9db58835c926644,
    0xff973b41fa98c081472e6896dfb254c0,
    0xff2ea16466c96a3843ec78b326b52861,
    0xfe5dee046a99a2a811c461f1969c3053,
    0xfcbe86c7900a88aedcffc83b479aa3a4,
    0xf987a7253ac413176f2b074cf7815e54,
    0xf3392b0822b70005940c7a398e4b70f3,
    0xe7159475a2c29b7443b29c7fa6e889d9,
    0xd097f3bdfd2022b8845ad8f792aa5825,
    0xa9f746462d870fdf8a65dc1f90e061e5,
    0x70d869a156d2a1b890bb3df62baf32f7,
    0x31be135f97d08fd981231505542fcfa6,
    0x9aa508b5b7a84e1c677de54f3e99bc9,
    0x5d6af8dedb81196699c329225ee604,
    0x2216e584f5fa1ea926041bedfe98,
    0x48a170391f7dc42444e8fa2,
];

/// Tick/price conversions
pub struct TickMath;

impl TickMath {
    /// Sqrt price (Q64.96) at `tick`, rounded up
    pub fn get_sqrt_ratio_at_tick(tick: i32) -> DexResult<U256> {
        if !(MIN_TICK..=MAX_TICK).contains(&tick) {
            return Err(DexError::TickOutOfBounds(tick));
        }
        let abs_tick = tick.unsigned_abs();

        let mut ratio = if abs_tick & 0x1 != 0 {
            U256::from(0xfffcb933bd6fad37aa2d162d1a594001u128)
        } else {
            U256::one() << 128usize
        };
        for (bit, factor) in TICK_FACTORS.iter().enumerate() {
            if abs_tick & (0x2 << bit) != 0 {
                // both operands < 2^129, so the product stays below 2^256
                ratio = (ratio * U256::from(*factor)) >> 128usize;
            }
        }

        if tick > 0 {
            ratio = U256::MAX / ratio;
        }

        // Q128.128 -> Q64.96, rounding up so the result is never below the true price
        let low_mask = (U256::one() << 32usize) - U256::one();
        let rounded = if (ratio & low_mask).is_zero() {
            ratio >> 32usize
        } else {
            (ratio >> 32usize) + U256::one()
        };
        Ok(rounded)
    }

    /// Greatest tick whose sqrt price is `<= sqrt_price_x96`
    ///
    /// Valid for `MIN_SQRT_RATIO <= sqrt_price_x96 < MAX_SQRT_RATIO`.
    pub fn get_tick_at_sqrt_ratio(sqrt_price_x96: U256) -> DexResult<i32> {
        if sqrt_price_x96 < MIN_SQRT_RATIO || sqrt_price_x96 >= MAX_SQRT_RATIO {
            return Err(DexError::InvalidSqrtPrice(sqrt_price_x96));
        }
        let mut low = MIN_TICK;
        let mut high = MAX_TICK;
        while low < high {
            let mid = low + (high - low + 1) / 2;
            if Self::get_sqrt_ratio_at_tick(mid)? <= sqrt_price_x96 {
                low = mid;
            } else {
                high = mid - 1;
            }
        }
        Ok(low)
    }

    /// Lowest and highest ticks usable at `tick_spacing`
    pub fn usable_bounds(tick_spacing: i32) -> (i32, i32) {
        let min = (MIN_TICK / tick_spacing) * tick_spacing;
        let max = (MAX_TICK / tick_spacing) * tick_spacing;
        (min, max)
    }

    /// Largest liquidity any single tick may reference so that the sum over
    /// every usable tick still fits in `u128`
    pub fn max_liquidity_per_tick(tick_spacing: i32) -> u128 {
        let (min, max) = Self::usable_bounds(tick_spacing);
        let num_ticks = ((max - min) / tick_spacing) as u128 + 1;
        u128::MAX / num_ticks
    }
}
