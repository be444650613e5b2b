//! # AMM Library - Exact Reserve Mathematics
//!
//! ## Purpose
//!
//! Integer fixed-point arithmetic behind the three exchange engines:
//! full-precision multiply-divide, square roots, bit scans, constant-product
//! pricing for the V1 and V2 engines, and the tick / sqrt-price / swap-step
//! math of the concentrated-liquidity V3 engine. Every function is pure and
//! exact; the rounding direction of each call is part of its contract.
//!
//! ## Integration Points
//!
//! - **Callers**: `pools` engines (swap, mint, burn) and the `router` quoting path
//! - **Number Types**: `U256` amounts and Q64.96 prices, `u128` liquidity, `i32` ticks
//! - **Errors**: every fallible function returns `types::DexResult`
//!
//! ## Rounding Contract
//!
//! | call site                         | direction |
//! |-----------------------------------|-----------|
//! | amount owed to a pool             | up        |
//! | amount paid out of a pool         | down      |
//! | next price after an input         | against the trader |
//! | V2 first-mint `sqrt(x*y)`         | down      |

pub mod bit_math;
pub mod full_math;
pub mod liquidity_math;
pub mod pool_traits;
pub mod sqrt_math;
pub mod sqrt_price_math;
pub mod swap_math;
pub mod tick_math;
pub mod v2_math;

pub use full_math::FullMath;
pub use pool_traits::AmmPool;
pub use sqrt_price_math::SqrtPriceMath;
pub use swap_math::{compute_swap_step, SwapStep};
pub use tick_math::{TickMath, MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK};
pub use v2_math::{ReservePair, V2Math};

pub use types::{BPS_DENOMINATOR, FEE_PIPS_DENOMINATOR};

use types::U256;

/// Fractional bits of a Q64.96 sqrt price
pub const RESOLUTION: usize = 96;
/// `2^96`
pub const Q96: U256 = U256([0, 1 << 32, 0, 0]);
/// `2^128`, the fee-growth fixed-point unit
pub const Q128: U256 = U256([0, 0, 1, 0]);
/// `2^160 - 1`, the largest storable sqrt price
pub const MAX_U160: U256 = U256([u64::MAX, u64::MAX, 0xffff_ffff, 0]);
