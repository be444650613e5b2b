//! Protocol constants and fee-tier defaults
//!
//! Denominators and the minimum-liquidity lock live in `types` so the math
//! crate can use them; they are re-exported here next to the defaults that
//! depend on them.

pub use types::{BPS_DENOMINATOR, FEE_PIPS_DENOMINATOR, MINIMUM_LIQUIDITY};

/// Swap fee of V1 exchanges and V2 pairs, in basis points
pub const DEFAULT_SWAP_FEE_BPS: u32 = 30;

/// Exclusive upper bound on a fee tier's tick spacing
pub const MAX_TICK_SPACING: i32 = 16_384;

/// V3 fee tiers enabled when a registry is created
pub mod fee_tiers {
    /// 0.05%
    pub const LOW: (u32, i32) = (500, 10);

    /// 0.3%
    pub const MEDIUM: (u32, i32) = (3_000, 60);

    /// 1%
    pub const HIGH: (u32, i32) = (10_000, 200);

    pub const DEFAULTS: [(u32, i32); 3] = [LOW, MEDIUM, HIGH];
}

/// Router defaults
pub mod routing {
    /// Longest token path `swap_exact_in_path` accepts
    pub const MAX_HOPS: usize = 4;

    /// Ceiling on tick-crossing steps in a single V3 swap
    pub const MAX_SWAP_STEPS: u32 = 10_000;
}
