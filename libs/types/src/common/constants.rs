//! Protocol-wide numeric constants

/// Basis-point fee denominator used by V1 exchanges and V2 pairs
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Fee denominator of V3 pools (hundredths of a basis point)
pub const FEE_PIPS_DENOMINATOR: u32 = 1_000_000;

/// Shares permanently locked to the zero address on a pair's first mint
pub const MINIMUM_LIQUIDITY: u64 = 1_000;
