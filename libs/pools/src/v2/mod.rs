//! V2: constant-product pairs of two arbitrary tokens
//!
//! Each pair mints its own liquidity shares, accumulates time-weighted
//! prices, and can route a share of swap fees to a protocol recipient.

mod oracle;
mod pair;

pub use oracle::{block_timestamp, PriceAccumulator, MAX_RESERVE};
pub use pair::{Deposit, FeeSwitch, FlashCallback, PairMarket};
