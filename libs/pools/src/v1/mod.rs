//! V1: one bonding-curve exchange per token, always paired with the native coin
//!
//! Token-to-token swaps chain two exchanges through the native coin; the
//! router drives those hops.

mod exchange;

pub use exchange::{BondingExchange, LiquidityChange};
