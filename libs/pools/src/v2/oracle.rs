//! Time-weighted price accumulators
//!
//! Prices are UQ112x112 (`reserve_other * 2^112 / reserve`) summed once per
//! elapsed second. Both the accumulators and the 32-bit timestamp wrap on
//! overflow; consumers difference two observations.

use types::U256;

/// Largest reserve a pair may hold
pub const MAX_RESERVE: U256 = U256([u64::MAX, 0xffff_ffff_ffff, 0, 0]);

const Q112: usize = 112;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceAccumulator {
    pub price0_cumulative_last: U256,
    pub price1_cumulative_last: U256,
    pub block_timestamp_last: u32,
}

impl PriceAccumulator {
    /// Accrue prices at the old reserves for the time since the last update
    pub fn update(&mut self, reserve0: U256, reserve1: U256, timestamp: u64) {
        let now = block_timestamp(timestamp);
        let elapsed = now.wrapping_sub(self.block_timestamp_last);
        if elapsed > 0 && !reserve0.is_zero() && !reserve1.is_zero() {
            let elapsed = U256::from(elapsed);
            let price0 = (reserve1 << Q112) / reserve0;
            let price1 = (reserve0 << Q112) / reserve1;
            self.price0_cumulative_last = self
                .price0_cumulative_last
                .overflowing_add(price0.overflowing_mul(elapsed).0)
                .0;
            self.price1_cumulative_last = self
                .price1_cumulative_last
                .overflowing_add(price1.overflowing_mul(elapsed).0)
                .0;
        }
        self.block_timestamp_last = now;
    }
}

/// Block time truncated to 32 bits
pub fn block_timestamp(timestamp: u64) -> u32 {
    (timestamp % (1u64 << 32)) as u32
}
