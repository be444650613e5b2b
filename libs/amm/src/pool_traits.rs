//! Pool trait definitions for a unified quoting interface

use crate::v2_math::{ReservePair, V2Math};
use crate::BPS_DENOMINATOR;
use crate::FEE_PIPS_DENOMINATOR;
use types::{Address, DexResult, ProtocolVersion, U256};

/// Read-only pricing surface every engine generation exposes to the router
pub trait AmmPool {
    /// Engine generation that produced the quote
    fn version(&self) -> ProtocolVersion;

    /// Output for selling `amount_in` of `token_in`
    fn quote_exact_in(&self, token_in: Address, amount_in: U256) -> DexResult<U256>;

    /// Input of the opposite token required to receive `amount_out` of `token_out`
    fn quote_exact_out(&self, token_out: Address, amount_out: U256) -> DexResult<U256>;

    /// Swap fee in hundredths of a basis point
    fn fee_pips(&self) -> u32;
}

impl AmmPool for ReservePair {
    fn version(&self) -> ProtocolVersion {
        self.version
    }

    fn quote_exact_in(&self, token_in: Address, amount_in: U256) -> DexResult<U256> {
        let (reserve_in, reserve_out) = self.oriented(token_in)?;
        V2Math::get_amount_out(amount_in, reserve_in, reserve_out, self.fee_bps)
    }

    fn quote_exact_out(&self, token_out: Address, amount_out: U256) -> DexResult<U256> {
        let (reserve_out, reserve_in) = self.oriented(token_out)?;
        V2Math::get_amount_in(amount_out, reserve_in, reserve_out, self.fee_bps)
    }

    fn fee_pips(&self) -> u32 {
        self.fee_bps * (FEE_PIPS_DENOMINATOR / BPS_DENOMINATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_pair_quotes_both_directions() {
        let a = Address::from_low_u64_be(1);
        let b = Address::from_low_u64_be(2);
        let pair = ReservePair {
            version: ProtocolVersion::V1,
            token0: a,
            token1: b,
            reserve0: U256::from(100u64),
            reserve1: U256::from(200u64),
            fee_bps: 30,
        };
        let pool: &dyn AmmPool = &pair;
        assert_eq!(pool.version(), ProtocolVersion::V1);
        assert_eq!(pool.fee_pips(), 3000);
        assert_eq!(pool.quote_exact_in(a, U256::from(10u64)).unwrap(), U256::from(18u64));

        let needed = pool.quote_exact_out(b, U256::from(18u64)).unwrap();
        assert!(pool.quote_exact_in(a, needed).unwrap() >= U256::from(18u64));
    }
}
