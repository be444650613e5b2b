//! Liquidity positions of a concentrated pool

use amm::liquidity_math::add_delta;
use amm::{FullMath, Q128};
use types::{Address, DexError, DexResult, U256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionKey {
    pub owner: Address,
    pub tick_lower: i32,
    pub tick_upper: i32,
}

impl PositionKey {
    pub fn new(owner: Address, tick_lower: i32, tick_upper: i32) -> Self {
        Self {
            owner,
            tick_lower,
            tick_upper,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionInfo {
    pub liquidity: u128,
    pub fee_growth_inside0_last_x128: U256,
    pub fee_growth_inside1_last_x128: U256,
    /// Principal and fees that can be collected
    pub tokens_owed0: u128,
    pub tokens_owed1: u128,
}

impl PositionInfo {
    /// Apply a liquidity change and credit the fees earned since the last
    /// snapshot at the old liquidity
    ///
    /// A zero delta on an empty position is rejected: there is nothing to poke.
    pub fn updated(
        &self,
        liquidity_delta: i128,
        fee_growth_inside0_x128: U256,
        fee_growth_inside1_x128: U256,
    ) -> DexResult<PositionInfo> {
        let liquidity = if liquidity_delta == 0 {
            if self.liquidity == 0 {
                return Err(DexError::PositionNotFound);
            }
            self.liquidity
        } else {
            add_delta(self.liquidity, liquidity_delta)?
        };

        let owed0 = earned(fee_growth_inside0_x128, self.fee_growth_inside0_last_x128, self.liquidity)?;
        let owed1 = earned(fee_growth_inside1_x128, self.fee_growth_inside1_last_x128, self.liquidity)?;

        Ok(PositionInfo {
            liquidity,
            fee_growth_inside0_last_x128: fee_growth_inside0_x128,
            fee_growth_inside1_last_x128: fee_growth_inside1_x128,
            // owed amounts wrap; holders must collect before reaching u128::MAX
            tokens_owed0: self.tokens_owed0.wrapping_add(owed0),
            tokens_owed1: self.tokens_owed1.wrapping_add(owed1),
        })
    }

    /// Nothing left to withdraw or collect
    pub fn is_empty(&self) -> bool {
        self.liquidity == 0 && self.tokens_owed0 == 0 && self.tokens_owed1 == 0
    }
}

fn earned(growth_now: U256, growth_last: U256, liquidity: u128) -> DexResult<u128> {
    let delta = growth_now.overflowing_sub(growth_last).0;
    Ok(FullMath::mul_div(delta, U256::from(liquidity), Q128)?.low_u128())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fees_accrue_on_old_liquidity() {
        let position = PositionInfo {
            liquidity: 1_000,
            ..Default::default()
        };
        // growth of 3/2 per unit of liquidity in Q128
        let growth = Q128 * U256::from(3u64) / U256::from(2u64);
        let next = position.updated(500, growth, U256::zero()).unwrap();
        assert_eq!(next.liquidity, 1_500);
        assert_eq!(next.tokens_owed0, 1_500);
        assert_eq!(next.fee_growth_inside0_last_x128, growth);

        // same growth again: nothing new
        let poked = next.updated(0, growth, U256::zero()).unwrap();
        assert_eq!(poked.tokens_owed0, 1_500);
    }

    #[test]
    fn test_poke_empty_position_fails() {
        let empty = PositionInfo::default();
        assert_eq!(empty.updated(0, U256::zero(), U256::zero()), Err(DexError::PositionNotFound));
        assert_eq!(empty.updated(-1, U256::zero(), U256::zero()), Err(DexError::InsufficientLiquidity));
        assert!(empty.is_empty());
    }
}
