//! Constant-product (x*y=k) pricing with an input-side fee
//!
//! Shared by the V1 bonding exchange and the V2 pair market. All amounts
//! are raw token units; outputs round down and required inputs round up.

use crate::full_math::FullMath;
use crate::BPS_DENOMINATOR;
use types::{Address, DexError, DexResult, ProtocolVersion, U256};

/// Reserves of a two-sided constant-product pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservePair {
    pub version: ProtocolVersion,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: U256,
    pub reserve1: U256,
    pub fee_bps: u32, // 30 = 0.3%
}

impl ReservePair {
    /// `(reserve_in, reserve_out)` for a swap selling `token_in`
    pub fn oriented(&self, token_in: Address) -> DexResult<(U256, U256)> {
        if token_in == self.token0 {
            Ok((self.reserve0, self.reserve1))
        } else if token_in == self.token1 {
            Ok((self.reserve1, self.reserve0))
        } else {
            Err(DexError::InvalidInput("token is not part of this pool"))
        }
    }

    pub fn other(&self, token: Address) -> DexResult<Address> {
        if token == self.token0 {
            Ok(self.token1)
        } else if token == self.token1 {
            Ok(self.token0)
        } else {
            Err(DexError::InvalidInput("token is not part of this pool"))
        }
    }

    /// `reserve0 * reserve1` without overflow
    pub fn k(&self) -> types::U512 {
        self.reserve0.full_mul(self.reserve1)
    }
}

/// Constant-product math functions
pub struct V2Math;

impl V2Math {
    /// Output for `amount_in`, fee taken from the input
    ///
    /// `out = in*(D-fee)*reserve_out / (reserve_in*D + in*(D-fee))`
    pub fn get_amount_out(
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
        fee_bps: u32,
    ) -> DexResult<U256> {
        if amount_in.is_zero() {
            return Err(DexError::InsufficientInputAmount);
        }
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(DexError::InsufficientLiquidity);
        }
        let amount_in_with_fee = amount_in
            .checked_mul(U256::from(BPS_DENOMINATOR - fee_bps))
            .ok_or(DexError::ArithmeticOverflow)?;
        let denominator = reserve_in
            .checked_mul(U256::from(BPS_DENOMINATOR))
            .and_then(|scaled| scaled.checked_add(amount_in_with_fee))
            .ok_or(DexError::ArithmeticOverflow)?;
        FullMath::mul_div(amount_in_with_fee, reserve_out, denominator)
    }

    /// Input required to receive exactly `amount_out`, rounded up by one unit
    ///
    /// `in = reserve_in*out*D / ((reserve_out-out)*(D-fee)) + 1`
    pub fn get_amount_in(
        amount_out: U256,
        reserve_in: U256,
        reserve_out: U256,
        fee_bps: u32,
    ) -> DexResult<U256> {
        if amount_out.is_zero() {
            return Err(DexError::InsufficientOutputAmount {
                amount: amount_out,
                minimum: U256::one(),
            });
        }
        if reserve_in.is_zero() || amount_out >= reserve_out {
            return Err(DexError::InsufficientLiquidity);
        }
        let numerator = reserve_in
            .checked_mul(U256::from(BPS_DENOMINATOR))
            .ok_or(DexError::ArithmeticOverflow)?;
        let denominator = (reserve_out - amount_out)
            .checked_mul(U256::from(BPS_DENOMINATOR - fee_bps))
            .ok_or(DexError::ArithmeticOverflow)?;
        FullMath::mul_div(numerator, amount_out, denominator)?
            .checked_add(U256::one())
            .ok_or(DexError::ArithmeticOverflow)
    }

    /// Amount of B equivalent to `amount_a` at the current reserve ratio
    pub fn quote(amount_a: U256, reserve_a: U256, reserve_b: U256) -> DexResult<U256> {
        if amount_a.is_zero() {
            return Err(DexError::InvalidInput("zero amount"));
        }
        if reserve_a.is_zero() || reserve_b.is_zero() {
            return Err(DexError::InsufficientLiquidity);
        }
        FullMath::mul_div(amount_a, reserve_b, reserve_a)
    }
}
