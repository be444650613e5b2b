//! Conversion between human decimal amounts and raw base units

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use types::U256;

/// Largest mantissa a `Decimal` can carry (2^96 - 1)
const DECIMAL_MANTISSA_MAX: u128 = (1u128 << 96) - 1;

/// `amount` expressed in base units of a token with `decimals`, rounded down
pub fn to_base_units(amount: Decimal, decimals: u8) -> Result<U256> {
    if amount.is_sign_negative() && !amount.is_zero() {
        bail!("Negative amount {amount}");
    }
    let mantissa = U256::from(amount.mantissa().unsigned_abs());
    let scale = amount.scale();
    let decimals = u32::from(decimals);

    let value = if decimals >= scale {
        mantissa
            .checked_mul(U256::exp10((decimals - scale) as usize))
            .with_context(|| format!("{amount} overflows 256 bits at {decimals} decimals"))?
    } else {
        mantissa / U256::exp10((scale - decimals) as usize)
    };
    Ok(value)
}

/// Human amount for `value` base units, dropping precision past what `Decimal` holds
pub fn from_base_units(value: U256, decimals: u8) -> Result<Decimal> {
    let mut value = value;
    let mut scale = u32::from(decimals);
    let max = U256::from(DECIMAL_MANTISSA_MAX);
    while value > max && scale > 0 {
        value /= U256::from(10u8);
        scale -= 1;
    }
    if value > max {
        bail!("{value} base units do not fit a decimal");
    }
    Decimal::try_from_i128_with_scale(value.as_u128() as i128, scale)
        .with_context(|| format!("Invalid decimal scale {scale}"))
}
