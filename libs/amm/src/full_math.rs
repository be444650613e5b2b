//! Full-precision multiply-divide over 256-bit operands
//!
//! `a * b` is formed as a 512-bit intermediate so the product never
//! overflows; only the final quotient has to fit in 256 bits.

use types::{DexError, DexResult, U256, U512};

/// Multiply-divide primitives with explicit rounding direction
pub struct FullMath;

impl FullMath {
    /// `floor(a * b / denominator)`
    ///
    /// Fails with `ArithmeticOverflow` when `denominator` is zero or the
    /// quotient does not fit in 256 bits.
    pub fn mul_div(a: U256, b: U256, denominator: U256) -> DexResult<U256> {
        if denominator.is_zero() {
            return Err(DexError::ArithmeticOverflow);
        }
        let quotient = a.full_mul(b) / widen(denominator);
        narrow(quotient).ok_or(DexError::ArithmeticOverflow)
    }

    /// `ceil(a * b / denominator)`
    pub fn mul_div_rounding_up(a: U256, b: U256, denominator: U256) -> DexResult<U256> {
        if denominator.is_zero() {
            return Err(DexError::ArithmeticOverflow);
        }
        let product = a.full_mul(b);
        let wide_denominator = widen(denominator);
        let quotient = narrow(product / wide_denominator).ok_or(DexError::ArithmeticOverflow)?;
        if (product % wide_denominator).is_zero() {
            Ok(quotient)
        } else {
            quotient
                .checked_add(U256::one())
                .ok_or(DexError::ArithmeticOverflow)
        }
    }

    /// `ceil(a / b)`
    pub fn div_rounding_up(a: U256, b: U256) -> DexResult<U256> {
        if b.is_zero() {
            return Err(DexError::ArithmeticOverflow);
        }
        let quotient = a / b;
        if (a % b).is_zero() {
            Ok(quotient)
        } else {
            // a / b < U256::MAX whenever b > 1, and b == 1 never leaves a remainder
            Ok(quotient + U256::one())
        }
    }
}

/// Zero-extend a 256-bit value into 512 bits
pub fn widen(value: U256) -> U512 {
    let U256(ref words) = value;
    U512([words[0], words[1], words[2], words[3], 0, 0, 0, 0])
}

/// Truncating conversion back to 256 bits, `None` if high words are set
pub fn narrow(value: U512) -> Option<U256> {
    let U512(ref words) = value;
    if words[4] | words[5] | words[6] | words[7] != 0 {
        return None;
    }
    Some(U256([words[0], words[1], words[2], words[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_exceeds_word_width() {
        // 2^255 * 2 overflows 256 bits, the quotient does not
        let half = U256::one() << 255usize;
        let result = FullMath::mul_div(half, U256::from(2u64), U256::from(4u64)).unwrap();
        assert_eq!(result, U256::one() << 254usize);

        let max = U256::MAX;
        assert_eq!(FullMath::mul_div(max, max, max).unwrap(), max);
    }

    #[test]
    fn test_mul_div_floor_and_ceil() {
        let a = U256::from(10u64);
        let b = U256::from(10u64);
        let d = U256::from(3u64);
        assert_eq!(FullMath::mul_div(a, b, d).unwrap(), U256::from(33u64));
        assert_eq!(FullMath::mul_div_rounding_up(a, b, d).unwrap(), U256::from(34u64));
        // exact division does not round up
        assert_eq!(
            FullMath::mul_div_rounding_up(a, b, U256::from(4u64)).unwrap(),
            U256::from(25u64)
        );
    }

    #[test]
    fn test_mul_div_failures() {
        assert_eq!(
            FullMath::mul_div(U256::one(), U256::one(), U256::zero()),
            Err(DexError::ArithmeticOverflow)
        );
        assert_eq!(
            FullMath::mul_div(U256::MAX, U256::from(2u64), U256::one()),
            Err(DexError::ArithmeticOverflow)
        );
        assert_eq!(
            FullMath::mul_div_rounding_up(U256::MAX, U256::MAX, U256::MAX - U256::one()),
            Err(DexError::ArithmeticOverflow)
        );
    }

    #[test]
    fn test_div_rounding_up() {
        assert_eq!(
            FullMath::div_rounding_up(U256::from(7u64), U256::from(2u64)).unwrap(),
            U256::from(4u64)
        );
        assert_eq!(
            FullMath::div_rounding_up(U256::from(8u64), U256::from(2u64)).unwrap(),
            U256::from(4u64)
        );
        assert!(FullMath::div_rounding_up(U256::one(), U256::zero()).is_err());
    }
}
