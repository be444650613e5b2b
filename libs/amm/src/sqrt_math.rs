//! Integer square root on 256-bit values

use types::U256;

/// `floor(sqrt(x))` via the Babylonian method
///
/// Deterministic for every input; used for the first V2 mint
/// (`sqrt(amount0 * amount1)`) and the protocol-fee `sqrt(k)` terms.
pub fn sqrt_floor(x: U256) -> U256 {
    let three = U256::from(3u64);
    if x > three {
        let mut z = x;
        let mut y = x / U256::from(2u64) + U256::one();
        while y < z {
            z = y;
            y = (x / y + y) / U256::from(2u64);
        }
        z
    } else if x.is_zero() {
        U256::zero()
    } else {
        U256::one()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_values() {
        let expected = [0u64, 1, 1, 1, 2, 2, 2, 2, 2, 3, 3];
        for (x, root) in expected.iter().enumerate() {
            assert_eq!(sqrt_floor(U256::from(x as u64)), U256::from(*root), "sqrt({})", x);
        }
    }

    #[test]
    fn test_perfect_squares_and_neighbours() {
        assert_eq!(sqrt_floor(U256::from(4_000_000u64)), U256::from(2000u64));
        assert_eq!(sqrt_floor(U256::from(3_999_999u64)), U256::from(1999u64));
        let big = U256::from(u128::MAX);
        assert_eq!(sqrt_floor(big * big), big);
        assert_eq!(sqrt_floor(big * big - U256::one()), big - U256::one());
    }

    #[test]
    fn test_max_input() {
        // floor(sqrt(2^256 - 1)) == 2^128 - 1
        assert_eq!(sqrt_floor(U256::MAX), U256::from(u128::MAX));
    }
}
