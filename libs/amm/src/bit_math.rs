//! Bit scans over a 256-bit bitmap word
//!
//! Bit 0 is the least significant bit. The tick bitmap relies on these
//! semantics exactly: the position returned decides where a swap step ends.

use types::{DexError, DexResult, U256};

/// Index of the highest set bit
pub fn most_significant_bit(word: U256) -> DexResult<u8> {
    if word.is_zero() {
        return Err(DexError::InvalidInput("bit scan of a zero word"));
    }
    Ok((word.bits() - 1) as u8)
}

/// Index of the lowest set bit
pub fn least_significant_bit(word: U256) -> DexResult<u8> {
    if word.is_zero() {
        return Err(DexError::InvalidInput("bit scan of a zero word"));
    }
    Ok(word.trailing_zeros() as u8)
}
