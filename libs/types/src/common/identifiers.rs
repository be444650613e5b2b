//! Pool identities and protocol version discriminators
//!
//! V1 exchanges are keyed by a single token, V2 pairs by an unordered token
//! pair and V3 pools by `(token0, token1, fee)` with tokens in canonical
//! (byte-wise ascending) order.

use crate::common::errors::DexError;
use ethereum_types::{Address, H160};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

/// Marker for the native coin where a token address is expected
///
/// Only V1 exchanges price against it; it is never a registrable token.
pub const NATIVE_COIN: Address = H160([0u8; 20]);

/// Engine generation, numbered the way the router reports it (0=V1, 1=V2, 2=V3)
#[repr(u8)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    TryFromPrimitive,
    IntoPrimitive,
    Serialize,
    Deserialize,
)]
pub enum ProtocolVersion {
    /// Bonding-curve exchange, one per token against the native coin
    V1 = 0,
    /// Constant-product pair market
    V2 = 1,
    /// Concentrated-liquidity tick market
    V3 = 2,
}

impl ProtocolVersion {
    pub const ALL: [ProtocolVersion; 3] =
        [ProtocolVersion::V1, ProtocolVersion::V2, ProtocolVersion::V3];

    /// Numeric discriminator exposed to callers
    pub fn id(self) -> u8 {
        self.into()
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::V1 => write!(f, "V1"),
            ProtocolVersion::V2 => write!(f, "V2"),
            ProtocolVersion::V3 => write!(f, "V3"),
        }
    }
}

/// Order two token addresses canonically, rejecting degenerate arguments
pub fn sort_tokens(token_a: Address, token_b: Address) -> Result<(Address, Address), DexError> {
    if token_a == token_b {
        return Err(DexError::IdenticalAddresses);
    }
    let (token0, token1) = if token_a < token_b {
        (token_a, token_b)
    } else {
        (token_b, token_a)
    };
    if token0.is_zero() {
        return Err(DexError::ZeroAddress);
    }
    Ok((token0, token1))
}

/// Deterministic address: the last 20 bytes of `keccak256(tag ‖ parts...)`
pub fn derive_address(tag: &[u8], parts: &[&[u8]]) -> Address {
    let mut hasher = Keccak256::new();
    hasher.update(tag);
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    Address::from_slice(&digest[12..])
}

/// Identity of a V2 pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    pub token0: Address,
    pub token1: Address,
}

impl PairKey {
    pub fn new(token_a: Address, token_b: Address) -> Result<Self, DexError> {
        let (token0, token1) = sort_tokens(token_a, token_b)?;
        Ok(Self { token0, token1 })
    }
}

/// Identity of a V3 pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolKey {
    pub token0: Address,
    pub token1: Address,
    pub fee: u32,
}

impl PoolKey {
    pub fn new(token_a: Address, token_b: Address, fee: u32) -> Result<Self, DexError> {
        let (token0, token1) = sort_tokens(token_a, token_b)?;
        Ok(Self {
            token0,
            token1,
            fee,
        })
    }

    pub fn pair(&self) -> PairKey {
        PairKey {
            token0: self.token0,
            token1: self.token1,
        }
    }
}
