//! Quote and venue types shared by quoting and execution

use serde::{Deserialize, Serialize};
use types::{Address, ProtocolVersion, U256};

/// Where a single-hop quote was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Venue {
    /// V1 exchange bought with the native coin (input is the wrapped native token)
    V1NativeToToken { exchange: Address },
    /// V1 exchange sold into the native coin (output is the wrapped native token)
    V1TokenToNative { exchange: Address },
    /// Two V1 exchanges chained through the native coin
    V1TokenToToken { sell: Address, buy: Address },
    V2Pair { pair: Address },
    V3Pool { pool: Address, fee: u32 },
}

impl Venue {
    pub fn version(&self) -> ProtocolVersion {
        match self {
            Venue::V1NativeToToken { .. }
            | Venue::V1TokenToNative { .. }
            | Venue::V1TokenToToken { .. } => ProtocolVersion::V1,
            Venue::V2Pair { .. } => ProtocolVersion::V2,
            Venue::V3Pool { .. } => ProtocolVersion::V3,
        }
    }

    /// Every pool a swap through this venue touches
    pub fn pools(&self) -> Vec<Address> {
        match *self {
            Venue::V1NativeToToken { exchange } | Venue::V1TokenToNative { exchange } => {
                vec![exchange]
            }
            Venue::V1TokenToToken { sell, buy } => vec![sell, buy],
            Venue::V2Pair { pair } => vec![pair],
            Venue::V3Pool { pool, .. } => vec![pool],
        }
    }
}

/// Output of one venue for one hop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub version: ProtocolVersion,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub amount_out: U256,
    pub venue: Venue,
}

impl Quote {
    /// Numeric version discriminator (0 = V1, 1 = V2, 2 = V3)
    pub fn version_id(&self) -> u8 {
        self.version.id()
    }
}

/// Swap a fixed input along the best single hop, or a forced version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExactInput {
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub min_amount_out: U256,
    pub recipient: Address,
    pub deadline: u64,
    /// Execute on this version only
    pub version: Option<ProtocolVersion>,
}

/// Swap a fixed input along a token path, best venue per hop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactInputPath {
    pub path: Vec<Address>,
    pub amount_in: U256,
    pub min_amount_out: U256,
    pub recipient: Address,
    pub deadline: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venue_versions_and_pools() {
        let a = Address::from_low_u64_be(1);
        let b = Address::from_low_u64_be(2);
        assert_eq!(Venue::V1TokenToToken { sell: a, buy: b }.version(), ProtocolVersion::V1);
        assert_eq!(Venue::V1TokenToToken { sell: a, buy: b }.pools(), vec![a, b]);
        assert_eq!(Venue::V3Pool { pool: a, fee: 500 }.version(), ProtocolVersion::V3);
        assert_eq!(Venue::V2Pair { pair: b }.pools(), vec![b]);
    }
}
