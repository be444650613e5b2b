//! # DEX Unified Types Library
//!
//! Shared vocabulary for the three AMM engines, the pool registry and the
//! router: 256-bit amounts, addresses, pool identities, the protocol version
//! discriminator, the call context and the error kinds every operation
//! reports.
//!
//! ## Design Philosophy
//!
//! - **No Precision Loss**: token amounts are `U256`, never floats
//! - **Typed Identities**: `PairKey`/`PoolKey` are always canonically ordered
//! - **All-or-Nothing**: errors carry enough context to explain a revert
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{Address, PoolKey, ProtocolVersion};
//!
//! let usdc = Address::from_low_u64_be(0xa0);
//! let wdex = Address::from_low_u64_be(0x0d);
//! let key = PoolKey::new(usdc, wdex, 500).unwrap();
//! assert_eq!(key.token0, wdex);
//! assert_eq!(ProtocolVersion::V3.id(), 2);
//! ```

pub mod common;

pub use common::constants::{BPS_DENOMINATOR, FEE_PIPS_DENOMINATOR, MINIMUM_LIQUIDITY};
pub use common::context::CallContext;
pub use common::errors::{DexError, DexResult, TokenError};
pub use common::identifiers::{
    derive_address, sort_tokens, PairKey, PoolKey, ProtocolVersion, NATIVE_COIN,
};

pub use ethereum_types::{Address, U256, U512};
