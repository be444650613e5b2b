//! Error types shared by every engine, the registry and the router
//!
//! Every mutating operation either completes with its stated postconditions
//! or fails with one of these kinds and leaves no observable effect.

use ethereum_types::{Address, U256};
use thiserror::Error;

/// Failures reported by the token collaborator
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Unknown token {0:?}")]
    UnknownToken(Address),

    #[error("Insufficient balance of {token:?} for {owner:?}: needed {needed}, available {available}")]
    InsufficientBalance {
        token: Address,
        owner: Address,
        needed: U256,
        available: U256,
    },

    #[error("Insufficient allowance of {token:?} from {owner:?} to {spender:?}: needed {needed}, allowed {allowed}")]
    InsufficientAllowance {
        token: Address,
        owner: Address,
        spender: Address,
        needed: U256,
        allowed: U256,
    },

    #[error("Insufficient native balance for {owner:?}: needed {needed}, available {available}")]
    InsufficientNative {
        owner: Address,
        needed: U256,
        available: U256,
    },

    #[error("No wrapped native token is registered")]
    NoWrappedNative,

    #[error("Token {0:?} is already registered")]
    AlreadyRegistered(Address),

    #[error("Transfer to the zero address")]
    TransferToZero,

    #[error("A token cannot live at the zero address")]
    ZeroTokenAddress,

    #[error("Total supply overflow for {0:?}")]
    SupplyOverflow(Address),
}

/// Error kinds of the AMM core
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DexError {
    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("Zero address")]
    ZeroAddress,

    #[error("Identical addresses")]
    IdenticalAddresses,

    #[error("Insufficient liquidity")]
    InsufficientLiquidity,

    #[error("Insufficient liquidity minted")]
    InsufficientLiquidityMinted,

    #[error("Insufficient liquidity burned")]
    InsufficientLiquidityBurned,

    #[error("Insufficient output amount: got {amount}, minimum {minimum}")]
    InsufficientOutputAmount { amount: U256, minimum: U256 },

    #[error("Insufficient input amount")]
    InsufficientInputAmount,

    #[error("Insufficient liquidity shares for {owner:?}: needed {needed}, available {available}")]
    InsufficientShares {
        owner: Address,
        needed: U256,
        available: U256,
    },

    #[error("Excessive input amount: required {required}, maximum {maximum}")]
    ExcessiveInputAmount { required: U256, maximum: U256 },

    #[error("Slippage exceeded: got {amount_out}, minimum {minimum}")]
    SlippageExceeded { amount_out: U256, minimum: U256 },

    /// Post-swap reserve product decreased (the V2 `K` check)
    #[error("Invariant violation: {0}")]
    InvariantViolation(&'static str),

    #[error("Deadline expired: deadline {deadline}, now {now}")]
    DeadlineExpired { deadline: u64, now: u64 },

    #[error("Unauthorized caller {0:?}")]
    Unauthorized(Address),

    #[error("Pool already exists at {0:?}")]
    PoolAlreadyExists(Address),

    #[error("Pool already initialized")]
    AlreadyInitialized,

    #[error("Pool not initialized")]
    NotInitialized,

    #[error("Fee tier {0} already enabled")]
    AlreadyEnabled(u32),

    #[error("Fee tier {0} is not enabled")]
    InvalidFeeTier(u32),

    #[error("Invalid tick spacing {0}")]
    InvalidTickSpacing(i32),

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Locked")]
    Locked,

    #[error("Invalid tick range [{lower}, {upper})")]
    InvalidTickRange { lower: i32, upper: i32 },

    #[error("Tick {0} out of bounds")]
    TickOutOfBounds(i32),

    #[error("Tick {tick} is not a multiple of spacing {spacing}")]
    TickMisaligned { tick: i32, spacing: i32 },

    #[error("Sqrt price {0} out of bounds")]
    InvalidSqrtPrice(U256),

    #[error("Invalid sqrt price limit {0}")]
    InvalidPriceLimit(U256),

    #[error("Liquidity overflow at tick {0}")]
    LiquidityOverflow(i32),

    #[error("Insufficient payment of {token:?}: owed {owed}, received {received}")]
    InsufficientPayment {
        token: Address,
        owed: U256,
        received: U256,
    },

    #[error("Position not found")]
    PositionNotFound,

    #[error("Swap exceeded {0} steps")]
    StepLimitExceeded(u32),

    #[error("No route")]
    NoRoute,

    #[error("Pool {0:?} not found")]
    PoolNotFound(Address),

    #[error("Path of {hops} hops exceeds the limit of {max}")]
    PathTooLong { hops: usize, max: usize },

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl DexError {
    /// Errors that mean "this venue cannot serve the request" rather than a
    /// malformed call; quoting skips pools that fail this way.
    pub fn is_liquidity_shortfall(&self) -> bool {
        matches!(
            self,
            DexError::InsufficientLiquidity
                | DexError::InsufficientInputAmount
                | DexError::NotInitialized
                | DexError::InvalidPriceLimit(_)
                | DexError::StepLimitExceeded(_)
                | DexError::ArithmeticOverflow
        )
    }
}

pub type DexResult<T> = Result<T, DexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_error_converts() {
        let err: DexError = TokenError::NoWrappedNative.into();
        assert_eq!(err, DexError::Token(TokenError::NoWrappedNative));
        assert_eq!(err.to_string(), "No wrapped native token is registered");
    }

    #[test]
    fn test_liquidity_shortfall_classification() {
        assert!(DexError::InsufficientLiquidity.is_liquidity_shortfall());
        assert!(!DexError::Locked.is_liquidity_shortfall());
        assert!(!DexError::ZeroAddress.is_liquidity_shortfall());
        assert!(!DexError::InvalidInput("zero amount").is_liquidity_shortfall());
    }
}
