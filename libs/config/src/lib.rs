//! # DEX Centralized Configuration
//!
//! This crate provides configuration loading and protocol constants for the
//! exchange engines, the pool registry and the router.
//!
//! ## Features
//!
//! - **Protocol Constants**: fee denominators, minimum liquidity, default fee tiers
//! - **Exchange Configuration**: fees, whitelisted tiers, router limits, logging
//! - **Layered Loading**: TOML file first, `DEX__*` environment variables on top
//!
//! ## Usage
//!
//! ```rust
//! use dex_config::{protocol, ExchangeConfig};
//!
//! let config = ExchangeConfig::default();
//! assert_eq!(config.fees.v2_fee_bps, protocol::DEFAULT_SWAP_FEE_BPS);
//! assert_eq!(config.fee_tiers.len(), protocol::fee_tiers::DEFAULTS.len());
//! ```

pub mod exchange_config;
pub mod protocol;

// Re-export commonly used types
pub use exchange_config::{
    load_config, ExchangeConfig, FeeConfig, FeeTierConfig, LoggingConfig, RouterConfig,
};
pub use protocol::*;
