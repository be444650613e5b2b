//! Exchange Configuration Module
//!
//! Provides configuration loading for the engines, the registry and the
//! router. Supports loading from a TOML file with `DEX__*` environment
//! variable overrides; every field has a default so an empty source is valid.

use crate::protocol::{self, fee_tiers, routing};
use anyhow::{bail, ensure, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main exchange configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Swap fees of the constant-product engines
    pub fees: FeeConfig,

    /// V3 fee tiers whitelisted when the registry is created
    pub fee_tiers: Vec<FeeTierConfig>,

    /// Router limits
    pub router: RouterConfig,

    /// Log output settings
    pub logging: LoggingConfig,
}

/// Constant-product fee settings, in basis points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FeeConfig {
    pub v1_fee_bps: u32,
    pub v2_fee_bps: u32,
}

/// One whitelisted V3 fee tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeeTierConfig {
    /// Fee in hundredths of a basis point (3000 = 0.3%)
    pub fee: u32,
    pub tick_spacing: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterConfig {
    pub max_hops: usize,
    pub max_swap_steps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            fees: FeeConfig::default(),
            fee_tiers: fee_tiers::DEFAULTS
                .iter()
                .map(|&(fee, tick_spacing)| FeeTierConfig { fee, tick_spacing })
                .collect(),
            router: RouterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            v1_fee_bps: protocol::DEFAULT_SWAP_FEE_BPS,
            v2_fee_bps: protocol::DEFAULT_SWAP_FEE_BPS,
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_hops: routing::MAX_HOPS,
            max_swap_steps: routing::MAX_SWAP_STEPS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ExchangeConfig {
    /// Load configuration from an optional file with environment overrides
    ///
    /// The path may contain `~` and `$VAR` references. Environment variables
    /// use the `DEX` prefix and `__` as the nesting separator, e.g.
    /// `DEX__ROUTER__MAX_HOPS=2`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            let expanded = expand_path(path)?;
            info!("Loading exchange config: {:?}", expanded);
            builder = builder.add_source(File::from(expanded).required(true));
        } else {
            debug!("No config file given, using defaults and environment");
        }

        // Override with environment variables (DEX__ prefix)
        builder = builder.add_source(
            Environment::with_prefix("DEX")
                .separator("__")
                .try_parsing(true),
        );

        let config: ExchangeConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document directly, without environment overrides
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: ExchangeConfig =
            toml::from_str(contents).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no registry or router could operate with
    pub fn validate(&self) -> Result<()> {
        for (name, fee) in [("v1", self.fees.v1_fee_bps), ("v2", self.fees.v2_fee_bps)] {
            ensure!(
                fee < protocol::BPS_DENOMINATOR,
                "{} fee {} bps must be below {}",
                name,
                fee,
                protocol::BPS_DENOMINATOR
            );
        }

        let mut seen = HashSet::new();
        for tier in &self.fee_tiers {
            ensure!(
                tier.fee < protocol::FEE_PIPS_DENOMINATOR,
                "fee tier {} must be below {}",
                tier.fee,
                protocol::FEE_PIPS_DENOMINATOR
            );
            ensure!(
                tier.tick_spacing > 0 && tier.tick_spacing < protocol::MAX_TICK_SPACING,
                "fee tier {} has invalid tick spacing {}",
                tier.fee,
                tier.tick_spacing
            );
            if !seen.insert(tier.fee) {
                bail!("fee tier {} listed more than once", tier.fee);
            }
        }

        ensure!(self.router.max_hops > 0, "router.max_hops must be at least 1");
        ensure!(
            self.router.max_swap_steps > 0,
            "router.max_swap_steps must be at least 1"
        );
        Ok(())
    }
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw).context("Failed to expand config path")?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Convenience function to load configuration from an optional path
pub fn load_config(path: Option<&Path>) -> Result<ExchangeConfig> {
    ExchangeConfig::load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_protocol() {
        let config = ExchangeConfig::default();
        assert_eq!(config.fees.v1_fee_bps, 30);
        assert_eq!(config.fees.v2_fee_bps, 30);
        assert_eq!(
            config.fee_tiers,
            vec![
                FeeTierConfig { fee: 500, tick_spacing: 10 },
                FeeTierConfig { fee: 3000, tick_spacing: 60 },
                FeeTierConfig { fee: 10000, tick_spacing: 200 },
            ]
        );
        assert_eq!(config.router.max_hops, 4);
        assert_eq!(config.router.max_swap_steps, 10_000);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("exchange.toml");

        let config_content = r#"
[fees]
v2_fee_bps = 25

[[fee_tiers]]
fee = 2500
tick_spacing = 50

[router]
max_hops = 2

[logging]
level = "debug"
json = true
"#;

        fs::write(&config_path, config_content).unwrap();

        let config = ExchangeConfig::load(Some(&config_path)).unwrap();

        assert_eq!(config.fees.v1_fee_bps, 30);
        assert_eq!(config.fees.v2_fee_bps, 25);
        assert_eq!(config.fee_tiers, vec![FeeTierConfig { fee: 2500, tick_spacing: 50 }]);
        assert_eq!(config.router.max_hops, 2);
        assert_eq!(config.router.max_swap_steps, 10_000);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempdir().unwrap();
        assert!(ExchangeConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_from_toml_str_partial() {
        let config = ExchangeConfig::from_toml_str("[router]\nmax_swap_steps = 64\n").unwrap();
        assert_eq!(config.router.max_swap_steps, 64);
        assert_eq!(config.fee_tiers.len(), 3);
    }

    #[test]
    fn test_validation_rejects_bad_tiers() {
        let mut config = ExchangeConfig::default();
        config.fee_tiers.push(FeeTierConfig { fee: 500, tick_spacing: 10 });
        assert!(config.validate().is_err());

        let mut config = ExchangeConfig::default();
        config.fee_tiers = vec![FeeTierConfig { fee: 100, tick_spacing: 0 }];
        assert!(config.validate().is_err());

        let mut config = ExchangeConfig::default();
        config.fee_tiers = vec![FeeTierConfig { fee: 1_000_000, tick_spacing: 1 }];
        assert!(config.validate().is_err());

        let mut config = ExchangeConfig::default();
        config.router.max_hops = 0;
        assert!(config.validate().is_err());

        let mut config = ExchangeConfig::default();
        config.fees.v1_fee_bps = 10_000;
        assert!(config.validate().is_err());
    }
}
