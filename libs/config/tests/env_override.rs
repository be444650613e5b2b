//! Environment overrides are process-global, so they get their own test binary

use dex_config::ExchangeConfig;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_environment_overrides_file_values() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("exchange.toml");
    fs::write(&config_path, "[router]\nmax_hops = 3\nmax_swap_steps = 500\n").unwrap();

    std::env::set_var("DEX__ROUTER__MAX_HOPS", "2");
    std::env::set_var("DEX__LOGGING__JSON", "true");
    let config = ExchangeConfig::load(Some(&config_path)).unwrap();
    std::env::remove_var("DEX__ROUTER__MAX_HOPS");
    std::env::remove_var("DEX__LOGGING__JSON");

    assert_eq!(config.router.max_hops, 2);
    assert_eq!(config.router.max_swap_steps, 500);
    assert!(config.logging.json);
}

#[test]
fn test_path_expansion() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("dex.toml"), "[fees]\nv1_fee_bps = 40\n").unwrap();

    std::env::set_var("DEX_TEST_CONFIG_DIR", dir.path());
    let config = ExchangeConfig::load(Some(std::path::Path::new("$DEX_TEST_CONFIG_DIR/dex.toml"))).unwrap();

    assert_eq!(config.fees.v1_fee_bps, 40);
}
