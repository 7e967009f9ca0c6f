//! Pool configuration files
//!
//! ```toml
//! order_interval = 3600
//! fee_bps = 30
//!
//! [protocol_fee]
//! fee_to = "4vJ9JU1bJJE96FWSJKvHsmmFADCg4gpZQff4P3bkLKi"
//! share_denominator = 6
//! ```

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use twamm::PoolConfig;

pub fn load_config(path: &Path) -> Result<PoolConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&data).with_context(|| format!("Invalid config file: {}", path.display()))
}

pub fn parse_config(data: &str) -> Result<PoolConfig> {
    let config: PoolConfig = toml::from_str(data).context("Failed to parse TOML")?;
    config.validate()?;
    Ok(config)
}
