//! Pool parameters
//!
//! Fixed at pool creation. The CLI reads them from a TOML file; every field
//! falls back to its default when omitted.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TwammError};
use crate::types::Address;
use twamm_math::BPS_SCALE;

/// Protocol fee recipient and share
///
/// The recipient receives `1 / share_denominator` of the growth in sqrt(k)
/// as freshly minted liquidity. A denominator of 6 is the classic 1/6 split.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolFee {
    pub fee_to: Address,
    pub share_denominator: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Expiration granularity of long-term orders, in seconds
    pub order_interval: u64,

    /// Swap fee in basis points, charged on instant and virtual input
    pub fee_bps: u32,

    /// Maximum executor steps run by a single call
    pub max_virtual_order_steps: u32,

    /// Maximum order length, in intervals
    pub max_order_intervals: u64,

    /// Tolerated gap between the two liquidity quotes of a deposit
    pub max_deposit_imbalance_bps: u32,

    pub protocol_fee: Option<ProtocolFee>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            order_interval: 3600,
            fee_bps: 30,
            max_virtual_order_steps: 512,
            max_order_intervals: 8760,
            max_deposit_imbalance_bps: 100,
            protocol_fee: None,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.order_interval == 0 {
            return Err(TwammError::InvalidConfig("order_interval must be positive"));
        }
        if self.fee_bps >= BPS_SCALE {
            return Err(TwammError::InvalidConfig("fee_bps must be below 10000"));
        }
        if self.max_virtual_order_steps == 0 {
            return Err(TwammError::InvalidConfig("max_virtual_order_steps must be positive"));
        }
        if self.max_order_intervals == 0 {
            return Err(TwammError::InvalidConfig("max_order_intervals must be positive"));
        }
        if self.order_interval.checked_mul(self.max_order_intervals).is_none() {
            return Err(TwammError::InvalidConfig("longest order overflows the clock"));
        }
        if self.max_deposit_imbalance_bps > BPS_SCALE {
            return Err(TwammError::InvalidConfig("max_deposit_imbalance_bps above 10000"));
        }
        if let Some(fee) = &self.protocol_fee {
            if fee.share_denominator < 2 {
                return Err(TwammError::InvalidConfig("protocol fee share_denominator must be at least 2"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PoolConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.order_interval, 3600);
        assert_eq!(config.fee_bps, 30);
    }

    #[test]
    fn test_rejects_bad_values() {
        let zero_interval = PoolConfig { order_interval: 0, ..PoolConfig::default() };
        assert!(matches!(zero_interval.validate(), Err(TwammError::InvalidConfig(_))));

        let full_fee = PoolConfig { fee_bps: 10_000, ..PoolConfig::default() };
        assert!(full_fee.validate().is_err());

        let no_steps = PoolConfig { max_virtual_order_steps: 0, ..PoolConfig::default() };
        assert!(no_steps.validate().is_err());

        let bad_fee = PoolConfig {
            protocol_fee: Some(ProtocolFee { fee_to: Address::ZERO, share_denominator: 1 }),
            ..PoolConfig::default()
        };
        assert!(bad_fee.validate().is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: PoolConfig = serde_json::from_str(r#"{"order_interval": 60}"#).unwrap();
        assert_eq!(config.order_interval, 60);
        assert_eq!(config.max_order_intervals, 8760);
        assert_eq!(config.protocol_fee, None);
    }
}
