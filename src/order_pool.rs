//! Order pool: the aggregate of all long-term orders selling one token
//!
//! Orders are not executed one by one. The pool sells at the sum of their
//! rates and credits proceeds through a reward factor, the cumulative output
//! paid per unit of sell rate. An order's share is the growth of the reward
//! factor since its snapshot, times its own rate.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use serde::{Deserialize, Serialize};
use twamm_math::{mul_div, mul_div_up, U256};

use crate::error::{Result, TwammError};
use crate::REWARD_FACTOR_SCALE;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPool {
    /// Sum of the sell rates of every active order, scaled by `SELL_RATE_PRECISION`
    pub current_sell_rate: U256,

    /// Cumulative output per unit of sell rate, Q112
    pub reward_factor: U256,

    /// Sell rate that stops at each expiry boundary
    pub sell_rate_ending_at: BTreeMap<u64, U256>,

    /// Reward factor recorded when each expiry boundary was processed
    pub reward_factor_at: BTreeMap<u64, U256>,

    /// Output credited to this pool's orders and not yet paid out
    #[serde(default)]
    pub proceeds_held: U256,
}

impl OrderPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start selling `sell_rate` until `expiration`
    pub fn add_order(&mut self, sell_rate: U256, expiration: u64) -> Result<()> {
        self.current_sell_rate = self
            .current_sell_rate
            .checked_add(sell_rate)
            .ok_or(TwammError::ArithmeticOverflow)?;
        let ending = self.sell_rate_ending_at.entry(expiration).or_default();
        *ending = ending.checked_add(sell_rate).ok_or(TwammError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Stop selling `sell_rate` early (cancellation)
    pub fn remove_order(&mut self, sell_rate: U256, expiration: u64) -> Result<()> {
        let ending = self
            .sell_rate_ending_at
            .get_mut(&expiration)
            .ok_or(TwammError::ArithmeticOverflow)?;
        *ending = ending.checked_sub(sell_rate).ok_or(TwammError::ArithmeticOverflow)?;
        if ending.is_zero() {
            self.sell_rate_ending_at.remove(&expiration);
        }
        self.current_sell_rate = self
            .current_sell_rate
            .checked_sub(sell_rate)
            .ok_or(TwammError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Credit `amount` of output to every unit of the current sell rate
    ///
    /// The factor grows by the rounded-up share so an order that owns the
    /// whole flow can claim all of it; payouts are capped by `proceeds_held`.
    pub fn accrue_reward(&mut self, amount: U256) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        self.proceeds_held = self
            .proceeds_held
            .checked_add(amount)
            .ok_or(TwammError::ArithmeticOverflow)?;
        if self.current_sell_rate.is_zero() {
            return Ok(());
        }
        let growth = mul_div_up(amount, REWARD_FACTOR_SCALE, self.current_sell_rate)?;
        self.reward_factor = self
            .reward_factor
            .checked_add(growth)
            .ok_or(TwammError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Retire the orders expiring at `boundary`
    ///
    /// Must run after the step's `accrue_reward`. Calling it twice for the
    /// same boundary is a no-op since the bucket is gone.
    pub fn advance_to_interval(&mut self, boundary: u64) -> Result<()> {
        if let Some(ending) = self.sell_rate_ending_at.remove(&boundary) {
            self.current_sell_rate = self
                .current_sell_rate
                .checked_sub(ending)
                .ok_or(TwammError::ArithmeticOverflow)?;
            self.reward_factor_at.insert(boundary, self.reward_factor);
        }
        Ok(())
    }

    pub fn reward_factor_at_expiry(&self, expiration: u64) -> Option<U256> {
        self.reward_factor_at.get(&expiration).copied()
    }

    /// Drop the recorded factor once no unsettled order expires at `expiration`
    pub fn forget_expiry(&mut self, expiration: u64) {
        self.reward_factor_at.remove(&expiration);
    }

    /// Proceeds for `sell_rate` over a factor range, capped by what the pool holds
    pub fn claimable(&self, sell_rate: U256, from: U256, to: U256) -> Result<U256> {
        Ok(proceeds_between(sell_rate, from, to)?.min(self.proceeds_held))
    }

    /// Take `amount` of held output for a payout
    pub fn pay_out(&mut self, amount: U256) -> Result<()> {
        self.proceeds_held = self
            .proceeds_held
            .checked_sub(amount)
            .ok_or(TwammError::ArithmeticOverflow)?;
        Ok(())
    }

    /// First pending expiry strictly after `timestamp`
    pub fn next_expiry_after(&self, timestamp: u64) -> Option<u64> {
        self.sell_rate_ending_at
            .range((Excluded(timestamp), Unbounded))
            .next()
            .map(|(expiry, _)| *expiry)
    }
}

/// Output owed to `sell_rate` for the reward factor moving from `from` to `to`
pub fn proceeds_between(sell_rate: U256, from: U256, to: U256) -> Result<U256> {
    let growth = to.checked_sub(from).ok_or(TwammError::ArithmeticOverflow)?;
    Ok(mul_div(growth, sell_rate, REWARD_FACTOR_SCALE)?)
}
