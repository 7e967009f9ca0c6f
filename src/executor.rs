//! Virtual order executor
//!
//! Advances virtual time from the last execution to a target. Sell rates only
//! change at expiry boundaries and the solver is closed form over any span,
//! so the executor takes one step per boundary crossed and one final step to
//! the target.

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use twamm_math::{compute_virtual_balances, mul_div, U256};

use crate::error::{Result, TwammError};
use crate::pool::PoolState;
use crate::SELL_RATE_PRECISION;

/// Outcome of one executor run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Virtual time before the run
    pub from: u64,

    /// Virtual time after the run
    pub reached: u64,

    /// Solver steps taken
    pub steps: u32,

    /// False when the step cap stopped the run before the target
    pub complete: bool,

    pub token0_sold: U256,
    pub token1_sold: U256,

    /// token0 paid to the token1 order pool
    pub token0_bought: U256,

    /// token1 paid to the token0 order pool
    pub token1_bought: U256,
}

impl ExecutionReport {
    fn start(from: u64) -> Self {
        Self {
            from,
            reached: from,
            steps: 0,
            complete: false,
            token0_sold: U256::zero(),
            token1_sold: U256::zero(),
            token0_bought: U256::zero(),
            token1_bought: U256::zero(),
        }
    }

    pub fn traded(&self) -> bool {
        !(self.token0_sold.is_zero() && self.token1_sold.is_zero())
    }
}

impl PoolState {
    /// Execute virtual orders up to `target`, at most `max_steps` steps
    ///
    /// `target` at or before the last execution is a no-op. Stopping at the
    /// cap leaves a consistent state at `reached`; the report says whether
    /// the target was met.
    pub fn execute_virtual_orders(
        &mut self,
        target: u64,
        fee_bps: u32,
        max_steps: u32,
    ) -> Result<ExecutionReport> {
        let mut report = ExecutionReport::start(self.last_virtual_order_timestamp);

        while self.last_virtual_order_timestamp < target {
            if report.steps >= max_steps {
                break;
            }
            let next = self.next_boundary(target);
            self.execute_step(next, fee_bps, &mut report)?;
            report.steps += 1;
        }

        report.reached = self.last_virtual_order_timestamp;
        report.complete = report.reached >= target;
        if report.steps > 0 {
            debug!(
                "virtual orders executed {} -> {} in {} steps (complete: {})",
                report.from, report.reached, report.steps, report.complete
            );
        }
        Ok(report)
    }

    /// Earliest pending expiry of either pool, or `target` if that comes first
    fn next_boundary(&self, target: u64) -> u64 {
        let last = self.last_virtual_order_timestamp;
        self.order_pools
            .iter()
            .filter_map(|pool| pool.next_expiry_after(last))
            .fold(target, u64::min)
    }

    fn execute_step(&mut self, next: u64, fee_bps: u32, report: &mut ExecutionReport) -> Result<()> {
        let elapsed = U256::from(next - self.last_virtual_order_timestamp);
        let sell0 = mul_div(self.order_pools[0].current_sell_rate, elapsed, SELL_RATE_PRECISION)?;
        let sell1 = mul_div(self.order_pools[1].current_sell_rate, elapsed, SELL_RATE_PRECISION)?;

        trace!(
            "step {} -> {}: reserves ({}, {}), selling ({}, {})",
            self.last_virtual_order_timestamp,
            next,
            self.reserves.reserve0,
            self.reserves.reserve1,
            sell0,
            sell1
        );

        let trade = compute_virtual_balances(
            self.reserves.reserve0,
            self.reserves.reserve1,
            sell0,
            sell1,
            fee_bps,
        )?;
        self.reserves.set_reserves(trade.reserve0, trade.reserve1)?;

        self.twamm_reserves[0] = self.twamm_reserves[0]
            .checked_sub(sell0)
            .and_then(|held| held.checked_add(trade.token0_out))
            .ok_or(TwammError::ArithmeticOverflow)?;
        self.twamm_reserves[1] = self.twamm_reserves[1]
            .checked_sub(sell1)
            .and_then(|held| held.checked_add(trade.token1_out))
            .ok_or(TwammError::ArithmeticOverflow)?;

        // token0 sellers are paid in token1 and vice versa
        self.order_pools[0].accrue_reward(trade.token1_out)?;
        self.order_pools[1].accrue_reward(trade.token0_out)?;
        self.order_pools[0].advance_to_interval(next)?;
        self.order_pools[1].advance_to_interval(next)?;
        self.last_virtual_order_timestamp = next;

        report.token0_sold = report.token0_sold.saturating_add(sell0);
        report.token1_sold = report.token1_sold.saturating_add(sell1);
        report.token0_bought = report.token0_bought.saturating_add(trade.token0_out);
        report.token1_bought = report.token1_bought.saturating_add(trade.token1_out);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Token;

    fn seeded_state(reserve: u64) -> PoolState {
        let mut state = PoolState::new(0);
        state.reserves.mint(U256::from(reserve), U256::from(reserve), 100).unwrap();
        state
    }

    /// Register a raw sell stream the way an order submission would
    fn add_stream(state: &mut PoolState, token: Token, per_second: u64, expiration: u64) {
        let rate = U256::from(per_second) * SELL_RATE_PRECISION;
        let duration = expiration - state.last_virtual_order_timestamp;
        state.order_pools[token.index()].add_order(rate, expiration).unwrap();
        state.twamm_reserves[token.index()] += U256::from(per_second * duration);
    }

    #[test]
    fn test_target_in_past_is_noop() {
        let mut state = seeded_state(1_000_000_000);
        state.last_virtual_order_timestamp = 100;
        let before = state.clone();

        let report = state.execute_virtual_orders(50, 30, 16).unwrap();
        assert_eq!(state, before);
        assert_eq!(report.steps, 0);
        assert!(report.complete);
        assert_eq!(report.reached, 100);
    }

    #[test]
    fn test_steps_only_at_expiry_boundaries() {
        let mut state = seeded_state(1_000_000_000);
        add_stream(&mut state, Token::Token0, 10, 3600);
        add_stream(&mut state, Token::Token1, 10, 36_000);

        // two boundaries in range: 3600 (expiry) and the target itself
        let report = state.execute_virtual_orders(10_000, 30, 16).unwrap();
        assert_eq!(report.steps, 2);
        assert!(report.complete);
        assert_eq!(state.last_virtual_order_timestamp, 10_000);
        assert!(state.order_pools[0].current_sell_rate.is_zero());
        assert_eq!(report.token0_sold, U256::from(36_000u64));
        assert_eq!(report.token1_sold, U256::from(100_000u64));
        assert!(state.order_pools[0].reward_factor_at_expiry(3600).is_some());
    }

    #[test]
    fn test_empty_pool_advances_clock() {
        let mut state = seeded_state(1_000_000);
        let report = state.execute_virtual_orders(7_200, 30, 4).unwrap();
        assert_eq!(report.steps, 1);
        assert!(!report.traded());
        assert_eq!(state.last_virtual_order_timestamp, 7_200);
        assert_eq!(state.reserves.reserve0, U256::from(1_000_000u64));
    }

    #[test]
    fn test_step_cap_commits_partial_progress() {
        let mut state = seeded_state(1_000_000_000);
        for hour in 1..=5u64 {
            add_stream(&mut state, Token::Token0, 1, hour * 3600);
        }

        let report = state.execute_virtual_orders(5 * 3600, 30, 2).unwrap();
        assert!(!report.complete);
        assert_eq!(report.reached, 7_200);
        assert_eq!(state.last_virtual_order_timestamp, 7_200);

        let rest = state.execute_virtual_orders(5 * 3600, 30, 16).unwrap();
        assert!(rest.complete);
        assert_eq!(rest.steps, 3);
    }

    #[test]
    fn test_repeated_catch_up_is_idempotent() {
        let mut state = seeded_state(1_000_000_000);
        add_stream(&mut state, Token::Token0, 50, 7_200);
        add_stream(&mut state, Token::Token1, 20, 7_200);

        state.execute_virtual_orders(3_600, 30, 16).unwrap();
        let caught_up = state.clone();
        let again = state.execute_virtual_orders(3_600, 30, 16).unwrap();

        assert_eq!(state, caught_up);
        assert_eq!(again.steps, 0);
    }

    #[test]
    fn test_conservation_and_invariant() {
        let mut state = seeded_state(1_000_000_000);
        add_stream(&mut state, Token::Token0, 500, 3_600);
        add_stream(&mut state, Token::Token1, 300, 7_200);

        let total0 = state.reserves.reserve0 + state.twamm_reserves[0];
        let total1 = state.reserves.reserve1 + state.twamm_reserves[1];
        let k = state.reserves.k();

        state.execute_virtual_orders(7_200, 30, 16).unwrap();

        assert_eq!(state.reserves.reserve0 + state.twamm_reserves[0], total0);
        assert_eq!(state.reserves.reserve1 + state.twamm_reserves[1], total1);
        assert!(state.reserves.k() >= k);
    }
}
