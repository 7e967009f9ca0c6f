//! Long-term order lifecycle
//!
//! ```text
//! Active --withdraw (now >= expiration)--> Withdrawn
//! Active --cancel   (now <  expiration)--> Cancelled
//! Active --withdraw (now <  expiration)--> Active
//! ```
//!
//! These methods assume virtual orders were already executed up to `now`.

use serde::{Deserialize, Serialize};
use twamm_math::{mul_div, mul_div_up, U256};

use crate::config::PoolConfig;
use crate::error::{InvalidOrderReason, Result, TwammError};
use crate::pool::PoolState;
use crate::types::{Address, OrderId, Token};
use crate::SELL_RATE_PRECISION;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Active,
    Withdrawn,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub owner: Address,
    pub sell_token: Token,

    /// Tokens sold per second, scaled by `SELL_RATE_PRECISION`
    pub sell_rate: U256,

    /// Principal held for the order after the dust refund
    pub deposit: U256,

    pub submitted_at: u64,
    pub expiration: u64,

    /// Selling pool's reward factor at submission or last partial withdrawal
    pub reward_factor_snapshot: U256,

    pub status: OrderStatus,
}

impl Order {
    pub fn buy_token(&self) -> Token {
        self.sell_token.opposite()
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expiration
    }

    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Active
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedOrder {
    pub order_id: OrderId,
    pub expiration: u64,
    pub sell_rate: U256,

    /// Principal the order will actually sell
    pub deposit: U256,

    /// Part of `amount_in` the rate cannot represent, returned to the caller
    pub dust_refund: U256,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelledOrder {
    /// Unsold principal, in the sell token
    pub refund_principal: U256,

    /// Unwithdrawn proceeds, in the buy token
    pub refund_proceeds: U256,
}

/// Reject requests that no pool state could accept
pub fn check_order_request(config: &PoolConfig, amount_in: U256, number_of_intervals: u64) -> Result<()> {
    if amount_in.is_zero() {
        return Err(TwammError::ZeroAmount);
    }
    if number_of_intervals == 0 {
        return Err(TwammError::ZeroIntervals);
    }
    if number_of_intervals > config.max_order_intervals {
        return Err(InvalidOrderReason::TooManyIntervals.into());
    }
    Ok(())
}

/// First interval boundary at or before `now`, plus `number_of_intervals` intervals
pub fn order_expiration(now: u64, order_interval: u64, number_of_intervals: u64) -> Result<u64> {
    let aligned = now - now % order_interval;
    number_of_intervals
        .checked_mul(order_interval)
        .and_then(|length| aligned.checked_add(length))
        .ok_or(TwammError::ArithmeticOverflow)
}

impl PoolState {
    pub(crate) fn submit_order(
        &mut self,
        config: &PoolConfig,
        now: u64,
        owner: Address,
        sell_token: Token,
        amount_in: U256,
        number_of_intervals: u64,
    ) -> Result<SubmittedOrder> {
        check_order_request(config, amount_in, number_of_intervals)?;
        if self.reserves.is_empty() {
            return Err(TwammError::InsufficientLiquidity);
        }

        let expiration = order_expiration(now, config.order_interval, number_of_intervals)?;
        let duration = U256::from(expiration - now);
        let sell_rate = mul_div(amount_in, SELL_RATE_PRECISION, duration)?;
        if sell_rate.is_zero() {
            return Err(TwammError::ZeroAmount);
        }
        let deposit = mul_div_up(sell_rate, duration, SELL_RATE_PRECISION)?;
        let dust_refund = amount_in - deposit;

        let held = &mut self.twamm_reserves[sell_token.index()];
        *held = held.checked_add(deposit).ok_or(TwammError::ArithmeticOverflow)?;

        let pool = &mut self.order_pools[sell_token.index()];
        pool.add_order(sell_rate, expiration)?;
        let reward_factor_snapshot = pool.reward_factor;

        let order_id = self.next_order_id;
        self.next_order_id = order_id.checked_add(1).ok_or(TwammError::ArithmeticOverflow)?;
        self.orders.insert(
            order_id,
            Order {
                id: order_id,
                owner,
                sell_token,
                sell_rate,
                deposit,
                submitted_at: now,
                expiration,
                reward_factor_snapshot,
                status: OrderStatus::Active,
            },
        );

        Ok(SubmittedOrder {
            order_id,
            expiration,
            sell_rate,
            deposit,
            dust_refund,
        })
    }

    pub(crate) fn cancel_order(&mut self, now: u64, caller: Address, order_id: OrderId) -> Result<CancelledOrder> {
        let order = self.owned_order(caller, order_id)?.clone();
        match order.status {
            OrderStatus::Active => {}
            OrderStatus::Cancelled => return Err(InvalidOrderReason::AlreadyCancelled.into()),
            OrderStatus::Withdrawn => return Err(InvalidOrderReason::AlreadyWithdrawn.into()),
        }
        if order.is_expired(now) {
            return Err(InvalidOrderReason::Expired.into());
        }

        let pool = &mut self.order_pools[order.sell_token.index()];
        let refund_proceeds = pool.claimable(order.sell_rate, order.reward_factor_snapshot, pool.reward_factor)?;
        pool.pay_out(refund_proceeds)?;
        let refund_principal = mul_div(
            order.sell_rate,
            U256::from(order.expiration - now),
            SELL_RATE_PRECISION,
        )?;
        pool.remove_order(order.sell_rate, order.expiration)?;

        self.release(order.sell_token, refund_principal)?;
        self.release(order.buy_token(), refund_proceeds)?;
        if let Some(stored) = self.orders.get_mut(&order_id) {
            stored.status = OrderStatus::Cancelled;
        }

        Ok(CancelledOrder {
            refund_principal,
            refund_proceeds,
        })
    }

    /// Pay out accumulated proceeds; settles the order once expired
    pub(crate) fn withdraw_order_proceeds(&mut self, now: u64, caller: Address, order_id: OrderId) -> Result<U256> {
        let order = self.owned_order(caller, order_id)?.clone();
        match order.status {
            OrderStatus::Active => {}
            OrderStatus::Withdrawn => return Ok(U256::zero()),
            OrderStatus::Cancelled => return Err(InvalidOrderReason::AlreadyCancelled.into()),
        }

        let proceeds = self.pending_proceeds(&order)?;
        let pool = &mut self.order_pools[order.sell_token.index()];
        pool.pay_out(proceeds)?;
        let current_factor = pool.reward_factor;
        self.release(order.buy_token(), proceeds)?;

        if let Some(stored) = self.orders.get_mut(&order_id) {
            if order.is_expired(now) {
                stored.status = OrderStatus::Withdrawn;
            } else {
                stored.reward_factor_snapshot = current_factor;
            }
        }
        if order.is_expired(now) && !self.has_unsettled_order(order.sell_token, order.expiration) {
            self.order_pools[order.sell_token.index()].forget_expiry(order.expiration);
        }
        Ok(proceeds)
    }

    /// Proceeds an order could withdraw right now, given executed state
    pub fn pending_proceeds(&self, order: &Order) -> Result<U256> {
        if !order.is_active() {
            return Ok(U256::zero());
        }
        let pool = &self.order_pools[order.sell_token.index()];
        let factor = if order.is_expired(self.last_virtual_order_timestamp) {
            // recorded when the expiry boundary was processed
            pool.reward_factor_at_expiry(order.expiration)
                .ok_or(TwammError::ArithmeticOverflow)?
        } else {
            pool.reward_factor
        };
        pool.claimable(order.sell_rate, order.reward_factor_snapshot, factor)
    }

    fn has_unsettled_order(&self, sell_token: Token, expiration: u64) -> bool {
        self.orders.values().any(|order| {
            order.sell_token == sell_token && order.expiration == expiration && order.status == OrderStatus::Active
        })
    }

    fn owned_order(&self, caller: Address, order_id: OrderId) -> Result<&Order> {
        let order = self
            .orders
            .get(&order_id)
            .ok_or(TwammError::InvalidOrder(InvalidOrderReason::UnknownOrder))?;
        if order.owner != caller {
            return Err(InvalidOrderReason::NotOwner.into());
        }
        Ok(order)
    }

    /// Take `amount` out of the tokens held for long-term orders
    fn release(&mut self, token: Token, amount: U256) -> Result<()> {
        let held = &mut self.twamm_reserves[token.index()];
        *held = held.checked_sub(amount).ok_or(TwammError::ArithmeticOverflow)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address([1u8; 32]);
    const BOB: Address = Address([2u8; 32]);

    fn config() -> PoolConfig {
        PoolConfig::default()
    }

    fn seeded_state() -> PoolState {
        let mut state = PoolState::new(0);
        let reserve = U256::from(1_000_000_000_000u64);
        state.reserves.mint(reserve, reserve, 100).unwrap();
        state
    }

    fn run_to(state: &mut PoolState, target: u64) {
        state.execute_virtual_orders(target, 30, 1_000).unwrap();
    }

    #[test]
    fn test_expiration_alignment() {
        assert_eq!(order_expiration(0, 3600, 1).unwrap(), 3600);
        assert_eq!(order_expiration(5_000, 3600, 2).unwrap(), 10_800);
        assert_eq!(order_expiration(7_200, 3600, 1).unwrap(), 10_800);
        assert_eq!(order_expiration(0, u64::MAX, 2), Err(TwammError::ArithmeticOverflow));
    }

    #[test]
    fn test_request_validation() {
        let cfg = config();
        assert_eq!(check_order_request(&cfg, U256::zero(), 1), Err(TwammError::ZeroAmount));
        assert_eq!(check_order_request(&cfg, U256::one(), 0), Err(TwammError::ZeroIntervals));
        assert_eq!(
            check_order_request(&cfg, U256::one(), cfg.max_order_intervals + 1),
            Err(TwammError::InvalidOrder(InvalidOrderReason::TooManyIntervals))
        );
    }

    #[test]
    fn test_submit_on_boundary() {
        let mut state = seeded_state();
        let submitted = state
            .submit_order(&config(), 0, ALICE, Token::Token0, U256::from(36_000_000u64), 10)
            .unwrap();

        assert_eq!(submitted.order_id, 0);
        assert_eq!(submitted.expiration, 36_000);
        // 1000 tokens per second
        assert_eq!(submitted.sell_rate, U256::from(1_000u64) * SELL_RATE_PRECISION);
        assert!(submitted.dust_refund.is_zero());
        assert_eq!(state.twamm_reserves[0], U256::from(36_000_000u64));
        assert_eq!(state.order_pools[0].current_sell_rate, submitted.sell_rate);
        assert_eq!(state.next_order_id, 1);
    }

    #[test]
    fn test_submit_mid_interval_refunds_dust() {
        let mut state = seeded_state();
        state.last_virtual_order_timestamp = 1_000;
        let amount = U256::from(1_000_003u64);
        let submitted = state.submit_order(&config(), 1_000, ALICE, Token::Token1, amount, 1).unwrap();

        // sells over the 2600 seconds left in the interval
        assert_eq!(submitted.expiration, 3_600);
        assert_eq!(submitted.deposit + submitted.dust_refund, amount);
        assert!(submitted.deposit <= amount);
        assert_eq!(state.twamm_reserves[1], submitted.deposit);
    }

    #[test]
    fn test_submit_rejects_rate_below_precision() {
        let mut state = seeded_state();
        let result = state.submit_order(&config(), 0, ALICE, Token::Token0, U256::one(), 8760);
        assert_eq!(result, Err(TwammError::ZeroAmount));
    }

    #[test]
    fn test_submit_needs_liquidity() {
        let mut state = PoolState::new(0);
        let result = state.submit_order(&config(), 0, ALICE, Token::Token0, U256::from(1_000u64), 1);
        assert_eq!(result, Err(TwammError::InsufficientLiquidity));
    }

    #[test]
    fn test_cancel_checks_owner_and_status() {
        let mut state = seeded_state();
        let id = state
            .submit_order(&config(), 0, ALICE, Token::Token0, U256::from(7_200_000u64), 2)
            .unwrap()
            .order_id;

        assert_eq!(
            state.cancel_order(0, BOB, id),
            Err(TwammError::InvalidOrder(InvalidOrderReason::NotOwner))
        );
        assert_eq!(
            state.cancel_order(0, ALICE, 99),
            Err(TwammError::InvalidOrder(InvalidOrderReason::UnknownOrder))
        );

        run_to(&mut state, 3_600);
        let cancelled = state.cancel_order(3_600, ALICE, id).unwrap();
        assert_eq!(cancelled.refund_principal, U256::from(3_600_000u64));
        assert!(!cancelled.refund_proceeds.is_zero());
        assert!(state.order_pools[0].current_sell_rate.is_zero());
        assert!(state.order_pools[0].sell_rate_ending_at.is_empty());

        assert_eq!(
            state.cancel_order(3_600, ALICE, id),
            Err(TwammError::InvalidOrder(InvalidOrderReason::AlreadyCancelled))
        );
        assert_eq!(
            state.withdraw_order_proceeds(3_600, ALICE, id),
            Err(TwammError::InvalidOrder(InvalidOrderReason::AlreadyCancelled))
        );
    }

    #[test]
    fn test_cancel_after_expiry_is_rejected() {
        let mut state = seeded_state();
        let id = state
            .submit_order(&config(), 0, ALICE, Token::Token0, U256::from(3_600_000u64), 1)
            .unwrap()
            .order_id;
        run_to(&mut state, 3_600);
        assert_eq!(
            state.cancel_order(3_600, ALICE, id),
            Err(TwammError::InvalidOrder(InvalidOrderReason::Expired))
        );
    }

    #[test]
    fn test_partial_then_final_withdrawal() {
        let mut state = seeded_state();
        let id = state
            .submit_order(&config(), 0, ALICE, Token::Token0, U256::from(7_200_000u64), 2)
            .unwrap()
            .order_id;

        run_to(&mut state, 3_600);
        let first = state.withdraw_order_proceeds(3_600, ALICE, id).unwrap();
        assert!(!first.is_zero());
        assert_eq!(state.orders[&id].status, OrderStatus::Active);

        // nothing accrued since the partial withdrawal
        assert!(state.withdraw_order_proceeds(3_600, ALICE, id).unwrap().is_zero());

        run_to(&mut state, 9_000);
        let second = state.withdraw_order_proceeds(9_000, ALICE, id).unwrap();
        assert!(!second.is_zero());
        assert_eq!(state.orders[&id].status, OrderStatus::Withdrawn);

        // roughly 7.2M sold into a 1e12 pool at a 0.3% fee
        let total = first + second;
        assert!(total > U256::from(7_100_000u64) && total < U256::from(7_200_000u64));

        let settled = state.clone();
        assert!(state.withdraw_order_proceeds(12_000, ALICE, id).unwrap().is_zero());
        assert_eq!(state, settled);
    }

    #[test]
    fn test_expired_order_settles_at_expiry_factor() {
        let mut state = seeded_state();
        let short = state
            .submit_order(&config(), 0, ALICE, Token::Token0, U256::from(3_600_000u64), 1)
            .unwrap()
            .order_id;
        state
            .submit_order(&config(), 0, BOB, Token::Token0, U256::from(36_000_000u64), 10)
            .unwrap();

        run_to(&mut state, 3_600);
        let at_expiry = state.pending_proceeds(&state.orders[&short]).unwrap();

        // later flow keeps growing the pool's reward factor
        run_to(&mut state, 20_000);
        assert_eq!(state.pending_proceeds(&state.orders[&short]).unwrap(), at_expiry);
        assert_eq!(state.withdraw_order_proceeds(20_000, ALICE, short).unwrap(), at_expiry);
    }

    #[test]
    fn test_settled_expiry_is_forgotten() {
        let mut state = seeded_state();
        let alice = state
            .submit_order(&config(), 0, ALICE, Token::Token0, U256::from(3_600_000u64), 1)
            .unwrap()
            .order_id;
        let bob = state
            .submit_order(&config(), 0, BOB, Token::Token0, U256::from(7_200_000u64), 1)
            .unwrap()
            .order_id;
        run_to(&mut state, 5_000);

        state.withdraw_order_proceeds(5_000, ALICE, alice).unwrap();
        assert!(state.order_pools[0].reward_factor_at_expiry(3_600).is_some());

        state.withdraw_order_proceeds(5_000, BOB, bob).unwrap();
        assert!(state.order_pools[0].reward_factor_at.is_empty());
        assert_eq!(state.orders[&bob].status, OrderStatus::Withdrawn);
    }
}
