//! TWAMM pool facade
//!
//! `TwammPool` owns the configuration, the persisted `PoolState` and the event
//! journal. Every mutating operation runs on a staged copy of the state:
//! virtual orders are caught up to `now`, the operation's own effect is
//! applied, and the copy replaces the live state only if both succeed.

use std::collections::BTreeMap;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use twamm_math::U256;

use crate::config::PoolConfig;
use crate::error::{InvalidOrderReason, Result, TwammError};
use crate::events::PoolEvent;
use crate::executor::ExecutionReport;
use crate::order_pool::OrderPool;
use crate::orders::{CancelledOrder, Order, OrderStatus, SubmittedOrder};
use crate::reserve_pool::ReservePool;
use crate::types::{Address, OrderId, Token};
use crate::MAX_RESERVE;

// ============================================================================
// Persisted state
// ============================================================================

/// Everything needed to restore a pool exactly
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub reserves: ReservePool,

    /// Indexed by the token each pool sells
    pub order_pools: [OrderPool; 2],

    pub orders: BTreeMap<OrderId, Order>,
    pub next_order_id: OrderId,
    pub last_virtual_order_timestamp: u64,

    /// Tokens held for long-term orders: unsold principal and unclaimed proceeds
    pub twamm_reserves: [U256; 2],
}

impl PoolState {
    pub fn new(created_at: u64) -> Self {
        Self {
            reserves: ReservePool::default(),
            order_pools: [OrderPool::new(), OrderPool::new()],
            orders: BTreeMap::new(),
            next_order_id: 0,
            last_virtual_order_timestamp: created_at,
            twamm_reserves: [U256::zero(), U256::zero()],
        }
    }

    /// Total of a token the pool accounts for: reserves plus order balances
    pub fn total_held(&self, token: Token) -> Option<U256> {
        self.reserves
            .reserve(token)
            .checked_add(self.twamm_reserves[token.index()])
    }

    /// Reserves can only grow by tokens already held for orders, so keeping
    /// the total under `MAX_RESERVE` keeps every future catch-up step in range
    pub(crate) fn ensure_reserve_headroom(&self, token: Token) -> Result<()> {
        match self.total_held(token) {
            Some(total) if total <= MAX_RESERVE => Ok(()),
            _ => Err(TwammError::ArithmeticOverflow),
        }
    }
}

// ============================================================================
// Pool facade
// ============================================================================

pub struct TwammPool {
    config: PoolConfig,
    state: PoolState,
    events: Vec<PoolEvent>,
}

impl TwammPool {
    /// Create an empty pool whose virtual clock starts at `created_at`
    pub fn new(config: PoolConfig, created_at: u64) -> Result<Self> {
        Self::from_parts(config, PoolState::new(created_at))
    }

    /// Restore a pool from persisted state
    pub fn from_parts(config: PoolConfig, state: PoolState) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state,
            events: Vec::new(),
        })
    }

    pub fn into_parts(self) -> (PoolConfig, PoolState) {
        (self.config, self.state)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn state(&self) -> &PoolState {
        &self.state
    }

    /// Drain the events of every operation committed so far
    pub fn take_events(&mut self) -> Vec<PoolEvent> {
        std::mem::take(&mut self.events)
    }

    /// Run `operation` on a staged copy after catching virtual orders up to `now`
    fn transact<T, F>(&mut self, now: u64, operation: F) -> Result<T>
    where
        F: FnOnce(&mut PoolState, &PoolConfig, &mut Vec<PoolEvent>) -> Result<T>,
    {
        let last = self.state.last_virtual_order_timestamp;
        if now < last {
            return Err(TwammError::StaleTimestamp { now, last });
        }

        let mut staged = self.state.clone();
        let mut events = Vec::new();

        let report = staged.execute_virtual_orders(
            now,
            self.config.fee_bps,
            self.config.max_virtual_order_steps,
        )?;
        if !report.complete {
            return Err(TwammError::VirtualOrderBacklog {
                reached: report.reached,
                target: now,
            });
        }
        if report.steps > 0 {
            events.push(executed_event(&report));
        }

        let output = operation(&mut staged, &self.config, &mut events)?;

        self.state = staged;
        self.events.extend(events);
        Ok(output)
    }

    // ========================================================================
    // Liquidity and instant swaps
    // ========================================================================

    pub fn mint(&mut self, now: u64, to: Address, amount0: U256, amount1: U256) -> Result<U256> {
        let liquidity = self.transact(now, |state, config, events| {
            let protocol_fee = config.protocol_fee.as_ref();
            mint_protocol_fee(state, config, events)?;
            let liquidity = state
                .reserves
                .mint(amount0, amount1, config.max_deposit_imbalance_bps)?;
            state.ensure_reserve_headroom(Token::Token0)?;
            state.ensure_reserve_headroom(Token::Token1)?;
            state.reserves.update_k_last(protocol_fee);
            events.push(PoolEvent::Mint {
                to,
                amount0,
                amount1,
                liquidity,
            });
            Ok(liquidity)
        })?;
        info!("mint: {} liquidity to {} for ({}, {})", liquidity, to, amount0, amount1);
        Ok(liquidity)
    }

    pub fn burn(&mut self, now: u64, to: Address, liquidity: U256) -> Result<(U256, U256)> {
        let (amount0, amount1) = self.transact(now, |state, config, events| {
            mint_protocol_fee(state, config, events)?;
            let (amount0, amount1) = state.reserves.burn(liquidity)?;
            state.reserves.update_k_last(config.protocol_fee.as_ref());
            events.push(PoolEvent::Burn {
                to,
                amount0,
                amount1,
                liquidity,
            });
            Ok((amount0, amount1))
        })?;
        info!("burn: {} liquidity for ({}, {}) to {}", liquidity, amount0, amount1, to);
        Ok((amount0, amount1))
    }

    pub fn swap(&mut self, now: u64, token_in: Token, amount_in: U256, to: Address) -> Result<U256> {
        let amount_out = self.transact(now, |state, config, events| {
            let amount_out = state.reserves.swap(token_in, amount_in, config.fee_bps)?;
            state.ensure_reserve_headroom(token_in)?;
            events.push(PoolEvent::Swap {
                to,
                token_in,
                amount_in,
                amount_out,
            });
            Ok(amount_out)
        })?;
        info!("swap: {} {} in, {} {} out", amount_in, token_in, amount_out, token_in.opposite());
        Ok(amount_out)
    }

    // ========================================================================
    // Long-term orders
    // ========================================================================

    pub fn submit_long_term_order(
        &mut self,
        now: u64,
        caller: Address,
        sell_token: Token,
        amount_in: U256,
        number_of_intervals: u64,
    ) -> Result<SubmittedOrder> {
        let submitted = self.transact(now, |state, config, events| {
            let submitted =
                state.submit_order(config, now, caller, sell_token, amount_in, number_of_intervals)?;
            state.ensure_reserve_headroom(sell_token)?;
            events.push(PoolEvent::LongTermOrderSubmitted {
                order_id: submitted.order_id,
                owner: caller,
                sell_token,
                deposit: submitted.deposit,
                sell_rate: submitted.sell_rate,
                expiration: submitted.expiration,
                dust_refund: submitted.dust_refund,
            });
            Ok(submitted)
        })?;
        info!(
            "order {} submitted: selling {} {} until {}",
            submitted.order_id, submitted.deposit, sell_token, submitted.expiration
        );
        Ok(submitted)
    }

    pub fn cancel_long_term_order(&mut self, now: u64, caller: Address, order_id: OrderId) -> Result<CancelledOrder> {
        let cancelled = self.transact(now, |state, _config, events| {
            let cancelled = state.cancel_order(now, caller, order_id)?;
            events.push(PoolEvent::LongTermOrderCancelled {
                order_id,
                owner: caller,
                refund_principal: cancelled.refund_principal,
                refund_proceeds: cancelled.refund_proceeds,
            });
            Ok(cancelled)
        })?;
        info!(
            "order {} cancelled: refunded {} principal, {} proceeds",
            order_id, cancelled.refund_principal, cancelled.refund_proceeds
        );
        Ok(cancelled)
    }

    /// Withdraw an order's proceeds so far; settles it once expired
    ///
    /// A settled order returns zero without touching the pool.
    pub fn withdraw_proceeds(&mut self, now: u64, caller: Address, order_id: OrderId) -> Result<U256> {
        if let Some(order) = self.state.orders.get(&order_id) {
            if order.owner == caller && order.status == OrderStatus::Withdrawn {
                debug!("order {} already settled", order_id);
                return Ok(U256::zero());
            }
        }

        let proceeds = self.transact(now, |state, _config, events| {
            let proceeds = state.withdraw_order_proceeds(now, caller, order_id)?;
            let order = state
                .orders
                .get(&order_id)
                .ok_or(TwammError::InvalidOrder(InvalidOrderReason::UnknownOrder))?;
            events.push(PoolEvent::ProceedsWithdrawn {
                order_id,
                owner: caller,
                buy_token: order.buy_token(),
                proceeds,
                expired: order.status == OrderStatus::Withdrawn,
            });
            Ok(proceeds)
        })?;
        info!("order {}: withdrew {} proceeds", order_id, proceeds);
        Ok(proceeds)
    }

    /// Catch virtual orders up to `target`
    ///
    /// Stops after `max_virtual_order_steps` steps and keeps that progress;
    /// call again while the report is incomplete.
    pub fn execute_virtual_orders(&mut self, target: u64) -> Result<ExecutionReport> {
        let mut staged = self.state.clone();
        let report = staged.execute_virtual_orders(
            target,
            self.config.fee_bps,
            self.config.max_virtual_order_steps,
        )?;
        self.state = staged;
        if report.steps > 0 {
            self.events.push(executed_event(&report));
        }
        if !report.complete {
            info!("virtual orders reached {} of {}, more steps needed", report.reached, target);
        }
        Ok(report)
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// (reserve0, reserve1, last_virtual_order_timestamp)
    pub fn reserves(&self) -> (U256, U256, u64) {
        (
            self.state.reserves.reserve0,
            self.state.reserves.reserve1,
            self.state.last_virtual_order_timestamp,
        )
    }

    /// Reserves as they would be after catching up to `now`, without mutating
    pub fn reserves_after_virtual_orders(&self, now: u64) -> Result<(U256, U256)> {
        let simulated = self.simulate(now)?;
        Ok((simulated.reserves.reserve0, simulated.reserves.reserve1))
    }

    pub fn twamm_reserves(&self) -> (U256, U256) {
        (self.state.twamm_reserves[0], self.state.twamm_reserves[1])
    }

    pub fn total_supply(&self) -> U256 {
        self.state.reserves.total_supply
    }

    pub fn order_pool(&self, token: Token) -> &OrderPool {
        &self.state.order_pools[token.index()]
    }

    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        self.state.orders.get(&order_id)
    }

    pub fn orders_of(&self, owner: Address) -> Vec<&Order> {
        self.state.orders.values().filter(|order| order.owner == owner).collect()
    }

    /// Proceeds an order could withdraw at `now`, without mutating
    pub fn order_proceeds(&self, order_id: OrderId, now: u64) -> Result<U256> {
        let simulated = self.simulate(now)?;
        let order = simulated
            .orders
            .get(&order_id)
            .ok_or(TwammError::InvalidOrder(InvalidOrderReason::UnknownOrder))?;
        simulated.pending_proceeds(order)
    }

    /// Copy of the state caught up to `now`, ignoring the step cap
    fn simulate(&self, now: u64) -> Result<PoolState> {
        let last = self.state.last_virtual_order_timestamp;
        if now < last {
            return Err(TwammError::StaleTimestamp { now, last });
        }
        let mut simulated = self.state.clone();
        simulated.execute_virtual_orders(now, self.config.fee_bps, u32::MAX)?;
        Ok(simulated)
    }
}

fn mint_protocol_fee(state: &mut PoolState, config: &PoolConfig, events: &mut Vec<PoolEvent>) -> Result<()> {
    let protocol_fee = config.protocol_fee.as_ref();
    let liquidity = state.reserves.mint_protocol_fee(protocol_fee)?;
    if let Some(fee) = protocol_fee {
        if !liquidity.is_zero() {
            debug!("protocol fee: {} liquidity to {}", liquidity, fee.fee_to);
            events.push(PoolEvent::ProtocolFeeMinted {
                fee_to: fee.fee_to,
                liquidity,
            });
        }
    }
    Ok(())
}

fn executed_event(report: &ExecutionReport) -> PoolEvent {
    PoolEvent::VirtualOrdersExecuted {
        from: report.from,
        to: report.reached,
        steps: report.steps,
        token0_sold: report.token0_sold,
        token1_sold: report.token1_sold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LP: Address = Address([9u8; 32]);
    const ALICE: Address = Address([1u8; 32]);

    fn e18(n: u64) -> U256 {
        U256::from(n) * U256::exp10(18)
    }

    fn seeded_pool() -> TwammPool {
        let mut pool = TwammPool::new(PoolConfig::default(), 0).unwrap();
        pool.mint(0, LP, e18(1_000_000), e18(1_000_000)).unwrap();
        pool.take_events();
        pool
    }

    #[test]
    fn test_new_pool_rejects_bad_config() {
        let config = PoolConfig { order_interval: 0, ..PoolConfig::default() };
        assert!(matches!(TwammPool::new(config, 0), Err(TwammError::InvalidConfig(_))));
    }

    #[test]
    fn test_stale_timestamp() {
        let mut pool = seeded_pool();
        pool.execute_virtual_orders(1_000).unwrap();
        let before = pool.state().clone();

        let result = pool.swap(999, Token::Token0, e18(1), ALICE);
        assert_eq!(result, Err(TwammError::StaleTimestamp { now: 999, last: 1_000 }));
        assert_eq!(pool.state(), &before);
    }

    #[test]
    fn test_failed_operation_rolls_back_catch_up() {
        let mut pool = seeded_pool();
        pool.submit_long_term_order(0, ALICE, Token::Token0, e18(100), 2).unwrap();
        pool.take_events();
        let before = pool.state().clone();

        let result = pool.swap(3_600, Token::Token0, U256::zero(), ALICE);
        assert_eq!(result, Err(TwammError::ZeroAmount));
        assert_eq!(pool.state(), &before);
        assert!(pool.take_events().is_empty());
    }

    #[test]
    fn test_operation_runs_catch_up_first() {
        let mut pool = seeded_pool();
        pool.submit_long_term_order(0, ALICE, Token::Token0, e18(100), 2).unwrap();
        let expected = pool.reserves_after_virtual_orders(3_600).unwrap();

        let amount_out = pool.swap(3_600, Token::Token1, e18(1), ALICE).unwrap();
        let (reserve0, reserve1, last) = pool.reserves();
        assert_eq!(last, 3_600);
        assert_eq!(reserve0 + amount_out, expected.0);
        assert_eq!(reserve1, expected.1 + e18(1));

        let events = pool.take_events();
        assert!(matches!(events[1], PoolEvent::VirtualOrdersExecuted { from: 0, to: 3_600, .. }));
        assert!(matches!(events.last(), Some(PoolEvent::Swap { .. })));
    }

    #[test]
    fn test_backlog_blocks_operations_until_executed() {
        let config = PoolConfig { max_virtual_order_steps: 2, ..PoolConfig::default() };
        let mut pool = TwammPool::new(config, 0).unwrap();
        pool.mint(0, LP, e18(1_000_000), e18(1_000_000)).unwrap();
        for intervals in 1..=4 {
            pool.submit_long_term_order(0, ALICE, Token::Token0, e18(10), intervals).unwrap();
        }
        let before = pool.state().clone();

        let result = pool.swap(20_000, Token::Token0, e18(1), ALICE);
        assert_eq!(result, Err(TwammError::VirtualOrderBacklog { reached: 7_200, target: 20_000 }));
        assert_eq!(pool.state(), &before);

        let first = pool.execute_virtual_orders(20_000).unwrap();
        assert!(!first.complete);
        let second = pool.execute_virtual_orders(20_000).unwrap();
        assert!(!second.complete);
        assert_eq!(second.reached, 14_400);
        let third = pool.execute_virtual_orders(20_000).unwrap();
        assert!(third.complete);

        assert!(pool.swap(20_000, Token::Token0, e18(1), ALICE).is_ok());
    }

    #[test]
    fn test_views_do_not_mutate() {
        let mut pool = seeded_pool();
        let id = pool
            .submit_long_term_order(0, ALICE, Token::Token1, e18(1_000), 5)
            .unwrap()
            .order_id;
        let before = pool.state().clone();

        let proceeds = pool.order_proceeds(id, 18_000).unwrap();
        let reserves = pool.reserves_after_virtual_orders(18_000).unwrap();
        assert!(!proceeds.is_zero());
        assert!(reserves.1 > before.reserves.reserve1);
        assert_eq!(pool.state(), &before);

        assert_eq!(pool.withdraw_proceeds(18_000, ALICE, id).unwrap(), proceeds);
        assert_eq!(pool.orders_of(ALICE).len(), 1);
        assert!(pool.orders_of(LP).is_empty());
    }

    #[test]
    fn test_protocol_fee_minted_on_liquidity_change() {
        let fee_to = Address([7u8; 32]);
        let config = PoolConfig {
            protocol_fee: Some(crate::config::ProtocolFee { fee_to, share_denominator: 6 }),
            ..PoolConfig::default()
        };
        let mut pool = TwammPool::new(config, 0).unwrap();
        pool.mint(0, LP, e18(1_000), e18(1_000)).unwrap();
        for _ in 0..10 {
            pool.swap(0, Token::Token0, e18(50), ALICE).unwrap();
            pool.swap(0, Token::Token1, e18(50), ALICE).unwrap();
        }
        pool.take_events();

        pool.burn(0, LP, e18(1)).unwrap();
        let events = pool.take_events();
        assert!(matches!(events[0], PoolEvent::ProtocolFeeMinted { fee_to: to, .. } if to == fee_to));
        assert!(!pool.state().reserves.protocol_fee_liquidity.is_zero());
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let mut pool = seeded_pool();
        pool.submit_long_term_order(0, ALICE, Token::Token0, e18(500), 3).unwrap();
        pool.execute_virtual_orders(5_000).unwrap();

        let json = serde_json::to_string(pool.state()).unwrap();
        let restored: PoolState = serde_json::from_str(&json).unwrap();
        assert_eq!(&restored, pool.state());

        let mut copy = TwammPool::from_parts(pool.config().clone(), restored).unwrap();
        let a = pool.withdraw_proceeds(9_000, ALICE, 0).unwrap();
        let b = copy.withdraw_proceeds(9_000, ALICE, 0).unwrap();
        assert_eq!(a, b);
        assert_eq!(pool.state(), copy.state());
    }
}
