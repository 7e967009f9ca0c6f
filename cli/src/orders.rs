//! Long-term order operations

use anyhow::{Context, Result};
use colored::Colorize;

use twamm::{Address, Order, OrderId, OrderStatus, Token, U256};

use crate::{status, store, Session};

pub fn submit(session: &Session, sell_token: Token, amount: U256, intervals: u64) -> Result<()> {
    println!("{}", "=== Submit Long-Term Order ===".bright_green().bold());
    println!("{} {} {}", "Selling:".bright_cyan(), amount, sell_token);
    println!("{} {}", "Intervals:".bright_cyan(), intervals);
    println!("{} {}", "Owner:".bright_cyan(), session.caller);

    let (submitted, events) = store::update_pool(&session.state_path, |pool| {
        let submitted =
            pool.submit_long_term_order(session.now, session.caller, sell_token, amount, intervals)?;
        Ok((submitted, pool.take_events()))
    })?;

    status::print_events(&events);
    println!("\n{} {}", "Order ID:".bright_green(), submitted.order_id);
    println!("{} {}", "Expiration:".bright_cyan(), submitted.expiration);
    println!("{} {}", "Sell Rate:".bright_cyan(), submitted.sell_rate);
    println!("{} {}", "Deposit:".bright_cyan(), submitted.deposit);
    if !submitted.dust_refund.is_zero() {
        println!("{} {} {}", "Dust Refund:".yellow(), submitted.dust_refund, sell_token);
    }
    Ok(())
}

pub fn cancel(session: &Session, order_id: OrderId) -> Result<()> {
    println!("{}", "=== Cancel Long-Term Order ===".bright_green().bold());
    println!("{} {}", "Order ID:".bright_cyan(), order_id);

    let (cancelled, events) = store::update_pool(&session.state_path, |pool| {
        let cancelled = pool.cancel_long_term_order(session.now, session.caller, order_id)?;
        Ok((cancelled, pool.take_events()))
    })?;

    status::print_events(&events);
    println!("\n{} {}", "Principal Refund:".bright_green(), cancelled.refund_principal);
    println!("{} {}", "Proceeds Refund:".bright_green(), cancelled.refund_proceeds);
    Ok(())
}

pub fn withdraw(session: &Session, order_id: OrderId) -> Result<()> {
    println!("{}", "=== Withdraw Proceeds ===".bright_green().bold());
    println!("{} {}", "Order ID:".bright_cyan(), order_id);

    let (proceeds, status_after, events) = store::update_pool(&session.state_path, |pool| {
        let proceeds = pool.withdraw_proceeds(session.now, session.caller, order_id)?;
        let status_after = pool.order(order_id).map(|order| order.status);
        Ok((proceeds, status_after, pool.take_events()))
    })?;

    status::print_events(&events);
    println!("\n{} {}", "Proceeds:".bright_green(), proceeds);
    if status_after == Some(OrderStatus::Withdrawn) {
        println!("{}", "Order settled".dimmed());
    }
    Ok(())
}

pub fn show(session: &Session, order_id: OrderId) -> Result<()> {
    let pool = store::load_pool(&session.state_path)?;
    let order = pool
        .order(order_id)
        .with_context(|| format!("Order {} not found", order_id))?;

    println!("{}", format!("=== Order {} ===", order_id).bright_green().bold());
    print_order(order);

    if order.status == OrderStatus::Active {
        let proceeds = pool.order_proceeds(order_id, session.now.max(pool.reserves().2))?;
        println!("{} {} {}", "Withdrawable:".bright_cyan(), proceeds, order.buy_token());
    }
    Ok(())
}

pub fn list(session: &Session, owner: Option<Address>) -> Result<()> {
    let pool = store::load_pool(&session.state_path)?;
    let owner = owner.unwrap_or(session.caller);

    println!("{}", "=== Long-Term Orders ===".bright_green().bold());
    println!("{} {}", "Owner:".bright_cyan(), owner);

    let orders = pool.orders_of(owner);
    if orders.is_empty() {
        println!("\n{}", "No orders found".dimmed());
        return Ok(());
    }
    for order in orders {
        println!();
        print_order(order);
    }
    Ok(())
}

fn print_order(order: &Order) {
    let status = match order.status {
        OrderStatus::Active => "active".bright_green(),
        OrderStatus::Withdrawn => "withdrawn".dimmed(),
        OrderStatus::Cancelled => "cancelled".yellow(),
    };
    println!("{} {}", "ID:".bright_cyan(), order.id);
    println!("{} {}", "Status:".bright_cyan(), status);
    println!("{} {} -> {}", "Pair:".bright_cyan(), order.sell_token, order.buy_token());
    println!("{} {}", "Deposit:".bright_cyan(), order.deposit);
    println!("{} {}", "Sell Rate:".bright_cyan(), order.sell_rate);
    println!("{} {} .. {}", "Window:".bright_cyan(), order.submitted_at, order.expiration);
}
