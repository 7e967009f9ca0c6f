//! Pool creation and status display

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use twamm::{PoolConfig, PoolEvent, Token, TwammPool};

use crate::{config, store, Session};

pub fn init_pool(session: &Session, config_path: Option<PathBuf>, start: Option<u64>, force: bool) -> Result<()> {
    println!("{}", "=== Initialize Pool ===".bright_green().bold());

    if session.state_path.exists() && !force {
        anyhow::bail!(
            "Pool state already exists: {}\n\
             Pass --force to replace it",
            session.state_path.display()
        );
    }

    let pool_config = match &config_path {
        Some(path) => config::load_config(path)?,
        None => PoolConfig::default(),
    };
    let start = start.unwrap_or(session.now);
    let pool = TwammPool::new(pool_config, start).context("Failed to create pool")?;

    let cfg = pool.config();
    println!("{} {}", "State File:".bright_cyan(), session.state_path.display());
    println!("{} {}s", "Order Interval:".bright_cyan(), cfg.order_interval);
    println!("{} {} bps", "Swap Fee:".bright_cyan(), cfg.fee_bps);
    println!("{} {}", "Max Steps/Call:".bright_cyan(), cfg.max_virtual_order_steps);
    println!("{} {}", "Max Order Intervals:".bright_cyan(), cfg.max_order_intervals);
    match &cfg.protocol_fee {
        Some(fee) => println!(
            "{} 1/{} to {}",
            "Protocol Fee:".bright_cyan(),
            fee.share_denominator,
            fee.fee_to
        ),
        None => println!("{} {}", "Protocol Fee:".bright_cyan(), "off".dimmed()),
    }
    println!("{} {}", "Clock Start:".bright_cyan(), start);

    store::save_pool(&session.state_path, &pool)?;
    println!("\n{}", "Pool created".bright_green());
    Ok(())
}

pub fn show_status(session: &Session, detailed: bool) -> Result<()> {
    let pool = store::load_pool(&session.state_path)?;

    println!("{}", "=== Pool Status ===".bright_green().bold());
    let (reserve0, reserve1, last) = pool.reserves();
    println!("{} {}", "Reserve0:".bright_cyan(), reserve0);
    println!("{} {}", "Reserve1:".bright_cyan(), reserve1);
    println!("{} {}", "Last Execution:".bright_cyan(), last);
    println!("{} {}", "Total Supply:".bright_cyan(), pool.total_supply());

    let (held0, held1) = pool.twamm_reserves();
    println!("{} {}", "Order Balance0:".bright_cyan(), held0);
    println!("{} {}", "Order Balance1:".bright_cyan(), held1);

    if session.now > last {
        match pool.reserves_after_virtual_orders(session.now) {
            Ok((projected0, projected1)) => {
                println!("\n{} {}", "Projected at".bright_cyan(), session.now);
                println!("{} {}", "  Reserve0:".bright_cyan(), projected0);
                println!("{} {}", "  Reserve1:".bright_cyan(), projected1);
            }
            Err(err) => println!("\n{} {}", "Projection failed:".yellow(), err),
        }
    }

    for token in [Token::Token0, Token::Token1] {
        let order_pool = pool.order_pool(token);
        println!("\n{}", format!("--- {} sellers ---", token).bright_yellow());
        println!("{} {}", "Sell Rate:".bright_cyan(), order_pool.current_sell_rate);
        println!("{} {}", "Reward Factor:".bright_cyan(), order_pool.reward_factor);
        println!("{} {}", "Pending Expiries:".bright_cyan(), order_pool.sell_rate_ending_at.len());
        if let Some((expiry, rate)) = order_pool.sell_rate_ending_at.iter().next() {
            println!("{} {} (rate {})", "Next Expiry:".bright_cyan(), expiry, rate);
        }
    }

    if detailed {
        println!("\n{}", "--- Orders ---".bright_yellow());
        let orders = &pool.state().orders;
        if orders.is_empty() {
            println!("{}", "No orders".dimmed());
        }
        for order in orders.values() {
            println!(
                "#{} {} sells {} until {} [{:?}]",
                order.id, order.owner, order.sell_token, order.expiration, order.status
            );
        }
    }

    Ok(())
}

/// Print what an operation emitted
pub fn print_events(events: &[PoolEvent]) {
    for event in events {
        match event {
            PoolEvent::VirtualOrdersExecuted { from, to, steps, token0_sold, token1_sold } => {
                println!(
                    "{} {} -> {} in {} steps (sold {} token0, {} token1)",
                    "Virtual orders:".dimmed(),
                    from,
                    to,
                    steps,
                    token0_sold,
                    token1_sold
                );
            }
            PoolEvent::ProtocolFeeMinted { fee_to, liquidity } => {
                println!("{} {} liquidity to {}", "Protocol fee:".dimmed(), liquidity, fee_to);
            }
            other => log::debug!("event: {:?}", other),
        }
    }
}
