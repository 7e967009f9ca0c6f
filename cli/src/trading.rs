//! Instant swaps and virtual order execution

use anyhow::Result;
use colored::Colorize;

use twamm::{Address, Token, U256};

use crate::{status, store, Session};

pub fn swap(session: &Session, token_in: Token, amount_in: U256, to: Option<Address>) -> Result<()> {
    println!("{}", "=== Swap ===".bright_green().bold());
    let to = to.unwrap_or(session.caller);
    println!("{} {} {}", "Selling:".bright_cyan(), amount_in, token_in);
    println!("{} {}", "Recipient:".bright_cyan(), to);

    let (amount_out, events) = store::update_pool(&session.state_path, |pool| {
        let amount_out = pool.swap(session.now, token_in, amount_in, to)?;
        Ok((amount_out, pool.take_events()))
    })?;

    status::print_events(&events);
    println!("\n{} {} {}", "Received:".bright_green(), amount_out, token_in.opposite());
    Ok(())
}

pub fn execute(session: &Session, until: Option<u64>, all: bool) -> Result<()> {
    println!("{}", "=== Execute Virtual Orders ===".bright_green().bold());
    let target = until.unwrap_or(session.now);
    println!("{} {}", "Target:".bright_cyan(), target);

    let reports = store::update_pool(&session.state_path, |pool| {
        let mut reports = Vec::new();
        loop {
            let report = pool.execute_virtual_orders(target)?;
            let done = report.complete || !all;
            reports.push(report);
            if done {
                break;
            }
        }
        Ok(reports)
    })?;

    for report in &reports {
        println!(
            "{} -> {}: {} steps, sold {} token0 / {} token1, bought {} token0 / {} token1",
            report.from,
            report.reached,
            report.steps,
            report.token0_sold,
            report.token1_sold,
            report.token0_bought,
            report.token1_bought
        );
    }

    match reports.last() {
        Some(report) if report.complete => println!("\n{}", "Caught up".bright_green()),
        Some(report) => println!(
            "\n{} reached {}, run again (or pass --all) to continue",
            "Step cap hit:".yellow(),
            report.reached
        ),
        None => {}
    }
    Ok(())
}
