//! Liquidity provider operations

use anyhow::Result;
use colored::Colorize;

use twamm::{Address, U256};

use crate::{status, store, Session};

pub fn mint(session: &Session, amount0: U256, amount1: U256, to: Option<Address>) -> Result<()> {
    println!("{}", "=== Add Liquidity ===".bright_green().bold());
    let to = to.unwrap_or(session.caller);
    println!("{} {}", "Amount0:".bright_cyan(), amount0);
    println!("{} {}", "Amount1:".bright_cyan(), amount1);
    println!("{} {}", "Recipient:".bright_cyan(), to);

    let (liquidity, events) = store::update_pool(&session.state_path, |pool| {
        let liquidity = pool.mint(session.now, to, amount0, amount1)?;
        Ok((liquidity, pool.take_events()))
    })?;

    status::print_events(&events);
    println!("\n{} {}", "Liquidity Minted:".bright_green(), liquidity);
    Ok(())
}

pub fn burn(session: &Session, liquidity: U256, to: Option<Address>) -> Result<()> {
    println!("{}", "=== Remove Liquidity ===".bright_green().bold());
    let to = to.unwrap_or(session.caller);
    println!("{} {}", "Liquidity:".bright_cyan(), liquidity);
    println!("{} {}", "Recipient:".bright_cyan(), to);

    let ((amount0, amount1), events) = store::update_pool(&session.state_path, |pool| {
        let amounts = pool.burn(session.now, to, liquidity)?;
        Ok((amounts, pool.take_events()))
    })?;

    status::print_events(&events);
    println!("\n{} {}", "Token0 Out:".bright_green(), amount0);
    println!("{} {}", "Token1 Out:".bright_green(), amount1);
    Ok(())
}
