//! TWAMM CLI - operate a TWAMM pool persisted in a local state file
//!
//! Every command loads the pool, applies one operation at the given
//! timestamp (default: the wall clock) and writes the state back.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod config;
mod liquidity;
mod orders;
mod status;
mod store;
mod trading;

use twamm::{Address, OrderId, Token, U256};

#[derive(Parser)]
#[command(name = "twamm")]
#[command(about = "TWAMM pool CLI - liquidity, swaps and long-term orders", long_about = None)]
#[command(version)]
struct Cli {
    /// Pool state file
    #[arg(short, long, default_value = "~/.config/twamm/pool.json")]
    state: String,

    /// Operation timestamp in seconds (defaults to now)
    #[arg(long)]
    now: Option<u64>,

    /// Acting account, base58
    #[arg(short, long)]
    caller: Option<Address>,

    /// Verbose output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty pool
    Init {
        /// TOML file with pool parameters
        #[arg(long)]
        config: Option<PathBuf>,

        /// Virtual clock start (defaults to --now)
        #[arg(long)]
        start: Option<u64>,

        /// Replace an existing state file
        #[arg(long)]
        force: bool,
    },

    /// Show reserves, order pools and supply
    Status {
        /// Also list every order
        #[arg(short, long)]
        detailed: bool,
    },

    /// Add liquidity
    Mint {
        #[arg(value_parser = parse_amount)]
        amount0: U256,

        #[arg(value_parser = parse_amount)]
        amount1: U256,

        /// Recipient of the minted liquidity (defaults to the caller)
        #[arg(long)]
        to: Option<Address>,
    },

    /// Remove liquidity
    Burn {
        #[arg(value_parser = parse_amount)]
        liquidity: U256,

        #[arg(long)]
        to: Option<Address>,
    },

    /// Instant swap against the reserves
    Swap {
        /// Token sold: token0 or token1
        token_in: Token,

        #[arg(value_parser = parse_amount)]
        amount_in: U256,

        #[arg(long)]
        to: Option<Address>,
    },

    /// Long-term order operations
    Order {
        #[command(subcommand)]
        command: OrderCommands,
    },

    /// Execute pending virtual orders
    Execute {
        /// Target timestamp (defaults to --now)
        #[arg(long)]
        until: Option<u64>,

        /// Repeat until the target is reached
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
enum OrderCommands {
    /// Sell an amount evenly over a number of intervals
    Submit {
        /// Token sold: token0 or token1
        sell_token: Token,

        #[arg(value_parser = parse_amount)]
        amount: U256,

        /// Number of order intervals
        intervals: u64,
    },

    /// Cancel an active order and refund what is left
    Cancel {
        order_id: OrderId,
    },

    /// Withdraw proceeds so far
    Withdraw {
        order_id: OrderId,
    },

    /// Show one order
    Show {
        order_id: OrderId,
    },

    /// List orders of an owner (defaults to the caller)
    List {
        owner: Option<Address>,
    },
}

fn parse_amount(text: &str) -> std::result::Result<U256, String> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    U256::from_dec_str(&digits).map_err(|err| format!("invalid amount '{}': {:?}", text, err))
}

/// Resolved global options shared by every command
pub struct Session {
    pub state_path: PathBuf,
    pub now: u64,
    pub caller: Address,
}

impl Session {
    fn from_cli(cli: &Cli) -> Result<Self> {
        let state_path = PathBuf::from(shellexpand::tilde(&cli.state).into_owned());
        let now = match cli.now {
            Some(now) => now,
            None => u64::try_from(chrono::Utc::now().timestamp())?,
        };
        Ok(Self {
            state_path,
            now,
            caller: cli.caller.unwrap_or(Address::ZERO),
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let session = Session::from_cli(&cli)?;

    if cli.verbose > 0 {
        println!("{} {}", "State:".bright_cyan(), session.state_path.display());
        println!("{} {}", "Now:".bright_cyan(), session.now);
        println!("{} {}", "Caller:".bright_cyan(), session.caller);
    }

    match cli.command {
        Commands::Init { config, start, force } => {
            status::init_pool(&session, config, start, force)?;
        }
        Commands::Status { detailed } => {
            status::show_status(&session, detailed)?;
        }
        Commands::Mint { amount0, amount1, to } => {
            liquidity::mint(&session, amount0, amount1, to)?;
        }
        Commands::Burn { liquidity, to } => {
            liquidity::burn(&session, liquidity, to)?;
        }
        Commands::Swap { token_in, amount_in, to } => {
            trading::swap(&session, token_in, amount_in, to)?;
        }
        Commands::Execute { until, all } => {
            trading::execute(&session, until, all)?;
        }
        Commands::Order { command } => match command {
            OrderCommands::Submit { sell_token, amount, intervals } => {
                orders::submit(&session, sell_token, amount, intervals)?;
            }
            OrderCommands::Cancel { order_id } => {
                orders::cancel(&session, order_id)?;
            }
            OrderCommands::Withdraw { order_id } => {
                orders::withdraw(&session, order_id)?;
            }
            OrderCommands::Show { order_id } => {
                orders::show(&session, order_id)?;
            }
            OrderCommands::List { owner } => {
                orders::list(&session, owner)?;
            }
        },
    }

    Ok(())
}
