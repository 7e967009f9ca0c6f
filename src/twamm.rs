//! TWAMM pool engine
//!
//! A constant product two-asset pool extended with long-term orders. A
//! long-term order sells a fixed amount evenly over a chosen number of
//! intervals. Orders selling the same token are aggregated in an order pool,
//! and the two order pools trade against each other and the reserves as if
//! the sale were split into infinitely many infinitesimal swaps.
//!
//! Virtual orders are executed lazily: every mutating operation first catches
//! the pool up to its timestamp, one closed-form step per expiry boundary.
//! All state is plain data and every step is re-derivable from it.
//!
//! ```text
//! TwammPool ── transact ──► executor ──► twamm_math::compute_virtual_balances
//!     │                        │
//!     ├─ reserve_pool          └─ order_pool ×2 (reward factors)
//!     └─ orders (lifecycle)
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod order_pool;
pub mod orders;
pub mod pool;
pub mod reserve_pool;
pub mod types;

pub use config::{PoolConfig, ProtocolFee};
pub use error::{InvalidOrderReason, Result, TwammError};
pub use events::PoolEvent;
pub use executor::ExecutionReport;
pub use order_pool::OrderPool;
pub use orders::{CancelledOrder, Order, OrderStatus, SubmittedOrder};
pub use pool::{PoolState, TwammPool};
pub use reserve_pool::ReservePool;
pub use twamm_math::U256;
pub use types::{Address, OrderId, Token};

// ============================================================================
// Constants
// ============================================================================

/// Extra precision of sell rates: token units per second times 10^6
pub const SELL_RATE_PRECISION: U256 = U256([1_000_000, 0, 0, 0]);

/// Reward factors are Q112 fixed point (2^112)
pub const REWARD_FACTOR_SCALE: U256 = U256([0, 1 << 48, 0, 0]);

/// Liquidity locked by the first mint, so reserves never drain to zero
pub const MINIMUM_LIQUIDITY: U256 = U256([1_000, 0, 0, 0]);

/// Largest reserve the pool accepts (2^112 - 1)
pub const MAX_RESERVE: U256 = U256([u64::MAX, (1 << 48) - 1, 0, 0]);
