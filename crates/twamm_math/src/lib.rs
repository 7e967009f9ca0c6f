//! TWAMM Math - Pure fixed-point and constant product math (x·y=k)
//!
//! This crate contains the integer arithmetic behind the TWAMM pool:
//! full-precision `mul_div`, Babylonian square roots, a fixed-point `exp`,
//! the constant product quote and the closed-form two-sided virtual trade.
//!
//! Everything is deterministic and allocation free so the engine can
//! re-derive every step from persisted state alone.

#![no_std]
#![forbid(unsafe_code)]

pub mod fixed;
pub mod math;
pub mod twamm;

pub use fixed::{div_up, exp, mul_div, mul_div_up, sqrt, sqrt_up};
pub use math::{amount_after_fee, quote_out, SwapQuote};
pub use primitive_types::{U256, U512};
pub use twamm::{compute_virtual_balances, VirtualTrade};

/// Basis points scale (10,000 bps = 100%)
pub const BPS_SCALE: u32 = 10_000;

/// 1e18, the fixed-point unit used by `exp` and the TWAMM solver
pub const WAD: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

/// Error types for pool math
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    /// Invalid reserves (zero)
    InvalidReserves,
    /// Invalid amount (zero)
    InvalidAmount,
    /// Insufficient liquidity in pool
    InsufficientLiquidity,
    /// Result does not fit in 256 bits
    Overflow,
    /// Division by zero
    DivisionByZero,
}
