//! Pool errors
//!
//! Every failing operation leaves the pool exactly as it was before the call,
//! the virtual order catch-up included.

use thiserror::Error;
use twamm_math::{MathError, U256};

/// Result type for pool operations
pub type Result<T> = core::result::Result<T, TwammError>;

/// Why a long-term order operation was rejected
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidOrderReason {
    /// No order with this id exists
    UnknownOrder,
    /// Caller is not the order owner
    NotOwner,
    /// Order was already cancelled
    AlreadyCancelled,
    /// Order proceeds were already withdrawn in full
    AlreadyWithdrawn,
    /// Order has expired and can only be withdrawn
    Expired,
    /// Requested more intervals than the pool allows
    TooManyIntervals,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TwammError {
    /// Swap, burn or order would need more than the reserves hold
    #[error("insufficient liquidity")]
    InsufficientLiquidity,

    /// Deposit ratio differs from the reserve ratio by more than the tolerance
    #[error("unbalanced deposit: liquidity quotes {liquidity0} and {liquidity1} differ by more than {tolerance_bps} bps")]
    UnbalancedDeposit {
        liquidity0: U256,
        liquidity1: U256,
        tolerance_bps: u32,
    },

    /// Intermediate or stored value does not fit
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    #[error("invalid order: {0:?}")]
    InvalidOrder(InvalidOrderReason),

    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("number of intervals must be non-zero")]
    ZeroIntervals,

    /// Catching up to `target` needs more steps than one call may run
    #[error("virtual orders executed up to {reached}, {target} needs more steps; execute virtual orders first")]
    VirtualOrderBacklog { reached: u64, target: u64 },

    /// Operation timestamp is behind the last virtual order execution
    #[error("timestamp {now} is before last virtual order execution at {last}")]
    StaleTimestamp { now: u64, last: u64 },

    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

impl From<MathError> for TwammError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::InsufficientLiquidity | MathError::InvalidReserves => {
                TwammError::InsufficientLiquidity
            }
            MathError::InvalidAmount => TwammError::ZeroAmount,
            MathError::Overflow | MathError::DivisionByZero => TwammError::ArithmeticOverflow,
        }
    }
}

impl From<InvalidOrderReason> for TwammError {
    fn from(reason: InvalidOrderReason) -> Self {
        TwammError::InvalidOrder(reason)
    }
}
