//! Closed-form virtual trade for two continuous sell streams
//!
//! Two order pools sell token0 and token1 into a constant product pool at
//! constant rates over one execution step. Arbitrage keeps the pool on the
//! curve x·y = k at every instant, which gives
//!
//! ```text
//! dx/dt = a0 - a1·x²/k
//! ```
//!
//! with a0, a1 the (fee-adjusted) amounts each side sells per step. The
//! solution over a whole step is
//!
//! ```text
//! x* = sqrt(k·a0/a1)
//! c  = (sqrt(x0·a1) - sqrt(y0·a0)) / (sqrt(x0·a1) + sqrt(y0·a0))
//! E  = exp(2·sqrt(a0·a1/k))
//! x1 = x*·(E + c)/(E - c),   y1 = k/x1
//! ```
//!
//! Every rounding step favours the pool: x1 and y1 round up and are clamped
//! so that x1·y1 >= k and neither side receives a negative amount.

use crate::{
    fixed::{div_up, exp, mul_div, mul_div_up, sqrt},
    math::{amount_after_fee, quote_out},
    MathError, U256, WAD,
};

/// Exponent above which e^a dominates c completely; the pool ends at the
/// equilibrium price x* within 1e-17. Must stay below `MAX_EXP_WHOLE`.
const SATURATION_EXPONENT: u64 = 40;

/// 1e36, so that sqrt(q · 1e36) is a 1e18-scaled square root
const WAD_SQUARED: U256 = U256([12_919_594_847_110_692_864, 54_210_108_624_275_221, 0, 0]);

/// Outcome of one virtual execution step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualTrade {
    /// token0 paid out to the token1 sellers
    pub token0_out: U256,

    /// token1 paid out to the token0 sellers
    pub token1_out: U256,

    /// reserve0 after the step, fees included
    pub reserve0: U256,

    /// reserve1 after the step, fees included
    pub reserve1: U256,
}

impl VirtualTrade {
    fn unchanged(reserve0: U256, reserve1: U256) -> Self {
        Self {
            token0_out: U256::zero(),
            token1_out: U256::zero(),
            reserve0,
            reserve1,
        }
    }
}

/// Compute the reserves and payouts after both pools sell `sell0` / `sell1`
/// continuously against `reserve0` / `reserve1`.
///
/// `fee_bps` is charged on both sell amounts; the fee stays in the reserves.
/// One-sided flow reduces to the ordinary constant product swap.
pub fn compute_virtual_balances(
    reserve0: U256,
    reserve1: U256,
    sell0: U256,
    sell1: U256,
    fee_bps: u32,
) -> Result<VirtualTrade, MathError> {
    if sell0.is_zero() && sell1.is_zero() {
        return Ok(VirtualTrade::unchanged(reserve0, reserve1));
    }
    if reserve0.is_zero() || reserve1.is_zero() {
        return Err(MathError::InvalidReserves);
    }

    if sell1.is_zero() {
        let quote = quote_out(sell0, reserve0, reserve1, fee_bps)?;
        return Ok(VirtualTrade {
            token0_out: U256::zero(),
            token1_out: quote.amount_out,
            reserve0: quote.new_reserve_in,
            reserve1: quote.new_reserve_out,
        });
    }
    if sell0.is_zero() {
        let quote = quote_out(sell1, reserve1, reserve0, fee_bps)?;
        return Ok(VirtualTrade {
            token0_out: quote.amount_out,
            token1_out: U256::zero(),
            reserve0: quote.new_reserve_out,
            reserve1: quote.new_reserve_in,
        });
    }

    let in0 = amount_after_fee(sell0, fee_bps)?;
    let in1 = amount_after_fee(sell1, fee_bps)?;
    if in0.is_zero() || in1.is_zero() {
        // Dust on one side: nothing meaningful to solve, trade it one-sided
        return compute_virtual_balances(
            reserve0,
            reserve1,
            if in0.is_zero() { U256::zero() } else { sell0 },
            if in1.is_zero() { U256::zero() } else { sell1 },
            fee_bps,
        )
        .and_then(|trade| {
            // the dust side is absorbed by the pool
            let absorbed0 = if in0.is_zero() { sell0 } else { U256::zero() };
            let absorbed1 = if in1.is_zero() { sell1 } else { U256::zero() };
            Ok(VirtualTrade {
                reserve0: trade.reserve0.checked_add(absorbed0).ok_or(MathError::Overflow)?,
                reserve1: trade.reserve1.checked_add(absorbed1).ok_or(MathError::Overflow)?,
                ..trade
            })
        });
    }

    let (end0, end1) = two_sided_end_reserves(reserve0, reserve1, in0, in1)?;

    let available0 = reserve0.checked_add(in0).ok_or(MathError::Overflow)?;
    let available1 = reserve1.checked_add(in1).ok_or(MathError::Overflow)?;

    Ok(VirtualTrade {
        token0_out: available0 - end0,
        token1_out: available1 - end1,
        reserve0: end0.checked_add(sell0 - in0).ok_or(MathError::Overflow)?,
        reserve1: end1.checked_add(sell1 - in1).ok_or(MathError::Overflow)?,
    })
}

/// Curve position after both fee-adjusted inflows, clamped so that
/// `end0 <= r0 + in0`, `end1 <= r1 + in1` and `end0 * end1 >= r0 * r1`.
fn two_sided_end_reserves(
    r0: U256,
    r1: U256,
    in0: U256,
    in1: U256,
) -> Result<(U256, U256), MathError> {
    let k = r0.checked_mul(r1).ok_or(MathError::Overflow)?;

    let root_a = sqrt(r0.checked_mul(in1).ok_or(MathError::Overflow)?);
    let root_b = sqrt(r1.checked_mul(in0).ok_or(MathError::Overflow)?);
    let equilibrium0 = sqrt(mul_div(k, in0, in1)?);

    let mut end0 = match exponent(in0, in1, k)? {
        None => equilibrium0,
        Some(a) => {
            let e = exp(a)?;
            // |c| < 1 and e >= 1 so the denominator stays positive
            let sum = root_a.checked_add(root_b).ok_or(MathError::Overflow)?;
            let (c, pool_rich_in_token0) = if root_a >= root_b {
                (mul_div(root_a - root_b, WAD, sum)?, true)
            } else {
                (mul_div(root_b - root_a, WAD, sum)?, false)
            };
            let (numerator, denominator) = if pool_rich_in_token0 {
                (e + c, e - c)
            } else {
                (e - c, e + c)
            };
            mul_div_up(equilibrium0, numerator, denominator)?
        }
    };

    let available0 = r0.checked_add(in0).ok_or(MathError::Overflow)?;
    let available1 = r1.checked_add(in1).ok_or(MathError::Overflow)?;

    end0 = end0.clamp(U256::one(), available0);
    let mut end1 = div_up(k, end0)?;
    if end1 > available1 {
        end1 = available1;
        end0 = div_up(k, end1)?;
    }

    Ok((end0, end1))
}

/// 2·sqrt(in0·in1/k) scaled by 1e18, or `None` once it saturates
fn exponent(in0: U256, in1: U256, k: U256) -> Result<Option<U256>, MathError> {
    let flow = in0.checked_mul(in1).ok_or(MathError::Overflow)?;
    let ratio = match mul_div(flow, WAD_SQUARED, k) {
        Ok(ratio) => ratio,
        Err(MathError::Overflow) => return Ok(None),
        Err(err) => return Err(err),
    };
    let a = sqrt(ratio) * 2;
    if a >= U256::from(SATURATION_EXPONENT) * WAD {
        return Ok(None);
    }
    Ok(Some(a))
}
