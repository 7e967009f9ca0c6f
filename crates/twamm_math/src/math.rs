//! Constant product AMM math (x·y=k)

use crate::{fixed::mul_div, MathError, BPS_SCALE, U256};

/// Quote result for an exact-input swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapQuote {
    /// Amount of the output token paid to the trader
    pub amount_out: U256,

    /// New input-side reserve (the fee stays in the pool)
    pub new_reserve_in: U256,

    /// New output-side reserve
    pub new_reserve_out: U256,
}

/// Input amount that actually moves the curve: amount * (1 - fee), floored
pub fn amount_after_fee(amount: U256, fee_bps: u32) -> Result<U256, MathError> {
    if fee_bps > BPS_SCALE {
        return Err(MathError::InvalidAmount);
    }
    mul_div(amount, U256::from(BPS_SCALE - fee_bps), U256::from(BPS_SCALE))
}

/// Calculate quote for selling `amount_in` into the pool
///
/// With fee on input:
/// - Δin_net = Δin * (1 - fee)
/// - Δout = reserve_out * Δin_net / (reserve_in + Δin_net)
/// - new_in = reserve_in + Δin (full amount, fee accrues to the pool)
/// - new_out = reserve_out - Δout
///
/// Rounds the output down so the invariant never shrinks.
pub fn quote_out(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
    fee_bps: u32,
) -> Result<SwapQuote, MathError> {
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(MathError::InvalidReserves);
    }
    if amount_in.is_zero() {
        return Err(MathError::InvalidAmount);
    }

    let in_net = amount_after_fee(amount_in, fee_bps)?;
    let denominator = reserve_in.checked_add(in_net).ok_or(MathError::Overflow)?;
    let amount_out = mul_div(reserve_out, in_net, denominator)?;

    if amount_out >= reserve_out {
        return Err(MathError::InsufficientLiquidity);
    }

    let new_reserve_in = reserve_in.checked_add(amount_in).ok_or(MathError::Overflow)?;

    Ok(SwapQuote {
        amount_out,
        new_reserve_in,
        new_reserve_out: reserve_out - amount_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e18(n: u64) -> U256 {
        U256::from(n) * U256::exp10(18)
    }

    #[test]
    fn test_quote_out_small() {
        let x = e18(1_000);
        let y = e18(60_000_000);

        // Sell 1 unit of x at 30 bps
        let quote = quote_out(e18(1), x, y, 30).unwrap();

        // Slightly less than spot (60k) due to slippage + fee
        assert!(quote.amount_out < e18(60_000));
        assert!(quote.amount_out > e18(59_000));
        assert_eq!(quote.new_reserve_in, x + e18(1));
        assert_eq!(quote.new_reserve_out, y - quote.amount_out);
    }

    #[test]
    fn test_quote_matches_reference_formula() {
        let reserve_in = U256::from(1_000_000u64);
        let reserve_out = U256::from(2_000_000u64);
        let amount_in = U256::from(10_000u64);

        let quote = quote_out(amount_in, reserve_in, reserve_out, 30).unwrap();

        // 10_000 * 0.997 = 9_970; 2_000_000 * 9_970 / 1_009_970 = 19_743.16...
        assert_eq!(quote.amount_out, U256::from(19_743u64));
    }

    #[test]
    fn test_invariant_increases_with_fees() {
        let x0 = e18(1_000);
        let y0 = e18(60_000_000);
        let k = x0.full_mul(y0);

        let quote = quote_out(e18(50), x0, y0, 30).unwrap();
        let k1 = quote.new_reserve_in.full_mul(quote.new_reserve_out);

        assert!(k1 > k, "Invariant should increase due to fees");
    }

    #[test]
    fn test_zero_fee_keeps_invariant_within_rounding() {
        let x0 = U256::from(1_000_000u64);
        let y0 = U256::from(1_000_000u64);
        let quote = quote_out(U256::from(1_000u64), x0, y0, 0).unwrap();
        assert!(quote.new_reserve_in.full_mul(quote.new_reserve_out) >= x0.full_mul(y0));
    }

    #[test]
    fn test_fee_accounting() {
        let x = e18(1_000);
        let y = e18(60_000_000);

        let with_fee = quote_out(e18(10), x, y, 30).unwrap();
        let no_fee = quote_out(e18(10), x, y, 0).unwrap();

        assert!(with_fee.amount_out < no_fee.amount_out);
    }

    #[test]
    fn test_invalid_inputs() {
        let one = U256::one();
        assert_eq!(quote_out(one, U256::zero(), one, 30), Err(MathError::InvalidReserves));
        assert_eq!(quote_out(U256::zero(), one, one, 30), Err(MathError::InvalidAmount));
        assert_eq!(amount_after_fee(one, BPS_SCALE + 1), Err(MathError::InvalidAmount));
    }
}
