//! Scaled-integer arithmetic with explicit rounding
//!
//! All helpers are total: overflow and division by zero surface as
//! `MathError` instead of wrapping or panicking.

use crate::{MathError, U256, U512, WAD};

/// e scaled by 1e18
const E_WAD: U256 = U256([2_718_281_828_459_045_235, 0, 0, 0]);

/// Largest whole exponent accepted by `exp` (e^130 still fits comfortably)
pub const MAX_EXP_WHOLE: u64 = 130;

/// Taylor terms for the fractional part of `exp`; the series for x < 1
/// reaches a zero term well before this.
const TAYLOR_TERMS: u64 = 32;

/// floor(a * b / denominator) with a 512-bit intermediate product
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let product = a.full_mul(b);
    let quotient = product / U512::from(denominator);
    U256::try_from(quotient).map_err(|_| MathError::Overflow)
}

/// ceil(a * b / denominator) with a 512-bit intermediate product
pub fn mul_div_up(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let product = a.full_mul(b);
    let denominator = U512::from(denominator);
    let mut quotient = product / denominator;
    if !(product % denominator).is_zero() {
        quotient += U512::one();
    }
    U256::try_from(quotient).map_err(|_| MathError::Overflow)
}

/// ceil(a / b)
pub fn div_up(a: U256, b: U256) -> Result<U256, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let quotient = a / b;
    if (a % b).is_zero() {
        Ok(quotient)
    } else {
        Ok(quotient + U256::one())
    }
}

/// floor(sqrt(x)) via the Babylonian method
///
/// Converges for every input: the iterate decreases monotonically until it
/// stops improving.
pub fn sqrt(x: U256) -> U256 {
    if x > U256::from(3u8) {
        let mut z = x;
        let mut y = x / 2 + 1;
        while y < z {
            z = y;
            y = (x / y + y) / 2;
        }
        z
    } else if !x.is_zero() {
        U256::one()
    } else {
        U256::zero()
    }
}

/// ceil(sqrt(x))
pub fn sqrt_up(x: U256) -> U256 {
    let root = sqrt(x);
    // root <= 2^128 - 1 so the square cannot overflow
    if root * root < x {
        root + U256::one()
    } else {
        root
    }
}

/// e^x for a 1e18-scaled `x`, result scaled by 1e18 and rounded down
///
/// The whole part is computed by repeated squaring of e, the fractional part
/// by its Taylor series.
pub fn exp(x: U256) -> Result<U256, MathError> {
    let whole = x / WAD;
    if whole > U256::from(MAX_EXP_WHOLE) {
        return Err(MathError::Overflow);
    }
    let fraction = x % WAD;

    let whole_part = pow_wad(E_WAD, whole.low_u64())?;
    let fraction_part = exp_fraction(fraction)?;
    mul_div(whole_part, fraction_part, WAD)
}

/// base^n for a 1e18-scaled base
fn pow_wad(base: U256, mut n: u64) -> Result<U256, MathError> {
    let mut result = WAD;
    let mut power = base;
    while n > 0 {
        if n & 1 == 1 {
            result = mul_div(result, power, WAD)?;
        }
        n >>= 1;
        if n > 0 {
            power = mul_div(power, power, WAD)?;
        }
    }
    Ok(result)
}

/// e^f for 0 <= f < 1 (scaled by 1e18)
fn exp_fraction(f: U256) -> Result<U256, MathError> {
    let mut sum = WAD;
    let mut term = WAD;
    for i in 1..=TAYLOR_TERMS {
        term = mul_div(term, f, WAD)? / U256::from(i);
        if term.is_zero() {
            break;
        }
        sum = sum.checked_add(term).ok_or(MathError::Overflow)?;
    }
    Ok(sum)
}
