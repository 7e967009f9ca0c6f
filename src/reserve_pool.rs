//! Constant product reserves and LP supply
//!
//! Reserve operations act on the reserves as they stand. Catching up virtual
//! orders first is the caller's job.

use serde::{Deserialize, Serialize};
use twamm_math::{mul_div, quote_out, sqrt, U256, U512, BPS_SCALE};

use crate::config::ProtocolFee;
use crate::error::{Result, TwammError};
use crate::types::Token;
use crate::{MAX_RESERVE, MINIMUM_LIQUIDITY};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservePool {
    pub reserve0: U256,
    pub reserve1: U256,

    /// Outstanding liquidity, `MINIMUM_LIQUIDITY` locked units included
    pub total_supply: U256,

    /// reserve0 * reserve1 after the last mint or burn, zero while the
    /// protocol fee is off
    pub k_last: U256,

    /// Liquidity minted to the protocol fee recipient so far
    pub protocol_fee_liquidity: U256,
}

impl ReservePool {
    pub fn reserve(&self, token: Token) -> U256 {
        match token {
            Token::Token0 => self.reserve0,
            Token::Token1 => self.reserve1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.reserve0.is_zero() || self.reserve1.is_zero()
    }

    /// Constant product invariant, widened so it cannot overflow
    pub fn k(&self) -> U512 {
        self.reserve0.full_mul(self.reserve1)
    }

    /// Overwrite both reserves, e.g. with the result of a virtual step
    pub fn set_reserves(&mut self, reserve0: U256, reserve1: U256) -> Result<()> {
        if reserve0 > MAX_RESERVE || reserve1 > MAX_RESERVE {
            return Err(TwammError::ArithmeticOverflow);
        }
        self.reserve0 = reserve0;
        self.reserve1 = reserve1;
        Ok(())
    }

    /// Exact-input swap with the fee on input; returns the output amount
    pub fn swap(&mut self, token_in: Token, amount_in: U256, fee_bps: u32) -> Result<U256> {
        if amount_in.is_zero() {
            return Err(TwammError::ZeroAmount);
        }
        if self.is_empty() {
            return Err(TwammError::InsufficientLiquidity);
        }

        let reserve_in = self.reserve(token_in);
        let reserve_out = self.reserve(token_in.opposite());
        let quote = quote_out(amount_in, reserve_in, reserve_out, fee_bps)?;
        if quote.amount_out.is_zero() {
            return Err(TwammError::InsufficientLiquidity);
        }

        match token_in {
            Token::Token0 => self.set_reserves(quote.new_reserve_in, quote.new_reserve_out)?,
            Token::Token1 => self.set_reserves(quote.new_reserve_out, quote.new_reserve_in)?,
        }
        Ok(quote.amount_out)
    }

    /// Add liquidity; returns the amount minted to the depositor
    ///
    /// The first deposit locks `MINIMUM_LIQUIDITY` forever. Later deposits
    /// must match the reserve ratio within `tolerance_bps`; the excess of the
    /// larger side stays in the pool.
    pub fn mint(&mut self, amount0: U256, amount1: U256, tolerance_bps: u32) -> Result<U256> {
        let new_reserve0 = self.reserve0.checked_add(amount0).ok_or(TwammError::ArithmeticOverflow)?;
        let new_reserve1 = self.reserve1.checked_add(amount1).ok_or(TwammError::ArithmeticOverflow)?;
        if new_reserve0 > MAX_RESERVE || new_reserve1 > MAX_RESERVE {
            return Err(TwammError::ArithmeticOverflow);
        }

        let liquidity = if self.total_supply.is_zero() {
            // both amounts are below 2^112 so the product fits
            let root = sqrt(amount0 * amount1);
            if root <= MINIMUM_LIQUIDITY {
                return Err(TwammError::InsufficientLiquidity);
            }
            self.total_supply = MINIMUM_LIQUIDITY;
            root - MINIMUM_LIQUIDITY
        } else {
            if self.is_empty() {
                return Err(TwammError::InsufficientLiquidity);
            }
            let liquidity0 = mul_div(amount0, self.total_supply, self.reserve0)?;
            let liquidity1 = mul_div(amount1, self.total_supply, self.reserve1)?;
            let (smaller, larger) = if liquidity0 < liquidity1 {
                (liquidity0, liquidity1)
            } else {
                (liquidity1, liquidity0)
            };
            let gap = (larger - smaller).full_mul(U256::from(BPS_SCALE));
            if gap > larger.full_mul(U256::from(tolerance_bps)) {
                return Err(TwammError::UnbalancedDeposit {
                    liquidity0,
                    liquidity1,
                    tolerance_bps,
                });
            }
            smaller
        };

        if liquidity.is_zero() {
            return Err(TwammError::InsufficientLiquidity);
        }

        self.total_supply = self
            .total_supply
            .checked_add(liquidity)
            .ok_or(TwammError::ArithmeticOverflow)?;
        self.reserve0 = new_reserve0;
        self.reserve1 = new_reserve1;
        Ok(liquidity)
    }

    /// Remove liquidity pro rata; returns both withdrawn amounts
    pub fn burn(&mut self, liquidity: U256) -> Result<(U256, U256)> {
        if liquidity.is_zero() {
            return Err(TwammError::ZeroAmount);
        }
        let burnable = self.total_supply.saturating_sub(MINIMUM_LIQUIDITY);
        if liquidity > burnable {
            return Err(TwammError::InsufficientLiquidity);
        }

        let amount0 = mul_div(liquidity, self.reserve0, self.total_supply)?;
        let amount1 = mul_div(liquidity, self.reserve1, self.total_supply)?;
        if amount0.is_zero() || amount1.is_zero() {
            return Err(TwammError::InsufficientLiquidity);
        }

        self.total_supply -= liquidity;
        self.reserve0 -= amount0;
        self.reserve1 -= amount1;
        Ok((amount0, amount1))
    }

    /// Mint the protocol's share of fee growth since the last mint or burn
    ///
    /// Returns the liquidity minted to the fee recipient. With the fee off,
    /// any stale `k_last` is cleared.
    pub fn mint_protocol_fee(&mut self, protocol_fee: Option<&ProtocolFee>) -> Result<U256> {
        let fee = match protocol_fee {
            Some(fee) => fee,
            None => {
                self.k_last = U256::zero();
                return Ok(U256::zero());
            }
        };
        if self.k_last.is_zero() {
            return Ok(U256::zero());
        }

        let root_k = sqrt(self.reserve0 * self.reserve1);
        let root_k_last = sqrt(self.k_last);
        if root_k <= root_k_last {
            return Ok(U256::zero());
        }

        let numerator = self.total_supply.full_mul(root_k - root_k_last);
        let denominator = root_k
            .checked_mul(U256::from(fee.share_denominator - 1))
            .and_then(|scaled| scaled.checked_add(root_k_last))
            .ok_or(TwammError::ArithmeticOverflow)?;
        let liquidity = U256::try_from(numerator / U512::from(denominator))
            .map_err(|_| TwammError::ArithmeticOverflow)?;

        if !liquidity.is_zero() {
            self.total_supply = self
                .total_supply
                .checked_add(liquidity)
                .ok_or(TwammError::ArithmeticOverflow)?;
            self.protocol_fee_liquidity = self
                .protocol_fee_liquidity
                .checked_add(liquidity)
                .ok_or(TwammError::ArithmeticOverflow)?;
        }
        Ok(liquidity)
    }

    /// Remember k for the next protocol fee computation
    pub fn update_k_last(&mut self, protocol_fee: Option<&ProtocolFee>) {
        self.k_last = if protocol_fee.is_some() {
            self.reserve0 * self.reserve1
        } else {
            U256::zero()
        };
    }
}
