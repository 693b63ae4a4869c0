//! # Fixed-Point Exchange Rates
//!
//! Rates are stored as integers scaled by [`RATE_SCALE`] (10^18). A
//! conversion is `native * rate / RATE_SCALE`, rounded toward zero. Floor
//! rounding means conversion can never create value: the remainder stays
//! with the ledger.
//!
//! `native * rate` overflows `u128` quickly at 18 decimals, so the product
//! is computed in 256 bits and divided back down. The only failure is a
//! quotient that does not fit `u128`.
//!
//! Rate text goes through `rust_decimal`; only the scaled integer is stored.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{RATE_DECIMALS, RATE_SCALE};
use crate::types::Value;

/// Errors from fixed-point parsing and arithmetic.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MathError {
    /// The result does not fit in 128 bits.
    #[error("arithmetic overflow")]
    Overflow,

    /// The decimal string could not be parsed.
    #[error("invalid decimal '{input}': {reason}")]
    InvalidDecimal {
        /// The rejected input.
        input: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// Full 256-bit product of two `u128`s as `(high, low)`.
pub fn mul_wide(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = u64::MAX as u128;
    let (a1, a0) = (a >> 64, a & MASK);
    let (b1, b0) = (b >> 64, b & MASK);

    let lo_lo = a0 * b0;
    let hi_lo = a1 * b0;
    let lo_hi = a0 * b1;
    let hi_hi = a1 * b1;

    let (mid, mid_carry) = hi_lo.overflowing_add(lo_hi);
    let (lo, lo_carry) = lo_lo.overflowing_add(mid << 64);
    let hi = hi_hi + (mid >> 64) + ((mid_carry as u128) << 64) + lo_carry as u128;
    (hi, lo)
}

/// `floor(a * b / d)` without intermediate overflow.
///
/// Returns `None` if `d == 0` or the quotient exceeds `u128::MAX`.
pub fn mul_div_floor(a: u128, b: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    if let Some(product) = a.checked_mul(b) {
        return Some(product / d);
    }

    let (hi, lo) = mul_wide(a, b);
    if hi >= d {
        return None;
    }

    // Restoring binary long division of (hi:lo) by d. `rem < d` on entry.
    let mut rem = hi;
    let mut quotient: u128 = 0;
    for i in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> i) & 1);
        quotient <<= 1;
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quotient |= 1;
        }
    }
    Some(quotient)
}

// ---------------------------------------------------------------------------
// ExchangeRate
// ---------------------------------------------------------------------------

/// Currency units per native unit, scaled by 10^18.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExchangeRate(Value);

impl ExchangeRate {
    /// Wraps an already-scaled rate. Zero is representable; the exchange
    /// ledger rejects it when it is set.
    pub const fn from_scaled(raw: Value) -> Self {
        Self(raw)
    }

    /// A rate of `units` whole currency units per native unit.
    pub fn from_units(units: Value) -> Result<Self, MathError> {
        units
            .checked_mul(RATE_SCALE)
            .map(Self)
            .ok_or(MathError::Overflow)
    }

    /// The scaled integer.
    pub const fn scaled(&self) -> Value {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Converts a native amount, rounding toward zero.
    pub fn convert(&self, native: Value) -> Result<Value, MathError> {
        mul_div_floor(native, self.0, RATE_SCALE).ok_or(MathError::Overflow)
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let exact = i128::try_from(self.0)
            .ok()
            .and_then(|raw| Decimal::try_from_i128_with_scale(raw, RATE_DECIMALS).ok());
        if let Some(rate) = exact {
            return write!(f, "{}", rate.normalize());
        }

        // Beyond 96 bits of mantissa: print the whole part as an integer.
        let whole = self.0 / RATE_SCALE;
        let frac = self.0 % RATE_SCALE;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        // frac < 10^18, always within Decimal's mantissa.
        let frac = Decimal::from_i128_with_scale(frac as i128, RATE_DECIMALS).normalize();
        write!(f, "{}{}", whole, frac.to_string().trim_start_matches('0'))
    }
}

impl FromStr for ExchangeRate {
    type Err = MathError;

    /// Parses a plain decimal such as `"2"`, `"0.5"` or `"1.000000000000000001"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| MathError::InvalidDecimal {
            input: s.to_string(),
            reason,
        };

        let rate = Decimal::from_str_exact(s)
            .map_err(|err| invalid(err.to_string()))?
            .normalize();
        if rate.is_sign_negative() && !rate.is_zero() {
            return Err(invalid("rate must not be negative".into()));
        }
        if rate.scale() > RATE_DECIMALS {
            return Err(invalid(format!(
                "more than {RATE_DECIMALS} fractional digits"
            )));
        }

        let mantissa = rate.mantissa().unsigned_abs();
        10u128
            .checked_pow(RATE_DECIMALS - rate.scale())
            .and_then(|factor| mantissa.checked_mul(factor))
            .map(Self)
            .ok_or(MathError::Overflow)
    }
}
