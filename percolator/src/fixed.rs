//! 128-bit checked fixed-point arithmetic.
//!
//! `U128`/`I128` are thin newtypes over the primitive 128-bit integers.
//! Every arithmetic method is checked; callers convert a `None` into
//! `RiskError::ArithmeticOverflow` at the call site. Nothing here ever
//! wraps silently, and nothing here is a float.

use crate::error::RiskError;

/// Ceiling bps multiply: `(x * bps + denom - 1) / denom`, used wherever a
/// margin *requirement* is being computed (spec.md §4.1: margin math
/// rounds up, never down, so a requirement is never under-stated).
#[inline]
pub fn mul_bps_ceil(x: u128, bps: u64, denom: u128) -> Result<u128, RiskError> {
    let num = x
        .checked_mul(bps as u128)
        .ok_or(RiskError::ArithmeticOverflow)?;
    let num = num
        .checked_add(denom - 1)
        .ok_or(RiskError::ArithmeticOverflow)?;
    num.checked_div(denom).ok_or(RiskError::DivisionByZero)
}

/// Floor bps multiply: `(x * bps) / denom`, used everywhere else (fee
/// revenue splits, funding accrual, PnL conversion).
#[inline]
pub fn mul_bps_floor(x: u128, bps: u64, denom: u128) -> Result<u128, RiskError> {
    let num = x
        .checked_mul(bps as u128)
        .ok_or(RiskError::ArithmeticOverflow)?;
    num.checked_div(denom).ok_or(RiskError::DivisionByZero)
}

/// Signed floor-toward-zero bps multiply (funding deltas can be negative).
#[inline]
pub fn mul_bps_floor_i(x: i128, bps: i64, denom: i128) -> Result<i128, RiskError> {
    let num = x
        .checked_mul(bps as i128)
        .ok_or(RiskError::ArithmeticOverflow)?;
    num.checked_div(denom).ok_or(RiskError::DivisionByZero)
}

/// Checked unsigned 128-bit amount. `#[repr(transparent)]` so it has the
/// exact same layout as `u128` inside `#[repr(C)]` account/slab structs.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct U128(pub u128);

impl U128 {
    pub const ZERO: U128 = U128(0);
    pub const MAX: U128 = U128(u128::MAX);

    #[inline]
    pub const fn new(v: u128) -> Self {
        U128(v)
    }

    #[inline]
    pub const fn get(self) -> u128 {
        self.0
    }

    #[inline]
    pub fn checked_add(self, rhs: U128) -> Option<U128> {
        self.0.checked_add(rhs.0).map(U128)
    }

    #[inline]
    pub fn checked_sub(self, rhs: U128) -> Option<U128> {
        self.0.checked_sub(rhs.0).map(U128)
    }

    #[inline]
    pub fn checked_mul(self, rhs: U128) -> Option<U128> {
        self.0.checked_mul(rhs.0).map(U128)
    }

    #[inline]
    pub fn checked_div(self, rhs: U128) -> Option<U128> {
        self.0.checked_div(rhs.0).map(U128)
    }

    #[inline]
    pub fn saturating_sub(self, rhs: U128) -> U128 {
        U128(self.0.saturating_sub(rhs.0))
    }

    #[inline]
    pub fn saturating_add(self, rhs: U128) -> U128 {
        U128(self.0.saturating_add(rhs.0))
    }

    /// Add, converting overflow into `RiskError::ArithmeticOverflow`.
    #[inline]
    pub fn add_checked(self, rhs: u128) -> Result<U128, RiskError> {
        self.0
            .checked_add(rhs)
            .map(U128)
            .ok_or(RiskError::ArithmeticOverflow)
    }

    /// Subtract, converting underflow into `RiskError::ArithmeticOverflow`.
    #[inline]
    pub fn sub_checked(self, rhs: u128) -> Result<U128, RiskError> {
        self.0
            .checked_sub(rhs)
            .map(U128)
            .ok_or(RiskError::ArithmeticOverflow)
    }
}

impl From<u128> for U128 {
    fn from(v: u128) -> Self {
        U128(v)
    }
}

/// Checked signed 128-bit amount. Division is truncated toward zero, the
/// native `i128` behavior, matching spec.md §4.1.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct I128(pub i128);

impl I128 {
    pub const ZERO: I128 = I128(0);
    pub const MAX: I128 = I128(i128::MAX);
    pub const MIN: I128 = I128(i128::MIN);

    #[inline]
    pub const fn new(v: i128) -> Self {
        I128(v)
    }

    #[inline]
    pub const fn get(self) -> i128 {
        self.0
    }

    #[inline]
    pub fn checked_add(self, rhs: I128) -> Option<I128> {
        self.0.checked_add(rhs.0).map(I128)
    }

    #[inline]
    pub fn checked_sub(self, rhs: I128) -> Option<I128> {
        self.0.checked_sub(rhs.0).map(I128)
    }

    #[inline]
    pub fn checked_mul(self, rhs: I128) -> Option<I128> {
        self.0.checked_mul(rhs.0).map(I128)
    }

    #[inline]
    pub fn checked_neg(self) -> Option<I128> {
        self.0.checked_neg().map(I128)
    }

    #[inline]
    pub fn add_checked(self, rhs: i128) -> Result<I128, RiskError> {
        self.0
            .checked_add(rhs)
            .map(I128)
            .ok_or(RiskError::ArithmeticOverflow)
    }

    #[inline]
    pub fn sub_checked(self, rhs: i128) -> Result<I128, RiskError> {
        self.0
            .checked_sub(rhs)
            .map(I128)
            .ok_or(RiskError::ArithmeticOverflow)
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Positive component, i.e. `max(self, 0)`.
    #[inline]
    pub fn pos_part(self) -> u128 {
        if self.0 > 0 {
            self.0 as u128
        } else {
            0
        }
    }

    /// Negative component's magnitude, i.e. `max(-self, 0)`.
    #[inline]
    pub fn neg_part(self) -> u128 {
        if self.0 < 0 {
            (-self.0) as u128
        } else {
            0
        }
    }
}

impl From<i128> for I128 {
    fn from(v: i128) -> Self {
        I128(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bps_ceil_rounds_up() {
        // 100 * 1bps / 10000 = 0.01 -> ceil to 1
        assert_eq!(mul_bps_ceil(100, 1, BpsDenomForTest::D).unwrap(), 1);
    }

    struct BpsDenomForTest;
    impl BpsDenomForTest {
        const D: u128 = crate::constants::BPS_DENOM;
    }

    #[test]
    fn bps_floor_rounds_down() {
        assert_eq!(mul_bps_floor(100, 1, crate::constants::BPS_DENOM).unwrap(), 0);
    }

    #[test]
    fn pos_neg_parts() {
        assert_eq!(I128::new(5).pos_part(), 5);
        assert_eq!(I128::new(5).neg_part(), 0);
        assert_eq!(I128::new(-5).pos_part(), 0);
        assert_eq!(I128::new(-5).neg_part(), 5);
        assert_eq!(I128::ZERO.pos_part(), 0);
        assert_eq!(I128::ZERO.neg_part(), 0);
    }
}
