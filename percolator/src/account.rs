//! Per-account fixed-stride record (spec.md §3 "Account record").

use crate::fixed::{I128, U128};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AccountKind {
    User = 0,
    Lp = 1,
}

impl AccountKind {
    #[inline]
    pub const fn is_lp(self) -> bool {
        matches!(self, AccountKind::Lp)
    }
}

/// One account's slab-resident state. `#[repr(C)]`, fixed stride, no
/// padding assumptions beyond what the explicit layout below guarantees —
/// `percolator-prog` is the only crate that actually needs the byte
/// layout to be stable across versions; this crate just keeps the field
/// order append-only.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct Account {
    pub account_id: u64,
    pub kind: AccountKind,
    _pad0: [u8; 7],
    pub owner: [u8; 32],

    pub capital: U128,
    /// Negative: a real loss charged against capital at settlement.
    /// Positive: realized profit awaiting warmup conversion.
    pub pnl_realized: I128,
    /// Portion of positive `pnl_realized` that has warmed up and is
    /// convertible to capital (subject to the haircut, spec.md §4.8).
    pub pnl_reserved: U128,

    pub warmup_started_at_slot: u64,
    pub warmup_slope_per_step: U128,

    pub position_size: I128,
    pub entry_price: u64,

    /// Global funding index snapshot at this account's last settlement.
    pub funding_index_snapshot: I128,

    /// Maintenance-fee bookkeeping; can go negative (fee debt), forgiven
    /// at `close_account`. A positive balance is a pre-funded fee
    /// "coupon" (SPEC_FULL.md §C.2) spent before capital is touched.
    pub fee_credits: I128,

    pub matcher_program: [u8; 32],
    pub matcher_context: [u8; 32],
}

impl Default for Account {
    fn default() -> Self {
        Account {
            account_id: 0,
            kind: AccountKind::User,
            _pad0: [0; 7],
            owner: [0; 32],
            capital: U128::ZERO,
            pnl_realized: I128::ZERO,
            pnl_reserved: U128::ZERO,
            warmup_started_at_slot: 0,
            warmup_slope_per_step: U128::ZERO,
            position_size: I128::ZERO,
            entry_price: 0,
            funding_index_snapshot: I128::ZERO,
            fee_credits: I128::ZERO,
            matcher_program: [0; 32],
            matcher_context: [0; 32],
        }
    }
}

impl Account {
    /// True for a zeroed record sitting in a free bitmap slot.
    #[inline]
    pub fn is_zeroed(&self) -> bool {
        self.account_id == 0 && self.owner == [0u8; 32] && self.capital == U128::ZERO
    }

    /// A record is "dust" once it carries no economic state worth the
    /// slot. LP accounts are exempt (SPEC_FULL.md §C.1): they are the
    /// default counterparty and are routinely flat-and-empty between
    /// trades without being abandoned.
    #[inline]
    pub fn is_dust(&self) -> bool {
        !self.kind.is_lp()
            && self.capital == U128::ZERO
            && self.pnl_realized == I128::ZERO
            && self.pnl_reserved == U128::ZERO
            && self.position_size == I128::ZERO
    }

    /// Notional-weighted average entry price update for a same-sign
    /// size increase, per spec.md §4.5. Returns the new entry price.
    pub fn weighted_entry_price(
        old_size: i128,
        old_entry: u64,
        fill_size: i128,
        fill_price: u64,
    ) -> Result<u64, crate::error::RiskError> {
        use crate::error::RiskError;
        let old_notional = (old_size.unsigned_abs() as u128)
            .checked_mul(old_entry as u128)
            .ok_or(RiskError::ArithmeticOverflow)?;
        let fill_notional = (fill_size.unsigned_abs() as u128)
            .checked_mul(fill_price as u128)
            .ok_or(RiskError::ArithmeticOverflow)?;
        let total_notional = old_notional
            .checked_add(fill_notional)
            .ok_or(RiskError::ArithmeticOverflow)?;
        let total_size = (old_size.unsigned_abs() as u128)
            .checked_add(fill_size.unsigned_abs() as u128)
            .ok_or(RiskError::ArithmeticOverflow)?;
        if total_size == 0 {
            return Ok(0);
        }
        let avg = total_notional / total_size;
        Ok(avg as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dust_excludes_lp() {
        let mut a = Account::default();
        a.kind = AccountKind::Lp;
        assert!(!a.is_dust());
        a.kind = AccountKind::User;
        assert!(a.is_dust());
    }

    #[test]
    fn weighted_entry_price_averages() {
        // old: 10 units @ 100, fill: 10 units @ 200 -> avg 150
        let p = Account::weighted_entry_price(10, 100, 10, 200).unwrap();
        assert_eq!(p, 150);
    }
}
