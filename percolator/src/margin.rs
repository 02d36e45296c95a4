//! Margin engine (spec.md §4.6).

use crate::error::RiskError;
use crate::fixed::{mul_bps_ceil, I128};
use crate::slab::RiskParams;

/// Notional of a position at mark, `|p| * m / 1e6`, in collateral units.
pub fn notional(position_size: i128, mark_price_e6: u64) -> Result<u128, RiskError> {
    (position_size.unsigned_abs())
        .checked_mul(mark_price_e6 as u128)
        .ok_or(RiskError::ArithmeticOverflow)?
        .checked_div(crate::constants::E6)
        .ok_or(RiskError::DivisionByZero)
}

/// Unrealized PnL, `p * (m - entry) / 1e6`, signed.
pub fn unrealized_pnl(position_size: i128, mark_price_e6: u64, entry_price: u64) -> Result<i128, RiskError> {
    let delta = mark_price_e6 as i128 - entry_price as i128;
    let raw = position_size
        .checked_mul(delta)
        .ok_or(RiskError::ArithmeticOverflow)?;
    raw.checked_div(crate::constants::E6 as i128)
        .ok_or(RiskError::DivisionByZero)
}

/// Effective equity: `capital + pnl_reserved + unrealized_pnl + min(pnl_realized, 0)`.
/// Positive `pnl_realized` is deliberately excluded — it isn't spendable
/// until warmed into `pnl_reserved` (spec.md §4.6).
pub fn effective_equity(
    capital: u128,
    pnl_reserved: u128,
    unrealized: i128,
    pnl_realized: i128,
) -> Result<i128, RiskError> {
    let negative_realized = if pnl_realized.is_negative() {
        pnl_realized
    } else {
        0
    };
    let mut e: i128 = capital
        .try_into()
        .map_err(|_| RiskError::ArithmeticOverflow)?;
    e = e
        .checked_add(pnl_reserved.try_into().map_err(|_| RiskError::ArithmeticOverflow)?)
        .ok_or(RiskError::ArithmeticOverflow)?;
    e = e.checked_add(unrealized).ok_or(RiskError::ArithmeticOverflow)?;
    e = e
        .checked_add(negative_realized)
        .ok_or(RiskError::ArithmeticOverflow)?;
    Ok(e)
}

/// `ceil(notional * bps / 10000)` — used for both IM and MM (spec.md §4.6
/// margin math always rounds a *requirement* up).
pub fn margin_requirement(notional: u128, bps: u64) -> Result<u128, RiskError> {
    mul_bps_ceil(notional, bps, crate::constants::BPS_DENOM)
}

pub fn initial_margin(notional: u128, params: &RiskParams) -> Result<u128, RiskError> {
    margin_requirement(notional, params.initial_margin_bps)
}

pub fn maintenance_margin(notional: u128, params: &RiskParams) -> Result<u128, RiskError> {
    margin_requirement(notional, params.maintenance_margin_bps)
}

/// `true` iff `effective_equity >= requirement`.
pub fn meets_requirement(effective_equity: i128, requirement: u128) -> bool {
    let req: i128 = match requirement.try_into() {
        Ok(v) => v,
        Err(_) => return false,
    };
    effective_equity >= req
}

pub fn funding_delta(
    position_size: i128,
    global_index: I128,
    account_snapshot: I128,
) -> Result<i128, RiskError> {
    let diff = global_index
        .get()
        .checked_sub(account_snapshot.get())
        .ok_or(RiskError::ArithmeticOverflow)?;
    let raw = position_size
        .checked_mul(diff)
        .ok_or(RiskError::ArithmeticOverflow)?;
    raw.checked_div(crate::constants::E6 as i128)
        .ok_or(RiskError::DivisionByZero)
}
