//! Funding engine (spec.md §4.7).

use crate::error::RiskError;
use crate::fixed::I128;
use crate::slab::{FundingConfig, RiskEngine};

fn clamp_i128(v: i128, lo: i128, hi: i128) -> i128 {
    if v < lo {
        lo
    } else if v > hi {
        hi
    } else {
        v
    }
}

/// `clamp(k_bps * lp_net_notional / scale_notional, -max_premium_bps, +max_premium_bps)`.
pub fn premium_bps(cfg: &FundingConfig, lp_net_notional: i128) -> Result<i64, RiskError> {
    if cfg.scale_notional == 0 {
        return Err(RiskError::DivisionByZero);
    }
    let raw = lp_net_notional
        .checked_mul(cfg.k_bps as i128)
        .ok_or(RiskError::ArithmeticOverflow)?;
    let scaled = raw
        .checked_div(cfg.scale_notional as i128)
        .ok_or(RiskError::DivisionByZero)?;
    let clamped = clamp_i128(scaled, -(cfg.max_premium_bps as i128), cfg.max_premium_bps as i128);
    Ok(clamped as i64)
}

/// Per-slot rate expressed as a Q6 increment to `funding_index`: the
/// premium spread evenly over `horizon_slots`, converted from bps to Q6
/// (`* E6 / BPS_DENOM`), then clamped to `max_bps_per_slot` (itself
/// converted to the same Q6 scale).
pub fn rate_per_slot_e6(cfg: &FundingConfig, premium_bps: i64) -> Result<i128, RiskError> {
    if cfg.horizon_slots == 0 {
        return Err(RiskError::DivisionByZero);
    }
    let e6 = crate::constants::E6 as i128;
    let denom = crate::constants::BPS_DENOM as i128;

    let per_slot_bps_e6 = (premium_bps as i128)
        .checked_mul(e6)
        .ok_or(RiskError::ArithmeticOverflow)?
        .checked_div(denom)
        .ok_or(RiskError::DivisionByZero)?
        .checked_div(cfg.horizon_slots as i128)
        .ok_or(RiskError::DivisionByZero)?;

    let cap_e6 = (cfg.max_bps_per_slot as i128)
        .checked_mul(e6)
        .ok_or(RiskError::ArithmeticOverflow)?
        .checked_div(denom)
        .ok_or(RiskError::DivisionByZero)?;

    Ok(clamp_i128(per_slot_bps_e6, -cap_e6, cap_e6))
}

impl RiskEngine {
    /// Advance the funding index one crank step (spec.md §4.7).
    /// `lp_net_notional` is the signed net LP inventory notional driving
    /// the premium; the caller derives it from `totals` before calling.
    pub fn step_funding(&mut self, now_slot: u64, lp_net_notional: i128) -> Result<(), RiskError> {
        let delta_slots = now_slot.saturating_sub(self.last_funding_slot);
        if delta_slots == 0 {
            self.last_funding_slot = now_slot;
            return Ok(());
        }
        let cfg = &self.risk_params.funding;
        let prem = premium_bps(cfg, lp_net_notional)?;
        let rate = rate_per_slot_e6(cfg, prem)?;
        let contribution = rate
            .checked_mul(delta_slots as i128)
            .ok_or(RiskError::ArithmeticOverflow)?;
        self.funding_index_qpb_e6 = self
            .funding_index_qpb_e6
            .checked_add(I128::new(contribution))
            .ok_or(RiskError::ArithmeticOverflow)?;
        self.last_funding_slot = now_slot;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> FundingConfig {
        FundingConfig {
            horizon_slots: 100,
            k_bps: 10,
            scale_notional: 1_000_000,
            max_premium_bps: 50,
            max_bps_per_slot: 5,
        }
    }

    #[test]
    fn premium_clamps() {
        // huge imbalance should clamp to max_premium_bps
        let p = premium_bps(&cfg(), 1_000_000_000).unwrap();
        assert_eq!(p, 50);
        let p_neg = premium_bps(&cfg(), -1_000_000_000).unwrap();
        assert_eq!(p_neg, -50);
    }

    #[test]
    fn premium_zero_when_balanced() {
        assert_eq!(premium_bps(&cfg(), 0).unwrap(), 0);
    }
}
