//! Warmup & two-pass haircut settlement (spec.md §4.8) — the protocol's
//! load-bearing algorithm.
//!
//! `residual = vault - Σcapital - insurance.balance` is the collateral
//! available to back conversion of positive PnL into capital. The
//! haircut is `min(residual, pnl_pos_tot) / pnl_pos_tot`, clamped into
//! `[0, 1]`. Every multi-party event settles in two passes so that
//! losers have already paid before the haircut for winners is computed
//! — the fix for the stale-haircut bug the spec calls out.

use crate::error::RiskError;
use crate::fixed::{I128, U128};
use crate::slab::RiskEngine;

/// `haircut ∈ [0,1]`, represented as a ratio `(numerator, denominator)`
/// to avoid losing precision before it's applied to a specific amount.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Haircut {
    pub numerator: u128,
    pub denominator: u128,
}

impl Haircut {
    pub const FULL: Haircut = Haircut {
        numerator: 1,
        denominator: 1,
    };

    #[inline]
    pub fn apply_floor(self, amount: u128) -> Result<u128, RiskError> {
        if self.denominator == 0 {
            return Ok(0);
        }
        amount
            .checked_mul(self.numerator)
            .ok_or(RiskError::ArithmeticOverflow)?
            .checked_div(self.denominator)
            .ok_or(RiskError::DivisionByZero)
    }
}

impl RiskEngine {
    /// `vault - Σcapital - insurance.balance`. `Σcapital` isn't tracked
    /// as a running total (only `totals.*` PnL/OI aggregates are, per
    /// spec.md §3) so conservation-adjacent call sites that need it pass
    /// it in, already summed over the accounts touched this op plus the
    /// slab-wide `sum_capital` the caller maintains; the crank passes
    /// the full sweep sum.
    pub fn residual(&self, sum_capital: u128) -> i128 {
        let vault = self.vault.get() as i128;
        let cap = sum_capital as i128;
        let ins = self.insurance_fund.balance.get() as i128;
        vault - cap - ins
    }

    /// `haircut = min(residual, pnl_pos_tot) / pnl_pos_tot`, `1` when
    /// `pnl_pos_tot == 0` (nothing to haircut, spec.md P8).
    pub fn current_haircut(&self, sum_capital: u128) -> Haircut {
        let pnl_pos_tot = self.totals.pnl_pos_tot.get();
        if pnl_pos_tot == 0 {
            return Haircut::FULL;
        }
        let residual = self.residual(sum_capital).max(0) as u128;
        let capped = residual.min(pnl_pos_tot);
        Haircut {
            numerator: capped,
            denominator: pnl_pos_tot,
        }
    }

    /// Pass A: charge every negative component (negative `pnl_realized`,
    /// already-applied funding/fee debits folded into `pnl_realized` by
    /// the caller before this runs) against `capital`. Uncovered
    /// negatives are booked to `loss_accum` and drawn from the
    /// insurance fund, then socialize into `pnl_pos_tot` shrinkage.
    pub fn settle_losses(&mut self, idx: usize) -> Result<(), RiskError> {
        let acc = &mut self.accounts[idx];
        let loss = acc.pnl_realized.neg_part();
        if loss == 0 {
            return Ok(());
        }
        let covered = loss.min(acc.capital.get());
        acc.capital = acc.capital.sub_checked(covered)?;
        let uncovered = loss - covered;
        acc.pnl_realized = acc
            .pnl_realized
            .checked_add(I128::new(loss as i128))
            .ok_or(RiskError::ArithmeticOverflow)?; // zero out the charged loss
        if uncovered > 0 {
            let from_insurance = uncovered.min(self.insurance_fund.balance.get());
            self.insurance_fund.balance = self.insurance_fund.balance.sub_checked(from_insurance)?;
            let still_uncovered = uncovered - from_insurance;
            if still_uncovered > 0 {
                self.loss_accum = self.loss_accum.add_checked(still_uncovered)?;
                self.totals.pnl_pos_tot = self.totals.pnl_pos_tot.saturating_sub(U128::new(still_uncovered));
            }
        }
        Ok(())
    }

    /// Advance warmup (move `pnl_realized` positive balance into
    /// `pnl_reserved` at `warmup_slope_per_step` per slot) and then
    /// convert warmed `pnl_reserved` into `capital` through the
    /// currently-prevailing haircut. Called as Pass B, after every
    /// touched account has run `settle_losses` and `sum_capital`/
    /// `totals` reflect the post-loss state.
    pub fn settle_profits(
        &mut self,
        idx: usize,
        now_slot: u64,
        sum_capital: u128,
    ) -> Result<(), RiskError> {
        if self.warmup_paused {
            return Ok(());
        }
        let haircut = self.current_haircut(sum_capital);
        let acc = &mut self.accounts[idx];

        let elapsed = now_slot.saturating_sub(acc.warmup_started_at_slot);
        let warmable = acc.pnl_realized.pos_part();
        if warmable > 0 {
            let moved = elapsed
                .checked_mul(acc.warmup_slope_per_step.get() as u64)
                .map(|v| v as u128)
                .unwrap_or(u128::MAX)
                .min(warmable);
            if moved > 0 {
                acc.pnl_realized = acc
                    .pnl_realized
                    .checked_sub(I128::new(moved as i128))
                    .ok_or(RiskError::ArithmeticOverflow)?;
                acc.pnl_reserved = acc.pnl_reserved.add_checked(moved)?;
                acc.warmup_started_at_slot = now_slot;
            }
        }

        let reserved = acc.pnl_reserved.get();
        if reserved > 0 {
            let convertible = haircut.apply_floor(reserved)?;
            if convertible > 0 {
                acc.capital = acc.capital.add_checked(convertible)?;
                acc.pnl_reserved = acc.pnl_reserved.sub_checked(convertible)?;
                self.totals.pnl_pos_tot = self
                    .totals
                    .pnl_pos_tot
                    .saturating_sub(U128::new(convertible));
                if haircut.numerator < haircut.denominator {
                    // dust below haircut is socialized away, not owed to anyone
                    let destroyed = reserved - convertible;
                    acc.pnl_reserved = acc.pnl_reserved.sub_checked(destroyed.min(acc.pnl_reserved.get()))?;
                }
            }
        }
        Ok(())
    }

    /// Recomputes `pnl_pos_tot`/`pnl_neg_tot` from a full account scan.
    /// The incremental adjustments made by `settle_losses`/
    /// `settle_profits` are corrective, not authoritative — calling this
    /// before every haircut keeps the two aggregates from drifting off
    /// the per-account ledger, at the cost of an O(n) scan per
    /// settlement (the same order the crank already pays per slot).
    pub fn refresh_pnl_totals(&mut self) {
        let mut pos: u128 = 0;
        let mut neg: u128 = 0;
        for idx in 0..crate::constants::MAX_ACCOUNTS {
            if !self.is_used(idx) {
                continue;
            }
            let acc = &self.accounts[idx];
            pos = pos
                .saturating_add(acc.pnl_realized.pos_part())
                .saturating_add(acc.pnl_reserved.get());
            neg = neg.saturating_add(acc.pnl_realized.neg_part());
        }
        self.totals.pnl_pos_tot = U128::new(pos);
        self.totals.pnl_neg_tot = U128::new(neg);
    }

    /// Two-pass settlement over a small fixed set of touched accounts
    /// (spec.md §4.8): all losses first, then recompute residual, then
    /// all profits. `sum_capital` must be the slab-wide sum of
    /// `capital` *before* this call (the caller tracks it incrementally;
    /// see `RiskEngine::sum_all_capital` used by the crank's full sweep).
    pub fn two_pass_settle(
        &mut self,
        idxs: &[usize],
        now_slot: u64,
        mut sum_capital: u128,
    ) -> Result<(), RiskError> {
        for &idx in idxs {
            let before = self.accounts[idx].capital.get();
            self.settle_losses(idx)?;
            let after = self.accounts[idx].capital.get();
            sum_capital = sum_capital.saturating_sub(before).saturating_add(after);
        }
        self.refresh_pnl_totals();
        for &idx in idxs {
            let before = self.accounts[idx].capital.get();
            self.settle_profits(idx, now_slot, sum_capital)?;
            let after = self.accounts[idx].capital.get();
            sum_capital = sum_capital.saturating_sub(before).saturating_add(after);
        }
        Ok(())
    }

    /// Sum `capital` over every used slot — O(n), used only by the
    /// crank's full sweep and tests; the hot trading path threads
    /// `sum_capital` incrementally instead of recomputing it.
    pub fn sum_all_capital(&self) -> u128 {
        let mut total = 0u128;
        for i in 0..crate::constants::MAX_ACCOUNTS {
            if self.is_used(i) {
                total = total.saturating_add(self.accounts[i].capital.get());
            }
        }
        total
    }

    /// Conservation check (spec.md §8 P1): every account's total claim
    /// on the pool — capital, reserved and realized PnL, plus unrealized
    /// PnL at `mark_price_e6` — must never exceed what the vault and
    /// insurance fund actually hold, net of already-recognized losses.
    /// Returns `false` (rather than propagating) on any overflow while
    /// computing a claim, since an unrepresentable claim can never be
    /// "covered" either.
    pub fn check_conservation(&self, mark_price_e6: u64) -> bool {
        let mut total_claims: i128 = 0;
        for idx in 0..crate::constants::MAX_ACCOUNTS {
            if !self.is_used(idx) {
                continue;
            }
            let acc = &self.accounts[idx];
            let unrealized = match crate::margin::unrealized_pnl(
                acc.position_size.get(),
                mark_price_e6,
                acc.entry_price,
            ) {
                Ok(v) => v,
                Err(_) => return false,
            };
            let value = (acc.capital.get() as i128)
                .checked_add(acc.pnl_reserved.get() as i128)
                .and_then(|v| v.checked_add(acc.pnl_realized.get()))
                .and_then(|v| v.checked_add(unrealized));
            let value = match value {
                Some(v) => v,
                None => return false,
            };
            total_claims = match total_claims.checked_add(value) {
                Some(v) => v,
                None => return false,
            };
        }

        // `vault` is the full custody balance (spec.md §3 "the trusted
        // internal accounting image of the external vault's balance"),
        // so the insurance reserve is carved *out* of it, not added on
        // top — same convention `residual()` above already uses.
        let backing = (self.vault.get() as i128)
            .checked_sub(self.insurance_fund.balance.get() as i128)
            .and_then(|v| v.checked_sub(self.loss_accum.get() as i128));
        let backing = match backing {
            Some(v) => v,
            None => return false,
        };
        total_claims <= backing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountKind;
    use crate::slab::{FundingConfig, RiskParams};

    fn params() -> RiskParams {
        RiskParams {
            warmup_period_slots: 100,
            maintenance_margin_bps: 300,
            initial_margin_bps: 500,
            trading_fee_bps: 10,
            max_accounts: crate::constants::MAX_ACCOUNTS as u64,
            new_account_fee: U128::ZERO,
            risk_reduction_threshold: U128::new(1_000_000),
            maintenance_fee_per_slot: U128::ZERO,
            max_crank_staleness_slots: 1000,
            liquidation_fee_bps: 50,
            liquidation_fee_cap: U128::new(1_000_000),
            liquidation_buffer_bps: 100,
            min_liquidation_abs: U128::new(1),
            funding: FundingConfig {
                horizon_slots: 100,
                k_bps: 10,
                scale_notional: 1_000_000,
                max_premium_bps: 50,
                max_bps_per_slot: 5,
            },
        }
    }

    #[test]
    fn haircut_is_one_when_no_positive_pnl() {
        let engine = RiskEngine::new(params());
        assert_eq!(engine.current_haircut(0), Haircut::FULL);
    }

    #[test]
    fn haircut_below_one_when_residual_scarce() {
        let mut engine = RiskEngine::new(params());
        engine.totals.pnl_pos_tot = U128::new(100);
        engine.vault = U128::new(50);
        let h = engine.current_haircut(0);
        assert_eq!(h.numerator, 50);
        assert_eq!(h.denominator, 100);
        assert_eq!(h.apply_floor(100).unwrap(), 50);
    }

    #[test]
    fn settle_losses_draws_insurance_then_socializes() {
        let mut engine = RiskEngine::new(params());
        let idx = engine.add_user(0).unwrap() as usize;
        engine.accounts[idx].kind = AccountKind::User;
        engine.accounts[idx].capital = U128::new(10);
        engine.accounts[idx].pnl_realized = I128::new(-30);
        engine.insurance_fund.balance = U128::new(15);
        engine.totals.pnl_pos_tot = U128::new(1000);

        engine.settle_losses(idx).unwrap();

        assert_eq!(engine.accounts[idx].capital.get(), 0);
        assert_eq!(engine.insurance_fund.balance.get(), 0);
        // loss 30: 10 from capital, 15 from insurance, 5 left -> loss_accum
        assert_eq!(engine.loss_accum.get(), 5);
        assert_eq!(engine.totals.pnl_pos_tot.get(), 995);
    }
}
