//! Keeper crank (spec.md §4.11): the permissionless sweep that advances
//! funding, charges the per-slot maintenance fee, runs the two-pass
//! settlement over every used account, updates the risk-reduction
//! threshold EWMA, recovers stranded funds, and — per SPEC_FULL.md
//! §C.1 — frees dust accounts.

use crate::account::AccountKind;
use crate::constants::{MAX_ACCOUNTS, THRESHOLD_EWMA_ALPHA_BPS, THRESHOLD_MAX_STEP_BPS};
use crate::error::RiskError;
use crate::fixed::U128;
use crate::slab::RiskEngine;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CrankOutcome {
    pub accounts_settled: u32,
    pub accounts_skipped: u32,
    pub num_gc_closed: u32,
    pub maintenance_fee_total: u128,
}

impl RiskEngine {
    /// Runs one crank step. `caller_idx` is `PERMISSIONLESS_CALLER`
    /// (`0xFFFF`) for the common unprivileged path; any other value is
    /// just a convenience label for who paid the transaction, never a
    /// privilege check (spec.md §9 Open Question #3, resolved in
    /// DESIGN.md: the crank stays fully permissionless). With
    /// `allow_panic` cleared, a failure settling one account is isolated
    /// to that account (SPEC_FULL.md §C.3) instead of aborting the sweep.
    pub fn keeper_crank(
        &mut self,
        _caller_idx: u16,
        now_slot: u64,
        oracle_price_e6: u64,
        allow_panic: bool,
    ) -> Result<CrankOutcome, RiskError> {
        if oracle_price_e6 == 0 || oracle_price_e6 > crate::constants::MAX_ORACLE_PRICE {
            return Err(RiskError::OraclePriceInvalid);
        }

        let lp_net_notional = self.compute_lp_net_notional(oracle_price_e6)?;
        self.step_funding(now_slot, lp_net_notional)?;

        let mut outcome = CrankOutcome::default();
        self.last_full_sweep_start_slot = now_slot;

        let mut idxs_to_close: [usize; MAX_ACCOUNTS] = [0; MAX_ACCOUNTS];
        let mut num_to_close = 0usize;

        for idx in 0..MAX_ACCOUNTS {
            if !self.is_used(idx) {
                continue;
            }
            let result = self.crank_one_account(idx, now_slot);
            match result {
                Ok(fee) => {
                    outcome.accounts_settled += 1;
                    outcome.maintenance_fee_total = outcome
                        .maintenance_fee_total
                        .checked_add(fee)
                        .ok_or(RiskError::ArithmeticOverflow)?;
                    if self.accounts[idx].is_dust() {
                        idxs_to_close[num_to_close] = idx;
                        num_to_close += 1;
                    }
                }
                Err(e) => {
                    if !allow_panic {
                        return Err(e);
                    }
                    outcome.accounts_skipped += 1;
                }
            }
        }

        for &idx in &idxs_to_close[..num_to_close] {
            self.close_account(idx)?;
            outcome.num_gc_closed += 1;
        }

        self.refresh_oi_totals()?;
        self.update_risk_reduction_threshold()?;
        self.recover_stranded_funds()?;
        self.auto_recover_if_stranded(now_slot)?;

        self.last_crank_slot = now_slot;
        self.header.nonce = self.header.nonce.wrapping_add(1);
        Ok(outcome)
    }

    /// Recomputes `total_open_interest`, `lp_sum_abs`, and `lp_max_abs`
    /// from a full scan (spec.md §3 "totals"). These feed the
    /// risk-reduction threshold EWMA and the auto-recovery gate below;
    /// both only run once per crank sweep, so an O(n) refresh here costs
    /// nothing the sweep wasn't already paying.
    fn refresh_oi_totals(&mut self) -> Result<(), RiskError> {
        let mut oi: u128 = 0;
        let mut lp_abs: u128 = 0;
        let mut lp_max: u128 = 0;
        for idx in 0..MAX_ACCOUNTS {
            if !self.is_used(idx) {
                continue;
            }
            let acc = &self.accounts[idx];
            let p = acc.position_size.get();
            if p > 0 {
                oi = oi.checked_add(p as u128).ok_or(RiskError::ArithmeticOverflow)?;
            }
            if acc.kind.is_lp() {
                let abs = p.unsigned_abs();
                lp_abs = lp_abs.checked_add(abs).ok_or(RiskError::ArithmeticOverflow)?;
                lp_max = lp_max.max(abs);
            }
        }
        self.totals.total_open_interest = U128::new(oi);
        self.totals.lp_sum_abs = U128::new(lp_abs);
        self.totals.lp_max_abs = U128::new(lp_max);
        Ok(())
    }

    /// Auto-recovery (spec.md §4.11 step 8, scenario S5) — the fix for
    /// the stranded-funds liveness bug: once the book is flat
    /// (`total_open_interest == 0`) with socialized loss outstanding,
    /// phantom positive PnL left on surviving accounts can never be paid
    /// by a counterparty that no longer exists, so it's zeroed, the
    /// vault surplus over `Σcapital` is swept into insurance, and the
    /// market exits risk-reduction mode.
    fn auto_recover_if_stranded(&mut self, now_slot: u64) -> Result<(), RiskError> {
        if !(self.risk_reduction_only
            && self.loss_accum.get() > 0
            && self.totals.total_open_interest.get() == 0)
        {
            return Ok(());
        }

        for idx in 0..MAX_ACCOUNTS {
            if !self.is_used(idx) {
                continue;
            }
            let acc = &mut self.accounts[idx];
            let pos = acc.pnl_realized.pos_part();
            if pos > 0 {
                acc.pnl_realized = acc
                    .pnl_realized
                    .checked_sub(crate::fixed::I128::new(pos as i128))
                    .ok_or(RiskError::ArithmeticOverflow)?;
            }
            acc.pnl_reserved = U128::ZERO;
            acc.warmup_started_at_slot = now_slot;
        }
        self.refresh_pnl_totals();
        self.loss_accum = U128::ZERO;

        let sum_capital = self.sum_all_capital();
        let surplus = self.vault.get().saturating_sub(sum_capital).saturating_sub(self.insurance_fund.balance.get());
        if surplus > 0 {
            self.insurance_fund.balance = self.insurance_fund.balance.add_checked(surplus)?;
        }

        self.risk_reduction_only = false;
        self.warmup_paused = false;
        Ok(())
    }

    fn crank_one_account(&mut self, idx: usize, now_slot: u64) -> Result<u128, RiskError> {
        let acc = &self.accounts[idx];
        let delta = crate::margin::funding_delta(
            acc.position_size.get(),
            self.funding_index_qpb_e6,
            acc.funding_index_snapshot,
        )?;
        let acc = &mut self.accounts[idx];
        acc.pnl_realized = acc
            .pnl_realized
            .checked_add(crate::fixed::I128::new(-delta))
            .ok_or(RiskError::ArithmeticOverflow)?;
        acc.funding_index_snapshot = self.funding_index_qpb_e6;

        let fee = self.risk_params.maintenance_fee_per_slot.get();
        if fee > 0 {
            self.settle_maintenance_fee(idx, fee)?;
        }

        let sum_capital = self.sum_all_capital();
        self.two_pass_settle(&[idx], now_slot, sum_capital)?;

        Ok(fee)
    }

    fn compute_lp_net_notional(&self, oracle_price_e6: u64) -> Result<i128, RiskError> {
        let mut net: i128 = 0;
        for idx in 0..MAX_ACCOUNTS {
            if self.is_used(idx) && self.accounts[idx].kind.is_lp() {
                net = net
                    .checked_add(self.accounts[idx].position_size.get())
                    .ok_or(RiskError::ArithmeticOverflow)?;
            }
        }
        let _ = oracle_price_e6;
        Ok(net)
    }

    /// EWMA-smooths `risk_reduction_threshold` toward `total_open_interest`
    /// with a 10% alpha, capped to a ±5% step per update (spec.md §4.11
    /// step 6), and flips `risk_reduction_only` when OI crosses it.
    fn update_risk_reduction_threshold(&mut self) -> Result<(), RiskError> {
        let current = self.risk_params.risk_reduction_threshold.get();
        let target = self.totals.total_open_interest.get();

        let diff = target as i128 - current as i128;
        let step = diff
            .checked_mul(THRESHOLD_EWMA_ALPHA_BPS as i128)
            .ok_or(RiskError::ArithmeticOverflow)?
            / crate::constants::BPS_DENOM as i128;
        let max_step = (current as i128)
            .checked_mul(THRESHOLD_MAX_STEP_BPS as i128)
            .ok_or(RiskError::ArithmeticOverflow)?
            / crate::constants::BPS_DENOM as i128;
        let clamped_step = step.clamp(-max_step, max_step);

        let new_threshold = (current as i128 + clamped_step).max(0) as u128;
        self.risk_params.risk_reduction_threshold = U128::new(new_threshold);
        self.risk_reduction_only = target > new_threshold;
        self.header.last_threshold_update_slot = self.current_slot;
        Ok(())
    }

    /// `vault - Σcapital - insurance.balance - Σpnl_reserved` that ended
    /// up positive through rounding (every division in this crate floors
    /// or ceils deliberately, never banker's-rounds) is swept into the
    /// insurance fund rather than left unaccounted for.
    fn recover_stranded_funds(&mut self) -> Result<(), RiskError> {
        let sum_capital = self.sum_all_capital();
        let mut sum_reserved: u128 = 0;
        for idx in 0..MAX_ACCOUNTS {
            if self.is_used(idx) {
                sum_reserved = sum_reserved.saturating_add(self.accounts[idx].pnl_reserved.get());
            }
        }
        let accounted = sum_capital
            .saturating_add(self.insurance_fund.balance.get())
            .saturating_add(sum_reserved);
        let vault = self.vault.get();
        if vault > accounted {
            let stranded = vault - accounted;
            self.insurance_fund.balance = self.insurance_fund.balance.add_checked(stranded)?;
        }
        Ok(())
    }
}
