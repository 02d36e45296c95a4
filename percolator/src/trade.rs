//! Trading pipeline (spec.md §4.9): gate the oracle, invoke the LP's
//! matcher, validate the fill against the requested size and the
//! oracle band, update both legs' positions, charge the trading fee,
//! and settle via the two-pass path.

use crate::error::RiskError;
use crate::fixed::I128;
use crate::margin::{effective_equity, initial_margin, notional, unrealized_pnl};
use crate::matcher::{MatchingEngine, TradeExecution};
use crate::slab::RiskEngine;

impl RiskEngine {
    /// Executes one user-initiated trade against an LP's external
    /// matcher. `lp_idx`/`user_idx` are slot indices, `now_slot` drives
    /// funding/warmup settlement, `oracle_price_e6` is the already-gated
    /// mark (the caller runs `oracle::read_oracle` — or the on-chain
    /// wrapper parses the pushed authority price — before invoking this;
    /// the trade pipeline itself only validates the gated output).
    pub fn execute_trade<M: MatchingEngine>(
        &mut self,
        matcher: &M,
        lp_idx: usize,
        user_idx: usize,
        now_slot: u64,
        oracle_price: u64,
        size: i128,
    ) -> Result<TradeExecution, RiskError> {
        if size == 0 {
            return Err(RiskError::ZeroSize);
        }
        if self.risk_reduction_only && !self.is_risk_reducing(user_idx, size) {
            return Err(RiskError::RiskReductionOnly);
        }
        if now_slot.saturating_sub(self.last_crank_slot) > self.risk_params.max_crank_staleness_slots {
            return Err(RiskError::StaleCrank);
        }
        if lp_idx == user_idx || !self.is_used(lp_idx) || !self.is_used(user_idx) {
            return Err(RiskError::InvalidIndex);
        }
        if !self.accounts[lp_idx].kind.is_lp() {
            return Err(RiskError::InvalidIndex);
        }
        if oracle_price == 0 || oracle_price > crate::constants::MAX_ORACLE_PRICE {
            return Err(RiskError::OraclePriceInvalid);
        }
        self.current_slot = now_slot;

        let (lp_program, lp_context, lp_account_id) = {
            let lp = &self.accounts[lp_idx];
            (lp.matcher_program, lp.matcher_context, lp.account_id)
        };
        let exec = matcher.execute_match(&lp_program, &lp_context, lp_account_id, oracle_price, size)?;

        if exec.fill_size == 0 || exec.fill_size.signum() != size.signum() || exec.fill_size.unsigned_abs() > size.unsigned_abs() {
            return Err(RiskError::InvalidMatchingEngine);
        }
        if exec.fill_price_e6 == 0 {
            return Err(RiskError::MatcherReturnedBadPrice);
        }

        self.apply_fill(user_idx, exec.fill_size, exec.fill_price_e6)?;
        self.apply_fill(lp_idx, -exec.fill_size, exec.fill_price_e6)?;

        self.charge_trading_fee(user_idx, exec.fill_size, exec.fill_price_e6)?;

        self.accounts[user_idx].warmup_started_at_slot = now_slot;
        self.accounts[lp_idx].warmup_started_at_slot = now_slot;

        let sum_capital = self.sum_all_capital();
        self.two_pass_settle(&[user_idx, lp_idx], now_slot, sum_capital)?;

        self.check_margin(user_idx, oracle_price)?;

        Ok(exec)
    }

    fn is_risk_reducing(&self, idx: usize, size: i128) -> bool {
        let current = self.accounts[idx].position_size.get();
        if current == 0 {
            return false;
        }
        current.signum() != size.signum() && size.unsigned_abs() <= current.unsigned_abs()
    }

    /// Updates one leg's position for a fill, realizing PnL on the
    /// reducing portion (spec.md §4.5: a fill against an open position
    /// never silently discards the price difference it closes out at).
    fn apply_fill(&mut self, idx: usize, fill_size: i128, fill_price_e6: u64) -> Result<(), RiskError> {
        let acc = &self.accounts[idx];
        let old_size = acc.position_size.get();
        let old_entry = acc.entry_price;
        let new_size = old_size
            .checked_add(fill_size)
            .ok_or(RiskError::ArithmeticOverflow)?;

        if old_size == 0 || old_size.signum() == fill_size.signum() {
            // opening or adding to a position: average the entry price in.
            let entry = crate::account::Account::weighted_entry_price(old_size, old_entry, fill_size, fill_price_e6)?;
            let acc = &mut self.accounts[idx];
            acc.entry_price = entry;
            acc.position_size = I128::new(new_size);
            return Ok(());
        }

        // opposite sign: this fill reduces (and maybe flips through) the
        // existing position. Realize PnL on the closed portion first.
        let closed = old_size.unsigned_abs().min(fill_size.unsigned_abs()) as i128;
        let signed_closed = if old_size > 0 { closed } else { -closed };
        let realized = crate::margin::unrealized_pnl(signed_closed, fill_price_e6, old_entry)?;

        let acc = &mut self.accounts[idx];
        acc.pnl_realized = acc
            .pnl_realized
            .checked_add(I128::new(realized))
            .ok_or(RiskError::ArithmeticOverflow)?;

        if new_size == 0 {
            acc.entry_price = 0;
        } else if new_size.signum() != old_size.signum() {
            // flipped through flat: the remainder opens fresh at the fill price
            acc.entry_price = fill_price_e6;
        }
        acc.position_size = I128::new(new_size);
        Ok(())
    }

    fn charge_trading_fee(&mut self, user_idx: usize, fill_size: i128, fill_price_e6: u64) -> Result<(), RiskError> {
        let notional_amt = notional(fill_size, fill_price_e6)?;
        let fee = crate::fixed::mul_bps_ceil(notional_amt, self.risk_params.trading_fee_bps, crate::constants::BPS_DENOM)?;
        if fee == 0 {
            return Ok(());
        }
        self.settle_maintenance_fee(user_idx, fee)?;
        self.insurance_fund.fee_revenue = self.insurance_fund.fee_revenue.add_checked(fee)?;
        self.insurance_fund.balance = self.insurance_fund.balance.add_checked(fee)?;
        Ok(())
    }

    /// Spends `fee_credits` first (a pre-funded coupon, not new revenue),
    /// then `capital`, then draws the remainder from `pnl_realized`.
    /// Used both by the trading-fee path above and by the crank's
    /// per-slot maintenance fee (spec.md §4.11).
    pub fn settle_maintenance_fee(&mut self, idx: usize, amount: u128) -> Result<(), RiskError> {
        if amount == 0 {
            return Ok(());
        }
        let acc = &mut self.accounts[idx];
        let mut remaining = amount as i128;

        let credits = acc.fee_credits.get();
        if credits > 0 {
            let from_credits = credits.min(remaining);
            acc.fee_credits = acc
                .fee_credits
                .checked_sub(I128::new(from_credits))
                .ok_or(RiskError::ArithmeticOverflow)?;
            remaining -= from_credits;
        }
        if remaining == 0 {
            return Ok(());
        }

        let cap = acc.capital.get() as i128;
        let from_capital = cap.min(remaining);
        if from_capital > 0 {
            acc.capital = acc.capital.sub_checked(from_capital as u128)?;
            remaining -= from_capital;
            self.insurance_fund.balance = self.insurance_fund.balance.add_checked(from_capital as u128)?;
            self.insurance_fund.fee_revenue = self
                .insurance_fund
                .fee_revenue
                .add_checked(from_capital as u128)?;
        }
        if remaining > 0 {
            // uncovered: book against realized PnL, may go negative
            let acc = &mut self.accounts[idx];
            acc.pnl_realized = acc
                .pnl_realized
                .checked_sub(I128::new(remaining))
                .ok_or(RiskError::ArithmeticOverflow)?;
            acc.fee_credits = acc
                .fee_credits
                .checked_sub(I128::new(remaining))
                .ok_or(RiskError::ArithmeticOverflow)?;
        }
        Ok(())
    }

    fn check_margin(&self, idx: usize, mark_price_e6: u64) -> Result<(), RiskError> {
        let acc = &self.accounts[idx];
        if acc.kind.is_lp() {
            return Ok(());
        }
        let pos_notional = notional(acc.position_size.get(), mark_price_e6)?;
        let unrealized = unrealized_pnl(acc.position_size.get(), mark_price_e6, acc.entry_price)?;
        let equity = effective_equity(
            acc.capital.get(),
            acc.pnl_reserved.get(),
            unrealized,
            acc.pnl_realized.get(),
        )?;
        let required = initial_margin(pos_notional, &self.risk_params)?;
        if !crate::margin::meets_requirement(equity, required) {
            return Err(RiskError::InsufficientMargin);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::FixedPriceMatcher;
    use crate::slab::{FundingConfig, RiskParams};
    use crate::fixed::U128;

    fn params() -> RiskParams {
        RiskParams {
            warmup_period_slots: 100,
            maintenance_margin_bps: 300,
            initial_margin_bps: 500,
            trading_fee_bps: 10,
            max_accounts: crate::constants::MAX_ACCOUNTS as u64,
            new_account_fee: U128::ZERO,
            risk_reduction_threshold: U128::new(1_000_000_000),
            maintenance_fee_per_slot: U128::ZERO,
            max_crank_staleness_slots: 10_000,
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
    fn trade_updates_both_legs_and_charges_fee() {
        let mut engine = RiskEngine::new(params());
        let lp = engine.add_lp([1; 32], [2; 32], 0).unwrap() as usize;
        let user = engine.add_user(0).unwrap() as usize;
        engine.accounts[user].capital = U128::new(1_000_000);
        engine.accounts[lp].capital = U128::new(1_000_000_000);
        engine.last_crank_slot = 10;

        let matcher = FixedPriceMatcher;
        let exec = engine
            .execute_trade(&matcher, lp, user, 10, 100_000_000, 100)
            .unwrap();
        assert_eq!(exec.fill_size, 100);

        assert_eq!(engine.accounts[user].position_size.get(), 100);
        assert_eq!(engine.accounts[lp].position_size.get(), -100);
        assert!(engine.insurance_fund.fee_revenue.get() > 0);
    }

    #[test]
    fn zero_size_rejected() {
        let mut engine = RiskEngine::new(params());
        let lp = engine.add_lp([1; 32], [2; 32], 0).unwrap() as usize;
        let user = engine.add_user(0).unwrap() as usize;
        engine.last_crank_slot = 10;
        let matcher = FixedPriceMatcher;
        let err = engine
            .execute_trade(&matcher, lp, user, 10, 100_000_000, 0)
            .unwrap_err();
        assert_eq!(err, RiskError::ZeroSize);
    }
}
