//! Admin surface (spec.md §4.12): risk-parameter updates, pause
//! switches, the oracle-authority price push, and fee-credit coupons
//! (SPEC_FULL.md §C.2). Every op here assumes the caller has already
//! verified the admin signature — this crate has no notion of a
//! signer, that check lives in `percolator-prog`.

use crate::error::RiskError;
use crate::fixed::I128;
use crate::slab::{RiskEngine, RiskParams};

impl RiskEngine {
    /// Replaces the full `RiskParams` region in one shot. Rejects a
    /// replacement that would violate the margin-order invariant
    /// (spec.md invariant 6: `maintenance_margin_bps < initial_margin_bps`).
    pub fn update_risk_params(&mut self, new_params: RiskParams) -> Result<(), RiskError> {
        if !new_params.margin_order_holds() {
            return Err(RiskError::InvariantViolation);
        }
        self.risk_params = new_params;
        Ok(())
    }

    pub fn set_risk_reduction_only(&mut self, on: bool) {
        self.risk_reduction_only = on;
    }

    pub fn set_warmup_paused(&mut self, on: bool) {
        self.warmup_paused = on;
    }

    /// Pushes an authority-signed price for markets without a live feed
    /// (spec.md §4.4 step 1). Accepts any non-zero price at any
    /// timestamp — the trust boundary is deliberate (DESIGN.md Open
    /// Question #1).
    pub fn set_authority_price(&mut self, price_e6: u64, timestamp: i64) -> Result<(), RiskError> {
        if price_e6 == 0 {
            return Err(RiskError::OraclePriceInvalid);
        }
        self.authority_price_e6 = price_e6;
        self.authority_timestamp = timestamp;
        Ok(())
    }

    /// Grants a pre-funded fee-credit coupon (SPEC_FULL.md §C.2): the
    /// depositor's money has already landed in the vault (the on-chain
    /// wrapper transfers it in before calling this), so it's recognized
    /// as insurance revenue *now*. Spending the credit later via
    /// `settle_maintenance_fee` is not counted again.
    pub fn add_fee_credits(&mut self, idx: usize, amount: u128) -> Result<(), RiskError> {
        if !self.is_used(idx) {
            return Err(RiskError::InvalidIndex);
        }
        self.accounts[idx].fee_credits = self.accounts[idx]
            .fee_credits
            .checked_add(I128::new(amount as i128))
            .ok_or(RiskError::ArithmeticOverflow)?;
        if amount > 0 {
            self.vault = self.vault.add_checked(amount)?;
            self.insurance_fund.balance = self.insurance_fund.balance.add_checked(amount)?;
            self.insurance_fund.fee_revenue = self.insurance_fund.fee_revenue.add_checked(amount)?;
        }
        Ok(())
    }

    /// Admin-directed top-up of the insurance fund from outside the
    /// vault's normal fee/loss flows (e.g. a manual backstop deposit).
    /// The matching token transfer is the on-chain wrapper's concern.
    pub fn fund_insurance(&mut self, amount: u128) -> Result<(), RiskError> {
        self.insurance_fund.balance = self.insurance_fund.balance.add_checked(amount)?;
        self.vault = self.vault.add_checked(amount)?;
        Ok(())
    }

    /// Admin-directed draw from the insurance fund (e.g. to a treasury).
    /// Never draws below zero.
    pub fn withdraw_insurance(&mut self, amount: u128) -> Result<(), RiskError> {
        if amount > self.insurance_fund.balance.get() {
            return Err(RiskError::InsufficientInsurance);
        }
        self.insurance_fund.balance = self.insurance_fund.balance.sub_checked(amount)?;
        self.vault = self.vault.sub_checked(amount)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::U128;
    use crate::slab::FundingConfig;

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
    fn update_risk_params_rejects_bad_margin_order() {
        let mut engine = RiskEngine::new(params());
        let mut bad = params();
        bad.maintenance_margin_bps = 500;
        bad.initial_margin_bps = 300;
        assert_eq!(
            engine.update_risk_params(bad).unwrap_err(),
            RiskError::InvariantViolation
        );
    }

    #[test]
    fn fee_credits_accumulate() {
        let mut engine = RiskEngine::new(params());
        let idx = engine.add_user(0).unwrap() as usize;
        engine.add_fee_credits(idx, 500).unwrap();
        assert_eq!(engine.accounts[idx].fee_credits.get(), 500);
    }

    #[test]
    fn withdraw_insurance_floor_checked() {
        let mut engine = RiskEngine::new(params());
        engine.fund_insurance(100).unwrap();
        assert_eq!(
            engine.withdraw_insurance(200).unwrap_err(),
            RiskError::InsufficientInsurance
        );
        engine.withdraw_insurance(100).unwrap();
        assert_eq!(engine.insurance_fund.balance.get(), 0);
    }
}
