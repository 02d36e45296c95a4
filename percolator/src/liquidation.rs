//! Liquidation (spec.md §4.10): forced position reduction against an
//! unhealthy account's own margin, at a buffered oracle price, with a
//! capped fee split to insurance.

use crate::error::RiskError;
use crate::fixed::I128;
use crate::margin::{effective_equity, maintenance_margin, meets_requirement, notional, unrealized_pnl};
use crate::slab::RiskEngine;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LiquidationOutcome {
    pub closed_size: i128,
    pub fee_charged: u128,
}

impl RiskEngine {
    /// Reduces `idx`'s position toward flat at `oracle_price` adjusted
    /// by `liquidation_buffer_bps` against the account (i.e. the account
    /// is filled at a worse price than mark, spec.md §4.10 step 3), only
    /// if the account is currently below maintenance margin. Closes the
    /// full position in one call — partial liquidation is not modeled.
    pub fn liquidate_at_oracle(
        &mut self,
        idx: usize,
        oracle_price_e6: u64,
        now_slot: u64,
    ) -> Result<LiquidationOutcome, RiskError> {
        if !self.is_used(idx) {
            return Err(RiskError::InvalidIndex);
        }
        if oracle_price_e6 == 0 || oracle_price_e6 > crate::constants::MAX_ORACLE_PRICE {
            return Err(RiskError::OraclePriceInvalid);
        }

        let acc = &self.accounts[idx];
        let position_size = acc.position_size.get();
        if position_size == 0 {
            return Err(RiskError::AccountHealthy);
        }

        let pos_notional = notional(position_size, oracle_price_e6)?;
        if pos_notional < self.risk_params.min_liquidation_abs.get() {
            return Err(RiskError::LiquidationTooSmall);
        }

        let unrealized = unrealized_pnl(position_size, oracle_price_e6, acc.entry_price)?;
        let equity = effective_equity(
            acc.capital.get(),
            acc.pnl_reserved.get(),
            unrealized,
            acc.pnl_realized.get(),
        )?;
        let mm = maintenance_margin(pos_notional, &self.risk_params)?;
        if meets_requirement(equity, mm) {
            return Err(RiskError::AccountHealthy);
        }

        // Liquidation fills against the account at a price shifted
        // against it by `liquidation_buffer_bps`, compensating whoever
        // absorbs the closing side for taking on stale-price risk.
        let buffer = crate::fixed::mul_bps_floor(
            oracle_price_e6 as u128,
            self.risk_params.liquidation_buffer_bps,
            crate::constants::BPS_DENOM,
        )?;
        let fill_price = if position_size > 0 {
            oracle_price_e6.saturating_sub(buffer as u64)
        } else {
            oracle_price_e6.saturating_add(buffer as u64)
        };

        let realized = unrealized_pnl(position_size, fill_price, acc.entry_price)?;
        let acc = &mut self.accounts[idx];
        acc.pnl_realized = acc
            .pnl_realized
            .checked_add(I128::new(realized))
            .ok_or(RiskError::ArithmeticOverflow)?;
        acc.position_size = I128::ZERO;
        acc.entry_price = 0;
        acc.warmup_started_at_slot = now_slot;

        let raw_fee = crate::fixed::mul_bps_floor(pos_notional, self.risk_params.liquidation_fee_bps, crate::constants::BPS_DENOM)?;
        let fee = raw_fee.min(self.risk_params.liquidation_fee_cap.get());
        if fee > 0 {
            self.settle_maintenance_fee(idx, fee)?;
            let to_insurance = crate::fixed::mul_bps_floor(
                fee,
                crate::constants::LIQUIDATION_FEE_TO_INSURANCE_BPS,
                crate::constants::BPS_DENOM,
            )?;
            self.insurance_fund.balance = self.insurance_fund.balance.add_checked(to_insurance)?;
            self.insurance_fund.fee_revenue = self.insurance_fund.fee_revenue.add_checked(to_insurance)?;
        }

        let sum_capital = self.sum_all_capital();
        self.two_pass_settle(&[idx], now_slot, sum_capital)?;

        self.lifetime_liquidations = self
            .lifetime_liquidations
            .checked_add(1)
            .ok_or(RiskError::ArithmeticOverflow)?;

        Ok(LiquidationOutcome {
            closed_size: -position_size,
            fee_charged: fee,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::U128;
    use crate::slab::{FundingConfig, RiskParams};

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
            liquidation_fee_cap: U128::new(1_000_000_000),
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
    fn healthy_account_rejected() {
        let mut engine = RiskEngine::new(params());
        let idx = engine.add_user(0).unwrap() as usize;
        engine.accounts[idx].capital = U128::new(1_000_000_000);
        engine.accounts[idx].position_size = I128::new(10);
        engine.accounts[idx].entry_price = 100_000_000;
        let err = engine.liquidate_at_oracle(idx, 100_000_000, 1).unwrap_err();
        assert_eq!(err, RiskError::AccountHealthy);
    }

    #[test]
    fn underwater_account_gets_closed() {
        let mut engine = RiskEngine::new(params());
        let idx = engine.add_user(0).unwrap() as usize;
        engine.accounts[idx].capital = U128::new(100);
        engine.accounts[idx].position_size = I128::new(10);
        engine.accounts[idx].entry_price = 100_000_000;
        // price crashes hard against the long
        let out = engine.liquidate_at_oracle(idx, 1_000_000, 1).unwrap();
        assert_eq!(out.closed_size, -10);
        assert_eq!(engine.accounts[idx].position_size.get(), 0);
        assert_eq!(engine.lifetime_liquidations, 1);
    }
}
