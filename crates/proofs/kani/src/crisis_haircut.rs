//! Proofs over `model_safety::crisis::crisis_apply_haircuts`

use model_safety::crisis::{crisis_apply_haircuts, Accums, Q64x64};

fn bounded_accums(principal: i128, warming: i128, collateral: i128) -> Accums {
    let mut a = Accums::new();
    a.sigma_principal = principal;
    a.sigma_warming = warming;
    a.sigma_collateral = collateral;
    a
}

#[kani::proof]
#[kani::unwind(2)]
fn solvency_after_haircut_when_equity_exists() {
    let principal: i128 = kani::any();
    let collateral: i128 = kani::any();

    kani::assume(principal >= 0 && principal < 1_000_000);
    kani::assume(collateral >= 0 && collateral < 1_000_000);

    let mut a = bounded_accums(principal, 0, collateral);
    let outcome = crisis_apply_haircuts(&mut a);

    if principal > 0 {
        assert!(outcome.is_solvent, "equity exists, deficit must be eliminated");
        assert_eq!(a.deficit(), 0);
    }
}

#[kani::proof]
#[kani::unwind(2)]
fn scales_never_increase() {
    let principal: i128 = kani::any();
    let warming: i128 = kani::any();
    let collateral: i128 = kani::any();

    kani::assume(principal >= 0 && principal < 1_000_000);
    kani::assume(warming >= 0 && warming < 1_000_000);
    kani::assume(collateral >= 0 && collateral < 1_000_000);

    let mut a = bounded_accums(principal, warming, collateral);
    let eq_before = a.equity_scale;
    let warm_before = a.warming_scale;

    let _ = crisis_apply_haircuts(&mut a);

    assert!(a.equity_scale.0 <= eq_before.0);
    assert!(a.warming_scale.0 <= warm_before.0);
}

#[kani::proof]
#[kani::unwind(2)]
fn never_burns_more_warming_than_available() {
    let warming: i128 = kani::any();
    let collateral: i128 = kani::any();

    kani::assume(warming >= 0 && warming < 1_000_000);
    kani::assume(collateral >= 0 && collateral < 1_000_000);

    let mut a = bounded_accums(0, warming, collateral);
    let outcome = crisis_apply_haircuts(&mut a);

    assert!(outcome.burned_warming <= warming);
    assert!(a.sigma_warming >= 0);
}

#[kani::proof]
#[kani::unwind(2)]
fn no_action_when_already_solvent() {
    let principal: i128 = kani::any();
    let collateral: i128 = kani::any();

    kani::assume(principal >= 0 && principal < 1_000_000);
    kani::assume(collateral >= principal && collateral < 2_000_000);

    let mut a = bounded_accums(principal, 0, collateral);
    let outcome = crisis_apply_haircuts(&mut a);

    assert_eq!(outcome.burned_warming, 0);
    assert_eq!(outcome.insurance_draw, 0);
    assert_eq!(outcome.equity_haircut_ratio, Q64x64::ZERO);
    assert_eq!(a.epoch, 0);
}
