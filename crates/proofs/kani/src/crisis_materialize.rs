//! Proofs over `model_safety::crisis::materialize_user`

use model_safety::crisis::{crisis_apply_haircuts, materialize_user, Accums, MaterializeParams, UserPortfolio};

#[kani::proof]
#[kani::unwind(2)]
fn materialization_is_idempotent() {
    let principal: i128 = kani::any();
    let collateral: i128 = kani::any();

    kani::assume(principal > 0 && principal < 1_000_000);
    kani::assume(collateral >= 0 && collateral < principal);

    let mut a = Accums::new();
    a.sigma_principal = principal;
    a.sigma_collateral = collateral;
    let _ = crisis_apply_haircuts(&mut a);

    let mut user = UserPortfolio::new();
    user.principal = principal;

    let params = MaterializeParams::default();
    materialize_user(&mut user, &mut a, params);
    let principal_after_first = user.principal;

    materialize_user(&mut user, &mut a, params);
    assert_eq!(user.principal, principal_after_first);
}

#[kani::proof]
#[kani::unwind(2)]
fn vesting_conserves_warming_plus_realized() {
    let warming: i128 = kani::any();
    let now_slot: u64 = kani::any();

    kani::assume(warming >= 0 && warming < 1_000_000);
    kani::assume(now_slot < 20_000);

    let mut a = Accums::new();
    a.sigma_warming = warming;

    let mut user = UserPortfolio::new();
    user.warming = warming;

    let sum_before = user.warming + user.realized;

    let mut params = MaterializeParams::default();
    params.now_slot = now_slot;
    materialize_user(&mut user, &mut a, params);

    let sum_after = user.warming + user.realized;
    assert_eq!(sum_before, sum_after);
}

#[kani::proof]
#[kani::unwind(2)]
fn materialized_user_never_exceeds_pre_crisis_equity() {
    let principal: i128 = kani::any();
    let collateral: i128 = kani::any();

    kani::assume(principal > 0 && principal < 1_000_000);
    kani::assume(collateral >= 0 && collateral < principal);

    let mut a = Accums::new();
    a.sigma_principal = principal;
    a.sigma_collateral = collateral;
    let _ = crisis_apply_haircuts(&mut a);

    let mut user = UserPortfolio::new();
    user.principal = principal;

    materialize_user(&mut user, &mut a, MaterializeParams::default());

    assert!(user.principal <= principal);
}
