//! Lazy per-user reconciliation against the global crisis scales
//!
//! A user's stored balances only reflect crisis haircuts once they are
//! "touched" again — `materialize_user` is that touch. It catches the
//! user up to the current `Accums` epoch and vests any warming PnL that
//! has crossed the warmup horizon since the user's last action.

use crate::crisis::accums::{Accums, UserPortfolio};
use crate::crisis::amount::Q64x64;

/// Parameters for a single materialization call
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MaterializeParams {
    /// Current slot, used to compute vesting progress
    pub now_slot: u64,

    /// Number of slots over which warming PnL vests linearly into realized
    pub tau_slots: u64,
}

impl Default for MaterializeParams {
    fn default() -> Self {
        MaterializeParams { now_slot: 0, tau_slots: 10_000 }
    }
}

/// Reconcile a user against the global crisis scales and vest warming PnL
///
/// 1. If the user is behind the global epoch, apply the equity/warming
///    scale deltas accrued since their last snapshot.
/// 2. Vest warming PnL into realized PnL linearly over `tau_slots`.
///
/// Calling this twice with the same `params.now_slot` is a no-op the
/// second time: epoch reconciliation is gated on `last_epoch_applied`
/// and vesting is gated on elapsed slots since `last_touch_slot`.
pub fn materialize_user(user: &mut UserPortfolio, accums: &mut Accums, params: MaterializeParams) {
    reconcile_scales(user, accums);
    vest_warming(user, accums, params);
    user.last_touch_slot = params.now_slot;
}

fn reconcile_scales(user: &mut UserPortfolio, accums: &mut Accums) {
    if !user.needs_materialization(accums.epoch) {
        return;
    }

    if accums.equity_scale != user.equity_scale_snap {
        let ratio = Q64x64::ratio(accums.equity_scale.0 as i128, user.equity_scale_snap.0 as i128);
        user.principal = ratio.mul_i128(user.principal);
        user.realized = ratio.mul_i128(user.realized);
        user.equity_scale_snap = accums.equity_scale;
    }

    if accums.warming_scale != user.warming_scale_snap {
        let ratio = Q64x64::ratio(accums.warming_scale.0 as i128, user.warming_scale_snap.0 as i128);
        user.warming = ratio.mul_i128(user.warming);
        user.warming_scale_snap = accums.warming_scale;
    }

    user.last_epoch_applied = accums.epoch;
}

/// Vest warming PnL into realized PnL linearly over `tau_slots`
///
/// The aggregate `Accums` is updated in lockstep so `sigma_warming +
/// sigma_realized` stays conserved globally, mirroring the per-user move.
fn vest_warming(user: &mut UserPortfolio, accums: &mut Accums, params: MaterializeParams) {
    if user.warming <= 0 || params.tau_slots == 0 {
        return;
    }

    let elapsed = params.now_slot.saturating_sub(user.last_touch_slot);
    if elapsed == 0 {
        return;
    }

    let vested = if elapsed >= params.tau_slots {
        user.warming
    } else {
        let fraction = Q64x64::ratio(elapsed as i128, params.tau_slots as i128);
        fraction.mul_i128(user.warming)
    };

    if vested == 0 {
        return;
    }

    user.warming -= vested;
    user.realized = user.realized.saturating_add(vested);

    accums.sigma_warming = accums.sigma_warming.saturating_sub(vested);
    accums.sigma_realized = accums.sigma_realized.saturating_add(vested);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_have_nonzero_horizon() {
        let params = MaterializeParams::default();
        assert!(params.tau_slots > 0);
        assert_eq!(params.now_slot, 0);
    }

    #[test]
    fn idempotent_materialization() {
        let mut accums = Accums::new();
        accums.sigma_principal = 1_000_000;
        accums.sigma_collateral = 800_000;

        crate::crisis::crisis_apply_haircuts(&mut accums);

        let mut user = UserPortfolio::new();
        user.principal = 100_000;

        let params = MaterializeParams::default();
        materialize_user(&mut user, &mut accums, params);
        let after_first = user.principal;

        materialize_user(&mut user, &mut accums, params);
        assert_eq!(user.principal, after_first);
    }

    #[test]
    fn vesting_is_bounded_by_tau() {
        let mut accums = Accums::new();
        accums.sigma_warming = 1_000_000;

        let mut user = UserPortfolio::new();
        user.warming = 1_000_000;

        let mut params = MaterializeParams::default();
        params.now_slot = params.tau_slots * 2;

        materialize_user(&mut user, &mut accums, params);

        assert_eq!(user.warming, 0);
        assert_eq!(user.realized, 1_000_000);
        assert_eq!(accums.sigma_warming, 0);
        assert_eq!(accums.sigma_realized, 1_000_000);
    }

    #[test]
    fn untouched_user_does_not_vest() {
        let mut accums = Accums::new();
        let mut user = UserPortfolio::new();
        user.warming = 1_000;
        user.last_touch_slot = 5;

        let mut params = MaterializeParams::default();
        params.now_slot = 5;

        materialize_user(&mut user, &mut accums, params);
        assert_eq!(user.warming, 1_000);
    }
}
