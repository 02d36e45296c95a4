//! Parses a fetched slab account's raw bytes into `percolator::RiskEngine`
//! and scores every live account's margin headroom (spec.md §4.10: a
//! liquidation candidate is any account below maintenance margin).
//!
//! This is a read-only, off-chain counterpart to `percolator-prog`'s
//! `slab_view` — same cast, no mutation, so the safety argument is the
//! same: length + alignment checked once, `RiskEngine` is `#[repr(C)]`
//! with a stable field order.

use anyhow::{anyhow, Result};
use percolator::{margin, Account, AccountKind, RiskEngine};
use solana_sdk::pubkey::Pubkey;

pub fn parse_slab(data: &[u8]) -> Result<&RiskEngine> {
    let len = core::mem::size_of::<RiskEngine>();
    let align = core::mem::align_of::<RiskEngine>();
    if data.len() != len {
        return Err(anyhow!("slab account has unexpected length {} (want {len})", data.len()));
    }
    if (data.as_ptr() as usize) % align != 0 {
        return Err(anyhow!("slab account data is misaligned"));
    }
    Ok(unsafe { &*(data.as_ptr() as *const RiskEngine) })
}

#[derive(Debug, Clone)]
pub struct UserHealth {
    pub user: Pubkey,
    pub account_idx: usize,
    /// `effective_equity - maintenance_margin`, in Q6 collateral units.
    /// Negative means liquidatable.
    pub health: i128,
    pub equity: i128,
    pub mm: u128,
    pub last_update: u64,
}

/// Scores every used, non-LP account in the slab against the given
/// gated mark price. LP accounts provide liquidity rather than holding
/// directional risk subject to liquidation (spec.md §4.10 targets
/// position-holding user accounts).
pub fn scan_accounts(engine: &RiskEngine, mark_price_e6: u64, now_slot: u64) -> Result<Vec<UserHealth>> {
    let params = &engine.risk_params;
    let mut out = Vec::new();

    for (idx, account) in engine.accounts.iter().enumerate() {
        if account.is_zeroed() || account.kind == AccountKind::Lp {
            continue;
        }
        out.push(score_account(account, idx, params, mark_price_e6, now_slot)?);
    }

    Ok(out)
}

fn score_account(
    account: &Account,
    idx: usize,
    params: &percolator::RiskParams,
    mark_price_e6: u64,
    now_slot: u64,
) -> Result<UserHealth> {
    let unrealized = margin::unrealized_pnl(account.position_size.get(), mark_price_e6, account.entry_price)
        .map_err(|e| anyhow!("unrealized_pnl: {e}"))?;
    let equity = margin::effective_equity(
        account.capital.get(),
        account.pnl_reserved.get(),
        unrealized,
        account.pnl_realized.get(),
    )
    .map_err(|e| anyhow!("effective_equity: {e}"))?;

    let notional = margin::notional(account.position_size.get(), mark_price_e6)
        .map_err(|e| anyhow!("notional: {e}"))?;
    let mm = margin::maintenance_margin(notional, params).map_err(|e| anyhow!("maintenance_margin: {e}"))?;

    let mm_i128: i128 = mm.try_into().map_err(|_| anyhow!("maintenance margin overflowed i128"))?;

    Ok(UserHealth {
        user: Pubkey::new_from_array(account.owner),
        account_idx: idx,
        health: equity - mm_i128,
        equity,
        mm,
        last_update: now_slot,
    })
}
