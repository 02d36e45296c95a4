//! Instruction builders for the two tags these scenario tests drive.
//!
//! `InitMarket`'s payload bytes come straight from
//! `percolator_prog::ix::encode_init_market`; `InitUser` has no public
//! encoder upstream (it's a single tag byte plus one `u64`) so it's
//! built inline. Account order matches `program/src/processor.rs`'s
//! handler account lists exactly.

use percolator::{FundingConfig, RiskParams, U128};
use percolator_prog::ix::encode_init_market;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

pub fn scenario_risk_params(max_accounts: u64, initial_margin_bps: u64, maintenance_margin_bps: u64) -> RiskParams {
    RiskParams {
        warmup_period_slots: 150,
        maintenance_margin_bps,
        initial_margin_bps,
        trading_fee_bps: 10,
        max_accounts,
        new_account_fee: U128::new(0),
        risk_reduction_threshold: U128::new(0),
        maintenance_fee_per_slot: U128::new(0),
        max_crank_staleness_slots: 1500,
        liquidation_fee_bps: 50,
        liquidation_fee_cap: U128::new(1_000_000_000),
        liquidation_buffer_bps: 100,
        min_liquidation_abs: U128::new(0),
        funding: FundingConfig {
            horizon_slots: 3000,
            k_bps: 10,
            scale_notional: 1_000_000_000_000,
            max_premium_bps: 500,
            max_bps_per_slot: 5,
        },
    }
}

#[allow(clippy::too_many_arguments)]
pub fn init_market(
    program_id: &Pubkey,
    admin: &Pubkey,
    slab: &Pubkey,
    mint: &Pubkey,
    vault: &Pubkey,
    token_program: &Pubkey,
    feed_id: &Pubkey,
    max_staleness_secs: u64,
    conf_filter_bps: u16,
    invert: u8,
    unit_scale: u32,
    risk_params: &RiskParams,
) -> Instruction {
    let data = encode_init_market(
        *admin,
        *mint,
        *feed_id,
        max_staleness_secs,
        conf_filter_bps,
        invert,
        unit_scale,
        risk_params,
    );

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*admin, true),
            AccountMeta::new(*slab, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new(*vault, false),
            AccountMeta::new_readonly(*token_program, false),
        ],
        data,
    }
}

pub fn init_user(
    program_id: &Pubkey,
    user: &Pubkey,
    slab: &Pubkey,
    user_ata: &Pubkey,
    vault: &Pubkey,
    token_program: &Pubkey,
    fee_payment: u64,
) -> Instruction {
    let mut data = vec![1u8];
    data.extend_from_slice(&fee_payment.to_le_bytes());

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*user, true),
            AccountMeta::new(*slab, false),
            AccountMeta::new(*user_ata, false),
            AccountMeta::new(*vault, false),
            AccountMeta::new_readonly(*token_program, false),
        ],
        data,
    }
}
