//! Builds raw instruction bytes for every tag in `program/src/ix.rs`'s
//! decoder (spec.md §6 "Operation taxonomy") — one-byte tag, packed
//! little-endian payload, no Borsh. Account orders below mirror
//! `program/src/processor.rs`'s per-instruction account lists exactly.

use percolator::{FundingConfig, RiskParams};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

fn push_risk_params(out: &mut Vec<u8>, p: &RiskParams) {
    out.extend_from_slice(&p.warmup_period_slots.to_le_bytes());
    out.extend_from_slice(&p.maintenance_margin_bps.to_le_bytes());
    out.extend_from_slice(&p.initial_margin_bps.to_le_bytes());
    out.extend_from_slice(&p.trading_fee_bps.to_le_bytes());
    out.extend_from_slice(&p.max_accounts.to_le_bytes());
    out.extend_from_slice(&p.new_account_fee.get().to_le_bytes());
    out.extend_from_slice(&p.risk_reduction_threshold.get().to_le_bytes());
    out.extend_from_slice(&p.maintenance_fee_per_slot.get().to_le_bytes());
    out.extend_from_slice(&p.max_crank_staleness_slots.to_le_bytes());
    out.extend_from_slice(&p.liquidation_fee_bps.to_le_bytes());
    out.extend_from_slice(&p.liquidation_fee_cap.get().to_le_bytes());
    out.extend_from_slice(&p.liquidation_buffer_bps.to_le_bytes());
    out.extend_from_slice(&p.min_liquidation_abs.get().to_le_bytes());
    out.extend_from_slice(&p.funding.horizon_slots.to_le_bytes());
    out.extend_from_slice(&p.funding.k_bps.to_le_bytes());
    out.extend_from_slice(&p.funding.scale_notional.to_le_bytes());
    out.extend_from_slice(&p.funding.max_premium_bps.to_le_bytes());
    out.extend_from_slice(&p.funding.max_bps_per_slot.to_le_bytes());
}

/// Default risk parameters for a freshly initialized market — sane
/// devnet defaults an operator can override field-by-field later via
/// `SetRiskThreshold`.
pub fn default_risk_params() -> RiskParams {
    RiskParams {
        warmup_period_slots: 150,
        maintenance_margin_bps: 300,
        initial_margin_bps: 500,
        trading_fee_bps: 10,
        max_accounts: percolator::MAX_ACCOUNTS as u64,
        new_account_fee: percolator::U128::new(0),
        risk_reduction_threshold: percolator::U128::new(0),
        maintenance_fee_per_slot: percolator::U128::new(0),
        max_crank_staleness_slots: 1500,
        liquidation_fee_bps: 50,
        liquidation_fee_cap: percolator::U128::new(1_000_000_000),
        liquidation_buffer_bps: 100,
        min_liquidation_abs: percolator::U128::new(0),
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
    let mut data = vec![0u8];
    data.extend_from_slice(admin.as_ref());
    data.extend_from_slice(mint.as_ref());
    data.extend_from_slice(feed_id.as_ref());
    data.extend_from_slice(&max_staleness_secs.to_le_bytes());
    data.extend_from_slice(&conf_filter_bps.to_le_bytes());
    data.push(invert);
    data.extend_from_slice(&unit_scale.to_le_bytes());
    push_risk_params(&mut data, risk_params);

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

#[allow(clippy::too_many_arguments)]
pub fn init_lp(
    program_id: &Pubkey,
    user: &Pubkey,
    slab: &Pubkey,
    user_ata: &Pubkey,
    vault: &Pubkey,
    token_program: &Pubkey,
    matcher_program: &Pubkey,
    matcher_context: &Pubkey,
    fee_payment: u64,
) -> Instruction {
    let mut data = vec![2u8];
    data.extend_from_slice(matcher_program.as_ref());
    data.extend_from_slice(matcher_context.as_ref());
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

#[allow(clippy::too_many_arguments)]
pub fn deposit_collateral(
    program_id: &Pubkey,
    user: &Pubkey,
    slab: &Pubkey,
    user_ata: &Pubkey,
    vault: &Pubkey,
    token_program: &Pubkey,
    user_idx: u16,
    amount: u64,
) -> Instruction {
    let mut data = vec![3u8];
    data.extend_from_slice(&user_idx.to_le_bytes());
    data.extend_from_slice(&amount.to_le_bytes());

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

#[allow(clippy::too_many_arguments)]
pub fn withdraw_collateral(
    program_id: &Pubkey,
    user: &Pubkey,
    slab: &Pubkey,
    vault: &Pubkey,
    user_ata: &Pubkey,
    vault_authority: &Pubkey,
    token_program: &Pubkey,
    oracle: &Pubkey,
    user_idx: u16,
    amount: u64,
) -> Instruction {
    let mut data = vec![4u8];
    data.extend_from_slice(&user_idx.to_le_bytes());
    data.extend_from_slice(&amount.to_le_bytes());

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*user, true),
            AccountMeta::new(*slab, false),
            AccountMeta::new(*vault, false),
            AccountMeta::new(*user_ata, false),
            AccountMeta::new_readonly(*vault_authority, false),
            AccountMeta::new_readonly(*token_program, false),
            AccountMeta::new_readonly(*oracle, false),
        ],
        data,
    }
}

pub fn keeper_crank(
    program_id: &Pubkey,
    caller: &Pubkey,
    slab: &Pubkey,
    oracle: &Pubkey,
    caller_idx: u16,
    allow_panic: bool,
) -> Instruction {
    let mut data = vec![5u8];
    data.extend_from_slice(&caller_idx.to_le_bytes());
    data.push(if allow_panic { 1 } else { 0 });

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*caller, true),
            AccountMeta::new(*slab, false),
            AccountMeta::new_readonly(*oracle, false),
        ],
        data,
    }
}

pub fn trade_no_cpi(
    program_id: &Pubkey,
    user: &Pubkey,
    slab: &Pubkey,
    oracle: &Pubkey,
    lp_idx: u16,
    user_idx: u16,
    size: i128,
) -> Instruction {
    let mut data = vec![6u8];
    data.extend_from_slice(&lp_idx.to_le_bytes());
    data.extend_from_slice(&user_idx.to_le_bytes());
    data.extend_from_slice(&size.to_le_bytes());

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*user, true),
            AccountMeta::new(*slab, false),
            AccountMeta::new_readonly(*oracle, false),
        ],
        data,
    }
}

pub fn liquidate_at_oracle(
    program_id: &Pubkey,
    liquidator: &Pubkey,
    slab: &Pubkey,
    oracle: &Pubkey,
    target_idx: u16,
) -> Instruction {
    let mut data = vec![7u8];
    data.extend_from_slice(&target_idx.to_le_bytes());

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*liquidator, true),
            AccountMeta::new(*slab, false),
            AccountMeta::new_readonly(*oracle, false),
        ],
        data,
    }
}

pub fn close_account(program_id: &Pubkey, user: &Pubkey, slab: &Pubkey, user_idx: u16) -> Instruction {
    let mut data = vec![8u8];
    data.extend_from_slice(&user_idx.to_le_bytes());

    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(*user, true), AccountMeta::new(*slab, false)],
        data,
    }
}

pub fn top_up_insurance(
    program_id: &Pubkey,
    payer: &Pubkey,
    slab: &Pubkey,
    payer_ata: &Pubkey,
    vault: &Pubkey,
    token_program: &Pubkey,
    amount: u64,
) -> Instruction {
    let mut data = vec![9u8];
    data.extend_from_slice(&amount.to_le_bytes());

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*payer, true),
            AccountMeta::new(*slab, false),
            AccountMeta::new(*payer_ata, false),
            AccountMeta::new(*vault, false),
            AccountMeta::new_readonly(*token_program, false),
        ],
        data,
    }
}

#[allow(clippy::too_many_arguments)]
pub fn trade_cpi(
    program_id: &Pubkey,
    user: &Pubkey,
    slab: &Pubkey,
    oracle: &Pubkey,
    matcher_program: &Pubkey,
    lp_context: &Pubkey,
    lp_idx: u16,
    user_idx: u16,
    size: i128,
) -> Instruction {
    let mut data = vec![10u8];
    data.extend_from_slice(&lp_idx.to_le_bytes());
    data.extend_from_slice(&user_idx.to_le_bytes());
    data.extend_from_slice(&size.to_le_bytes());

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*user, true),
            AccountMeta::new(*slab, false),
            AccountMeta::new_readonly(*oracle, false),
            AccountMeta::new_readonly(*matcher_program, false),
            AccountMeta::new_readonly(*lp_context, false),
        ],
        data,
    }
}

pub fn set_risk_threshold(program_id: &Pubkey, admin: &Pubkey, slab: &Pubkey, new: u128) -> Instruction {
    let mut data = vec![11u8];
    data.extend_from_slice(&new.to_le_bytes());

    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(*admin, true), AccountMeta::new(*slab, false)],
        data,
    }
}

pub fn update_admin(program_id: &Pubkey, admin: &Pubkey, slab: &Pubkey, new_admin: &Pubkey) -> Instruction {
    let mut data = vec![12u8];
    data.extend_from_slice(new_admin.as_ref());

    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(*admin, true), AccountMeta::new(*slab, false)],
        data,
    }
}

pub fn close_slab(program_id: &Pubkey, admin: &Pubkey, slab: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(*admin, true), AccountMeta::new(*slab, false)],
        data: vec![13u8],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liquidate_at_oracle_layout() {
        let program_id = Pubkey::new_unique();
        let liquidator = Pubkey::new_unique();
        let slab = Pubkey::new_unique();
        let oracle = Pubkey::new_unique();

        let ix = liquidate_at_oracle(&program_id, &liquidator, &slab, &oracle, 42);
        assert_eq!(ix.data[0], 7);
        assert_eq!(u16::from_le_bytes([ix.data[1], ix.data[2]]), 42);
        assert_eq!(ix.accounts.len(), 3);
    }

    #[test]
    fn close_slab_has_no_payload() {
        let program_id = Pubkey::new_unique();
        let admin = Pubkey::new_unique();
        let slab = Pubkey::new_unique();

        let ix = close_slab(&program_id, &admin, &slab);
        assert_eq!(ix.data, vec![13u8]);
    }

    #[test]
    fn init_market_payload_len() {
        let program_id = Pubkey::new_unique();
        let admin = Pubkey::new_unique();
        let slab = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let vault = Pubkey::new_unique();
        let token_program = Pubkey::new_unique();
        let feed_id = Pubkey::new_unique();
        let params = default_risk_params();

        let ix = init_market(
            &program_id,
            &admin,
            &slab,
            &mint,
            &vault,
            &token_program,
            &feed_id,
            60,
            50,
            0,
            1,
            &params,
        );

        // tag(1) + admin(32) + mint(32) + feed_id(32) + staleness(8) + conf(2) + invert(1) + scale(4) + params(144)
        assert_eq!(ix.data.len(), 1 + 32 * 3 + 8 + 2 + 1 + 4 + 144);
    }
}
