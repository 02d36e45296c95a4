//! Instruction decoder (spec.md §6 "Operation taxonomy"): packed
//! little-endian payloads behind a one-byte tag, decoded by hand
//! rather than through Borsh — the whole point of a fixed slab format
//! is that nothing on this boundary needs a schema.

use alloc::vec::Vec;

use solana_program::program_error::ProgramError;
use solana_program::pubkey::Pubkey;

use percolator::slab::{FundingConfig, RiskParams};
use percolator::U128;

#[derive(Debug)]
pub enum Instruction {
    InitMarket {
        admin: Pubkey,
        mint: Pubkey,
        feed_id: Pubkey,
        max_staleness_secs: u64,
        conf_filter_bps: u16,
        invert: u8,
        unit_scale: u32,
        risk_params: RiskParams,
    },
    InitUser {
        fee_payment: u64,
    },
    InitLp {
        matcher_program: Pubkey,
        matcher_context: Pubkey,
        fee_payment: u64,
    },
    DepositCollateral {
        user_idx: u16,
        amount: u64,
    },
    WithdrawCollateral {
        user_idx: u16,
        amount: u64,
    },
    KeeperCrank {
        caller_idx: u16,
        allow_panic: u8,
    },
    TradeNoCpi {
        lp_idx: u16,
        user_idx: u16,
        size: i128,
    },
    LiquidateAtOracle {
        target_idx: u16,
    },
    CloseAccount {
        user_idx: u16,
    },
    TopUpInsurance {
        amount: u64,
    },
    TradeCpi {
        lp_idx: u16,
        user_idx: u16,
        size: i128,
    },
    SetRiskThreshold {
        new: u128,
    },
    UpdateAdmin {
        new_admin: Pubkey,
    },
    CloseSlab,
}

impl Instruction {
    pub fn decode(input: &[u8]) -> Result<Self, ProgramError> {
        let (&tag, mut rest) = input
            .split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;

        let ix = match tag {
            0 => Instruction::InitMarket {
                admin: read_pubkey(&mut rest)?,
                mint: read_pubkey(&mut rest)?,
                feed_id: read_pubkey(&mut rest)?,
                max_staleness_secs: read_u64(&mut rest)?,
                conf_filter_bps: read_u16(&mut rest)?,
                invert: read_u8(&mut rest)?,
                unit_scale: read_u32(&mut rest)?,
                risk_params: read_risk_params(&mut rest)?,
            },
            1 => Instruction::InitUser {
                fee_payment: read_u64(&mut rest)?,
            },
            2 => Instruction::InitLp {
                matcher_program: read_pubkey(&mut rest)?,
                matcher_context: read_pubkey(&mut rest)?,
                fee_payment: read_u64(&mut rest)?,
            },
            3 => Instruction::DepositCollateral {
                user_idx: read_u16(&mut rest)?,
                amount: read_u64(&mut rest)?,
            },
            4 => Instruction::WithdrawCollateral {
                user_idx: read_u16(&mut rest)?,
                amount: read_u64(&mut rest)?,
            },
            5 => Instruction::KeeperCrank {
                caller_idx: read_u16(&mut rest)?,
                allow_panic: read_u8(&mut rest)?,
            },
            6 => Instruction::TradeNoCpi {
                lp_idx: read_u16(&mut rest)?,
                user_idx: read_u16(&mut rest)?,
                size: read_i128(&mut rest)?,
            },
            7 => Instruction::LiquidateAtOracle {
                target_idx: read_u16(&mut rest)?,
            },
            8 => Instruction::CloseAccount {
                user_idx: read_u16(&mut rest)?,
            },
            9 => Instruction::TopUpInsurance {
                amount: read_u64(&mut rest)?,
            },
            10 => Instruction::TradeCpi {
                lp_idx: read_u16(&mut rest)?,
                user_idx: read_u16(&mut rest)?,
                size: read_i128(&mut rest)?,
            },
            11 => Instruction::SetRiskThreshold {
                new: read_u128(&mut rest)?,
            },
            12 => Instruction::UpdateAdmin {
                new_admin: read_pubkey(&mut rest)?,
            },
            13 => Instruction::CloseSlab,
            _ => return Err(ProgramError::InvalidInstructionData),
        };
        Ok(ix)
    }
}

/// Builds `InitMarket`'s payload bytes for a client — the decode side
/// above is the only side the on-chain program needs, but a wrapper
/// without this would force every caller to hand-roll the layout.
pub fn encode_init_market(
    admin: Pubkey,
    mint: Pubkey,
    feed_id: Pubkey,
    max_staleness_secs: u64,
    conf_filter_bps: u16,
    invert: u8,
    unit_scale: u32,
    risk_params: &RiskParams,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + 32 * 3 + 8 + 2 + 1 + 4 + risk_params_len());
    out.push(0);
    out.extend_from_slice(admin.as_ref());
    out.extend_from_slice(mint.as_ref());
    out.extend_from_slice(feed_id.as_ref());
    out.extend_from_slice(&max_staleness_secs.to_le_bytes());
    out.extend_from_slice(&conf_filter_bps.to_le_bytes());
    out.push(invert);
    out.extend_from_slice(&unit_scale.to_le_bytes());
    write_risk_params(&mut out, risk_params);
    out
}

fn risk_params_len() -> usize {
    8 * 5 + 16 * 4 + 8 * 2 + 16 + 8 + 8 + 16 + 8 * 3 + 16
}

fn read_u8(input: &mut &[u8]) -> Result<u8, ProgramError> {
    let (&val, rest) = input
        .split_first()
        .ok_or(ProgramError::InvalidInstructionData)?;
    *input = rest;
    Ok(val)
}

fn read_u16(input: &mut &[u8]) -> Result<u16, ProgramError> {
    if input.len() < 2 {
        return Err(ProgramError::InvalidInstructionData);
    }
    let (bytes, rest) = input.split_at(2);
    *input = rest;
    Ok(u16::from_le_bytes(bytes.try_into().unwrap()))
}

fn read_u32(input: &mut &[u8]) -> Result<u32, ProgramError> {
    if input.len() < 4 {
        return Err(ProgramError::InvalidInstructionData);
    }
    let (bytes, rest) = input.split_at(4);
    *input = rest;
    Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
}

fn read_u64(input: &mut &[u8]) -> Result<u64, ProgramError> {
    if input.len() < 8 {
        return Err(ProgramError::InvalidInstructionData);
    }
    let (bytes, rest) = input.split_at(8);
    *input = rest;
    Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
}

fn read_i64(input: &mut &[u8]) -> Result<i64, ProgramError> {
    if input.len() < 8 {
        return Err(ProgramError::InvalidInstructionData);
    }
    let (bytes, rest) = input.split_at(8);
    *input = rest;
    Ok(i64::from_le_bytes(bytes.try_into().unwrap()))
}

fn read_i128(input: &mut &[u8]) -> Result<i128, ProgramError> {
    if input.len() < 16 {
        return Err(ProgramError::InvalidInstructionData);
    }
    let (bytes, rest) = input.split_at(16);
    *input = rest;
    Ok(i128::from_le_bytes(bytes.try_into().unwrap()))
}

fn read_u128(input: &mut &[u8]) -> Result<u128, ProgramError> {
    if input.len() < 16 {
        return Err(ProgramError::InvalidInstructionData);
    }
    let (bytes, rest) = input.split_at(16);
    *input = rest;
    Ok(u128::from_le_bytes(bytes.try_into().unwrap()))
}

fn read_pubkey(input: &mut &[u8]) -> Result<Pubkey, ProgramError> {
    if input.len() < 32 {
        return Err(ProgramError::InvalidInstructionData);
    }
    let (bytes, rest) = input.split_at(32);
    *input = rest;
    Ok(Pubkey::new_from_array(bytes.try_into().unwrap()))
}

fn read_funding_config(input: &mut &[u8]) -> Result<FundingConfig, ProgramError> {
    Ok(FundingConfig {
        horizon_slots: read_u64(input)?,
        k_bps: read_i64(input)?,
        scale_notional: read_u128(input)?,
        max_premium_bps: read_i64(input)?,
        max_bps_per_slot: read_i64(input)?,
    })
}

fn read_risk_params(input: &mut &[u8]) -> Result<RiskParams, ProgramError> {
    Ok(RiskParams {
        warmup_period_slots: read_u64(input)?,
        maintenance_margin_bps: read_u64(input)?,
        initial_margin_bps: read_u64(input)?,
        trading_fee_bps: read_u64(input)?,
        max_accounts: read_u64(input)?,
        new_account_fee: U128::new(read_u128(input)?),
        risk_reduction_threshold: U128::new(read_u128(input)?),
        maintenance_fee_per_slot: U128::new(read_u128(input)?),
        max_crank_staleness_slots: read_u64(input)?,
        liquidation_fee_bps: read_u64(input)?,
        liquidation_fee_cap: U128::new(read_u128(input)?),
        liquidation_buffer_bps: read_u64(input)?,
        min_liquidation_abs: U128::new(read_u128(input)?),
        funding: read_funding_config(input)?,
    })
}

fn write_risk_params(out: &mut Vec<u8>, p: &RiskParams) {
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

