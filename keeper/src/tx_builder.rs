//! Builds the two instructions this keeper ever submits — `KeeperCrank`
//! (tag 5) and `LiquidateAtOracle` (tag 7) — against the exact account
//! order and payload layout `program/src/ix.rs` decodes (one-byte tag,
//! little-endian fields, no Borsh).

use anyhow::Result;
use solana_sdk::{
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
    transaction::Transaction,
};

const TAG_KEEPER_CRANK: u8 = 5;
const TAG_LIQUIDATE_AT_ORACLE: u8 = 7;

/// Accounts: [caller (signer), slab (writable), oracle].
pub fn build_keeper_crank_instruction(
    program_id: &Pubkey,
    caller: &Pubkey,
    slab: &Pubkey,
    oracle: &Pubkey,
    caller_idx: u16,
    allow_panic: bool,
) -> Instruction {
    let mut data = Vec::with_capacity(4);
    data.push(TAG_KEEPER_CRANK);
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

/// Accounts: [liquidator (signer), slab (writable), oracle].
pub fn build_liquidate_at_oracle_instruction(
    program_id: &Pubkey,
    liquidator: &Pubkey,
    slab: &Pubkey,
    oracle: &Pubkey,
    target_idx: u16,
) -> Instruction {
    let mut data = Vec::with_capacity(3);
    data.push(TAG_LIQUIDATE_AT_ORACLE);
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

pub fn build_liquidation_transaction(
    program_id: &Pubkey,
    slab: &Pubkey,
    oracle: &Pubkey,
    liquidator: &Keypair,
    target_idx: u16,
    recent_blockhash: Hash,
) -> Result<Transaction> {
    let instruction = build_liquidate_at_oracle_instruction(
        program_id,
        &liquidator.pubkey(),
        slab,
        oracle,
        target_idx,
    );

    Ok(Transaction::new_signed_with_payer(
        &[instruction],
        Some(&liquidator.pubkey()),
        &[liquidator],
        recent_blockhash,
    ))
}

pub fn build_crank_transaction(
    program_id: &Pubkey,
    slab: &Pubkey,
    oracle: &Pubkey,
    caller: &Keypair,
    caller_idx: u16,
    allow_panic: bool,
    recent_blockhash: Hash,
) -> Result<Transaction> {
    let instruction = build_keeper_crank_instruction(
        program_id,
        &caller.pubkey(),
        slab,
        oracle,
        caller_idx,
        allow_panic,
    );

    Ok(Transaction::new_signed_with_payer(
        &[instruction],
        Some(&caller.pubkey()),
        &[caller],
        recent_blockhash,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liquidate_instruction_layout() {
        let program_id = Pubkey::new_unique();
        let liquidator = Pubkey::new_unique();
        let slab = Pubkey::new_unique();
        let oracle = Pubkey::new_unique();

        let ix = build_liquidate_at_oracle_instruction(&program_id, &liquidator, &slab, &oracle, 7);

        assert_eq!(ix.program_id, program_id);
        assert_eq!(ix.data[0], TAG_LIQUIDATE_AT_ORACLE);
        assert_eq!(u16::from_le_bytes([ix.data[1], ix.data[2]]), 7);
        assert_eq!(ix.data.len(), 3);
        assert_eq!(ix.accounts.len(), 3);
        assert!(ix.accounts[0].is_signer);
        assert!(ix.accounts[1].is_writable);
    }

    #[test]
    fn crank_instruction_layout() {
        let program_id = Pubkey::new_unique();
        let caller = Pubkey::new_unique();
        let slab = Pubkey::new_unique();
        let oracle = Pubkey::new_unique();

        let ix = build_keeper_crank_instruction(&program_id, &caller, &slab, &oracle, 0xFFFF, true);

        assert_eq!(ix.data[0], TAG_KEEPER_CRANK);
        assert_eq!(u16::from_le_bytes([ix.data[1], ix.data[2]]), 0xFFFF);
        assert_eq!(ix.data[3], 1);
        assert_eq!(ix.data.len(), 4);
    }
}
