//! Collateral custody (spec.md §4.6): every deposit/withdraw is a real
//! spl-token CPI against the slab's vault ATA, whose authority is the
//! `["vault", slab_key]` PDA this program derives and signs for.

use solana_program::account_info::AccountInfo;
use solana_program::program::{invoke, invoke_signed};
use solana_program::program_error::ProgramError;

pub fn deposit<'a>(
    token_program: &AccountInfo<'a>,
    source: &AccountInfo<'a>,
    dest: &AccountInfo<'a>,
    authority: &AccountInfo<'a>,
    amount: u64,
) -> Result<(), ProgramError> {
    let ix = spl_token::instruction::transfer(
        token_program.key,
        source.key,
        dest.key,
        authority.key,
        &[],
        amount,
    )?;
    invoke(&ix, &[source.clone(), dest.clone(), authority.clone(), token_program.clone()])
}

/// `signer_seeds` is the vault-authority PDA's own seeds — the core
/// never holds a real keypair for it.
pub fn withdraw<'a>(
    token_program: &AccountInfo<'a>,
    source: &AccountInfo<'a>,
    dest: &AccountInfo<'a>,
    authority: &AccountInfo<'a>,
    amount: u64,
    signer_seeds: &[&[&[u8]]],
) -> Result<(), ProgramError> {
    let ix = spl_token::instruction::transfer(
        token_program.key,
        source.key,
        dest.key,
        authority.key,
        &[],
        amount,
    )?;
    invoke_signed(
        &ix,
        &[source.clone(), dest.clone(), authority.clone(), token_program.clone()],
        signer_seeds,
    )
}

pub fn verify_vault_ata(
    vault_ai: &AccountInfo,
    expected_pubkey: &solana_program::pubkey::Pubkey,
    expected_owner: &solana_program::pubkey::Pubkey,
    expected_mint: &solana_program::pubkey::Pubkey,
) -> Result<(), ProgramError> {
    use solana_program::program_pack::Pack;

    if vault_ai.key != expected_pubkey {
        return Err(crate::error::WrapperError::InvalidVaultAta.into());
    }
    if vault_ai.owner != &spl_token::ID {
        return Err(crate::error::WrapperError::InvalidVaultAta.into());
    }
    if vault_ai.data_len() != spl_token::state::Account::LEN {
        return Err(crate::error::WrapperError::InvalidVaultAta.into());
    }
    let data = vault_ai.try_borrow_data()?;
    let tok = spl_token::state::Account::unpack(&data)?;
    if tok.mint != *expected_mint {
        return Err(crate::error::WrapperError::InvalidMint.into());
    }
    if tok.owner != *expected_owner {
        return Err(crate::error::WrapperError::InvalidVaultAta.into());
    }
    Ok(())
}
