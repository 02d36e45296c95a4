//! Account-list validation helpers (spec.md §5 "shared-resource
//! policy") and the vault-authority PDA derivation.

use solana_program::account_info::AccountInfo;
use solana_program::program_error::ProgramError;
use solana_program::pubkey::Pubkey;

use crate::constants::VAULT_SEED;
use crate::error::WrapperError;

pub fn expect_len(accounts: &[AccountInfo], n: usize) -> Result<(), ProgramError> {
    if accounts.len() < n {
        return Err(ProgramError::NotEnoughAccountKeys);
    }
    Ok(())
}

pub fn expect_signer(ai: &AccountInfo) -> Result<(), ProgramError> {
    if !ai.is_signer {
        return Err(WrapperError::ExpectedSigner.into());
    }
    Ok(())
}

pub fn expect_writable(ai: &AccountInfo) -> Result<(), ProgramError> {
    if !ai.is_writable {
        return Err(WrapperError::ExpectedWritable.into());
    }
    Ok(())
}

pub fn expect_owner(ai: &AccountInfo, owner: &Pubkey) -> Result<(), ProgramError> {
    if ai.owner != owner {
        return Err(ProgramError::IllegalOwner);
    }
    Ok(())
}

pub fn expect_key(ai: &AccountInfo, expected: &Pubkey) -> Result<(), ProgramError> {
    if ai.key != expected {
        return Err(ProgramError::InvalidArgument);
    }
    Ok(())
}

/// `findProgramAddress(["vault", slab_key], program_id)` — the vault
/// ATA's authority. Every deposit/withdraw signs with this PDA via
/// `invoke_signed`, never with a real keypair.
pub fn derive_vault_authority(program_id: &Pubkey, slab_key: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_SEED, slab_key.as_ref()], program_id)
}
