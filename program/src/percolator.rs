//! On-chain wrapper around the `percolator` risk engine (spec.md §6).
//!
//! The slab account's byte buffer *is* a `percolator::RiskEngine` —
//! `slab_view` casts it directly rather than encoding/decoding through
//! an intermediate representation. Every instruction handler lives in
//! `processor`; this module is wiring: the entrypoint, the module
//! tree, and the mainnet/devnet feature guards.

#![no_std]
#![cfg_attr(not(feature = "no-entrypoint"), allow(unused_imports))]

extern crate alloc;

#[cfg(all(feature = "mainnet", feature = "devnet"))]
compile_error!("mainnet and devnet features are mutually exclusive");

#[cfg(all(feature = "mainnet", feature = "unsafe_close"))]
compile_error!("unsafe_close must never be built into a mainnet binary");

pub mod accounts;
pub mod constants;
pub mod error;
pub mod ix;
pub mod matcher_cpi;
pub mod oracle_parse;
pub mod processor;
pub mod slab_view;
pub mod vault;

#[cfg(not(feature = "no-entrypoint"))]
solana_program::entrypoint!(entry);

#[cfg(not(feature = "no-entrypoint"))]
fn entry(
    program_id: &solana_program::pubkey::Pubkey,
    accounts: &[solana_program::account_info::AccountInfo],
    instruction_data: &[u8],
) -> solana_program::entrypoint::ProgramResult {
    processor::process_instruction(program_id, accounts, instruction_data)
}

#[cfg(not(any(feature = "test", feature = "small", feature = "medium")))]
const _: () = {
    // Default build: percolator's default MAX_ACCOUNTS (4096, ~10.8 SOL rent).
    // Pick `test`/`small`/`medium` for a cheaper devnet slab.
};
