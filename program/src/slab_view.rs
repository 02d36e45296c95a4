//! Zero-copy view onto the slab account's byte buffer.
//!
//! `RiskEngine` can't be handed to `bytemuck::from_bytes_mut` — it
//! carries `bool` fields and `#[repr(u8)]` enums (`AccountKind`,
//! `FeedKind`), and `Pod` can't vouch for every bit pattern of those
//! being valid. Instead this casts the raw pointer directly, the same
//! way the sibling forks' `zc` module treats their own engine region:
//! the slab account's data length and alignment are checked once per
//! call, and `RiskEngine` is `#[repr(C)]` with a stable field order, so
//! the cast is sound as long as `InitMarket` is the only writer that
//! ever produces the bytes a later call reads back.

use solana_program::program_error::ProgramError;

use crate::constants::{ENGINE_ALIGN, ENGINE_LEN};
use percolator::RiskEngine;

#[inline]
fn check_len_and_align(data: &[u8]) -> Result<(), ProgramError> {
    if data.len() != ENGINE_LEN {
        return Err(ProgramError::InvalidAccountData);
    }
    if (data.as_ptr() as usize) % ENGINE_ALIGN != 0 {
        return Err(ProgramError::InvalidAccountData);
    }
    Ok(())
}

pub fn engine_ref(data: &[u8]) -> Result<&RiskEngine, ProgramError> {
    check_len_and_align(data)?;
    Ok(unsafe { &*(data.as_ptr() as *const RiskEngine) })
}

pub fn engine_mut(data: &mut [u8]) -> Result<&mut RiskEngine, ProgramError> {
    check_len_and_align(data)?;
    Ok(unsafe { &mut *(data.as_mut_ptr() as *mut RiskEngine) })
}
