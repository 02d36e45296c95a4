//! Compile-time layout constants. Unlike the sibling forks that prefix
//! the slab with a separate header/config byte region ahead of the
//! engine, our `RiskEngine` already carries its header and market
//! config as the first two fields of one flat `#[repr(C)]` struct — so
//! the account buffer *is* `size_of::<RiskEngine>()` bytes, no offset
//! arithmetic needed.

use core::mem::{align_of, size_of};
use percolator::RiskEngine;
use percolator::constants::{SLAB_MAGIC, SLAB_VERSION};

pub const MAGIC: u64 = SLAB_MAGIC;
pub const VERSION: u32 = SLAB_VERSION;

pub const ENGINE_LEN: usize = size_of::<RiskEngine>();
pub const ENGINE_ALIGN: usize = align_of::<RiskEngine>();
pub const SLAB_LEN: usize = ENGINE_LEN;

pub const VAULT_SEED: &[u8] = b"vault";
