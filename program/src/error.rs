//! Wraps the core's `RiskError` plus wrapper-local failure modes into
//! `ProgramError::Custom`. `RiskError::code()` is already a stable
//! numeric ABI (percolator::error's own doc comment says as much), so
//! core errors pass straight through; wrapper errors are numbered past
//! the core's highest code (80) to keep the two spaces disjoint.

use solana_program::program_error::ProgramError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum WrapperError {
    NotInitialized = 100,
    AlreadyInitialized = 101,
    InvalidSlabLen = 102,
    ExpectedSigner = 103,
    ExpectedWritable = 104,
    InvalidVaultAta = 105,
    InvalidMint = 106,
    InvalidOracleAccount = 107,
    InvalidMatcherAccount = 108,
    MatcherReturnDataMissing = 109,
    MatcherReturnDataMalformed = 110,
    SlabNotEmpty = 111,
}

impl From<WrapperError> for ProgramError {
    fn from(e: WrapperError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

pub fn map_risk_error(e: percolator::RiskError) -> ProgramError {
    ProgramError::Custom(e.code())
}
