//! Pyth account byte parsing (spec.md §4.4 step 2). Parsed by hand at
//! fixed offsets rather than through `pyth-sdk-solana` — the core only
//! needs four fields out of a pull-oracle price account, and depending
//! on the SDK's full account struct would drag its own version of
//! Borsh/bytemuck into the build for four field reads.
//!
//! Layout (Pyth v2 `Price` account): `expo` at [20..24), `price` at
//! [176..184), `conf` at [184..192), `publish_time` (unix seconds) at
//! [200..208) — the core's staleness gate (`percolator::oracle::read_oracle`)
//! compares this against wall-clock `now`, not against a slot.

use solana_program::account_info::AccountInfo;
use solana_program::program_error::ProgramError;

use percolator::OracleInput;

const MIN_PRICE_ACCOUNT_LEN: usize = 208;

/// Parses a pull-oracle (Pyth) price account into the core's
/// already-abstracted `OracleInput`, leaving staleness/confidence
/// policy to `percolator::oracle::read_oracle`.
pub fn parse_pull_oracle(price_ai: &AccountInfo) -> Result<OracleInput, ProgramError> {
    let data = price_ai.try_borrow_data()?;
    if data.len() < MIN_PRICE_ACCOUNT_LEN {
        return Err(ProgramError::InvalidAccountData);
    }

    let expo = i32::from_le_bytes(data[20..24].try_into().unwrap());
    let price = i64::from_le_bytes(data[176..184].try_into().unwrap());
    let conf = u64::from_le_bytes(data[184..192].try_into().unwrap());
    let publish_time = i64::from_le_bytes(data[200..208].try_into().unwrap());

    Ok(OracleInput {
        price,
        expo,
        conf,
        publish_time,
    })
}
