//! Off-chain counterpart to `program/src/oracle_parse.rs` — same fixed
//! Pyth-account byte offsets, so the keeper's view of "is this price
//! stale/low-confidence" matches what `KeeperCrank`/`LiquidateAtOracle`
//! will actually gate on-chain.

use anyhow::{anyhow, Result};
use percolator::{slab::MarketConfig, OracleInput};

const MIN_PRICE_ACCOUNT_LEN: usize = 208;

pub fn parse_pull_oracle(data: &[u8]) -> Result<OracleInput> {
    if data.len() < MIN_PRICE_ACCOUNT_LEN {
        return Err(anyhow!("oracle account too short ({} bytes)", data.len()));
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

/// Mirrors `processor::gated_price_e6`, minus the authority-price
/// fallback (the keeper only ever crosses the pull-oracle side of the
/// gate — it has no standing to push an authority price).
pub fn gated_price_e6(market: &MarketConfig, oracle_data: &[u8], now: i64) -> Result<u64> {
    let feed = parse_pull_oracle(oracle_data)?;
    let gated = percolator::oracle::read_oracle(market, 0, 0, Some(feed), now)
        .map_err(|e| anyhow!("oracle gate rejected price: {e}"))?;
    u64::try_from(gated.price_e6).map_err(|_| anyhow!("gated price overflowed u64"))
}
