//! Oracle gate (spec.md §4.4).
//!
//! The core crate does not know how to talk to Pyth or a push-oracle
//! account — that parsing lives in `percolator-prog::oracle_parse` (the
//! spec is explicit that the oracle implementation is out of scope,
//! §1 Non-goals). This module takes an already-parsed `OracleInput` and
//! applies the authority-override, staleness, confidence, inversion, and
//! unit-scale policy spec.md §4.4 describes.

use crate::constants::{E6, INVERT_NUMERATOR};
use crate::error::RiskError;
use crate::slab::MarketConfig;

/// A price reading already extracted from whichever account format the
/// host parsed (pull or push oracle) — see spec.md §4.4 step 2.
#[derive(Copy, Clone, Debug)]
pub struct OracleInput {
    /// Raw price, already sign-checked non-negative by the caller if the
    /// source format carries a sign; this gate still re-validates `> 0`.
    pub price: i64,
    /// Exponent such that the Q6 price is `price * 10^(expo + 6)`.
    pub expo: i32,
    pub conf: u64,
    pub publish_time: i64,
}

/// Output of the gate: a Q6 price plus the wall-clock timestamp backing
/// it (for the caller's own staleness bookkeeping elsewhere, e.g. the
/// crank's `max_crank_staleness_slots`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GatedPrice {
    pub price_e6: u128,
    pub timestamp_sec: i64,
}

/// Run the full gate: authority override, else feed parse + staleness +
/// confidence, then convert to Q6, invert, and unit-scale.
pub fn read_oracle(
    market: &MarketConfig,
    authority_price_e6: u64,
    authority_timestamp: i64,
    feed: Option<OracleInput>,
    now: i64,
) -> Result<GatedPrice, RiskError> {
    let price_e6 = if market.has_oracle_authority != 0
        && authority_price_e6 != 0
        && now.saturating_sub(authority_timestamp) <= market.max_staleness_secs as i64
    {
        authority_price_e6 as u128
    } else if market.has_oracle_authority != 0 && authority_price_e6 != 0 {
        // Authority is configured and has been pushed before, but the
        // pushed value has aged out — this is a hard stop, not a
        // silent fallback to the feed (spec.md §4.4 keeps the authority
        // path and the feed path mutually exclusive per read).
        return Err(RiskError::AuthorityPriceExpired);
    } else {
        let feed = feed.ok_or(RiskError::OracleUnavailable)?;
        gate_feed(market, feed, now)?
    };

    let price_e6 = apply_invert(market, price_e6)?;
    let price_e6 = apply_unit_scale(market, price_e6)?;

    Ok(GatedPrice {
        price_e6,
        timestamp_sec: now,
    })
}

fn gate_feed(market: &MarketConfig, feed: OracleInput, now: i64) -> Result<u128, RiskError> {
    if feed.price <= 0 {
        return Err(RiskError::OraclePriceInvalid);
    }
    let age = now.saturating_sub(feed.publish_time);
    if age > market.max_staleness_secs as i64 {
        return Err(RiskError::OracleStale);
    }

    let price_e6 = to_q6(feed.price as u128, feed.expo)?;

    // conf/price > conf_filter_bps -> reject. Evaluated in the feed's
    // native units to avoid re-deriving conf's own exponent scale.
    let conf_bps = (feed.conf as u128)
        .checked_mul(10_000)
        .ok_or(RiskError::ArithmeticOverflow)?
        .checked_div(feed.price as u128)
        .ok_or(RiskError::DivisionByZero)?;
    if conf_bps > market.conf_filter_bps as u128 {
        return Err(RiskError::ConfidenceTooWide);
    }

    Ok(price_e6)
}

/// Rescale a raw price with exponent `expo` into Q6 (`* 10^(expo + 6)`).
fn to_q6(raw: u128, expo: i32) -> Result<u128, RiskError> {
    let shift = expo + 6;
    if shift >= 0 {
        raw.checked_mul(10u128.pow(shift as u32))
            .ok_or(RiskError::ArithmeticOverflow)
    } else {
        raw.checked_div(10u128.pow((-shift) as u32))
            .ok_or(RiskError::DivisionByZero)
    }
}

fn apply_invert(market: &MarketConfig, price_e6: u128) -> Result<u128, RiskError> {
    if market.invert == 0 {
        return Ok(price_e6);
    }
    if price_e6 == 0 {
        return Err(RiskError::OraclePriceInvalid);
    }
    INVERT_NUMERATOR
        .checked_div(price_e6)
        .ok_or(RiskError::DivisionByZero)
}

fn apply_unit_scale(market: &MarketConfig, price_e6: u128) -> Result<u128, RiskError> {
    if market.unit_scale == 0 {
        return Ok(price_e6);
    }
    price_e6
        .checked_mul(market.unit_scale as u128)
        .and_then(|v| v.checked_div(E6))
        .ok_or(RiskError::ArithmeticOverflow)
}
