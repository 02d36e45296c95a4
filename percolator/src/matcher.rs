//! External-matcher boundary (spec.md §4.9). Trades never cross an
//! in-slab orderbook: the slab invokes the LP's registered
//! `matcher_program` (a CPI boundary on-chain; a plain trait object
//! off-chain/in tests) and only trusts the `TradeExecution` it returns
//! after checking it against the oracle-derived bounds.

use crate::error::RiskError;

/// Two-leg execution reported by an LP's matcher for one trade request.
/// `fill_price_e6` must be within the caller-supplied oracle band or
/// `execute_trade` rejects the whole op (spec.md §4.9 step 4).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TradeExecution {
    pub fill_size: i128,
    pub fill_price_e6: u64,
}

/// Implemented by whatever stands in for an LP's external matcher.
/// On-chain this boundary is a CPI into `matcher_program` with
/// `matcher_context` as a seed/account hint; off-chain and in tests it
/// is an in-process object, named `P90kMatcher` style in the teacher's
/// proofs to mean "matcher willing to fill at up to 90k units".
pub trait MatchingEngine {
    /// `lp_account_id` identifies which LP record on this slab is
    /// quoting; `oracle_price` is the gated Q6 mark the slab computed
    /// for this op, passed through so the matcher can quote relative to
    /// it. Returning `Err` aborts the trade with no state change.
    fn execute_match(
        &self,
        lp_program: &[u8; 32],
        lp_context: &[u8; 32],
        lp_account_id: u64,
        oracle_price: u64,
        size: i128,
    ) -> Result<TradeExecution, RiskError>;
}

/// A matcher that always fills the full requested size at the given
/// oracle price — used by tests and proofs that don't care about
/// matcher-side slippage, mirroring the teacher's `P90kMatcher` fixture.
#[derive(Copy, Clone, Debug, Default)]
pub struct FixedPriceMatcher;

impl MatchingEngine for FixedPriceMatcher {
    fn execute_match(
        &self,
        _lp_program: &[u8; 32],
        _lp_context: &[u8; 32],
        _lp_account_id: u64,
        oracle_price: u64,
        size: i128,
    ) -> Result<TradeExecution, RiskError> {
        if oracle_price == 0 {
            return Err(RiskError::OraclePriceInvalid);
        }
        Ok(TradeExecution {
            fill_size: size,
            fill_price_e6: oracle_price,
        })
    }
}

/// A matcher that always refuses — used to exercise the
/// `InvalidMatchingEngine` rejection path.
#[derive(Copy, Clone, Debug, Default)]
pub struct RefusingMatcher;

impl MatchingEngine for RefusingMatcher {
    fn execute_match(
        &self,
        _lp_program: &[u8; 32],
        _lp_context: &[u8; 32],
        _lp_account_id: u64,
        _oracle_price: u64,
        _size: i128,
    ) -> Result<TradeExecution, RiskError> {
        Err(RiskError::InvalidMatchingEngine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_price_matcher_fills_full_size() {
        let m = FixedPriceMatcher;
        let exec = m
            .execute_match(&[0; 32], &[0; 32], 0, 100_000_000, 5)
            .unwrap();
        assert_eq!(exec.fill_size, 5);
        assert_eq!(exec.fill_price_e6, 100_000_000);
    }

    #[test]
    fn refusing_matcher_errors() {
        let m = RefusingMatcher;
        let err = m.execute_match(&[0; 32], &[0; 32], 0, 1, 1).unwrap_err();
        assert_eq!(err, RiskError::InvalidMatchingEngine);
    }
}
