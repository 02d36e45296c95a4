//! Stable error taxonomy (spec.md §7). `no_std`, so no `thiserror` — the
//! `Display` impl is written by hand and never changes wording for a given
//! variant across versions; host-visible numeric codes come from
//! `RiskError::code`, consumed by `percolator-prog` to build
//! `ProgramError::Custom`.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum RiskError {
    // Invariant / integrity
    InvalidMagic = 0,
    UnsupportedVersion = 1,
    BitmapInconsistent = 2,
    DuplicateAccountId = 3,
    InvariantViolation = 4,

    // Auth
    NotAdmin = 10,
    NotOracleAuthority = 11,
    NotAccountOwner = 12,
    Reentrancy = 13,

    // Input
    InvalidIndex = 20,
    MarketFull = 21,
    DuplicateOwner = 22,
    ZeroSize = 23,
    InvalidFeedId = 24,
    SlabSizeMismatch = 25,

    // Arithmetic
    ArithmeticOverflow = 30,
    DivisionByZero = 31,

    // Market state
    StaleCrank = 40,
    RiskReductionOnly = 41,
    WarmupPaused = 42,
    InsufficientMargin = 43,
    InsufficientCapital = 44,
    InsufficientInsurance = 45,

    // Oracle
    OracleUnavailable = 50,
    OracleStale = 51,
    OraclePriceInvalid = 52,
    ConfidenceTooWide = 53,
    AuthorityPriceExpired = 54,

    // Matcher
    MatcherRejected = 60,
    MatcherContextInvalid = 61,
    MatcherReturnedBadPrice = 62,
    InvalidMatchingEngine = 63,

    // Liquidation
    AccountHealthy = 70,
    LiquidationTooSmall = 71,

    // Fatal
    CorruptedSlab = 80,
}

impl RiskError {
    /// Stable numeric code, safe to surface across an ABI boundary
    /// (`percolator-prog` maps this 1:1 into `ProgramError::Custom`).
    #[inline]
    pub const fn code(self) -> u32 {
        self as u32
    }

    pub const fn message(self) -> &'static str {
        match self {
            RiskError::InvalidMagic => "slab magic does not match",
            RiskError::UnsupportedVersion => "unknown slab version",
            RiskError::BitmapInconsistent => "bitmap popcount disagrees with num_used_accounts",
            RiskError::DuplicateAccountId => "account_id collision",
            RiskError::InvariantViolation => "post-op invariant check failed",
            RiskError::NotAdmin => "signer is not the market admin",
            RiskError::NotOracleAuthority => "signer is not the oracle authority",
            RiskError::NotAccountOwner => "signer does not own this account",
            RiskError::Reentrancy => "matcher attempted to reenter the slab",
            RiskError::InvalidIndex => "account index out of range or unused",
            RiskError::MarketFull => "no free account slot",
            RiskError::DuplicateOwner => "owner already has an account in this market",
            RiskError::ZeroSize => "trade size must be non-zero",
            RiskError::InvalidFeedId => "oracle feed id does not match market config",
            RiskError::SlabSizeMismatch => "slab account length does not match compiled layout",
            RiskError::ArithmeticOverflow => "arithmetic overflow",
            RiskError::DivisionByZero => "division by zero",
            RiskError::StaleCrank => "crank has not run recently enough to trade",
            RiskError::RiskReductionOnly => "market is in risk-reduction-only mode",
            RiskError::WarmupPaused => "warmup is paused",
            RiskError::InsufficientMargin => "effective equity below required margin",
            RiskError::InsufficientCapital => "withdrawal exceeds available capital",
            RiskError::InsufficientInsurance => "insurance fund cannot cover this draw",
            RiskError::OracleUnavailable => "oracle account could not be read",
            RiskError::OracleStale => "oracle price older than max_staleness_secs",
            RiskError::OraclePriceInvalid => "oracle price is zero or negative",
            RiskError::ConfidenceTooWide => "oracle confidence interval exceeds conf_filter_bps",
            RiskError::AuthorityPriceExpired => "pushed authority price older than max_staleness_secs",
            RiskError::MatcherRejected => "matcher declined to fill this trade",
            RiskError::MatcherContextInvalid => "matcher_context does not match lp account",
            RiskError::MatcherReturnedBadPrice => "matcher returned a non-positive fill price",
            RiskError::InvalidMatchingEngine => "matcher returned a fill inconsistent with the requested size",
            RiskError::AccountHealthy => "target account is not below maintenance margin",
            RiskError::LiquidationTooSmall => "requested liquidation amount is below min_liquidation_abs",
            RiskError::CorruptedSlab => "slab failed integrity checks; aborting without committing",
        }
    }
}

impl core::fmt::Display for RiskError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message())
    }
}

pub type Result<T> = core::result::Result<T, RiskError>;
