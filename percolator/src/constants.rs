//! Compile-time constants: scales, bounds, and the MAX_ACCOUNTS feature gate.

/// Implicit decimal places carried by every Q6 price/notional value.
pub const E6: u128 = 1_000_000;

/// Basis-point denominator (parts-per-10,000).
pub const BPS_DENOM: u128 = 10_000;

/// `10^12`, used by the oracle gate's `invert` path (`price <- 10^12 / price`).
pub const INVERT_NUMERATOR: u128 = 1_000_000_000_000;

/// Account-record count, selected by mutually exclusive Cargo features the
/// same way the reference project prices rent: `test` (64), `small` (256),
/// `medium` (1024), and the unfeatured default (4096).
#[cfg(feature = "test")]
pub const MAX_ACCOUNTS: usize = 64;
#[cfg(all(feature = "small", not(feature = "test")))]
pub const MAX_ACCOUNTS: usize = 256;
#[cfg(all(feature = "medium", not(feature = "test"), not(feature = "small")))]
pub const MAX_ACCOUNTS: usize = 1024;
#[cfg(not(any(feature = "test", feature = "small", feature = "medium")))]
pub const MAX_ACCOUNTS: usize = 4096;

/// One bitmap word covers 64 account slots.
pub const BITMAP_WORDS: usize = (MAX_ACCOUNTS + 63) / 64;

/// Sentinel `caller_idx` meaning "permissionless crank caller".
pub const PERMISSIONLESS_CALLER: u16 = 0xFFFF;

/// 8-byte slab magic. Matches spec.md S1: header magic `0x504552434f4c4154`
/// (the ASCII bytes of `"PERCOLAT"` read as one big value).
pub const SLAB_MAGIC: u64 = 0x504552434f4c4154;
pub const SLAB_VERSION: u32 = 1;

/// An account record index never resolves to an oracle price above this —
/// used as a sanity ceiling against corrupted/poisoned state (see
/// `check_conservation` in `src/tests.rs` and the Kani harnesses).
pub const MAX_ORACLE_PRICE: u64 = u64::MAX / 4;

/// 100% of trading-fee revenue goes to the insurance fund's `fee_revenue`
/// ledger; there is no separate maker/taker or protocol/LP split. This is
/// the Open Question #2 resolution from spec.md §9, recorded in DESIGN.md.
pub const TRADING_FEE_TO_INSURANCE_BPS: u64 = 10_000;

/// 100% of the (capped) liquidation fee goes to insurance when no external
/// liquidator reward path is wired up. See DESIGN.md Open Question #2.
pub const LIQUIDATION_FEE_TO_INSURANCE_BPS: u64 = 10_000;

/// EWMA smoothing factor (10%) for the risk-reduction threshold update in
/// the keeper crank (spec.md §4.11 step 6), expressed as a bps numerator
/// over `BPS_DENOM`.
pub const THRESHOLD_EWMA_ALPHA_BPS: u128 = 1_000;

/// Per-update cap on how far `risk_reduction_threshold` may move (±5%).
pub const THRESHOLD_MAX_STEP_BPS: u128 = 500;
