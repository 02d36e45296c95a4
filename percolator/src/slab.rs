//! Slab header, market config, risk params, and engine state (spec.md §3).
//!
//! Every region is `#[repr(C)]` and append-only: a version bump adds
//! fields to a region's declared tail, never reorders or removes one
//! (spec.md §4.2). The `RiskEngine` struct at the bottom of this module
//! *is* the slab — there is no separate encode/decode step; a host casts
//! the account's byte buffer directly onto `RiskEngine` (see
//! `percolator-prog::processor::slab_view`).

use crate::account::Account;
use crate::constants::{BITMAP_WORDS, MAX_ACCOUNTS, SLAB_MAGIC, SLAB_VERSION};
use crate::fixed::{I128, U128};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct SlabHeader {
    pub magic: u64,
    pub version: u32,
    pub bump: u8,
    _pad0: [u8; 3],
    pub admin: [u8; 32],
    /// Monotonic nonce, incremented once per committed operation; gives
    /// every op a total order independent of the host's own sequencing
    /// (spec.md §5 "Ordering guarantees").
    pub nonce: u64,
    pub last_threshold_update_slot: u64,
}

impl SlabHeader {
    pub fn new(admin: [u8; 32], bump: u8) -> Self {
        SlabHeader {
            magic: SLAB_MAGIC,
            version: SLAB_VERSION,
            bump,
            _pad0: [0; 3],
            admin,
            nonce: 0,
            last_threshold_update_slot: 0,
        }
    }

    #[inline]
    pub fn is_valid_magic(&self) -> bool {
        self.magic == SLAB_MAGIC
    }

    #[inline]
    pub fn is_known_version(&self) -> bool {
        self.version == SLAB_VERSION
    }
}

/// Oracle feed identity: either a 32-byte pull-oracle feed id or a
/// push-oracle account key. The distinguishing tag lives alongside it;
/// the spec describes selection "by length/type tag" — we make that
/// explicit rather than inferring it from byte patterns.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FeedKind {
    Pull = 0,
    Push = 1,
}

impl MarketConfig {
    /// Builds a `MarketConfig` from the fields `InitMarket` actually
    /// carries (spec.md §6 tag 0) plus what the on-chain wrapper derives
    /// itself (the vault ATA key and its authority PDA bump) — the
    /// padding fields stay private to this module so every other crate
    /// goes through here instead of depending on their exact count.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        collateral_mint: [u8; 32],
        vault: [u8; 32],
        vault_authority_bump: u8,
        feed_kind: FeedKind,
        price_feed: [u8; 32],
        max_staleness_secs: u64,
        conf_filter_bps: u16,
        invert: u8,
        unit_scale: u32,
        oracle_authority: [u8; 32],
        has_oracle_authority: u8,
    ) -> Self {
        MarketConfig {
            collateral_mint,
            vault,
            vault_authority_bump,
            feed_kind,
            _pad0: [0; 2],
            price_feed,
            max_staleness_secs,
            conf_filter_bps,
            invert,
            _pad1: [0; 1],
            unit_scale,
            oracle_authority,
            has_oracle_authority,
            _pad2: [0; 7],
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct MarketConfig {
    pub collateral_mint: [u8; 32],
    pub vault: [u8; 32],
    pub vault_authority_bump: u8,
    pub feed_kind: FeedKind,
    _pad0: [u8; 2],
    pub price_feed: [u8; 32],

    pub max_staleness_secs: u64,
    pub conf_filter_bps: u16,
    pub invert: u8,
    _pad1: [u8; 1],
    pub unit_scale: u32,

    /// Zeroed when unset; non-zero enables the authority-price override
    /// path in the oracle gate (spec.md §4.4 step 1).
    pub oracle_authority: [u8; 32],
    pub has_oracle_authority: u8,
    _pad2: [u8; 7],
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct FundingConfig {
    pub horizon_slots: u64,
    pub k_bps: i64,
    pub scale_notional: u128,
    pub max_premium_bps: i64,
    pub max_bps_per_slot: i64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct RiskParams {
    pub warmup_period_slots: u64,
    pub maintenance_margin_bps: u64,
    pub initial_margin_bps: u64,
    pub trading_fee_bps: u64,
    pub max_accounts: u64,
    pub new_account_fee: U128,
    pub risk_reduction_threshold: U128,
    pub maintenance_fee_per_slot: U128,
    pub max_crank_staleness_slots: u64,
    pub liquidation_fee_bps: u64,
    pub liquidation_fee_cap: U128,
    pub liquidation_buffer_bps: u64,
    pub min_liquidation_abs: U128,
    pub funding: FundingConfig,
}

impl RiskParams {
    /// spec.md invariant 6: `maintenance_margin_bps < initial_margin_bps`.
    #[inline]
    pub fn margin_order_holds(&self) -> bool {
        self.maintenance_margin_bps < self.initial_margin_bps
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct InsuranceFund {
    pub balance: U128,
    pub fee_revenue: U128,
}

/// O(1) aggregates maintained incrementally by every op that would
/// otherwise require an O(n) scan to re-derive them (spec.md §3 "totals").
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Totals {
    pub total_open_interest: U128,
    pub lp_sum_abs: U128,
    pub lp_max_abs: U128,
    pub pnl_pos_tot: U128,
    pub pnl_neg_tot: U128,
}

/// The slab itself: header + market config + risk params + engine state
/// + allocator bitmap + account array, laid out in that order (spec.md
/// §6 "Slab binary format"). `SLAB_LEN` is a compile-time constant tied
/// to the selected `MAX_ACCOUNTS` feature.
#[derive(Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct RiskEngine {
    pub header: SlabHeader,
    pub market: MarketConfig,
    pub risk_params: RiskParams,

    pub current_slot: u64,
    pub last_crank_slot: u64,
    pub last_full_sweep_start_slot: u64,

    pub funding_index_qpb_e6: I128,
    pub last_funding_slot: u64,

    pub insurance_fund: InsuranceFund,
    pub vault: U128,
    pub loss_accum: U128,

    pub risk_reduction_only: bool,
    pub warmup_paused: bool,

    pub lifetime_liquidations: u64,
    pub lifetime_force_closes: u64,

    pub next_account_id: u64,
    pub num_used_accounts: u16,

    pub totals: Totals,

    pub authority_price_e6: u64,
    pub authority_timestamp: i64,

    pub bitmap: [u64; BITMAP_WORDS],
    pub accounts: [Account; MAX_ACCOUNTS],
}

/// Compile-time assertion that `MAX_ACCOUNTS` fits the declared physical
/// capacity and that the struct has no surprise size blow-up. A runtime
/// `max_accounts` in `RiskParams` must never exceed this.
pub const SLAB_PHYSICAL_CAPACITY: usize = MAX_ACCOUNTS;

impl RiskEngine {
    /// Zeroed slab with the given admin/market parameters — the result
    /// of `InitMarket` (spec.md §6 tag 0, scenario S1).
    pub fn new_market(
        admin: [u8; 32],
        bump: u8,
        market: MarketConfig,
        risk_params: RiskParams,
    ) -> Self {
        RiskEngine {
            header: SlabHeader::new(admin, bump),
            market,
            risk_params,
            current_slot: 0,
            last_crank_slot: 0,
            last_full_sweep_start_slot: 0,
            funding_index_qpb_e6: I128::ZERO,
            last_funding_slot: 0,
            insurance_fund: InsuranceFund::default(),
            vault: U128::ZERO,
            loss_accum: U128::ZERO,
            risk_reduction_only: false,
            warmup_paused: false,
            lifetime_liquidations: 0,
            lifetime_force_closes: 0,
            next_account_id: 0,
            num_used_accounts: 0,
            totals: Totals::default(),
            authority_price_e6: 0,
            authority_timestamp: 0,
            bitmap: [0u64; BITMAP_WORDS],
            accounts: [Account::default(); MAX_ACCOUNTS],
        }
    }

    /// Test/harness convenience constructor matching the teacher's
    /// `RiskEngine::new(params)` call sites — builds a zeroed market
    /// with a nil admin/mint/feed, suitable for unit tests and Kani
    /// proofs that only exercise risk-parameter-driven behavior.
    pub fn new(risk_params: RiskParams) -> Self {
        let market = MarketConfig {
            collateral_mint: [0; 32],
            vault: [0; 32],
            vault_authority_bump: 0,
            feed_kind: FeedKind::Push,
            _pad0: [0; 2],
            price_feed: [0; 32],
            max_staleness_secs: u64::MAX,
            conf_filter_bps: u16::MAX,
            invert: 0,
            _pad1: [0; 1],
            unit_scale: 0,
            oracle_authority: [0; 32],
            has_oracle_authority: 0,
            _pad2: [0; 7],
        };
        Self::new_market([0; 32], 0, market, risk_params)
    }
}
