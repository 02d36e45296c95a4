//! Core risk-engine library: a fixed-layout, dependency-free slab that
//! *is* the on-chain account state (no separate encode/decode step).
//! Every operation is a method on `RiskEngine` returning
//! `Result<_, RiskError>`; nothing here talks to Solana, a wallet, or an
//! oracle network directly — those live one layer up in `percolator-prog`.

pub mod account;
pub mod admin;
pub mod alloc;
pub mod constants;
pub mod crank;
pub mod error;
pub mod fixed;
pub mod funding;
pub mod liquidation;
pub mod margin;
pub mod matcher;
pub mod oracle;
pub mod slab;
pub mod trade;
pub mod warmup;

pub use account::{Account, AccountKind};
pub use constants::MAX_ACCOUNTS;
pub use crank::CrankOutcome;
pub use error::{Result, RiskError};
pub use fixed::{I128, U128};
pub use liquidation::LiquidationOutcome;
pub use matcher::{FixedPriceMatcher, MatchingEngine, TradeExecution};
pub use oracle::{GatedPrice, OracleInput};
pub use slab::{FeedKind, FundingConfig, InsuranceFund, MarketConfig, RiskEngine, RiskParams, Totals};
pub use warmup::Haircut;

#[cfg(test)]
mod tests;

#[cfg(kani)]
mod kani_proofs;
