//! Keeper configuration (spec.md §4.11: the crank/liquidation caller is
//! an ordinary permissionless client, not a privileged role — this is
//! just the convenience config for one instance of that client).

use anyhow::{Context, Result};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub rpc_url: String,
    pub program_id: String,
    pub slab: String,
    pub oracle: String,
    pub keypair_path: String,
    pub poll_interval_secs: u64,
    /// Effective-equity-minus-MM threshold (Q6) below which an account is
    /// queued for `LiquidateAtOracle`.
    pub liquidation_threshold: i128,
    pub max_liquidations_per_batch: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = shellexpand::tilde("~/.percolator/keeper.toml").into_owned();
        let raw = std::fs::read_to_string(&path)
            .context(format!("Failed to read keeper config at {path}"))?;
        toml::from_str(&raw).context("Failed to parse keeper config")
    }

    pub fn default_devnet() -> Self {
        Config {
            rpc_url: "https://api.devnet.solana.com".to_string(),
            program_id: Pubkey::default().to_string(),
            slab: Pubkey::default().to_string(),
            oracle: Pubkey::default().to_string(),
            keypair_path: "~/.config/solana/id.json".to_string(),
            poll_interval_secs: 5,
            liquidation_threshold: 0,
            max_liquidations_per_batch: 10,
        }
    }

    pub fn program_id(&self) -> Result<Pubkey> {
        Pubkey::from_str(&self.program_id).context("Invalid program_id in config")
    }

    pub fn slab(&self) -> Result<Pubkey> {
        Pubkey::from_str(&self.slab).context("Invalid slab pubkey in config")
    }

    pub fn oracle(&self) -> Result<Pubkey> {
        Pubkey::from_str(&self.oracle).context("Invalid oracle pubkey in config")
    }
}
