//! Percolator liquidation/crank keeper.
//!
//! Off-chain service that polls a single market's slab account, scores
//! every account's margin headroom, and submits `LiquidateAtOracle` for
//! anything underwater and a periodic `KeeperCrank` to keep funding and
//! warmup state current.

mod config;
mod health;
mod oracle;
mod priority_queue;
mod tx_builder;

use anyhow::{Context, Result};
use config::Config;
use percolator::RiskEngine;
use priority_queue::HealthQueue;
use solana_client::rpc_client::RpcClient;
use solana_sdk::{commitment_config::CommitmentConfig, signature::Keypair, signer::Signer};
use std::time::Duration;
use tokio::time;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting Percolator keeper");

    let config = Config::load().unwrap_or_else(|_| {
        log::warn!("Failed to load config, using default devnet config");
        Config::default_devnet()
    });

    log::info!("Connected to RPC: {}", config.rpc_url);
    log::info!("Monitoring program: {}", config.program_id);

    let client = RpcClient::new_with_commitment(config.rpc_url.clone(), CommitmentConfig::confirmed());

    let keeper = load_keypair(&config.keypair_path)?;
    log::info!("Keeper wallet: {}", keeper.pubkey());

    let mut queue = HealthQueue::new();

    log::info!("Keeper service started. Polling every {}s.", config.poll_interval_secs);

    let mut interval = time::interval(Duration::from_secs(config.poll_interval_secs));
    let mut crank_idx: u64 = 0;

    loop {
        interval.tick().await;

        if let Err(e) = tick(&mut queue, &client, &config, &keeper, &mut crank_idx).await {
            log::error!("Error during keeper tick: {e}");
        }

        if !queue.is_empty() {
            log::debug!("Health queue size: {}", queue.len());
            if let Some(worst) = queue.peek() {
                log::debug!("Worst health: {}", worst.health as f64 / 1e6);
            }
        }
    }
}

async fn tick(
    queue: &mut HealthQueue,
    client: &RpcClient,
    config: &Config,
    keeper: &Keypair,
    crank_idx: &mut u64,
) -> Result<()> {
    let slab_data = client
        .get_account_data(&config.slab()?)
        .context("failed to fetch slab account")?;
    let engine = health::parse_slab(&slab_data)?;

    let oracle_data = client
        .get_account_data(&config.oracle()?)
        .context("failed to fetch oracle account")?;

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    let price = oracle::gated_price_e6(&engine.market, &oracle_data, now)?;

    let slot = client.get_slot().context("failed to fetch slot")?;

    queue_health(queue, engine, price, slot)?;
    submit_liquidations(queue, client, config, keeper).await?;

    // Crank every other tick so funding/warmup state doesn't go stale
    // while liquidations are being processed.
    *crank_idx += 1;
    if *crank_idx % 2 == 0 {
        submit_crank(client, config, keeper, price)?;
    }

    Ok(())
}

fn queue_health(queue: &mut HealthQueue, engine: &RiskEngine, price: u64, slot: u64) -> Result<()> {
    for h in health::scan_accounts(engine, price, slot)? {
        queue.push(h);
    }
    Ok(())
}

async fn submit_liquidations(
    queue: &mut HealthQueue,
    client: &RpcClient,
    config: &Config,
    keeper: &Keypair,
) -> Result<()> {
    let liquidatable = queue.get_liquidatable(config.liquidation_threshold);
    if liquidatable.is_empty() {
        log::debug!("No accounts need liquidation");
        return Ok(());
    }

    log::info!("Found {} accounts needing liquidation", liquidatable.len());
    let batch_size = config.max_liquidations_per_batch.min(liquidatable.len());

    for target in liquidatable.iter().take(batch_size) {
        log::info!(
            "Liquidating account idx {} (owner {}, health {})",
            target.account_idx,
            target.user,
            target.health as f64 / 1e6
        );

        let recent_blockhash = client
            .get_latest_blockhash()
            .context("failed to get recent blockhash")?;

        let tx = tx_builder::build_liquidation_transaction(
            &config.program_id()?,
            &config.slab()?,
            &config.oracle()?,
            keeper,
            target.account_idx as u16,
            recent_blockhash,
        )?;

        match client.send_and_confirm_transaction(&tx) {
            Ok(signature) => {
                log::info!("Liquidation submitted: {signature}");
                queue.remove(&target.user);
            }
            Err(e) => {
                log::error!("Failed to liquidate account idx {}: {e}", target.account_idx);
            }
        }
    }

    Ok(())
}

fn submit_crank(client: &RpcClient, config: &Config, keeper: &Keypair, _price: u64) -> Result<()> {
    let recent_blockhash = client
        .get_latest_blockhash()
        .context("failed to get recent blockhash")?;

    let tx = tx_builder::build_crank_transaction(
        &config.program_id()?,
        &config.slab()?,
        &config.oracle()?,
        keeper,
        percolator::constants::PERMISSIONLESS_CALLER,
        false,
        recent_blockhash,
    )?;

    match client.send_and_confirm_transaction(&tx) {
        Ok(signature) => log::info!("Crank submitted: {signature}"),
        Err(e) => log::warn!("Crank failed: {e}"),
    }

    Ok(())
}

fn load_keypair(path: &str) -> Result<Keypair> {
    let expanded_path = shellexpand::tilde(path);
    let bytes = std::fs::read(expanded_path.as_ref())
        .context(format!("Failed to read keypair from {path}"))?;

    let keypair = if bytes[0] == b'[' {
        let json_data: Vec<u8> = serde_json::from_slice(&bytes).context("Failed to parse keypair JSON")?;
        Keypair::try_from(&json_data[..]).context("Failed to create keypair from bytes")?
    } else {
        Keypair::try_from(&bytes[..]).context("Failed to create keypair from bytes")?
    };

    Ok(keypair)
}
