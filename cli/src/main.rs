//! `percolator` CLI — a thin operator/integrator front end over the
//! instruction taxonomy in spec.md §6. Every subcommand builds one
//! instruction (`ix::*`) and submits it as a single-instruction
//! transaction signed by the configured keypair.

mod ix;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use percolator::constants::PERMISSIONLESS_CALLER;
use solana_client::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use std::str::FromStr;

#[derive(Parser)]
#[command(name = "percolator", about = "Percolator perpetuals market CLI")]
struct Cli {
    #[arg(long, default_value = "https://api.devnet.solana.com", env = "PERCOLATOR_RPC_URL")]
    rpc_url: String,

    #[arg(long, default_value = "~/.config/solana/id.json", env = "PERCOLATOR_KEYPAIR")]
    keypair: String,

    #[arg(long, env = "PERCOLATOR_PROGRAM_ID")]
    program_id: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a new market slab (tag 0).
    InitMarket {
        #[arg(long)]
        slab: String,
        #[arg(long)]
        mint: String,
        #[arg(long)]
        vault: String,
        #[arg(long)]
        feed_id: String,
        #[arg(long, default_value_t = 60)]
        max_staleness_secs: u64,
        #[arg(long, default_value_t = 50)]
        conf_filter_bps: u16,
        #[arg(long, default_value_t = 0)]
        invert: u8,
        #[arg(long, default_value_t = 1)]
        unit_scale: u32,
    },
    /// Deposit the account-opening fee and allocate a user slot (tag 1).
    InitUser {
        #[arg(long)]
        slab: String,
        #[arg(long)]
        user_ata: String,
        #[arg(long)]
        vault: String,
        #[arg(long, default_value_t = 0)]
        fee_payment: u64,
    },
    /// Deposit the account-opening fee and allocate an LP slot (tag 2).
    InitLp {
        #[arg(long)]
        slab: String,
        #[arg(long)]
        user_ata: String,
        #[arg(long)]
        vault: String,
        #[arg(long)]
        matcher_program: String,
        #[arg(long)]
        matcher_context: String,
        #[arg(long, default_value_t = 0)]
        fee_payment: u64,
    },
    /// Deposit collateral into an existing account (tag 3).
    Deposit {
        #[arg(long)]
        slab: String,
        #[arg(long)]
        user_ata: String,
        #[arg(long)]
        vault: String,
        #[arg(long)]
        user_idx: u16,
        #[arg(long)]
        amount: u64,
    },
    /// Withdraw collateral from an account (tag 4).
    Withdraw {
        #[arg(long)]
        slab: String,
        #[arg(long)]
        vault: String,
        #[arg(long)]
        user_ata: String,
        #[arg(long)]
        vault_authority: String,
        #[arg(long)]
        oracle: String,
        #[arg(long)]
        user_idx: u16,
        #[arg(long)]
        amount: u64,
    },
    /// Run the keeper crank (tag 5). `caller_idx` defaults to the
    /// permissionless sentinel (0xFFFF).
    Crank {
        #[arg(long)]
        slab: String,
        #[arg(long)]
        oracle: String,
        #[arg(long)]
        caller_idx: Option<u16>,
        #[arg(long, default_value_t = false)]
        allow_panic: bool,
    },
    /// Execute a trade against a non-CPI (fixed-price) matcher (tag 6).
    TradeNoCpi {
        #[arg(long)]
        slab: String,
        #[arg(long)]
        oracle: String,
        #[arg(long)]
        lp_idx: u16,
        #[arg(long)]
        user_idx: u16,
        #[arg(long, allow_hyphen_values = true)]
        size: i128,
    },
    /// Execute a trade through a CPI matcher (tag 10).
    TradeCpi {
        #[arg(long)]
        slab: String,
        #[arg(long)]
        oracle: String,
        #[arg(long)]
        matcher_program: String,
        #[arg(long)]
        lp_context: String,
        #[arg(long)]
        lp_idx: u16,
        #[arg(long)]
        user_idx: u16,
        #[arg(long, allow_hyphen_values = true)]
        size: i128,
    },
    /// Liquidate an account at the gated oracle price (tag 7).
    Liquidate {
        #[arg(long)]
        slab: String,
        #[arg(long)]
        oracle: String,
        #[arg(long)]
        target_idx: u16,
    },
    /// Close a dust account and reclaim its slot (tag 8).
    CloseAccount {
        #[arg(long)]
        slab: String,
        #[arg(long)]
        user_idx: u16,
    },
    /// Top up the insurance fund (tag 9).
    TopUpInsurance {
        #[arg(long)]
        slab: String,
        #[arg(long)]
        payer_ata: String,
        #[arg(long)]
        vault: String,
        #[arg(long)]
        amount: u64,
    },
    /// Set the risk-reduction threshold (tag 11, admin-only).
    SetRiskThreshold {
        #[arg(long)]
        slab: String,
        #[arg(long)]
        new: u128,
    },
    /// Transfer market admin authority (tag 12, admin-only).
    UpdateAdmin {
        #[arg(long)]
        slab: String,
        #[arg(long)]
        new_admin: String,
    },
    /// Close an empty slab and reclaim its rent (tag 13, admin-only).
    CloseSlab {
        #[arg(long)]
        slab: String,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let client = RpcClient::new_with_commitment(cli.rpc_url.clone(), CommitmentConfig::confirmed());
    let signer = load_keypair(&cli.keypair)?;
    let program_id = Pubkey::from_str(&cli.program_id).context("invalid --program-id")?;
    let token_program = spl_token::ID;

    let instruction = match cli.command {
        Command::InitMarket {
            slab,
            mint,
            vault,
            feed_id,
            max_staleness_secs,
            conf_filter_bps,
            invert,
            unit_scale,
        } => ix::init_market(
            &program_id,
            &signer.pubkey(),
            &pk(&slab)?,
            &pk(&mint)?,
            &pk(&vault)?,
            &token_program,
            &pk(&feed_id)?,
            max_staleness_secs,
            conf_filter_bps,
            invert,
            unit_scale,
            &ix::default_risk_params(),
        ),
        Command::InitUser { slab, user_ata, vault, fee_payment } => ix::init_user(
            &program_id,
            &signer.pubkey(),
            &pk(&slab)?,
            &pk(&user_ata)?,
            &pk(&vault)?,
            &token_program,
            fee_payment,
        ),
        Command::InitLp {
            slab,
            user_ata,
            vault,
            matcher_program,
            matcher_context,
            fee_payment,
        } => ix::init_lp(
            &program_id,
            &signer.pubkey(),
            &pk(&slab)?,
            &pk(&user_ata)?,
            &pk(&vault)?,
            &token_program,
            &pk(&matcher_program)?,
            &pk(&matcher_context)?,
            fee_payment,
        ),
        Command::Deposit { slab, user_ata, vault, user_idx, amount } => ix::deposit_collateral(
            &program_id,
            &signer.pubkey(),
            &pk(&slab)?,
            &pk(&user_ata)?,
            &pk(&vault)?,
            &token_program,
            user_idx,
            amount,
        ),
        Command::Withdraw {
            slab,
            vault,
            user_ata,
            vault_authority,
            oracle,
            user_idx,
            amount,
        } => ix::withdraw_collateral(
            &program_id,
            &signer.pubkey(),
            &pk(&slab)?,
            &pk(&vault)?,
            &pk(&user_ata)?,
            &pk(&vault_authority)?,
            &token_program,
            &pk(&oracle)?,
            user_idx,
            amount,
        ),
        Command::Crank { slab, oracle, caller_idx, allow_panic } => ix::keeper_crank(
            &program_id,
            &signer.pubkey(),
            &pk(&slab)?,
            &pk(&oracle)?,
            caller_idx.unwrap_or(PERMISSIONLESS_CALLER),
            allow_panic,
        ),
        Command::TradeNoCpi { slab, oracle, lp_idx, user_idx, size } => {
            ix::trade_no_cpi(&program_id, &signer.pubkey(), &pk(&slab)?, &pk(&oracle)?, lp_idx, user_idx, size)
        }
        Command::TradeCpi {
            slab,
            oracle,
            matcher_program,
            lp_context,
            lp_idx,
            user_idx,
            size,
        } => ix::trade_cpi(
            &program_id,
            &signer.pubkey(),
            &pk(&slab)?,
            &pk(&oracle)?,
            &pk(&matcher_program)?,
            &pk(&lp_context)?,
            lp_idx,
            user_idx,
            size,
        ),
        Command::Liquidate { slab, oracle, target_idx } => {
            ix::liquidate_at_oracle(&program_id, &signer.pubkey(), &pk(&slab)?, &pk(&oracle)?, target_idx)
        }
        Command::CloseAccount { slab, user_idx } => {
            ix::close_account(&program_id, &signer.pubkey(), &pk(&slab)?, user_idx)
        }
        Command::TopUpInsurance { slab, payer_ata, vault, amount } => ix::top_up_insurance(
            &program_id,
            &signer.pubkey(),
            &pk(&slab)?,
            &pk(&payer_ata)?,
            &pk(&vault)?,
            &token_program,
            amount,
        ),
        Command::SetRiskThreshold { slab, new } => {
            ix::set_risk_threshold(&program_id, &signer.pubkey(), &pk(&slab)?, new)
        }
        Command::UpdateAdmin { slab, new_admin } => {
            ix::update_admin(&program_id, &signer.pubkey(), &pk(&slab)?, &pk(&new_admin)?)
        }
        Command::CloseSlab { slab } => ix::close_slab(&program_id, &signer.pubkey(), &pk(&slab)?),
    };

    submit(&client, &signer, instruction)
}

fn pk(s: &str) -> Result<Pubkey> {
    Pubkey::from_str(s).with_context(|| format!("invalid pubkey: {s}"))
}

fn submit(client: &RpcClient, signer: &Keypair, instruction: solana_sdk::instruction::Instruction) -> Result<()> {
    let recent_blockhash = client.get_latest_blockhash().context("failed to fetch recent blockhash")?;
    let tx = Transaction::new_signed_with_payer(&[instruction], Some(&signer.pubkey()), &[signer], recent_blockhash);

    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.set_message("submitting transaction...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let result = client.send_and_confirm_transaction(&tx);
    spinner.finish_and_clear();

    let signature = result.context("transaction failed")?;
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    println!("{} {} {}", "confirmed:".green().bold(), signature, format!("({now})").dimmed());
    Ok(())
}

fn load_keypair(path: &str) -> Result<Keypair> {
    let expanded = shellexpand::tilde(path);
    let bytes = std::fs::read(expanded.as_ref()).with_context(|| format!("failed to read keypair at {path}"))?;

    if bytes.first() == Some(&b'[') {
        let json: Vec<u8> = serde_json::from_slice(&bytes).context("failed to parse keypair JSON")?;
        Keypair::try_from(&json[..]).context("failed to build keypair from bytes")
    } else {
        Keypair::try_from(&bytes[..]).context("failed to build keypair from bytes")
    }
}
