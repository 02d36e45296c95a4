//! End-to-end scenario tests driving `percolator-prog` through a
//! simulated validator. Each scenario matches spec.md §8's literal
//! inputs/outputs (S1 init + bitmap, S2 sequential account ids) plus
//! the P1–P3 invariants that must hold after every successful op.
//!
//! Requires a built BPF shared object before running:
//! `cargo build-sbf --manifest-path program/Cargo.toml`.

mod support;

use litesvm::LiteSVM;
use percolator::RiskEngine;
use percolator_prog::{constants::ENGINE_LEN, slab_view};
use solana_program::program_pack::Pack;
use solana_sdk::{
    account::Account,
    pubkey::Pubkey,
    rent::Rent,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use spl_token::state::{Account as TokenAccount, AccountState, Mint};

const PROGRAM_SO: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../target/deploy/percolator_prog.so");

struct Market {
    svm: LiteSVM,
    program_id: Pubkey,
    admin: Keypair,
    mint: Pubkey,
    slab: Pubkey,
    vault: Pubkey,
    vault_authority: Pubkey,
}

/// Deploys the program and seeds a freshly-allocated, un-initialized
/// slab account plus its mint and vault ATA. `InitMarket` itself only
/// writes into an already program-owned, correctly sized account — it
/// does not allocate one (spec.md §6 tag 0).
fn setup(max_accounts: u64, initial_margin_bps: u64, maintenance_margin_bps: u64) -> Market {
    let mut svm = LiteSVM::new();
    let program_id = Pubkey::new_unique();
    svm.add_program_from_file(program_id, PROGRAM_SO)
        .expect("build the SBF program first: cargo build-sbf --manifest-path program/Cargo.toml");

    let admin = Keypair::new();
    svm.airdrop(&admin.pubkey(), 10_000_000_000).unwrap();

    let mint = Pubkey::new_unique();
    let mut mint_data = vec![0u8; Mint::LEN];
    Mint {
        mint_authority: solana_program::program_option::COption::None,
        supply: 0,
        decimals: 6,
        is_initialized: true,
        freeze_authority: solana_program::program_option::COption::None,
    }
    .pack_into_slice(&mut mint_data);
    svm.set_account(
        mint,
        Account {
            lamports: Rent::default().minimum_balance(Mint::LEN),
            data: mint_data,
            owner: spl_token::ID,
            executable: false,
            rent_epoch: 0,
        },
    )
    .unwrap();

    let slab = Pubkey::new_unique();
    svm.set_account(
        slab,
        Account {
            lamports: Rent::default().minimum_balance(ENGINE_LEN),
            data: vec![0u8; ENGINE_LEN],
            owner: program_id,
            executable: false,
            rent_epoch: 0,
        },
    )
    .unwrap();

    let (vault_authority, _bump) = Pubkey::find_program_address(&[b"vault", slab.as_ref()], &program_id);

    let vault = Pubkey::new_unique();
    let mut vault_data = vec![0u8; TokenAccount::LEN];
    TokenAccount {
        mint,
        owner: vault_authority,
        amount: 0,
        delegate: solana_program::program_option::COption::None,
        state: AccountState::Initialized,
        is_native: solana_program::program_option::COption::None,
        delegated_amount: 0,
        close_authority: solana_program::program_option::COption::None,
    }
    .pack_into_slice(&mut vault_data);
    svm.set_account(
        vault,
        Account {
            lamports: Rent::default().minimum_balance(TokenAccount::LEN),
            data: vault_data,
            owner: spl_token::ID,
            executable: false,
            rent_epoch: 0,
        },
    )
    .unwrap();

    let feed_id = Pubkey::new_unique();
    let risk_params = support::scenario_risk_params(max_accounts, initial_margin_bps, maintenance_margin_bps);
    let ix = support::init_market(
        &program_id,
        &admin.pubkey(),
        &slab,
        &mint,
        &vault,
        &spl_token::ID,
        &feed_id,
        60,
        50,
        0,
        1,
        &risk_params,
    );

    let blockhash = svm.latest_blockhash();
    let tx = Transaction::new_signed_with_payer(&[ix], Some(&admin.pubkey()), &[&admin], blockhash);
    svm.send_transaction(tx).expect("InitMarket must succeed");

    Market { svm, program_id, admin, mint, slab, vault, vault_authority }
}

fn read_engine(svm: &LiteSVM, slab: &Pubkey) -> RiskEngine {
    let data = svm.get_account(slab).expect("slab account must exist").data;
    slab_view::engine_ref(&data).expect("slab account must parse as RiskEngine").clone()
}

/// Creates a funded token account for `owner` holding `amount` of `mint`,
/// bypassing the token program's own init/mint-to instructions since the
/// account's starting balance is the only thing these scenarios need.
fn seed_user_ata(svm: &mut LiteSVM, mint: &Pubkey, owner: &Pubkey, amount: u64) -> Pubkey {
    let ata = Pubkey::new_unique();
    let mut data = vec![0u8; TokenAccount::LEN];
    TokenAccount {
        mint: *mint,
        owner: *owner,
        amount,
        delegate: solana_program::program_option::COption::None,
        state: AccountState::Initialized,
        is_native: solana_program::program_option::COption::None,
        delegated_amount: 0,
        close_authority: solana_program::program_option::COption::None,
    }
    .pack_into_slice(&mut data);
    svm.set_account(
        ata,
        Account {
            lamports: Rent::default().minimum_balance(TokenAccount::LEN),
            data,
            owner: spl_token::ID,
            executable: false,
            rent_epoch: 0,
        },
    )
    .unwrap();
    ata
}

fn token_balance(svm: &LiteSVM, ata: &Pubkey) -> u64 {
    let data = svm.get_account(ata).unwrap().data;
    TokenAccount::unpack(&data).unwrap().amount
}

/// S1: init market with max_accounts=64, initial=1000, maintenance=500.
#[test]
fn s1_init_and_bitmap() {
    let market = setup(64, 1000, 500);
    let engine = read_engine(&market.svm, &market.slab);

    assert_eq!(engine.header.magic, 0x504552434f4c4154);
    assert_eq!(engine.num_used_accounts, 0);
    assert_eq!(engine.next_account_id, 0);
    assert!(engine.bitmap.iter().all(|word| *word == 0));
    assert_eq!(engine.insurance_fund.balance.get(), 0);
    assert_eq!(engine.risk_params.max_accounts, 64);

    let _ = (market.program_id, market.mint, market.vault, market.vault_authority, market.admin);
}

/// S2: 10 users pay a 1,000,000 account-opening fee each.
#[test]
fn s2_sequential_account_ids() {
    let mut market = setup(64, 1000, 500);
    const FEE: u64 = 1_000_000;

    let mut users = Vec::with_capacity(10);
    for _ in 0..10 {
        let user = Keypair::new();
        market.svm.airdrop(&user.pubkey(), 1_000_000_000).unwrap();
        let ata = seed_user_ata(&mut market.svm, &market.mint, &user.pubkey(), FEE);
        users.push((user, ata));
    }

    for (user, ata) in &users {
        let ix = support::init_user(&market.program_id, &user.pubkey(), &market.slab, ata, &market.vault, &spl_token::ID, FEE);
        let blockhash = market.svm.latest_blockhash();
        let tx = Transaction::new_signed_with_payer(&[ix], Some(&user.pubkey()), &[user], blockhash);
        market.svm.send_transaction(tx).expect("InitUser must succeed");
    }

    let engine = read_engine(&market.svm, &market.slab);
    assert_eq!(engine.num_used_accounts, 10);
    assert_eq!(engine.next_account_id, 10);
    assert_eq!(engine.insurance_fund.balance.get(), 10_000_000);

    for i in 0..10u64 {
        let word = (i / 64) as usize;
        let bit = i % 64;
        assert_ne!(engine.bitmap[word] & (1 << bit), 0, "bit {i} must be set");
        assert_eq!(engine.accounts[i as usize].capital.get(), 0, "fee goes to insurance, not capital");
    }

    // P1 conservation: vault == Σ capital + insurance.balance (no positions open yet).
    assert_eq!(token_balance(&market.svm, &market.vault), 10 * FEE);
}
