//! `process_instruction` (spec.md §6): decodes the tag, validates the
//! account list against the slab's own state, and drives the
//! corresponding `percolator::RiskEngine` method. Every handler borrows
//! the slab account's data exactly once via `slab_view::engine_mut`
//! (spec.md §5 "the slab is the only shared resource").

use solana_program::account_info::AccountInfo;
use solana_program::entrypoint::ProgramResult;
use solana_program::program_error::ProgramError;
use solana_program::pubkey::Pubkey;
use solana_program::sysvar::clock::Clock;
use solana_program::sysvar::Sysvar;

use percolator::slab::{FeedKind, MarketConfig};
use percolator::{FixedPriceMatcher, MatchingEngine, RiskEngine};

use crate::error::{map_risk_error, WrapperError};
use crate::ix::Instruction;
use crate::matcher_cpi::CpiMatcher;
use crate::oracle_parse::parse_pull_oracle;
use crate::{accounts, constants, slab_view, vault};

fn slab_guard(program_id: &Pubkey, slab: &AccountInfo, data: &[u8]) -> Result<(), ProgramError> {
    accounts::expect_owner(slab, program_id)?;
    if data.len() != constants::SLAB_LEN {
        return Err(WrapperError::InvalidSlabLen.into());
    }
    Ok(())
}

fn require_initialized(engine: &RiskEngine) -> Result<(), ProgramError> {
    if !engine.header.is_valid_magic() {
        return Err(WrapperError::NotInitialized.into());
    }
    if !engine.header.is_known_version() {
        return Err(WrapperError::NotInitialized.into());
    }
    Ok(())
}

fn require_owner(engine: &RiskEngine, idx: usize, signer: &Pubkey) -> Result<(), ProgramError> {
    if !engine.is_used(idx) {
        return Err(map_risk_error(percolator::RiskError::InvalidIndex));
    }
    if engine.accounts[idx].owner != signer.to_bytes() {
        return Err(map_risk_error(percolator::RiskError::NotAccountOwner));
    }
    Ok(())
}

fn require_admin(engine: &RiskEngine, signer: &Pubkey) -> Result<(), ProgramError> {
    if engine.header.admin != signer.to_bytes() {
        return Err(map_risk_error(percolator::RiskError::NotAdmin));
    }
    Ok(())
}

/// Reads the gated oracle price for one op: parses the Pyth account the
/// market was configured with, runs it through the core's staleness/
/// confidence/invert/unit-scale gate, and narrows the result to the
/// `u64` every engine entry point expects.
fn gated_price_e6(engine: &RiskEngine, oracle_ai: &AccountInfo, now: i64) -> Result<u64, ProgramError> {
    accounts::expect_key(
        oracle_ai,
        &Pubkey::new_from_array(engine.market.price_feed),
    )?;
    #[cfg_attr(not(feature = "devnet"), allow(unused_mut))]
    let mut feed = parse_pull_oracle(oracle_ai)?;
    #[cfg(feature = "devnet")]
    {
        feed.conf = 0;
    }
    let gated = percolator::oracle::read_oracle(
        &engine.market,
        engine.authority_price_e6,
        engine.authority_timestamp,
        Some(feed),
        now,
    )
    .map_err(map_risk_error)?;
    u64::try_from(gated.price_e6).map_err(|_| map_risk_error(percolator::RiskError::ArithmeticOverflow))
}

fn vault_seeds<'a>(slab_key: &'a Pubkey, bump_arr: &'a [u8; 1]) -> [&'a [u8]; 3] {
    [constants::VAULT_SEED, slab_key.as_ref(), bump_arr.as_ref()]
}

/// `unsafe_close` (test-only, gated out of mainnet builds at the crate
/// root) skips this guard so integration tests can reclaim rent without
/// draining every account first.
#[cfg(not(feature = "unsafe_close"))]
fn check_slab_empty(num_used_accounts: u16) -> Result<(), ProgramError> {
    if num_used_accounts != 0 {
        return Err(WrapperError::SlabNotEmpty.into());
    }
    Ok(())
}

#[cfg(feature = "unsafe_close")]
fn check_slab_empty(_num_used_accounts: u16) -> Result<(), ProgramError> {
    Ok(())
}

pub fn process_instruction(
    program_id: &Pubkey,
    accounts_list: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    let instruction = Instruction::decode(instruction_data)?;

    match instruction {
        Instruction::InitMarket {
            admin,
            mint,
            feed_id,
            max_staleness_secs,
            conf_filter_bps,
            invert,
            unit_scale,
            risk_params,
        } => {
            accounts::expect_len(accounts_list, 5)?;
            let a_admin = &accounts_list[0];
            let a_slab = &accounts_list[1];
            let a_mint = &accounts_list[2];
            let a_vault = &accounts_list[3];

            accounts::expect_signer(a_admin)?;
            accounts::expect_writable(a_slab)?;
            accounts::expect_key(a_mint, &mint)?;

            let mut data = a_slab.try_borrow_mut_data()?;
            slab_guard(program_id, a_slab, &data)?;

            let existing = slab_view::engine_ref(&data)?;
            if existing.header.is_valid_magic() {
                return Err(WrapperError::AlreadyInitialized.into());
            }

            let (authority_pda, bump) = accounts::derive_vault_authority(program_id, a_slab.key);
            vault::verify_vault_ata(a_vault, a_vault.key, &authority_pda, &mint)?;

            let market = MarketConfig::new(
                mint.to_bytes(),
                a_vault.key.to_bytes(),
                bump,
                FeedKind::Pull,
                feed_id.to_bytes(),
                max_staleness_secs,
                conf_filter_bps,
                invert,
                unit_scale,
                [0u8; 32],
                0,
            );

            let engine_mut = slab_view::engine_mut(&mut data)?;
            *engine_mut = RiskEngine::new_market(admin.to_bytes(), bump, market, risk_params);
        }

        Instruction::InitUser { fee_payment } => {
            accounts::expect_len(accounts_list, 5)?;
            let a_user = &accounts_list[0];
            let a_slab = &accounts_list[1];
            let a_user_ata = &accounts_list[2];
            let a_vault = &accounts_list[3];
            let a_token = &accounts_list[4];

            accounts::expect_signer(a_user)?;
            accounts::expect_writable(a_slab)?;

            let mut data = a_slab.try_borrow_mut_data()?;
            slab_guard(program_id, a_slab, &data)?;
            let engine = slab_view::engine_mut(&mut data)?;
            require_initialized(engine)?;

            vault::deposit(a_token, a_user_ata, a_vault, a_user, fee_payment)?;

            let id = engine.add_user(fee_payment as u128).map_err(map_risk_error)?;
            let idx = engine.index_of(id).ok_or_else(|| map_risk_error(percolator::RiskError::InvalidIndex))?;
            engine.set_owner(idx, a_user.key.to_bytes()).map_err(map_risk_error)?;
        }

        Instruction::InitLp {
            matcher_program,
            matcher_context,
            fee_payment,
        } => {
            accounts::expect_len(accounts_list, 5)?;
            let a_user = &accounts_list[0];
            let a_slab = &accounts_list[1];
            let a_user_ata = &accounts_list[2];
            let a_vault = &accounts_list[3];
            let a_token = &accounts_list[4];

            accounts::expect_signer(a_user)?;
            accounts::expect_writable(a_slab)?;

            let mut data = a_slab.try_borrow_mut_data()?;
            slab_guard(program_id, a_slab, &data)?;
            let engine = slab_view::engine_mut(&mut data)?;
            require_initialized(engine)?;

            vault::deposit(a_token, a_user_ata, a_vault, a_user, fee_payment)?;

            let id = engine
                .add_lp(matcher_program.to_bytes(), matcher_context.to_bytes(), fee_payment as u128)
                .map_err(map_risk_error)?;
            let idx = engine.index_of(id).ok_or_else(|| map_risk_error(percolator::RiskError::InvalidIndex))?;
            engine.set_owner(idx, a_user.key.to_bytes()).map_err(map_risk_error)?;
        }

        Instruction::DepositCollateral { user_idx, amount } => {
            accounts::expect_len(accounts_list, 5)?;
            let a_user = &accounts_list[0];
            let a_slab = &accounts_list[1];
            let a_user_ata = &accounts_list[2];
            let a_vault = &accounts_list[3];
            let a_token = &accounts_list[4];

            accounts::expect_signer(a_user)?;
            accounts::expect_writable(a_slab)?;

            let mut data = a_slab.try_borrow_mut_data()?;
            slab_guard(program_id, a_slab, &data)?;
            let engine = slab_view::engine_mut(&mut data)?;
            require_initialized(engine)?;
            require_owner(engine, user_idx as usize, a_user.key)?;

            vault::deposit(a_token, a_user_ata, a_vault, a_user, amount)?;

            let now_slot = Clock::get()?.slot;
            engine
                .deposit(user_idx as usize, amount as u128, now_slot)
                .map_err(map_risk_error)?;
        }

        Instruction::WithdrawCollateral { user_idx, amount } => {
            accounts::expect_len(accounts_list, 7)?;
            let a_user = &accounts_list[0];
            let a_slab = &accounts_list[1];
            let a_vault = &accounts_list[2];
            let a_user_ata = &accounts_list[3];
            let a_vault_pda = &accounts_list[4];
            let a_token = &accounts_list[5];
            let a_oracle = &accounts_list[6];

            accounts::expect_signer(a_user)?;
            accounts::expect_writable(a_slab)?;

            let mut data = a_slab.try_borrow_mut_data()?;
            slab_guard(program_id, a_slab, &data)?;
            let engine = slab_view::engine_mut(&mut data)?;
            require_initialized(engine)?;
            require_owner(engine, user_idx as usize, a_user.key)?;

            let (authority_pda, bump) = accounts::derive_vault_authority(program_id, a_slab.key);
            accounts::expect_key(a_vault_pda, &authority_pda)?;
            vault::verify_vault_ata(
                a_vault,
                &Pubkey::new_from_array(engine.market.vault),
                &authority_pda,
                &Pubkey::new_from_array(engine.market.collateral_mint),
            )?;

            let now = Clock::get()?.unix_timestamp;
            let price = gated_price_e6(engine, a_oracle, now)?;

            engine
                .withdraw(user_idx as usize, amount as u128, price)
                .map_err(map_risk_error)?;

            let bump_arr = [bump];
            let seeds = vault_seeds(a_slab.key, &bump_arr);
            vault::withdraw(a_token, a_vault, a_user_ata, a_vault_pda, amount, &[&seeds])?;
        }

        Instruction::KeeperCrank { caller_idx, allow_panic } => {
            accounts::expect_len(accounts_list, 3)?;
            let a_caller = &accounts_list[0];
            let a_slab = &accounts_list[1];
            let a_oracle = &accounts_list[2];

            accounts::expect_signer(a_caller)?;
            accounts::expect_writable(a_slab)?;

            let mut data = a_slab.try_borrow_mut_data()?;
            slab_guard(program_id, a_slab, &data)?;
            let engine = slab_view::engine_mut(&mut data)?;
            require_initialized(engine)?;

            if caller_idx != percolator::constants::PERMISSIONLESS_CALLER
                && engine.is_used(caller_idx as usize)
            {
                require_owner(engine, caller_idx as usize, a_caller.key)?;
            }

            let now = Clock::get()?;
            let price = gated_price_e6(engine, a_oracle, now.unix_timestamp)?;

            engine
                .keeper_crank(caller_idx, now.slot, price, allow_panic != 0)
                .map_err(map_risk_error)?;
        }

        Instruction::TradeNoCpi { lp_idx, user_idx, size } => {
            accounts::expect_len(accounts_list, 3)?;
            let a_user = &accounts_list[0];
            let a_slab = &accounts_list[1];
            let a_oracle = &accounts_list[2];

            accounts::expect_signer(a_user)?;
            accounts::expect_writable(a_slab)?;

            let mut data = a_slab.try_borrow_mut_data()?;
            slab_guard(program_id, a_slab, &data)?;
            let engine = slab_view::engine_mut(&mut data)?;
            require_initialized(engine)?;
            require_owner(engine, user_idx as usize, a_user.key)?;

            let now = Clock::get()?;
            let price = gated_price_e6(engine, a_oracle, now.unix_timestamp)?;

            let matcher = FixedPriceMatcher;
            engine
                .execute_trade(&matcher, lp_idx as usize, user_idx as usize, now.slot, price, size)
                .map_err(map_risk_error)?;
        }

        Instruction::TradeCpi { lp_idx, user_idx, size } => {
            accounts::expect_len(accounts_list, 5)?;
            let a_user = &accounts_list[0];
            let a_slab = &accounts_list[1];
            let a_oracle = &accounts_list[2];
            let a_matcher_program = &accounts_list[3];
            let a_lp_context = &accounts_list[4];

            accounts::expect_signer(a_user)?;
            accounts::expect_writable(a_slab)?;

            let mut data = a_slab.try_borrow_mut_data()?;
            slab_guard(program_id, a_slab, &data)?;
            let engine = slab_view::engine_mut(&mut data)?;
            require_initialized(engine)?;
            require_owner(engine, user_idx as usize, a_user.key)?;

            if !engine.is_used(lp_idx as usize) {
                return Err(map_risk_error(percolator::RiskError::InvalidIndex));
            }
            if engine.accounts[lp_idx as usize].matcher_program != a_matcher_program.key.to_bytes() {
                return Err(WrapperError::InvalidMatcherAccount.into());
            }
            if engine.accounts[lp_idx as usize].matcher_context != a_lp_context.key.to_bytes() {
                return Err(WrapperError::InvalidMatcherAccount.into());
            }

            let now = Clock::get()?;
            let price = gated_price_e6(engine, a_oracle, now.unix_timestamp)?;

            let matcher = CpiMatcher {
                matcher_program: a_matcher_program,
                lp_context: a_lp_context,
            };
            engine
                .execute_trade(&matcher, lp_idx as usize, user_idx as usize, now.slot, price, size)
                .map_err(map_risk_error)?;
        }

        Instruction::LiquidateAtOracle { target_idx } => {
            accounts::expect_len(accounts_list, 3)?;
            let a_liquidator = &accounts_list[0];
            let a_slab = &accounts_list[1];
            let a_oracle = &accounts_list[2];

            accounts::expect_signer(a_liquidator)?;
            accounts::expect_writable(a_slab)?;

            let mut data = a_slab.try_borrow_mut_data()?;
            slab_guard(program_id, a_slab, &data)?;
            let engine = slab_view::engine_mut(&mut data)?;
            require_initialized(engine)?;

            let now = Clock::get()?;
            let price = gated_price_e6(engine, a_oracle, now.unix_timestamp)?;

            engine
                .liquidate_at_oracle(target_idx as usize, price, now.slot)
                .map_err(map_risk_error)?;
        }

        Instruction::CloseAccount { user_idx } => {
            accounts::expect_len(accounts_list, 2)?;
            let a_user = &accounts_list[0];
            let a_slab = &accounts_list[1];

            accounts::expect_signer(a_user)?;
            accounts::expect_writable(a_slab)?;

            let mut data = a_slab.try_borrow_mut_data()?;
            slab_guard(program_id, a_slab, &data)?;
            let engine = slab_view::engine_mut(&mut data)?;
            require_initialized(engine)?;
            require_owner(engine, user_idx as usize, a_user.key)?;

            if !engine.accounts[user_idx as usize].is_dust() {
                return Err(WrapperError::SlabNotEmpty.into());
            }
            engine.close_account(user_idx as usize).map_err(map_risk_error)?;
        }

        Instruction::TopUpInsurance { amount } => {
            accounts::expect_len(accounts_list, 5)?;
            let a_payer = &accounts_list[0];
            let a_slab = &accounts_list[1];
            let a_payer_ata = &accounts_list[2];
            let a_vault = &accounts_list[3];
            let a_token = &accounts_list[4];

            accounts::expect_signer(a_payer)?;
            accounts::expect_writable(a_slab)?;

            let mut data = a_slab.try_borrow_mut_data()?;
            slab_guard(program_id, a_slab, &data)?;
            let engine = slab_view::engine_mut(&mut data)?;
            require_initialized(engine)?;

            vault::deposit(a_token, a_payer_ata, a_vault, a_payer, amount)?;
            engine.fund_insurance(amount as u128).map_err(map_risk_error)?;
        }

        Instruction::SetRiskThreshold { new } => {
            accounts::expect_len(accounts_list, 2)?;
            let a_admin = &accounts_list[0];
            let a_slab = &accounts_list[1];

            accounts::expect_signer(a_admin)?;
            accounts::expect_writable(a_slab)?;

            let mut data = a_slab.try_borrow_mut_data()?;
            slab_guard(program_id, a_slab, &data)?;
            let engine = slab_view::engine_mut(&mut data)?;
            require_initialized(engine)?;
            require_admin(engine, a_admin.key)?;

            let mut params = engine.risk_params;
            params.risk_reduction_threshold = percolator::U128::new(new);
            engine.update_risk_params(params).map_err(map_risk_error)?;
        }

        Instruction::UpdateAdmin { new_admin } => {
            accounts::expect_len(accounts_list, 2)?;
            let a_admin = &accounts_list[0];
            let a_slab = &accounts_list[1];

            accounts::expect_signer(a_admin)?;
            accounts::expect_writable(a_slab)?;

            let mut data = a_slab.try_borrow_mut_data()?;
            slab_guard(program_id, a_slab, &data)?;
            let engine = slab_view::engine_mut(&mut data)?;
            require_initialized(engine)?;
            require_admin(engine, a_admin.key)?;

            engine.header.admin = new_admin.to_bytes();
        }

        Instruction::CloseSlab => {
            accounts::expect_len(accounts_list, 2)?;
            let a_admin = &accounts_list[0];
            let a_slab = &accounts_list[1];

            accounts::expect_signer(a_admin)?;
            accounts::expect_writable(a_slab)?;

            let data = a_slab.try_borrow_data()?;
            slab_guard(program_id, a_slab, &data)?;
            let engine = slab_view::engine_ref(&data)?;
            require_initialized(engine)?;
            require_admin(engine, a_admin.key)?;

            check_slab_empty(engine.num_used_accounts)?;
            drop(data);

            let drained = a_slab.lamports();
            **a_slab.try_borrow_mut_lamports()? = 0;
            **a_admin.try_borrow_mut_lamports()? = a_admin
                .lamports()
                .checked_add(drained)
                .ok_or(ProgramError::ArithmeticOverflow)?;
            let mut data = a_slab.try_borrow_mut_data()?;
            for byte in data.iter_mut() {
                *byte = 0;
            }
        }
    }

    Ok(())
}
