//! Cross-program matcher (spec.md §6 tag 10, §5 "Matcher call"): the
//! genuine-CPI counterpart to `TradeNoCpi`'s in-process
//! `percolator::FixedPriceMatcher`. No sibling fork models this path —
//! every retrieved wrapper stubs its LP matcher with a `NoOpMatcher`
//! rather than actually calling out — so this is built from Solana's
//! own CPI/return-data convention rather than adapted from a reference.

use alloc::vec;
use alloc::vec::Vec;

use solana_program::account_info::AccountInfo;
use solana_program::instruction::{AccountMeta, Instruction};
use solana_program::program::{get_return_data, invoke};
use solana_program::pubkey::Pubkey;

use percolator::{MatchingEngine, RiskError, TradeExecution};

/// Quotes by CPI-ing into the LP's registered `matcher_program`,
/// passing `matcher_context` as a read-only account plus the lp's
/// account id, the gated oracle price, and the requested size as
/// instruction data. The matcher reports its fill through
/// `set_return_data` — the only channel back, since there's no shared
/// memory between programs.
///
/// Reentrancy (spec.md §5: "the matcher cannot reenter the core") is
/// ruled out by construction rather than by a guard flag here: the
/// slab account's mutable borrow is held for the whole trade, so a
/// matcher that tried to call back into any instruction touching this
/// slab would hit the runtime's already-borrowed-account panic before
/// this code ran again.
pub struct CpiMatcher<'a, 'info> {
    pub matcher_program: &'a AccountInfo<'info>,
    pub lp_context: &'a AccountInfo<'info>,
}

impl<'a, 'info> MatchingEngine for CpiMatcher<'a, 'info> {
    fn execute_match(
        &self,
        lp_program: &[u8; 32],
        lp_context: &[u8; 32],
        lp_account_id: u64,
        oracle_price: u64,
        size: i128,
    ) -> Result<TradeExecution, RiskError> {
        if self.matcher_program.key.to_bytes() != *lp_program {
            return Err(RiskError::MatcherContextInvalid);
        }
        if self.lp_context.key.to_bytes() != *lp_context {
            return Err(RiskError::MatcherContextInvalid);
        }

        let mut data: Vec<u8> = Vec::with_capacity(32);
        data.extend_from_slice(&lp_account_id.to_le_bytes());
        data.extend_from_slice(&oracle_price.to_le_bytes());
        data.extend_from_slice(&size.to_le_bytes());

        let ix = Instruction {
            program_id: Pubkey::new_from_array(*lp_program),
            accounts: vec![AccountMeta::new_readonly(*self.lp_context.key, false)],
            data,
        };

        invoke(&ix, &[self.lp_context.clone(), self.matcher_program.clone()])
            .map_err(|_| RiskError::MatcherRejected)?;

        let (returned_program, payload) =
            get_return_data().ok_or(RiskError::MatcherReturnedBadPrice)?;
        if returned_program != *self.matcher_program.key || payload.len() != 24 {
            return Err(RiskError::MatcherReturnedBadPrice);
        }

        let fill_size = i128::from_le_bytes(payload[0..16].try_into().unwrap());
        let fill_price_e6 = u64::from_le_bytes(payload[16..24].try_into().unwrap());

        Ok(TradeExecution { fill_size, fill_price_e6 })
    }
}
