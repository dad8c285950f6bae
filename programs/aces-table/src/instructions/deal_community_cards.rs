//! src/instructions/deal_community_cards.rs
//!
//! @description
//! Moves a hand to its next street. `deal_community_cards` queues the reveal
//! of the flop, turn or river once the current betting round is closed, and
//! `reveal_community_cards_callback` publishes the cards the cluster revealed.
//!
//! @accounts
//! - `table`: The `Table` account.
//! - `hand_data`: The current hand's `HandData`.
//! - Compute accounts for queueing `reveal_community_cards`.
//!
//! @logic
//! 1. Requires the round to be pre-flop, flop or turn, at least two contenders,
//!    and every contender either matched the current bet, all-in, or folded.
//! 2. Queues a reveal of 3 (flop) or 1 (turn, river) cards after a burn card.
//! 3. The callback stores the cards, advances the round, clears round bets and
//!    gives the turn to the first contender after the dealer.

use anchor_lang::prelude::*;

use crate::circuit::{CircuitKind, RevealCommunityCardsInput, RevealCommunityCardsOutput};
use crate::compute::{CallbackAccount, ComputationAccount, MxeAccount, COMPUTE_PROGRAM_ID};
use crate::error::AcesTableErrorCode;
use crate::pda::{
    CLUSTER_SEED, COMPUTATION_SEED, COMP_DEF_SEED, EXECPOOL_SEED, MEMPOOL_SEED, MXE_SEED,
    SIGN_PDA_SEED,
};
use crate::queue::{queue_computation, queue_computation_accounts, verify_callback};
use crate::state::{Card, GameState, HandData, PendingComputation, Table, HAND_SEED, TABLE_SEED};

pub fn deal_community_cards(
    ctx: Context<DealCommunityCards>,
    table_id: u64,
    computation_offset: u64,
) -> Result<()> {
    let table = &ctx.accounts.table;
    let hand = &ctx.accounts.hand_data;

    // --- Validation ---
    require!(
        table.game_state == GameState::HandInProgress,
        AcesTableErrorCode::InvalidGameState
    );
    require!(
        table.pending_computation.is_none(),
        AcesTableErrorCode::ComputationPending
    );
    let (count, _) = hand
        .betting_round
        .next_reveal()
        .ok_or(AcesTableErrorCode::InvalidGameState)?;
    require!(
        table.contender_count() >= 2,
        AcesTableErrorCode::NotEnoughPlayers
    );
    require!(
        table.is_betting_round_complete(),
        AcesTableErrorCode::BettingRoundIncomplete
    );

    // --- Queue ---
    let inputs = RevealCommunityCardsInput {
        encrypted_deck: hand.encrypted_deck,
        deck_nonce: hand.deck_nonce,
        deck_top: hand.deck_top,
        count,
    };
    let hand_id = hand.hand_id;
    let callback_accounts = vec![
        CallbackAccount {
            pubkey: table.key(),
            is_writable: true,
        },
        CallbackAccount {
            pubkey: hand.key(),
            is_writable: true,
        },
    ];
    queue_computation(
        &*ctx.accounts,
        ctx.bumps.sign_pda_account,
        CircuitKind::RevealCommunityCards,
        computation_offset,
        &inputs,
        callback_accounts,
    )?;

    let now = Clock::get()?.unix_timestamp;
    let table = &mut ctx.accounts.table;
    table.pending_computation = Some(PendingComputation {
        computation_offset,
        circuit: CircuitKind::RevealCommunityCards,
        queued_at: now,
    });
    table.last_activity_at = now;

    msg!(
        "Revealing {} card(s) for hand #{} at table #{}",
        count,
        hand_id,
        table_id
    );
    Ok(())
}

pub fn reveal_community_cards_callback(
    ctx: Context<DealCommunityCardsCallback>,
    output: RevealCommunityCardsOutput,
) -> Result<()> {
    verify_callback(
        &ctx.accounts.mxe_account,
        &ctx.accounts.computation.key(),
        &ctx.accounts.computation,
        &ctx.accounts.table,
        CircuitKind::RevealCommunityCards,
    )?;
    let table = &mut ctx.accounts.table;
    let hand = &mut ctx.accounts.hand_data;
    let (count, start) = hand
        .betting_round
        .next_reveal()
        .ok_or(AcesTableErrorCode::InvalidGameState)?;

    // --- Cards ---
    for k in 0..count as usize {
        let card = Card::from_index(output.cards[k]).ok_or(AcesTableErrorCode::AbortedComputation)?;
        hand.community_cards[start + k] = Some(card);
    }
    hand.encrypted_deck = output.encrypted_deck;
    hand.deck_nonce = output.deck_nonce;
    hand.deck_top = output.deck_top;
    hand.betting_round = hand.betting_round.next();

    // --- Next Round ---
    table.reset_round();
    table.turn_position = table.dealer_position;
    let dealer = table.dealer_position;
    table.advance_turn(dealer, Clock::get()?.unix_timestamp);
    table.pending_computation = None;

    msg!("Hand #{} entered {:?}", hand.hand_id, hand.betting_round);
    emit!(CommunityCardsDealt {
        table_id: table.table_id,
        hand_id: hand.hand_id,
        cards: output.cards[..count as usize].to_vec(),
    });
    Ok(())
}

#[derive(Accounts)]
#[instruction(table_id: u64, computation_offset: u64)]
pub struct DealCommunityCards<'info> {
    #[account(mut)]
    pub payer: Signer<'info>,
    #[account(
        seeds = [MXE_SEED, crate::ID.as_ref()],
        bump = mxe_account.bump,
        seeds::program = COMPUTE_PROGRAM_ID
    )]
    pub mxe_account: Account<'info, MxeAccount>,
    /// CHECK: Written by the compute program.
    #[account(
        mut,
        seeds = [MEMPOOL_SEED, mxe_account.cluster_offset.to_le_bytes().as_ref()],
        bump,
        seeds::program = COMPUTE_PROGRAM_ID
    )]
    pub mempool: UncheckedAccount<'info>,
    /// CHECK: Written by the compute program.
    #[account(
        mut,
        seeds = [EXECPOOL_SEED, mxe_account.cluster_offset.to_le_bytes().as_ref()],
        bump,
        seeds::program = COMPUTE_PROGRAM_ID
    )]
    pub executing_pool: UncheckedAccount<'info>,
    /// CHECK: Written by the compute program.
    #[account(
        mut,
        seeds = [CLUSTER_SEED, mxe_account.cluster_offset.to_le_bytes().as_ref()],
        bump,
        seeds::program = COMPUTE_PROGRAM_ID
    )]
    pub cluster: UncheckedAccount<'info>,
    /// CHECK: Must be initialized, checked when queueing.
    #[account(
        seeds = [
            COMP_DEF_SEED,
            crate::ID.as_ref(),
            CircuitKind::RevealCommunityCards.comp_def_offset().to_le_bytes().as_ref()
        ],
        bump,
        seeds::program = COMPUTE_PROGRAM_ID
    )]
    pub comp_def: UncheckedAccount<'info>,
    /// CHECK: Created by the compute program.
    #[account(
        mut,
        seeds = [
            COMPUTATION_SEED,
            mxe_account.cluster_offset.to_le_bytes().as_ref(),
            computation_offset.to_le_bytes().as_ref()
        ],
        bump,
        seeds::program = COMPUTE_PROGRAM_ID
    )]
    pub computation: UncheckedAccount<'info>,
    pub system_program: Program<'info, System>,
    /// CHECK: Fixed program id.
    #[account(address = COMPUTE_PROGRAM_ID)]
    pub compute_program: UncheckedAccount<'info>,
    /// CHECK: Signs the compute program call.
    #[account(seeds = [SIGN_PDA_SEED], bump)]
    pub sign_pda_account: UncheckedAccount<'info>,

    #[account(
        mut,
        seeds = [TABLE_SEED, table_id.to_le_bytes().as_ref()],
        bump = table.bump
    )]
    pub table: Box<Account<'info, Table>>,
    #[account(
        seeds = [HAND_SEED, table.key().as_ref(), table.hand_id_counter.to_le_bytes().as_ref()],
        bump = hand_data.bump
    )]
    pub hand_data: Box<Account<'info, HandData>>,
}

queue_computation_accounts!(DealCommunityCards);

#[derive(Accounts)]
pub struct DealCommunityCardsCallback<'info> {
    #[account(mut)]
    pub cluster_authority: Signer<'info>,
    #[account(
        seeds = [MXE_SEED, crate::ID.as_ref()],
        bump = mxe_account.bump,
        seeds::program = COMPUTE_PROGRAM_ID,
        constraint = mxe_account.authority == cluster_authority.key() @ AcesTableErrorCode::InvalidCallbackAuthority
    )]
    pub mxe_account: Account<'info, MxeAccount>,
    /// CHECK: Seed-checked.
    #[account(
        seeds = [
            COMP_DEF_SEED,
            crate::ID.as_ref(),
            CircuitKind::RevealCommunityCards.comp_def_offset().to_le_bytes().as_ref()
        ],
        bump,
        seeds::program = COMPUTE_PROGRAM_ID
    )]
    pub comp_def: UncheckedAccount<'info>,
    pub computation: Account<'info, ComputationAccount>,

    #[account(
        mut,
        seeds = [TABLE_SEED, table.table_id.to_le_bytes().as_ref()],
        bump = table.bump
    )]
    pub table: Box<Account<'info, Table>>,
    #[account(
        mut,
        seeds = [HAND_SEED, table.key().as_ref(), table.hand_id_counter.to_le_bytes().as_ref()],
        bump = hand_data.bump
    )]
    pub hand_data: Box<Account<'info, HandData>>,
}

#[event]
pub struct CommunityCardsDealt {
    pub table_id: u64,
    pub hand_id: u64,
    pub cards: Vec<u8>,
}
