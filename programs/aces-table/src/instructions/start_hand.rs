//! src/instructions/start_hand.rs
//!
//! @description
//! Starts a new hand and queues the confidential shuffle. Also holds the
//! callback that receives the shuffled deck and the sealed hole cards.
//!
//! @accounts
//! - `table`: The `Table` account. Must be waiting for players.
//! - `hand_data`: The new `HandData`, at `["hand", table, hand_id]`.
//! - Compute accounts for queueing `shuffle_and_deal`, all seed-checked.
//!
//! @logic
//! `start_hand`:
//! 1. Requires at least two seated players with chips and nothing pending.
//! 2. Increments the hand counter and creates the hand record.
//! 3. Deals every funded seat in, rotates the dealer button.
//! 4. Queues `shuffle_and_deal`; any failure, including a computation offset
//!    already in use, aborts the transaction with no state change.
//!
//! `shuffle_and_deal_callback`:
//! 1. Accepts only the finalization of the table's pending shuffle.
//! 2. Stores the sealed deck, commitment and hole cards.
//! 3. Posts the blinds (heads-up, the dealer posts the small blind) and opens
//!    pre-flop betting.

use anchor_lang::prelude::*;

use crate::circuit::{CircuitKind, ShuffleAndDealInput, ShuffleAndDealOutput};
use crate::compute::{CallbackAccount, ComputationAccount, MxeAccount, COMPUTE_PROGRAM_ID};
use crate::error::AcesTableErrorCode;
use crate::pda::{
    CLUSTER_SEED, COMPUTATION_SEED, COMP_DEF_SEED, EXECPOOL_SEED, MEMPOOL_SEED, MXE_SEED,
    SIGN_PDA_SEED,
};
use crate::queue::{queue_computation, queue_computation_accounts, verify_callback};
use crate::state::{
    BettingRound, GameState, HandData, PendingComputation, SealedHand, Table, HAND_SEED,
    MAX_PLAYERS, TABLE_SEED,
};

pub fn start_hand(
    ctx: Context<StartHand>,
    table_id: u64,
    computation_offset: u64,
    seat_keys: [[u8; 32]; MAX_PLAYERS],
) -> Result<()> {
    let table_key = ctx.accounts.table.key();
    let hand_key = ctx.accounts.hand_data.key();
    let table = &ctx.accounts.table;

    // --- Validation ---
    require!(
        table.game_state == GameState::AwaitingPlayers,
        AcesTableErrorCode::InvalidGameState
    );
    require!(
        table.pending_computation.is_none(),
        AcesTableErrorCode::ComputationPending
    );
    let mut active_seats = [false; MAX_PLAYERS];
    for (i, seat) in table.seats.iter().enumerate() {
        active_seats[i] = seat.is_some_and(|seat| seat.stack > 0);
    }
    require!(
        active_seats.iter().filter(|active| **active).count() >= 2,
        AcesTableErrorCode::NotEnoughPlayers
    );
    for (i, active) in active_seats.iter().enumerate() {
        require!(
            !*active || seat_keys[i] != [0u8; 32],
            AcesTableErrorCode::InvalidEncryptionKey
        );
    }
    let hand_id = table
        .hand_id_counter
        .checked_add(1)
        .ok_or(AcesTableErrorCode::ArithmeticOverflow)?;

    // --- Queue ---
    let inputs = ShuffleAndDealInput {
        seat_keys,
        active_seats,
    };
    queue_computation(
        &*ctx.accounts,
        ctx.bumps.sign_pda_account,
        CircuitKind::ShuffleAndDeal,
        computation_offset,
        &inputs,
        vec![
            CallbackAccount {
                pubkey: table_key,
                is_writable: true,
            },
            CallbackAccount {
                pubkey: hand_key,
                is_writable: true,
            },
        ],
    )?;

    // --- Hand Record ---
    let hand_bump = ctx.bumps.hand_data;
    ctx.accounts
        .hand_data
        .set_inner(HandData::new(table_key, hand_id, seat_keys, hand_bump));

    // --- State Update ---
    let now = Clock::get()?.unix_timestamp;
    let table = &mut ctx.accounts.table;
    for (i, seat) in table.seats.iter_mut().enumerate() {
        if let Some(seat) = seat {
            seat.is_active_in_hand = active_seats[i];
            seat.is_all_in = false;
            seat.has_acted = false;
            seat.bet_this_round = 0;
            seat.total_bet_this_hand = 0;
        }
    }
    table.dealer_position = table
        .next_funded_seat(table.dealer_position)
        .ok_or(AcesTableErrorCode::NotEnoughPlayers)?;
    table.hand_id_counter = hand_id;
    table.pot = 0;
    table.current_bet = 0;
    table.last_aggressor = None;
    table.game_state = GameState::HandInProgress;
    table.pending_computation = Some(PendingComputation {
        computation_offset,
        circuit: CircuitKind::ShuffleAndDeal,
        queued_at: now,
    });
    table.last_activity_at = now;

    msg!("Hand #{} started at table #{}", hand_id, table_id);
    emit!(HandStarted {
        table_id,
        hand_id,
        dealer_position: table.dealer_position,
        computation_offset,
    });
    Ok(())
}

pub fn shuffle_and_deal_callback(
    ctx: Context<StartHandCallback>,
    output: ShuffleAndDealOutput,
) -> Result<()> {
    verify_callback(
        &ctx.accounts.mxe_account,
        &ctx.accounts.computation.key(),
        &ctx.accounts.computation,
        &ctx.accounts.table,
        CircuitKind::ShuffleAndDeal,
    )?;
    let table = &mut ctx.accounts.table;
    let hand = &mut ctx.accounts.hand_data;
    require!(
        hand.betting_round == BettingRound::Dealing,
        AcesTableErrorCode::InvalidGameState
    );

    // --- Sealed Cards ---
    for i in 0..MAX_PLAYERS {
        let Some(seat) = table.seats[i].filter(|seat| seat.is_active_in_hand) else {
            continue;
        };
        let sealed = output.hands[i].ok_or(AcesTableErrorCode::AbortedComputation)?;
        require!(
            sealed.encryption_key == hand.seat_keys[i],
            AcesTableErrorCode::AbortedComputation
        );
        hand.hands[i] = Some(SealedHand {
            player: seat.player,
            ciphertext: sealed.ciphertext,
            nonce: sealed.nonce,
            encryption_key: sealed.encryption_key,
        });
    }
    hand.encrypted_deck = output.encrypted_deck;
    hand.deck_nonce = output.deck_nonce;
    hand.shuffle_commitment = output.shuffle_commitment;
    hand.deck_top = output.deck_top;
    hand.betting_round = BettingRound::PreFlop;

    // --- Blinds ---
    let dealer = table.dealer_position;
    let (small_blind_seat, big_blind_seat) = if table.contender_count() == 2 {
        let big = table
            .next_dealt_seat(dealer)
            .ok_or(AcesTableErrorCode::NotEnoughPlayers)?;
        (dealer, big)
    } else {
        let small = table
            .next_dealt_seat(dealer)
            .ok_or(AcesTableErrorCode::NotEnoughPlayers)?;
        let big = table
            .next_dealt_seat(small)
            .ok_or(AcesTableErrorCode::NotEnoughPlayers)?;
        (small, big)
    };
    let (small_blind, big_blind) = (table.small_blind, table.big_blind);
    post_blind(table, small_blind_seat, small_blind)?;
    post_blind(table, big_blind_seat, big_blind)?;
    table.current_bet = big_blind;
    table.last_aggressor = Some(big_blind_seat);
    table.turn_position = big_blind_seat;

    table.advance_turn(big_blind_seat, Clock::get()?.unix_timestamp);
    table.pending_computation = None;

    msg!(
        "Hand #{} dealt, blinds posted by seats {} and {}",
        hand.hand_id,
        small_blind_seat,
        big_blind_seat
    );
    emit!(HoleCardsDealt {
        table_id: table.table_id,
        hand_id: hand.hand_id,
        small_blind_seat,
        big_blind_seat,
        pot: table.pot,
    });
    Ok(())
}

/// Posts a blind, all-in if the stack is short.
fn post_blind(table: &mut Table, seat: u8, blind: u64) -> Result<()> {
    let index = seat as usize;
    let amount = blind.min(table.seat_mut(index)?.stack);
    table.commit(index, amount)
}

#[derive(Accounts)]
#[instruction(table_id: u64, computation_offset: u64)]
pub struct StartHand<'info> {
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
            CircuitKind::ShuffleAndDeal.comp_def_offset().to_le_bytes().as_ref()
        ],
        bump,
        seeds::program = COMPUTE_PROGRAM_ID
    )]
    pub comp_def: UncheckedAccount<'info>,
    /// CHECK: Created by the compute program. In use means the offset is taken.
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
        init,
        payer = payer,
        space = 8 + HandData::INIT_SPACE,
        seeds = [
            HAND_SEED,
            table.key().as_ref(),
            table.hand_id_counter.wrapping_add(1).to_le_bytes().as_ref()
        ],
        bump
    )]
    pub hand_data: Box<Account<'info, HandData>>,
}

queue_computation_accounts!(StartHand);

/// Signed by the cluster authority. The first four accounts are the same for
/// every callback; the rest are the ones recorded when queueing.
#[derive(Accounts)]
pub struct StartHandCallback<'info> {
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
            CircuitKind::ShuffleAndDeal.comp_def_offset().to_le_bytes().as_ref()
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
pub struct HandStarted {
    pub table_id: u64,
    pub hand_id: u64,
    pub dealer_position: u8,
    pub computation_offset: u64,
}

#[event]
pub struct HoleCardsDealt {
    pub table_id: u64,
    pub hand_id: u64,
    pub small_blind_seat: u8,
    pub big_blind_seat: u8,
    pub pot: u64,
}
