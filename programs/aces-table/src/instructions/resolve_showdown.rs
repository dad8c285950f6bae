//! src/instructions/resolve_showdown.rs
//!
//! @description
//! Settles a hand. `resolve_showdown` computes the rake and queues the
//! confidential hand evaluation; `evaluate_hands_and_payout_callback` credits
//! the winners, pays the rake to the treasury and closes the hand.
//!
//! @accounts
//! - `table`: The `Table` account.
//! - `hand_data`: The current hand's `HandData`.
//! - `platform_config`: Supplies the rake policy and the treasury.
//! - Compute accounts for queueing `evaluate_hands_and_payout`.
//!
//! The callback additionally receives the table vault and the treasury's
//! associated token account for the table mint, created on first use.
//!
//! @logic
//! 1. Allowed when river betting is closed, or when a single contender is left
//!    in any round.
//! 2. Rake is only taken from a pot contested past the flop; a hand won
//!    uncontested pays the survivor the whole pot.
//! 3. The callback requires the payouts plus the rake to equal the pot exactly
//!    and only contenders to be paid.
//! 4. Winnings go back onto stacks; the rake leaves the vault for the treasury.

use anchor_lang::prelude::*;
use anchor_spl::associated_token::{get_associated_token_address, AssociatedToken};
use anchor_spl::token::{self, Mint, Token, TokenAccount, Transfer};

use crate::circuit::{CircuitKind, EvaluateHandsAndPayoutOutput, EvaluateHandsInput, SealedCards};
use crate::compute::{CallbackAccount, ComputationAccount, MxeAccount, COMPUTE_PROGRAM_ID};
use crate::error::AcesTableErrorCode;
use crate::pda::{
    CLUSTER_SEED, COMPUTATION_SEED, COMP_DEF_SEED, EXECPOOL_SEED, MEMPOOL_SEED, MXE_SEED,
    SIGN_PDA_SEED,
};
use crate::queue::{queue_computation, queue_computation_accounts, verify_callback};
use crate::state::{
    BettingRound, GameState, HandData, PendingComputation, PlatformConfig, ShowdownResult, Table,
    HAND_SEED, MAX_PLAYERS, PLATFORM_CONFIG_SEED, TABLE_SEED, VAULT_SEED,
};

/// Rake owed on the table's pot. Nothing before the flop, and nothing when
/// the pot is uncontested.
pub fn rake_owed(config: &PlatformConfig, table: &Table, hand: &HandData) -> u64 {
    if hand.flop_seen() && table.contender_count() > 1 {
        config.rake_for(table.pot)
    } else {
        0
    }
}

pub fn resolve_showdown(
    ctx: Context<ResolveShowdown>,
    table_id: u64,
    computation_offset: u64,
) -> Result<()> {
    let table = &ctx.accounts.table;
    let hand = &ctx.accounts.hand_data;
    let config = &ctx.accounts.platform_config;

    // --- Validation ---
    require!(
        table.game_state == GameState::HandInProgress,
        AcesTableErrorCode::InvalidGameState
    );
    require!(
        table.pending_computation.is_none(),
        AcesTableErrorCode::ComputationPending
    );
    require!(
        hand.betting_round != BettingRound::Dealing,
        AcesTableErrorCode::InvalidGameState
    );
    let contenders = table.contender_count();
    require!(
        contenders == 1
            || (hand.betting_round == BettingRound::River && table.is_betting_round_complete()),
        AcesTableErrorCode::BettingRoundIncomplete
    );

    // --- Rake ---
    let rake = rake_owed(config, table, hand);

    // --- Inputs ---
    let mut inputs = EvaluateHandsInput {
        hands: [None; MAX_PLAYERS],
        community_cards: [u8::MAX; 5],
        bets: [0; MAX_PLAYERS],
        contenders: [false; MAX_PLAYERS],
        dealer: table.dealer_position,
        rake,
    };
    for (i, seat) in table.seats.iter().enumerate() {
        let Some(seat) = seat else { continue };
        inputs.bets[i] = seat.total_bet_this_hand;
        if seat.is_active_in_hand {
            inputs.contenders[i] = true;
            inputs.hands[i] = hand.hands[i].map(|sealed| SealedCards {
                ciphertext: sealed.ciphertext,
                nonce: sealed.nonce,
                encryption_key: sealed.encryption_key,
            });
        }
    }
    for (slot, card) in inputs.community_cards.iter_mut().zip(hand.community_cards) {
        if let Some(card) = card {
            *slot = card.index();
        }
    }

    // The callback's accounts, in `ResolveShowdownCallback` order.
    let table_key = table.key();
    let (vault, _) = Pubkey::find_program_address(&[VAULT_SEED, table_key.as_ref()], &crate::ID);
    let treasury = get_associated_token_address(&config.treasury_vault, &table.token_mint);
    let callback_accounts = vec![
        CallbackAccount { pubkey: table_key, is_writable: true },
        CallbackAccount { pubkey: hand.key(), is_writable: true },
        CallbackAccount { pubkey: config.key(), is_writable: false },
        CallbackAccount { pubkey: vault, is_writable: true },
        CallbackAccount { pubkey: config.treasury_vault, is_writable: false },
        CallbackAccount { pubkey: table.token_mint, is_writable: false },
        CallbackAccount { pubkey: treasury, is_writable: true },
        CallbackAccount { pubkey: token::ID, is_writable: false },
        CallbackAccount { pubkey: anchor_spl::associated_token::ID, is_writable: false },
        CallbackAccount { pubkey: System::id(), is_writable: false },
    ];
    queue_computation(
        &*ctx.accounts,
        ctx.bumps.sign_pda_account,
        CircuitKind::EvaluateHandsAndPayout,
        computation_offset,
        &inputs,
        callback_accounts,
    )?;

    // --- State Update ---
    let now = Clock::get()?.unix_timestamp;
    let hand = &mut ctx.accounts.hand_data;
    hand.rake = rake;
    let hand_id = hand.hand_id;
    let table = &mut ctx.accounts.table;
    table.game_state = GameState::Settling;
    table.pending_computation = Some(PendingComputation {
        computation_offset,
        circuit: CircuitKind::EvaluateHandsAndPayout,
        queued_at: now,
    });
    table.last_activity_at = now;

    msg!(
        "Showdown queued for hand #{} at table #{}, rake {}",
        hand_id,
        table_id,
        rake
    );
    Ok(())
}

pub fn evaluate_hands_and_payout_callback(
    ctx: Context<ResolveShowdownCallback>,
    output: EvaluateHandsAndPayoutOutput,
) -> Result<()> {
    verify_callback(
        &ctx.accounts.mxe_account,
        &ctx.accounts.computation.key(),
        &ctx.accounts.computation,
        &ctx.accounts.table,
        CircuitKind::EvaluateHandsAndPayout,
    )?;
    require!(
        ctx.accounts.table.game_state == GameState::Settling,
        AcesTableErrorCode::InvalidGameState
    );
    let rake = ctx.accounts.hand_data.rake;

    // --- Payout Check ---
    let table = &mut ctx.accounts.table;
    let mut paid = rake;
    for (i, payout) in output.payouts.iter().enumerate() {
        let contending = table.seats[i].is_some_and(|seat| seat.is_active_in_hand);
        require!(
            contending || *payout == 0,
            AcesTableErrorCode::PayoutMismatch
        );
        paid = paid
            .checked_add(*payout)
            .ok_or(AcesTableErrorCode::ArithmeticOverflow)?;
    }
    require!(paid == table.pot, AcesTableErrorCode::PayoutMismatch);

    // --- Distribution ---
    for (i, payout) in output.payouts.iter().enumerate() {
        if *payout > 0 {
            let seat = table.seat_mut(i)?;
            seat.stack = seat
                .stack
                .checked_add(*payout)
                .ok_or(AcesTableErrorCode::ArithmeticOverflow)?;
        }
    }
    if rake > 0 {
        let table_id_bytes = table.table_id.to_le_bytes();
        let bump = [table.bump];
        let seeds: &[&[u8]] = &[TABLE_SEED, &table_id_bytes, &bump];
        let signer_seeds = &[seeds];

        let cpi_accounts = Transfer {
            from: ctx.accounts.table_vault.to_account_info(),
            to: ctx.accounts.treasury_token_account.to_account_info(),
            authority: table.to_account_info(),
        };
        let cpi_program = ctx.accounts.token_program.to_account_info();
        token::transfer(
            CpiContext::new_with_signer(cpi_program, cpi_accounts, signer_seeds),
            rake,
        )?;
    }

    // --- Close Hand ---
    let mut hand_ranks = [u8::MAX; MAX_PLAYERS];
    for i in table.contenders() {
        hand_ranks[i] = output.hand_ranks[i];
    }
    let pot = table.pot;
    let hand = &mut ctx.accounts.hand_data;
    hand.showdown = Some(ShowdownResult {
        payouts: output.payouts,
        hand_ranks,
        rake,
    });
    hand.is_settled = true;
    hand.betting_round = BettingRound::Showdown;
    table.reset_hand();
    table.last_activity_at = Clock::get()?.unix_timestamp;

    msg!("Hand #{} settled at table #{}, pot {}", hand.hand_id, table.table_id, pot);
    emit!(HandSettled {
        table_id: table.table_id,
        hand_id: hand.hand_id,
        pot,
        rake,
        payouts: output.payouts,
    });
    Ok(())
}

#[derive(Accounts)]
#[instruction(table_id: u64, computation_offset: u64)]
pub struct ResolveShowdown<'info> {
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
            CircuitKind::EvaluateHandsAndPayout.comp_def_offset().to_le_bytes().as_ref()
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
        mut,
        seeds = [HAND_SEED, table.key().as_ref(), table.hand_id_counter.to_le_bytes().as_ref()],
        bump = hand_data.bump
    )]
    pub hand_data: Box<Account<'info, HandData>>,
    #[account(seeds = [PLATFORM_CONFIG_SEED], bump = platform_config.bump)]
    pub platform_config: Account<'info, PlatformConfig>,
}

queue_computation_accounts!(ResolveShowdown);

#[derive(Accounts)]
pub struct ResolveShowdownCallback<'info> {
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
            CircuitKind::EvaluateHandsAndPayout.comp_def_offset().to_le_bytes().as_ref()
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
    #[account(
        seeds = [PLATFORM_CONFIG_SEED],
        bump = platform_config.bump,
        has_one = treasury_vault
    )]
    pub platform_config: Account<'info, PlatformConfig>,
    #[account(
        mut,
        seeds = [VAULT_SEED, table.key().as_ref()],
        bump = table.vault_bump
    )]
    pub table_vault: Box<Account<'info, TokenAccount>>,
    /// CHECK: Owner of the treasury token account; matched against the config.
    pub treasury_vault: UncheckedAccount<'info>,
    #[account(address = table.token_mint)]
    pub token_mint: Box<Account<'info, Mint>>,
    #[account(
        init_if_needed,
        payer = cluster_authority,
        associated_token::mint = token_mint,
        associated_token::authority = treasury_vault
    )]
    pub treasury_token_account: Box<Account<'info, TokenAccount>>,
    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
}

#[event]
pub struct HandSettled {
    pub table_id: u64,
    pub hand_id: u64,
    pub pot: u64,
    pub rake: u64,
    pub payouts: [u64; MAX_PLAYERS],
}
