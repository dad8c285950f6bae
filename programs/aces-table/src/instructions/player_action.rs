//! src/instructions/player_action.rs
//!
//! @description
//! Handles a betting action by the player whose turn it is: fold, check,
//! call, bet or raise. Public state only; the cards stay sealed.
//!
//! @accounts
//! - `player`: The signer acting. Must hold the seat at `turn_position`.
//! - `table`: The `Table` account, at `["table", table_id]`.
//!
//! @logic
//! 1. Requires a hand in progress with no computation pending.
//! 2. Requires the signer's turn, an owed action, and a running turn timer.
//! 3. Applies the action to the seat and the pot.
//! 4. Passes the turn to the next seat owing an action.

use anchor_lang::prelude::*;

use crate::error::AcesTableErrorCode;
use crate::state::{GameState, PlayerAction, Table, TABLE_SEED};

pub fn player_action(
    ctx: Context<PlayerActionAccounts>,
    table_id: u64,
    action: PlayerAction,
) -> Result<()> {
    let player = ctx.accounts.player.key();
    let table = &mut ctx.accounts.table;

    // --- Validation ---
    require!(
        table.game_state == GameState::HandInProgress,
        AcesTableErrorCode::InvalidGameState
    );
    require!(
        table.pending_computation.is_none(),
        AcesTableErrorCode::ComputationPending
    );
    let index = table
        .seat_of(&player)
        .ok_or(AcesTableErrorCode::PlayerNotFound)?;
    require!(
        index == table.turn_position as usize,
        AcesTableErrorCode::NotPlayersTurn
    );
    require!(
        table.needs_action(index),
        AcesTableErrorCode::BettingRoundComplete
    );
    let now = Clock::get()?.unix_timestamp;
    let deadline = table
        .turn_started_at
        .saturating_add(table.turn_duration_seconds as i64);
    require!(now <= deadline, AcesTableErrorCode::TurnTimerExpired);

    // --- Action ---
    apply_action(table, index, action)?;
    table.seat_mut(index)?.has_acted = true;
    table.advance_turn(index as u8, now);

    msg!("Seat {} at table #{}: {:?}", index, table_id, action);
    emit!(PlayerActed {
        table_id,
        seat_index: index as u8,
        action,
        pot: table.pot,
        current_bet: table.current_bet,
    });
    Ok(())
}

/// Applies `action` for the seat at `index`. Raises name the total raised to.
pub fn apply_action(table: &mut Table, index: usize, action: PlayerAction) -> Result<()> {
    let big_blind = table.big_blind;
    let current_bet = table.current_bet;
    let seat = *table.seat_mut(index)?;
    let owed = current_bet.saturating_sub(seat.bet_this_round);

    match action {
        PlayerAction::Fold => {
            table.seat_mut(index)?.is_active_in_hand = false;
        }
        PlayerAction::Check => {
            require!(owed == 0, AcesTableErrorCode::InvalidAction);
        }
        PlayerAction::Call => {
            require!(owed > 0, AcesTableErrorCode::InvalidAction);
            // Short stacks call all-in.
            table.commit(index, owed.min(seat.stack))?;
        }
        PlayerAction::Bet { amount } => {
            require!(current_bet == 0, AcesTableErrorCode::InvalidAction);
            require!(amount > 0, AcesTableErrorCode::BetTooSmall);
            require!(amount <= seat.stack, AcesTableErrorCode::InsufficientFunds);
            require!(
                amount >= big_blind || amount == seat.stack,
                AcesTableErrorCode::BetTooSmall
            );
            table.commit(index, amount)?;
            table.current_bet = amount;
            table.last_aggressor = Some(index as u8);
        }
        PlayerAction::Raise { amount } => {
            require!(current_bet > 0, AcesTableErrorCode::InvalidAction);
            require!(amount > current_bet, AcesTableErrorCode::BetTooSmall);
            let added = amount - seat.bet_this_round;
            require!(added <= seat.stack, AcesTableErrorCode::InsufficientFunds);
            let min_raise = current_bet
                .checked_add(big_blind)
                .ok_or(AcesTableErrorCode::ArithmeticOverflow)?;
            require!(
                amount >= min_raise || added == seat.stack,
                AcesTableErrorCode::BetTooSmall
            );
            table.commit(index, added)?;
            table.current_bet = amount;
            table.last_aggressor = Some(index as u8);
        }
    }
    Ok(())
}

#[derive(Accounts)]
#[instruction(table_id: u64)]
pub struct PlayerActionAccounts<'info> {
    pub player: Signer<'info>,
    #[account(
        mut,
        seeds = [TABLE_SEED, table_id.to_le_bytes().as_ref()],
        bump = table.bump
    )]
    pub table: Box<Account<'info, Table>>,
}

#[event]
pub struct PlayerActed {
    pub table_id: u64,
    pub seat_index: u8,
    pub action: PlayerAction,
    pub pot: u64,
    pub current_bet: u64,
}
