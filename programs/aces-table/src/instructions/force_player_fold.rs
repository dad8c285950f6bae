//! src/instructions/force_player_fold.rs
//!
//! @description
//! Folds the acting player once their turn timer has run out. Anyone may call
//! it, which keeps a table moving when a player disconnects.
//!
//! @accounts
//! - `caller`: Any signer.
//! - `table`: The `Table` account.
//!
//! @logic
//! 1. Requires a hand in progress and an action owed by the turn seat.
//! 2. Requires `now > turn_started_at + turn_duration_seconds`.
//! 3. Folds the seat and passes the turn on; the betting round order is unchanged.

use anchor_lang::prelude::*;

use crate::error::AcesTableErrorCode;
use crate::instructions::player_action::apply_action;
use crate::state::{GameState, PlayerAction, Table, TABLE_SEED};

pub fn force_player_fold(ctx: Context<ForcePlayerFold>, table_id: u64) -> Result<()> {
    let table = &mut ctx.accounts.table;

    require!(
        table.game_state == GameState::HandInProgress,
        AcesTableErrorCode::InvalidGameState
    );
    require!(
        table.pending_computation.is_none(),
        AcesTableErrorCode::ComputationPending
    );
    let index = table.turn_position as usize;
    require!(
        table.needs_action(index),
        AcesTableErrorCode::BettingRoundComplete
    );
    let now = Clock::get()?.unix_timestamp;
    let deadline = table
        .turn_started_at
        .saturating_add(table.turn_duration_seconds as i64);
    require!(now > deadline, AcesTableErrorCode::TurnTimerNotExpired);

    let player = table.seat_mut(index)?.player;
    apply_action(table, index, PlayerAction::Fold)?;
    table.seat_mut(index)?.has_acted = true;
    table.advance_turn(index as u8, now);

    msg!("Seat {} at table #{} folded on timeout", index, table_id);
    emit!(PlayerForceFolded {
        table_id,
        seat_index: index as u8,
        player,
    });
    Ok(())
}

#[derive(Accounts)]
#[instruction(table_id: u64)]
pub struct ForcePlayerFold<'info> {
    pub caller: Signer<'info>,
    #[account(
        mut,
        seeds = [TABLE_SEED, table_id.to_le_bytes().as_ref()],
        bump = table.bump
    )]
    pub table: Box<Account<'info, Table>>,
}

#[event]
pub struct PlayerForceFolded {
    pub table_id: u64,
    pub seat_index: u8,
    pub player: Pubkey,
}
