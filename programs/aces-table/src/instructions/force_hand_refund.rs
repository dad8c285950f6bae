//! src/instructions/force_hand_refund.rs
//!
//! @description
//! Escape hatch for a hand that stopped making progress, typically because a
//! computation was never finalized. Anyone may call it once the hand has been
//! idle for `STUCK_HAND_TIMEOUT_SECONDS`.
//!
//! @accounts
//! - `caller`: Any signer.
//! - `table`: The stuck `Table`.
//!
//! @logic
//! 1. Requires a running or settling hand idle for the timeout.
//! 2. Returns every seat's chips committed this hand to its stack.
//! 3. Clears the pending computation, so a late callback for it is rejected
//!    as stale, and returns the table to `AwaitingPlayers`.

use anchor_lang::prelude::*;

use crate::error::AcesTableErrorCode;
use crate::state::{GameState, Table, STUCK_HAND_TIMEOUT_SECONDS, TABLE_SEED};

pub fn force_hand_refund(ctx: Context<ForceHandRefund>, table_id: u64) -> Result<()> {
    let table = &mut ctx.accounts.table;

    require!(
        matches!(
            table.game_state,
            GameState::HandInProgress | GameState::Settling
        ),
        AcesTableErrorCode::InvalidGameState
    );
    let now = Clock::get()?.unix_timestamp;
    require!(
        now.saturating_sub(table.last_activity_at) >= STUCK_HAND_TIMEOUT_SECONDS,
        AcesTableErrorCode::HandNotStuck
    );

    // --- Refund ---
    let mut refunded = 0u64;
    for seat in table.seats.iter_mut().flatten() {
        seat.stack = seat
            .stack
            .checked_add(seat.total_bet_this_hand)
            .ok_or(AcesTableErrorCode::ArithmeticOverflow)?;
        refunded = refunded
            .checked_add(seat.total_bet_this_hand)
            .ok_or(AcesTableErrorCode::ArithmeticOverflow)?;
    }
    require!(refunded == table.pot, AcesTableErrorCode::PayoutMismatch);

    let hand_id = table.hand_id_counter;
    table.reset_hand();
    table.last_activity_at = now;

    msg!("Hand #{} at table #{} refunded {}", hand_id, table_id, refunded);
    emit!(HandRefunded {
        table_id,
        hand_id,
        refunded,
    });
    Ok(())
}

#[derive(Accounts)]
#[instruction(table_id: u64)]
pub struct ForceHandRefund<'info> {
    pub caller: Signer<'info>,
    #[account(
        mut,
        seeds = [TABLE_SEED, table_id.to_le_bytes().as_ref()],
        bump = table.bump
    )]
    pub table: Box<Account<'info, Table>>,
}

#[event]
pub struct HandRefunded {
    pub table_id: u64,
    pub hand_id: u64,
    pub refunded: u64,
}
