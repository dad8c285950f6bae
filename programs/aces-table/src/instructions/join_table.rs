//! src/instructions/join_table.rs
//!
//! @description
//! This instruction allows a player to take a vacant seat at an existing table
//! by depositing a buy-in into the table's vault.
//!
//! @accounts
//! - `player`: The signer joining the table.
//! - `table`: The `Table` account being joined.
//! - `player_token_account`: The player's token account paying the buy-in.
//! - `table_vault`: The table's vault receiving the buy-in.
//!
//! @logic
//! 1. Requires the table to be between hands and the requested seat vacant.
//! 2. Rejects players already seated and buy-ins under the table minimum.
//! 3. Transfers the buy-in into the vault and seats the player.

use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::error::AcesTableErrorCode;
use crate::pda;
use crate::state::{GameState, Seat, Table, TABLE_SEED, VAULT_SEED};

pub fn join_table(
    ctx: Context<JoinTable>,
    table_id: u64,
    seat_index: u8,
    buy_in: u64,
) -> Result<()> {
    let player = ctx.accounts.player.key();
    let table = &ctx.accounts.table;

    // --- Validation ---
    let seat = pda::seat_index(seat_index)?;
    require!(
        table.game_state == GameState::AwaitingPlayers && table.seats[seat].is_none(),
        AcesTableErrorCode::SeatUnavailable
    );
    require!(table.seat_of(&player).is_none(), AcesTableErrorCode::AlreadySeated);
    require!(buy_in >= table.min_buy_in, AcesTableErrorCode::InsufficientBuyIn);

    // --- Token Transfer ---
    let cpi_accounts = Transfer {
        from: ctx.accounts.player_token_account.to_account_info(),
        to: ctx.accounts.table_vault.to_account_info(),
        authority: ctx.accounts.player.to_account_info(),
    };
    let cpi_program = ctx.accounts.token_program.to_account_info();
    token::transfer(CpiContext::new(cpi_program, cpi_accounts), buy_in)?;

    // --- State Update ---
    let table = &mut ctx.accounts.table;
    table.seats[seat] = Some(Seat::new(player, buy_in));
    table.player_count += 1;

    msg!("Player {} joined table #{} at seat {}", player, table_id, seat);
    emit!(PlayerJoined {
        table_id,
        player,
        seat_index,
        buy_in,
    });
    Ok(())
}

#[derive(Accounts)]
#[instruction(table_id: u64)]
pub struct JoinTable<'info> {
    pub player: Signer<'info>,

    #[account(
        mut,
        seeds = [TABLE_SEED, table_id.to_le_bytes().as_ref()],
        bump = table.bump
    )]
    pub table: Box<Account<'info, Table>>,

    #[account(
        mut,
        constraint = player_token_account.mint == table.token_mint @ AcesTableErrorCode::InvalidTokenAccount,
        constraint = player_token_account.owner == player.key() @ AcesTableErrorCode::InvalidTokenAccount
    )]
    pub player_token_account: Account<'info, TokenAccount>,

    #[account(
        mut,
        seeds = [VAULT_SEED, table.key().as_ref()],
        bump = table.vault_bump
    )]
    pub table_vault: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}

#[event]
pub struct PlayerJoined {
    pub table_id: u64,
    pub player: Pubkey,
    pub seat_index: u8,
    pub buy_in: u64,
}
