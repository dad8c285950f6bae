//! src/instructions/leave_table.rs
//!
//! @description
//! This instruction allows a seated player to leave a table between hands and
//! cash out their entire stack from the table vault.
//!
//! @accounts
//! - `player`: The signer leaving the table.
//! - `table`: The `Table` account being left.
//! - `table_vault`: The vault paying out the stack.
//! - `destination`: Optional token account receiving the stack. When absent the
//!   player's associated token account for the table mint is used, and created
//!   if it does not exist yet.
//! - `player_token_account`: That associated token account.
//!
//! @logic
//! 1. Rejects the call while a hand is in progress or settling.
//! 2. Transfers the full stack from the vault, signed by the table.
//! 3. Vacates the seat.

use anchor_lang::prelude::*;
use anchor_spl::associated_token::{self, get_associated_token_address, AssociatedToken, Create};
use anchor_spl::token::{self, Mint, Token, TokenAccount, Transfer};

use crate::error::AcesTableErrorCode;
use crate::state::{GameState, Table, TABLE_SEED, VAULT_SEED};

/// The instruction logic for a player to leave a table.
pub fn leave_table(ctx: Context<LeaveTable>, table_id: u64) -> Result<()> {
    let player = ctx.accounts.player.key();
    let table = &ctx.accounts.table;

    // --- Validation ---
    require!(
        table.game_state == GameState::AwaitingPlayers,
        AcesTableErrorCode::CannotLeaveMidHand
    );
    let seat_index = table
        .seat_of(&player)
        .ok_or(AcesTableErrorCode::PlayerNotFound)?;
    let stack = table.seats[seat_index].map_or(0, |seat| seat.stack);

    // --- Destination ---
    let destination = match &ctx.accounts.destination {
        Some(destination) => destination.to_account_info(),
        None => {
            let ata = ctx.accounts.player_token_account.to_account_info();
            if ata.data_is_empty() {
                let cpi_accounts = Create {
                    payer: ctx.accounts.player.to_account_info(),
                    associated_token: ata.clone(),
                    authority: ctx.accounts.player.to_account_info(),
                    mint: ctx.accounts.token_mint.to_account_info(),
                    system_program: ctx.accounts.system_program.to_account_info(),
                    token_program: ctx.accounts.token_program.to_account_info(),
                };
                let cpi_program = ctx.accounts.associated_token_program.to_account_info();
                associated_token::create(CpiContext::new(cpi_program, cpi_accounts))?;
            }
            ata
        }
    };

    // --- Token Transfer ---
    if stack > 0 {
        let table_id_bytes = table_id.to_le_bytes();
        let bump = [table.bump];
        let seeds: &[&[u8]] = &[TABLE_SEED, &table_id_bytes, &bump];
        let signer_seeds = &[seeds];

        let cpi_accounts = Transfer {
            from: ctx.accounts.table_vault.to_account_info(),
            to: destination,
            authority: table.to_account_info(), // The table PDA is the authority
        };
        let cpi_program = ctx.accounts.token_program.to_account_info();
        token::transfer(
            CpiContext::new_with_signer(cpi_program, cpi_accounts, signer_seeds),
            stack,
        )?;
    }

    // --- State Update ---
    let table = &mut ctx.accounts.table;
    table.seats[seat_index] = None;
    table.player_count = table.player_count.saturating_sub(1);

    msg!("Player {} left table #{} with {}", player, table_id, stack);
    emit!(PlayerLeft {
        table_id,
        player,
        amount: stack,
    });
    Ok(())
}

#[derive(Accounts)]
#[instruction(table_id: u64)]
pub struct LeaveTable<'info> {
    #[account(mut)]
    pub player: Signer<'info>,

    #[account(
        mut,
        seeds = [TABLE_SEED, table_id.to_le_bytes().as_ref()],
        bump = table.bump,
        has_one = token_mint @ AcesTableErrorCode::InvalidTokenAccount
    )]
    pub table: Box<Account<'info, Table>>,

    #[account(
        mut,
        seeds = [VAULT_SEED, table.key().as_ref()],
        bump = table.vault_bump
    )]
    pub table_vault: Account<'info, TokenAccount>,

    /// Receives the stack when given.
    #[account(
        mut,
        constraint = destination.mint == table.token_mint @ AcesTableErrorCode::InvalidTokenAccount
    )]
    pub destination: Option<Account<'info, TokenAccount>>,

    /// CHECK: The player's associated token account for the table mint. Used,
    /// and created if missing, when no destination is given.
    #[account(
        mut,
        address = get_associated_token_address(&player.key(), &table.token_mint)
    )]
    pub player_token_account: UncheckedAccount<'info>,

    pub token_mint: Account<'info, Mint>,
    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
}

#[event]
pub struct PlayerLeft {
    pub table_id: u64,
    pub player: Pubkey,
    pub amount: u64,
}
