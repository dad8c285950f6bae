//! src/instructions/create_table.rs
//!
//! @description
//! This instruction allows a player to create a new poker table. It initializes
//! a `Table` account with the specified blinds and a dedicated SPL token vault
//! holding all chips for that table. The creator is seated at seat 0 and
//! their buy-in moves into the vault in the same transaction.
//!
//! @accounts
//! - `creator`: The player creating the table, who pays for the accounts.
//! - `platform_config`: Supplies the minimum buy-in policy.
//! - `table`: The new `Table` account, at `["table", table_id]`.
//! - `token_mint`: The SPL token mint used as the table's currency.
//! - `creator_token_account`: The creator's token account paying the buy-in.
//! - `table_vault`: New token account at `["vault", table]`, owned by the table.
//!
//! @logic
//! 1. Validates `0 < small_blind < big_blind`.
//! 2. Validates the buy-in against the platform's minimum in big blinds.
//! 3. Creates the `Table` account; an address already in use fails the call.
//! 4. Creates the vault and transfers the buy-in into it.
//! 5. Seats the creator and leaves the table in `AwaitingPlayers`.

use anchor_lang::prelude::*;
use anchor_spl::token::{self, Mint, Token, TokenAccount, Transfer};

use crate::error::AcesTableErrorCode;
use crate::state::{
    GameState, PlatformConfig, Seat, Table, DEFAULT_TURN_DURATION_SECONDS, MAX_PLAYERS,
    PLATFORM_CONFIG_SEED, TABLE_SEED, VAULT_SEED,
};

/// Smallest buy-in accepted for `big_blind` under `config`.
pub fn min_buy_in(config: &PlatformConfig, big_blind: u64) -> Result<u64> {
    big_blind
        .checked_mul(config.min_buy_in_big_blinds)
        .ok_or_else(|| error!(AcesTableErrorCode::ArithmeticOverflow))
}

pub fn create_table(
    ctx: Context<CreateTable>,
    table_id: u64,
    small_blind: u64,
    big_blind: u64,
    buy_in: u64,
) -> Result<()> {
    // --- Validation ---
    require!(
        small_blind > 0 && big_blind > small_blind,
        AcesTableErrorCode::InvalidStakes
    );
    let min_buy_in = min_buy_in(&ctx.accounts.platform_config, big_blind)?;
    require!(buy_in >= min_buy_in, AcesTableErrorCode::InsufficientBuyIn);

    // --- Token Transfer ---
    let cpi_accounts = Transfer {
        from: ctx.accounts.creator_token_account.to_account_info(),
        to: ctx.accounts.table_vault.to_account_info(),
        authority: ctx.accounts.creator.to_account_info(),
    };
    let cpi_program = ctx.accounts.token_program.to_account_info();
    token::transfer(CpiContext::new(cpi_program, cpi_accounts), buy_in)?;

    // --- State Initialization ---
    let creator = ctx.accounts.creator.key();
    let mut seats = [None; MAX_PLAYERS];
    seats[0] = Some(Seat::new(creator, buy_in));
    let table = &mut ctx.accounts.table;
    table.table_id = table_id;
    table.creator = creator;
    table.token_mint = ctx.accounts.token_mint.key();
    table.seats = seats;
    table.player_count = 1;
    table.dealer_position = 0;
    table.turn_position = 0;
    table.last_aggressor = None;
    table.game_state = GameState::AwaitingPlayers;
    table.small_blind = small_blind;
    table.big_blind = big_blind;
    table.min_buy_in = min_buy_in;
    table.pot = 0;
    table.current_bet = 0;
    table.turn_started_at = 0;
    table.turn_duration_seconds = DEFAULT_TURN_DURATION_SECONDS;
    table.last_activity_at = Clock::get()?.unix_timestamp;
    table.hand_id_counter = 0;
    table.pending_computation = None;
    table.bump = ctx.bumps.table;
    table.vault_bump = ctx.bumps.table_vault;

    msg!("Table #{} created by {}", table_id, creator);
    emit!(TableCreated {
        table_id,
        creator,
        small_blind,
        big_blind,
        buy_in,
    });
    Ok(())
}

#[derive(Accounts)]
#[instruction(table_id: u64)]
pub struct CreateTable<'info> {
    #[account(mut)]
    pub creator: Signer<'info>,

    #[account(seeds = [PLATFORM_CONFIG_SEED], bump = platform_config.bump)]
    pub platform_config: Account<'info, PlatformConfig>,

    /// The new table account, a PDA seeded with "table" and the `table_id`.
    /// An address already in use fails the call.
    #[account(
        init,
        payer = creator,
        space = 8 + Table::INIT_SPACE,
        seeds = [TABLE_SEED, table_id.to_le_bytes().as_ref()],
        bump
    )]
    pub table: Box<Account<'info, Table>>,

    pub token_mint: Account<'info, Mint>,

    #[account(
        mut,
        constraint = creator_token_account.mint == token_mint.key() @ AcesTableErrorCode::InvalidTokenAccount,
        constraint = creator_token_account.owner == creator.key() @ AcesTableErrorCode::InvalidTokenAccount
    )]
    pub creator_token_account: Account<'info, TokenAccount>,

    /// Holds every chip at the table. The table PDA is its authority.
    #[account(
        init,
        payer = creator,
        token::mint = token_mint,
        token::authority = table,
        seeds = [VAULT_SEED, table.key().as_ref()],
        bump
    )]
    pub table_vault: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

#[event]
pub struct TableCreated {
    pub table_id: u64,
    pub creator: Pubkey,
    pub small_blind: u64,
    pub big_blind: u64,
    pub buy_in: u64,
}
