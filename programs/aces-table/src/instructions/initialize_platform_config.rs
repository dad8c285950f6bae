//! src/instructions/initialize_platform_config.rs
//!
//! @description
//! Creates the `PlatformConfig` singleton with the signer as admin. Called
//! once after the program is deployed; a second call fails because the
//! account already exists.
//!
//! @accounts
//! - `admin`: Signer, becomes the platform admin and pays for the account.
//! - `platform_config`: The singleton, at `["platform_config"]`.
//! - `treasury_vault`: Wallet receiving the rake.

use anchor_lang::prelude::*;

use crate::state::{
    PlatformConfig, DEFAULT_MIN_BUY_IN_BIG_BLINDS, DEFAULT_RAKE_BPS, PLATFORM_CONFIG_SEED,
};

pub fn initialize_platform_config(ctx: Context<InitializePlatformConfig>) -> Result<()> {
    let config = &mut ctx.accounts.platform_config;
    config.admin = ctx.accounts.admin.key();
    config.treasury_vault = ctx.accounts.treasury_vault.key();
    config.rake_bps = DEFAULT_RAKE_BPS;
    config.rake_max_cap = 0; // Default no cap
    config.min_buy_in_big_blinds = DEFAULT_MIN_BUY_IN_BIG_BLINDS;
    config.bump = ctx.bumps.platform_config;

    msg!("Platform config initialized, admin {}", config.admin);
    Ok(())
}

/// Context for initializing the `PlatformConfig` account.
#[derive(Accounts)]
pub struct InitializePlatformConfig<'info> {
    #[account(mut)]
    pub admin: Signer<'info>,
    #[account(
        init,
        payer = admin,
        space = 8 + PlatformConfig::INIT_SPACE,
        seeds = [PLATFORM_CONFIG_SEED],
        bump
    )]
    pub platform_config: Account<'info, PlatformConfig>,
    /// CHECK: Wallet receiving the rake; only its address is stored.
    pub treasury_vault: UncheckedAccount<'info>,
    pub system_program: Program<'info, System>,
}
