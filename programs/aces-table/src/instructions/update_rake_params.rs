//! src/instructions/update_rake_params.rs
//!
//! @description
//! Allows the platform admin to update the rake and buy-in policy.
//!
//! @accounts
//! - `admin`: Signer, must match `platform_config.admin`.
//! - `platform_config`: The singleton being updated.
//!
//! @logic
//! 1. Verifies the signer is the platform admin.
//! 2. Validates the new rake basis points do not exceed 100%.
//! 3. Stores the new rake parameters.

use anchor_lang::prelude::*;

use crate::error::AcesTableErrorCode;
use crate::state::{PlatformConfig, MAX_RAKE_BPS, PLATFORM_CONFIG_SEED};

/// The instruction logic for updating platform rake parameters.
///
/// # Arguments
/// * `new_rake_bps` - The new rake percentage in basis points (e.g., 500 for 5%).
/// * `new_rake_max_cap` - The new maximum rake per pot, 0 for no cap.
pub fn update_rake_params(
    ctx: Context<UpdateRakeParams>,
    new_rake_bps: u16,
    new_rake_max_cap: u64,
) -> Result<()> {
    require!(new_rake_bps <= MAX_RAKE_BPS, AcesTableErrorCode::InvalidRakeParams);

    let config = &mut ctx.accounts.platform_config;
    config.rake_bps = new_rake_bps;
    config.rake_max_cap = new_rake_max_cap;

    msg!(
        "Rake parameters updated: new_rake_bps = {}, new_rake_max_cap = {}",
        new_rake_bps,
        new_rake_max_cap
    );
    emit!(RakeParamsUpdated {
        rake_bps: new_rake_bps,
        rake_max_cap: new_rake_max_cap,
    });
    Ok(())
}

#[derive(Accounts)]
pub struct UpdateRakeParams<'info> {
    pub admin: Signer<'info>,
    /// The `has_one` constraint ties the signer to the stored admin.
    #[account(
        mut,
        seeds = [PLATFORM_CONFIG_SEED],
        bump = platform_config.bump,
        has_one = admin @ AcesTableErrorCode::Unauthorized
    )]
    pub platform_config: Account<'info, PlatformConfig>,
}

#[event]
pub struct RakeParamsUpdated {
    pub rake_bps: u16,
    pub rake_max_cap: u64,
}
