//! src/state/platform_config.rs
//!
//! @description
//! Defines the `PlatformConfig` account, a singleton that holds global
//! configuration for the platform. This allows administrative control over
//! the rake and buy-in policy without a program redeploy.

use anchor_lang::prelude::*;

#[account]
#[derive(InitSpace, Debug, PartialEq, Eq)]
pub struct PlatformConfig {
    /// The wallet allowed to update platform-wide settings.
    pub admin: Pubkey,
    /// Wallet that receives the rake, paid into its associated token account
    /// for each table's mint.
    pub treasury_vault: Pubkey,
    /// The rake percentage in basis points; 500 bps is 5%.
    pub rake_bps: u16,
    /// The maximum rake taken from a single pot. 0 means uncapped.
    pub rake_max_cap: u64,
    /// Minimum buy-in, expressed in big blinds.
    pub min_buy_in_big_blinds: u64,
    pub bump: u8,
}

impl PlatformConfig {
    /// Rake owed on `pot`, in the table's smallest token unit.
    pub fn rake_for(&self, pot: u64) -> u64 {
        let rake = (pot as u128 * self.rake_bps as u128 / 10_000) as u64;
        if self.rake_max_cap > 0 {
            rake.min(self.rake_max_cap)
        } else {
            rake
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rake_is_capped() {
        let mut config = PlatformConfig {
            admin: Pubkey::default(),
            treasury_vault: Pubkey::default(),
            rake_bps: 500,
            rake_max_cap: 0,
            min_buy_in_big_blinds: 20,
            bump: 255,
        };
        assert_eq!(config.rake_for(10_000), 500);
        config.rake_max_cap = 300;
        assert_eq!(config.rake_for(10_000), 300);
        assert_eq!(config.rake_for(1_000), 50);
    }
}
