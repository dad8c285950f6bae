//! src/state/constants.rs
//!
//! @description
//! Shared constants of the ledger program.
//!
//! Key Constants:
//! - MAX_PLAYERS: seats per table, 6 for "6-max" No-Limit Texas Hold'em.
//! - Defaults for the platform's rake and buy-in policy and for turn timers.
//! - Seed labels of every account the program derives for itself.

pub const MAX_PLAYERS: usize = 6;

/// 5.00%
pub const DEFAULT_RAKE_BPS: u16 = 500;
pub const MAX_RAKE_BPS: u16 = 10_000;
pub const DEFAULT_MIN_BUY_IN_BIG_BLINDS: u64 = 20;
pub const DEFAULT_TURN_DURATION_SECONDS: u32 = 30;
/// A hand without any progress for this long may be refunded.
pub const STUCK_HAND_TIMEOUT_SECONDS: i64 = 300;

pub const PLATFORM_CONFIG_SEED: &[u8] = b"platform_config";
pub const TABLE_SEED: &[u8] = b"table";
pub const VAULT_SEED: &[u8] = b"vault";
pub const HAND_SEED: &[u8] = b"hand";
