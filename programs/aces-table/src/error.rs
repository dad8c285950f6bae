//! src/error.rs
//!
//! @description
//! This module defines the custom error codes for the Aces Table ledger program.
//! Clients map these codes back into their own error taxonomy, so every
//! rejection a counterparty can cause has a distinct code.
//!
//! @dependencies
//! - `anchor_lang`: Provides the `error_code` macro for defining custom errors.

use anchor_lang::prelude::*;

#[error_code]
pub enum AcesTableErrorCode {
    // ========================================
    // Admin & Table Management Errors
    // ========================================
    #[msg("Unauthorized: Signer is not the platform admin.")]
    Unauthorized,

    #[msg("Invalid Stakes: Blinds must satisfy 0 < small blind < big blind.")]
    InvalidStakes,

    #[msg("Invalid Buy-in: Buy-in amount is insufficient.")]
    InsufficientBuyIn,

    #[msg("Invalid Token Account: Wrong mint or owner for this table.")]
    InvalidTokenAccount,

    #[msg("Seat is unavailable: occupied, or the table is mid-hand.")]
    SeatUnavailable,

    #[msg("Seat index is out of range.")]
    InvalidSeatIndex,

    #[msg("Player is already seated at this table.")]
    AlreadySeated,

    #[msg("Player not found at this table.")]
    PlayerNotFound,

    #[msg("Cannot leave the table while a hand is in progress.")]
    CannotLeaveMidHand,

    #[msg("Rake parameters are out of range.")]
    InvalidRakeParams,

    // ========================================
    // Gameplay Errors
    // ========================================
    #[msg("Invalid Game State: The action is not valid in the current game state.")]
    InvalidGameState,

    #[msg("Not enough players to start a hand.")]
    NotEnoughPlayers,

    #[msg("It is not this player's turn to act.")]
    NotPlayersTurn,

    #[msg("Turn timer has expired.")]
    TurnTimerExpired,

    #[msg("Turn timer has not expired yet.")]
    TurnTimerNotExpired,

    #[msg("Invalid Action: The attempted move is not allowed.")]
    InvalidAction,

    #[msg("Bet is too small. Must be at least the minimum raise.")]
    BetTooSmall,

    #[msg("Insufficient funds to perform this action.")]
    InsufficientFunds,

    #[msg("The current betting round is not complete.")]
    BettingRoundIncomplete,

    #[msg("The current betting round is already complete.")]
    BettingRoundComplete,

    #[msg("A seat public encryption key is missing.")]
    InvalidEncryptionKey,

    #[msg("The hand has made progress recently and is not stuck.")]
    HandNotStuck,

    #[msg("Arithmetic overflow.")]
    ArithmeticOverflow,

    // ========================================
    // Computation Errors
    // ========================================
    #[msg("A computation is already pending for this table.")]
    ComputationPending,

    #[msg("The callback does not match the table's pending computation.")]
    StaleComputation,

    #[msg("Callback signer is not the cluster authority.")]
    InvalidCallbackAuthority,

    #[msg("The computation definition is not initialized.")]
    ComputationDefinitionNotInitialized,

    #[msg("The MXE account is not initialized.")]
    MxeNotInitialized,

    #[msg("Payouts plus rake do not add up to the pot.")]
    PayoutMismatch,

    #[msg("The computation output is malformed.")]
    AbortedComputation,
}
