//! src/lib.rs
//!
//! @description
//! This is the main entry point for the Aces Table ledger program.
//! It defines the program's instructions, state accounts, and custom errors.
//! The program orchestrates the public aspects of the poker game, such as
//! managing tables, seats, the pot and player actions, while delegating all
//! confidential logic (card shuffling, dealing, showdowns) to the compute
//! cluster through queued computations and their finalization callbacks.
//!
//! The program is built using the Anchor framework. The compute program it
//! queues work with is described in `compute`.

use anchor_lang::prelude::*;

// Import local modules.
pub mod circuit;
pub mod compute;
pub mod error;
pub mod pda;
pub mod queue;
pub mod state;
pub mod instructions;

// Make their contents available for the program.
use circuit::*;
use instructions::*;

pub use circuit::CircuitKind;
pub use error::AcesTableErrorCode;

// Program ID
declare_id!("Ghk63Nsobgg9SfowtV2XR6WSHbmkd87YQuoLdQBMLNCz");

#[program]
pub mod aces_table {
    use super::*;

    // ========================================
    // Admin & Table Management Instructions
    // ========================================

    /// Creates the `PlatformConfig` singleton with the signer as admin.
    /// Called once after the program is deployed.
    pub fn initialize_platform_config(ctx: Context<InitializePlatformConfig>) -> Result<()> {
        instructions::initialize_platform_config::initialize_platform_config(ctx)
    }

    /// Instruction for the platform admin to update rake parameters.
    pub fn update_rake_params(
        ctx: Context<UpdateRakeParams>,
        new_rake_bps: u16,
        new_rake_max_cap: u64,
    ) -> Result<()> {
        instructions::update_rake_params::update_rake_params(ctx, new_rake_bps, new_rake_max_cap)
    }

    /// Instruction for a player to create a new poker table.
    pub fn create_table(
        ctx: Context<CreateTable>,
        table_id: u64,
        small_blind: u64,
        big_blind: u64,
        buy_in: u64,
    ) -> Result<()> {
        instructions::create_table::create_table(ctx, table_id, small_blind, big_blind, buy_in)
    }

    /// Instruction for a player to take a vacant seat at an existing table.
    pub fn join_table(
        ctx: Context<JoinTable>,
        table_id: u64,
        seat_index: u8,
        buy_in: u64,
    ) -> Result<()> {
        instructions::join_table::join_table(ctx, table_id, seat_index, buy_in)
    }

    /// Instruction for a player to leave a table and cash out their chips.
    pub fn leave_table(ctx: Context<LeaveTable>, table_id: u64) -> Result<()> {
        instructions::leave_table::leave_table(ctx, table_id)
    }

    // ========================================
    // Computation Definitions
    // ========================================

    pub fn init_shuffle_and_deal_comp_def(ctx: Context<InitCompDef>) -> Result<()> {
        instructions::init_comp_defs::init_comp_def(ctx, CircuitKind::ShuffleAndDeal)
    }

    pub fn init_reveal_community_cards_comp_def(ctx: Context<InitCompDef>) -> Result<()> {
        instructions::init_comp_defs::init_comp_def(ctx, CircuitKind::RevealCommunityCards)
    }

    pub fn init_evaluate_hands_and_payout_comp_def(ctx: Context<InitCompDef>) -> Result<()> {
        instructions::init_comp_defs::init_comp_def(ctx, CircuitKind::EvaluateHandsAndPayout)
    }

    // ========================================
    // Hand Lifecycle Instructions
    // ========================================

    /// Starts a new hand and queues the shuffle/deal computation.
    pub fn start_hand(
        ctx: Context<StartHand>,
        table_id: u64,
        computation_offset: u64,
        seat_keys: [[u8; 32]; 6],
    ) -> Result<()> {
        instructions::start_hand::start_hand(ctx, table_id, computation_offset, seat_keys)
    }

    /// Reveals the next community cards (flop, turn, or river).
    pub fn deal_community_cards(
        ctx: Context<DealCommunityCards>,
        table_id: u64,
        computation_offset: u64,
    ) -> Result<()> {
        instructions::deal_community_cards::deal_community_cards(ctx, table_id, computation_offset)
    }

    /// Queues the showdown evaluation that splits the pot.
    pub fn resolve_showdown(
        ctx: Context<ResolveShowdown>,
        table_id: u64,
        computation_offset: u64,
    ) -> Result<()> {
        instructions::resolve_showdown::resolve_showdown(ctx, table_id, computation_offset)
    }

    // ========================================
    // Player Action & Timeout Instructions
    // ========================================

    /// The main instruction for a player to take an action (fold, check, call, bet, raise).
    pub fn player_action(
        ctx: Context<PlayerActionAccounts>,
        table_id: u64,
        action: crate::state::PlayerAction,
    ) -> Result<()> {
        instructions::player_action::player_action(ctx, table_id, action)
    }

    /// Instruction for anyone to fold a player whose turn timer has expired.
    pub fn force_player_fold(ctx: Context<ForcePlayerFold>, table_id: u64) -> Result<()> {
        instructions::force_player_fold::force_player_fold(ctx, table_id)
    }

    /// Safety instruction to refund all bets if a hand becomes unrecoverably stuck.
    pub fn force_hand_refund(ctx: Context<ForceHandRefund>, table_id: u64) -> Result<()> {
        instructions::force_hand_refund::force_hand_refund(ctx, table_id)
    }

    // ========================================
    // Computation Callbacks
    // ========================================

    /// Callback for the `start_hand` instruction's `shuffle_and_deal` computation.
    pub fn shuffle_and_deal_callback(
        ctx: Context<StartHandCallback>,
        output: ShuffleAndDealOutput,
    ) -> Result<()> {
        instructions::start_hand::shuffle_and_deal_callback(ctx, output)
    }

    /// Callback for the `deal_community_cards` instruction's `reveal_community_cards` computation.
    pub fn reveal_community_cards_callback(
        ctx: Context<DealCommunityCardsCallback>,
        output: RevealCommunityCardsOutput,
    ) -> Result<()> {
        instructions::deal_community_cards::reveal_community_cards_callback(ctx, output)
    }

    /// Callback for the `resolve_showdown` instruction's `evaluate_hands_and_payout` computation.
    pub fn evaluate_hands_and_payout_callback(
        ctx: Context<ResolveShowdownCallback>,
        output: EvaluateHandsAndPayoutOutput,
    ) -> Result<()> {
        instructions::resolve_showdown::evaluate_hands_and_payout_callback(ctx, output)
    }
}
