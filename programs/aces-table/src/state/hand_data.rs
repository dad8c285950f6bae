//! src/state/hand_data.rs
//!
//! @description
//! Defines the `HandData` account, which stores the confidential and
//! per-hand state for a single hand of poker. It is created by `start_hand`
//! at an address derived from the table and the new hand counter, filled in
//! by the computation callbacks and kept after settlement as an audit record.
//!
//! Key features:
//! - Stores the deck sealed for the cluster, plus the shuffle commitment.
//! - Stores each player's hole cards, sealed for that player's key.
//! - Tracks the betting round and the revealed community cards.
//! - Records the showdown result once the pot is settled.

use anchor_lang::prelude::*;

use crate::state::card::Card;
use crate::state::constants::MAX_PLAYERS;

#[account]
#[derive(InitSpace, Debug, PartialEq, Eq)]
pub struct HandData {
    pub table: Pubkey,
    pub hand_id: u64,
    pub betting_round: BettingRound,
    /// Public encryption key each seat's hole cards are sealed for.
    pub seat_keys: [[u8; 32]; MAX_PLAYERS],
    pub hands: [Option<SealedHand>; MAX_PLAYERS],
    /// The deck, sealed for the cluster only. Positions below `deck_top` are used.
    pub encrypted_deck: [u8; 48],
    pub deck_nonce: u128,
    pub deck_top: u8,
    pub shuffle_commitment: [u8; 32],
    /// Flop, turn and river. `None` if not yet dealt.
    pub community_cards: [Option<Card>; 5],
    pub rake: u64,
    pub showdown: Option<ShowdownResult>,
    pub is_settled: bool,
    pub bump: u8,
}

/// One player's hole cards, sealed for that player.
#[derive(InitSpace, AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SealedHand {
    pub player: Pubkey,
    pub ciphertext: [u8; 16],
    pub nonce: u128,
    pub encryption_key: [u8; 32],
}

#[derive(InitSpace, AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShowdownResult {
    pub payouts: [u64; MAX_PLAYERS],
    /// Hand category per seat, 0 (no hand shown) to 9 (straight flush).
    /// `u8::MAX` for seats that did not contend.
    pub hand_ranks: [u8; MAX_PLAYERS],
    pub rake: u64,
}

/// Betting rounds of a hand of Texas Hold'em. `Dealing` lasts until the
/// shuffle callback lands.
#[derive(InitSpace, AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BettingRound {
    Dealing,
    PreFlop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl BettingRound {
    /// Community cards revealed when leaving this round, and where they go.
    pub fn next_reveal(&self) -> Option<(u8, usize)> {
        match self {
            BettingRound::PreFlop => Some((3, 0)),
            BettingRound::Flop => Some((1, 3)),
            BettingRound::Turn => Some((1, 4)),
            _ => None,
        }
    }

    pub fn next(&self) -> BettingRound {
        match self {
            BettingRound::Dealing => BettingRound::PreFlop,
            BettingRound::PreFlop => BettingRound::Flop,
            BettingRound::Flop => BettingRound::Turn,
            BettingRound::Turn => BettingRound::River,
            BettingRound::River | BettingRound::Showdown => BettingRound::Showdown,
        }
    }
}

impl HandData {
    pub fn new(table: Pubkey, hand_id: u64, seat_keys: [[u8; 32]; MAX_PLAYERS], bump: u8) -> Self {
        Self {
            table,
            hand_id,
            betting_round: BettingRound::Dealing,
            seat_keys,
            hands: [None; MAX_PLAYERS],
            encrypted_deck: [0; 48],
            deck_nonce: 0,
            deck_top: 0,
            shuffle_commitment: [0; 32],
            community_cards: [None; 5],
            rake: 0,
            showdown: None,
            is_settled: false,
            bump,
        }
    }

    pub fn flop_seen(&self) -> bool {
        self.community_cards[0].is_some()
    }
}
