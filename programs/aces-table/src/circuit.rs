//! src/circuit.rs
//!
//! @description
//! Static registry of the confidential computations this program invokes.
//! Every circuit is a `CircuitKind` variant; its name, computation
//! definition offset, init method and callback method are all derived from
//! the variant, so no instruction name is ever assembled from strings at
//! runtime.
//!
//! The typed inputs and outputs of each circuit live here as well. Inputs are
//! Borsh-encoded into the computation account when queued; outputs arrive as
//! the argument of the matching callback instruction.

use std::fmt;

use anchor_lang::prelude::*;
use anchor_lang::solana_program::hash::hash;

use crate::state::MAX_PLAYERS;

#[derive(InitSpace, AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CircuitKind {
    ShuffleAndDeal,
    RevealCommunityCards,
    EvaluateHandsAndPayout,
}

impl CircuitKind {
    pub const ALL: [CircuitKind; 3] = [
        CircuitKind::ShuffleAndDeal,
        CircuitKind::RevealCommunityCards,
        CircuitKind::EvaluateHandsAndPayout,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            CircuitKind::ShuffleAndDeal => "shuffle_and_deal",
            CircuitKind::RevealCommunityCards => "reveal_community_cards",
            CircuitKind::EvaluateHandsAndPayout => "evaluate_hands_and_payout",
        }
    }

    /// First four bytes of SHA-256 of the circuit name, read little-endian.
    pub fn comp_def_offset(self) -> u32 {
        let digest = hash(self.name().as_bytes()).to_bytes();
        u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
    }

    pub const fn init_method(self) -> &'static str {
        match self {
            CircuitKind::ShuffleAndDeal => "init_shuffle_and_deal_comp_def",
            CircuitKind::RevealCommunityCards => "init_reveal_community_cards_comp_def",
            CircuitKind::EvaluateHandsAndPayout => "init_evaluate_hands_and_payout_comp_def",
        }
    }

    pub const fn callback_method(self) -> &'static str {
        match self {
            CircuitKind::ShuffleAndDeal => "shuffle_and_deal_callback",
            CircuitKind::RevealCommunityCards => "reveal_community_cards_callback",
            CircuitKind::EvaluateHandsAndPayout => "evaluate_hands_and_payout_callback",
        }
    }
}

impl fmt::Display for CircuitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value sealed by the cluster for the holder of `encryption_key`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SealedCards {
    pub ciphertext: [u8; 16],
    pub nonce: u128,
    pub encryption_key: [u8; 32],
}

// --- shuffle_and_deal ---

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ShuffleAndDealInput {
    pub seat_keys: [[u8; 32]; MAX_PLAYERS],
    pub active_seats: [bool; MAX_PLAYERS],
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ShuffleAndDealOutput {
    pub encrypted_deck: [u8; 48],
    pub deck_nonce: u128,
    pub shuffle_commitment: [u8; 32],
    pub hands: [Option<SealedCards>; MAX_PLAYERS],
    pub deck_top: u8,
}

// --- reveal_community_cards ---

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RevealCommunityCardsInput {
    pub encrypted_deck: [u8; 48],
    pub deck_nonce: u128,
    pub deck_top: u8,
    pub count: u8,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RevealCommunityCardsOutput {
    /// Revealed card indices, padded with 255.
    pub cards: [u8; 3],
    pub encrypted_deck: [u8; 48],
    pub deck_nonce: u128,
    pub deck_top: u8,
}

// --- evaluate_hands_and_payout ---

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct EvaluateHandsInput {
    /// Sealed hole cards of contenders only.
    pub hands: [Option<SealedCards>; MAX_PLAYERS],
    /// Revealed board, 255 where a card was never dealt.
    pub community_cards: [u8; 5],
    pub bets: [u64; MAX_PLAYERS],
    pub contenders: [bool; MAX_PLAYERS],
    pub dealer: u8,
    pub rake: u64,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct EvaluateHandsAndPayoutOutput {
    pub payouts: [u64; MAX_PLAYERS],
    pub hand_ranks: [u8; MAX_PLAYERS],
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_comp_def_offsets_are_little_endian() {
        assert_eq!(CircuitKind::ShuffleAndDeal.comp_def_offset(), 3_112_458_016);
        assert_eq!(CircuitKind::RevealCommunityCards.comp_def_offset(), 4_155_963_019);
        assert_eq!(CircuitKind::EvaluateHandsAndPayout.comp_def_offset(), 251_425_288);
    }

    #[test]
    fn test_registry_is_unique() {
        let offsets: HashSet<u32> = CircuitKind::ALL.iter().map(|c| c.comp_def_offset()).collect();
        let inits: HashSet<&str> = CircuitKind::ALL.iter().map(|c| c.init_method()).collect();
        let callbacks: HashSet<&str> = CircuitKind::ALL.iter().map(|c| c.callback_method()).collect();
        assert_eq!(offsets.len(), 3);
        assert_eq!(inits.len(), 3);
        assert_eq!(callbacks.len(), 3);
        for circuit in CircuitKind::ALL {
            assert!(circuit.init_method().contains(circuit.name()));
            assert!(circuit.callback_method().starts_with(circuit.name()));
        }
    }
}
