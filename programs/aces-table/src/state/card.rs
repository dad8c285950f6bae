//! src/state/card.rs
//!
//! @description
//! Public representation of a single playing card, used for the revealed
//! community cards. Confidential cards travel as packed `u8` indices
//! (`suit * 13 + rank`) inside sealed ciphertexts.

use anchor_lang::prelude::*;

#[derive(InitSpace, AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Card {
    /// 0 = Two, 1 = Three, ..., 9 = Jack, 10 = Queen, 11 = King, 12 = Ace.
    pub rank: u8,
    /// 0 = Clubs, 1 = Diamonds, 2 = Hearts, 3 = Spades.
    pub suit: u8,
}

impl Card {
    pub fn from_index(index: u8) -> Option<Card> {
        (index < 52).then(|| Card {
            rank: index % 13,
            suit: index / 13,
        })
    }

    pub fn index(&self) -> u8 {
        self.suit * 13 + self.rank
    }
}
