//! src/types.rs
//!
//! @description
//! Core data structures shared by the circuits. Cards travel as `u8` indices
//! (`suit * 13 + rank`); decks and hands are packed six bits per card so the
//! cluster can seal them into fixed-size ciphertexts.
//!
//! Key Structs:
//! - Card: rank and suit of a single playing card.
//! - Deck: a 52-card deck packed into three u128 chunks.
//! - Hand: two hole cards packed into a single u128.

use crate::error::CircuitError;

/// Seats at a table.
pub const MAX_PLAYERS: usize = 6;
/// Cards in a standard deck.
pub const DECK_SIZE: usize = 52;
/// Padding value for card slots that carry nothing.
pub const INVALID_CARD: u8 = 255;
/// Marks a deck position that was burned or already dealt. Fits in six bits.
pub const BURNED_CARD: u8 = 63;

const RANKS: u8 = 13;
const BITS_PER_CARD: u32 = 6;
const CARD_MASK: u128 = 0b11_1111;
const CARDS_PER_CHUNK: usize = 21;

/// A single playing card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Card {
    /// 0 = Two, 1 = Three, ..., 9 = Jack, 10 = Queen, 11 = King, 12 = Ace.
    pub rank: u8,
    /// 0 = Clubs, 1 = Diamonds, 2 = Hearts, 3 = Spades.
    pub suit: u8,
}

impl Card {
    /// Packs the card into its deck index (0-51).
    pub fn index(&self) -> u8 {
        self.suit * RANKS + self.rank
    }

    pub fn from_index(index: u8) -> Result<Self, CircuitError> {
        if index as usize >= DECK_SIZE {
            return Err(CircuitError::InvalidCard(index));
        }
        Ok(Card {
            rank: index % RANKS,
            suit: index / RANKS,
        })
    }
}

/// A 52-card deck, packed into three u128 values.
/// Chunks 0 and 1 hold 21 cards each, chunk 2 holds the last 10.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deck {
    pub chunks: [u128; 3],
}

impl Deck {
    pub fn from_array(cards: &[u8; DECK_SIZE]) -> Result<Deck, CircuitError> {
        let mut chunks = [0u128; 3];
        for (position, card) in cards.iter().enumerate() {
            if *card as u128 > CARD_MASK {
                return Err(CircuitError::InvalidCard(*card));
            }
            let shift = (position % CARDS_PER_CHUNK) as u32 * BITS_PER_CARD;
            chunks[position / CARDS_PER_CHUNK] |= (*card as u128) << shift;
        }
        Ok(Deck { chunks })
    }

    pub fn to_array(&self) -> [u8; DECK_SIZE] {
        let mut cards = [0u8; DECK_SIZE];
        for (position, card) in cards.iter_mut().enumerate() {
            let shift = (position % CARDS_PER_CHUNK) as u32 * BITS_PER_CARD;
            *card = ((self.chunks[position / CARDS_PER_CHUNK] >> shift) & CARD_MASK) as u8;
        }
        cards
    }

    pub fn to_bytes(&self) -> [u8; 48] {
        let mut bytes = [0u8; 48];
        for (i, chunk) in self.chunks.iter().enumerate() {
            bytes[i * 16..(i + 1) * 16].copy_from_slice(&chunk.to_le_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8; 48]) -> Deck {
        let mut chunks = [0u128; 3];
        for (i, chunk) in chunks.iter_mut().enumerate() {
            let mut word = [0u8; 16];
            word.copy_from_slice(&bytes[i * 16..(i + 1) * 16]);
            *chunk = u128::from_le_bytes(word);
        }
        Deck { chunks }
    }
}

/// A player's two hole cards. Card 1 uses the low six bits, card 2 the next six.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hand {
    pub cards_packed: u128,
}

impl Hand {
    pub fn from_array(cards: [u8; 2]) -> Self {
        let cards_packed = (cards[0] as u128 & CARD_MASK)
            | ((cards[1] as u128 & CARD_MASK) << BITS_PER_CARD);
        Self { cards_packed }
    }

    pub fn to_array(&self) -> [u8; 2] {
        [
            (self.cards_packed & CARD_MASK) as u8,
            ((self.cards_packed >> BITS_PER_CARD) & CARD_MASK) as u8,
        ]
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        self.cards_packed.to_le_bytes()
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self {
            cards_packed: u128::from_le_bytes(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_index_layout() {
        let ace_of_spades = Card { rank: 12, suit: 3 };
        assert_eq!(ace_of_spades.index(), 51);
        assert_eq!(Card::from_index(0).unwrap(), Card { rank: 0, suit: 0 });
        assert_eq!(Card::from_index(52), Err(CircuitError::InvalidCard(52)));
    }

    #[test]
    fn test_deck_packing_keeps_order() {
        let mut cards = [0u8; DECK_SIZE];
        for (i, card) in cards.iter_mut().enumerate() {
            *card = (DECK_SIZE - 1 - i) as u8;
        }
        cards[7] = BURNED_CARD;
        let deck = Deck::from_array(&cards).unwrap();
        assert_eq!(deck.to_array(), cards);
        assert_eq!(Deck::from_bytes(&deck.to_bytes()), deck);
    }

    #[test]
    fn test_deck_rejects_wide_values() {
        let mut cards = [0u8; DECK_SIZE];
        cards[3] = INVALID_CARD;
        assert_eq!(Deck::from_array(&cards), Err(CircuitError::InvalidCard(INVALID_CARD)));
    }

    #[test]
    fn test_hand_packing() {
        let hand = Hand::from_array([51, 13]);
        assert_eq!(hand.to_array(), [51, 13]);
        assert_eq!(Hand::from_bytes(hand.to_bytes()), hand);
    }
}
