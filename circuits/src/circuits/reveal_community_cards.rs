//! src/circuits/reveal_community_cards.rs
//!
//! @description
//! The `reveal_community_cards` computation. Called once for the flop
//! (3 cards), once for the turn (1 card) and once for the river (1 card).
//!
//! @logic
//! 1. Burns the card at `deck_top`.
//! 2. Reveals the requested number of cards that follow the burn card.
//! 3. Marks the burned and revealed positions as used.
//! 4. Returns the revealed cards, padded with `INVALID_CARD`, the updated deck
//!    and the new top position.

use crate::error::CircuitError;
use crate::types::{BURNED_CARD, DECK_SIZE, INVALID_CARD};

/// The most cards revealed in a single operation (the flop).
pub const MAX_REVEAL: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reveal {
    pub cards: [u8; MAX_REVEAL],
    pub deck: [u8; DECK_SIZE],
    pub deck_top: u8,
}

pub fn reveal_community_cards(
    mut deck: [u8; DECK_SIZE],
    deck_top: u8,
    count: u8,
) -> Result<Reveal, CircuitError> {
    if count == 0 || count as usize > MAX_REVEAL {
        return Err(CircuitError::InvalidRevealCount(count));
    }
    let burn = deck_top as usize;
    let end = burn + 1 + count as usize;
    if end > DECK_SIZE {
        return Err(CircuitError::DeckExhausted { deck_top, count });
    }

    deck[burn] = BURNED_CARD;

    let mut cards = [INVALID_CARD; MAX_REVEAL];
    for (slot, position) in cards.iter_mut().zip(burn + 1..end) {
        let card = deck[position];
        if card as usize >= DECK_SIZE {
            return Err(CircuitError::InvalidCard(card));
        }
        *slot = card;
        deck[position] = BURNED_CARD;
    }

    Ok(Reveal {
        cards,
        deck,
        deck_top: end as u8,
    })
}
