//! src/circuits/shuffle_and_deal.rs
//!
//! @description
//! The `shuffle_and_deal` computation: shuffles a fresh deck and deals two
//! hole cards to every active seat.
//!
//! @logic
//! 1. Initializes a standard 52-card deck.
//! 2. Shuffles it with the cluster's random number generator.
//! 3. Deals one card to each active seat in seat order, then a second round,
//!    mimicking a real deal.
//! 4. Returns the full shuffled deck and the position of the next undealt card.
//!    Sealing the deck for the cluster and each hand for its seat happens in
//!    the cluster, after this function returns.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::CircuitError;
use crate::types::{DECK_SIZE, MAX_PLAYERS};

/// Result of a shuffle: the ordered deck plus the hole cards dealt from its top.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deal {
    pub deck: [u8; DECK_SIZE],
    pub hands: [Option<[u8; 2]>; MAX_PLAYERS],
    /// Index of the first card not yet dealt.
    pub deck_top: u8,
}

pub fn shuffle_and_deal<R: Rng + ?Sized>(
    rng: &mut R,
    active_seats: [bool; MAX_PLAYERS],
) -> Result<Deal, CircuitError> {
    let active = active_seats.iter().filter(|active| **active).count();
    if active < 2 {
        return Err(CircuitError::NotEnoughPlayers(active));
    }

    // 1. Shuffle the deck
    let mut deck: [u8; DECK_SIZE] = core::array::from_fn(|i| i as u8);
    deck.shuffle(rng);

    // 2. Deal two rounds of hole cards
    let mut dealt = [[0u8; 2]; MAX_PLAYERS];
    let mut top = 0usize;
    for round in 0..2 {
        for seat in 0..MAX_PLAYERS {
            if active_seats[seat] {
                dealt[seat][round] = deck[top];
                top += 1;
            }
        }
    }

    let mut hands = [None; MAX_PLAYERS];
    for seat in 0..MAX_PLAYERS {
        if active_seats[seat] {
            hands[seat] = Some(dealt[seat]);
        }
    }

    Ok(Deal {
        deck,
        hands,
        deck_top: top as u8,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_deals_distinct_cards_to_active_seats() {
        let mut rng = StdRng::seed_from_u64(7);
        let active = [true, false, true, true, false, false];
        let deal = shuffle_and_deal(&mut rng, active).unwrap();

        assert_eq!(deal.deck_top, 6);
        assert!(deal.hands[1].is_none() && deal.hands[4].is_none());

        let mut seen = std::collections::HashSet::new();
        for hand in deal.hands.iter().flatten() {
            for card in hand {
                assert!(*card < DECK_SIZE as u8);
                assert!(seen.insert(*card));
            }
        }
        assert_eq!(seen.len(), 6);
        // Cards come off the top of the deck round-robin.
        assert_eq!(deal.hands[0].unwrap(), [deal.deck[0], deal.deck[3]]);
    }

    #[test]
    fn test_same_seed_same_shuffle() {
        let active = [true, true, false, false, false, false];
        let a = shuffle_and_deal(&mut StdRng::seed_from_u64(11), active).unwrap();
        let b = shuffle_and_deal(&mut StdRng::seed_from_u64(11), active).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_needs_two_seats() {
        let mut rng = StdRng::seed_from_u64(1);
        let active = [false, false, true, false, false, false];
        assert_eq!(shuffle_and_deal(&mut rng, active), Err(CircuitError::NotEnoughPlayers(1)));
    }
}
