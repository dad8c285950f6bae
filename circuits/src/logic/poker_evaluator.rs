//! src/logic/poker_evaluator.rs
//!
//! @description
//! Evaluates Texas Hold'em hands: picks the best 5-card hand out of 7 cards
//! (2 hole cards + 5 community cards) and ranks it for comparison.
//!
//! @logic
//! 1. Card Representation: Cards arrive as `u8` indices; rank and suit are
//!    folded into per-rank counts and per-suit rank bitmasks.
//! 2. Flush and Straight Detection: bitmask windows, including the A-2-3-4-5 wheel.
//! 3. Hand Ranking: categories are checked from Straight Flush down to High Card.
//! 4. Tie-breaking: `HandRank` carries its kickers, and its `Ord` compares the
//!    category first and the kickers second.

use std::cmp::Ordering;

use crate::error::CircuitError;
use crate::types::Card;

const NUM_RANKS: usize = 13;
const NUM_SUITS: usize = 4;
const ACE_RANK: u8 = 12; // 2=0, ..., K=11, A=12
const FIVE_RANK: u8 = 3;

/// The rank of a poker hand, including data for tie-breaking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandRank {
    StraightFlush { high_card_rank: u8 },
    FourOfAKind { quad_rank: u8, kicker_rank: u8 },
    FullHouse { three_rank: u8, pair_rank: u8 },
    Flush { ranks: [u8; 5] },
    Straight { high_card_rank: u8 },
    ThreeOfAKind { three_rank: u8, kickers: [u8; 2] },
    TwoPair { high_pair_rank: u8, low_pair_rank: u8, kicker_rank: u8 },
    OnePair { pair_rank: u8, kickers: [u8; 3] },
    HighCard { ranks: [u8; 5] },
    /// Held by the last contender standing when nobody shows cards.
    NoHand,
}

impl HandRank {
    /// Category strength, 9 for a straight flush down to 0 for `NoHand`.
    pub fn category(&self) -> u8 {
        match self {
            HandRank::StraightFlush { .. } => 9,
            HandRank::FourOfAKind { .. } => 8,
            HandRank::FullHouse { .. } => 7,
            HandRank::Flush { .. } => 6,
            HandRank::Straight { .. } => 5,
            HandRank::ThreeOfAKind { .. } => 4,
            HandRank::TwoPair { .. } => 3,
            HandRank::OnePair { .. } => 2,
            HandRank::HighCard { .. } => 1,
            HandRank::NoHand => 0,
        }
    }

    fn tiebreak(&self) -> [u8; 5] {
        match *self {
            HandRank::StraightFlush { high_card_rank } | HandRank::Straight { high_card_rank } => {
                [high_card_rank, 0, 0, 0, 0]
            }
            HandRank::FourOfAKind { quad_rank, kicker_rank } => [quad_rank, kicker_rank, 0, 0, 0],
            HandRank::FullHouse { three_rank, pair_rank } => [three_rank, pair_rank, 0, 0, 0],
            HandRank::Flush { ranks } | HandRank::HighCard { ranks } => ranks,
            HandRank::ThreeOfAKind { three_rank, kickers } => {
                [three_rank, kickers[0], kickers[1], 0, 0]
            }
            HandRank::TwoPair { high_pair_rank, low_pair_rank, kicker_rank } => {
                [high_pair_rank, low_pair_rank, kicker_rank, 0, 0]
            }
            HandRank::OnePair { pair_rank, kickers } => {
                [pair_rank, kickers[0], kickers[1], kickers[2], 0]
            }
            HandRank::NoHand => [0; 5],
        }
    }
}

impl Ord for HandRank {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.category(), self.tiebreak()).cmp(&(other.category(), other.tiebreak()))
    }
}

impl PartialOrd for HandRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Highest card of the best straight contained in `mask`, if any.
fn straight_high(mask: u16) -> Option<u8> {
    (FIVE_RANK..=ACE_RANK).rev().find(|high| {
        let window: u16 = if *high == FIVE_RANK {
            0b1111 | (1 << ACE_RANK)
        } else {
            0b1_1111 << (high - 4)
        };
        mask & window == window
    })
}

/// The `N` highest ranks present in `mask`, skipping `exclude`.
fn top_ranks<const N: usize>(mask: u16, exclude: &[u8]) -> [u8; N] {
    let mut ranks = [0u8; N];
    let present = (0..NUM_RANKS as u8)
        .rev()
        .filter(|rank| mask & (1 << rank) != 0 && !exclude.contains(rank));
    for (slot, rank) in ranks.iter_mut().zip(present) {
        *slot = rank;
    }
    ranks
}

/// Evaluates the best 5-card hand from 7 card indices.
pub fn evaluate_7_cards(cards: [u8; 7]) -> Result<HandRank, CircuitError> {
    // --- Data Preparation ---
    let mut rank_counts = [0u8; NUM_RANKS];
    let mut suit_masks = [0u16; NUM_SUITS];
    let mut seen = 0u64;
    for index in cards {
        let card = Card::from_index(index)?;
        if seen & (1 << index) != 0 {
            return Err(CircuitError::DuplicateCard(index));
        }
        seen |= 1 << index;
        rank_counts[card.rank as usize] += 1;
        suit_masks[card.suit as usize] |= 1 << card.rank;
    }
    let rank_mask = suit_masks.iter().fold(0u16, |acc, mask| acc | mask);

    // --- Flush / Straight Flush ---
    let flush_mask = suit_masks.iter().copied().find(|mask| mask.count_ones() >= 5);
    if let Some(high_card_rank) = flush_mask.and_then(straight_high) {
        return Ok(HandRank::StraightFlush { high_card_rank });
    }

    // --- Count Ranks, Ace down to Two ---
    let ranks_with = |count: u8| -> Vec<u8> {
        (0..NUM_RANKS as u8)
            .rev()
            .filter(|rank| rank_counts[*rank as usize] == count)
            .collect()
    };
    let quads = ranks_with(4);
    let trips = ranks_with(3);
    let pairs = ranks_with(2);

    if let Some(&quad_rank) = quads.first() {
        let [kicker_rank] = top_ranks::<1>(rank_mask, &[quad_rank]);
        return Ok(HandRank::FourOfAKind { quad_rank, kicker_rank });
    }

    if let Some(&three_rank) = trips.first() {
        // A second set of trips plays as the pair.
        let pair_rank = match (trips.get(1), pairs.first()) {
            (Some(a), Some(b)) => Some(*a.max(b)),
            (Some(a), None) => Some(*a),
            (None, Some(b)) => Some(*b),
            (None, None) => None,
        };
        if let Some(pair_rank) = pair_rank {
            return Ok(HandRank::FullHouse { three_rank, pair_rank });
        }
    }

    if let Some(mask) = flush_mask {
        return Ok(HandRank::Flush { ranks: top_ranks::<5>(mask, &[]) });
    }

    if let Some(high_card_rank) = straight_high(rank_mask) {
        return Ok(HandRank::Straight { high_card_rank });
    }

    if let Some(&three_rank) = trips.first() {
        return Ok(HandRank::ThreeOfAKind {
            three_rank,
            kickers: top_ranks::<2>(rank_mask, &[three_rank]),
        });
    }

    if pairs.len() >= 2 {
        let (high_pair_rank, low_pair_rank) = (pairs[0], pairs[1]);
        let [kicker_rank] = top_ranks::<1>(rank_mask, &[high_pair_rank, low_pair_rank]);
        return Ok(HandRank::TwoPair { high_pair_rank, low_pair_rank, kicker_rank });
    }

    if let Some(&pair_rank) = pairs.first() {
        return Ok(HandRank::OnePair {
            pair_rank,
            kickers: top_ranks::<3>(rank_mask, &[pair_rank]),
        });
    }

    Ok(HandRank::HighCard { ranks: top_ranks::<5>(rank_mask, &[]) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(rank: u8, suit: u8) -> u8 {
        Card { rank, suit }.index()
    }

    #[test]
    fn test_wheel_straight_is_five_high() {
        let cards = [card(12, 0), card(0, 1), card(1, 2), card(2, 3), card(3, 0), card(9, 1), card(7, 2)];
        assert_eq!(evaluate_7_cards(cards).unwrap(), HandRank::Straight { high_card_rank: 3 });
    }

    #[test]
    fn test_straight_flush_beats_quads() {
        let straight_flush =
            [card(8, 2), card(9, 2), card(10, 2), card(11, 2), card(12, 2), card(0, 0), card(0, 1)];
        let quads = [card(5, 0), card(5, 1), card(5, 2), card(5, 3), card(12, 0), card(1, 1), card(2, 2)];
        let a = evaluate_7_cards(straight_flush).unwrap();
        let b = evaluate_7_cards(quads).unwrap();
        assert_eq!(a, HandRank::StraightFlush { high_card_rank: 12 });
        assert_eq!(b, HandRank::FourOfAKind { quad_rank: 5, kicker_rank: 12 });
        assert!(a > b);
    }

    #[test]
    fn test_two_trips_make_full_house() {
        let cards = [card(11, 0), card(11, 1), card(11, 2), card(4, 0), card(4, 1), card(4, 2), card(2, 3)];
        assert_eq!(
            evaluate_7_cards(cards).unwrap(),
            HandRank::FullHouse { three_rank: 11, pair_rank: 4 }
        );
    }

    #[test]
    fn test_flush_uses_top_five_of_suit() {
        let cards = [card(0, 1), card(3, 1), card(5, 1), card(7, 1), card(9, 1), card(11, 1), card(12, 0)];
        assert_eq!(
            evaluate_7_cards(cards).unwrap(),
            HandRank::Flush { ranks: [11, 9, 7, 5, 3] }
        );
    }

    #[test]
    fn test_kicker_breaks_pair_tie() {
        let board = [card(12, 0), card(12, 1), card(7, 2), card(5, 3), card(2, 0)];
        let with_king = [card(11, 2), card(0, 3), board[0], board[1], board[2], board[3], board[4]];
        let with_queen = [card(10, 2), card(0, 1), board[0], board[1], board[2], board[3], board[4]];
        assert!(evaluate_7_cards(with_king).unwrap() > evaluate_7_cards(with_queen).unwrap());
    }

    #[test]
    fn test_third_pair_can_be_the_kicker() {
        let cards = [card(9, 0), card(9, 1), card(6, 0), card(6, 1), card(10, 2), card(10, 3), card(1, 0)];
        assert_eq!(
            evaluate_7_cards(cards).unwrap(),
            HandRank::TwoPair { high_pair_rank: 10, low_pair_rank: 9, kicker_rank: 6 }
        );
    }

    #[test]
    fn test_rejects_duplicates_and_bad_indices() {
        let dup = [0, 0, 1, 2, 3, 4, 5];
        assert_eq!(evaluate_7_cards(dup), Err(CircuitError::DuplicateCard(0)));
        let bad = [0, 1, 2, 3, 4, 5, 255];
        assert_eq!(evaluate_7_cards(bad), Err(CircuitError::InvalidCard(255)));
    }

    #[test]
    fn test_no_hand_ranks_lowest() {
        let high = HandRank::HighCard { ranks: [5, 4, 3, 1, 0] };
        assert!(HandRank::NoHand < high);
    }
}
