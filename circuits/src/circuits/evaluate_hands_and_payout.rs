//! src/circuits/evaluate_hands_and_payout.rs
//!
//! @description
//! The `evaluate_hands_and_payout` computation, run at showdown.
//!
//! @logic
//! 1. Ranks the best 5-card hand of every contender still in the pot.
//! 2. A lone contender is never evaluated; its cards stay private.
//! 3. Splits the pot across main and side pots via `calculate_payouts`.

use crate::error::CircuitError;
use crate::logic::{calculate_payouts, evaluate_7_cards, HandRank};
use crate::types::MAX_PLAYERS;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Showdown {
    pub ranks: [Option<HandRank>; MAX_PLAYERS],
    pub payouts: [u64; MAX_PLAYERS],
}

pub fn evaluate_hands_and_payout(
    hole_cards: [Option<[u8; 2]>; MAX_PLAYERS],
    community_cards: [u8; 5],
    bets: [u64; MAX_PLAYERS],
    contenders: [bool; MAX_PLAYERS],
    dealer: u8,
    rake: u64,
) -> Result<Showdown, CircuitError> {
    let contending = contenders.iter().filter(|c| **c).count();
    if contending == 0 {
        return Err(CircuitError::NoContenders);
    }

    let mut ranks = [None; MAX_PLAYERS];
    for seat in (0..MAX_PLAYERS).filter(|seat| contenders[*seat]) {
        ranks[seat] = Some(if contending == 1 {
            HandRank::NoHand
        } else {
            let [a, b] = hole_cards[seat].ok_or(CircuitError::MissingHand(seat))?;
            let [c1, c2, c3, c4, c5] = community_cards;
            evaluate_7_cards([a, b, c1, c2, c3, c4, c5])?
        });
    }

    let payouts = calculate_payouts(bets, ranks, dealer, rake)?;
    Ok(Showdown { ranks, payouts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Card, INVALID_CARD};

    fn card(rank: u8, suit: u8) -> u8 {
        Card { rank, suit }.index()
    }

    #[test]
    fn test_better_hand_takes_pot_minus_rake() {
        let board = [card(12, 0), card(7, 1), card(5, 2), card(2, 3), card(0, 0)];
        let mut hands = [None; MAX_PLAYERS];
        hands[0] = Some([card(12, 1), card(9, 2)]); // pair of aces
        hands[3] = Some([card(11, 1), card(9, 3)]); // king high
        let mut contenders = [false; MAX_PLAYERS];
        contenders[0] = true;
        contenders[3] = true;
        let bets = [5000, 0, 0, 5000, 0, 0];

        let showdown = evaluate_hands_and_payout(hands, board, bets, contenders, 0, 300).unwrap();
        assert_eq!(showdown.payouts, [9700, 0, 0, 0, 0, 0]);
        assert_eq!(showdown.ranks[0].map(|r| r.category()), Some(2));
        assert_eq!(showdown.ranks[3].map(|r| r.category()), Some(1));
        assert!(showdown.ranks[1].is_none());
    }

    #[test]
    fn test_lone_contender_is_not_evaluated() {
        let mut contenders = [false; MAX_PLAYERS];
        contenders[2] = true;
        let bets = [1000, 0, 2000, 0, 0, 0];
        let showdown = evaluate_hands_and_payout(
            [None; MAX_PLAYERS],
            [INVALID_CARD; 5],
            bets,
            contenders,
            0,
            0,
        )
        .unwrap();
        assert_eq!(showdown.ranks[2], Some(HandRank::NoHand));
        assert_eq!(showdown.payouts[2], 3000);
    }

    #[test]
    fn test_contender_without_cards_is_rejected() {
        let board = [card(12, 0), card(7, 1), card(5, 2), card(2, 3), card(0, 0)];
        let mut hands = [None; MAX_PLAYERS];
        hands[0] = Some([card(12, 1), card(9, 2)]);
        let contenders = [true, true, false, false, false, false];
        assert_eq!(
            evaluate_hands_and_payout(hands, board, [10, 10, 0, 0, 0, 0], contenders, 0, 0),
            Err(CircuitError::MissingHand(1))
        );
    }
}
