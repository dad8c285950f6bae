//! src/logic/pot_calculator.rs
//!
//! @description
//! Splits a settled pot between the contenders, handling side pots, ties,
//! odd chips and the house rake. When players go all-in with different stack
//! sizes, each player is only eligible for the layers of the pot they matched.
//!
//! @logic
//! 1. Layers: every distinct committed amount closes a layer; each seat adds
//!    what it committed between the previous level and this one.
//! 2. Rake: taken from the lowest layers first (the main pot).
//! 3. Winners: for each layer, the best `HandRank` among contenders who
//!    committed at least the layer's level. Ties split evenly; leftover chips
//!    go one at a time to the winners closest to the left of the dealer.
//! 4. Orphans: a layer funded only by folded seats rolls into the next layer,
//!    or, at the top, goes to the winners of the last contested layer.

use crate::error::CircuitError;
use crate::logic::poker_evaluator::HandRank;
use crate::types::MAX_PLAYERS;

/// Calculates each seat's payout. Seats with `None` rank folded or were never dealt in.
///
/// The returned payouts always sum to the total of `bets` minus `rake`.
pub fn calculate_payouts(
    bets: [u64; MAX_PLAYERS],
    ranks: [Option<HandRank>; MAX_PLAYERS],
    dealer: u8,
    rake: u64,
) -> Result<[u64; MAX_PLAYERS], CircuitError> {
    let pot = bets
        .iter()
        .try_fold(0u64, |acc, bet| acc.checked_add(*bet))
        .ok_or(CircuitError::Overflow)?;
    if rake > pot {
        return Err(CircuitError::RakeExceedsPot { rake, pot });
    }
    let contenders: Vec<usize> = (0..MAX_PLAYERS).filter(|seat| ranks[*seat].is_some()).collect();
    if contenders.is_empty() {
        return Err(CircuitError::NoContenders);
    }

    let mut levels: Vec<u64> = bets.iter().copied().filter(|bet| *bet > 0).collect();
    levels.sort_unstable();
    levels.dedup();

    let mut payouts = [0u64; MAX_PLAYERS];
    let mut rake_left = rake;
    let mut carry = 0u64;
    let mut floor = 0u64;
    let mut last_winners: Vec<usize> = Vec::new();

    for level in levels {
        let mut layer: u64 = bets.iter().map(|bet| (*bet).min(level).saturating_sub(floor)).sum();
        floor = level;

        let taken = rake_left.min(layer);
        layer -= taken;
        rake_left -= taken;

        let eligible: Vec<usize> =
            contenders.iter().copied().filter(|seat| bets[*seat] >= level).collect();
        if eligible.is_empty() {
            carry += layer;
            continue;
        }
        let winners = best_of(&eligible, &ranks);
        split(&mut payouts, &winners, layer + carry, dealer);
        carry = 0;
        last_winners = winners;
    }

    if carry > 0 {
        if last_winners.is_empty() {
            last_winners = best_of(&contenders, &ranks);
        }
        split(&mut payouts, &last_winners, carry, dealer);
    }

    Ok(payouts)
}

fn best_of(seats: &[usize], ranks: &[Option<HandRank>; MAX_PLAYERS]) -> Vec<usize> {
    let best = seats.iter().filter_map(|seat| ranks[*seat]).max();
    seats.iter().copied().filter(|seat| ranks[*seat] == best).collect()
}

fn split(payouts: &mut [u64; MAX_PLAYERS], winners: &[usize], amount: u64, dealer: u8) {
    if winners.is_empty() || amount == 0 {
        return;
    }
    let mut ordered = winners.to_vec();
    ordered.sort_by_key(|seat| (seat + MAX_PLAYERS - 1 - dealer as usize % MAX_PLAYERS) % MAX_PLAYERS);

    let share = amount / ordered.len() as u64;
    let odd_chips = (amount % ordered.len() as u64) as usize;
    for (position, seat) in ordered.iter().enumerate() {
        payouts[*seat] += share + u64::from(position < odd_chips);
    }
}
