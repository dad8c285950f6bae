//! src/state/table.rs
//!
//! @description
//! This module defines the `Table` account, the primary ledger record for a
//! single poker game. It holds all public state needed to seat players, run
//! betting rounds and sequence the table's computations.
//!
//! Key features:
//! - Manages seating, stacks and bets. The table vault always holds exactly
//!   the sum of all stacks plus the pot.
//! - Tracks the public game state, the dealer button and turn order.
//! - Enforces turn timers using ledger timestamps.
//! - Records the single computation the table is waiting on, if any.

use anchor_lang::prelude::*;

use crate::circuit::CircuitKind;
use crate::error::AcesTableErrorCode;
use crate::state::constants::MAX_PLAYERS;

#[account]
#[derive(InitSpace, Debug, PartialEq, Eq)]
pub struct Table {
    /// Caller-chosen identifier, part of the table's address.
    pub table_id: u64,
    pub creator: Pubkey,
    /// The SPL token mint used as this table's currency.
    pub token_mint: Pubkey,
    /// `None` signifies an empty seat.
    pub seats: [Option<Seat>; MAX_PLAYERS],
    pub player_count: u8,
    pub dealer_position: u8,
    pub turn_position: u8,
    /// Seat that made the last bet or raise of the current round.
    pub last_aggressor: Option<u8>,
    pub game_state: GameState,
    pub small_blind: u64,
    pub big_blind: u64,
    pub min_buy_in: u64,
    /// Chips committed to the current hand and not yet paid out.
    pub pot: u64,
    /// The amount a player must have in front of them to stay in the round.
    pub current_bet: u64,
    pub turn_started_at: i64,
    pub turn_duration_seconds: u32,
    /// Last time the hand made progress: an action or a callback.
    pub last_activity_at: i64,
    /// Number of hands started at this table. Never decreases.
    pub hand_id_counter: u64,
    pub pending_computation: Option<PendingComputation>,
    pub bump: u8,
    pub vault_bump: u8,
}

/// A player seated at the table.
#[derive(InitSpace, AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Seat {
    pub player: Pubkey,
    pub stack: u64,
    pub is_active_in_hand: bool,
    pub is_all_in: bool,
    /// Whether the player has acted since the last bet level change.
    pub has_acted: bool,
    pub bet_this_round: u64,
    pub total_bet_this_hand: u64,
}

impl Seat {
    pub fn new(player: Pubkey, stack: u64) -> Self {
        Self {
            player,
            stack,
            is_active_in_hand: false,
            is_all_in: false,
            has_acted: false,
            bet_this_round: 0,
            total_bet_this_hand: 0,
        }
    }

    /// Still contending and able to put more chips in.
    pub fn can_act(&self) -> bool {
        self.is_active_in_hand && !self.is_all_in
    }
}

#[derive(InitSpace, AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameState {
    AwaitingPlayers,
    HandInProgress,
    Settling,
}

/// Betting actions. `Raise` names the total the player raises to.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerAction {
    Fold,
    Check,
    Call,
    Bet { amount: u64 },
    Raise { amount: u64 },
}

/// The computation a table is waiting on. A callback is only accepted for this
/// exact offset and circuit.
#[derive(InitSpace, AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingComputation {
    pub computation_offset: u64,
    pub circuit: CircuitKind,
    pub queued_at: i64,
}

impl Table {
    pub fn seat_of(&self, player: &Pubkey) -> Option<usize> {
        self.seats
            .iter()
            .position(|seat| seat.as_ref().is_some_and(|seat| seat.player == *player))
    }

    pub fn first_vacant_seat(&self) -> Option<usize> {
        self.seats.iter().position(Option::is_none)
    }

    /// Seats still contending for the pot.
    pub fn contenders(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_PLAYERS).filter(|i| self.seats[*i].is_some_and(|seat| seat.is_active_in_hand))
    }

    pub fn contender_count(&self) -> usize {
        self.contenders().count()
    }

    fn actor_count(&self) -> usize {
        self.seats.iter().flatten().filter(|seat| seat.can_act()).count()
    }

    /// Whether the seat still owes an action in the current betting round.
    pub fn needs_action(&self, index: usize) -> bool {
        let Some(seat) = self.seats.get(index).copied().flatten() else {
            return false;
        };
        if !seat.can_act() || self.contender_count() < 2 {
            return false;
        }
        seat.bet_this_round < self.current_bet || (!seat.has_acted && self.actor_count() >= 2)
    }

    /// The first seat after `after`, going clockwise, that owes an action.
    pub fn next_to_act(&self, after: u8) -> Option<u8> {
        (1..=MAX_PLAYERS)
            .map(|step| (after as usize + step) % MAX_PLAYERS)
            .find(|i| self.needs_action(*i))
            .map(|i| i as u8)
    }

    pub fn is_betting_round_complete(&self) -> bool {
        !(0..MAX_PLAYERS).any(|i| self.needs_action(i))
    }

    /// The next seat after `after` that holds chips, i.e. gets dealt in.
    pub fn next_funded_seat(&self, after: u8) -> Option<u8> {
        (1..=MAX_PLAYERS)
            .map(|step| (after as usize + step) % MAX_PLAYERS)
            .find(|i| self.seats[*i].is_some_and(|seat| seat.stack > 0))
            .map(|i| i as u8)
    }

    /// The next seat after `after` that was dealt into the current hand.
    pub fn next_dealt_seat(&self, after: u8) -> Option<u8> {
        (1..=MAX_PLAYERS)
            .map(|step| (after as usize + step) % MAX_PLAYERS)
            .find(|i| self.seats[*i].is_some_and(|seat| seat.is_active_in_hand || seat.total_bet_this_hand > 0))
            .map(|i| i as u8)
    }

    pub fn seat_mut(&mut self, index: usize) -> Result<&mut Seat> {
        self.seats
            .get_mut(index)
            .and_then(Option::as_mut)
            .ok_or_else(|| error!(AcesTableErrorCode::PlayerNotFound))
    }

    /// Moves `amount` from a seat's stack into the pot.
    pub fn commit(&mut self, index: usize, amount: u64) -> Result<()> {
        let seat = self.seat_mut(index)?;
        seat.stack = seat
            .stack
            .checked_sub(amount)
            .ok_or(AcesTableErrorCode::InsufficientFunds)?;
        seat.bet_this_round = seat
            .bet_this_round
            .checked_add(amount)
            .ok_or(AcesTableErrorCode::ArithmeticOverflow)?;
        seat.total_bet_this_hand = seat
            .total_bet_this_hand
            .checked_add(amount)
            .ok_or(AcesTableErrorCode::ArithmeticOverflow)?;
        if seat.stack == 0 {
            seat.is_all_in = true;
        }
        self.pot = self
            .pot
            .checked_add(amount)
            .ok_or(AcesTableErrorCode::ArithmeticOverflow)?;
        Ok(())
    }

    /// Clears per-round betting state at the start of a new street.
    pub fn reset_round(&mut self) {
        for seat in self.seats.iter_mut().flatten() {
            seat.bet_this_round = 0;
            seat.has_acted = false;
        }
        self.current_bet = 0;
        self.last_aggressor = None;
    }

    /// Clears all hand state once the pot has been distributed or refunded.
    pub fn reset_hand(&mut self) {
        for seat in self.seats.iter_mut().flatten() {
            seat.is_active_in_hand = false;
            seat.is_all_in = false;
            seat.has_acted = false;
            seat.bet_this_round = 0;
            seat.total_bet_this_hand = 0;
        }
        self.pot = 0;
        self.current_bet = 0;
        self.last_aggressor = None;
        self.pending_computation = None;
        self.game_state = GameState::AwaitingPlayers;
    }

    /// Hands the turn to the next seat owing an action, if any.
    pub fn advance_turn(&mut self, after: u8, now: i64) {
        if let Some(next) = self.next_to_act(after) {
            self.turn_position = next;
        }
        self.turn_started_at = now;
        self.last_activity_at = now;
    }

    /// Sum of all stacks plus the pot: what the vault must hold.
    pub fn chips_in_play(&self) -> Option<u64> {
        self.seats
            .iter()
            .flatten()
            .try_fold(self.pot, |total, seat| total.checked_add(seat.stack))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_stacks(stacks: &[Option<u64>]) -> Table {
        let mut seats = [None; MAX_PLAYERS];
        for (seat, stack) in seats.iter_mut().zip(stacks) {
            *seat = stack.map(|stack| Seat::new(Pubkey::new_unique(), stack));
        }
        Table {
            table_id: 1,
            creator: Pubkey::new_unique(),
            token_mint: Pubkey::new_unique(),
            seats,
            player_count: stacks.iter().flatten().count() as u8,
            dealer_position: 0,
            turn_position: 0,
            last_aggressor: None,
            game_state: GameState::HandInProgress,
            small_blind: 100,
            big_blind: 200,
            min_buy_in: 4_000,
            pot: 0,
            current_bet: 0,
            turn_started_at: 0,
            turn_duration_seconds: 30,
            last_activity_at: 0,
            hand_id_counter: 1,
            pending_computation: None,
            bump: 255,
            vault_bump: 255,
        }
    }

    #[test]
    fn test_heads_up_preflop_round() {
        let mut table = table_with_stacks(&[Some(10_000), Some(10_000)]);
        for seat in table.seats.iter_mut().flatten() {
            seat.is_active_in_hand = true;
        }
        // Dealer (seat 0) posts the small blind, seat 1 the big blind.
        table.commit(0, 100).unwrap();
        table.commit(1, 200).unwrap();
        table.current_bet = 200;

        assert_eq!(table.next_to_act(1), Some(0));
        assert!(!table.is_betting_round_complete());

        // Small blind calls: the big blind still has its option.
        table.commit(0, 100).unwrap();
        table.seat_mut(0).unwrap().has_acted = true;
        assert_eq!(table.next_to_act(0), Some(1));

        // Big blind checks.
        table.seat_mut(1).unwrap().has_acted = true;
        assert!(table.is_betting_round_complete());
        assert_eq!(table.pot, 400);
        assert_eq!(table.chips_in_play(), Some(20_000));
    }

    #[test]
    fn test_all_in_players_owe_nothing() {
        let mut table = table_with_stacks(&[Some(500), Some(10_000), None, Some(10_000)]);
        for seat in table.seats.iter_mut().flatten() {
            seat.is_active_in_hand = true;
        }
        table.commit(0, 500).unwrap();
        table.current_bet = 500;
        assert!(table.seats[0].unwrap().is_all_in);
        assert!(!table.needs_action(0));
        assert_eq!(table.next_to_act(0), Some(1));
        assert!(!table.needs_action(2));
    }

    #[test]
    fn test_last_contender_ends_the_round() {
        let mut table = table_with_stacks(&[Some(1_000), Some(1_000), Some(1_000)]);
        for seat in table.seats.iter_mut().flatten() {
            seat.is_active_in_hand = true;
        }
        table.seat_mut(0).unwrap().is_active_in_hand = false;
        table.seat_mut(2).unwrap().is_active_in_hand = false;
        assert_eq!(table.contender_count(), 1);
        assert!(table.is_betting_round_complete());
    }

    #[test]
    fn test_commit_rejects_overdraw() {
        let mut table = table_with_stacks(&[Some(100), Some(100)]);
        assert!(table.commit(0, 101).is_err());
        assert_eq!(table.pot, 0);
        assert_eq!(table.seats[0].unwrap().stack, 100);
    }
}
