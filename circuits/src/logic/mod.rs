//! src/logic/mod.rs
//!
//! @description
//! Showdown helpers: hand evaluation and pot distribution.

pub mod poker_evaluator;
pub mod pot_calculator;

pub use poker_evaluator::{HandRank, evaluate_7_cards};
pub use pot_calculator::calculate_payouts;
