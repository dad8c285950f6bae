//! src/lib.rs
//!
//! @description
//! Card logic for the three confidential computations of an Aces Table hand.
//! The compute cluster runs these functions on plaintext after opening its
//! inputs and seals the results before handing them back to the ledger.
//!
//! The library is structured into modules:
//! - `types`: cards, packed decks and packed hole-card hands.
//! - `circuits`: one entry point per computation definition.
//! - `logic`: hand evaluation and pot distribution used at showdown.

pub mod circuits;
pub mod error;
pub mod logic;
pub mod types;

pub use circuits::*;
pub use error::CircuitError;
pub use logic::{HandRank, calculate_payouts, evaluate_7_cards};
pub use types::*;
