//! src/circuits/mod.rs
//!
//! @description
//! One module per computation definition registered by the table program.

pub mod evaluate_hands_and_payout;
pub mod reveal_community_cards;
pub mod shuffle_and_deal;

pub use evaluate_hands_and_payout::*;
pub use reveal_community_cards::*;
pub use shuffle_and_deal::*;
