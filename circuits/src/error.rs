use thiserror::Error;

/// Reasons a circuit refuses its inputs.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CircuitError {
    #[error("invalid card index {0}")]
    InvalidCard(u8),
    #[error("card {0} appears more than once")]
    DuplicateCard(u8),
    #[error("need at least two seats to deal, got {0}")]
    NotEnoughPlayers(usize),
    #[error("reveal count {0} out of range")]
    InvalidRevealCount(u8),
    #[error("cannot reveal {count} cards after position {deck_top}")]
    DeckExhausted { deck_top: u8, count: u8 },
    #[error("no seat is contending the pot")]
    NoContenders,
    #[error("contender at seat {0} holds no cards")]
    MissingHand(usize),
    #[error("rake {rake} exceeds pot {pot}")]
    RakeExceedsPot { rake: u64, pot: u64 },
    #[error("pot overflow")]
    Overflow,
}
