//! src/state/mod.rs
//!
//! @description
//! Account state of the Aces Table program: the platform singleton, tables
//! with their seats, and the per-hand record.

pub mod card;
pub mod constants;
pub mod hand_data;
pub mod platform_config;
pub mod table;

pub use card::*;
pub use constants::*;
pub use hand_data::*;
pub use platform_config::*;
pub use table::*;
