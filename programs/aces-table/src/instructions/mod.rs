//! src/instructions/mod.rs
//!
//! @description
//! This module serves as a central hub for all instruction handlers.
//! Each handler lives in its own file next to its typed account list and its
//! events; the computation callbacks sit with the instruction that queues them.

pub mod create_table;
pub mod deal_community_cards;
pub mod force_hand_refund;
pub mod force_player_fold;
pub mod init_comp_defs;
pub mod initialize_platform_config;
pub mod join_table;
pub mod leave_table;
pub mod player_action;
pub mod resolve_showdown;
pub mod start_hand;
pub mod update_rake_params;

pub use create_table::*;
pub use deal_community_cards::*;
pub use force_hand_refund::*;
pub use force_player_fold::*;
pub use init_comp_defs::*;
pub use initialize_platform_config::*;
pub use join_table::*;
pub use leave_table::*;
pub use player_action::*;
pub use resolve_showdown::*;
pub use start_hand::*;
pub use update_rake_params::*;
