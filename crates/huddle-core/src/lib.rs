//! # huddle-core
//!
//! Core types for the Huddle multi-agent draft simulator.
//!
//! A draft run is a sequence of picks over a shared player pool. Some teams
//! are driven by a conversation between cooperating agents, others by a
//! deterministic best-available policy.
//!
//! ## Core Paradigm
//!
//! - The [`DraftBoard`] is the single writer of draft state
//! - Players are drafted at most once, slots never overflow
//! - Every committed pick is recorded as a [`PickRecord`]
//! - Agents propose, the board disposes

mod board;
mod config;
mod error;
mod pool;
mod roster;
mod types;

pub use board::DraftBoard;
pub use config::{
    AgentLineup, BackendSettings, ConversationConfig, DraftConfig, ExtractorConfig, LeagueConfig,
    TeamConfig,
};
pub use error::{DraftError, Result};
pub use pool::{normalize_name, PlayerPool};
pub use roster::{FinalRoster, FinalRosterEntry, RosterEntry, RosterTemplate, Team};
pub use types::*;
