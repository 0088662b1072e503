//! # huddle-agent
//!
//! Draft agents and decision backends for Huddle.
//!
//! Three roles share one capability interface ([`DraftAgent`]):
//! - Extractors narrow the player pool to a shortlist
//! - Analyzers rank the shortlist (advisory)
//! - The Head-Drafter commits to one player or abstains
//!
//! ## Key Pattern
//!
//! Every agent call is a single stateless exchange with a
//! [`DecisionBackend`]. Context from earlier rounds of the same turn travels
//! in the prompt, so backends never hold conversation state. Free-form
//! answers are normalized by [`ResponseParser`] and resolved against the
//! player pool before anything leaves this crate.

mod agent;
mod backend;
mod circuit_breaker;
mod client;
mod parse;
pub mod prompt;
mod scripted;
mod types;

pub use agent::{
    build_agent, AgentSpec, AnalyzerAgent, DraftAgent, ExtractorAgent, HeadDrafterAgent,
};
pub use backend::DecisionBackend;
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use client::{BackendConfig, HttpBackend};
pub use parse::ResponseParser;
pub use scripted::{RankingBackend, ScriptedBackend};
pub use types::*;
