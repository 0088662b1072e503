//! # huddle-orchestrator
//!
//! Draft engine for Huddle.
//!
//! This crate provides:
//! - Pure draft state machine and pick-order policy
//! - Conversation protocol among extractor, analyzer and head-drafter agents
//! - `DraftEngine` driving one run, `run_many` for concurrent batches
//! - Run recording (memory, JSONL, null sinks)

mod conversation;
mod engine;
mod recorder;
mod runner;
mod state_machine;

pub use conversation::{ConversationCoordinator, TranscriptEntry, TurnOutcome};
pub use engine::{run_draft, DraftEngine, DraftResult};
pub use recorder::{
    read_jsonl, DraftEvent, JsonlRecorder, MemoryRecorder, NullRecorder, RecordedEvent,
    RunRecorder,
};
pub use runner::{run_many, BatchConfig, RunOutcome};
pub use state_machine::{slot_for_pick, transition, Action, DraftState, Event};
