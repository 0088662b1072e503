//! Pure state machine for draft control flow
//!
//! This module implements a pure functional state machine with NO I/O.
//! All state transitions are deterministic and testable.
//!
//! Key design principles:
//! - Pure function: transition(state, event) -> (state, actions)
//! - No async, no I/O
//! - Invalid transitions go to Failed state (never panic)
//! - Pick order derived from the pick index alone

use huddle_core::DraftOrderPolicy;

/// Draft state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftState {
    /// Board built, no pick taken yet
    Initializing,
    /// Waiting for pick `pick` (1-based) of `total_picks`
    InProgress { pick: u32, total_picks: u32 },
    /// Every pick committed
    Complete,
    /// Aborted with error
    Failed { error: String },
}

impl DraftState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DraftState::Complete | DraftState::Failed { .. })
    }
}

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Begin drafting
    Start { total_picks: u32 },
    /// A pick was committed to the board
    PickCommitted { pick: u32 },
    /// An invariant was violated
    IntegrityViolation { reason: String },
    /// Stop requested between turns
    Cancelled,
}

/// Actions to execute as side effects of transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run the turn for this pick
    RunTurn { pick: u32 },
    /// Freeze and publish every roster
    FinalizeRosters,
    /// Log progress
    Log { message: String },
}

/// Round (1-based) and first-round order index (0-based) of a pick
///
/// Snake order runs forward on odd rounds and reversed on even rounds;
/// linear order runs forward every round. Returns `None` for pick 0 or an
/// empty league.
pub fn slot_for_pick(pick: u32, teams: usize, policy: DraftOrderPolicy) -> Option<(u32, usize)> {
    if pick == 0 || teams == 0 {
        return None;
    }
    let teams_u32 = teams as u32;
    let round = (pick - 1) / teams_u32 + 1;
    let offset = ((pick - 1) % teams_u32) as usize;
    let index = match policy {
        DraftOrderPolicy::Snake if round % 2 == 0 => teams - 1 - offset,
        _ => offset,
    };
    Some((round, index))
}

/// Pure state transition function
///
/// Takes current state and event, returns new state and actions to execute.
/// This function never panics; any invalid transition yields `Failed`.
pub fn transition(state: DraftState, event: Event) -> (DraftState, Vec<Action>) {
    match (state, event) {
        (DraftState::Initializing, Event::Start { total_picks: 0 }) => (
            DraftState::Complete,
            vec![
                Action::Log {
                    message: "Draft has no picks".to_string(),
                },
                Action::FinalizeRosters,
            ],
        ),

        (DraftState::Initializing, Event::Start { total_picks }) => (
            DraftState::InProgress {
                pick: 1,
                total_picks,
            },
            vec![
                Action::Log {
                    message: format!("Draft started: {} picks", total_picks),
                },
                Action::RunTurn { pick: 1 },
            ],
        ),

        (
            DraftState::InProgress { pick, total_picks },
            Event::PickCommitted { pick: committed },
        ) => {
            if committed != pick {
                return (
                    DraftState::Failed {
                        error: format!(
                            "Pick {} committed while waiting for pick {}",
                            committed, pick
                        ),
                    },
                    vec![],
                );
            }

            if pick >= total_picks {
                (
                    DraftState::Complete,
                    vec![
                        Action::Log {
                            message: format!("Draft complete after {} picks", total_picks),
                        },
                        Action::FinalizeRosters,
                    ],
                )
            } else {
                (
                    DraftState::InProgress {
                        pick: pick + 1,
                        total_picks,
                    },
                    vec![Action::RunTurn { pick: pick + 1 }],
                )
            }
        }

        (DraftState::Initializing, Event::IntegrityViolation { reason })
        | (DraftState::InProgress { .. }, Event::IntegrityViolation { reason }) => {
            let actions = vec![Action::Log {
                message: format!("Integrity violation: {}", reason),
            }];
            (DraftState::Failed { error: reason }, actions)
        }

        (DraftState::Initializing, Event::Cancelled) => (
            DraftState::Failed {
                error: "Cancelled before the first pick".to_string(),
            },
            vec![],
        ),

        (DraftState::InProgress { pick, .. }, Event::Cancelled) => (
            DraftState::Failed {
                error: format!("Cancelled before pick {}", pick),
            },
            vec![Action::Log {
                message: format!("Draft cancelled before pick {}", pick),
            }],
        ),

        // Terminal states - no valid transitions
        (DraftState::Complete, event) => (
            DraftState::Failed {
                error: format!("Invalid transition from Complete on event: {:?}", event),
            },
            vec![],
        ),

        (DraftState::Failed { error }, event) => (
            DraftState::Failed {
                error: format!(
                    "Invalid transition from Failed state (error: {}) on event: {:?}",
                    error, event
                ),
            },
            vec![],
        ),

        (state, event) => (
            DraftState::Failed {
                error: format!(
                    "Invalid state transition: {:?} cannot handle event {:?}",
                    state, event
                ),
            },
            vec![],
        ),
    }
}
