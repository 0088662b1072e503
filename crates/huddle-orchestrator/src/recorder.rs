//! Run Recorder - ordered event stream of one draft run
//!
//! Recording is fail-open: a recorder that cannot write logs a warning and
//! the draft carries on. Sinks:
//! - [`MemoryRecorder`] keeps events for inspection and tests
//! - [`JsonlRecorder`] appends one JSON object per line to a file
//! - [`NullRecorder`] drops everything

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use huddle_agent::{AgentRole, Proposal};
use huddle_core::{DraftError, DraftOrderPolicy, FinalRoster, PickRecord, TeamId};
use huddle_validation::Verdict;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Maximum characters of raw agent text kept in a message event
const MESSAGE_PREVIEW_CHARS: usize = 500;

/// Attempts per JSONL append before the event is dropped
const APPEND_ATTEMPTS: usize = 2;

/// Pause before the second append, doubled for each further attempt
const APPEND_BACKOFF: Duration = Duration::from_millis(100);

/// One entry of the run's event stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum DraftEvent {
    DraftStarted {
        /// Team names in first-round order
        order: Vec<String>,
        rounds: u32,
        total_picks: u32,
        policy: DraftOrderPolicy,
    },
    /// Output of an extractor or analyzer
    Message {
        pick: u32,
        conversation_round: u32,
        agent: String,
        role: AgentRole,
        content: String,
    },
    /// A head-drafter decision and the validator's answer
    Proposal {
        pick: u32,
        conversation_round: u32,
        agent: String,
        proposal: Proposal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        verdict: Option<Verdict>,
    },
    TurnExhausted {
        pick: u32,
        team_id: TeamId,
        rounds_used: u32,
    },
    PickCommitted {
        record: PickRecord,
        team: String,
        player: String,
    },
    DraftComplete {
        picks: u32,
        rosters: Vec<FinalRoster>,
    },
}

impl DraftEvent {
    /// Build a message event, truncating long agent text
    pub fn message(
        pick: u32,
        conversation_round: u32,
        agent: impl Into<String>,
        role: AgentRole,
        content: &str,
    ) -> Self {
        let content = if content.chars().count() > MESSAGE_PREVIEW_CHARS {
            let truncated: String = content.chars().take(MESSAGE_PREVIEW_CHARS).collect();
            format!("{truncated}...")
        } else {
            content.to_string()
        };
        DraftEvent::Message {
            pick,
            conversation_round,
            agent: agent.into(),
            role,
            content,
        }
    }
}

/// Event wrapped with run identity and ordering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub run_id: Uuid,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: DraftEvent,
}

/// Sink for a run's events
///
/// Implementations must not fail the run; errors are logged and dropped.
#[async_trait]
pub trait RunRecorder: Send + Sync {
    fn run_id(&self) -> Uuid;

    async fn record(&self, event: DraftEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRecorder;

#[async_trait]
impl RunRecorder for NullRecorder {
    fn run_id(&self) -> Uuid {
        Uuid::nil()
    }

    async fn record(&self, _event: DraftEvent) {}
}

/// Keeps events in memory
#[derive(Debug)]
pub struct MemoryRecorder {
    run_id: Uuid,
    events: Mutex<Vec<RecordedEvent>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl Default for MemoryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RunRecorder for MemoryRecorder {
    fn run_id(&self) -> Uuid {
        self.run_id
    }

    async fn record(&self, event: DraftEvent) {
        match self.events.lock() {
            Ok(mut events) => {
                let seq = events.len() as u64;
                events.push(RecordedEvent {
                    run_id: self.run_id,
                    seq,
                    timestamp: Utc::now(),
                    event,
                });
            }
            Err(e) => tracing::warn!("memory recorder poisoned (fail-open): {}", e),
        }
    }
}

/// Appends events as JSON lines
pub struct JsonlRecorder {
    run_id: Uuid,
    path: PathBuf,
    seq: AtomicU64,
}

impl JsonlRecorder {
    /// Record to `<dir>/<run_id>.jsonl`
    pub fn in_dir(dir: &Path) -> Self {
        let run_id = Uuid::new_v4();
        Self {
            run_id,
            path: dir.join(format!("{}.jsonl", run_id)),
            seq: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }

    /// Append one serialized event, retrying on I/O errors
    ///
    /// Returns the number of attempts the write took, or the last error
    /// once `APPEND_ATTEMPTS` are used up.
    async fn append_with_retries(&self, seq: u64, line: &str) -> std::io::Result<usize> {
        let mut attempt = 1;
        loop {
            match self.append(line).await {
                Ok(()) => return Ok(attempt),
                Err(e) if attempt < APPEND_ATTEMPTS => {
                    tracing::debug!(
                        "Event {} append to {} failed (attempt {}/{}): {}",
                        seq,
                        self.path.display(),
                        attempt,
                        APPEND_ATTEMPTS,
                        e
                    );
                    tokio::time::sleep(APPEND_BACKOFF * (1u32 << (attempt - 1))).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl RunRecorder for JsonlRecorder {
    fn run_id(&self) -> Uuid {
        self.run_id
    }

    async fn record(&self, event: DraftEvent) {
        let recorded = RecordedEvent {
            run_id: self.run_id,
            seq: self.seq.fetch_add(1, Ordering::SeqCst),
            timestamp: Utc::now(),
            event,
        };
        let Some(line) = serialize_event(&recorded) else {
            return;
        };
        if let Err(e) = self.append_with_retries(recorded.seq, &line).await {
            let error = DraftError::Recorder(format!("{}: {}", self.path.display(), e));
            tracing::warn!(
                "Dropping {} event {} of run {} (fail-open): {}",
                event_kind(&recorded.event),
                recorded.seq,
                self.run_id,
                error
            );
        }
    }
}

fn event_kind(event: &DraftEvent) -> &'static str {
    match event {
        DraftEvent::DraftStarted { .. } => "draft_started",
        DraftEvent::Message { .. } => "message",
        DraftEvent::Proposal { .. } => "proposal",
        DraftEvent::TurnExhausted { .. } => "turn_exhausted",
        DraftEvent::PickCommitted { .. } => "pick_committed",
        DraftEvent::DraftComplete { .. } => "draft_complete",
    }
}

fn serialize_event(event: &RecordedEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(line) => Some(line),
        Err(e) => {
            tracing::warn!("Dropping unserializable event {} (fail-open): {}", event.seq, e);
            None
        }
    }
}

/// Read back a JSONL event log
pub async fn read_jsonl(path: &Path) -> huddle_core::Result<Vec<RecordedEvent>> {
    let content = tokio::fs::read_to_string(path).await?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(DraftError::from))
        .collect()
}
