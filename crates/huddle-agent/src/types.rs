//! Type definitions for draft agent interactions

use huddle_core::{Player, PlayerId, PlayerPool, Position, Team};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role an agent plays in the per-turn conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Narrows the pool to a shortlist
    Extractor,
    /// Ranks and annotates the shortlist
    Analyzer,
    /// Commits to one candidate or abstains
    HeadDrafter,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentRole::Extractor => write!(f, "extractor"),
            AgentRole::Analyzer => write!(f, "analyzer"),
            AgentRole::HeadDrafter => write!(f, "head_drafter"),
        }
    }
}

impl std::str::FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "extractor" => Ok(AgentRole::Extractor),
            "analyzer" | "analyst" => Ok(AgentRole::Analyzer),
            "head_drafter" | "headdrafter" | "drafter" => Ok(AgentRole::HeadDrafter),
            _ => Err(format!(
                "Invalid agent role: {}. Use extractor, analyzer, or head_drafter.",
                s
            )),
        }
    }
}

/// Failure of a single agent exchange
///
/// Both variants are distinct from a validation rejection: they mean no
/// usable proposal was produced at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// Output could not be normalized into the expected shape
    #[error("Unparsable agent response: {0}")]
    Response(String),

    /// Backend, network, timeout or open circuit
    #[error("Decision backend unavailable: {0}")]
    Unavailable(String),
}

impl AgentError {
    /// Unparsable responses are worth a re-prompt, outages are not
    pub fn is_reprompt(&self) -> bool {
        matches!(self, AgentError::Response(_))
    }
}

/// A player referenced in an agent proposal, always resolved against the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCandidate {
    pub player_id: PlayerId,
    pub name: String,
    pub position: Position,
    pub rank: u32,
}

impl From<&Player> for PlayerCandidate {
    fn from(player: &Player) -> Self {
        Self {
            player_id: player.id,
            name: player.name.clone(),
            position: player.position,
            rank: player.rank,
        }
    }
}

impl std::fmt::Display for PlayerCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}) #{}", self.name, self.position, self.rank)
    }
}

/// One entry of an analyzer ranking, best first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub candidate: PlayerCandidate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Ranking produced by one analyzer in one conversation round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub analyst: String,
    pub ranking: Vec<RankedCandidate>,
}

/// Typed result of one agent call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Proposal {
    Shortlist(Vec<PlayerCandidate>),
    Ranking(Vec<RankedCandidate>),
    Pick(PlayerCandidate),
    Abstain,
}

impl Proposal {
    /// Short description for transcripts and logs
    pub fn summary(&self) -> String {
        match self {
            Proposal::Shortlist(players) => format!("shortlist of {}", players.len()),
            Proposal::Ranking(ranking) => match ranking.first() {
                Some(top) => format!("ranking of {}, top {}", ranking.len(), top.candidate.name),
                None => "empty ranking".to_string(),
            },
            Proposal::Pick(candidate) => format!("pick {}", candidate),
            Proposal::Abstain => "abstain".to_string(),
        }
    }
}

/// Everything an agent may look at for one call
///
/// Borrowed from the draft board for the duration of a turn; agents never
/// mutate draft state.
#[derive(Debug, Clone, Copy)]
pub struct AgentContext<'a> {
    pub pool: &'a PlayerPool,
    pub team: &'a Team,
    /// Overall pick index
    pub pick: u32,
    /// Draft round of the pick
    pub draft_round: u32,
    /// Conversation round, 0 for extraction
    pub conversation_round: u32,
    /// Candidates an extractor sees per position
    pub extract_limit: usize,
    pub shortlist: &'a [PlayerCandidate],
    pub analyses: &'a [Analysis],
    /// Outcome of earlier rounds in this turn ("X rejected: no slot")
    pub feedback: &'a [String],
}

/// One request to a decision backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendRequest {
    pub role: AgentRole,
    pub agent: String,
    /// Role instructions
    pub system: String,
    /// Structured context the prompt was rendered from
    pub context: serde_json::Value,
    /// Rendered user prompt
    pub prompt: String,
    /// 0 for the first attempt, incremented per re-prompt
    pub attempt: u32,
}

/// Token usage information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: usize,
    #[serde(default)]
    pub completion_tokens: usize,
}

/// Chat-completions message format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat-completions request format
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

/// Chat-completions response format
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
    pub usage: Option<Usage>,
}

/// One choice in a chat-completions response
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}
