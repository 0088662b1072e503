//! Configuration management for draft runs
//!
//! A draft is described by a `huddle.toml` file: the league (teams, rounds,
//! order policy), the roster template, conversation limits, the agent lineup
//! and backend tuning. Secrets never live here; the backend access key is
//! supplied separately by the caller.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{DraftError, DraftOrderPolicy, Position, Result, RosterTemplate, TeamController};

/// Top-level draft configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftConfig {
    #[serde(default)]
    pub league: LeagueConfig,

    #[serde(default)]
    pub roster: RosterTemplate,

    #[serde(default)]
    pub conversation: ConversationConfig,

    #[serde(default)]
    pub agents: AgentLineup,

    #[serde(default)]
    pub backend: BackendSettings,
}

/// League layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueConfig {
    /// Teams in first-round order (unless shuffled)
    #[serde(default = "default_teams")]
    pub teams: Vec<TeamConfig>,

    #[serde(default = "default_rounds")]
    pub rounds: u32,

    #[serde(default)]
    pub order: DraftOrderPolicy,

    /// Shuffle the first-round order with `seed`
    #[serde(default)]
    pub shuffle_order: bool,

    /// Seed for every random choice in a run
    #[serde(default)]
    pub seed: u64,
}

/// One team entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamConfig {
    pub name: String,
    #[serde(default)]
    pub controller: TeamController,
}

impl TeamConfig {
    pub fn new(name: impl Into<String>, controller: TeamController) -> Self {
        Self {
            name: name.into(),
            controller,
        }
    }
}

/// Limits for the per-turn agent conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Maximum Head-Drafter rounds per turn
    #[serde(default = "default_round_cap")]
    pub round_cap: u32,

    /// Re-prompts allowed for an unparsable agent response
    #[serde(default = "default_parse_retries")]
    pub parse_retries: u32,

    /// Maximum candidates kept after extraction
    #[serde(default = "default_shortlist_size")]
    pub shortlist_size: usize,

    /// Candidates each extractor sees per position
    #[serde(default = "default_extract_limit")]
    pub extract_limit: usize,

    /// Rounds in which an exhausted turn's default pick goes to the best
    /// legal RB or WR before filling needs (0 disables)
    #[serde(default)]
    pub fallback_skill_rounds: u32,
}

/// Agents taking part in every agent-controlled turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentLineup {
    #[serde(default = "default_extractors")]
    pub extractors: Vec<ExtractorConfig>,

    #[serde(default = "default_analyzers")]
    pub analyzers: Vec<String>,

    #[serde(default = "default_head_drafter")]
    pub head_drafter: String,
}

/// An extractor scoped to a group of positions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    pub name: String,
    pub positions: Vec<Position>,
}

/// Backend tuning (endpoint and key are supplied at startup)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for transport errors, 429 and 5xx
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default)]
    pub temperature: f32,
}

// Default value providers
fn default_teams() -> Vec<TeamConfig> {
    let mut teams: Vec<TeamConfig> = (1..=11)
        .map(|i| TeamConfig::new(format!("Auto Team {}", i), TeamController::Auto))
        .collect();
    teams.push(TeamConfig::new("AI General Manager", TeamController::Agents));
    teams
}

fn default_rounds() -> u32 {
    9
}

fn default_round_cap() -> u32 {
    3
}

fn default_parse_retries() -> u32 {
    2
}

fn default_shortlist_size() -> usize {
    12
}

fn default_extract_limit() -> usize {
    10
}

fn default_extractors() -> Vec<ExtractorConfig> {
    [Position::QB, Position::RB, Position::WR, Position::TE]
        .iter()
        .map(|p| ExtractorConfig {
            name: format!("{}_extractor", p.long_name()),
            positions: vec![*p],
        })
        .collect()
}

fn default_analyzers() -> Vec<String> {
    vec!["value_analyzer".to_string(), "needs_analyzer".to_string()]
}

fn default_head_drafter() -> String {
    "head_drafter".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    8_000
}

impl DraftConfig {
    /// Load configuration from a TOML file or use defaults when it is absent
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| DraftError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration to `path`
    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| DraftError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Total picks in the draft: teams x rounds
    pub fn total_picks(&self) -> u32 {
        self.league.teams.len() as u32 * self.league.rounds
    }

    pub fn has_agent_teams(&self) -> bool {
        self.league
            .teams
            .iter()
            .any(|t| t.controller == TeamController::Agents)
    }

    /// Reject drafts that can never complete
    pub fn validate(&self) -> Result<()> {
        if self.league.teams.is_empty() {
            return Err(DraftError::Config("league has no teams".to_string()));
        }
        if self.league.rounds == 0 {
            return Err(DraftError::Config("rounds must be at least 1".to_string()));
        }
        let capacity = self.roster.capacity();
        if self.league.rounds > capacity {
            return Err(DraftError::Config(format!(
                "{} rounds exceed the roster capacity of {}",
                self.league.rounds, capacity
            )));
        }
        if self.roster.slots.iter().any(|s| s.accepts.is_empty()) {
            return Err(DraftError::Config(
                "every roster slot must accept at least one position".to_string(),
            ));
        }
        let mut names: Vec<&str> = self.league.teams.iter().map(|t| t.name.as_str()).collect();
        names.sort();
        names.dedup();
        if names.len() != self.league.teams.len() {
            return Err(DraftError::Config("team names must be unique".to_string()));
        }
        if self.conversation.round_cap == 0 {
            return Err(DraftError::Config("round_cap must be at least 1".to_string()));
        }
        if self.conversation.shortlist_size == 0 {
            return Err(DraftError::Config(
                "shortlist_size must be at least 1".to_string(),
            ));
        }
        if self.has_agent_teams() && self.agents.extractors.is_empty() {
            return Err(DraftError::Config(
                "agent-controlled teams need at least one extractor".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LeagueConfig {
    fn default() -> Self {
        Self {
            teams: default_teams(),
            rounds: default_rounds(),
            order: DraftOrderPolicy::default(),
            shuffle_order: false,
            seed: 0,
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            round_cap: default_round_cap(),
            parse_retries: default_parse_retries(),
            shortlist_size: default_shortlist_size(),
            extract_limit: default_extract_limit(),
            fallback_skill_rounds: 0,
        }
    }
}

impl Default for AgentLineup {
    fn default() -> Self {
        Self {
            extractors: default_extractors(),
            analyzers: default_analyzers(),
            head_drafter: default_head_drafter(),
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            temperature: 0.0,
        }
    }
}
