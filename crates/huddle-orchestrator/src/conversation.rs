//! Conversation protocol for one agent-controlled turn
//!
//! Round 0 runs every extractor concurrently and merges their lists into a
//! shortlist. Rounds `1..=round_cap` run the analyzers concurrently, then ask
//! the head drafter for a decision, which the validator checks. The first
//! accepted proposal wins; analyzer rankings are advisory only.

use futures::future::join_all;
use huddle_agent::{
    build_agent, AgentContext, AgentError, AgentRole, AgentSpec, Analysis, DecisionBackend,
    DraftAgent, PlayerCandidate, Proposal,
};
use huddle_core::{
    ConversationConfig, DraftBoard, DraftConfig, PlayerId, PlayerPool, Result, Team, TeamId,
};
use huddle_validation::{PickValidator, Verdict};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::recorder::{DraftEvent, RunRecorder};

/// One message exchanged during a turn
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub conversation_round: u32,
    pub agent: String,
    pub role: AgentRole,
    pub content: String,
}

/// Result of one conversation
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The head drafter's proposal passed validation
    Accepted {
        player_id: PlayerId,
        conversation_round: u32,
        transcript: Vec<TranscriptEntry>,
    },
    /// No accepted proposal within the round cap
    Exhausted {
        rounds_used: u32,
        transcript: Vec<TranscriptEntry>,
    },
}

impl TurnOutcome {
    pub fn transcript(&self) -> &[TranscriptEntry] {
        match self {
            TurnOutcome::Accepted { transcript, .. }
            | TurnOutcome::Exhausted { transcript, .. } => transcript,
        }
    }
}

/// Runs the per-turn conversation among the agent lineup
pub struct ConversationCoordinator {
    extractors: Vec<Box<dyn DraftAgent>>,
    analyzers: Vec<Box<dyn DraftAgent>>,
    head_drafter: Box<dyn DraftAgent>,
    validator: PickValidator,
    limits: ConversationConfig,
}

impl ConversationCoordinator {
    pub fn new(
        extractors: Vec<Box<dyn DraftAgent>>,
        analyzers: Vec<Box<dyn DraftAgent>>,
        head_drafter: Box<dyn DraftAgent>,
        validator: PickValidator,
        limits: ConversationConfig,
    ) -> Self {
        Self {
            extractors,
            analyzers,
            head_drafter,
            validator,
            limits,
        }
    }

    /// Build the configured lineup, every agent sharing one backend
    pub fn from_config(
        config: &DraftConfig,
        backend: Arc<dyn DecisionBackend>,
        validator: PickValidator,
    ) -> std::result::Result<Self, AgentError> {
        let retries = config.conversation.parse_retries;

        let extractors = config
            .agents
            .extractors
            .iter()
            .map(|e| {
                build_agent(
                    AgentSpec::extractor(&e.name, e.positions.clone()).with_parse_retries(retries),
                    backend.clone(),
                )
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let analyzers = config
            .agents
            .analyzers
            .iter()
            .map(|name| {
                build_agent(
                    AgentSpec::analyzer(name).with_parse_retries(retries),
                    backend.clone(),
                )
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let head_drafter = build_agent(
            AgentSpec::head_drafter(&config.agents.head_drafter).with_parse_retries(retries),
            backend,
        )?;

        Ok(Self::new(
            extractors,
            analyzers,
            head_drafter,
            validator,
            config.conversation.clone(),
        ))
    }

    /// Converge on one validated player for `team_id`, or report exhaustion
    ///
    /// Reads the board only; committing is the caller's job.
    pub async fn run_turn(
        &self,
        board: &DraftBoard,
        team_id: TeamId,
        pick: u32,
        draft_round: u32,
        recorder: &dyn RunRecorder,
    ) -> Result<TurnOutcome> {
        let team = board.team(team_id)?;
        let pool = board.pool();
        let mut transcript = Vec::new();

        let base = AgentContext {
            pool,
            team,
            pick,
            draft_round,
            conversation_round: 0,
            extract_limit: self.limits.extract_limit,
            shortlist: &[],
            analyses: &[],
            feedback: &[],
        };

        // Round 0: extraction
        let results = join_all(self.extractors.iter().map(|agent| agent.propose(&base))).await;
        let mut merged = Vec::new();
        for (agent, result) in self.extractors.iter().zip(results) {
            match result {
                Ok(Proposal::Shortlist(candidates)) => {
                    let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
                    let content = names.join(", ");
                    record_message(recorder, &mut transcript, pick, 0, &**agent, content)
                        .await;
                    merged.extend(candidates);
                }
                Ok(other) => warn!(
                    "Extractor {} returned {} instead of a shortlist",
                    agent.name(),
                    other.summary()
                ),
                Err(e) => warn!("Extractor {} failed, dropping its list: {}", agent.name(), e),
            }
        }

        let shortlist = self.build_shortlist(pool, team, merged);
        debug!(
            "Pick {}: shortlist of {} for {}",
            pick,
            shortlist.len(),
            team.name
        );
        if shortlist.is_empty() {
            warn!("Pick {}: no usable shortlist for {}", pick, team.name);
            return Ok(TurnOutcome::Exhausted {
                rounds_used: 0,
                transcript,
            });
        }

        let mut feedback: Vec<String> = Vec::new();
        for round in 1..=self.limits.round_cap {
            let ctx = AgentContext {
                conversation_round: round,
                shortlist: &shortlist,
                feedback: &feedback,
                ..base
            };

            let results = join_all(self.analyzers.iter().map(|agent| agent.propose(&ctx))).await;
            let mut analyses = Vec::new();
            for (agent, result) in self.analyzers.iter().zip(results) {
                match result {
                    Ok(Proposal::Ranking(ranking)) => {
                        let content = ranking
                            .iter()
                            .map(|r| r.candidate.name.as_str())
                            .collect::<Vec<_>>()
                            .join(" > ");
                        record_message(recorder, &mut transcript, pick, round, &**agent, content)
                            .await;
                        analyses.push(Analysis {
                            analyst: agent.name().to_string(),
                            ranking,
                        });
                    }
                    Ok(other) => warn!(
                        "Analyzer {} returned {} instead of a ranking",
                        agent.name(),
                        other.summary()
                    ),
                    // Advisory role: skip and carry on
                    Err(e) => warn!("Analyzer {} skipped: {}", agent.name(), e),
                }
            }

            let ctx = AgentContext {
                analyses: &analyses,
                ..ctx
            };
            let drafter = self.head_drafter.name().to_string();
            let decision = self.head_drafter.propose(&ctx).await;
            match decision {
                Ok(Proposal::Pick(candidate)) => {
                    let verdict = self.validator.check(pool, team, candidate.player_id);
                    transcript.push(TranscriptEntry {
                        conversation_round: round,
                        agent: drafter.clone(),
                        role: AgentRole::HeadDrafter,
                        content: format!("pick {}", candidate),
                    });
                    recorder
                        .record(DraftEvent::Proposal {
                            pick,
                            conversation_round: round,
                            agent: drafter,
                            proposal: Proposal::Pick(candidate.clone()),
                            verdict: Some(verdict),
                        })
                        .await;

                    match verdict {
                        Verdict::Accepted { .. } => {
                            return Ok(TurnOutcome::Accepted {
                                player_id: candidate.player_id,
                                conversation_round: round,
                                transcript,
                            });
                        }
                        Verdict::Rejected { reason } => {
                            warn!(
                                "Pick {} round {}: {} rejected ({})",
                                pick, round, candidate.name, reason
                            );
                            feedback.push(format!(
                                "Round {}: {} rejected: {}",
                                round, candidate.name, reason
                            ));
                        }
                    }
                }
                Ok(Proposal::Abstain) => {
                    transcript.push(TranscriptEntry {
                        conversation_round: round,
                        agent: drafter.clone(),
                        role: AgentRole::HeadDrafter,
                        content: "abstain".to_string(),
                    });
                    recorder
                        .record(DraftEvent::Proposal {
                            pick,
                            conversation_round: round,
                            agent: drafter,
                            proposal: Proposal::Abstain,
                            verdict: None,
                        })
                        .await;
                    feedback.push(format!("Round {}: head drafter abstained, no pick made", round));
                }
                Ok(other) => {
                    warn!("Head drafter returned {} instead of a pick", other.summary());
                    feedback.push(format!("Round {}: no pick made", round));
                }
                Err(e) => {
                    warn!("Pick {} round {}: head drafter failed: {}", pick, round, e);
                    feedback.push(format!("Round {}: no decision ({})", round, e));
                }
            }
        }

        Ok(TurnOutcome::Exhausted {
            rounds_used: self.limits.round_cap,
            transcript,
        })
    }

    /// Merge extractor output: first occurrence wins, only legal picks kept
    fn build_shortlist(
        &self,
        pool: &PlayerPool,
        team: &Team,
        merged: Vec<PlayerCandidate>,
    ) -> Vec<PlayerCandidate> {
        let mut seen = HashSet::new();
        merged
            .into_iter()
            .filter(|c| seen.insert(c.player_id))
            .filter(|c| self.validator.check(pool, team, c.player_id).is_accepted())
            .take(self.limits.shortlist_size)
            .collect()
    }
}

async fn record_message(
    recorder: &dyn RunRecorder,
    transcript: &mut Vec<TranscriptEntry>,
    pick: u32,
    conversation_round: u32,
    agent: &dyn DraftAgent,
    content: String,
) {
    debug!("[{}] {}: {}", agent.role(), agent.name(), content);
    recorder
        .record(DraftEvent::message(
            pick,
            conversation_round,
            agent.name(),
            agent.role(),
            &content,
        ))
        .await;
    transcript.push(TranscriptEntry {
        conversation_round,
        agent: agent.name().to_string(),
        role: agent.role(),
        content,
    });
}
