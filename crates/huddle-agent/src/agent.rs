//! Draft agents - one capability interface, three roles
//!
//! Each `propose` call is one request/response exchange with a decision
//! backend, re-prompted with a format reminder when the answer cannot be
//! parsed. Backend outages are not re-prompted; the client already retried.

use async_trait::async_trait;
use huddle_core::{PlayerId, Position};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::backend::DecisionBackend;
use crate::parse::ResponseParser;
use crate::prompt;
use crate::types::{AgentContext, AgentError, AgentRole, BackendRequest, Proposal};

/// Capability shared by every agent role
#[async_trait]
pub trait DraftAgent: Send + Sync {
    fn role(&self) -> AgentRole;

    fn name(&self) -> &str;

    /// Produce this role's proposal for the current turn
    async fn propose(&self, ctx: &AgentContext<'_>) -> Result<Proposal, AgentError>;
}

/// Declarative description of an agent; the role tag selects the variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSpec {
    pub role: AgentRole,
    pub name: String,
    /// Extractor scope; empty means every position
    pub positions: Vec<Position>,
    pub parse_retries: u32,
}

impl AgentSpec {
    pub fn extractor(name: impl Into<String>, positions: Vec<Position>) -> Self {
        Self {
            role: AgentRole::Extractor,
            name: name.into(),
            positions,
            parse_retries: 0,
        }
    }

    pub fn analyzer(name: impl Into<String>) -> Self {
        Self {
            role: AgentRole::Analyzer,
            name: name.into(),
            positions: Vec::new(),
            parse_retries: 0,
        }
    }

    pub fn head_drafter(name: impl Into<String>) -> Self {
        Self {
            role: AgentRole::HeadDrafter,
            name: name.into(),
            positions: Vec::new(),
            parse_retries: 0,
        }
    }

    pub fn with_parse_retries(mut self, parse_retries: u32) -> Self {
        self.parse_retries = parse_retries;
        self
    }
}

/// Build the agent variant named by `spec.role`
pub fn build_agent(
    spec: AgentSpec,
    backend: Arc<dyn DecisionBackend>,
) -> Result<Box<dyn DraftAgent>, AgentError> {
    let positions = if spec.positions.is_empty() {
        Position::ALL.to_vec()
    } else {
        spec.positions
    };
    let exchange = Exchange {
        name: spec.name,
        backend,
        parser: ResponseParser::new()?,
        parse_retries: spec.parse_retries,
    };

    Ok(match spec.role {
        AgentRole::Extractor => Box::new(ExtractorAgent { exchange, positions }),
        AgentRole::Analyzer => Box::new(AnalyzerAgent { exchange }),
        AgentRole::HeadDrafter => Box::new(HeadDrafterAgent { exchange }),
    })
}

/// Request/parse loop shared by the role variants
struct Exchange {
    name: String,
    backend: Arc<dyn DecisionBackend>,
    parser: ResponseParser,
    parse_retries: u32,
}

impl Exchange {
    async fn run<T, F>(
        &self,
        role: AgentRole,
        ctx: &AgentContext<'_>,
        positions: &[Position],
        parse: F,
    ) -> Result<T, AgentError>
    where
        F: Fn(&ResponseParser, &str) -> Result<T, AgentError> + Send + Sync,
        T: Send,
    {
        let context = prompt::build_context(role, ctx, positions);
        let mut last_error = None;

        for attempt in 0..=self.parse_retries {
            let request = BackendRequest {
                role,
                agent: self.name.clone(),
                system: prompt::instructions(role).to_string(),
                context: context.clone(),
                prompt: prompt::render_prompt(role, ctx, positions, attempt),
                attempt,
            };

            let text = match self.backend.complete(&request).await {
                Ok(text) => text,
                Err(e) if e.is_reprompt() => {
                    warn!("{} got an empty answer (attempt {}): {}", self.name, attempt + 1, e);
                    last_error = Some(e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            debug!("{} ({}) answered: {}", self.name, role, text.trim());

            match parse(&self.parser, &text) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(
                        "{} response unparsable (attempt {}/{}): {}",
                        self.name,
                        attempt + 1,
                        self.parse_retries + 1,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AgentError::Response(format!("{} produced no answer", self.name))
        }))
    }
}

/// Narrows the pool to a shortlist for its positions
pub struct ExtractorAgent {
    exchange: Exchange,
    positions: Vec<Position>,
}

#[async_trait]
impl DraftAgent for ExtractorAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Extractor
    }

    fn name(&self) -> &str {
        &self.exchange.name
    }

    async fn propose(&self, ctx: &AgentContext<'_>) -> Result<Proposal, AgentError> {
        // Nothing to scout when every slot for these positions is filled
        if prompt::extractor_candidates(ctx, &self.positions).is_empty() {
            return Ok(Proposal::Shortlist(Vec::new()));
        }
        let pool = ctx.pool;
        self.exchange
            .run(AgentRole::Extractor, ctx, &self.positions, |parser, text| {
                parser.parse_shortlist(text, pool).map(Proposal::Shortlist)
            })
            .await
    }
}

/// Ranks the shortlist; its output is advisory
pub struct AnalyzerAgent {
    exchange: Exchange,
}

#[async_trait]
impl DraftAgent for AnalyzerAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Analyzer
    }

    fn name(&self) -> &str {
        &self.exchange.name
    }

    async fn propose(&self, ctx: &AgentContext<'_>) -> Result<Proposal, AgentError> {
        let pool = ctx.pool;
        let shortlisted: Vec<PlayerId> = ctx.shortlist.iter().map(|c| c.player_id).collect();
        self.exchange
            .run(AgentRole::Analyzer, ctx, &[], |parser, text| {
                let ranking: Vec<_> = parser
                    .parse_ranking(text, pool)?
                    .into_iter()
                    .filter(|r| shortlisted.contains(&r.candidate.player_id))
                    .collect();
                if ranking.is_empty() {
                    return Err(AgentError::Response(
                        "ranking names no shortlisted player".to_string(),
                    ));
                }
                Ok(Proposal::Ranking(ranking))
            })
            .await
    }
}

/// Commits to one candidate or abstains
pub struct HeadDrafterAgent {
    exchange: Exchange,
}

#[async_trait]
impl DraftAgent for HeadDrafterAgent {
    fn role(&self) -> AgentRole {
        AgentRole::HeadDrafter
    }

    fn name(&self) -> &str {
        &self.exchange.name
    }

    async fn propose(&self, ctx: &AgentContext<'_>) -> Result<Proposal, AgentError> {
        let pool = ctx.pool;
        self.exchange
            .run(AgentRole::HeadDrafter, ctx, &[], |parser, text| {
                parser.parse_pick(text, pool)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedBackend;
    use crate::types::PlayerCandidate;
    use huddle_core::{Player, PlayerPool, RosterTemplate, Team, TeamController, TeamId};

    fn fixtures() -> (PlayerPool, Team) {
        let pool = PlayerPool::new(vec![
            Player::new(1, "Josh Allen", Position::QB, 1),
            Player::new(2, "Bijan Robinson", Position::RB, 2),
            Player::new(3, "Travis Kelce", Position::TE, 3),
        ])
        .unwrap();
        let team = Team::new(TeamId(0), "Alpha", TeamController::Agents, RosterTemplate::default());
        (pool, team)
    }

    fn ctx<'a>(
        pool: &'a PlayerPool,
        team: &'a Team,
        shortlist: &'a [PlayerCandidate],
    ) -> AgentContext<'a> {
        AgentContext {
            pool,
            team,
            pick: 1,
            draft_round: 1,
            conversation_round: 1,
            extract_limit: 5,
            shortlist,
            analyses: &[],
            feedback: &[],
        }
    }

    #[tokio::test]
    async fn test_build_agent_selects_variant() {
        let backend = Arc::new(ScriptedBackend::constant("{}"));
        let agent = build_agent(AgentSpec::analyzer("value"), backend.clone()).unwrap();
        assert_eq!(agent.role(), AgentRole::Analyzer);
        assert_eq!(agent.name(), "value");

        let agent = build_agent(
            AgentSpec::extractor("qb", vec![Position::QB]),
            backend,
        )
        .unwrap();
        assert_eq!(agent.role(), AgentRole::Extractor);
    }

    #[tokio::test]
    async fn test_head_drafter_reprompts_then_parses() {
        let (pool, team) = fixtures();
        let backend = Arc::new(ScriptedBackend::new(|request| {
            if request.attempt == 0 {
                Ok("hmm, tough call".to_string())
            } else {
                Ok(r#"{"pick": "Travis Kelce"}"#.to_string())
            }
        }));
        let agent = build_agent(
            AgentSpec::head_drafter("hd").with_parse_retries(1),
            backend.clone(),
        )
        .unwrap();

        let proposal = agent.propose(&ctx(&pool, &team, &[])).await.unwrap();
        assert!(matches!(proposal, Proposal::Pick(ref c) if c.name == "Travis Kelce"));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_reprompt_budget_is_bounded() {
        let (pool, team) = fixtures();
        let backend = Arc::new(ScriptedBackend::constant("no idea"));
        let agent = build_agent(
            AgentSpec::head_drafter("hd").with_parse_retries(2),
            backend.clone(),
        )
        .unwrap();

        let err = agent.propose(&ctx(&pool, &team, &[])).await.unwrap_err();
        assert!(matches!(err, AgentError::Response(_)));
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_unavailable_is_not_reprompted() {
        let (pool, team) = fixtures();
        let backend = Arc::new(ScriptedBackend::new(|_| {
            Err(AgentError::Unavailable("connection refused".to_string()))
        }));
        let agent = build_agent(
            AgentSpec::head_drafter("hd").with_parse_retries(3),
            backend.clone(),
        )
        .unwrap();

        let err = agent.propose(&ctx(&pool, &team, &[])).await.unwrap_err();
        assert!(matches!(err, AgentError::Unavailable(_)));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_analyzer_keeps_only_shortlisted() {
        let (pool, team) = fixtures();
        let shortlist: Vec<PlayerCandidate> = pool
            .players()
            .iter()
            .skip(1)
            .map(PlayerCandidate::from)
            .collect();
        let backend = Arc::new(ScriptedBackend::constant(
            r#"{"ranking": ["Josh Allen", "Travis Kelce", "Bijan Robinson"]}"#,
        ));
        let agent = build_agent(AgentSpec::analyzer("value"), backend).unwrap();

        match agent.propose(&ctx(&pool, &team, &shortlist)).await.unwrap() {
            Proposal::Ranking(ranking) => {
                let names: Vec<&str> =
                    ranking.iter().map(|r| r.candidate.name.as_str()).collect();
                assert_eq!(names, vec!["Travis Kelce", "Bijan Robinson"]);
            }
            other => panic!("expected ranking, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extractor_skips_backend_when_positions_filled() {
        let (pool, mut team) = fixtures();
        // Fill QB and both bench spots so no slot accepts a QB
        team.fill(0, PlayerId(10)).unwrap();
        team.fill(5, PlayerId(11)).unwrap();
        team.fill(5, PlayerId(12)).unwrap();

        let backend = Arc::new(ScriptedBackend::constant("1. Josh Allen"));
        let agent = build_agent(
            AgentSpec::extractor("qb", vec![Position::QB]),
            backend.clone(),
        )
        .unwrap();

        let proposal = agent.propose(&ctx(&pool, &team, &[])).await.unwrap();
        assert_eq!(proposal, Proposal::Shortlist(Vec::new()));
        assert_eq!(backend.calls(), 0);
    }
}
