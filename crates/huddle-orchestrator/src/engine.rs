//! Draft engine - drives one run from first pick to final rosters
//!
//! The engine owns the board and feeds events into the pure state machine.
//! Each `advance` derives the active team from the pick index, obtains one
//! legal player (conversation, fallback, or auto policy) and commits it
//! through the validator. Cancellation is observed between turns only.

use huddle_agent::DecisionBackend;
use huddle_core::{
    DraftBoard, DraftConfig, DraftError, DraftOrderPolicy, FinalRoster, PickRecord, PickSource,
    PlayerId, PlayerPool, Position, Result, Team, TeamController, TeamId,
};
use huddle_validation::PickValidator;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::conversation::{ConversationCoordinator, TurnOutcome};
use crate::recorder::{DraftEvent, RunRecorder};
use crate::state_machine::{slot_for_pick, transition, Action, DraftState, Event};

/// Everything a finished run produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftResult {
    pub run_id: Uuid,
    /// Team names in first-round order
    pub order: Vec<String>,
    pub picks: Vec<PickRecord>,
    pub rosters: Vec<FinalRoster>,
}

/// One draft run
pub struct DraftEngine {
    board: DraftBoard,
    order: Vec<TeamId>,
    policy: DraftOrderPolicy,
    rounds: u32,
    fallback_skill_rounds: u32,
    state: DraftState,
    validator: PickValidator,
    coordinator: ConversationCoordinator,
    recorder: Arc<dyn RunRecorder>,
    cancel: CancellationToken,
}

impl DraftEngine {
    /// Build the board for `config` over its own copy of `pool`
    pub fn new(
        config: &DraftConfig,
        pool: PlayerPool,
        backend: Arc<dyn DecisionBackend>,
        recorder: Arc<dyn RunRecorder>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        config.validate()?;
        let total_picks = config.total_picks();
        if pool.available_count() < total_picks as usize {
            return Err(DraftError::Config(format!(
                "{} available players cannot fill {} picks",
                pool.available_count(),
                total_picks
            )));
        }

        let mut order: Vec<TeamId> = (0..config.league.teams.len() as u32).map(TeamId).collect();
        if config.league.shuffle_order {
            let mut rng = StdRng::seed_from_u64(config.league.seed);
            order.shuffle(&mut rng);
        }

        let mut teams: Vec<Team> = config
            .league
            .teams
            .iter()
            .enumerate()
            .map(|(i, t)| {
                Team::new(
                    TeamId(i as u32),
                    &t.name,
                    t.controller,
                    config.roster.clone(),
                )
            })
            .collect();
        for (position, id) in order.iter().enumerate() {
            teams[id.index()].draft_position = position;
        }

        let validator = PickValidator::default();
        let coordinator = ConversationCoordinator::from_config(config, backend, validator.clone())
            .map_err(|e| DraftError::Config(format!("failed to build agent lineup: {}", e)))?;

        Ok(Self {
            board: DraftBoard::new(pool, teams)?,
            order,
            policy: config.league.order,
            rounds: config.league.rounds,
            fallback_skill_rounds: config.conversation.fallback_skill_rounds,
            state: DraftState::Initializing,
            validator,
            coordinator,
            recorder,
            cancel,
        })
    }

    pub fn board(&self) -> &DraftBoard {
        &self.board
    }

    pub fn state(&self) -> &DraftState {
        &self.state
    }

    pub fn run_id(&self) -> Uuid {
        self.recorder.run_id()
    }

    /// Team names in first-round order
    pub fn order(&self) -> Vec<String> {
        self.order
            .iter()
            .filter_map(|id| self.board.team(*id).ok())
            .map(|t| t.name.clone())
            .collect()
    }

    fn total_picks(&self) -> u32 {
        self.order.len() as u32 * self.rounds
    }

    /// Take the next step of the draft
    ///
    /// Starts the draft on first call, then commits exactly one pick per
    /// call. Returns `Ok(None)` once the draft is complete.
    pub async fn advance(&mut self) -> Result<Option<PickRecord>> {
        if self.state == DraftState::Initializing {
            let total_picks = self.total_picks();
            self.recorder
                .record(DraftEvent::DraftStarted {
                    order: self.order(),
                    rounds: self.rounds,
                    total_picks,
                    policy: self.policy,
                })
                .await;
            self.feed(Event::Start { total_picks }).await?;
        }

        let pick = match &self.state {
            DraftState::InProgress { pick, .. } => *pick,
            DraftState::Complete => return Ok(None),
            DraftState::Failed { error } => {
                return Err(DraftError::Other(format!("draft already failed: {}", error)))
            }
            DraftState::Initializing => {
                return Err(DraftError::Integrity("draft did not start".to_string()))
            }
        };

        if self.cancel.is_cancelled() {
            warn!("Cancellation requested, stopping before pick {}", pick);
            // The cancellation is what the caller sees
            if let Err(e) = self.feed(Event::Cancelled).await {
                debug!("Draft stopped at pick {}: {}", pick, e);
            }
            return Err(DraftError::Cancelled(pick));
        }

        match self.take_turn(pick).await {
            Ok(record) => {
                self.feed(Event::PickCommitted { pick: record.pick }).await?;
                Ok(Some(record))
            }
            Err(e) => {
                error!("Pick {} aborted the draft: {}", pick, e);
                let reason = e.to_string();
                if let Err(transition) = self.feed(Event::IntegrityViolation { reason }).await {
                    debug!("Draft failed at pick {}: {}", pick, transition);
                }
                Err(e)
            }
        }
    }

    /// Advance until the draft is complete
    pub async fn run(&mut self) -> Result<DraftResult> {
        while self.advance().await?.is_some() {}
        Ok(DraftResult {
            run_id: self.run_id(),
            order: self.order(),
            picks: self.board.picks().to_vec(),
            rosters: self.board.final_rosters(),
        })
    }

    async fn take_turn(&mut self, pick: u32) -> Result<PickRecord> {
        let (round, index) = slot_for_pick(pick, self.order.len(), self.policy)
            .ok_or_else(|| DraftError::Integrity(format!("pick {} has no team", pick)))?;
        let team_id = self.order[index];
        let team = self.board.team(team_id)?;
        debug!("Pick {} (round {}): {} on the clock", pick, round, team.name);

        let (player_id, source) = match team.controller {
            TeamController::Auto => (self.auto_pick(team)?, PickSource::Auto),
            TeamController::Agents => {
                let outcome = self
                    .coordinator
                    .run_turn(&self.board, team_id, pick, round, self.recorder.as_ref())
                    .await?;
                match outcome {
                    TurnOutcome::Accepted {
                        player_id,
                        conversation_round,
                        ..
                    } => (
                        player_id,
                        PickSource::Conversation {
                            round: conversation_round,
                        },
                    ),
                    TurnOutcome::Exhausted { rounds_used, .. } => {
                        warn!(
                            "Pick {}: conversation for {} exhausted after {} rounds, using default pick",
                            pick, team.name, rounds_used
                        );
                        self.recorder
                            .record(DraftEvent::TurnExhausted {
                                pick,
                                team_id,
                                rounds_used,
                            })
                            .await;
                        (self.default_pick(team, round)?, PickSource::Fallback)
                    }
                }
            }
        };

        let record =
            self.validator
                .commit(&mut self.board, team_id, player_id, pick, round, source)?;

        let team_name = self.board.team(team_id)?.name.clone();
        let player_name = self
            .board
            .pool()
            .get(player_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        info!(
            "Pick {} (round {}): {} selects {} [{:?}]",
            pick, round, team_name, player_name, record.source
        );
        self.recorder
            .record(DraftEvent::PickCommitted {
                record: record.clone(),
                team: team_name,
                player: player_name,
            })
            .await;
        Ok(record)
    }

    /// Best-ranked legal player at a starting need, else any legal player
    fn auto_pick(&self, team: &Team) -> Result<PlayerId> {
        let pool = self.board.pool();
        let needs = team.starting_needs();
        pool.best_available(|p| {
            needs.contains(&p.position) && self.validator.check(pool, team, p.id).is_accepted()
        })
        .or_else(|| pool.best_available(|p| self.validator.check(pool, team, p.id).is_accepted()))
        .map(|p| p.id)
        .ok_or_else(|| no_legal_player(team))
    }

    /// Best-ranked legal player for the first open slot that has one
    ///
    /// In the first `fallback_skill_rounds` rounds a legal RB or WR is taken
    /// ahead of the needs order.
    fn default_pick(&self, team: &Team, round: u32) -> Result<PlayerId> {
        let pool = self.board.pool();
        let legal = |id: PlayerId| self.validator.check(pool, team, id).is_accepted();

        if round <= self.fallback_skill_rounds {
            let skill = pool.best_available(|p| {
                matches!(p.position, Position::RB | Position::WR) && legal(p.id)
            });
            if let Some(player) = skill {
                return Ok(player.id);
            }
        }

        team.needs()
            .into_iter()
            .find_map(|slot| pool.best_available(|p| slot.accepts(p.position) && legal(p.id)))
            .map(|p| p.id)
            .ok_or_else(|| no_legal_player(team))
    }

    /// Apply an event to the state machine and execute its actions
    async fn feed(&mut self, event: Event) -> Result<()> {
        let state = std::mem::replace(&mut self.state, DraftState::Initializing);
        let (state, actions) = transition(state, event);
        self.state = state;

        for action in actions {
            match action {
                Action::Log { message } => info!("{}", message),
                Action::RunTurn { pick } => debug!("Next: pick {}", pick),
                Action::FinalizeRosters => {
                    self.recorder
                        .record(DraftEvent::DraftComplete {
                            picks: self.board.picks().len() as u32,
                            rosters: self.board.final_rosters(),
                        })
                        .await;
                }
            }
        }

        match &self.state {
            DraftState::Failed { error } => Err(DraftError::Integrity(error.clone())),
            _ => Ok(()),
        }
    }
}

fn no_legal_player(team: &Team) -> DraftError {
    DraftError::Integrity(format!("no legal player left for {}", team.name))
}

/// Run one draft to completion
pub async fn run_draft(
    config: &DraftConfig,
    pool: PlayerPool,
    backend: Arc<dyn DecisionBackend>,
    recorder: Arc<dyn RunRecorder>,
    cancel: CancellationToken,
) -> Result<DraftResult> {
    let mut engine = DraftEngine::new(config, pool, backend, recorder, cancel)?;
    info!(
        "Starting draft {}: {} teams, {} rounds",
        engine.run_id(),
        engine.order.len(),
        engine.rounds
    );
    engine.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::{MemoryRecorder, NullRecorder};
    use huddle_agent::{RankingBackend, ScriptedBackend};
    use huddle_core::{Player, Position, RosterSlot, RosterTemplate, TeamConfig};

    fn pool() -> PlayerPool {
        let positions = [Position::QB, Position::RB, Position::WR, Position::TE];
        PlayerPool::new(
            (1..=24)
                .map(|i| {
                    let position = positions[(i as usize - 1) % positions.len()];
                    Player::new(i, format!("Player {}", i), position, i)
                })
                .collect(),
        )
        .unwrap()
    }

    fn config(controllers: &[TeamController], rounds: u32) -> DraftConfig {
        let mut config = DraftConfig::default();
        config.league.teams = controllers
            .iter()
            .enumerate()
            .map(|(i, c)| TeamConfig::new(format!("Team {}", i + 1), *c))
            .collect();
        config.league.rounds = rounds;
        config.conversation.parse_retries = 0;
        config
    }

    #[tokio::test]
    async fn test_auto_draft_runs_to_completion() {
        let config = config(&[TeamController::Auto; 3], 4);
        let result = run_draft(
            &config,
            pool(),
            Arc::new(RankingBackend),
            Arc::new(NullRecorder),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.picks.len(), 12);
        assert!(result.picks.iter().all(|p| p.source == PickSource::Auto));
        assert_eq!(result.rosters.len(), 3);
    }

    #[tokio::test]
    async fn test_auto_pick_prefers_starting_needs() {
        let mut config = config(&[TeamController::Auto], 2);
        config.roster = RosterTemplate::new(vec![
            RosterSlot::position(Position::QB, 1),
            RosterSlot::position(Position::TE, 1),
        ]);
        let pool = PlayerPool::new(vec![
            Player::new(1, "Josh Allen", Position::QB, 1),
            Player::new(2, "Jalen Hurts", Position::QB, 2),
            Player::new(3, "Bijan Robinson", Position::RB, 3),
            Player::new(4, "Travis Kelce", Position::TE, 4),
        ])
        .unwrap();

        let result = run_draft(
            &config,
            pool,
            Arc::new(RankingBackend),
            Arc::new(NullRecorder),
            CancellationToken::new(),
        )
        .await
        .unwrap();
        let ids: Vec<PlayerId> = result.picks.iter().map(|p| p.player_id).collect();
        assert_eq!(ids, vec![PlayerId(1), PlayerId(4)]);
    }

    #[tokio::test]
    async fn test_pool_smaller_than_draft_is_rejected() {
        let config = config(&[TeamController::Auto; 4], 9);
        let err = DraftEngine::new(
            &config,
            pool(),
            Arc::new(RankingBackend),
            Arc::new(NullRecorder),
            CancellationToken::new(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, DraftError::Config(_)));
    }

    #[tokio::test]
    async fn test_cancel_between_turns() {
        let config = config(&[TeamController::Auto; 2], 3);
        let cancel = CancellationToken::new();
        let mut engine = DraftEngine::new(
            &config,
            pool(),
            Arc::new(RankingBackend),
            Arc::new(NullRecorder),
            cancel.clone(),
        )
        .unwrap();

        engine.advance().await.unwrap();
        engine.advance().await.unwrap();
        cancel.cancel();

        let err = engine.advance().await.unwrap_err();
        assert!(matches!(err, DraftError::Cancelled(3)));
        assert_eq!(engine.board().picks().len(), 2);
        assert!(engine.state().is_terminal());
    }

    #[tokio::test]
    async fn test_exhausted_turn_uses_default_pick() {
        let config = config(&[TeamController::Agents], 2);
        let recorder = Arc::new(MemoryRecorder::new());
        let backend = Arc::new(ScriptedBackend::constant("ABSTAIN"));

        let result = run_draft(
            &config,
            pool(),
            backend,
            recorder.clone(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(result.picks.iter().all(|p| p.source == PickSource::Fallback));
        // first open slot is QB, then RB
        assert_eq!(result.picks[0].player_id, PlayerId(1));
        assert_eq!(result.picks[1].player_id, PlayerId(2));
        let exhausted = recorder
            .events()
            .iter()
            .filter(|e| matches!(e.event, DraftEvent::TurnExhausted { .. }))
            .count();
        assert_eq!(exhausted, 2);
    }

    #[tokio::test]
    async fn test_default_pick_prefers_skill_players_early() {
        let mut config = config(&[TeamController::Agents], 5);
        config.conversation.fallback_skill_rounds = 3;

        let result = run_draft(
            &config,
            pool(),
            Arc::new(ScriptedBackend::constant("ABSTAIN")),
            Arc::new(NullRecorder),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let ids: Vec<PlayerId> = result.picks.iter().map(|p| p.player_id).collect();
        // RB, WR, RB in rounds 1-3, then needs order: QB, second WR
        assert_eq!(
            ids,
            vec![PlayerId(2), PlayerId(3), PlayerId(6), PlayerId(1), PlayerId(7)]
        );
    }

    #[tokio::test]
    async fn test_seeded_shuffle_is_stable() {
        let mut config = config(&[TeamController::Auto; 6], 1);
        config.league.shuffle_order = true;
        config.league.seed = 42;

        let build = |config: &DraftConfig| {
            DraftEngine::new(
                config,
                pool(),
                Arc::new(RankingBackend),
                Arc::new(NullRecorder),
                CancellationToken::new(),
            )
            .unwrap()
        };
        let first = build(&config);
        let second = build(&config);
        assert_eq!(first.order(), second.order());

        let mut names = first.order();
        names.sort();
        let mut expected: Vec<String> =
            config.league.teams.iter().map(|t| t.name.clone()).collect();
        expected.sort();
        assert_eq!(names, expected);
        for (position, name) in first.order().iter().enumerate() {
            let team = first
                .board()
                .teams()
                .iter()
                .find(|t| &t.name == name)
                .unwrap();
            assert_eq!(team.draft_position, position);
        }
    }

    #[tokio::test]
    async fn test_recorder_sees_start_and_complete() {
        let config = config(&[TeamController::Auto; 2], 1);
        let recorder = Arc::new(MemoryRecorder::new());
        run_draft(
            &config,
            pool(),
            Arc::new(RankingBackend),
            recorder.clone(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let events = recorder.events();
        assert!(matches!(
            events.first().unwrap().event,
            DraftEvent::DraftStarted { total_picks: 2, .. }
        ));
        assert!(matches!(
            events.last().unwrap().event,
            DraftEvent::DraftComplete { picks: 2, .. }
        ));
    }
}
