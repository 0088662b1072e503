//! End-to-end draft scenarios.
//!
//! Every run here is offline: decisions come from the ranking heuristic or a
//! scripted backend, so results are deterministic.

use huddle_agent::{DecisionBackend, RankingBackend, ScriptedBackend};
use huddle_core::{
    DraftBoard, DraftConfig, DraftOrderPolicy, PickSource, Player, PlayerId, PlayerPool,
    Position, TeamConfig, TeamController, TeamId,
};
use huddle_orchestrator::{
    run_draft, slot_for_pick, DraftEngine, DraftEvent, DraftResult, MemoryRecorder,
    NullRecorder,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const POSITION_CYCLE: [Position; 8] = [
    Position::QB,
    Position::RB,
    Position::WR,
    Position::TE,
    Position::RB,
    Position::WR,
    Position::K,
    Position::DST,
];

fn pool(size: u32) -> PlayerPool {
    PlayerPool::new(
        (1..=size)
            .map(|i| {
                let position = POSITION_CYCLE[(i as usize - 1) % POSITION_CYCLE.len()];
                Player::new(i, format!("{} Player {}", position, i), position, i)
            })
            .collect(),
    )
    .unwrap()
}

fn league(teams: &[(&str, TeamController)], rounds: u32) -> DraftConfig {
    let mut config = DraftConfig::default();
    config.league.teams = teams
        .iter()
        .map(|(name, controller)| TeamConfig::new(*name, *controller))
        .collect();
    config.league.rounds = rounds;
    config
}

fn mixed_league() -> DraftConfig {
    let mut config = league(
        &[
            ("Alpha", TeamController::Agents),
            ("Beta", TeamController::Auto),
            ("Gamma", TeamController::Agents),
            ("Delta", TeamController::Auto),
        ],
        9,
    );
    config.league.shuffle_order = true;
    config.league.seed = 7;
    config
}

/// Team on the clock for the next pick and its expected default pick:
/// best-ranked available player for the first need that has one
fn expected_default(board: &DraftBoard, policy: DraftOrderPolicy) -> (TeamId, PlayerId) {
    let pick = board.picks().len() as u32 + 1;
    let (_, index) = slot_for_pick(pick, board.teams().len(), policy).unwrap();
    let team = board
        .teams()
        .iter()
        .find(|t| t.draft_position == index)
        .unwrap();
    let player = team
        .needs()
        .into_iter()
        .find_map(|slot| board.pool().best_available(|p| slot.accepts(p.position)))
        .unwrap();
    (team.id, player.id)
}

/// Step an engine to completion, checking every fallback pick
async fn assert_fallback_picks(config: &DraftConfig, players: PlayerPool) -> Vec<PlayerId> {
    let mut engine = DraftEngine::new(
        config,
        players,
        Arc::new(ScriptedBackend::constant("I have no idea, sorry.")),
        Arc::new(NullRecorder),
        CancellationToken::new(),
    )
    .unwrap();

    let mut fallback = Vec::new();
    loop {
        let done = engine.board().picks().len() as u32 == config.total_picks();
        let expected = (!done).then(|| expected_default(engine.board(), config.league.order));
        let Some(record) = engine.advance().await.unwrap() else {
            break;
        };
        let (team_id, player_id) = expected.unwrap();
        assert_eq!(record.team_id, team_id, "pick {}", record.pick);
        if record.source == PickSource::Fallback {
            assert_eq!(record.player_id, player_id, "pick {}", record.pick);
            fallback.push(record.player_id);
        }
    }
    fallback
}

async fn run(config: &DraftConfig, backend: Arc<dyn DecisionBackend>) -> DraftResult {
    run_draft(
        config,
        pool(80),
        backend,
        Arc::new(NullRecorder),
        CancellationToken::new(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_every_pick_is_made_once_in_order() {
    let config = mixed_league();
    let result = run(&config, Arc::new(RankingBackend)).await;

    assert_eq!(result.picks.len() as u32, config.total_picks());
    let indices: Vec<u32> = result.picks.iter().map(|p| p.pick).collect();
    assert_eq!(indices, (1..=config.total_picks()).collect::<Vec<_>>());

    let players: HashSet<_> = result.picks.iter().map(|p| p.player_id).collect();
    assert_eq!(players.len(), result.picks.len());
}

#[tokio::test]
async fn test_rosters_respect_slot_capacities() {
    let config = mixed_league();
    let mut engine = DraftEngine::new(
        &config,
        pool(80),
        Arc::new(RankingBackend),
        Arc::new(NullRecorder),
        CancellationToken::new(),
    )
    .unwrap();
    engine.run().await.unwrap();

    for team in engine.board().teams() {
        for (i, slot) in team.template().slots.iter().enumerate() {
            let used = team.entries().iter().filter(|e| e.slot == i).count() as u32;
            assert!(used <= slot.capacity, "{} overfilled {}", team.name, slot.label);
            assert_eq!(used, team.filled_count(i));
        }
        // nine rounds fill the default template exactly
        assert!(team.is_full());
        for entry in team.entries() {
            let player = engine.board().pool().get(entry.player_id).unwrap();
            assert!(team.template().slots[entry.slot].accepts(player.position));
            assert_eq!(player.drafted_by, Some(team.id));
        }
    }
}

#[tokio::test]
async fn test_snake_order_follows_first_round_order() {
    let config = mixed_league();
    let result = run(&config, Arc::new(RankingBackend)).await;

    let teams = result.order.len();
    let by_name: Vec<TeamId> = result
        .order
        .iter()
        .map(|name| {
            let index = config
                .league
                .teams
                .iter()
                .position(|t| &t.name == name)
                .unwrap();
            TeamId(index as u32)
        })
        .collect();

    for record in &result.picks {
        let offset = (record.pick as usize - 1) % teams;
        let expected = if record.round % 2 == 1 {
            by_name[offset]
        } else {
            by_name[teams - 1 - offset]
        };
        assert_eq!(record.team_id, expected, "pick {}", record.pick);
    }
}

#[tokio::test]
async fn test_linear_order_repeats_each_round() {
    let mut config = league(
        &[("A", TeamController::Auto), ("B", TeamController::Auto), ("C", TeamController::Auto)],
        3,
    );
    config.league.order = DraftOrderPolicy::Linear;
    let result = run(&config, Arc::new(RankingBackend)).await;

    let teams: Vec<u32> = result.picks.iter().map(|p| p.team_id.0).collect();
    assert_eq!(teams, vec![0, 1, 2, 0, 1, 2, 0, 1, 2]);
}

#[tokio::test]
async fn test_unparsable_agents_fall_back_and_finish() {
    let config = mixed_league();
    let backend = Arc::new(ScriptedBackend::constant("I have no idea, sorry."));
    let recorder = Arc::new(MemoryRecorder::new());

    let result = run_draft(
        &config,
        pool(80),
        backend,
        recorder.clone(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(result.picks.len() as u32, config.total_picks());
    for record in &result.picks {
        let controller = config.league.teams[record.team_id.index()].controller;
        let expected = match controller {
            TeamController::Agents => PickSource::Fallback,
            TeamController::Auto => PickSource::Auto,
        };
        assert_eq!(record.source, expected);
    }

    let exhausted = recorder
        .events()
        .iter()
        .filter(|e| matches!(e.event, DraftEvent::TurnExhausted { .. }))
        .count();
    assert_eq!(exhausted, 18);

    let fallback = assert_fallback_picks(&config, pool(80)).await;
    assert_eq!(fallback.len(), 18);
}

#[tokio::test]
async fn test_fallback_skips_needs_without_eligible_players() {
    let config = league(&[("Solo", TeamController::Agents)], 4);
    // no quarterbacks at all, so the QB need is passed over
    let players = PlayerPool::new(vec![
        Player::new(1, "Bijan Robinson", Position::RB, 1),
        Player::new(2, "Justin Jefferson", Position::WR, 2),
        Player::new(3, "Travis Kelce", Position::TE, 3),
        Player::new(4, "Breece Hall", Position::RB, 4),
        Player::new(5, "Puka Nacua", Position::WR, 5),
        Player::new(6, "Justin Tucker", Position::K, 6),
    ])
    .unwrap();

    let fallback = assert_fallback_picks(&config, players).await;
    assert_eq!(
        fallback,
        vec![PlayerId(1), PlayerId(4), PlayerId(2), PlayerId(5)]
    );
}

#[tokio::test]
async fn test_same_seed_replays_identically() {
    let config = mixed_league();
    let first = run(&config, Arc::new(RankingBackend)).await;
    let second = run(&config, Arc::new(RankingBackend)).await;

    assert_eq!(first.order, second.order);
    assert_eq!(first.picks, second.picks);
    assert_eq!(first.rosters, second.rosters);
    assert_ne!(first.run_id, second.run_id);
}

#[tokio::test]
async fn test_two_agent_teams_three_rounds() {
    let mut config = league(
        &[("A", TeamController::Agents), ("B", TeamController::Agents)],
        3,
    );
    config.conversation.round_cap = 2;

    let result = run(&config, Arc::new(RankingBackend)).await;

    let names: Vec<&str> = result
        .picks
        .iter()
        .map(|p| config.league.teams[p.team_id.index()].name.as_str())
        .collect();
    assert_eq!(names, vec!["A", "B", "B", "A", "A", "B"]);
    assert!(result
        .picks
        .iter()
        .all(|p| p.source == PickSource::Conversation { round: 1 }));
    assert_eq!(result.rosters.iter().map(|r| r.players.len()).sum::<usize>(), 6);
}

#[tokio::test]
async fn test_event_stream_is_ordered() {
    let config = league(
        &[("A", TeamController::Agents), ("B", TeamController::Auto)],
        2,
    );
    let recorder = Arc::new(MemoryRecorder::new());
    run_draft(
        &config,
        pool(40),
        Arc::new(RankingBackend),
        recorder.clone(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let events = recorder.events();
    let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, (0..events.len() as u64).collect::<Vec<_>>());

    let committed: Vec<u32> = events
        .iter()
        .filter_map(|e| match &e.event {
            DraftEvent::PickCommitted { record, .. } => Some(record.pick),
            _ => None,
        })
        .collect();
    assert_eq!(committed, vec![1, 2, 3, 4]);
    assert!(events
        .iter()
        .any(|e| matches!(e.event, DraftEvent::Message { .. })));
    assert!(matches!(
        events.last().unwrap().event,
        DraftEvent::DraftComplete { picks: 4, .. }
    ));
}
