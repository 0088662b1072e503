//! Pick validator
//!
//! `check` is pure and may be called any number of times per turn.
//! `commit` is the only way a pick reaches the board.

use huddle_core::{
    DraftBoard, DraftError, PickRecord, PickSource, PlayerId, PlayerPool, Position, Result, Team,
    TeamId,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Configuration for the validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Allow slots that accept every position once specific slots are full
    pub bench_fallback: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            bench_fallback: true,
        }
    }
}

/// Why a proposed pick is illegal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    UnknownPlayer,
    AlreadyDrafted,
    NoSlotAvailable,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::UnknownPlayer => write!(f, "player is not in the pool"),
            RejectReason::AlreadyDrafted => write!(f, "player was already drafted"),
            RejectReason::NoSlotAvailable => write!(f, "no open roster slot for that position"),
        }
    }
}

/// Outcome of a legality check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "verdict")]
pub enum Verdict {
    /// Legal; the player would occupy template slot `slot`
    Accepted { slot: usize },
    Rejected { reason: RejectReason },
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted { .. })
    }
}

/// Legality checks and the commit path
#[derive(Debug, Clone, Default)]
pub struct PickValidator {
    config: ValidatorConfig,
}

impl PickValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Slot a player at `position` would fill on `team`
    ///
    /// Dedicated slot first, then the most specific shared slot, then (if
    /// enabled) a slot that accepts every position.
    pub fn eligible_slot(&self, team: &Team, position: Position) -> Option<usize> {
        let slot = team.slot_for(position)?;
        if !self.config.bench_fallback && is_catch_all(team, slot) {
            return None;
        }
        Some(slot)
    }

    /// Positions `team` can still legally draft
    pub fn draftable_positions(&self, team: &Team) -> Vec<Position> {
        Position::ALL
            .iter()
            .copied()
            .filter(|p| self.eligible_slot(team, *p).is_some())
            .collect()
    }

    /// Read-only legality check of a proposed pick
    pub fn check(&self, pool: &PlayerPool, team: &Team, player_id: PlayerId) -> Verdict {
        let Some(player) = pool.get(player_id) else {
            return Verdict::Rejected {
                reason: RejectReason::UnknownPlayer,
            };
        };
        if !player.is_available() {
            return Verdict::Rejected {
                reason: RejectReason::AlreadyDrafted,
            };
        }
        match self.eligible_slot(team, player.position) {
            Some(slot) => Verdict::Accepted { slot },
            None => Verdict::Rejected {
                reason: RejectReason::NoSlotAvailable,
            },
        }
    }

    /// Re-check and commit a pick to the board
    ///
    /// Committing a pick that does not pass `check` is an integrity
    /// violation: callers only commit what they validated.
    pub fn commit(
        &self,
        board: &mut DraftBoard,
        team_id: TeamId,
        player_id: PlayerId,
        pick: u32,
        round: u32,
        source: PickSource,
    ) -> Result<PickRecord> {
        let team = board.team(team_id)?;
        let slot = match self.check(board.pool(), team, player_id) {
            Verdict::Accepted { slot } => slot,
            Verdict::Rejected { reason } => {
                error!("Refusing to commit {} for {}: {}", player_id, team.name, reason);
                return Err(DraftError::Integrity(format!(
                    "commit of illegal pick {} for {}: {}",
                    player_id, team.name, reason
                )));
            }
        };

        let record = PickRecord {
            pick,
            round,
            team_id,
            player_id,
            source,
        };
        board.apply_pick(record.clone(), slot)?;
        debug!("Committed pick {} ({} -> slot {})", pick, player_id, slot);
        Ok(record)
    }
}

fn is_catch_all(team: &Team, slot: usize) -> bool {
    team.template()
        .slots
        .get(slot)
        .is_some_and(|s| Position::ALL.iter().all(|p| s.accepts(*p)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::{Player, RosterSlot, RosterTemplate, TeamController};

    fn pool() -> PlayerPool {
        PlayerPool::new(vec![
            Player::new(1, "Josh Allen", Position::QB, 1),
            Player::new(2, "Jalen Hurts", Position::QB, 2),
            Player::new(3, "Lamar Jackson", Position::QB, 3),
            Player::new(4, "Bijan Robinson", Position::RB, 4),
        ])
        .unwrap()
    }

    fn board() -> DraftBoard {
        let template = RosterTemplate::new(vec![
            RosterSlot::position(Position::QB, 1),
            RosterSlot::bench(1),
        ]);
        let teams = vec![
            Team::new(TeamId(0), "A", TeamController::Agents, template.clone()),
            Team::new(TeamId(1), "B", TeamController::Auto, template),
        ];
        DraftBoard::new(pool(), teams).unwrap()
    }

    #[test]
    fn test_check_reasons() {
        let mut board = board();
        let validator = PickValidator::default();

        let team = board.team(TeamId(0)).unwrap();
        assert_eq!(
            validator.check(board.pool(), team, PlayerId(99)),
            Verdict::Rejected {
                reason: RejectReason::UnknownPlayer
            }
        );
        assert_eq!(
            validator.check(board.pool(), team, PlayerId(1)),
            Verdict::Accepted { slot: 0 }
        );

        validator
            .commit(&mut board, TeamId(1), PlayerId(1), 1, 1, PickSource::Auto)
            .unwrap();
        let team = board.team(TeamId(0)).unwrap();
        assert_eq!(
            validator.check(board.pool(), team, PlayerId(1)),
            Verdict::Rejected {
                reason: RejectReason::AlreadyDrafted
            }
        );
    }

    #[test]
    fn test_bench_fallback_then_no_slot() {
        let mut board = board();
        let validator = PickValidator::default();

        validator
            .commit(&mut board, TeamId(0), PlayerId(1), 1, 1, PickSource::Auto)
            .unwrap();
        // QB slot full, bench takes the second QB
        let team = board.team(TeamId(0)).unwrap();
        assert_eq!(
            validator.check(board.pool(), team, PlayerId(2)),
            Verdict::Accepted { slot: 1 }
        );

        validator
            .commit(&mut board, TeamId(0), PlayerId(2), 2, 1, PickSource::Auto)
            .unwrap();
        let team = board.team(TeamId(0)).unwrap();
        assert_eq!(
            validator.check(board.pool(), team, PlayerId(3)),
            Verdict::Rejected {
                reason: RejectReason::NoSlotAvailable
            }
        );
    }

    #[test]
    fn test_without_bench_fallback() {
        let mut board = board();
        let validator = PickValidator::new(ValidatorConfig {
            bench_fallback: false,
        });
        validator
            .commit(&mut board, TeamId(0), PlayerId(1), 1, 1, PickSource::Auto)
            .unwrap();

        let team = board.team(TeamId(0)).unwrap();
        assert!(!validator.check(board.pool(), team, PlayerId(2)).is_accepted());
        assert!(validator.draftable_positions(team).is_empty());
    }

    #[test]
    fn test_rejected_commit_leaves_board_untouched() {
        let mut board = board();
        let validator = PickValidator::default();
        validator
            .commit(&mut board, TeamId(0), PlayerId(1), 1, 1, PickSource::Auto)
            .unwrap();

        let err = validator
            .commit(&mut board, TeamId(1), PlayerId(1), 2, 1, PickSource::Auto)
            .unwrap_err();
        assert!(matches!(err, DraftError::Integrity(_)));
        assert_eq!(board.picks().len(), 1);
        assert_eq!(board.team(TeamId(1)).unwrap().entries().len(), 0);
    }

    #[test]
    fn test_commit_rejects_reused_pick_index() {
        let mut board = board();
        let validator = PickValidator::default();
        validator
            .commit(&mut board, TeamId(0), PlayerId(1), 1, 1, PickSource::Auto)
            .unwrap();
        let err = validator
            .commit(&mut board, TeamId(1), PlayerId(2), 1, 1, PickSource::Auto)
            .unwrap_err();
        assert!(matches!(err, DraftError::Integrity(_)));
        assert!(board.pool().is_available(PlayerId(2)));
    }

    #[test]
    fn test_verdict_serialization() {
        let json = serde_json::to_value(Verdict::Rejected {
            reason: RejectReason::NoSlotAvailable,
        })
        .unwrap();
        assert_eq!(json["verdict"], "rejected");
        assert_eq!(json["reason"], "no_slot_available");
    }
}
