//! Draft board - the isolated mutable state of one draft run
//!
//! The board owns the player pool, the teams and the pick log. Everything is
//! read freely during a turn; the only mutation is [`DraftBoard::apply_pick`],
//! which checks every invariant before touching any state so a failed pick
//! leaves the board unchanged.

use crate::{DraftError, FinalRoster, PickRecord, PlayerPool, Result, Team, TeamId};

/// Pool, teams and committed picks of one run
#[derive(Debug, Clone)]
pub struct DraftBoard {
    pool: PlayerPool,
    teams: Vec<Team>,
    picks: Vec<PickRecord>,
}

impl DraftBoard {
    pub fn new(pool: PlayerPool, teams: Vec<Team>) -> Result<Self> {
        if teams.is_empty() {
            return Err(DraftError::Config("a draft needs at least one team".to_string()));
        }
        for (i, team) in teams.iter().enumerate() {
            if team.id.index() != i {
                return Err(DraftError::Config(format!(
                    "team {} has id {} but sits at index {}",
                    team.name, team.id, i
                )));
            }
        }
        Ok(Self {
            pool,
            teams,
            picks: Vec::new(),
        })
    }

    pub fn pool(&self) -> &PlayerPool {
        &self.pool
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn team(&self, id: TeamId) -> Result<&Team> {
        self.teams
            .get(id.index())
            .ok_or_else(|| DraftError::TeamNotFound(id.to_string()))
    }

    /// Committed picks in pick order
    pub fn picks(&self) -> &[PickRecord] {
        &self.picks
    }

    /// Index the next committed pick must carry
    pub fn next_pick(&self) -> u32 {
        self.picks.len() as u32 + 1
    }

    /// Commit a pick: mark the player drafted and occupy the team's slot
    ///
    /// All checks run before any mutation. Any failure here is an integrity
    /// violation, since proposals are validated before they reach the board.
    pub fn apply_pick(&mut self, record: PickRecord, slot: usize) -> Result<()> {
        if record.pick != self.next_pick() {
            return Err(DraftError::Integrity(format!(
                "pick {} committed out of order, expected {}",
                record.pick,
                self.next_pick()
            )));
        }

        let team = self.team(record.team_id)?;
        let player = self
            .pool
            .get(record.player_id)
            .ok_or_else(|| DraftError::PlayerNotFound(record.player_id.to_string()))?;
        if !player.is_available() {
            return Err(DraftError::Integrity(format!(
                "{} is already drafted",
                player.name
            )));
        }
        let slot_def = team.template().slots.get(slot).ok_or_else(|| {
            DraftError::Integrity(format!("{} has no slot {}", team.name, slot))
        })?;
        if !slot_def.accepts(player.position) {
            return Err(DraftError::Integrity(format!(
                "slot {} does not accept {}",
                slot_def.label, player.position
            )));
        }
        if team.filled_count(slot) >= slot_def.capacity {
            return Err(DraftError::Integrity(format!(
                "{} slot {} is full",
                team.name, slot_def.label
            )));
        }

        self.pool.mark_drafted(record.player_id, record.team_id)?;
        self.teams[record.team_id.index()].fill(slot, record.player_id)?;
        self.picks.push(record);
        Ok(())
    }

    /// Final rosters of every team, in team order
    pub fn final_rosters(&self) -> Vec<FinalRoster> {
        self.teams.iter().map(|t| t.finalize(&self.pool)).collect()
    }
}
