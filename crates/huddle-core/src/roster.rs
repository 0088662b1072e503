//! Roster builder - per-team slot accounting
//!
//! A [`Team`] owns its filled slots. Slot choice for a position is
//! deterministic: a dedicated slot first, then the most specific shared slot
//! (fewest accepted positions), ties broken by template order.

use serde::{Deserialize, Serialize};

use crate::{
    DraftError, PlayerId, PlayerPool, Position, Result, RosterSlot, TeamController, TeamId,
};

/// Ordered slot layout shared by every team in a league
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterTemplate {
    pub slots: Vec<RosterSlot>,
}

impl RosterTemplate {
    pub fn new(slots: Vec<RosterSlot>) -> Self {
        Self { slots }
    }

    /// Total number of players a roster holds
    pub fn capacity(&self) -> u32 {
        self.slots.iter().map(|s| s.capacity).sum()
    }

    /// Positions accepted by at least one slot
    pub fn positions(&self) -> Vec<Position> {
        Position::ALL
            .iter()
            .copied()
            .filter(|p| self.slots.iter().any(|s| s.accepts(*p)))
            .collect()
    }
}

impl Default for RosterTemplate {
    /// 1 QB, 2 RB, 2 WR, 1 TE, 1 FLEX (RB/WR), 2 BENCH
    fn default() -> Self {
        Self::new(vec![
            RosterSlot::position(Position::QB, 1),
            RosterSlot::position(Position::RB, 2),
            RosterSlot::position(Position::WR, 2),
            RosterSlot::position(Position::TE, 1),
            RosterSlot::new("FLEX", vec![Position::RB, Position::WR], 1),
            RosterSlot::bench(2),
        ])
    }
}

/// One filled roster spot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player_id: PlayerId,
    /// Index into the template's slots
    pub slot: usize,
}

/// A team taking part in the draft
#[derive(Debug, Clone)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    /// Position in the first-round draft order, 0-based
    pub draft_position: usize,
    pub controller: TeamController,
    template: RosterTemplate,
    filled: Vec<u32>,
    entries: Vec<RosterEntry>,
}

impl Team {
    pub fn new(
        id: TeamId,
        name: impl Into<String>,
        controller: TeamController,
        template: RosterTemplate,
    ) -> Self {
        let filled = vec![0; template.slots.len()];
        Self {
            id,
            name: name.into(),
            draft_position: id.index(),
            controller,
            template,
            filled,
            entries: Vec::new(),
        }
    }

    pub fn template(&self) -> &RosterTemplate {
        &self.template
    }

    /// Filled spots in pick order
    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn filled_count(&self, slot: usize) -> u32 {
        self.filled.get(slot).copied().unwrap_or(0)
    }

    pub fn is_full(&self) -> bool {
        self.template
            .slots
            .iter()
            .zip(&self.filled)
            .all(|(slot, filled)| *filled >= slot.capacity)
    }

    /// Slot a player at `position` would occupy, if any has room
    pub fn slot_for(&self, position: Position) -> Option<usize> {
        self.template
            .slots
            .iter()
            .enumerate()
            .filter(|(i, slot)| slot.accepts(position) && self.filled[*i] < slot.capacity)
            .min_by_key(|(i, slot)| (slot.accepts.len(), *i))
            .map(|(i, _)| i)
    }

    pub fn can_roster(&self, position: Position) -> bool {
        self.slot_for(position).is_some()
    }

    /// Unfilled slots in template order, one entry per open spot
    pub fn needs(&self) -> Vec<&RosterSlot> {
        self.template
            .slots
            .iter()
            .zip(&self.filled)
            .flat_map(|(slot, filled)| {
                std::iter::repeat(slot).take(slot.capacity.saturating_sub(*filled) as usize)
            })
            .collect()
    }

    /// Positions that still have an open dedicated or shared slot
    ///
    /// Bench-style slots that accept every position are ignored, so this is
    /// the set of positions the team actually needs to start.
    pub fn starting_needs(&self) -> Vec<Position> {
        let total = Position::ALL.len();
        let mut positions: Vec<Position> = self
            .needs()
            .into_iter()
            .filter(|slot| slot.accepts.len() < total)
            .flat_map(|slot| slot.accepts.iter().copied())
            .collect();
        positions.sort();
        positions.dedup();
        positions
    }

    /// Count of rostered players per position
    pub fn position_counts(&self, pool: &PlayerPool) -> Vec<(Position, usize)> {
        Position::ALL
            .iter()
            .map(|pos| {
                let count = self
                    .entries
                    .iter()
                    .filter_map(|e| pool.get(e.player_id))
                    .filter(|p| p.position == *pos)
                    .count();
                (*pos, count)
            })
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    /// Occupy one spot in `slot`
    ///
    /// Exceeding a slot's capacity is an integrity violation.
    pub fn fill(&mut self, slot: usize, player_id: PlayerId) -> Result<()> {
        let capacity = self
            .template
            .slots
            .get(slot)
            .map(|s| s.capacity)
            .ok_or_else(|| DraftError::Integrity(format!("{} has no slot {}", self.name, slot)))?;
        if self.filled[slot] >= capacity {
            return Err(DraftError::Integrity(format!(
                "{} slot {} is already at capacity {}",
                self.name, self.template.slots[slot].label, capacity
            )));
        }
        if self.entries.iter().any(|e| e.player_id == player_id) {
            return Err(DraftError::Integrity(format!(
                "{} already rosters {}",
                self.name, player_id
            )));
        }
        self.filled[slot] += 1;
        self.entries.push(RosterEntry { player_id, slot });
        Ok(())
    }

    /// Freeze the roster into its final form
    pub fn finalize(&self, pool: &PlayerPool) -> FinalRoster {
        let players = self
            .entries
            .iter()
            .filter_map(|entry| {
                pool.get(entry.player_id).map(|p| FinalRosterEntry {
                    slot: self.template.slots[entry.slot].label.clone(),
                    player_id: p.id,
                    name: p.name.clone(),
                    position: p.position,
                    nfl_team: p.nfl_team.clone(),
                    rank: p.rank,
                })
            })
            .collect();

        FinalRoster {
            team_id: self.id,
            team_name: self.name.clone(),
            controller: self.controller,
            complete: self.is_full(),
            players,
        }
    }
}

/// A player on a finalized roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalRosterEntry {
    pub slot: String,
    pub player_id: PlayerId,
    pub name: String,
    pub position: Position,
    pub nfl_team: String,
    pub rank: u32,
}

/// Immutable roster of one team after the draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalRoster {
    pub team_id: TeamId,
    pub team_name: String,
    pub controller: TeamController,
    /// Every slot filled
    pub complete: bool,
    pub players: Vec<FinalRosterEntry>,
}

impl std::fmt::Display for FinalRoster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} ({})", self.team_name, self.controller)?;
        if self.players.is_empty() {
            return writeln!(f, "  No players drafted.");
        }
        for entry in &self.players {
            writeln!(
                f,
                "  {:<6} {} ({}, {}) #{}",
                entry.slot, entry.name, entry.position, entry.nfl_team, entry.rank
            )?;
        }
        Ok(())
    }
}
