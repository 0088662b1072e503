//! Core type definitions for the draft simulator

use serde::{Deserialize, Serialize};

/// Roster position category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
    K,
    DST,
}

impl Position {
    /// Every position, in display order
    pub const ALL: [Position; 6] = [
        Position::QB,
        Position::RB,
        Position::WR,
        Position::TE,
        Position::K,
        Position::DST,
    ];

    /// Long human-readable name, used when talking to agents
    pub fn long_name(&self) -> &'static str {
        match self {
            Self::QB => "quarterback",
            Self::RB => "running_back",
            Self::WR => "wide_receiver",
            Self::TE => "tight_end",
            Self::K => "kicker",
            Self::DST => "defense",
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QB => write!(f, "QB"),
            Self::RB => write!(f, "RB"),
            Self::WR => write!(f, "WR"),
            Self::TE => write!(f, "TE"),
            Self::K => write!(f, "K"),
            Self::DST => write!(f, "DST"),
        }
    }
}

impl std::str::FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "qb" | "quarterback" => Ok(Self::QB),
            "rb" | "running_back" | "running back" => Ok(Self::RB),
            "wr" | "wide_receiver" | "wide receiver" => Ok(Self::WR),
            "te" | "tight_end" | "tight end" => Ok(Self::TE),
            "k" | "pk" | "kicker" => Ok(Self::K),
            "dst" | "def" | "d/st" | "defense" => Ok(Self::DST),
            _ => Err(format!("Invalid position: {}", s)),
        }
    }
}

/// Stable player identifier within one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Team identifier, equal to the team's index in the league configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub u32);

impl TeamId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// A draftable player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    /// Professional team abbreviation
    #[serde(default)]
    pub nfl_team: String,
    /// Overall ranking, 1 is best
    pub rank: u32,
    #[serde(default)]
    pub projected_points: Option<f64>,
    /// Team that drafted this player, `None` while available
    #[serde(default)]
    pub drafted_by: Option<TeamId>,
}

impl Player {
    pub fn new(id: u32, name: impl Into<String>, position: Position, rank: u32) -> Self {
        Self {
            id: PlayerId(id),
            name: name.into(),
            position,
            nfl_team: String::new(),
            rank,
            projected_points: None,
            drafted_by: None,
        }
    }

    pub fn with_nfl_team(mut self, team: impl Into<String>) -> Self {
        self.nfl_team = team.into();
        self
    }

    pub fn with_projection(mut self, points: f64) -> Self {
        self.projected_points = Some(points);
        self
    }

    pub fn is_available(&self) -> bool {
        self.drafted_by.is_none()
    }
}

impl std::fmt::Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.nfl_team.is_empty() {
            write!(f, "{} ({}) #{}", self.name, self.position, self.rank)
        } else {
            write!(
                f,
                "{} ({}, {}) #{}",
                self.name, self.position, self.nfl_team, self.rank
            )
        }
    }
}

/// A capacity-bounded roster slot that accepts one or more positions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSlot {
    /// Label shown in rosters ("QB", "FLEX", "BENCH")
    pub label: String,
    /// Positions this slot accepts
    pub accepts: Vec<Position>,
    pub capacity: u32,
}

impl RosterSlot {
    pub fn new(label: impl Into<String>, accepts: Vec<Position>, capacity: u32) -> Self {
        Self {
            label: label.into(),
            accepts,
            capacity,
        }
    }

    /// Dedicated slot for a single position
    pub fn position(position: Position, capacity: u32) -> Self {
        Self::new(position.to_string(), vec![position], capacity)
    }

    /// Slot accepting any position
    pub fn bench(capacity: u32) -> Self {
        Self::new("BENCH", Position::ALL.to_vec(), capacity)
    }

    pub fn accepts(&self, position: Position) -> bool {
        self.accepts.contains(&position)
    }

    /// Dedicated slots accept exactly one position
    pub fn is_dedicated(&self) -> bool {
        self.accepts.len() == 1
    }
}

/// Who makes the decisions for a team
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamController {
    /// Multi-agent conversation
    Agents,
    /// Deterministic best-available policy
    #[default]
    Auto,
}

impl std::fmt::Display for TeamController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Agents => write!(f, "agents"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for TeamController {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "agents" | "agent" | "llm" => Ok(Self::Agents),
            "auto" => Ok(Self::Auto),
            _ => Err(format!("Invalid team controller: {}", s)),
        }
    }
}

/// Direction policy for the draft order across rounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftOrderPolicy {
    /// Forward on odd rounds, reversed on even rounds
    #[default]
    Snake,
    /// Forward every round
    Linear,
}

impl std::str::FromStr for DraftOrderPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "snake" => Ok(Self::Snake),
            "linear" => Ok(Self::Linear),
            _ => Err(format!("Invalid draft order policy: {}", s)),
        }
    }
}

/// How a pick was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PickSource {
    /// Head-Drafter proposal accepted in the given conversation round
    Conversation { round: u32 },
    /// Default pick after the conversation was exhausted
    Fallback,
    /// Best-available policy of an auto team
    Auto,
}

/// Permanent record of one committed pick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickRecord {
    /// Overall pick index, 1-based
    pub pick: u32,
    /// Draft round, 1-based
    pub round: u32,
    pub team_id: TeamId,
    pub player_id: PlayerId,
    pub source: PickSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_parsing() {
        assert_eq!("qb".parse::<Position>().unwrap(), Position::QB);
        assert_eq!("Running_Back".parse::<Position>().unwrap(), Position::RB);
        assert_eq!("wide receiver".parse::<Position>().unwrap(), Position::WR);
        assert_eq!("D/ST".parse::<Position>().unwrap(), Position::DST);
        assert!("punter".parse::<Position>().is_err());
    }

    #[test]
    fn test_position_serde_uses_short_codes() {
        let json = serde_json::to_string(&Position::TE).unwrap();
        assert_eq!(json, "\"TE\"");
        let back: Position = serde_json::from_str("\"DST\"").unwrap();
        assert_eq!(back, Position::DST);
    }

    #[test]
    fn test_slot_kinds() {
        let qb = RosterSlot::position(Position::QB, 1);
        assert!(qb.is_dedicated());
        assert!(qb.accepts(Position::QB));
        assert!(!qb.accepts(Position::RB));

        let bench = RosterSlot::bench(2);
        assert!(!bench.is_dedicated());
        assert!(Position::ALL.iter().all(|p| bench.accepts(*p)));
    }

    #[test]
    fn test_pick_source_serialization() {
        let json = serde_json::to_value(PickSource::Conversation { round: 2 }).unwrap();
        assert_eq!(json["kind"], "conversation");
        assert_eq!(json["round"], 2);
    }

    #[test]
    fn test_player_display() {
        let player = Player::new(1, "Bijan Robinson", Position::RB, 3).with_nfl_team("ATL");
        assert_eq!(player.to_string(), "Bijan Robinson (RB, ATL) #3");
        assert!(player.is_available());
    }
}
