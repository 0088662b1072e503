//! Player pool - the ordered catalog of draftable players
//!
//! Players are kept sorted by rank. Availability is the only mutable field and
//! is flipped through [`PlayerPool::mark_drafted`], which the pick commit path
//! calls exactly once per player.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use crate::{DraftError, Player, PlayerId, Position, Result, TeamId};

/// Ordered catalog of players for one draft run
#[derive(Debug, Clone, Default)]
pub struct PlayerPool {
    players: Vec<Player>,
    index: HashMap<PlayerId, usize>,
}

impl PlayerPool {
    /// Build a pool, ordering players by rank (ties keep input order)
    pub fn new(mut players: Vec<Player>) -> Result<Self> {
        players.sort_by_key(|p| p.rank);

        let mut index = HashMap::with_capacity(players.len());
        for (i, player) in players.iter().enumerate() {
            if index.insert(player.id, i).is_some() {
                return Err(DraftError::PlayerData(format!(
                    "Duplicate player id {}",
                    player.id
                )));
            }
        }

        Ok(Self { players, index })
    }

    /// Parse a ranking CSV with `Name`, `Team` and `Pos` columns
    ///
    /// Row order is the ranking unless a `Rank` column is present. Rows with
    /// a missing name or an unknown position are skipped.
    pub fn from_csv_str(content: &str) -> Result<Self> {
        let mut lines = content.lines().filter(|l| !l.trim().is_empty());
        let header = lines
            .next()
            .ok_or_else(|| DraftError::PlayerData("Empty player CSV".to_string()))?;
        let columns: Vec<String> = split_csv_line(header)
            .into_iter()
            .map(|c| c.to_lowercase())
            .collect();

        let col = |names: &[&str]| columns.iter().position(|c| names.contains(&c.as_str()));
        let name_col = col(&["name", "player"])
            .ok_or_else(|| DraftError::PlayerData("CSV is missing a Name column".to_string()))?;
        let pos_col = col(&["pos", "position"])
            .ok_or_else(|| DraftError::PlayerData("CSV is missing a Pos column".to_string()))?;
        let team_col = col(&["team"]);
        let rank_col = col(&["rank", "rk"]);
        let points_col = col(&["points", "proj", "fpts"]);

        let mut players = Vec::new();
        let mut skipped = 0usize;
        for (row, line) in lines.enumerate() {
            let fields = split_csv_line(line);
            let field = |i: usize| fields.get(i).map(|s| s.as_str()).unwrap_or("");

            let name = field(name_col);
            let Ok(position) = field(pos_col).parse::<Position>() else {
                skipped += 1;
                continue;
            };
            if name.is_empty() {
                skipped += 1;
                continue;
            }

            let rank = rank_col
                .and_then(|c| field(c).parse::<u32>().ok())
                .unwrap_or(row as u32 + 1);
            let id = players.len() as u32 + 1;
            let mut player = Player::new(id, name, position, rank);
            if let Some(c) = team_col {
                player = player.with_nfl_team(field(c));
            }
            if let Some(points) = points_col.and_then(|c| field(c).parse::<f64>().ok()) {
                player = player.with_projection(points);
            }
            players.push(player);
        }

        debug!("Loaded {} players from CSV ({} rows skipped)", players.len(), skipped);
        Self::new(players)
    }

    /// Parse a JSON array of players
    ///
    /// `id` and `rank` are optional and default to the array position.
    pub fn from_json_str(content: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct RawPlayer {
            id: Option<u32>,
            name: String,
            position: Position,
            #[serde(default)]
            nfl_team: String,
            rank: Option<u32>,
            projected_points: Option<f64>,
        }

        let raw: Vec<RawPlayer> = serde_json::from_str(content)?;
        let players = raw
            .into_iter()
            .enumerate()
            .map(|(i, r)| {
                let seq = i as u32 + 1;
                Player {
                    id: PlayerId(r.id.unwrap_or(seq)),
                    name: r.name,
                    position: r.position,
                    nfl_team: r.nfl_team,
                    rank: r.rank.unwrap_or(seq),
                    projected_points: r.projected_points,
                    drafted_by: None,
                }
            })
            .collect();

        Self::new(players)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.index.get(&id).map(|&i| &self.players[i])
    }

    pub fn is_available(&self, id: PlayerId) -> bool {
        self.get(id).map(|p| p.is_available()).unwrap_or(false)
    }

    /// All players in rank order
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Available players in rank order
    pub fn available(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_available())
    }

    pub fn available_count(&self) -> usize {
        self.available().count()
    }

    /// Available players at one position, best first, at most `limit`
    pub fn top_available(&self, position: Position, limit: usize) -> Vec<&Player> {
        self.available()
            .filter(|p| p.position == position)
            .take(limit)
            .collect()
    }

    /// Best-ranked available player matching a predicate
    pub fn best_available<F>(&self, mut predicate: F) -> Option<&Player>
    where
        F: FnMut(&Player) -> bool,
    {
        self.available().find(|p| predicate(p))
    }

    /// Names of every drafted player, in rank order
    pub fn drafted_names(&self) -> Vec<&str> {
        self.players
            .iter()
            .filter(|p| !p.is_available())
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Resolve a free-form name to a player
    ///
    /// Tries an exact case-insensitive match, then a match ignoring name
    /// suffixes (Jr., Sr., II, III, IV), then a unique containment match.
    /// Drafted players are included so callers can report `AlreadyDrafted`.
    pub fn find_by_name(&self, name: &str) -> Option<&Player> {
        let wanted = name.trim().trim_matches(|c: char| c == '*' || c == '"' || c == '.');
        if wanted.is_empty() {
            return None;
        }
        let wanted_lower = wanted.to_lowercase();

        if let Some(p) = self
            .players
            .iter()
            .find(|p| p.name.to_lowercase() == wanted_lower)
        {
            return Some(p);
        }

        let wanted_norm = normalize_name(wanted);
        if let Some(p) = self
            .players
            .iter()
            .find(|p| normalize_name(&p.name) == wanted_norm)
        {
            return Some(p);
        }

        // Containment either way: "Lamar Jackson (BAL)" or a last name only
        let mut matches = self.players.iter().filter(|p| {
            let norm = normalize_name(&p.name);
            wanted_norm.contains(&norm) || (wanted_norm.len() >= 4 && norm.contains(&wanted_norm))
        });
        let first = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        Some(first)
    }

    /// Mark a player as drafted by a team
    ///
    /// Only the pick commit path may call this. Drafting an unknown or
    /// already-drafted player is an integrity violation.
    pub fn mark_drafted(&mut self, id: PlayerId, team: TeamId) -> Result<()> {
        let idx = *self
            .index
            .get(&id)
            .ok_or_else(|| DraftError::PlayerNotFound(id.to_string()))?;
        let player = &mut self.players[idx];
        if let Some(owner) = player.drafted_by {
            return Err(DraftError::Integrity(format!(
                "{} already drafted by {}",
                player.name, owner
            )));
        }
        player.drafted_by = Some(team);
        Ok(())
    }
}

/// Lowercase a name and strip generational suffixes and punctuation
pub fn normalize_name(name: &str) -> String {
    let lowered = name.to_lowercase().replace(['.', ',', '\''], "");
    let mut parts: Vec<&str> = lowered.split_whitespace().collect();
    while let Some(last) = parts.last() {
        if matches!(*last, "jr" | "sr" | "ii" | "iii" | "iv" | "v") && parts.len() > 1 {
            parts.pop();
        } else {
            break;
        }
    }
    parts.join(" ")
}

/// Split one CSV line, honouring double-quoted fields
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pool() -> PlayerPool {
        PlayerPool::new(vec![
            Player::new(3, "Justin Jefferson", Position::WR, 3),
            Player::new(1, "Christian McCaffrey", Position::RB, 1),
            Player::new(2, "Odell Beckham Jr.", Position::WR, 2),
            Player::new(4, "Josh Allen", Position::QB, 4),
            Player::new(5, "Josh Jacobs", Position::RB, 5),
        ])
        .unwrap()
    }

    #[test]
    fn test_pool_is_rank_ordered() {
        let pool = sample_pool();
        let ranks: Vec<u32> = pool.players().iter().map(|p| p.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = PlayerPool::new(vec![
            Player::new(1, "A", Position::QB, 1),
            Player::new(1, "B", Position::RB, 2),
        ]);
        assert!(matches!(result, Err(DraftError::PlayerData(_))));
    }

    #[test]
    fn test_mark_drafted_once() {
        let mut pool = sample_pool();
        pool.mark_drafted(PlayerId(1), TeamId(0)).unwrap();
        assert!(!pool.is_available(PlayerId(1)));
        assert_eq!(pool.available_count(), 4);

        let again = pool.mark_drafted(PlayerId(1), TeamId(1));
        assert!(matches!(again, Err(DraftError::Integrity(_))));

        let unknown = pool.mark_drafted(PlayerId(99), TeamId(1));
        assert!(matches!(unknown, Err(DraftError::PlayerNotFound(_))));
    }

    #[test]
    fn test_find_by_name() {
        let pool = sample_pool();
        assert_eq!(pool.find_by_name("josh allen").unwrap().id, PlayerId(4));
        assert_eq!(pool.find_by_name("**Josh Allen**").unwrap().id, PlayerId(4));
        assert_eq!(pool.find_by_name("Odell Beckham").unwrap().id, PlayerId(2));
        assert_eq!(pool.find_by_name("Jefferson").unwrap().id, PlayerId(3));
        // Ambiguous first name
        assert!(pool.find_by_name("Josh").is_none());
        assert!(pool.find_by_name("Tom Brady").is_none());
    }

    #[test]
    fn test_top_available_by_position() {
        let mut pool = sample_pool();
        pool.mark_drafted(PlayerId(1), TeamId(0)).unwrap();
        let rbs: Vec<PlayerId> = pool
            .top_available(Position::RB, 10)
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(rbs, vec![PlayerId(5)]);
    }

    #[test]
    fn test_from_csv() {
        let csv = "Rk,Name,Team,Pos\n\
                   1,Christian McCaffrey,SF,RB\n\
                   2,\"Chase, Ja'Marr\",CIN,WR\n\
                   3,Some Punter,NYG,P\n\
                   4,Josh Allen,BUF,QB\n";
        let pool = PlayerPool::from_csv_str(csv).unwrap();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.players()[1].name, "Chase, Ja'Marr");
        assert_eq!(pool.players()[2].rank, 4);
        assert_eq!(pool.players()[0].nfl_team, "SF");
    }

    #[test]
    fn test_from_csv_without_rank_uses_row_order() {
        let csv = "Name,Team,Pos\nA,X,QB\nB,Y,TE\n";
        let pool = PlayerPool::from_csv_str(csv).unwrap();
        assert_eq!(pool.players()[0].rank, 1);
        assert_eq!(pool.players()[1].rank, 2);
        assert!(PlayerPool::from_csv_str("Team,Pos\nX,QB\n").is_err());
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {"name": "Travis Kelce", "position": "TE", "nfl_team": "KC", "rank": 2},
            {"name": "Tyreek Hill", "position": "WR", "rank": 1}
        ]"#;
        let pool = PlayerPool::from_json_str(json).unwrap();
        assert_eq!(pool.players()[0].name, "Tyreek Hill");
        assert_eq!(pool.get(PlayerId(1)).unwrap().nfl_team, "KC");
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Odell Beckham Jr."), "odell beckham");
        assert_eq!(normalize_name("Michael Pittman Jr"), "michael pittman");
        assert_eq!(normalize_name("Ja'Marr Chase"), "jamarr chase");
        assert_eq!(normalize_name("Jr"), "jr");
    }
}
