//! Normalization of free-form agent output into typed proposals
//!
//! JSON is tried first (bare, fenced, or embedded in prose). When the text
//! carries no usable JSON the parser falls back to the phrasings drafting
//! models actually produce:
//!
//! - `I select Josh Allen`
//! - `RECOMMENDATION: Josh Allen - elite QB1`
//! - `**Josh Allen**` followed by `TERMINATE`
//! - numbered or bulleted lists for shortlists and rankings
//! - the `ABSTAIN` keyword
//!
//! Every name is resolved against the player pool; names that do not
//! resolve are never passed on.

use huddle_core::{PlayerId, PlayerPool};
use regex::Regex;
use serde_json::Value;

use crate::types::{AgentError, PlayerCandidate, Proposal, RankedCandidate};

/// Words that end a player name inside a sentence
const NAME_TERMINATORS: &[&str] = &[
    " because ", " as ", " with ", " for ", " at ", " who ", " since ", " - ", " – ", " — ",
];

/// Compiled response patterns
#[derive(Debug, Clone)]
pub struct ResponseParser {
    select: Regex,
    recommendation: Regex,
    bold: Regex,
    list_item: Regex,
    abstain: Regex,
    fenced: Regex,
}

/// A name or id lifted from a response, plus an optional note
#[derive(Debug)]
struct Mention {
    name: Option<String>,
    id: Option<u32>,
    note: Option<String>,
}

impl ResponseParser {
    pub fn new() -> Result<Self, AgentError> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| AgentError::Response(format!("Invalid response pattern: {}", e)))
        };
        Ok(Self {
            select: compile(
                r"(?i)\bI\s+(?:will\s+)?(?:select|pick|choose|draft|take)\s+(?:player\s+)?([^\n]+)",
            )?,
            recommendation: compile(r"(?i)RECOMMENDATION\**\s*:\s*([^\n]+)")?,
            bold: compile(r"\*\*([^*\n]+)\*\*")?,
            list_item: compile(r"(?m)^\s*(?:\d+\s*[.)]|[-*•])\s+(.+?)\s*$")?,
            abstain: compile(r"(?i)\bABSTAIN")?,
            fenced: compile(r"(?s)```(?:json)?\s*(.*?)```")?,
        })
    }

    /// Parse an extractor response into a shortlist in response order
    pub fn parse_shortlist(
        &self,
        text: &str,
        pool: &PlayerPool,
    ) -> Result<Vec<PlayerCandidate>, AgentError> {
        let mentions = match self.extract_json(text) {
            Some(json) => list_from_json(&json, &["players", "shortlist", "candidates"]),
            None => None,
        }
        .unwrap_or_else(|| self.list_from_text(text, pool));

        let candidates: Vec<PlayerCandidate> = resolve_all(&mentions, pool)
            .into_iter()
            .map(|(candidate, _)| candidate)
            .collect();
        if candidates.is_empty() {
            return Err(AgentError::Response(
                "no recognizable players in shortlist".to_string(),
            ));
        }
        Ok(candidates)
    }

    /// Parse an analyzer response into a ranking, best first
    pub fn parse_ranking(
        &self,
        text: &str,
        pool: &PlayerPool,
    ) -> Result<Vec<RankedCandidate>, AgentError> {
        let mentions = match self.extract_json(text) {
            Some(json) => list_from_json(&json, &["ranking", "players", "shortlist"]),
            None => None,
        }
        .unwrap_or_else(|| self.list_from_text(text, pool));

        let ranking: Vec<RankedCandidate> = resolve_all(&mentions, pool)
            .into_iter()
            .map(|(candidate, note)| RankedCandidate { candidate, note })
            .collect();
        if ranking.is_empty() {
            return Err(AgentError::Response(
                "no recognizable players in ranking".to_string(),
            ));
        }
        Ok(ranking)
    }

    /// Parse a head-drafter response into `Proposal::Pick` or `Proposal::Abstain`
    pub fn parse_pick(&self, text: &str, pool: &PlayerPool) -> Result<Proposal, AgentError> {
        if let Some(json) = self.extract_json(text) {
            if let Some(proposal) = pick_from_json(&json, pool)? {
                return Ok(proposal);
            }
        }

        let captured = self.pick_name_from_text(text);
        if let Some(candidate) = captured.as_deref().and_then(|name| resolve_name(name, pool)) {
            return Ok(Proposal::Pick(candidate));
        }

        // "I choose to ABSTAIN" captures a phrase that is not a player
        if self.abstain.is_match(text) {
            return Ok(Proposal::Abstain);
        }

        // A single unambiguous mention is still a decision
        let mentioned = mentioned_players(text, pool);
        if mentioned.len() == 1 {
            return Ok(Proposal::Pick(mentioned[0].clone()));
        }

        Err(AgentError::Response(match captured {
            Some(name) => format!("unknown player '{}'", name),
            None => "no player selection found in response".to_string(),
        }))
    }

    fn extract_json(&self, text: &str) -> Option<Value> {
        let trimmed = text.trim();
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            if value.is_object() || value.is_array() {
                return Some(value);
            }
        }
        if let Some(block) = self.fenced.captures(text).and_then(|c| c.get(1)) {
            if let Ok(value) = serde_json::from_str::<Value>(block.as_str().trim()) {
                return Some(value);
            }
        }
        let start = trimmed.find('{')?;
        let end = trimmed.rfind('}')?;
        if start < end {
            serde_json::from_str::<Value>(&trimmed[start..=end]).ok()
        } else {
            None
        }
    }

    fn pick_name_from_text(&self, text: &str) -> Option<String> {
        if let Some(c) = self.select.captures(text).and_then(|c| c.get(1)) {
            let name = clean_name(c.as_str());
            if !name.is_empty() {
                return Some(name);
            }
        }
        if let Some(c) = self.recommendation.captures(text).and_then(|c| c.get(1)) {
            let name = clean_name(c.as_str());
            if !name.is_empty() {
                return Some(name);
            }
        }
        // Last bold phrase before the TERMINATE marker
        if let Some(end) = text.rfind("TERMINATE") {
            let last_bold = self
                .bold
                .captures_iter(&text[..end])
                .filter_map(|c| c.get(1))
                .last();
            if let Some(bold) = last_bold {
                let name = clean_name(bold.as_str());
                if !name.is_empty() {
                    return Some(name);
                }
            }
        }
        None
    }

    fn list_from_text(&self, text: &str, pool: &PlayerPool) -> Vec<Mention> {
        let items: Vec<Mention> = self
            .list_item
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| {
                let line = m.as_str();
                Mention {
                    name: Some(clean_name(line)),
                    id: None,
                    note: note_from_line(line),
                }
            })
            .filter(|m| m.name.as_deref().is_some_and(|n| !n.is_empty()))
            .collect();

        if items
            .iter()
            .any(|m| m.name.as_deref().and_then(|n| resolve_name(n, pool)).is_some())
        {
            return items;
        }

        mentioned_players(text, pool)
            .into_iter()
            .map(|c| Mention {
                name: Some(c.name),
                id: None,
                note: None,
            })
            .collect()
    }
}

/// Cut a captured phrase down to the player name it starts with
fn clean_name(raw: &str) -> String {
    let mut name = raw.to_string();
    let cut = NAME_TERMINATORS
        .iter()
        .filter_map(|terminator| find_ignore_ascii_case(&name, terminator))
        .min();
    if let Some(idx) = cut {
        name.truncate(idx);
    }
    if let Some(idx) = name.find(['(', ':', ',', '!', '\n', '[']) {
        name.truncate(idx);
    }
    name.trim()
        .trim_matches(|c: char| c == '*' || c == '"' || c == '\'' || c == '`' || c == '.')
        .trim()
        .to_string()
}

/// Byte offset of `needle` in `haystack`, ASCII case ignored
///
/// Offsets always fall on a char boundary of `haystack`.
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    let bytes = haystack.as_bytes();
    haystack.char_indices().map(|(idx, _)| idx).find(|&idx| {
        bytes
            .get(idx..idx + needle.len())
            .is_some_and(|window| window.eq_ignore_ascii_case(needle))
    })
}

/// Text after the name in a list line ("Josh Allen - rushing upside")
fn note_from_line(line: &str) -> Option<String> {
    [" - ", " – ", " — ", ": "]
        .iter()
        .filter_map(|sep| line.find(sep).map(|idx| line[idx + sep.len()..].trim()))
        .find(|note| !note.is_empty())
        .map(|note| note.trim_matches('*').trim().to_string())
}

fn resolve_name(name: &str, pool: &PlayerPool) -> Option<PlayerCandidate> {
    pool.find_by_name(name).map(PlayerCandidate::from)
}

/// Resolve mentions in order, dropping unknown names and repeats
fn resolve_all(mentions: &[Mention], pool: &PlayerPool) -> Vec<(PlayerCandidate, Option<String>)> {
    let mut seen: Vec<PlayerId> = Vec::new();
    let mut resolved = Vec::new();
    for mention in mentions {
        let candidate = match (mention.id, mention.name.as_deref()) {
            (Some(id), _) => pool.get(PlayerId(id)).map(PlayerCandidate::from),
            (None, Some(name)) => resolve_name(name, pool),
            (None, None) => None,
        };
        match candidate {
            Some(c) if !seen.contains(&c.player_id) => {
                seen.push(c.player_id);
                resolved.push((c, mention.note.clone()));
            }
            Some(_) => {}
            None => tracing::debug!("Dropping unresolved mention {:?}", mention),
        }
    }
    resolved
}

/// Pool players named verbatim in the text, by first appearance
fn mentioned_players(text: &str, pool: &PlayerPool) -> Vec<PlayerCandidate> {
    let lowered = text.to_lowercase();
    let mut found: Vec<(usize, PlayerCandidate)> = pool
        .players()
        .iter()
        .filter_map(|p| {
            lowered
                .find(&p.name.to_lowercase())
                .map(|idx| (idx, PlayerCandidate::from(p)))
        })
        .collect();
    found.sort_by_key(|(idx, c)| (*idx, c.rank));
    found.into_iter().map(|(_, c)| c).collect()
}

fn mention_from_json(value: &Value) -> Option<Mention> {
    match value {
        Value::String(name) => Some(Mention {
            name: Some(name.clone()),
            id: None,
            note: None,
        }),
        Value::Number(n) => n.as_u64().map(|id| Mention {
            name: None,
            id: Some(id as u32),
            note: None,
        }),
        Value::Object(map) => {
            let name = ["name", "player", "pick"]
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str))
                .map(str::to_string);
            let id = map
                .get("player_id")
                .or_else(|| map.get("id"))
                .and_then(Value::as_u64)
                .map(|id| id as u32);
            let note = ["note", "reason", "reasoning"]
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str))
                .map(str::to_string);
            if name.is_none() && id.is_none() {
                None
            } else {
                Some(Mention { name, id, note })
            }
        }
        _ => None,
    }
}

fn list_from_json(json: &Value, keys: &[&str]) -> Option<Vec<Mention>> {
    let list = match json {
        Value::Array(items) => items,
        Value::Object(map) => keys
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_array))?,
        _ => return None,
    };
    Some(list.iter().filter_map(mention_from_json).collect())
}

fn pick_from_json(json: &Value, pool: &PlayerPool) -> Result<Option<Proposal>, AgentError> {
    let Value::Object(map) = json else {
        return Ok(None);
    };
    if map.get("abstain").and_then(Value::as_bool) == Some(true) {
        return Ok(Some(Proposal::Abstain));
    }

    let mention = ["pick", "player", "selection"]
        .iter()
        .find_map(|k| map.get(*k).and_then(mention_from_json))
        .or_else(|| {
            if map.contains_key("player_id") || map.contains_key("name") {
                mention_from_json(json)
            } else {
                None
            }
        });
    let Some(mention) = mention else {
        return Ok(None);
    };

    let candidate = match (mention.id, mention.name.as_deref()) {
        (Some(id), _) => pool.get(PlayerId(id)).map(PlayerCandidate::from),
        (None, Some(name)) => resolve_name(name, pool),
        (None, None) => None,
    };
    candidate.map(|c| Some(Proposal::Pick(c))).ok_or_else(|| {
        AgentError::Response(format!(
            "unknown player '{}'",
            mention
                .name
                .or_else(|| mention.id.map(|id| PlayerId(id).to_string()))
                .unwrap_or_default()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::{Player, Position};

    fn pool() -> PlayerPool {
        PlayerPool::new(vec![
            Player::new(1, "Josh Allen", Position::QB, 1),
            Player::new(2, "Bijan Robinson", Position::RB, 2),
            Player::new(3, "Marvin Harrison Jr.", Position::WR, 3),
            Player::new(4, "Travis Kelce", Position::TE, 4),
            Player::new(5, "Jalen Hurts", Position::QB, 5),
        ])
        .unwrap()
    }

    fn parser() -> ResponseParser {
        ResponseParser::new().unwrap()
    }

    fn picked(proposal: Proposal) -> String {
        match proposal {
            Proposal::Pick(c) => c.name,
            other => panic!("expected pick, got {:?}", other),
        }
    }

    #[test]
    fn test_pick_from_json() {
        let pool = pool();
        let p = parser();
        assert_eq!(picked(p.parse_pick(r#"{"pick": "Josh Allen"}"#, &pool).unwrap()), "Josh Allen");
        assert_eq!(
            picked(p.parse_pick("```json\n{\"player_id\": 4}\n```", &pool).unwrap()),
            "Travis Kelce"
        );
        assert_eq!(p.parse_pick(r#"{"abstain": true}"#, &pool).unwrap(), Proposal::Abstain);
    }

    #[test]
    fn test_pick_from_phrasing() {
        let pool = pool();
        let p = parser();
        let text = "After review, I select Bijan Robinson because of volume.";
        assert_eq!(picked(p.parse_pick(text, &pool).unwrap()), "Bijan Robinson");
        assert_eq!(
            picked(p.parse_pick("RECOMMENDATION: Jalen Hurts - rushing floor", &pool).unwrap()),
            "Jalen Hurts"
        );
        assert_eq!(
            picked(p.parse_pick("Team needs a TE.\n**Travis Kelce**\nTERMINATE", &pool).unwrap()),
            "Travis Kelce"
        );
    }

    #[test]
    fn test_suffix_normalized_pick() {
        let pool = pool();
        assert_eq!(
            picked(parser().parse_pick("I select Marvin Harrison.", &pool).unwrap()),
            "Marvin Harrison Jr."
        );
    }

    #[test]
    fn test_abstain_keyword() {
        let pool = pool();
        assert_eq!(
            parser().parse_pick("Nothing fits. ABSTAIN", &pool).unwrap(),
            Proposal::Abstain
        );
    }

    #[test]
    fn test_abstain_after_selection_phrase() {
        let pool = pool();
        let p = parser();
        assert_eq!(p.parse_pick("I choose to ABSTAIN", &pool).unwrap(), Proposal::Abstain);
        assert_eq!(
            p.parse_pick("I will not pick anyone. ABSTAIN", &pool).unwrap(),
            Proposal::Abstain
        );
    }

    #[test]
    fn test_unresolved_phrase_falls_back_to_single_mention() {
        let pool = pool();
        assert_eq!(
            picked(
                parser()
                    .parse_pick("I take the best QB left, which is Jalen Hurts.", &pool)
                    .unwrap()
            ),
            "Jalen Hurts"
        );
    }

    #[test]
    fn test_non_ascii_phrases_do_not_split_chars() {
        let pool = pool();
        let p = parser();
        // U+212A lowercases to a one-byte 'k'
        assert!(matches!(
            p.parse_pick("I select \u{212A}\u{20AC} because he is great", &pool),
            Err(AgentError::Response(_))
        ));
        assert_eq!(clean_name("\u{212A}elvin Ünal BECAUSE upside"), "\u{212A}elvin Ünal");
        assert_eq!(clean_name("Zoë Müller – sleeper"), "Zoë Müller");

        let pool = PlayerPool::new(vec![Player::new(9, "Zoë Müller", Position::WR, 1)]).unwrap();
        assert_eq!(
            picked(p.parse_pick("I select Zoë Müller As my WR1", &pool).unwrap()),
            "Zoë Müller"
        );
    }

    #[test]
    fn test_unknown_and_garbage_are_response_errors() {
        let pool = pool();
        let p = parser();
        assert!(matches!(
            p.parse_pick(r#"{"pick": "Tom Brady"}"#, &pool),
            Err(AgentError::Response(_))
        ));
        assert!(matches!(
            p.parse_pick("I like turtles", &pool),
            Err(AgentError::Response(_))
        ));
        assert!(p.parse_shortlist("no names here", &pool).is_err());
    }

    #[test]
    fn test_shortlist_from_numbered_list() {
        let pool = pool();
        let text =
            "Top options:\n1. **Josh Allen** (BUF) - elite\n2. Jalen Hurts\n3. Nobody Special\n";
        let names: Vec<String> = parser()
            .parse_shortlist(text, &pool)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Josh Allen", "Jalen Hurts"]);
    }

    #[test]
    fn test_shortlist_from_json_dedups() {
        let pool = pool();
        let shortlist = parser()
            .parse_shortlist(r#"{"players": ["Josh Allen", {"name": "Josh Allen"}, 2]}"#, &pool)
            .unwrap();
        assert_eq!(shortlist.len(), 2);
        assert_eq!(shortlist[1].name, "Bijan Robinson");
    }

    #[test]
    fn test_shortlist_from_prose_mentions() {
        let pool = pool();
        let shortlist = parser()
            .parse_shortlist("Consider Travis Kelce, then maybe Josh Allen.", &pool)
            .unwrap();
        assert_eq!(shortlist[0].name, "Travis Kelce");
        assert_eq!(shortlist[1].name, "Josh Allen");
    }

    #[test]
    fn test_ranking_keeps_notes() {
        let pool = pool();
        let ranking = parser()
            .parse_ranking("1. Bijan Robinson - workhorse\n2. Josh Allen: safe floor", &pool)
            .unwrap();
        assert_eq!(ranking[0].candidate.name, "Bijan Robinson");
        assert_eq!(ranking[0].note.as_deref(), Some("workhorse"));
        assert_eq!(ranking[1].note.as_deref(), Some("safe floor"));
    }
}
