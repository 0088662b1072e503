//! Prompt builder for draft agents
//!
//! Each role gets a structured JSON context and a prompt rendered from it.
//! The JSON travels with the request so offline backends can decide from it
//! without reading prose.

use huddle_core::{Position, Team};
use serde_json::{json, Value};

use crate::types::{AgentContext, AgentRole, PlayerCandidate};

/// Role instructions sent as the system message
pub fn instructions(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Extractor => {
            "You are a fantasy football scout. From the available players listed, \
             shortlist the ones this team should consider at this pick. Reply with \
             JSON: {\"players\": [\"Name\", ...]} ordered best first."
        }
        AgentRole::Analyzer => {
            "You are a fantasy football analyst. Rank the shortlisted players for \
             this team and pick, best first, with a short note each. Reply with \
             JSON: {\"ranking\": [{\"name\": \"Name\", \"note\": \"...\"}, ...]}."
        }
        AgentRole::HeadDrafter => {
            "You are the head drafter and have the final say. Choose exactly one \
             player from the shortlist who fits an open roster slot. Reply with \
             JSON: {\"pick\": \"Name\"} or {\"abstain\": true}."
        }
    }
}

/// Appended to the prompt when a previous answer could not be parsed
pub fn format_reminder(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Extractor => {
            "Your previous answer could not be read. Answer ONLY with {\"players\": [\"Name\", ...]}."
        }
        AgentRole::Analyzer => {
            "Your previous answer could not be read. Answer ONLY with {\"ranking\": [{\"name\": \"Name\"}]}."
        }
        AgentRole::HeadDrafter => {
            "Your previous answer could not be read. Answer ONLY with {\"pick\": \"Name\"} or {\"abstain\": true}."
        }
    }
}

fn team_json(ctx: &AgentContext<'_>) -> Value {
    let team: &Team = ctx.team;
    let roster: Vec<Value> = team
        .entries()
        .iter()
        .filter_map(|entry| {
            ctx.pool.get(entry.player_id).map(|p| {
                json!({
                    "name": p.name,
                    "position": p.position,
                    "slot": team.template().slots[entry.slot].label,
                })
            })
        })
        .collect();
    let needs: Vec<&str> = team.needs().iter().map(|s| s.label.as_str()).collect();

    json!({
        "name": team.name,
        "roster": roster,
        "needs": needs,
        "starting_needs": team.starting_needs(),
    })
}

fn candidates_json(candidates: &[PlayerCandidate]) -> Value {
    Value::Array(
        candidates
            .iter()
            .map(|c| json!({ "name": c.name, "position": c.position, "rank": c.rank }))
            .collect(),
    )
}

/// Available players an extractor scoped to `positions` may choose from
pub fn extractor_candidates(
    ctx: &AgentContext<'_>,
    positions: &[Position],
) -> Vec<PlayerCandidate> {
    let mut candidates: Vec<PlayerCandidate> = positions
        .iter()
        .filter(|p| ctx.team.can_roster(**p))
        .flat_map(|p| ctx.pool.top_available(*p, ctx.extract_limit))
        .map(PlayerCandidate::from)
        .collect();
    candidates.sort_by_key(|c| c.rank);
    candidates
}

/// Structured context for one agent call
pub fn build_context(
    role: AgentRole,
    ctx: &AgentContext<'_>,
    positions: &[Position],
) -> Value {
    let mut context = json!({
        "role": role,
        "pick": ctx.pick,
        "draft_round": ctx.draft_round,
        "conversation_round": ctx.conversation_round,
        "team": team_json(ctx),
        "feedback": ctx.feedback,
    });

    match role {
        AgentRole::Extractor => {
            context["positions"] = json!(positions);
            context["candidates"] = candidates_json(&extractor_candidates(ctx, positions));
        }
        AgentRole::Analyzer => {
            context["shortlist"] = candidates_json(ctx.shortlist);
        }
        AgentRole::HeadDrafter => {
            context["shortlist"] = candidates_json(ctx.shortlist);
            context["analyses"] = json!(ctx
                .analyses
                .iter()
                .map(|a| json!({
                    "analyst": a.analyst,
                    "ranking": a.ranking.iter().map(|r| json!({
                        "name": r.candidate.name,
                        "note": r.note,
                    })).collect::<Vec<_>>(),
                }))
                .collect::<Vec<_>>());
        }
    }
    context
}

fn push_candidates(prompt: &mut String, title: &str, candidates: &[PlayerCandidate]) {
    prompt.push_str(&format!("## {}\n\n", title));
    if candidates.is_empty() {
        prompt.push_str("(none)\n\n");
        return;
    }
    for (i, c) in candidates.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, c));
    }
    prompt.push('\n');
}

/// Render the user prompt for one agent call
pub fn render_prompt(
    role: AgentRole,
    ctx: &AgentContext<'_>,
    positions: &[Position],
    attempt: u32,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "# PICK {} - ROUND {} - {}\n\n",
        ctx.pick,
        ctx.draft_round,
        ctx.team.name.to_uppercase()
    ));

    prompt.push_str("## ROSTER\n\n");
    if ctx.team.entries().is_empty() {
        prompt.push_str("No players drafted yet.\n");
    }
    for entry in ctx.team.entries() {
        if let Some(player) = ctx.pool.get(entry.player_id) {
            prompt.push_str(&format!(
                "- {}: {}\n",
                ctx.team.template().slots[entry.slot].label,
                player
            ));
        }
    }
    let needs: Vec<&str> = ctx.team.needs().iter().map(|s| s.label.as_str()).collect();
    prompt.push_str(&format!("\n**Open slots:** {}\n\n", needs.join(", ")));

    match role {
        AgentRole::Extractor => {
            push_candidates(
                &mut prompt,
                "AVAILABLE PLAYERS",
                &extractor_candidates(ctx, positions),
            );
        }
        AgentRole::Analyzer => {
            push_candidates(&mut prompt, "SHORTLIST", ctx.shortlist);
        }
        AgentRole::HeadDrafter => {
            push_candidates(&mut prompt, "SHORTLIST", ctx.shortlist);
            if !ctx.analyses.is_empty() {
                prompt.push_str("## ANALYST VIEWS\n\n");
                for analysis in ctx.analyses {
                    let top: Vec<&str> = analysis
                        .ranking
                        .iter()
                        .take(3)
                        .map(|r| r.candidate.name.as_str())
                        .collect();
                    prompt.push_str(&format!("- {}: {}\n", analysis.analyst, top.join(" > ")));
                }
                prompt.push('\n');
            }
        }
    }

    if !ctx.feedback.is_empty() {
        prompt.push_str("## EARLIER THIS TURN\n\n");
        for item in ctx.feedback {
            prompt.push_str(&format!("- {}\n", item));
        }
        prompt.push('\n');
    }

    if attempt > 0 {
        prompt.push_str(format_reminder(role));
        prompt.push('\n');
    }

    prompt
}
