//! Offline decision backends
//!
//! `ScriptedBackend` answers from a closure and counts calls, for tests.
//! `RankingBackend` decides from the structured request context alone,
//! always preferring the best-ranked player, so whole drafts can run
//! deterministically without a network.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::backend::DecisionBackend;
use crate::types::{AgentError, AgentRole, BackendRequest};

type Responder = dyn Fn(&BackendRequest) -> Result<String, AgentError> + Send + Sync;

/// Backend driven by a closure
pub struct ScriptedBackend {
    respond: Box<Responder>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&BackendRequest) -> Result<String, AgentError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answer with the same text
    pub fn constant(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Number of requests served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecisionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &BackendRequest) -> Result<String, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(request)
    }
}

/// Heuristic backend: best rank wins for every role
#[derive(Debug, Default, Clone, Copy)]
pub struct RankingBackend;

impl RankingBackend {
    pub fn new() -> Self {
        Self
    }

    /// Names of `context[key]` ordered by rank
    fn ranked_names(context: &Value, key: &str) -> Vec<(String, u64)> {
        let mut entries: Vec<(String, u64)> = context[key]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let name = item["name"].as_str()?;
                        let rank = item["rank"].as_u64().unwrap_or(u64::MAX);
                        Some((name.to_string(), rank))
                    })
                    .collect()
            })
            .unwrap_or_default();
        entries.sort_by_key(|(_, rank)| *rank);
        entries
    }

    fn respond(request: &BackendRequest) -> Value {
        let context = &request.context;
        match request.role {
            AgentRole::Extractor => {
                let names: Vec<String> = Self::ranked_names(context, "candidates")
                    .into_iter()
                    .map(|(name, _)| name)
                    .collect();
                json!({ "players": names })
            }
            AgentRole::Analyzer => {
                let ranking: Vec<Value> = Self::ranked_names(context, "shortlist")
                    .into_iter()
                    .map(|(name, rank)| {
                        json!({ "name": name, "note": format!("overall rank {}", rank) })
                    })
                    .collect();
                json!({ "ranking": ranking })
            }
            AgentRole::HeadDrafter => {
                // Skip anyone already turned down earlier in this turn
                let feedback: Vec<&str> = context["feedback"]
                    .as_array()
                    .map(|items| items.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();
                Self::ranked_names(context, "shortlist")
                    .into_iter()
                    .map(|(name, _)| name)
                    .find(|name| !feedback.iter().any(|f| f.contains(name.as_str())))
                    .map(|name| json!({ "pick": name }))
                    .unwrap_or_else(|| json!({ "abstain": true }))
            }
        }
    }
}

#[async_trait]
impl DecisionBackend for RankingBackend {
    fn name(&self) -> &str {
        "ranking"
    }

    async fn complete(&self, request: &BackendRequest) -> Result<String, AgentError> {
        Ok(Self::respond(request).to_string())
    }
}
