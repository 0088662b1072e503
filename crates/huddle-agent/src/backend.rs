//! Decision backend abstraction
//!
//! A backend turns one rendered request into free-form text. Everything
//! above this boundary is backend-agnostic.

use async_trait::async_trait;

use crate::types::{AgentError, BackendRequest};

/// Request/response boundary to whatever makes the decisions
#[async_trait]
pub trait DecisionBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Exchange one request for one response text
    ///
    /// Transient failures are retried inside the implementation; an
    /// `AgentError::Unavailable` returned here is final for this call.
    async fn complete(&self, request: &BackendRequest) -> Result<String, AgentError>;
}
