//! HTTP decision backend for OpenAI-compatible chat-completions endpoints
//!
//! Each call is stateless: the system instructions and the rendered prompt
//! are the whole conversation. Conversation history across rounds travels
//! inside the prompt, never as server-side state.

use async_trait::async_trait;
use huddle_core::BackendSettings;
use std::time::Duration;

use crate::backend::DecisionBackend;
use crate::circuit_breaker::CircuitBreaker;
use crate::types::{AgentError, BackendRequest, ChatMessage, ChatRequest, ChatResponse};

const CIRCUIT_THRESHOLD: u32 = 5;
const CIRCUIT_TIMEOUT_SECS: u64 = 30;

/// Validated backend configuration
///
/// Built by the caller (the CLI reads the environment); the library never
/// looks up credentials on its own.
#[derive(Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub temperature: f32,
}

impl BackendConfig {
    pub fn from_settings(settings: &BackendSettings, api_key: impl Into<String>) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: settings.model.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
            temperature: settings.temperature,
        }
    }

    /// Override the endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Chat-completions backend with retries and a per-instance circuit breaker
#[derive(Debug)]
pub struct HttpBackend {
    config: BackendConfig,
    client: reqwest::Client,
    circuit_breaker: CircuitBreaker,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self, AgentError> {
        if config.api_key.trim().is_empty() {
            return Err(AgentError::Unavailable(
                "No API key configured for the decision backend".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            circuit_breaker: CircuitBreaker::new(CIRCUIT_THRESHOLD, CIRCUIT_TIMEOUT_SECS),
        })
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    fn chat_request(&self, request: &BackendRequest) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
            temperature: self.config.temperature,
        }
    }

    fn fail(&self, message: String) -> AgentError {
        self.circuit_breaker.record_failure();
        tracing::error!(
            "Decision backend failure (streak: {}): {}",
            self.circuit_breaker.consecutive_failures(),
            message
        );
        AgentError::Unavailable(message)
    }
}

#[async_trait]
impl DecisionBackend for HttpBackend {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: &BackendRequest) -> Result<String, AgentError> {
        if !self.circuit_breaker.try_acquire() {
            return Err(AgentError::Unavailable(format!(
                "Circuit breaker is OPEN - wait {}s before retry",
                self.circuit_breaker.remaining_cool_down().as_secs()
            )));
        }

        let body = self.chat_request(request);
        let mut retries = 0;
        let mut backoff = self.config.initial_backoff;

        loop {
            tracing::debug!(
                "Sending {} request for {} (attempt {})",
                request.role,
                request.agent,
                retries + 1
            );

            let response = match self
                .client
                .post(self.config.endpoint())
                .bearer_auth(&self.config.api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    if retries < self.config.max_retries {
                        retries += 1;
                        tracing::warn!(
                            "Request failed ({}). Waiting {:?} before retry {}/{}",
                            e,
                            backoff,
                            retries,
                            self.config.max_retries
                        );
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(self.config.max_backoff);
                        continue;
                    }
                    return Err(self.fail(format!("Failed to send request: {}", e)));
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                if retries >= self.config.max_retries {
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown".to_string());
                    return Err(self.fail(format!(
                        "Backend error {} after {} retries: {}",
                        status, self.config.max_retries, error_text
                    )));
                }
                retries += 1;

                // Honour retry-after when the server sends one
                let wait = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(backoff);

                tracing::warn!(
                    "Backend returned {}. Waiting {:?} before retry {}/{}",
                    status,
                    wait,
                    retries,
                    self.config.max_retries
                );
                tokio::time::sleep(wait).await;
                backoff = (backoff * 2).min(self.config.max_backoff);
                continue;
            }

            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown".to_string());
                return Err(self.fail(format!("Backend error {}: {}", status, error_text)));
            }

            // The backend answered; a malformed body is a response problem
            self.circuit_breaker.record_success();

            let chat: ChatResponse = response
                .json()
                .await
                .map_err(|e| AgentError::Response(format!("Failed to parse response: {}", e)))?;

            if let Some(usage) = &chat.usage {
                tracing::debug!(
                    "{} responded ({} prompt tokens, {} completion tokens)",
                    request.agent,
                    usage.prompt_tokens,
                    usage.completion_tokens
                );
            }

            return chat
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .filter(|content| !content.trim().is_empty())
                .ok_or_else(|| AgentError::Response("No content in response".to_string()));
        }
    }
}
