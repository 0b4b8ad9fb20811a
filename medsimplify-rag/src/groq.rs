//! [`LanguageModel`] for OpenAI-compatible chat completion endpoints.
//!
//! Defaults target Groq's hosted inference API; any server speaking the
//! `/chat/completions` protocol works by overriding the base URL and model.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result, Stage};
use crate::generation::{DEFAULT_GENERATION_TIMEOUT, LanguageModel};
use crate::openai::ErrorResponse;
use crate::prompt::GenerationRequest;

/// Groq's OpenAI-compatible API base URL.
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Model used when none is configured.
pub const DEFAULT_CHAT_MODEL: &str = "qwen-qwq-32b";

/// Sampling temperature used when none is configured.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// A chat-completions client sending the system instructions and the user
/// turn of a [`GenerationRequest`] as two messages.
///
/// # Example
///
/// ```rust,ignore
/// use medsimplify_rag::groq::ChatCompletionsModel;
///
/// let model = ChatCompletionsModel::from_env()?.with_model("llama-3.3-70b-versatile");
/// ```
pub struct ChatCompletionsModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ChatCompletionsModel {
    /// Create a client for Groq with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::validation("generation API key must not be empty"));
        }
        let client = reqwest::Client::builder()
            // outer bound only; the Generator enforces the per-attempt timeout
            .timeout(DEFAULT_GENERATION_TIMEOUT * 2)
            .build()
            .map_err(|e| RagError::ModelUnavailable {
                stage: Stage::Generation,
                model: DEFAULT_CHAT_MODEL.into(),
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: GROQ_API_BASE.into(),
            model: DEFAULT_CHAT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        })
    }

    /// Create a client using the `GROQ_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .map_err(|_| RagError::validation("GROQ_API_KEY environment variable not set"))?;
        Self::new(api_key)
    }

    /// Point the client at another OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Cap the completion length.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

// ── Chat completions request/response types ────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Map a non-success HTTP status to the error taxonomy.
///
/// Rate limiting is a transient refusal; authentication, billing and
/// content-policy rejections are permanent; server-side failures mean the
/// model is unavailable.
pub(crate) fn classify_status(status: StatusCode, detail: &str, model: &str) -> RagError {
    let refused = |transient| RagError::GenerationRefused {
        reason: format!("{status}: {detail}"),
        transient,
    };
    match status {
        StatusCode::TOO_MANY_REQUESTS => refused(true),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            RagError::GenerationTimeout { attempts: 1, timeout: DEFAULT_GENERATION_TIMEOUT }
        }
        StatusCode::UNAUTHORIZED | StatusCode::PAYMENT_REQUIRED | StatusCode::FORBIDDEN => {
            refused(false)
        }
        s if s.is_client_error() => refused(false),
        _ => RagError::ModelUnavailable {
            stage: Stage::Generation,
            model: model.to_string(),
            message: format!("API returned {status}: {detail}"),
        },
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionsModel {
    async fn complete(&self, request: &GenerationRequest) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: request.system_instructions.clone() },
                ChatMessage { role: "user", content: request.user_message() },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(model = %self.model, context_chars = request.context_chars(), "sending chat completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(model = %self.model, error = %e, "chat completion request failed");
                if e.is_timeout() {
                    RagError::GenerationTimeout { attempts: 1, timeout: DEFAULT_GENERATION_TIMEOUT }
                } else {
                    RagError::ModelUnavailable {
                        stage: Stage::Generation,
                        model: self.model.clone(),
                        message: format!("request failed: {e}"),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!(model = %self.model, %status, "chat completion API error");
            return Err(classify_status(status, &detail, &self.model));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(model = %self.model, error = %e, "failed to parse chat completion");
            RagError::ModelUnavailable {
                stage: Stage::Generation,
                model: self.model.clone(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            RagError::GenerationRefused { reason: "response contained no choices".into(), transient: false }
        })?;

        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(RagError::GenerationRefused {
                reason: "completion blocked by content policy".into(),
                transient: false,
            });
        }

        Ok(choice.message.content.unwrap_or_default())
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limits_are_transient_refusals() {
        let err = classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down", "m");
        assert!(matches!(err, RagError::GenerationRefused { transient: true, .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn policy_and_auth_rejections_are_permanent() {
        for status in [StatusCode::BAD_REQUEST, StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let err = classify_status(status, "no", "m");
            assert!(matches!(err, RagError::GenerationRefused { transient: false, .. }));
            assert!(!err.is_transient());
        }
    }

    #[test]
    fn server_errors_mean_the_model_is_unavailable() {
        let err = classify_status(StatusCode::SERVICE_UNAVAILABLE, "down", "qwen");
        match err {
            RagError::ModelUnavailable { stage, model, .. } => {
                assert_eq!(stage, Stage::Generation);
                assert_eq!(model, "qwen");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn gateway_timeouts_are_generation_timeouts() {
        let err = classify_status(StatusCode::GATEWAY_TIMEOUT, "", "m");
        assert!(matches!(err, RagError::GenerationTimeout { .. }));
    }
}
