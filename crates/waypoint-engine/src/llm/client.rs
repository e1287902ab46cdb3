use super::mock::MockGenerator;
use super::models::{ModelSettings, Usage};
use super::prompts::Prompt;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use waypoint_adapters::config::{Config, Mode};
use waypoint_core::sanitize_api_response;

/// Failure of a single generation call.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation service returned no content")]
    Empty,
    #[error("generation request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },
    #[error("could not connect to the generation service: {0}")]
    Connect(String),
    #[error("generation service error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request was refused: {0}")]
    Refused(String),
    #[error("failed to decode generation service response: {0}")]
    Decode(String),
    #[error("failed to set up HTTP client: {0}")]
    Setup(String),
}

/// Boxed future returned by [`Generator::generate`].
pub type GenerateFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, GenerationError>> + Send + 'a>>;

/// Produces raw model text for a prompt. Exactly one attempt per call.
pub trait Generator: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a Prompt) -> GenerateFuture<'a>;

    fn mode(&self) -> Mode;
}

/// Pick the live client when a credential is configured, the mock otherwise.
pub fn generator_from_config(config: &Config) -> Result<Arc<dyn Generator>, GenerationError> {
    match config.api_key.as_deref() {
        Some(api_key) => Ok(Arc::new(UpstreamClient::new(
            api_key,
            &config.upstream.base_url,
            ModelSettings::from_config(&config.upstream),
            Duration::from_secs(config.upstream.timeout_secs),
        )?)),
        None => {
            tracing::warn!("no upstream credential configured, using mock responses");
            Ok(Arc::new(MockGenerator))
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
    max_completion_tokens: u32,
    stream: bool,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    /// Content can be null in some API responses (e.g., when refusal or error occurs)
    #[serde(default)]
    content: Option<String>,
    /// Refusal reason - set when content is blocked by content moderation
    #[serde(default)]
    refusal: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct UpstreamClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    settings: ModelSettings,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(
        api_key: &str,
        base_url: &str,
        settings: ModelSettings,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Setup(e.to_string()))?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            settings,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request<'a>(&'a self, prompt: &'a Prompt) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.settings.id,
            messages: [
                Message {
                    role: "system",
                    content: &prompt.system,
                },
                Message {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.settings.temperature,
            max_completion_tokens: self.settings.max_completion_tokens,
            stream: false,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        }
    }

    async fn send(&self, prompt: &Prompt) -> Result<(reqwest::StatusCode, String), GenerationError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_transport_error(e, self.timeout))?;
        Ok((status, text))
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        let after_ms = self.timeout.as_millis() as u64;
        let (status, text) = timeout(self.timeout, self.send(prompt))
            .await
            .map_err(|_| GenerationError::Timeout { after_ms })??;

        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: sanitize_api_response(&text),
            });
        }
        if text.trim().is_empty() {
            return Err(GenerationError::Empty);
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            GenerationError::Decode(format!("{}: {}", e, sanitize_api_response(&text)))
        })?;

        if let Some(usage) = &parsed.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "generation usage"
            );
        }

        let choice = parsed.choices.into_iter().next();
        if let Some(refusal) = choice.as_ref().and_then(|c| c.message.refusal.as_deref()) {
            return Err(GenerationError::Refused(sanitize_api_response(refusal)));
        }

        let content = choice
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(content)
    }
}

impl Generator for UpstreamClient {
    fn generate<'a>(&'a self, prompt: &'a Prompt) -> GenerateFuture<'a> {
        Box::pin(self.complete(prompt))
    }

    fn mode(&self) -> Mode {
        Mode::Live
    }
}

fn map_transport_error(err: reqwest::Error, limit: Duration) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout {
            after_ms: limit.as_millis() as u64,
        }
    } else if err.is_connect() {
        GenerationError::Connect(err.to_string())
    } else if err.is_decode() || err.is_body() {
        GenerationError::Decode(err.to_string())
    } else {
        GenerationError::Connect(err.to_string())
    }
}
