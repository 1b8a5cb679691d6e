//! Gemini interaction with exponential backoff retry logic.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait for one model call
//! - [`GeminiClient`]: `generateContent` over HTTP, classifying every failure
//!   into [`AskError::Transient`] or [`AskError::Fatal`]
//! - [`RetryAsk`]: decorator that retries transient failures
//! - [`summarize`]: entry point used by the pipeline
//!
//! # Retry Strategy
//!
//! - 3 attempts by default
//! - Exponential backoff `base_delay * 2^attempt` (5s, 10s, 20s, ...)
//! - No wait after the last transient failure
//! - A fixed pause after every success to go easy on the provider
//! - Fatal errors stop immediately

use crate::config::SystemPrompt;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

pub const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Markers the provider uses for rate limiting or temporary unavailability.
///
/// Matched anywhere in the message, so `HTTP503` and `upstream_503` count.
static OVERLOAD_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"429|503|UNAVAILABLE|RESOURCE_EXHAUSTED").unwrap());

/// Outcome of a failed model call, classified where the failure is observed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AskError {
    /// Rate limited or overloaded; worth retrying later.
    #[error("provider overloaded: {0}")]
    Transient(String),
    #[error("{0}")]
    Fatal(String),
}

impl AskError {
    /// Classify a free-text failure message.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if OVERLOAD_MARKERS.is_match(&message) {
            AskError::Transient(message)
        } else {
            AskError::Fatal(message)
        }
    }

    /// Classify an HTTP error response.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = format!("{} {}", status.as_u16(), body.trim());
        match status {
            StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                AskError::Transient(message)
            }
            _ => AskError::from_message(message),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, AskError::Transient(_))
    }
}

/// Terminal failure of the retry loop.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SummarizeFailure {
    #[error("retries exhausted after {attempts} transient failures: {last}")]
    Exhausted { attempts: u32, last: String },
    #[error("non-retryable error: {0}")]
    Fatal(String),
}

/// Trait for async model interaction.
pub trait AskAsync {
    /// Send `text` as the user message and return the raw response text.
    async fn ask(&self, text: &str) -> Result<String, AskError>;
}

impl<T: AskAsync> AskAsync for &T {
    async fn ask(&self, text: &str) -> Result<String, AskError> {
        (**self).ask(text).await
    }
}

/// Timing knobs for [`RetryAsk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts.
    pub max_retries: u32,
    /// Wait after the first transient failure (doubles with each attempt).
    pub base_delay: Duration,
    /// Pause after a successful call.
    pub success_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(5),
            success_delay: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the attempt after `attempt` (zero based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Wrapper that retries transient failures of any [`AskAsync`] implementation.
///
/// Only [`AskError::Transient`] is retried; the classification is made by the
/// wrapped client, never here.
///
/// # Backoff Strategy
///
/// ```text
/// delay = base_delay * 2^attempt
/// ```
///
/// There is no wait after the final attempt, and every success is followed by
/// [`RetryPolicy::success_delay`].
pub struct RetryAsk<T> {
    /// The underlying model client to wrap.
    inner: T,
    /// Attempt count and delays.
    policy: RetryPolicy,
}

impl<T: AskAsync> RetryAsk<T> {
    /// Create a retry wrapper around an existing [`AskAsync`] implementation.
    ///
    /// # Arguments
    ///
    /// * `inner` - The model client to wrap
    /// * `policy` - Attempt count and delays ([`RetryPolicy::default`] gives
    ///   3 attempts, 5s base backoff and a 3s pause after success)
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = GeminiClient::new(api_key, model, prompt);
    /// let retry_client = RetryAsk::new(client, RetryPolicy::default());
    /// let json = retry_client.ask(&user_prompt(title, body)).await?;
    /// ```
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Send `text` until it succeeds, a fatal error occurs or attempts run out.
    ///
    /// # Returns
    ///
    /// The raw response text, or a [`SummarizeFailure`] saying whether the
    /// attempts were exhausted or a non-retryable error stopped the loop.
    #[instrument(level = "info", skip_all, fields(max = self.policy.max_retries))]
    pub async fn ask(&self, text: &str) -> Result<String, SummarizeFailure> {
        let total_t0 = Instant::now();
        let max = self.policy.max_retries;
        let mut last = String::from("no attempts were made");

        for attempt in 0..max {
            info!(attempt = attempt + 1, max, "Calling model");
            let attempt_t0 = Instant::now();

            match self.inner.ask(text).await {
                Ok(resp) => {
                    sleep(self.policy.success_delay).await;
                    info!(
                        attempt = attempt + 1,
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u128,
                        "Model call succeeded"
                    );
                    return Ok(resp);
                }
                Err(AskError::Transient(message)) => {
                    let delay = self.policy.backoff(attempt);
                    if attempt + 1 < max {
                        warn!(
                            attempt = attempt + 1,
                            max,
                            elapsed_ms_attempt = attempt_t0.elapsed().as_millis() as u128,
                            ?delay,
                            error = %message,
                            "Provider overloaded; backing off"
                        );
                        sleep(delay).await;
                        last = message;
                    } else {
                        error!(
                            attempt = attempt + 1,
                            max,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u128,
                            error = %message,
                            "Model call exhausted retries"
                        );
                        return Err(SummarizeFailure::Exhausted {
                            attempts: max,
                            last: message,
                        });
                    }
                }
                Err(AskError::Fatal(message)) => {
                    error!(
                        attempt = attempt + 1,
                        error = %message,
                        "Model call failed with non-retryable error"
                    );
                    return Err(SummarizeFailure::Fatal(message));
                }
            }
        }

        error!(max, "Model call loop finished without a result");
        Err(SummarizeFailure::Exhausted {
            attempts: max,
            last,
        })
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("policy", &self.policy)
            .finish()
    }
}

/// The user message sent alongside the system instruction.
pub fn user_prompt(title: &str, body: &str) -> String {
    format!("뉴스 제목: {title}\n뉴스 본문: {body}")
}

/// Ask the model for a structured explanation of an article.
///
/// This is the entry point the pipeline uses. The article is sent as a single
/// user message built by [`user_prompt`], wrapped in [`RetryAsk`].
///
/// # Arguments
///
/// * `asker` - The model client (a [`GeminiClient`] in production)
/// * `title` - The article title
/// * `body` - The article body text
/// * `policy` - Attempt count, backoff base and post-success pause for the
///   retry loop
///
/// # Returns
///
/// The model's raw (JSON) response, or `None` when the call failed for good,
/// whether retries ran out or the error was not retryable. The reason is
/// logged here.
#[instrument(level = "info", skip_all, fields(%title))]
pub async fn summarize<A: AskAsync>(
    asker: A,
    title: &str,
    body: &str,
    policy: RetryPolicy,
) -> Option<String> {
    let prompt = user_prompt(title, body);
    let api = RetryAsk::new(asker, policy);
    match api.ask(&prompt).await {
        Ok(text) => Some(text),
        Err(e) => {
            error!(error = %e, "Summarization failed");
            None
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Gemini `generateContent` client requesting JSON output.
///
/// Every failure is classified here into [`AskError::Transient`] or
/// [`AskError::Fatal`]: HTTP 429/503 and messages carrying an overload marker
/// are transient, everything else (transport errors, empty candidates) is
/// fatal.
pub struct GeminiClient {
    http: Client,
    /// API root, without the `/v1beta/...` path.
    endpoint: String,
    /// Sent as the `x-goog-api-key` header.
    api_key: String,
    /// Model name, e.g. `gemini-2.5-flash`.
    model: String,
    /// Sampling temperature sent in `generationConfig`.
    temperature: f32,
    /// System instruction sent with every call.
    system_prompt: SystemPrompt,
}

impl GeminiClient {
    /// Create a client for `model` on the public Gemini endpoint.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Google API key (`GOOGLE_API_KEY`)
    /// * `model` - Model name (`GEMINI_MODEL`)
    /// * `system_prompt` - Instruction loaded once at startup
    ///
    /// The temperature defaults to [`DEFAULT_TEMPERATURE`]; see
    /// [`GeminiClient::with_temperature`].
    ///
    /// # Example
    ///
    /// ```ignore
    /// let prompt = SystemPrompt::load(Path::new("prompt.md")).await?;
    /// let client = GeminiClient::new(api_key, "gemini-2.5-flash".into(), prompt)
    ///     .with_temperature(0.7);
    /// ```
    pub fn new(api_key: String, model: String, system_prompt: SystemPrompt) -> Self {
        Self {
            http: Client::new(),
            endpoint: GEMINI_ENDPOINT.to_string(),
            api_key,
            model,
            temperature: DEFAULT_TEMPERATURE,
            system_prompt,
        }
    }

    /// Override the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    fn request_body<'a>(&'a self, text: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: self.system_prompt.as_str(),
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type: "application/json",
            },
        }
    }
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl AskAsync for GeminiClient {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, text: &str) -> Result<String, AskError> {
        let t0 = Instant::now();
        let resp = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(text))
            .send()
            .await
            .map_err(|e| AskError::from_message(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| AskError::from_message(e.to_string()))?;
        let dt = t0.elapsed();

        if !status.is_success() {
            let err = AskError::from_response(status, &body);
            warn!(
                elapsed_ms = dt.as_millis() as u128,
                %status,
                transient = err.is_transient(),
                "API call failed"
            );
            return Err(err);
        }

        extract_text(&body)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: &str) -> Result<String, AskError> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| AskError::Fatal(format!("unreadable generateContent response: {e}")))?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(AskError::Fatal("model returned no content".to_string()));
    }
    Ok(text)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a fixed list of outcomes, one per call, and remembers the
    /// last message it was sent.
    #[derive(Debug, Default)]
    pub struct ScriptedAsk {
        script: Mutex<VecDeque<Result<String, AskError>>>,
        calls: AtomicUsize,
        last_text: Mutex<Option<String>>,
    }

    impl ScriptedAsk {
        pub fn new(script: Vec<Result<String, AskError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                ..Self::default()
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_text(&self) -> Option<String> {
            self.last_text.lock().unwrap().clone()
        }
    }

    impl AskAsync for ScriptedAsk {
        async fn ask(&self, text: &str) -> Result<String, AskError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_text.lock().unwrap() = Some(text.to_string());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AskError::Fatal("script exhausted".into())))
        }
    }
}
