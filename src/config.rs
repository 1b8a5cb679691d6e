//! Runtime configuration.
//!
//! Three sources feed a run:
//! - required environment variables (optionally from a `.env` file), read by
//!   [`Settings::from_env`]
//! - an optional YAML file with post metadata and model knobs ([`FileConfig`])
//! - the system prompt file, read once into a [`SystemPrompt`]

use crate::api::{DEFAULT_TEMPERATURE, RetryPolicy};
use crate::error::PipelineError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

/// Environment variables that must be present and non-empty.
pub const REQUIRED_ENV_VARS: [&str; 7] = [
    "PRESS_CODE",
    "GOOGLE_API_KEY",
    "GEMINI_MODEL",
    "BASE_URL",
    "TELEGRAM_CHAT_TEST_ID",
    "TELEGRAM_CHAT_ID",
    "TELEGRAM_BOT_TOKEN",
];

/// Values taken from the environment.
#[derive(Clone)]
pub struct Settings {
    pub press_code: String,
    pub google_api_key: String,
    pub gemini_model: String,
    pub base_url: String,
    pub telegram_chat_test_id: String,
    pub telegram_chat_id: String,
    pub telegram_bot_token: String,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("press_code", &self.press_code)
            .field("gemini_model", &self.gemini_model)
            .field("base_url", &self.base_url)
            .field("telegram_chat_test_id", &self.telegram_chat_test_id)
            .field("telegram_chat_id", &self.telegram_chat_id)
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any name → value lookup.
    ///
    /// Unset and empty values are both missing; every missing name is
    /// reported at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut values = Vec::with_capacity(REQUIRED_ENV_VARS.len());
        let mut missing = Vec::new();
        for name in REQUIRED_ENV_VARS {
            match lookup(name).filter(|v| !v.trim().is_empty()) {
                Some(v) => values.push(v),
                None => missing.push(name.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(PipelineError::MissingEnv(missing));
        }

        let mut values = values.into_iter();
        let mut next = || values.next().unwrap_or_default();
        Ok(Self {
            press_code: next(),
            google_api_key: next(),
            gemini_model: next(),
            base_url: next(),
            telegram_chat_test_id: next(),
            telegram_chat_id: next(),
            telegram_bot_token: next(),
        })
    }
}

/// Optional settings file.
///
/// ```yaml
/// post:
///   category: 어린이뉴스
///   writer: admin
///   thumbnail: img/main.png
/// model:
///   temperature: 0.7
///   max_retries: 3
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    pub post: PostConfig,
    pub model: ModelConfig,
}

/// Metadata attached to every published post.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PostConfig {
    /// Appended to the date to form the post title.
    pub title_suffix: String,
    pub category: String,
    pub writer: String,
    pub images: Vec<PathBuf>,
    pub thumbnail: Option<PathBuf>,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            title_suffix: "오늘의 어린이 뉴스".to_string(),
            category: "어린이뉴스".to_string(),
            writer: "admin".to_string(),
            images: Vec::new(),
            thumbnail: Some(PathBuf::from("img/main.png")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub temperature: f32,
    pub max_retries: u32,
    pub base_delay_secs: u64,
    pub success_delay_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_retries: policy.max_retries,
            base_delay_secs: policy.base_delay.as_secs(),
            success_delay_secs: policy.success_delay.as_secs(),
        }
    }
}

impl ModelConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_secs(self.base_delay_secs),
            success_delay: Duration::from_secs(self.success_delay_secs),
        }
    }
}

impl FileConfig {
    /// Load the YAML file at `path`, or defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            PipelineError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_yaml(&raw)?;
        info!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, PipelineError> {
        serde_yaml::from_str(raw).map_err(|e| PipelineError::Config(format!("invalid config: {e}")))
    }
}

/// The system instruction sent with every model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPrompt(String);

impl SystemPrompt {
    pub fn new(text: String) -> Self {
        Self(text)
    }

    /// Read the prompt file once at startup.
    #[instrument(level = "info")]
    pub async fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            PipelineError::Config(format!("cannot read prompt {}: {e}", path.display()))
        })?;
        if text.trim().is_empty() {
            return Err(PipelineError::Config(format!(
                "prompt {} is empty",
                path.display()
            )));
        }
        info!(bytes = text.len(), "Loaded system prompt");
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
