//! Image generation providers.
//!
//! Every backend implements [`ImageProvider`], so the orchestrator never
//! branches on which backend is in use. Calls are wrapped in a bounded
//! [`RetryPolicy`] through [`RetryingProvider`].

mod fal;
mod http;
mod openai;
mod retry;

use std::time::Duration;

use async_trait::async_trait;

pub use fal::{
    FalImageClient, GenerationStatus, QueueResponse, FAL_API_BASE_URL, FAL_API_KEY_ENV,
    FAL_DEFAULT_MODEL,
};
pub use http::{is_content_policy_error, MAX_IMAGE_BYTES};
pub use openai::{OpenAiImageClient, OPENAI_API_BASE_URL, OPENAI_API_KEY_ENV, OPENAI_DEFAULT_MODEL};
pub use retry::{
    Backoff, RetryPolicy, RetryingProvider, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_BACKOFF_MAX,
    DEFAULT_MAX_ATTEMPTS,
};

/// Turns a prompt into encoded raster bytes (PNG, JPEG, WebP, ...).
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Short backend name used in logs and the manifest.
    fn name(&self) -> &str;

    /// Generate one image for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ProviderError>;
}

#[async_trait]
impl<T: ImageProvider + ?Sized> ImageProvider for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ProviderError> {
        (**self).generate(prompt).await
    }
}

/// Errors that can occur while generating an image.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API key not configured (set {env})")]
    MissingApiKey { env: &'static str },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited: {message}")]
    RateLimit {
        /// Human-readable rate limit message
        message: String,
        /// Retry-After header value in seconds, if provided
        retry_after_secs: Option<u64>,
    },

    #[error("Content policy violation: {message}")]
    ContentPolicyViolation { message: String },

    #[error("Empty prompt")]
    EmptyPrompt,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Missing credentials, rejected prompts and already-exhausted retries
    /// are permanent; network, quota, server and timeout failures are not.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ProviderError::MissingApiKey { .. }
                | ProviderError::EmptyPrompt
                | ProviderError::ContentPolicyViolation { .. }
                | ProviderError::RetriesExhausted { .. }
        )
    }
}

/// Reject empty or whitespace-only prompts before they reach a backend.
pub fn validate_prompt(prompt: &str) -> Result<(), ProviderError> {
    if prompt.trim().is_empty() {
        return Err(ProviderError::EmptyPrompt);
    }
    Ok(())
}

/// Supported generation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// OpenAI images API (DALL-E 3).
    #[default]
    OpenAi,
    /// fal.ai queue API.
    Fal,
}

impl Backend {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" | "dalle" | "dall-e" => Some(Backend::OpenAi),
            "fal" | "fal-ai" => Some(Backend::Fal),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::OpenAi => "openai",
            Backend::Fal => "fal",
        }
    }

    /// Environment variable holding this backend's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Backend::OpenAi => OPENAI_API_KEY_ENV,
            Backend::Fal => FAL_API_KEY_ENV,
        }
    }

    /// Default delay between retry attempts.
    pub fn default_retry_delay(&self) -> Duration {
        match self {
            Backend::OpenAi => Duration::from_secs(5),
            Backend::Fal => Duration::from_secs(2),
        }
    }

    /// Default pacing delay between generation requests.
    pub fn default_pacing(&self) -> Duration {
        match self {
            Backend::OpenAi => Duration::from_secs(5),
            Backend::Fal => Duration::from_secs(2),
        }
    }

    /// Create a client for this backend, reading the key from the environment.
    ///
    /// `base_url` and `model` override the backend defaults when given.
    pub fn connect(
        &self,
        base_url: Option<&str>,
        model: Option<&str>,
    ) -> Result<Box<dyn ImageProvider>, ProviderError> {
        let api_key = std::env::var(self.api_key_env()).unwrap_or_default();
        self.connect_with_key(api_key, base_url, model)
    }

    /// Create a client for this backend with an explicit API key.
    pub fn connect_with_key(
        &self,
        api_key: String,
        base_url: Option<&str>,
        model: Option<&str>,
    ) -> Result<Box<dyn ImageProvider>, ProviderError> {
        match self {
            Backend::OpenAi => {
                let mut client = OpenAiImageClient::with_base_url(
                    api_key,
                    base_url.unwrap_or(OPENAI_API_BASE_URL).to_string(),
                )?;
                if let Some(model) = model {
                    client = client.model(model);
                }
                Ok(Box::new(client))
            }
            Backend::Fal => {
                let mut client = FalImageClient::with_base_url(
                    api_key,
                    base_url.unwrap_or(FAL_API_BASE_URL).to_string(),
                )?;
                if let Some(model) = model {
                    client = client.model(model);
                }
                Ok(Box::new(client))
            }
        }
    }
}
