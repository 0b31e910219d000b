//! FalImageClient - generates portraits through fal.ai's queue API.
//!
//! A generation is submitted to the queue, polled until it completes, and
//! the first resulting image is downloaded.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http::{build_client, check_response, download_bytes};
use super::{validate_prompt, ImageProvider, ProviderError};

/// The environment variable name for the fal.ai API key.
pub const FAL_API_KEY_ENV: &str = "FAL_API_KEY";

/// Default base URL for the fal.ai queue API.
pub const FAL_API_BASE_URL: &str = "https://queue.fal.run";

/// Default text-to-image model.
pub const FAL_DEFAULT_MODEL: &str = "fal-ai/flux/schnell";

/// Default timeout for one queued generation (120 seconds).
const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Default polling interval for status checks (2 seconds).
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Request body for image generation.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    image_size: &'a str,
    num_images: u32,
    output_format: &'a str,
}

/// Response from queue submission.
#[derive(Debug, Deserialize)]
pub struct QueueResponse {
    /// The unique request ID for polling.
    pub request_id: String,
    /// URL of the finished result (optional).
    #[serde(default)]
    pub response_url: Option<String>,
}

/// Response from the status polling endpoint.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
}

/// Response from the result endpoint.
#[derive(Debug, Deserialize)]
struct ResultResponse {
    #[serde(default)]
    images: Vec<ImageOutput>,
}

#[derive(Debug, Deserialize)]
struct ImageOutput {
    url: String,
}

/// Status of a queued generation request.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationStatus {
    /// Request is queued for processing.
    Pending,
    /// Image is being generated.
    InProgress,
    /// Generation completed; the result can be fetched.
    Completed,
    /// Generation failed with an error.
    Failed { error: String },
}

/// Client for the fal.ai queue API.
pub struct FalImageClient {
    api_key: String,
    base_url: String,
    model: String,
    poll_interval: Duration,
    generation_timeout: Duration,
    http_client: reqwest::Client,
}

impl FalImageClient {
    /// Create a client by reading `FAL_API_KEY` from the environment.
    pub fn new() -> Result<Self, ProviderError> {
        let api_key = std::env::var(FAL_API_KEY_ENV).map_err(|_| ProviderError::MissingApiKey {
            env: FAL_API_KEY_ENV,
        })?;
        Self::with_api_key(api_key)
    }

    /// Create a client with an explicit API key.
    pub fn with_api_key(api_key: String) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, FAL_API_BASE_URL.to_string())
    }

    /// Create a client with a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, ProviderError> {
        if api_key.is_empty() {
            return Err(ProviderError::MissingApiKey {
                env: FAL_API_KEY_ENV,
            });
        }

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: FAL_DEFAULT_MODEL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            http_client: build_client()?,
        })
    }

    /// Use a different model.
    pub fn model(mut self, model: &str) -> Self {
        self.model = model.trim_matches('/').to_string();
        self
    }

    /// Change the status polling interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Change how long one queued generation may take.
    pub fn generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    fn auth_header(&self) -> String {
        format!("Key {}", self.api_key)
    }

    fn request_url(&self, request_id: &str) -> String {
        format!("{}/{}/requests/{}", self.base_url, self.model, request_id)
    }

    /// Submit a generation request to the queue.
    pub async fn submit_generation(&self, prompt: &str) -> Result<QueueResponse, ProviderError> {
        validate_prompt(prompt)?;

        let url = format!("{}/{}", self.base_url, self.model);
        let body = GenerateRequest {
            prompt,
            image_size: "square_hd",
            num_images: 1,
            // Artifacts are stored as .png
            output_format: "png",
        };

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await?;
        let response = check_response(response, "fal").await?;

        Ok(response.json().await?)
    }

    /// Check the status of a queued request.
    pub async fn poll_status(&self, request_id: &str) -> Result<GenerationStatus, ProviderError> {
        let url = format!("{}/status", self.request_url(request_id));
        let response = self
            .http_client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        let response = check_response(response, "fal").await?;

        let status: StatusResponse = response.json().await?;
        match status.status.to_uppercase().as_str() {
            "PENDING" | "IN_QUEUE" => Ok(GenerationStatus::Pending),
            "PROCESSING" | "IN_PROGRESS" => Ok(GenerationStatus::InProgress),
            "COMPLETED" | "OK" => Ok(GenerationStatus::Completed),
            "FAILED" | "ERROR" => Ok(GenerationStatus::Failed {
                error: status
                    .error
                    .unwrap_or_else(|| "Unknown error occurred during generation".to_string()),
            }),
            unknown => Err(ProviderError::ApiError(format!(
                "Unknown generation status: {}",
                unknown
            ))),
        }
    }

    /// Fetch the finished result and return the first image URL.
    pub async fn fetch_image_url(&self, queued: &QueueResponse) -> Result<String, ProviderError> {
        let url = queued
            .response_url
            .clone()
            .unwrap_or_else(|| self.request_url(&queued.request_id));
        let response = self
            .http_client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        let response = check_response(response, "fal").await?;

        let result: ResultResponse = response.json().await?;
        result
            .images
            .into_iter()
            .next()
            .map(|img| img.url)
            .ok_or_else(|| {
                ProviderError::InvalidResponse("generation completed without images".to_string())
            })
    }

    /// Poll until the request completes, fails, or the generation timeout hits.
    async fn wait_for_completion(&self, request_id: &str) -> Result<(), ProviderError> {
        let start = tokio::time::Instant::now();
        loop {
            if start.elapsed() > self.generation_timeout {
                log::error!("fal generation {} timed out", request_id);
                return Err(ProviderError::Timeout(self.generation_timeout));
            }

            match self.poll_status(request_id).await? {
                GenerationStatus::Pending => log::debug!("{}: pending", request_id),
                GenerationStatus::InProgress => log::debug!("{}: generating", request_id),
                GenerationStatus::Completed => return Ok(()),
                GenerationStatus::Failed { error } => {
                    return Err(ProviderError::ApiError(format!(
                        "Generation failed: {}",
                        error
                    )))
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl ImageProvider for FalImageClient {
    fn name(&self) -> &str {
        "fal"
    }

    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ProviderError> {
        let queued = self.submit_generation(prompt).await?;
        log::debug!("fal request submitted: {}", queued.request_id);

        self.wait_for_completion(&queued.request_id).await?;

        let image_url = self.fetch_image_url(&queued).await?;
        log::debug!("Downloading image from: {}", image_url);
        download_bytes(&self.http_client, &image_url, "fal").await
    }
}
