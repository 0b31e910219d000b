//! OpenAiImageClient - generates portraits through the OpenAI images API.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::http::{build_client, check_response, download_bytes};
use super::{validate_prompt, ImageProvider, ProviderError};

/// The environment variable name for the OpenAI API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Default base URL for the OpenAI API.
pub const OPENAI_API_BASE_URL: &str = "https://api.openai.com";

/// Default image model.
pub const OPENAI_DEFAULT_MODEL: &str = "dall-e-3";

const DEFAULT_SIZE: &str = "1024x1024";
const DEFAULT_QUALITY: &str = "standard";

/// Request body for image generation.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
    quality: &'a str,
}

/// Response from the generations endpoint.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

/// One generated image: either a download URL or inline base64 data.
#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
}

/// Client for the OpenAI images API.
pub struct OpenAiImageClient {
    api_key: String,
    base_url: String,
    model: String,
    http_client: reqwest::Client,
}

impl OpenAiImageClient {
    /// Create a client by reading `OPENAI_API_KEY` from the environment.
    pub fn new() -> Result<Self, ProviderError> {
        let api_key = std::env::var(OPENAI_API_KEY_ENV).map_err(|_| ProviderError::MissingApiKey {
            env: OPENAI_API_KEY_ENV,
        })?;
        Self::with_api_key(api_key)
    }

    /// Create a client with an explicit API key.
    pub fn with_api_key(api_key: String) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, OPENAI_API_BASE_URL.to_string())
    }

    /// Create a client with a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, ProviderError> {
        if api_key.is_empty() {
            return Err(ProviderError::MissingApiKey {
                env: OPENAI_API_KEY_ENV,
            });
        }

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: OPENAI_DEFAULT_MODEL.to_string(),
            http_client: build_client()?,
        })
    }

    /// Use a different image model.
    pub fn model(mut self, model: &str) -> Self {
        self.model = model.to_string();
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

    /// Submit one generation request and return the first image.
    async fn request_image(&self, prompt: &str) -> Result<ImageData, ProviderError> {
        let url = format!("{}/v1/images/generations", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            n: 1,
            size: DEFAULT_SIZE,
            quality: DEFAULT_QUALITY,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_response(response, "openai").await?;

        let parsed: GenerateResponse = response.json().await?;
        parsed.data.into_iter().next().ok_or_else(|| {
            ProviderError::InvalidResponse("generation response contained no images".to_string())
        })
    }
}

#[async_trait]
impl ImageProvider for OpenAiImageClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ProviderError> {
        validate_prompt(prompt)?;

        log::debug!("Requesting {} image for prompt: {}", self.model, prompt);
        let image = self.request_image(prompt).await?;

        if let Some(encoded) = image.b64_json {
            return base64::engine::general_purpose::STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| ProviderError::InvalidResponse(format!("bad b64_json: {}", e)));
        }

        match image.url {
            Some(url) => {
                log::debug!("Downloading image from: {}", url);
                download_bytes(&self.http_client, &url, "openai").await
            }
            None => Err(ProviderError::InvalidResponse(
                "image has neither url nor b64_json".to_string(),
            )),
        }
    }
}
