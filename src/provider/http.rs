//! HTTP helpers shared by the image backends.

use std::time::Duration;

use futures_util::StreamExt;

use super::ProviderError;

/// Default timeout for HTTP requests (60 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest image body accepted from a backend (32 MiB).
pub const MAX_IMAGE_BYTES: usize = 32 * 1024 * 1024;

/// HTTP status code for rate limiting.
const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// HTTP status code for bad request (often content policy).
const HTTP_STATUS_BAD_REQUEST: u16 = 400;

/// HTTP status code for unauthorized.
const HTTP_STATUS_UNAUTHORIZED: u16 = 401;

/// HTTP status code for forbidden (content policy violation).
const HTTP_STATUS_FORBIDDEN: u16 = 403;

/// Keywords that indicate a content policy violation in error messages.
const CONTENT_POLICY_KEYWORDS: &[&str] = &[
    "content policy",
    "content_policy",
    "policy violation",
    "inappropriate",
    "prohibited",
    "safety system",
    "violates",
    "moderation",
    "nsfw",
];

/// Build the HTTP client used by a backend.
pub fn build_client() -> Result<reqwest::Client, ProviderError> {
    let client = reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .build()?;
    Ok(client)
}

/// Check if an error message indicates a content policy violation.
pub fn is_content_policy_error(error_text: &str) -> bool {
    let lower = error_text.to_lowercase();
    CONTENT_POLICY_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Parse the Retry-After header value (integer seconds).
pub fn parse_retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
}

/// Turn a non-success response into a typed error; pass successes through.
pub async fn check_response(
    response: reqwest::Response,
    backend: &str,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status.as_u16() == HTTP_STATUS_TOO_MANY_REQUESTS {
        let retry_after_secs = parse_retry_after(&response);
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Rate limit exceeded".to_string());
        log::warn!(
            "Rate limited by {}. Retry-After: {:?} seconds",
            backend,
            retry_after_secs
        );
        return Err(ProviderError::RateLimit {
            message,
            retry_after_secs,
        });
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    if status.as_u16() == HTTP_STATUS_UNAUTHORIZED {
        return Err(ProviderError::Unauthorized(error_text));
    }

    if (status.as_u16() == HTTP_STATUS_BAD_REQUEST || status.as_u16() == HTTP_STATUS_FORBIDDEN)
        && is_content_policy_error(&error_text)
    {
        log::warn!("Prompt rejected by {} content policy: {}", backend, error_text);
        return Err(ProviderError::ContentPolicyViolation {
            message: error_text,
        });
    }

    Err(ProviderError::ApiError(format!(
        "{} request failed with status {}: {}",
        backend, status, error_text
    )))
}

/// Download an image body into memory, streaming with a size cap.
pub async fn download_bytes(
    client: &reqwest::Client,
    url: &str,
    backend: &str,
) -> Result<Vec<u8>, ProviderError> {
    let response = client.get(url).send().await?;
    let response = check_response(response, backend).await?;

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if body.len() + chunk.len() > MAX_IMAGE_BYTES {
            return Err(ProviderError::InvalidResponse(format!(
                "image body exceeds {} bytes",
                MAX_IMAGE_BYTES
            )));
        }
        body.extend_from_slice(&chunk);
    }

    if body.is_empty() {
        return Err(ProviderError::InvalidResponse(
            "image download returned an empty body".to_string(),
        ));
    }

    Ok(body)
}
