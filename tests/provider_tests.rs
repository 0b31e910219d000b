//! Mock HTTP tests for the image backends.
//!
//! These tests cover:
//! - OpenAI images: url and b64_json responses, auth header
//! - fal.ai queue: submit, poll, fetch result, download
//! - Error mapping: rate limits, content policy, auth, failed generations
//! - Retry behavior against a live mock server

use std::io::Cursor;
use std::time::Duration;

use base64::Engine;
use image::{ImageFormat, RgbImage};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use portrait_forge::provider::{
    Backend, Backoff, FalImageClient, ImageProvider, OpenAiImageClient, ProviderError,
    RetryPolicy, RetryingProvider,
};

fn png_bytes() -> Vec<u8> {
    let img = RgbImage::from_pixel(4, 4, image::Rgb([200, 100, 50]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn quick_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        delay: Duration::ZERO,
        backoff: Backoff::Fixed,
        attempt_timeout: Duration::from_secs(10),
    }
}

fn openai_client(server: &MockServer) -> OpenAiImageClient {
    OpenAiImageClient::with_base_url("sk-test".to_string(), server.uri()).unwrap()
}

fn fal_client(server: &MockServer) -> FalImageClient {
    FalImageClient::with_base_url("fal-test".to_string(), server.uri())
        .unwrap()
        .poll_interval(Duration::from_millis(10))
}

async fn mount_image(server: &MockServer, image_path: &str) {
    Mock::given(method("GET"))
        .and(path(image_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
        .mount(server)
        .await;
}

// === OpenAI ===

#[tokio::test]
async fn test_openai_downloads_url_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "dall-e-3",
            "n": 1,
            "size": "1024x1024",
            "quality": "standard"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "created": 1,
            "data": [{ "url": format!("{}/files/elf.png", server.uri()) }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_image(&server, "/files/elf.png").await;

    let bytes = openai_client(&server).generate("an elf").await.unwrap();
    assert_eq!(bytes, png_bytes());
}

#[tokio::test]
async fn test_openai_decodes_b64_json_result() {
    let server = MockServer::start().await;
    let encoded = base64::engine::general_purpose::STANDARD.encode(png_bytes());
    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{ "b64_json": encoded }]
        })))
        .mount(&server)
        .await;

    let bytes = openai_client(&server).generate("a dwarf").await.unwrap();
    assert_eq!(bytes, png_bytes());
}

#[tokio::test]
async fn test_openai_empty_data_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
        .mount(&server)
        .await;

    let result = openai_client(&server).generate("a gnome").await;
    assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_openai_content_policy_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {
                "code": "content_policy_violation",
                "message": "Your request was rejected as a result of our safety system."
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = RetryingProvider::new(openai_client(&server), quick_policy(3));
    let result = provider.generate("a tiefling").await;
    assert!(matches!(
        result,
        Err(ProviderError::ContentPolicyViolation { .. })
    ));
}

#[tokio::test]
async fn test_openai_rate_limit_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "0")
                .set_body_string("Rate limit exceeded"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{ "url": format!("{}/files/human.png", server.uri()) }]
        })))
        .mount(&server)
        .await;
    mount_image(&server, "/files/human.png").await;

    let provider = RetryingProvider::new(openai_client(&server), quick_policy(3));
    let bytes = provider.generate("a human").await.unwrap();
    assert_eq!(bytes, png_bytes());
}

#[tokio::test]
async fn test_openai_auth_failure_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(3)
        .mount(&server)
        .await;

    let provider = RetryingProvider::new(openai_client(&server), quick_policy(3));
    match provider.generate("an elf").await {
        Err(ProviderError::RetriesExhausted { attempts, last }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, ProviderError::Unauthorized(_)));
        }
        other => panic!("Expected RetriesExhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_openai_empty_download_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{ "url": format!("{}/files/empty.png", server.uri()) }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/empty.png"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let result = openai_client(&server).generate("an elf").await;
    assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
}

// === fal.ai ===

#[tokio::test]
async fn test_fal_queue_flow() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fal-ai/flux/schnell"))
        .and(header("Authorization", "Key fal-test"))
        .and(body_partial_json(serde_json::json!({
            "prompt": "a halfling",
            "num_images": 1,
            "output_format": "png"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "request_id": "req-1"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fal-ai/flux/schnell/requests/req-1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "IN_PROGRESS"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fal-ai/flux/schnell/requests/req-1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "COMPLETED"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fal-ai/flux/schnell/requests/req-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "images": [{ "url": format!("{}/files/halfling.png", server.uri()) }]
        })))
        .mount(&server)
        .await;
    mount_image(&server, "/files/halfling.png").await;

    let bytes = fal_client(&server).generate("a halfling").await.unwrap();
    assert_eq!(bytes, png_bytes());
}

#[tokio::test]
async fn test_fal_uses_response_url_when_given() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fal-ai/flux/schnell"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "request_id": "req-2",
            "response_url": format!("{}/custom/result", server.uri())
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fal-ai/flux/schnell/requests/req-2/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "COMPLETED"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/custom/result"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "images": [{ "url": format!("{}/files/x.png", server.uri()) }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_image(&server, "/files/x.png").await;

    assert_eq!(fal_client(&server).generate("x").await.unwrap(), png_bytes());
}

#[tokio::test]
async fn test_fal_failed_generation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fal-ai/flux/schnell"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "request_id": "req-3"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fal-ai/flux/schnell/requests/req-3/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "FAILED",
            "error": "GPU on fire"
        })))
        .mount(&server)
        .await;

    match fal_client(&server).generate("a dragonborn").await {
        Err(ProviderError::ApiError(message)) => assert!(message.contains("GPU on fire")),
        other => panic!("Expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fal_generation_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fal-ai/flux/schnell"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "request_id": "req-4"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fal-ai/flux/schnell/requests/req-4/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "IN_QUEUE"
        })))
        .mount(&server)
        .await;

    let client = fal_client(&server).generation_timeout(Duration::from_millis(50));
    let result = client.generate("a bard").await;
    assert!(matches!(result, Err(ProviderError::Timeout(_))));
}

#[tokio::test]
async fn test_fal_empty_prompt_rejected_before_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let result = fal_client(&server).generate("   ").await;
    assert!(matches!(result, Err(ProviderError::EmptyPrompt)));
}

// === Backend selection ===

#[tokio::test]
async fn test_backend_connect_with_key_against_mock() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fal-ai/fast-sdxl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "request_id": "req-5"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fal-ai/fast-sdxl/requests/req-5/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "COMPLETED"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fal-ai/fast-sdxl/requests/req-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "images": [{ "url": format!("{}/files/y.png", server.uri()) }]
        })))
        .mount(&server)
        .await;
    mount_image(&server, "/files/y.png").await;

    let provider = Backend::Fal
        .connect_with_key(
            "fal-test".to_string(),
            Some(server.uri().as_str()),
            Some("fal-ai/fast-sdxl"),
        )
        .unwrap();
    assert_eq!(provider.name(), "fal");
    assert_eq!(provider.generate("y").await.unwrap(), png_bytes());
}
