//! HTTP implementation of [`GenerativeProvider`] using [`reqwest`].
//!
//! Speaks the provider's REST generation endpoint: one `POST
//! /v1/models/{model}:generate` per invocation, image bytes back on
//! success, a structured `{ "error": { "code", "message" } }` body on
//! failure. Error classification is split into pure helpers so it can be
//! tested without a network.

use async_trait::async_trait;
use serde::Deserialize;

use crate::adapter::{Artifact, GenerativeProvider, ProviderRequest};
use crate::error::ProviderError;

/// Fallback content type when the provider omits the header.
const DEFAULT_MIME: &str = "application/octet-stream";

/// HTTP client for the external generation API.
pub struct HttpProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Structured error body returned by the provider on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl HttpProvider {
    /// Create a client for the provider at `base_url`.
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling when several adapters coexist).
    pub fn with_client(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl GenerativeProvider for HttpProvider {
    async fn invoke(&self, request: &ProviderRequest) -> Result<Artifact, ProviderError> {
        let url = format!("{}/v1/models/{}:generate", self.base_url, request.model);

        let body = serde_json::json!({
            "prompt": request.prompt,
            "source_images": request.source_images,
            "resolution": request.resolution,
            "aspect_ratio": request.aspect_ratio.ratio(),
            "output_format": request.output_format,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(classify_error_response(status, &body));
        }

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_MIME)
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Malformed(format!("Failed to read response body: {e}")))?;

        if bytes.is_empty() {
            return Err(ProviderError::Malformed(
                "Provider returned an empty artifact".to_string(),
            ));
        }

        Ok(Artifact {
            bytes: bytes.to_vec(),
            mime,
        })
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify a transport-level [`reqwest::Error`].
fn classify_request_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(err.to_string())
    } else {
        ProviderError::Network(err.to_string())
    }
}

/// Classify a non-2xx response into the engine taxonomy.
///
/// Recognised error codes take priority over the HTTP status; unrecognised
/// bodies fall back to status-based classification ([`ProviderError::
/// Upstream`], transient iff 5xx, plus the explicit 408/429 signals).
fn classify_error_response(status: u16, body: &str) -> ProviderError {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        let message = parsed.error.message;
        return match parsed.error.code.as_str() {
            "content_policy_violation" => ProviderError::ContentPolicy(message),
            "invalid_prompt" | "invalid_request" => ProviderError::InvalidInput(message),
            "quota_exhausted" => ProviderError::QuotaExhausted(message),
            "rate_limited" => ProviderError::RateLimited(message),
            _ => ProviderError::Upstream {
                status,
                body: message,
            },
        };
    }

    match status {
        408 => ProviderError::Timeout(format!("HTTP 408: {body}")),
        429 => ProviderError::RateLimited(format!("HTTP 429: {body}")),
        _ => ProviderError::Upstream {
            status,
            body: body.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
