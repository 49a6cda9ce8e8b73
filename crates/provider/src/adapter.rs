//! The provider seam the engine dispatches through.

use async_trait::async_trait;
use serde::Serialize;

use pixora_core::workflow::{AspectRatio, OutputFormat, Resolution};

use crate::error::ProviderError;

/// One generation request, fully resolved from an item spec and its
/// workflow configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderRequest {
    /// Provider-side model identifier.
    pub model: String,
    pub prompt: String,
    /// Storage references of input/reference images, primary input first.
    pub source_images: Vec<String>,
    pub resolution: Resolution,
    pub aspect_ratio: AspectRatio,
    pub output_format: OutputFormat,
}

/// The generated artifact returned by a successful invocation.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    /// Content type as reported by the provider.
    pub mime: String,
}

/// Uniform interface to the external generative service.
///
/// Implementations perform exactly one external call per `invoke` and never
/// retry; the item processor owns retry policy. Errors must be classified
/// into [`ProviderError`] so no provider-specific knowledge leaks upward.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    async fn invoke(&self, request: &ProviderRequest) -> Result<Artifact, ProviderError>;
}
