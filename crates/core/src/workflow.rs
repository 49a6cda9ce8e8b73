//! Workflow template configuration and submission validation.
//!
//! Workflow templates store their configuration as a JSONB blob. That blob
//! is converted exactly once, at submit time, into the [`WorkflowConfig`]
//! sum type; nothing downstream of the coordinator ever sees untyped JSON.
//! Submission validation lives here so it is reachable from both the API
//! layer and the engine without either depending on the other.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::pricing::PricingTable;

// ---------------------------------------------------------------------------
// Shared enums
// ---------------------------------------------------------------------------

/// Output resolution of a generated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "1k")]
    R1k,
    #[serde(rename = "2k")]
    R2k,
    #[serde(rename = "4k")]
    R4k,
}

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AspectRatio {
    Square,
    Landscape,
    Portrait,
    Wide,
}

impl AspectRatio {
    /// The ratio string the provider API expects.
    pub fn ratio(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape => "3:2",
            Self::Portrait => "2:3",
            Self::Wide => "16:9",
        }
    }
}

/// Encoded output format of a stored artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Png,
    Jpeg,
    Webp,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }
}

/// Model tier for the NanoBanana text-to-image workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Pro,
    Flash,
}

impl ModelTier {
    /// Provider-side model identifier.
    pub fn model_name(self) -> &'static str {
        match self {
            Self::Pro => "nano-banana-pro",
            Self::Flash => "nano-banana-flash",
        }
    }
}

// ---------------------------------------------------------------------------
// Workflow configuration
// ---------------------------------------------------------------------------

/// Per-workflow submission limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum number of items in one execution.
    pub max_items: u32,
    /// Maximum number of reference images per item.
    pub max_reference_images: u32,
}

/// Typed view of a workflow template's JSONB `config` column.
///
/// One variant per workflow kind the platform sells. Parsed via
/// [`WorkflowConfig::from_value`]; a template whose blob does not match its
/// variant shape is a validation error at submit time, not a panic deep in
/// a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowConfig {
    /// Prompt-driven batch image generation.
    NanoBanana {
        tier: ModelTier,
        pricing: PricingTable,
        limits: Limits,
    },

    /// Restyle a photographed room from a source image plus prompt.
    RoomRedesign {
        model: String,
        pricing: PricingTable,
        limits: Limits,
    },

    /// Re-render a source image into multiple output formats.
    SmartResize {
        formats: Vec<OutputFormat>,
        pricing: PricingTable,
        limits: Limits,
    },
}

impl WorkflowConfig {
    /// Parse a workflow template's raw JSONB config.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, CoreError> {
        serde_json::from_value(value.clone())
            .map_err(|e| CoreError::Validation(format!("Invalid workflow config: {e}")))
    }

    pub fn limits(&self) -> Limits {
        match self {
            Self::NanoBanana { limits, .. }
            | Self::RoomRedesign { limits, .. }
            | Self::SmartResize { limits, .. } => *limits,
        }
    }

    pub fn pricing(&self) -> &PricingTable {
        match self {
            Self::NanoBanana { pricing, .. }
            | Self::RoomRedesign { pricing, .. }
            | Self::SmartResize { pricing, .. } => pricing,
        }
    }

    /// Provider-side model identifier for this workflow.
    pub fn model(&self) -> &str {
        match self {
            Self::NanoBanana { tier, .. } => tier.model_name(),
            Self::RoomRedesign { model, .. } => model,
            Self::SmartResize { .. } => "smart-resize",
        }
    }
}

// ---------------------------------------------------------------------------
// Work item specs
// ---------------------------------------------------------------------------

/// Maximum prompt length accepted by any workflow.
pub const MAX_PROMPT_LEN: usize = 4_000;

/// One unit of work inside an execution request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemSpec {
    /// Generation prompt. Required for NanoBanana and RoomRedesign.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Storage reference to the input image. Required for RoomRedesign and
    /// SmartResize.
    #[serde(default)]
    pub source_image: Option<String>,
    /// Additional style/reference images.
    #[serde(default)]
    pub reference_images: Vec<String>,
    pub resolution: Resolution,
    pub aspect_ratio: AspectRatio,
    #[serde(default = "default_output_format")]
    pub output_format: OutputFormat,
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Png
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a submission against its workflow's limits.
///
/// Rules:
/// - At least one item; at most `limits.max_items`.
/// - At most `limits.max_reference_images` reference images per item.
/// - Prompts must not exceed [`MAX_PROMPT_LEN`] characters.
/// - NanoBanana items need a non-empty prompt.
/// - RoomRedesign and SmartResize items need a source image.
/// - SmartResize items must request a supported output format.
pub fn validate_items(config: &WorkflowConfig, items: &[WorkItemSpec]) -> Result<(), CoreError> {
    let limits = config.limits();

    if items.is_empty() {
        return Err(CoreError::Validation(
            "An execution must contain at least one item".to_string(),
        ));
    }
    if items.len() > limits.max_items as usize {
        return Err(CoreError::Validation(format!(
            "Too many items: {} exceeds the workflow limit of {}",
            items.len(),
            limits.max_items
        )));
    }

    for (index, item) in items.iter().enumerate() {
        if item.reference_images.len() > limits.max_reference_images as usize {
            return Err(CoreError::Validation(format!(
                "Item {index}: {} reference images exceeds the limit of {}",
                item.reference_images.len(),
                limits.max_reference_images
            )));
        }

        if let Some(prompt) = &item.prompt {
            if prompt.chars().count() > MAX_PROMPT_LEN {
                return Err(CoreError::Validation(format!(
                    "Item {index}: prompt exceeds {MAX_PROMPT_LEN} characters"
                )));
            }
        }

        match config {
            WorkflowConfig::NanoBanana { .. } => {
                if item.prompt.as_deref().map_or(true, |p| p.trim().is_empty()) {
                    return Err(CoreError::Validation(format!(
                        "Item {index}: a prompt is required"
                    )));
                }
            }
            WorkflowConfig::RoomRedesign { .. } => {
                if item.source_image.is_none() {
                    return Err(CoreError::Validation(format!(
                        "Item {index}: a source image is required"
                    )));
                }
            }
            WorkflowConfig::SmartResize { formats, .. } => {
                if item.source_image.is_none() {
                    return Err(CoreError::Validation(format!(
                        "Item {index}: a source image is required"
                    )));
                }
                if !formats.contains(&item.output_format) {
                    return Err(CoreError::Validation(format!(
                        "Item {index}: output format '{}' is not supported by this workflow",
                        item.output_format.extension()
                    )));
                }
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
