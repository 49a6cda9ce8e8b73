//! Provider error taxonomy.
//!
//! Every provider-specific failure is classified here into the engine's
//! transient/permanent split, so retry policy upstream never needs to know
//! which provider it is talking to. Messages keep the provider's wording
//! verbatim; they end up on the failed item row for operator diagnosis.

/// Errors from one provider invocation.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The request timed out before the provider responded.
    #[error("Provider timeout: {0}")]
    Timeout(String),

    /// The provider signalled rate limiting (HTTP 429).
    #[error("Provider rate limit: {0}")]
    RateLimited(String),

    /// The request failed below HTTP (DNS, TLS, connection reset).
    #[error("Provider network error: {0}")]
    Network(String),

    /// The provider returned a non-2xx status with no recognised error code.
    #[error("Provider error ({status}): {body}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The prompt or input was rejected by the provider's content policy.
    #[error("Content policy rejection: {0}")]
    ContentPolicy(String),

    /// Input accepted by our validation but rejected by the provider.
    #[error("Provider rejected input: {0}")]
    InvalidInput(String),

    /// The account's provider quota is permanently exhausted.
    #[error("Provider quota exhausted: {0}")]
    QuotaExhausted(String),

    /// The provider returned a 2xx response the client could not decode.
    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Whether a retry with backoff has any chance of succeeding.
    ///
    /// Transient: timeouts, rate limits, network faults, and 5xx upstream
    /// statuses. Everything else fails the item immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::RateLimited(_) | Self::Network(_) => true,
            Self::Upstream { status, .. } => *status >= 500,
            Self::ContentPolicy(_)
            | Self::InvalidInput(_)
            | Self::QuotaExhausted(_)
            | Self::Malformed(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
