//! Engine configuration loaded from environment variables.

use std::time::Duration;

use pixora_core::retry::RetryPolicy;

/// Tuning knobs for the execution engine.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of worker tasks pulling from the queue (default: `8`).
    pub worker_count: usize,
    /// Maximum items of one tenant in flight at once (default: `4`).
    pub per_tenant_ceiling: usize,
    /// Retry policy for transient provider failures.
    pub retry: RetryPolicy,
    /// Wall-clock bound on a whole execution (default: `1800` seconds).
    pub execution_timeout: Duration,
    /// How often the timeout reaper sweeps (default: `60` seconds).
    pub reaper_interval: Duration,
    /// Root directory for stored artifacts (default: `./artifacts`).
    pub artifact_root: String,
    /// Provider base URL (default: `http://localhost:9800`).
    pub provider_base_url: String,
    /// Provider API key (default: empty, for local stubs).
    pub provider_api_key: String,
    /// Whether provider cost is still charged when the artifact cannot be
    /// stored afterwards (default: `false`).
    pub charge_on_storage_failure: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: 8,
            per_tenant_ceiling: 4,
            retry: RetryPolicy::default(),
            execution_timeout: Duration::from_secs(1800),
            reaper_interval: Duration::from_secs(60),
            artifact_root: "./artifacts".into(),
            provider_base_url: "http://localhost:9800".into(),
            provider_api_key: String::new(),
            charge_on_storage_failure: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                 |
    /// |-----------------------------|-------------------------|
    /// | `WORKER_COUNT`              | `8`                     |
    /// | `PER_TENANT_CEILING`        | `4`                     |
    /// | `MAX_RETRIES`               | `3`                     |
    /// | `RETRY_BASE_DELAY_MS`       | `1000`                  |
    /// | `RETRY_MAX_DELAY_MS`        | `30000`                 |
    /// | `EXECUTION_TIMEOUT_SECS`    | `1800`                  |
    /// | `REAPER_INTERVAL_SECS`      | `60`                    |
    /// | `ARTIFACT_ROOT`             | `./artifacts`           |
    /// | `PROVIDER_BASE_URL`         | `http://localhost:9800` |
    /// | `PROVIDER_API_KEY`          | (empty)                 |
    /// | `CHARGE_ON_STORAGE_FAILURE` | `false`                 |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let worker_count: usize = env_parsed("WORKER_COUNT", defaults.worker_count);
        let per_tenant_ceiling: usize =
            env_parsed("PER_TENANT_CEILING", defaults.per_tenant_ceiling);

        let retry = RetryPolicy {
            max_retries: env_parsed("MAX_RETRIES", defaults.retry.max_retries),
            base_delay: Duration::from_millis(env_parsed(
                "RETRY_BASE_DELAY_MS",
                defaults.retry.base_delay.as_millis() as u64,
            )),
            max_delay: Duration::from_millis(env_parsed(
                "RETRY_MAX_DELAY_MS",
                defaults.retry.max_delay.as_millis() as u64,
            )),
        };

        let execution_timeout = Duration::from_secs(env_parsed(
            "EXECUTION_TIMEOUT_SECS",
            defaults.execution_timeout.as_secs(),
        ));
        let reaper_interval = Duration::from_secs(env_parsed(
            "REAPER_INTERVAL_SECS",
            defaults.reaper_interval.as_secs(),
        ));

        let artifact_root =
            std::env::var("ARTIFACT_ROOT").unwrap_or_else(|_| defaults.artifact_root.clone());
        let provider_base_url = std::env::var("PROVIDER_BASE_URL")
            .unwrap_or_else(|_| defaults.provider_base_url.clone());
        let provider_api_key = std::env::var("PROVIDER_API_KEY").unwrap_or_default();

        let charge_on_storage_failure = std::env::var("CHARGE_ON_STORAGE_FAILURE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(defaults.charge_on_storage_failure);

        Self {
            worker_count,
            per_tenant_ceiling,
            retry,
            execution_timeout,
            reaper_interval,
            artifact_root,
            provider_base_url,
            provider_api_key,
            charge_on_storage_failure,
        }
    }
}

/// Parse an env var, panicking on malformed values so misconfiguration
/// fails at startup rather than mid-run.
fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid value, got {raw:?}")),
        Err(_) => default,
    }
}
