//! Configuration types, built from environment variables.

use std::time::Duration;

use secrecy::SecretString;

/// Dispatch pipeline tuning.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Recipients per transport call.
    pub chunk_size: usize,
    /// Delivery-log entries per storage batch write.
    pub log_batch_size: usize,
    /// Timeout for a single chunk send. A timeout counts as a chunk
    /// failure, not a run-level abort.
    pub send_timeout: Duration,
    /// Base URL the link rewriter points tracked hrefs at; the link id is
    /// appended.
    pub click_base_url: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            log_batch_size: 25,
            send_timeout: Duration::from_secs(30),
            click_base_url: "http://localhost:8080/l/".to_string(),
        }
    }
}

impl DispatchConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let chunk_size = std::env::var("BULKMAIL_CHUNK_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(defaults.chunk_size);

        let log_batch_size = std::env::var("BULKMAIL_LOG_BATCH_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(defaults.log_batch_size);

        let send_timeout_secs: u64 = std::env::var("BULKMAIL_SEND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let click_base_url = std::env::var("BULKMAIL_CLICK_BASE_URL")
            .unwrap_or(defaults.click_base_url);

        Self {
            chunk_size,
            log_batch_size,
            send_timeout: Duration::from_secs(send_timeout_secs),
            click_base_url,
        }
    }
}

/// Consent registry client configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub timeout: Duration,
}

impl RegistryConfig {
    /// Returns `None` if `CONSENT_API_URL` is not set.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("CONSENT_API_URL").ok()?;
        let api_key = std::env::var("CONSENT_API_KEY").unwrap_or_default();

        let timeout_secs: u64 = std::env::var("CONSENT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(15);

        Some(Self {
            base_url,
            api_key: SecretString::from(api_key),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Segment directory client configuration.
#[derive(Debug, Clone)]
pub struct SegmentsConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl SegmentsConfig {
    /// Returns `None` if `SEGMENT_API_URL` is not set.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("SEGMENT_API_URL").ok()?;

        let timeout_secs: u64 = std::env::var("SEGMENT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(15);

        Some(Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Scheduled-campaign sweep configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// Sweep interval.
    pub interval: Duration,
    /// Campaigns due within `now + window` are picked up by a sweep.
    pub window: Duration,
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        let enabled = std::env::var("BULKMAIL_SCHEDULER_ENABLED")
            .map(|s| s != "0" && !s.eq_ignore_ascii_case("false"))
            .unwrap_or(true);

        let interval_secs: u64 = std::env::var("BULKMAIL_SCHEDULER_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        let window_secs: u64 = std::env::var("BULKMAIL_SCHEDULER_WINDOW_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        Self {
            enabled,
            interval: Duration::from_secs(interval_secs),
            window: Duration::from_secs(window_secs),
        }
    }
}
