use crate::error::{AivastError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/api/v1";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;
pub const DEFAULT_DIRECTIVE_DELAY_MS: u64 = 1_500;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// What happens to pollers started in a session the user has left.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Pollers run to a terminal state and keep updating their bubble.
    #[default]
    KeepRunning,
    /// Pollers are cancelled on session switch and new conversation.
    CancelOnSwitch,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub directive_delay_ms: u64,
    pub request_timeout_secs: u64,
    /// Start without an authenticated session.
    pub guest: bool,
    pub orphan_policy: OrphanPolicy,
    /// Resume polling for scans still running when a session is reloaded.
    pub resume_pending_on_reload: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            directive_delay_ms: DEFAULT_DIRECTIVE_DELAY_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            guest: false,
            orphan_policy: OrphanPolicy::default(),
            resume_pending_on_reload: true,
        }
    }
}

impl ClientConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn directive_delay(&self) -> Duration {
        Duration::from_millis(self.directive_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Rejects values the client cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(AivastError::config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(AivastError::config("poll_interval_ms must be greater than 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(AivastError::config("request_timeout_secs must be greater than 0"));
        }
        Ok(())
    }
}
