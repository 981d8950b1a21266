//! Coordinator configuration.
//!
//! DESIGN
//! ======
//! Defaults reproduce the plain reactive behavior: no reply deadline, and a
//! second intent waits behind the outstanding one. Both knobs can be set in
//! code through the builder methods or from the environment:
//!
//! - `SKETCHSYNC_REPLY_TIMEOUT_MS`: reply deadline in milliseconds (unset or 0 = none)
//! - `SKETCHSYNC_INTENT_OVERLAP`: `reject`, `queue` (default), or `cancel`

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

pub const ENV_REPLY_TIMEOUT_MS: &str = "SKETCHSYNC_REPLY_TIMEOUT_MS";
pub const ENV_INTENT_OVERLAP: &str = "SKETCHSYNC_INTENT_OVERLAP";

/// What to do with a new intent while another is still awaiting its reply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// Refuse the new intent with `CoordinatorError::IntentOutstanding`.
    Reject,
    /// Start the new intent once the outstanding one resolves.
    #[default]
    Queue,
    /// Drop the outstanding intent's listener and start the new one.
    CancelPrevious,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown intent overlap policy `{0}` (expected reject, queue, or cancel)")]
pub struct ParsePolicyError(String);

impl FromStr for OverlapPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "queue" => Ok(Self::Queue),
            "cancel" | "cancel-previous" | "cancel_previous" => Ok(Self::CancelPrevious),
            other => Err(ParsePolicyError(other.to_owned())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Deadline for a reply. `None` waits indefinitely.
    pub reply_timeout: Option<Duration>,
    pub overlap: OverlapPolicy,
}

impl CoordinatorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from the environment, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let timeout_ms: u64 = env_parse(&lookup, ENV_REPLY_TIMEOUT_MS, 0);
        let overlap = lookup(ENV_INTENT_OVERLAP).map_or(OverlapPolicy::default(), |raw| {
            raw.parse().unwrap_or_else(|e: ParsePolicyError| {
                warn!(error = %e, "config: ignoring invalid overlap policy");
                OverlapPolicy::default()
            })
        });

        Self { reply_timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)), overlap }
    }

    #[must_use]
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }
}

fn env_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
