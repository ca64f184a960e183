//! Correlation settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default reply deadline in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Tunables for a [`CorrelationMap`](super::CorrelationMap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationSettings {
    /// Time a pending reply may wait before it is rejected.
    pub timeout_ms: u64,
}

impl CorrelationSettings {
    /// Creates settings with the given timeout.
    #[must_use]
    pub const fn with_timeout_ms(timeout_ms: u64) -> Self {
        Self { timeout_ms }
    }

    /// Returns the reply deadline as a duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for CorrelationSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}
