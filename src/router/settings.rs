//! Router settings.

use crate::envelope::WorkerName;
use serde::{Deserialize, Serialize};

/// How the router delivers `user-message` envelopes.
///
/// A router uses exactly one policy for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum DeliveryPolicy {
    /// Send each user message to one orchestrating worker.
    Orchestrator {
        /// Name of the orchestrating worker.
        worker: WorkerName,
    },
    /// Send a copy of each user message to every registered worker except
    /// the sender.
    FanOut,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self::Orchestrator {
            worker: WorkerName::from_static("orchestrator"),
        }
    }
}

/// Default forward lifetime; longer than the default correlation timeout.
const DEFAULT_FORWARD_TTL_MS: u64 = 60_000;

/// Router configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
    /// Identity stamped on envelopes the router originates.
    pub name: WorkerName,
    /// Delivery policy for user messages.
    pub policy: DeliveryPolicy,
    /// Whether `/config` chat commands are interpreted.
    pub config_commands: bool,
    /// Milliseconds a forward may wait for its reply before the router
    /// forgets it; `0` keeps forwards until their issuer disconnects.
    pub forward_ttl_ms: u64,
}

impl RouterSettings {
    /// Returns settings using `policy`.
    #[must_use]
    pub fn with_policy(mut self, policy: DeliveryPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            name: WorkerName::from_static("router"),
            policy: DeliveryPolicy::default(),
            config_commands: true,
            forward_ttl_ms: DEFAULT_FORWARD_TTL_MS,
        }
    }
}
