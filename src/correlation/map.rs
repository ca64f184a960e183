//! Pending reply bookkeeping.

use super::{CorrelationError, CorrelationSettings};
use crate::envelope::{ChainId, Envelope, EnvelopeKind};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::{Clock, DefaultClock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Attempts made to derive a child id that is not already pending.
const MAX_ALLOCATION_ATTEMPTS: usize = 8;

type ReplyResult = Result<Value, CorrelationError>;

struct PendingEntry {
    sender: oneshot::Sender<ReplyResult>,
    deadline: DateTime<Utc>,
    timer: JoinHandle<()>,
}

struct Shared {
    entries: Mutex<HashMap<ChainId, PendingEntry>>,
    timeout: Duration,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl Shared {
    fn entries(&self) -> MutexGuard<'_, HashMap<ChainId, PendingEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(&self, request_id: &ChainId) -> Option<PendingEntry> {
        self.entries().remove(request_id)
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    fn expire(&self, request_id: &ChainId) {
        let Some(entry) = self.take(request_id) else {
            return;
        };
        warn!(request_id = %request_id, timeout_ms = self.timeout_ms(), "pending request timed out");
        entry
            .sender
            .send(Err(CorrelationError::Timeout {
                request_id: request_id.clone(),
                timeout_ms: self.timeout_ms(),
            }))
            .ok();
    }
}

/// Outcome of offering an envelope to [`CorrelationMap::settle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// A pending entry was resolved with the envelope payload.
    Resolved,
    /// A pending entry was rejected with the envelope error.
    Rejected,
    /// The envelope is a reply but no entry is pending for its id.
    Unmatched,
    /// The envelope is not a reply type.
    NotReply,
}

/// Introspection record for one pending entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSummary {
    /// Chain identifier awaiting a reply.
    pub request_id: ChainId,
    /// Instant after which the entry expires.
    pub deadline: DateTime<Utc>,
}

/// Continuation awaiting the reply to one request.
#[derive(Debug)]
pub struct PendingReply {
    request_id: ChainId,
    receiver: oneshot::Receiver<ReplyResult>,
}

impl PendingReply {
    /// Returns the chain identifier this continuation waits on.
    #[must_use]
    pub const fn request_id(&self) -> &ChainId {
        &self.request_id
    }

    /// Waits for the reply payload.
    ///
    /// # Errors
    ///
    /// Returns the [`CorrelationError`] the entry was settled with, or
    /// [`CorrelationError::Cancelled`] if the map was dropped first.
    pub async fn wait(self) -> Result<Value, CorrelationError> {
        let Self {
            request_id,
            receiver,
        } = self;
        receiver
            .await
            .unwrap_or(Err(CorrelationError::Cancelled { request_id }))
    }
}

/// Map of outstanding requests keyed by chain identifier.
///
/// Clones share the same entries.
#[derive(Clone)]
pub struct CorrelationMap {
    shared: Arc<Shared>,
}

impl CorrelationMap {
    /// Creates a map with the given settings and the system clock.
    #[must_use]
    pub fn new(settings: CorrelationSettings) -> Self {
        Self::with_clock(settings, Arc::new(DefaultClock))
    }

    /// Creates a map stamping deadlines with `clock`.
    #[must_use]
    pub fn with_clock(settings: CorrelationSettings, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            shared: Arc::new(Shared {
                entries: Mutex::new(HashMap::new()),
                timeout: settings.timeout(),
                clock,
            }),
        }
    }

    /// Returns the configured reply deadline.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.shared.timeout
    }

    /// Registers a new pending request derived from `base`.
    ///
    /// The returned identifier is `base` with one fresh task segment
    /// appended and is unique among pending entries. A timer rejects the
    /// entry with [`CorrelationError::Timeout`] once the deadline passes.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelationError::Collision`] if no unique identifier could
    /// be derived.
    pub fn begin(&self, base: &ChainId) -> Result<(ChainId, PendingReply), CorrelationError> {
        let mut entries = self.shared.entries();
        let request_id = (0..MAX_ALLOCATION_ATTEMPTS)
            .map(|_| base.child())
            .find(|candidate| !entries.contains_key(candidate))
            .ok_or_else(|| CorrelationError::Collision { base: base.clone() })?;

        let (sender, receiver) = oneshot::channel();
        let deadline = deadline_after(self.shared.clock.utc(), self.shared.timeout);
        let timer = spawn_timer(
            Arc::downgrade(&self.shared),
            request_id.clone(),
            self.shared.timeout,
        );
        entries.insert(
            request_id.clone(),
            PendingEntry {
                sender,
                deadline,
                timer,
            },
        );
        debug!(request_id = %request_id, "registered pending request");

        Ok((
            request_id.clone(),
            PendingReply {
                request_id,
                receiver,
            },
        ))
    }

    /// Resolves the entry for `request_id` with `payload`.
    ///
    /// Returns `false` when no entry is pending for the id.
    pub fn resolve(&self, request_id: &ChainId, payload: Value) -> bool {
        self.finish(request_id, Ok(payload))
    }

    /// Rejects the entry for `request_id` with `message`.
    ///
    /// Returns `false` when no entry is pending for the id.
    pub fn reject(&self, request_id: &ChainId, message: impl Into<String>) -> bool {
        let error = CorrelationError::Rejected {
            request_id: request_id.clone(),
            message: message.into(),
        };
        self.finish(request_id, Err(error))
    }

    /// Fails the entry for `request_id` with an arbitrary error.
    pub(crate) fn fail(&self, request_id: &ChainId, error: CorrelationError) -> bool {
        self.finish(request_id, Err(error))
    }

    /// Settles the entry matching a reply envelope.
    ///
    /// `response` and `result` resolve with the payload (`null` when
    /// absent); `error` rejects with the envelope's error text.
    pub fn settle(&self, envelope: &Envelope) -> Settlement {
        if !envelope.kind.is_reply() {
            return Settlement::NotReply;
        }
        let Some(request_id) = envelope.request_id.as_ref() else {
            return Settlement::Unmatched;
        };

        if envelope.kind == EnvelopeKind::Error {
            let message = envelope
                .error_message()
                .unwrap_or_else(|| "unknown error".to_owned());
            if self.reject(request_id, message) {
                return Settlement::Rejected;
            }
        } else {
            let payload = envelope.payload.clone().unwrap_or(Value::Null);
            if self.resolve(request_id, payload) {
                return Settlement::Resolved;
            }
        }
        Settlement::Unmatched
    }

    /// Cancels every pending entry.
    ///
    /// Waiters observe [`CorrelationError::Cancelled`].
    pub fn cancel_all(&self) {
        let drained: Vec<(ChainId, PendingEntry)> = self.shared.entries().drain().collect();
        if !drained.is_empty() {
            debug!(count = drained.len(), "cancelling pending requests");
        }
        for (request_id, entry) in drained {
            entry.timer.abort();
            entry
                .sender
                .send(Err(CorrelationError::Cancelled { request_id }))
                .ok();
        }
    }

    /// Returns the number of pending entries.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.entries().len()
    }

    /// Returns whether an entry is pending for `request_id`.
    #[must_use]
    pub fn is_pending(&self, request_id: &ChainId) -> bool {
        self.shared.entries().contains_key(request_id)
    }

    /// Returns a summary of every pending entry, earliest deadline first.
    #[must_use]
    pub fn pending(&self) -> Vec<PendingSummary> {
        let mut summaries: Vec<PendingSummary> = self
            .shared
            .entries()
            .iter()
            .map(|(request_id, entry)| PendingSummary {
                request_id: request_id.clone(),
                deadline: entry.deadline,
            })
            .collect();
        summaries.sort_by_key(|summary| summary.deadline);
        summaries
    }

    fn finish(&self, request_id: &ChainId, outcome: ReplyResult) -> bool {
        let Some(entry) = self.shared.take(request_id) else {
            debug!(request_id = %request_id, "no pending request for reply");
            return false;
        };
        entry.timer.abort();
        if entry.sender.send(outcome).is_err() {
            debug!(request_id = %request_id, "pending reply was abandoned by its waiter");
        }
        true
    }
}

impl std::fmt::Debug for CorrelationMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationMap")
            .field("timeout", &self.shared.timeout)
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

fn spawn_timer(shared: Weak<Shared>, request_id: ChainId, timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        if let Some(shared) = shared.upgrade() {
            shared.expire(&request_id);
        }
    })
}

fn deadline_after(now: DateTime<Utc>, timeout: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(timeout)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
