//! Connection, registry and pending-forward tables owned by the event loop.

use crate::envelope::{ChainId, WorkerName};
use crate::transport::EnvelopeSender;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use tokio::task::JoinHandle;

/// Router-assigned identifier of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// The connection of the external caller.
    pub const CALLER: Self = Self(0);

    pub(crate) const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

pub(crate) struct Connection {
    pub(crate) sender: EnvelopeSender,
    pub(crate) name: Option<WorkerName>,
    pub(crate) reader: JoinHandle<()>,
}

pub(crate) struct RegistryEntry {
    pub(crate) connection: ConnectionId,
    pub(crate) registered_at: DateTime<Utc>,
}

/// Worker names bound to connections.
#[derive(Default)]
pub(crate) struct Registry {
    entries: BTreeMap<WorkerName, RegistryEntry>,
}

impl Registry {
    pub(crate) fn contains(&self, name: &WorkerName) -> bool {
        self.entries.contains_key(name)
    }

    pub(crate) fn insert(&mut self, name: WorkerName, connection: ConnectionId, at: DateTime<Utc>) {
        self.entries.insert(
            name,
            RegistryEntry {
                connection,
                registered_at: at,
            },
        );
    }

    pub(crate) fn remove(&mut self, name: &WorkerName) -> Option<RegistryEntry> {
        self.entries.remove(name)
    }

    pub(crate) fn connection_of(&self, name: &WorkerName) -> Option<ConnectionId> {
        self.entries.get(name).map(|entry| entry.connection)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&WorkerName, &RegistryEntry)> {
        self.entries.iter()
    }
}

pub(crate) struct PendingForward {
    pub(crate) sender: ConnectionId,
    pub(crate) target: WorkerName,
    pub(crate) created_at: DateTime<Utc>,
}

/// Number of settled forward ids remembered to drop duplicate replies.
const SETTLED_HISTORY: usize = 1024;

/// Forwards awaiting their first reply, keyed by request id.
#[derive(Default)]
pub(crate) struct PendingForwards {
    entries: HashMap<ChainId, PendingForward>,
    settled: HashSet<ChainId>,
    settled_order: VecDeque<ChainId>,
}

impl PendingForwards {
    pub(crate) fn contains(&self, request_id: &ChainId) -> bool {
        self.entries.contains_key(request_id)
    }

    pub(crate) fn record(&mut self, request_id: ChainId, entry: PendingForward) {
        self.entries.insert(request_id, entry);
    }

    /// Removes the entry for `request_id` and remembers the id as settled.
    pub(crate) fn take(&mut self, request_id: &ChainId) -> Option<PendingForward> {
        let entry = self.entries.remove(request_id)?;
        if self.settled.insert(request_id.clone()) {
            self.settled_order.push_back(request_id.clone());
        }
        while self.settled_order.len() > SETTLED_HISTORY {
            if let Some(oldest) = self.settled_order.pop_front() {
                self.settled.remove(&oldest);
            }
        }
        Some(entry)
    }

    /// Returns whether a reply for `request_id` was already relayed.
    pub(crate) fn was_settled(&self, request_id: &ChainId) -> bool {
        self.settled.contains(request_id)
    }

    /// Drops entries recorded before `cutoff`, remembering their ids as
    /// settled so late replies are discarded.
    pub(crate) fn expire_before(&mut self, cutoff: DateTime<Utc>) -> Vec<ChainId> {
        let stale: Vec<ChainId> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.created_at < cutoff)
            .map(|(request_id, _)| request_id.clone())
            .collect();
        for request_id in &stale {
            self.take(request_id);
        }
        stale
    }

    /// Drops every entry whose reply would go to `connection`.
    pub(crate) fn purge_connection(&mut self, connection: ConnectionId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.sender != connection);
        before - self.entries.len()
    }

    pub(crate) fn ids(&self) -> Vec<ChainId> {
        let mut ids: Vec<ChainId> = self.entries.keys().cloned().collect();
        ids.sort_by_key(ToString::to_string);
        ids
    }
}
