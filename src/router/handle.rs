//! Handle used to control a running router.

use super::{ConnectionId, RouterError};
use crate::envelope::{ChainId, WorkerName};
use crate::transport::{Endpoint, duplex};
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};

/// A registered worker as reported by [`RouterHandle::snapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredWorker {
    /// Worker identity.
    pub name: WorkerName,
    /// Connection the worker is bound to.
    pub connection: ConnectionId,
    /// Time of registration.
    pub registered_at: DateTime<Utc>,
}

/// Point-in-time view of router state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterSnapshot {
    /// Registered workers in name order.
    pub workers: Vec<RegisteredWorker>,
    /// Request ids of forwards awaiting a reply.
    pub pending_forwards: Vec<ChainId>,
    /// Number of open connections, the caller included.
    pub connections: usize,
}

impl RouterSnapshot {
    /// Returns whether `name` is registered.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.workers.iter().any(|worker| worker.name.as_str() == name)
    }
}

pub(crate) enum RouterEvent {
    Attach {
        endpoint: Endpoint,
        name: Option<WorkerName>,
    },
    Inbound {
        connection: ConnectionId,
        envelope: crate::envelope::Envelope,
    },
    Disconnected {
        connection: ConnectionId,
    },
    Snapshot {
        reply: oneshot::Sender<RouterSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable control handle for a running router.
#[derive(Debug, Clone)]
pub struct RouterHandle {
    events: mpsc::UnboundedSender<RouterEvent>,
}

impl RouterHandle {
    pub(crate) const fn new(events: mpsc::UnboundedSender<RouterEvent>) -> Self {
        Self { events }
    }

    /// Opens an anonymous connection.
    ///
    /// The peer may bind a name by sending a `register` envelope.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Stopped`] when the router is not running.
    pub fn connect(&self) -> Result<Endpoint, RouterError> {
        self.attach(None)
    }

    /// Opens a connection already bound to `name`.
    ///
    /// If `name` is taken the connection stays open but unbound.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Stopped`] when the router is not running.
    pub fn register(&self, name: WorkerName) -> Result<Endpoint, RouterError> {
        self.attach(Some(name))
    }

    /// Returns a snapshot of the router state.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Stopped`] when the router is not running.
    pub async fn snapshot(&self) -> Result<RouterSnapshot, RouterError> {
        let (reply, receiver) = oneshot::channel();
        self.events
            .send(RouterEvent::Snapshot { reply })
            .map_err(|_| RouterError::Stopped)?;
        receiver.await.map_err(|_| RouterError::Stopped)
    }

    /// Stops the event loop and closes every connection.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Stopped`] when the router had already stopped.
    pub async fn shutdown(&self) -> Result<(), RouterError> {
        let (reply, receiver) = oneshot::channel();
        self.events
            .send(RouterEvent::Shutdown { reply })
            .map_err(|_| RouterError::Stopped)?;
        receiver.await.map_err(|_| RouterError::Stopped)
    }

    fn attach(&self, name: Option<WorkerName>) -> Result<Endpoint, RouterError> {
        let (router_end, peer_end) = duplex();
        self.events
            .send(RouterEvent::Attach {
                endpoint: router_end,
                name,
            })
            .map_err(|_| RouterError::Stopped)?;
        Ok(peer_end)
    }
}
