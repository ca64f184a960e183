//! Router event loop and per-envelope handling.

use super::handle::RouterEvent;
use super::registry::{Connection, PendingForward, PendingForwards, Registry};
use super::{
    ConfigCommand, ConnectionId, DeliveryPolicy, RegisteredWorker, RouterSettings, RouterSnapshot,
};
use crate::directory::WorkerDirectory;
use crate::envelope::{ChainId, ChatTurn, Envelope, EnvelopeKind, ForwardRequest, WorkerName};
use crate::transport::{Endpoint, EnvelopeReceiver};
use crate::worker::WorkerConfig;
use chrono::TimeDelta;
use mockable::Clock;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub(crate) struct RouterCore {
    settings: RouterSettings,
    events: mpsc::UnboundedSender<RouterEvent>,
    connections: HashMap<ConnectionId, Connection>,
    next_connection: ConnectionId,
    registry: Registry,
    forwards: PendingForwards,
    internal_requests: HashSet<ChainId>,
    saved_configs: HashMap<WorkerName, WorkerConfig>,
    directory: Option<Arc<dyn WorkerDirectory>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl RouterCore {
    pub(crate) fn new(
        settings: RouterSettings,
        events: mpsc::UnboundedSender<RouterEvent>,
        saved_configs: HashMap<WorkerName, WorkerConfig>,
        directory: Option<Arc<dyn WorkerDirectory>>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            settings,
            events,
            connections: HashMap::new(),
            next_connection: ConnectionId::CALLER,
            registry: Registry::default(),
            forwards: PendingForwards::default(),
            internal_requests: HashSet::new(),
            saved_configs,
            directory,
            clock,
        }
    }

    /// Processes events until shutdown is requested.
    pub(crate) async fn run(mut self, mut events: mpsc::UnboundedReceiver<RouterEvent>) {
        info!(router = %self.settings.name, policy = ?self.settings.policy, "router started");
        while let Some(event) = events.recv().await {
            self.expire_forwards();
            match event {
                RouterEvent::Attach { endpoint, name } => {
                    self.attach(endpoint, name);
                }
                RouterEvent::Inbound {
                    connection,
                    envelope,
                } => self.handle_inbound(connection, envelope),
                RouterEvent::Disconnected { connection } => {
                    if self.connections.contains_key(&connection) {
                        info!(connection = %connection, "connection closed");
                        self.drop_connection(connection);
                    }
                }
                RouterEvent::Snapshot { reply } => {
                    reply.send(self.snapshot()).ok();
                }
                RouterEvent::Shutdown { reply } => {
                    self.close_all();
                    reply.send(()).ok();
                    info!(router = %self.settings.name, "router stopped");
                    return;
                }
            }
        }
        self.close_all();
    }

    /// Adds a connection and starts its reader task.
    pub(crate) fn attach(&mut self, endpoint: Endpoint, name: Option<WorkerName>) -> ConnectionId {
        let id = self.next_connection;
        self.next_connection = id.next();

        let (sender, receiver) = endpoint.split();
        let reader = spawn_reader(id, receiver, self.events.clone());
        self.connections.insert(
            id,
            Connection {
                sender,
                name: None,
                reader,
            },
        );
        debug!(connection = %id, "connection attached");

        if let Some(name) = name {
            self.bind(id, name);
        }
        id
    }

    fn handle_inbound(&mut self, connection: ConnectionId, envelope: Envelope) {
        debug!(
            connection = %connection,
            kind = %envelope.kind,
            name = %envelope.name,
            "inbound envelope"
        );

        if !matches!(envelope.kind, EnvelopeKind::Forward | EnvelopeKind::Register)
            && self.relay_pending(&envelope)
        {
            return;
        }
        if envelope.kind.is_reply() && self.consume_internal(&envelope) {
            return;
        }

        let kind = envelope.kind.clone();
        match kind {
            EnvelopeKind::Register => self.handle_register(connection, &envelope),
            EnvelopeKind::UserMessage => self.handle_user_message(connection, envelope),
            EnvelopeKind::Forward => self.handle_forward(connection, &envelope),
            _ if kind.is_terminal() => self.deliver_to_caller(envelope),
            _ => warn!(connection = %connection, kind = %kind, "unknown message type"),
        }
    }

    fn relay_pending(&mut self, envelope: &Envelope) -> bool {
        let Some(request_id) = envelope.request_id.as_ref() else {
            return false;
        };
        let Some(pending) = self.forwards.take(request_id) else {
            if envelope.kind.is_reply() && self.forwards.was_settled(request_id) {
                debug!(request_id = %request_id, "dropping duplicate reply to settled forward");
                return true;
            }
            return false;
        };
        let elapsed_ms = (self.clock.utc() - pending.created_at).num_milliseconds();
        debug!(
            request_id = %request_id,
            target = %pending.target,
            connection = %pending.sender,
            elapsed_ms,
            "relaying reply to forward issuer"
        );
        self.deliver(pending.sender, envelope.clone());
        true
    }

    /// Forgets forwards that outlived `forward_ttl_ms`.
    fn expire_forwards(&mut self) {
        if self.settings.forward_ttl_ms == 0 {
            return;
        }
        let Some(cutoff) = i64::try_from(self.settings.forward_ttl_ms)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .and_then(|ttl| self.clock.utc().checked_sub_signed(ttl))
        else {
            return;
        };
        for request_id in self.forwards.expire_before(cutoff) {
            warn!(request_id = %request_id, "forward expired without a reply");
        }
    }

    fn consume_internal(&mut self, envelope: &Envelope) -> bool {
        let Some(request_id) = envelope.request_id.as_ref() else {
            return false;
        };
        if !self.internal_requests.remove(request_id) {
            return false;
        }
        match envelope.kind {
            EnvelopeKind::Error => warn!(
                worker = %envelope.name,
                error = %envelope.error_message().unwrap_or_default(),
                "worker rejected saved configuration"
            ),
            _ => debug!(worker = %envelope.name, "saved configuration applied"),
        }
        true
    }

    fn handle_register(&mut self, connection: ConnectionId, envelope: &Envelope) {
        let declared = envelope
            .payload
            .as_ref()
            .and_then(|payload| payload.get("name"))
            .and_then(Value::as_str)
            .map(WorkerName::new);

        let name = match declared {
            Some(Ok(name)) => name,
            Some(Err(err)) => {
                warn!(connection = %connection, error = %err, "rejecting registration");
                self.reply_error(
                    connection,
                    format!("Invalid registration: {err}"),
                    envelope.request_id.clone(),
                );
                return;
            }
            None => envelope.name.clone(),
        };
        self.bind(connection, name);
    }

    fn bind(&mut self, connection: ConnectionId, name: WorkerName) {
        if self.registry.contains(&name) {
            warn!(worker = %name, connection = %connection, "worker already registered");
            return;
        }
        let Some(entry) = self.connections.get_mut(&connection) else {
            return;
        };
        if let Some(existing) = &entry.name {
            warn!(
                worker = %name,
                existing = %existing,
                connection = %connection,
                "connection already bound to another worker"
            );
            return;
        }

        entry.name = Some(name.clone());
        self.registry
            .insert(name.clone(), connection, self.clock.utc());
        info!(worker = %name, connection = %connection, "worker registered");

        if let Some(config) = self.saved_configs.get(&name).cloned() {
            let request_id = ChainId::generate("config");
            self.internal_requests.insert(request_id.clone());
            let restore = Envelope::new(EnvelopeKind::SetConfig, self.settings.name.clone())
                .with_payload(config.to_value())
                .with_request_id(request_id);
            self.deliver(connection, restore);
        }
    }

    fn handle_user_message(&mut self, connection: ConnectionId, envelope: Envelope) {
        let turn = match ChatTurn::from_envelope(&envelope) {
            Ok(turn) => turn,
            Err(err) => {
                warn!(connection = %connection, error = %err, "invalid chat message");
                self.reply_error(
                    connection,
                    format!("Invalid chat message payload: {err}"),
                    envelope.request_id.clone(),
                );
                return;
            }
        };

        if self.settings.config_commands && ConfigCommand::matches(&turn.content) {
            self.handle_config_command(connection, &turn.content, envelope.request_id);
            return;
        }

        match self.settings.policy.clone() {
            DeliveryPolicy::Orchestrator { worker } => {
                let Some(target) = self.registry.connection_of(&worker) else {
                    self.reply_error(
                        connection,
                        format!("Orchestrator worker not registered: {worker}"),
                        envelope.request_id,
                    );
                    return;
                };
                let request_id = envelope.request_id.clone();
                if !self.deliver(target, envelope) {
                    self.reply_error(
                        connection,
                        format!("Failed to deliver message to {worker}"),
                        request_id,
                    );
                }
            }
            DeliveryPolicy::FanOut => {
                let targets: Vec<ConnectionId> = self
                    .registry
                    .iter()
                    .map(|(_, entry)| entry.connection)
                    .filter(|target| *target != connection)
                    .collect();
                if targets.is_empty() {
                    self.reply_error(
                        connection,
                        "No workers registered to receive the message",
                        envelope.request_id,
                    );
                    return;
                }
                for target in targets {
                    self.deliver(target, envelope.clone());
                }
            }
        }
    }

    fn handle_config_command(
        &mut self,
        connection: ConnectionId,
        content: &str,
        request_id: Option<ChainId>,
    ) {
        let command = match ConfigCommand::parse(content) {
            Ok(command) => command,
            Err(err) => {
                self.reply_error(connection, err.to_string(), request_id);
                return;
            }
        };
        let worker = command.worker().clone();
        let Some(target) = self.registry.connection_of(&worker) else {
            self.reply_error(connection, format!("Unknown worker: {worker}"), request_id);
            return;
        };
        let chain = request_id.unwrap_or_else(|| ChainId::generate("config"));

        let outbound = match command {
            ConfigCommand::Get { key, .. } => {
                let payload = key.map_or_else(|| json!({}), |wanted| json!({ "key": wanted }));
                Envelope::new(EnvelopeKind::GetConfig, self.settings.name.clone())
                    .with_payload(payload)
            }
            ConfigCommand::Set { key, value, .. } => {
                let patch = WorkerConfig::new().with(key, value);
                self.saved_configs
                    .entry(worker.clone())
                    .or_default()
                    .merge(&patch);
                self.persist(worker.clone(), patch.clone());
                Envelope::new(EnvelopeKind::SetConfig, self.settings.name.clone())
                    .with_payload(patch.to_value())
            }
        };

        info!(worker = %worker, request_id = %chain, kind = %outbound.kind, "config command");
        if !self.deliver(target, outbound.with_request_id(chain.clone())) {
            self.reply_error(
                connection,
                format!("Failed to deliver config command to {worker}"),
                Some(chain),
            );
        }
    }

    fn persist(&self, worker: WorkerName, patch: WorkerConfig) {
        let Some(directory) = self.directory.clone() else {
            return;
        };
        tokio::spawn(async move {
            if let Err(err) = directory.persist_config(&worker, &patch).await {
                error!(worker = %worker, error = %err, "failed to persist worker config");
            }
        });
    }

    fn handle_forward(&mut self, connection: ConnectionId, envelope: &Envelope) {
        let request = match ForwardRequest::from_envelope(envelope) {
            Ok(request) => request,
            Err(err) => {
                warn!(connection = %connection, error = %err, "invalid forward");
                self.reply_error(
                    connection,
                    format!("Invalid forward: {err}"),
                    envelope.request_id.clone(),
                );
                return;
            }
        };
        let ForwardRequest { target, message } = request;
        let Some(request_id) = message.request_id.clone() else {
            return;
        };

        let Some(target_connection) = self.registry.connection_of(&target) else {
            warn!(target = %target, request_id = %request_id, "forward target not found");
            self.reply_error(
                connection,
                format!("Target worker not found: {target}"),
                Some(request_id),
            );
            return;
        };
        if self.forwards.contains(&request_id) {
            self.reply_error(
                connection,
                format!("Request id already pending: {request_id}"),
                Some(request_id),
            );
            return;
        }

        self.forwards.record(
            request_id.clone(),
            PendingForward {
                sender: connection,
                target: target.clone(),
                created_at: self.clock.utc(),
            },
        );
        debug!(target = %target, request_id = %request_id, "forwarding");
        if !self.deliver(target_connection, message) {
            self.forwards.take(&request_id);
            self.reply_error(
                connection,
                format!("Failed to deliver to {target}"),
                Some(request_id),
            );
        }
    }

    fn deliver_to_caller(&mut self, envelope: Envelope) {
        let Envelope {
            name,
            payload,
            request_id,
            error,
            ..
        } = envelope;
        let agent_message = Envelope {
            kind: EnvelopeKind::AgentMessage,
            name,
            payload,
            request_id,
            error,
        };
        if !self.connections.contains_key(&ConnectionId::CALLER) {
            warn!("caller disconnected, dropping agent message");
            return;
        }
        self.deliver(ConnectionId::CALLER, agent_message);
    }

    fn reply_error(
        &mut self,
        connection: ConnectionId,
        message: impl Into<String>,
        request_id: Option<ChainId>,
    ) {
        let envelope = Envelope::failure(self.settings.name.clone(), message, request_id);
        self.deliver(connection, envelope);
    }

    /// Sends on `connection`, removing it when the send fails.
    fn deliver(&mut self, connection: ConnectionId, envelope: Envelope) -> bool {
        let Some(entry) = self.connections.get(&connection) else {
            warn!(connection = %connection, kind = %envelope.kind, "no such connection");
            return false;
        };
        if entry.sender.send(envelope).is_ok() {
            return true;
        }
        warn!(connection = %connection, "send failed, removing connection");
        self.drop_connection(connection);
        false
    }

    fn drop_connection(&mut self, connection: ConnectionId) {
        let Some(entry) = self.connections.remove(&connection) else {
            return;
        };
        entry.reader.abort();
        if let Some(name) = entry.name {
            self.registry.remove(&name);
            info!(worker = %name, connection = %connection, "worker unregistered");
        }
        let purged = self.forwards.purge_connection(connection);
        if purged > 0 {
            debug!(connection = %connection, purged, "purged pending forwards");
        }
    }

    fn close_all(&mut self) {
        let ids: Vec<ConnectionId> = self.connections.keys().copied().collect();
        for id in ids {
            self.drop_connection(id);
        }
    }

    fn snapshot(&self) -> RouterSnapshot {
        RouterSnapshot {
            workers: self
                .registry
                .iter()
                .map(|(name, entry)| RegisteredWorker {
                    name: name.clone(),
                    connection: entry.connection,
                    registered_at: entry.registered_at,
                })
                .collect(),
            pending_forwards: self.forwards.ids(),
            connections: self.connections.len(),
        }
    }
}

fn spawn_reader(
    connection: ConnectionId,
    mut receiver: EnvelopeReceiver,
    events: mpsc::UnboundedSender<RouterEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(envelope) = receiver.recv().await {
            if events
                .send(RouterEvent::Inbound {
                    connection,
                    envelope,
                })
                .is_err()
            {
                return;
            }
        }
        events.send(RouterEvent::Disconnected { connection }).ok();
    })
}
