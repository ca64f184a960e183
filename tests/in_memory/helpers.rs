//! Shared helpers for end-to-end tests.

use courier::correlation::CorrelationSettings;
use courier::directory::adapters::memory::InMemoryWorkerDirectory;
use courier::envelope::{ChainId, Envelope, EnvelopeKind, WorkerName};
use courier::orchestrator::QnaOrchestrator;
use courier::router::{DeliveryPolicy, Router, RouterHandle, RouterSettings};
use courier::transport::Endpoint;
use courier::worker::{Worker, WorkerRuntime};
use courier::workers::{GenerationWorker, MemoryWorker, ScriptedGenerator};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// A running router with its caller endpoint.
pub struct Harness {
    /// Router control handle.
    pub router: RouterHandle,
    /// The external caller's endpoint.
    pub caller: Endpoint,
    /// Directory the router persists configuration to.
    pub directory: InMemoryWorkerDirectory,
    /// Correlation settings used for every worker.
    pub correlation: CorrelationSettings,
}

impl Harness {
    /// Starts a router with `policy` and an empty in-memory directory.
    pub async fn start(policy: DeliveryPolicy) -> Self {
        Self::start_with(policy, InMemoryWorkerDirectory::new()).await
    }

    /// Starts a router with `policy` backed by `directory`.
    pub async fn start_with(policy: DeliveryPolicy, directory: InMemoryWorkerDirectory) -> Self {
        let (router, caller) = Router::builder(RouterSettings::default().with_policy(policy))
            .directory(Arc::new(directory.clone()))
            .spawn()
            .await
            .expect("router starts");
        Self {
            router,
            caller,
            directory,
            correlation: CorrelationSettings::with_timeout_ms(2_000),
        }
    }

    /// Registers `worker` under its own name and runs it.
    pub fn spawn<W: Worker>(&self, worker: W) {
        let endpoint = self
            .router
            .register(worker.name().clone())
            .expect("register worker");
        WorkerRuntime::new(worker, endpoint, self.correlation).spawn();
    }

    /// Starts the orchestrator, memory and generation workers.
    pub fn spawn_qna(&self, generator: Arc<ScriptedGenerator>) {
        self.spawn(MemoryWorker::new());
        self.spawn(GenerationWorker::new(generator));
        self.spawn(QnaOrchestrator::new());
    }

    /// Waits until every name in `names` is registered.
    pub async fn await_registered(&self, names: &[&str]) {
        for _ in 0..100 {
            let snapshot = self.router.snapshot().await.expect("snapshot");
            if names.iter().all(|name| snapshot.is_registered(name)) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("workers {names:?} never registered");
    }

    /// Sends a user message from the caller.
    pub fn ask(&self, content: &str, request_id: &str) {
        self.caller
            .send(user_message(content, request_id))
            .expect("send user message");
    }

    /// Returns the next envelope delivered to the caller.
    pub async fn next(&mut self) -> Envelope {
        next(&mut self.caller).await
    }

    /// Asserts that the caller receives nothing for a short while.
    pub async fn assert_silent(&mut self) {
        let outcome = tokio::time::timeout(Duration::from_millis(150), self.caller.recv()).await;
        assert!(outcome.is_err(), "unexpected envelope: {outcome:?}");
    }
}

/// Parses a worker name.
pub fn name(raw: &str) -> WorkerName {
    WorkerName::new(raw).expect("valid name")
}

/// Parses a chain id.
pub fn id(raw: &str) -> ChainId {
    ChainId::parse(raw).expect("valid chain id")
}

/// Builds a user message from the caller.
pub fn user_message(content: &str, request_id: &str) -> Envelope {
    Envelope::new(EnvelopeKind::UserMessage, name("caller"))
        .with_payload(json!({"role": "user", "content": content}))
        .with_request_id(id(request_id))
}

/// Returns the next envelope on `endpoint`.
pub async fn next(endpoint: &mut Endpoint) -> Envelope {
    tokio::time::timeout(Duration::from_secs(5), endpoint.recv())
        .await
        .expect("envelope within deadline")
        .expect("channel open")
}
