//! Shared world state for question-answering BDD scenarios.

use async_trait::async_trait;
use courier::correlation::CorrelationSettings;
use courier::envelope::{Envelope, EnvelopeKind, WorkerName};
use courier::orchestrator::QnaOrchestrator;
use courier::router::{Router, RouterHandle, RouterSettings};
use courier::transport::Endpoint;
use courier::worker::{Reply, Worker, WorkerContext, WorkerError, WorkerResult, WorkerRuntime};
use courier::workers::{GenerationWorker, MemoryWorker, ScriptedGenerator};
use rstest::fixture;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// A running router and its caller endpoint.
pub struct RunningRouter {
    /// Router control handle.
    pub handle: RouterHandle,
    /// The external caller.
    pub caller: Endpoint,
}

/// Scenario world for question-answering behaviour tests.
pub struct QnaWorld {
    /// Generator shared with the generation worker.
    pub generator: Arc<ScriptedGenerator>,
    /// Router under test, once started.
    pub router: Option<RunningRouter>,
    /// Endpoint of the probe worker, once registered.
    pub probe: Option<Endpoint>,
}

impl QnaWorld {
    /// Creates a world with no router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            generator: Arc::new(ScriptedGenerator::new()),
            router: None,
            probe: None,
        }
    }

    /// Returns the running router.
    ///
    /// # Errors
    ///
    /// Fails when no router has been started.
    pub fn running(&mut self) -> Result<&mut RunningRouter, eyre::Report> {
        self.router
            .as_mut()
            .ok_or_else(|| eyre::eyre!("no router started in scenario world"))
    }

    /// Starts a router with the orchestrator and generation workers and
    /// `memory` as the memory worker.
    pub fn start<M: Worker>(&mut self, memory: M) -> Result<(), eyre::Report> {
        let (handle, caller) = run_async(Router::builder(RouterSettings::default()).spawn())
            .map_err(|err| eyre::eyre!("router failed to start: {err}"))?;
        let correlation = CorrelationSettings::with_timeout_ms(2_000);
        spawn(&handle, memory, correlation)?;
        spawn(&handle, GenerationWorker::new(self.generator.clone()), correlation)?;
        spawn(&handle, QnaOrchestrator::new(), correlation)?;
        await_registered(&handle, &["orchestrator", "memory", "generation"])?;
        self.router = Some(RunningRouter { handle, caller });
        Ok(())
    }
}

impl Default for QnaWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> QnaWorld {
    QnaWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Receives the next envelope within a deadline.
pub fn receive(endpoint: &mut Endpoint, wait: Duration) -> Option<Envelope> {
    run_async(async { tokio::time::timeout(wait, endpoint.recv()).await.ok().flatten() })
}

/// Parses a worker name.
pub fn worker_name(raw: &str) -> Result<WorkerName, eyre::Report> {
    WorkerName::new(raw).map_err(|err| eyre::eyre!("invalid worker name '{raw}': {err}"))
}

fn spawn<W: Worker>(
    handle: &RouterHandle,
    worker: W,
    correlation: CorrelationSettings,
) -> Result<(), eyre::Report> {
    let endpoint = handle
        .register(worker.name().clone())
        .map_err(|err| eyre::eyre!("register {}: {err}", worker.name()))?;
    WorkerRuntime::new(worker, endpoint, correlation).spawn();
    Ok(())
}

fn await_registered(handle: &RouterHandle, names: &[&str]) -> Result<(), eyre::Report> {
    for _ in 0..100 {
        let snapshot = run_async(handle.snapshot()).map_err(|err| eyre::eyre!("snapshot: {err}"))?;
        if names.iter().all(|name| snapshot.is_registered(name)) {
            return Ok(());
        }
        run_async(tokio::time::sleep(Duration::from_millis(10)));
    }
    Err(eyre::eyre!("workers {names:?} never registered"))
}

/// Memory stand-in that stores nothing and cannot build context.
pub struct BrokenMemory {
    name: WorkerName,
}

impl BrokenMemory {
    /// Creates the stand-in under the name `memory`.
    pub fn new() -> Result<Self, eyre::Report> {
        Ok(Self {
            name: worker_name("memory")?,
        })
    }
}

#[async_trait]
impl Worker for BrokenMemory {
    fn name(&self) -> &WorkerName {
        &self.name
    }

    async fn handle(&self, envelope: Envelope, _ctx: &WorkerContext) -> WorkerResult<Reply> {
        match envelope.kind {
            EnvelopeKind::Command => Ok(Reply::Response(json!({"status": "Message added"}))),
            EnvelopeKind::Custom(_) => Err(WorkerError::failed("memory store unavailable")),
            _ => Ok(Reply::Unhandled),
        }
    }
}

/// Default memory worker used by the happy-path scenarios.
#[must_use]
pub fn memory_worker() -> MemoryWorker {
    MemoryWorker::new()
}
