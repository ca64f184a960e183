//! Runs a router with the built-in workers and chats over stdin/stdout.
//!
//! Usage:
//!
//! ```text
//! courier [settings-path]
//! ```
//!
//! Each input line is sent to the router as a user message; every envelope
//! the router returns to the caller is written to stdout as one line.
//! `/config <worker> get [key]` and `/config <worker> set <key> <value>`
//! lines inspect and change worker configuration.

use camino::Utf8PathBuf;
use courier::correlation::CorrelationSettings;
use courier::directory::WorkerDirectory;
use courier::directory::adapters::postgres::PostgresWorkerDirectory;
use courier::envelope::{ChainId, ChatTurn, Envelope, EnvelopeError, EnvelopeKind, WorkerName};
use courier::orchestrator::QnaOrchestrator;
use courier::router::{DeliveryPolicy, Router, RouterError, RouterHandle};
use courier::settings::{CourierSettings, SettingsError};
use courier::telemetry::{TelemetryError, init_tracing};
use courier::transport::Endpoint;
use courier::worker::{Worker, WorkerRuntime};
use courier::workers::{
    CacheWorker, ContextWorker, EchoWorker, GenerationWorker, MemoryWorker, ScriptedGenerator,
};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use serde_json::Value;
use std::env;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::runtime::Builder;
use tracing::{info, warn};

/// Sender name stamped on typed lines.
const CALLER_NAME: &str = "caller";

/// Root segment prefix of request ids minted for typed lines.
const CALLER_PREFIX: &str = "user";

#[derive(Debug, Error)]
enum CourierError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("runtime init failed: {0}")]
    RuntimeInit(#[source] std::io::Error),
    #[error("database pool init failed: {0}")]
    Database(String),
    #[error(transparent)]
    Router(#[from] RouterError),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error("terminal i/o failed: {0}")]
    Terminal(#[from] std::io::Error),
}

fn main() -> Result<(), CourierError> {
    let settings = match parse_args(env::args())? {
        Some(path) => CourierSettings::load(&path)?,
        None => CourierSettings::default(),
    };
    init_tracing(&settings.log_filter)?;

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CourierError::RuntimeInit)?;
    runtime.block_on(run(settings))
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Option<Utf8PathBuf>, CourierError> {
    let _program = args.next();
    let path = args.next().map(Utf8PathBuf::from);
    if let Some(extra) = args.next() {
        return Err(CourierError::InvalidArgs(format!(
            "unexpected extra argument: {extra}"
        )));
    }
    Ok(path)
}

async fn run(settings: CourierSettings) -> Result<(), CourierError> {
    let directory = open_directory(&settings)?;
    let (router, mut caller) = Router::builder(settings.router.clone())
        .directory(directory)
        .spawn()
        .await?;

    start_workers(&router, &settings.router.policy, settings.correlation)?;
    let caller_name = WorkerName::new(CALLER_NAME)?;
    info!("courier ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(text) = line? else { break };
                let content = text.trim();
                if content.is_empty() {
                    continue;
                }
                let envelope = Envelope::new(EnvelopeKind::UserMessage, caller_name.clone())
                    .with_payload(ChatTurn::user(content).to_value())
                    .with_request_id(ChainId::generate(CALLER_PREFIX));
                if caller.send(envelope).is_err() {
                    warn!("router stopped");
                    break;
                }
            }
            inbound = caller.recv() => {
                let Some(envelope) = inbound else { break };
                stdout.write_all(render(&envelope).as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }
    }

    router.shutdown().await.ok();
    Ok(())
}

fn open_directory(settings: &CourierSettings) -> Result<Arc<dyn WorkerDirectory>, CourierError> {
    let Some(url) = settings.database_url.as_deref() else {
        return Ok(Arc::new(settings.seed_directory()?));
    };
    if !settings.workers.is_empty() {
        warn!("worker seeds are ignored when a database is configured");
    }
    let pool = Pool::builder()
        .build(ConnectionManager::<PgConnection>::new(url))
        .map_err(|err| CourierError::Database(err.to_string()))?;
    Ok(Arc::new(PostgresWorkerDirectory::new(pool)))
}

fn start_workers(
    router: &RouterHandle,
    policy: &DeliveryPolicy,
    correlation: CorrelationSettings,
) -> Result<(), CourierError> {
    let generator = Arc::new(ScriptedGenerator::new());
    match policy {
        DeliveryPolicy::Orchestrator { worker } => {
            spawn(router, MemoryWorker::new(), correlation)?;
            spawn(router, GenerationWorker::new(generator), correlation)?;
            spawn(router, QnaOrchestrator::named(worker.clone()), correlation)?;
        }
        DeliveryPolicy::FanOut => {
            spawn(router, EchoWorker::new(), correlation)?;
            spawn(router, GenerationWorker::new(generator), correlation)?;
            spawn(router, CacheWorker::new(), correlation)?;
            spawn(router, ContextWorker::new(), correlation)?;
        }
    }
    Ok(())
}

fn spawn<W: Worker>(
    router: &RouterHandle,
    worker: W,
    correlation: CorrelationSettings,
) -> Result<(), CourierError> {
    let endpoint: Endpoint = router.register(worker.name().clone())?;
    WorkerRuntime::new(worker, endpoint, correlation).spawn();
    Ok(())
}

fn render(envelope: &Envelope) -> String {
    let failed = envelope.error.is_some() || envelope.kind == EnvelopeKind::Error;
    if let Some(message) = envelope.error_message().filter(|_| failed) {
        return format!("[{}] error: {message}", envelope.name);
    }
    match envelope.payload.as_ref() {
        Some(payload) => match ChatTurn::from_payload(payload) {
            Ok(turn) => format!("[{}] {}: {}", envelope.name, turn.role, turn.content),
            Err(_) => format!("[{}] {}", envelope.name, compact(payload)),
        },
        None => format!("[{}] {}", envelope.name, envelope.kind),
    }
}

fn compact(payload: &Value) -> String {
    serde_json::to_string(payload).unwrap_or_else(|_| payload.to_string())
}
