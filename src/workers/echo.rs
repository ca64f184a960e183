//! Template-driven echo worker.

use crate::envelope::{ChatTurn, Envelope, EnvelopeKind, WorkerName};
use crate::worker::{Reply, Worker, WorkerConfig, WorkerContext, WorkerError, WorkerResult};
use async_trait::async_trait;
use minijinja::{Environment, context};
use serde_json::json;

const DEFAULT_NAME: &str = "echo";
const DEFAULT_TEMPLATE: &str = "Echo, {{ userContent }}, from {{ user }} as {{ role }}";
const DEFAULT_USER: &str = "Echo";
const DEFAULT_ROLE: &str = "assistant";

/// Answers each user message by rendering the `template` config value.
///
/// The template sees `userContent`, `user` and `role`; the reply payload is
/// `{role, user, content}`.
#[derive(Debug, Clone)]
pub struct EchoWorker {
    name: WorkerName,
}

impl EchoWorker {
    /// Creates the worker under its canonical name.
    #[must_use]
    pub fn new() -> Self {
        Self::named(WorkerName::from_static(DEFAULT_NAME))
    }

    /// Creates the worker under `name`.
    #[must_use]
    pub const fn named(name: WorkerName) -> Self {
        Self { name }
    }
}

impl Default for EchoWorker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Worker for EchoWorker {
    fn name(&self) -> &WorkerName {
        &self.name
    }

    fn initial_config(&self) -> WorkerConfig {
        WorkerConfig::new()
            .with("template", DEFAULT_TEMPLATE)
            .with("user", DEFAULT_USER)
            .with("role", DEFAULT_ROLE)
    }

    async fn handle(&self, envelope: Envelope, ctx: &WorkerContext) -> WorkerResult<Reply> {
        if envelope.kind != EnvelopeKind::UserMessage {
            return Ok(Reply::Unhandled);
        }
        let turn = ChatTurn::from_envelope(&envelope)?;
        let config = ctx.config();
        let template = config.get_str("template").unwrap_or(DEFAULT_TEMPLATE);
        let user = config.get_str("user").unwrap_or(DEFAULT_USER);
        let role = config.get_str("role").unwrap_or(DEFAULT_ROLE);

        let content = Environment::new()
            .render_str(
                template,
                context! { userContent => turn.content, user => user, role => role },
            )
            .map_err(|err| WorkerError::InvalidConfig(format!("template: {err}")))?;

        Ok(Reply::Response(json!({
            "role": role,
            "user": user,
            "content": content,
        })))
    }
}
