//! When steps for question-answering BDD scenarios.

use super::world::{QnaWorld, worker_name};
use courier::envelope::{ChainId, ChatTurn, Envelope, EnvelopeKind, ForwardRequest};
use rstest_bdd_macros::when;
use serde_json::json;

fn chain(raw: &str) -> Result<ChainId, eyre::Report> {
    ChainId::parse(raw).map_err(|err| eyre::eyre!("invalid request id '{raw}': {err}"))
}

#[when(r#"the caller asks "{question}" with request id "{request_id}""#)]
fn caller_asks(world: &mut QnaWorld, question: String, request_id: String) -> Result<(), eyre::Report> {
    let message = Envelope::new(EnvelopeKind::UserMessage, worker_name("caller")?)
        .with_payload(ChatTurn::user(question).to_value())
        .with_request_id(chain(&request_id)?);
    world
        .running()?
        .caller
        .send(message)
        .map_err(|err| eyre::eyre!("caller send failed: {err}"))
}

#[when(r#"a probe worker forwards "{kind}" to "{target}" with request id "{request_id}""#)]
fn probe_forwards(
    world: &mut QnaWorld,
    kind: String,
    target: String,
    request_id: String,
) -> Result<(), eyre::Report> {
    let probe_name = worker_name("probe")?;
    let probe = world
        .running()?
        .handle
        .register(probe_name.clone())
        .map_err(|err| eyre::eyre!("register probe: {err}"))?;
    let inner = Envelope::new(EnvelopeKind::custom(kind), probe_name.clone())
        .with_payload(json!({"currentMessage": "hello"}))
        .with_request_id(chain(&request_id)?);
    let forward = ForwardRequest::new(worker_name(&target)?, inner)
        .into_envelope(probe_name)
        .map_err(|err| eyre::eyre!("build forward: {err}"))?;
    probe
        .send(forward)
        .map_err(|err| eyre::eyre!("probe send failed: {err}"))?;
    world.probe = Some(probe);
    Ok(())
}
