//! Then steps for question-answering BDD scenarios.

use super::world::{QnaWorld, receive, run_async};
use courier::envelope::{ChatTurn, EnvelopeKind};
use rstest_bdd_macros::then;
use std::time::Duration;

const REPLY_WAIT: Duration = Duration::from_secs(5);
const QUIET_WAIT: Duration = Duration::from_millis(150);

#[then(r#"the caller receives the answer "{answer}" for request "{request_id}""#)]
fn caller_receives_answer(
    world: &mut QnaWorld,
    answer: String,
    request_id: String,
) -> Result<(), eyre::Report> {
    let reply = receive(&mut world.running()?.caller, REPLY_WAIT)
        .ok_or_else(|| eyre::eyre!("caller received no reply"))?;
    if reply.kind != EnvelopeKind::AgentMessage || reply.error.is_some() {
        return Err(eyre::eyre!("expected an answer, got {reply:?}"));
    }
    let received_id = reply.request_id.as_ref().map(ToString::to_string);
    if received_id.as_deref() != Some(request_id.as_str()) {
        return Err(eyre::eyre!("expected request id {request_id}, got {received_id:?}"));
    }
    let turn = ChatTurn::from_envelope(&reply)
        .map_err(|err| eyre::eyre!("answer is not a chat turn: {err}"))?;
    if turn != ChatTurn::assistant(answer.as_str()) {
        return Err(eyre::eyre!("expected assistant answer '{answer}', got {turn:?}"));
    }
    Ok(())
}

#[then(r#"the caller receives the error "{message}" for request "{request_id}""#)]
fn caller_receives_error(
    world: &mut QnaWorld,
    message: String,
    request_id: String,
) -> Result<(), eyre::Report> {
    let reply = receive(&mut world.running()?.caller, REPLY_WAIT)
        .ok_or_else(|| eyre::eyre!("caller received no reply"))?;
    if reply.error.as_deref() != Some(message.as_str()) {
        return Err(eyre::eyre!("expected error '{message}', got {reply:?}"));
    }
    let received_id = reply.request_id.as_ref().map(ToString::to_string);
    if received_id.as_deref() != Some(request_id.as_str()) {
        return Err(eyre::eyre!("expected request id {request_id}, got {received_id:?}"));
    }
    Ok(())
}

#[then("the caller receives nothing else")]
fn caller_receives_nothing_else(world: &mut QnaWorld) -> Result<(), eyre::Report> {
    match receive(&mut world.running()?.caller, QUIET_WAIT) {
        Some(extra) => Err(eyre::eyre!("unexpected extra envelope {extra:?}")),
        None => Ok(()),
    }
}

#[then("the generator received {count:usize} prompts")]
fn generator_received(world: &mut QnaWorld, count: usize) -> Result<(), eyre::Report> {
    let prompts = world.generator.prompts();
    if prompts.len() != count {
        return Err(eyre::eyre!("expected {count} prompts, found {}", prompts.len()));
    }
    Ok(())
}

#[then(r#"the probe receives the error "{message}" for request "{request_id}""#)]
fn probe_receives_error(
    world: &mut QnaWorld,
    message: String,
    request_id: String,
) -> Result<(), eyre::Report> {
    let probe = world
        .probe
        .as_mut()
        .ok_or_else(|| eyre::eyre!("no probe registered"))?;
    let reply = receive(probe, REPLY_WAIT).ok_or_else(|| eyre::eyre!("probe received no reply"))?;
    if reply.kind != EnvelopeKind::Error || reply.error_message().as_deref() != Some(message.as_str()) {
        return Err(eyre::eyre!("expected error '{message}', got {reply:?}"));
    }
    let received_id = reply.request_id.as_ref().map(ToString::to_string);
    if received_id.as_deref() != Some(request_id.as_str()) {
        return Err(eyre::eyre!("expected request id {request_id}, got {received_id:?}"));
    }
    Ok(())
}

#[then("no forwards are pending")]
fn no_forwards_pending(world: &mut QnaWorld) -> Result<(), eyre::Report> {
    let snapshot = run_async(world.running()?.handle.snapshot())
        .map_err(|err| eyre::eyre!("snapshot failed: {err}"))?;
    if !snapshot.pending_forwards.is_empty() {
        return Err(eyre::eyre!("pending forwards remain: {:?}", snapshot.pending_forwards));
    }
    Ok(())
}
