//! Newline-delimited JSON bridge between an endpoint and a byte stream.

use super::{Endpoint, EnvelopeReceiver, EnvelopeSender, TransportError};
use crate::envelope::{ChainId, Envelope, WorkerName};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Pumps envelopes between `endpoint` and `stream`.
///
/// Each envelope received on the endpoint is written as one JSON line; each
/// line read from the stream is decoded and sent on the endpoint. A line
/// that is not valid UTF-8 or not a valid envelope is answered on the stream
/// with an `error` envelope stamped with `name`, carrying the line's
/// `requestId` when one can be recovered; the bridge keeps reading. The
/// returned task finishes when either side closes and reports the first I/O
/// failure.
pub fn spawn_json_lines<S>(
    stream: S,
    endpoint: Endpoint,
    name: WorkerName,
) -> JoinHandle<Result<(), TransportError>>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, writer) = tokio::io::split(stream);
    let (sender, receiver) = endpoint.split();
    let (rejections, rejected) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        tokio::select! {
            result = read_lines(reader, sender, rejections, name) => result,
            result = write_lines(writer, receiver, rejected) => result,
        }
    })
}

/// Outcome of decoding one raw line.
enum Line {
    Blank,
    Envelope(Envelope),
    Malformed {
        error: String,
        request_id: Option<ChainId>,
    },
}

fn decode_line(bytes: &[u8]) -> Line {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text.trim(),
        Err(err) => {
            return Line::Malformed {
                error: format!("line is not valid UTF-8: {err}"),
                request_id: None,
            };
        }
    };
    if text.is_empty() {
        return Line::Blank;
    }
    match Envelope::from_json(text) {
        Ok(envelope) => Line::Envelope(envelope),
        Err(err) => Line::Malformed {
            error: err.to_string(),
            request_id: recover_request_id(text),
        },
    }
}

/// Best-effort `requestId` of a line that failed envelope decoding.
fn recover_request_id(text: &str) -> Option<ChainId> {
    let raw: Value = serde_json::from_str(text).ok()?;
    let id = raw.get("requestId")?.as_str()?;
    ChainId::parse(id).ok()
}

async fn read_lines<R>(
    reader: R,
    sender: EnvelopeSender,
    rejections: mpsc::UnboundedSender<Envelope>,
    name: WorkerName,
) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer).await? == 0 {
            break;
        }
        match decode_line(&buffer) {
            Line::Blank => {}
            Line::Envelope(envelope) => {
                if sender.send(envelope).is_err() {
                    debug!("endpoint closed, stopping stream reader");
                    return Ok(());
                }
            }
            Line::Malformed { error, request_id } => {
                warn!(%error, request_id = ?request_id, "rejecting malformed envelope line");
                let rejection = Envelope::failure(
                    name.clone(),
                    format!("Invalid message structure received: {error}"),
                    request_id,
                );
                rejections.send(rejection).ok();
            }
        }
    }
    debug!("stream reached end of input");
    Ok(())
}

async fn write_lines<W>(
    mut writer: W,
    mut receiver: EnvelopeReceiver,
    mut rejected: mpsc::UnboundedReceiver<Envelope>,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let envelope = tokio::select! {
            inbound = receiver.recv() => match inbound {
                Some(envelope) => envelope,
                None => break,
            },
            Some(rejection) = rejected.recv() => rejection,
        };
        write_envelope(&mut writer, &envelope).await?;
    }
    writer.shutdown().await?;
    Ok(())
}

async fn write_envelope<W>(writer: &mut W, envelope: &Envelope) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let mut bytes =
        serde_json::to_vec(envelope).map_err(|err| TransportError::Codec(err.to_string()))?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}
