//! Shared SSE streaming infrastructure for the provider adapters.
//!
//! Both adapters follow the same pattern: receive a `reqwest::Response`,
//! buffer chunks, split on blank lines, extract `data:` payloads, and feed
//! each payload to a provider-specific parser that returns
//! `Vec<Result<Chunk>>`.
//!
//! The stream produced here does not synthesize a final [`Chunk::End`]; the
//! key-rotation executor owns that guarantee.

use crate::util::from_reqwest;
use bt_domain::error::Result;
use bt_domain::stream::{BoxStream, Chunk};
use futures_core::Stream;
use futures_util::StreamExt;

/// Extract complete `data:` payloads from an SSE buffer.
///
/// Events are delimited by a blank line. `\r\n` line endings are normalized
/// first so both conventions split the same way. Only `data:` lines are
/// returned; `event:`, `id:` and `retry:` are ignored.
///
/// The buffer is drained in place: consumed bytes are removed and any
/// trailing partial event remains for the next call.
pub(crate) fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    if buffer.contains('\r') {
        *buffer = buffer.replace("\r\n", "\n");
    }

    let mut data_lines = Vec::new();

    while let Some(pos) = buffer.find("\n\n") {
        let block: String = buffer.drain(..pos).collect();
        buffer.drain(..2);

        for line in block.lines() {
            let line = line.trim();
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() {
                    data_lines.push(data.to_string());
                }
            }
        }
    }

    data_lines
}

/// Append `bytes` to `buffer` as text. An incomplete UTF-8 sequence at the
/// end is held in `pending` until the rest of it arrives; invalid bytes
/// become U+FFFD.
pub(crate) fn push_utf8(buffer: &mut String, pending: &mut Vec<u8>, bytes: &[u8]) {
    pending.extend_from_slice(bytes);
    loop {
        match std::str::from_utf8(pending) {
            Ok(text) => {
                buffer.push_str(text);
                pending.clear();
                return;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                buffer.push_str(&String::from_utf8_lossy(&pending[..valid]));
                match e.error_len() {
                    None => {
                        pending.drain(..valid);
                        return;
                    }
                    Some(bad) => {
                        buffer.push(char::REPLACEMENT_CHARACTER);
                        pending.drain(..valid + bad);
                    }
                }
            }
        }
    }
}

/// Build a [`BoxStream`] from an SSE `reqwest::Response` and a
/// provider-specific parser closure.
///
/// The closure receives each `data:` payload and returns zero or more
/// chunks. Items are yielded in transport order; the remaining buffer is
/// flushed when the body closes. A transport error ends the stream.
pub(crate) fn sse_response_stream<F>(
    response: reqwest::Response,
    parse_data: F,
) -> BoxStream<'static, Result<Chunk>>
where
    F: FnMut(&str) -> Vec<Result<Chunk>> + Send + 'static,
{
    sse_body_stream(response.bytes_stream(), parse_data)
}

fn sse_body_stream<S, B, F>(body: S, mut parse_data: F) -> BoxStream<'static, Result<Chunk>>
where
    S: Stream<Item = reqwest::Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    F: FnMut(&str) -> Vec<Result<Chunk>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut body = Box::pin(body);
        let mut buffer = String::new();
        let mut pending: Vec<u8> = Vec::new();

        loop {
            match body.next().await {
                Some(Ok(bytes)) => {
                    push_utf8(&mut buffer, &mut pending, bytes.as_ref());
                    for data in drain_data_lines(&mut buffer) {
                        for item in parse_data(&data) {
                            yield item;
                        }
                    }
                }
                None => {
                    if !pending.is_empty() {
                        buffer.push_str(&String::from_utf8_lossy(&pending));
                        pending.clear();
                    }
                    if !buffer.trim().is_empty() {
                        buffer.push_str("\n\n");
                        for data in drain_data_lines(&mut buffer) {
                            for item in parse_data(&data) {
                                yield item;
                            }
                        }
                    }
                    break;
                }
                Some(Err(e)) => {
                    yield Err(from_reqwest(e));
                    break;
                }
            }
        }
    };

    Box::pin(stream)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
