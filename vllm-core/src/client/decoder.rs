//! Incremental frame decoding for response bodies
//!
//! Backends answer `/chat/completions` with one or more JSON objects. Ollama
//! writes them back to back (newline-delimited in practice, but nothing
//! requires it), vLLM in streaming mode wraps each one in a server-sent
//! event. Both readers hand out exactly one decoded frame per call.

use super::error::{ClientError, ClientResult};
use eventsource_stream::{EventStream, EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use std::fmt;
use std::pin::Pin;

/// Payload that terminates an SSE chat stream
const SSE_DONE: &str = "[DONE]";

/// Largest single frame a reader buffers before giving up
pub const MAX_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Reads concatenated JSON values from a byte stream, one value at a time
pub struct JsonFrames<S> {
    body: S,
    buf: Vec<u8>,
    scanner: FrameScanner,
    limit: usize,
    exhausted: bool,
}

impl<S, B, E> JsonFrames<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<ClientError>,
{
    pub fn new(body: S) -> Self {
        Self::with_limit(body, MAX_FRAME_SIZE)
    }

    /// Reader that fails with [`ClientError::FrameTooLarge`] once one frame
    /// passes `limit` bytes
    pub fn with_limit(body: S, limit: usize) -> Self {
        Self {
            body,
            buf: Vec::new(),
            scanner: FrameScanner::default(),
            limit,
            exhausted: false,
        }
    }

    /// Decode the next frame.
    ///
    /// Returns `Ok(None)` once the body ends with nothing but whitespace left
    /// over. A truncated trailing frame is a decode error.
    pub async fn next_frame<T: DeserializeOwned>(&mut self) -> ClientResult<Option<T>> {
        loop {
            if let Some(frame) = self.take_buffered()? {
                return Ok(Some(frame));
            }
            if self.exhausted {
                return self.finish();
            }
            match self.body.next().await {
                Some(chunk) => {
                    let chunk = chunk.map_err(Into::into)?;
                    self.buf.extend_from_slice(chunk.as_ref());
                }
                None => self.exhausted = true,
            }
        }
    }

    /// Decode one value from the front of the buffer if it is complete.
    /// Only bytes that arrived since the last call are scanned.
    fn take_buffered<T: DeserializeOwned>(&mut self) -> ClientResult<Option<T>> {
        match self.scanner.scan(&self.buf) {
            Scan::Complete(end) => {
                self.scanner = FrameScanner::default();
                if end > self.limit {
                    return Err(ClientError::FrameTooLarge { limit: self.limit });
                }
                let frame = serde_json::from_slice(&self.buf[..end]);
                self.buf.drain(..end);
                frame.map(Some).map_err(ClientError::Decode)
            }
            Scan::Partial if !self.scanner.in_value() => {
                // only whitespace so far
                self.buf.clear();
                self.scanner = FrameScanner::default();
                Ok(None)
            }
            Scan::Partial => self.check_limit().map(|_| None),
            Scan::Scalar => {
                self.scanner = FrameScanner::default();
                self.take_scalar()
            }
        }
    }

    /// Top-level values other than objects and arrays go straight to serde,
    /// which either decodes them or reports what is wrong
    fn take_scalar<T: DeserializeOwned>(&mut self) -> ClientResult<Option<T>> {
        let (next, consumed) = {
            let mut values = serde_json::Deserializer::from_slice(&self.buf).into_iter::<T>();
            let next = values.next();
            (next, values.byte_offset())
        };

        match next {
            Some(Ok(frame)) => {
                self.buf.drain(..consumed);
                Ok(Some(frame))
            }
            // incomplete value, wait for more bytes
            Some(Err(e)) if e.is_eof() => self.check_limit().map(|_| None),
            Some(Err(e)) => Err(ClientError::Decode(e)),
            None => {
                self.buf.clear();
                Ok(None)
            }
        }
    }

    fn check_limit(&self) -> ClientResult<()> {
        if self.buf.len() > self.limit {
            return Err(ClientError::FrameTooLarge { limit: self.limit });
        }
        Ok(())
    }

    fn finish<T: DeserializeOwned>(&mut self) -> ClientResult<Option<T>> {
        if self.buf.iter().all(u8::is_ascii_whitespace) {
            self.buf.clear();
            return Ok(None);
        }
        // Re-decode the leftover to surface the EOF error for the partial frame
        let leftover = std::mem::take(&mut self.buf);
        serde_json::from_slice::<T>(&leftover)
            .map(Some)
            .map_err(ClientError::Decode)
    }
}

/// Outcome of scanning the front of a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    /// An object or array ends at this offset
    Complete(usize),
    /// More bytes are needed
    Partial,
    /// The buffer starts with something other than an object or array
    Scalar,
}

/// Finds where the top-level JSON object or array at the front of a buffer
/// ends, keeping its position between calls so each byte is looked at once
#[derive(Debug, Default)]
struct FrameScanner {
    pos: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl FrameScanner {
    fn in_value(&self) -> bool {
        self.depth > 0
    }

    fn scan(&mut self, buf: &[u8]) -> Scan {
        while let Some(&byte) = buf.get(self.pos) {
            self.pos += 1;

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            match byte {
                b'"' if self.depth > 0 => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' if self.depth > 0 => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        return Scan::Complete(self.pos);
                    }
                }
                _ if self.depth == 0 && !byte.is_ascii_whitespace() => return Scan::Scalar,
                _ => {}
            }
        }
        Scan::Partial
    }
}

/// Reads JSON frames out of server-sent `data:` events
pub struct EventFrames<S> {
    events: Pin<Box<EventStream<S>>>,
    limit: usize,
    finished: bool,
}

impl<S, B, E> EventFrames<S>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<ClientError> + fmt::Display,
{
    pub fn new(body: S) -> Self {
        Self {
            events: Box::pin(body.eventsource()),
            limit: MAX_FRAME_SIZE,
            finished: false,
        }
    }

    /// Decode the next frame, `Ok(None)` at end of stream or `[DONE]`
    pub async fn next_frame<T: DeserializeOwned>(&mut self) -> ClientResult<Option<T>> {
        while !self.finished {
            let Some(event) = self.events.next().await else {
                self.finished = true;
                break;
            };
            let event = event.map_err(from_event_error)?;

            if event.data.len() > self.limit {
                return Err(ClientError::FrameTooLarge { limit: self.limit });
            }
            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            if data == SSE_DONE {
                self.finished = true;
                break;
            }
            return serde_json::from_str(data)
                .map(Some)
                .map_err(ClientError::Decode);
        }
        Ok(None)
    }
}

fn from_event_error<E>(err: EventStreamError<E>) -> ClientError
where
    E: Into<ClientError> + fmt::Display,
{
    match err {
        EventStreamError::Transport(e) => e.into(),
        other => ClientError::EventStream(other.to_string()),
    }
}

/// Frame reader picked from the response content type
pub enum FrameReader<S> {
    Json(JsonFrames<S>),
    Events(EventFrames<S>),
}

impl<S, B, E> FrameReader<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<ClientError> + fmt::Display,
{
    /// `text/event-stream` bodies are read as SSE, anything else as raw JSON
    pub fn for_content_type(content_type: Option<&str>, body: S) -> Self {
        let is_sse = content_type
            .map(|ct| ct.to_ascii_lowercase().starts_with("text/event-stream"))
            .unwrap_or(false);

        if is_sse {
            FrameReader::Events(EventFrames::new(body))
        } else {
            FrameReader::Json(JsonFrames::new(body))
        }
    }

    pub async fn next_frame<T: DeserializeOwned>(&mut self) -> ClientResult<Option<T>> {
        match self {
            FrameReader::Json(frames) => frames.next_frame().await,
            FrameReader::Events(frames) => frames.next_frame().await,
        }
    }
}
