//! Incremental decoding of streamed chat responses
//!
//! Network reads arrive at arbitrary boundaries: one read may end in the
//! middle of a JSON object (or a multi-byte character) and the next may carry
//! several objects at once. [`LineBuffer`] splits on raw `\n` bytes and keeps
//! the incomplete tail until a later read completes it, so the decoded event
//! sequence does not depend on how the transport chunked the body.

use serde::Deserialize;
use tracing::{debug, warn};

/// One decoded unit of a response stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Next text fragment
    Fragment(String),
    /// Error object reported inside the stream
    Error(String),
    /// Logical end of the stream
    Done,
}

/// Splits a byte stream into complete lines, carrying the remainder across reads
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a read and return every line it completed
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            lines.push(Self::decode_line(&self.pending[start..end]));
            start = end + 1;
        }
        self.pending.drain(..start);
        lines
    }

    /// Take the carried remainder at end of stream, if any
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = Self::decode_line(&self.pending);
        self.pending.clear();
        Some(line)
    }

    fn decode_line(bytes: &[u8]) -> String {
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// Interprets one complete, non-blank line of a particular framing
pub trait FrameFormat: Send {
    fn decode_line(&mut self, line: &str) -> Vec<StreamEvent>;
}

#[derive(Debug, Deserialize)]
struct NdjsonFrame {
    #[serde(default)]
    message: Option<NdjsonMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NdjsonMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Newline-delimited JSON as streamed by `/api/chat`
#[derive(Debug, Default)]
pub struct NdjsonFormat;

impl FrameFormat for NdjsonFormat {
    fn decode_line(&mut self, line: &str) -> Vec<StreamEvent> {
        let frame = match serde_json::from_str::<NdjsonFrame>(line) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("Dropping unparseable NDJSON line '{}': {}", line, e);
                return Vec::new();
            }
        };
        debug!("Received stream event '{}'", line);

        if let Some(error) = frame.error {
            return vec![StreamEvent::Error(error)];
        }

        let mut events = Vec::new();
        if let Some(content) = frame.message.and_then(|m| m.content) {
            if !content.is_empty() {
                events.push(StreamEvent::Fragment(content));
            }
        }
        if frame.done {
            events.push(StreamEvent::Done);
        }
        events
    }
}

#[derive(Debug, Deserialize)]
struct SseChunk {
    #[serde(default)]
    choices: Vec<SseChoice>,
}

#[derive(Debug, Deserialize)]
struct SseChoice {
    #[serde(default)]
    delta: Option<SseDelta>,
}

#[derive(Debug, Deserialize)]
struct SseDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Server-Sent-Events framing as used by `/v1/chat/completions`
#[derive(Debug, Default)]
pub struct SseFormat;

impl FrameFormat for SseFormat {
    fn decode_line(&mut self, line: &str) -> Vec<StreamEvent> {
        let Some(data) = line.strip_prefix("data:") else {
            return Vec::new();
        };
        let data = data.strip_prefix(' ').unwrap_or(data);

        if data.trim() == "[DONE]" {
            return vec![StreamEvent::Done];
        }

        match serde_json::from_str::<SseChunk>(data) {
            Ok(chunk) => {
                debug!("Received stream event: '{}'", data);
                chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta)
                    .and_then(|delta| delta.content)
                    .filter(|content| !content.is_empty())
                    .map(StreamEvent::Fragment)
                    .into_iter()
                    .collect()
            }
            Err(e) => {
                warn!("Failed to parse stream event '{}': {}", data, e);
                Vec::new()
            }
        }
    }
}

/// Line splitting plus a frame format plus end-of-stream tracking
pub struct StreamDecoder<F: FrameFormat> {
    lines: LineBuffer,
    format: F,
    finished: bool,
}

impl StreamDecoder<NdjsonFormat> {
    pub fn ndjson() -> Self {
        Self::new(NdjsonFormat)
    }
}

impl StreamDecoder<SseFormat> {
    pub fn sse() -> Self {
        Self::new(SseFormat)
    }
}

impl<F: FrameFormat> StreamDecoder<F> {
    pub fn new(format: F) -> Self {
        Self {
            lines: LineBuffer::new(),
            format,
            finished: false,
        }
    }

    /// True once a termination marker or stream error has been seen
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed one network read
    pub fn push(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }
        for line in self.lines.push(bytes) {
            self.accept(&line, &mut events);
        }
        events
    }

    /// Flush the carried remainder once the transport has ended
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if let Some(line) = self.lines.finish() {
            self.accept(&line, &mut events);
        }
        events
    }

    fn accept(&mut self, line: &str, events: &mut Vec<StreamEvent>) {
        if self.finished || line.trim().is_empty() {
            return;
        }
        for event in self.format.decode_line(line) {
            if self.finished {
                break;
            }
            if matches!(event, StreamEvent::Done | StreamEvent::Error(_)) {
                self.finished = true;
            }
            events.push(event);
        }
    }
}
