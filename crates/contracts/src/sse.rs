//! Server-sent events decoding
//!
//! Incremental decoder used both for the hub feed and by viewers reading the
//! bridge.

use bytes::{Buf, BytesMut};

/// One dispatched SSE block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// `event:` field
    pub event: Option<String>,
    /// `id:` field
    pub id: Option<String>,
    /// Joined `data:` lines
    pub data: Option<String>,
    /// `retry:` field in milliseconds
    pub retry: Option<u64>,
}

impl SseEvent {
    fn is_empty(&self) -> bool {
        self.event.is_none() && self.id.is_none() && self.data.is_none() && self.retry.is_none()
    }
}

/// Incremental SSE decoder
///
/// Feed arbitrary chunks; complete blocks come out in order. Comment lines
/// (starting with `:`) and unknown fields are ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: BytesMut,
    pending: SseEvent,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a chunk, returning every block completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();

        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let mut line = self.buf.split_to(pos + 1);
            line.truncate(pos);
            if line.last() == Some(&b'\r') {
                line.truncate(pos - 1);
            }
            if let Some(event) = self.process_line(&line) {
                out.push(event);
            }
        }

        out
    }

    /// Bytes buffered without a terminating newline
    pub fn buffered(&self) -> usize {
        self.buf.remaining()
    }

    fn process_line(&mut self, line: &[u8]) -> Option<SseEvent> {
        if line.is_empty() {
            let event = std::mem::take(&mut self.pending);
            return (!event.is_empty()).then_some(event);
        }
        if line[0] == b':' {
            return None;
        }

        let line = String::from_utf8_lossy(line);
        let (field, value) = match line.find(':') {
            Some(idx) => {
                let value = &line[idx + 1..];
                (&line[..idx], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line.as_ref(), ""),
        };

        match field {
            "data" => match self.pending.data.as_mut() {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.pending.data = Some(value.to_string()),
            },
            "event" => self.pending.event = Some(value.to_string()),
            "id" => self.pending.id = Some(value.to_string()),
            "retry" => {
                if let Ok(ms) = value.trim().parse() {
                    self.pending.retry = Some(ms);
                }
            }
            _ => {}
        }
        None
    }
}
