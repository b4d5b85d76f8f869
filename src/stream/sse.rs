//! Incremental `text/event-stream` decoder
//!
//! Bytes arrive in arbitrary chunks; complete events come out in order. Only
//! the `data` field matters to this client. `event`, `id` and `retry` are
//! parsed so they do not leak into payloads, comments are skipped.

/// One dispatched server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseMessage {
    /// Value of the `event` field, `None` for the default "message" type
    pub event: Option<String>,
    pub data: String,
}

/// Stateful decoder fed with raw response chunks
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes of an incomplete line
    pending: Vec<u8>,
    /// Data lines of the event being assembled
    data: Vec<String>,
    event: Option<String>,
    /// A lone `\r` ended the previous chunk; a leading `\n` belongs to it
    skip_lf: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect every event it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseMessage> {
        let mut out = Vec::new();
        for &byte in chunk {
            if self.skip_lf {
                self.skip_lf = false;
                if byte == b'\n' {
                    continue;
                }
            }
            match byte {
                b'\n' => self.end_line(&mut out),
                b'\r' => {
                    self.end_line(&mut out);
                    self.skip_lf = true;
                }
                _ => self.pending.push(byte),
            }
        }
        out
    }

    fn end_line(&mut self, out: &mut Vec<SseMessage>) {
        let raw = std::mem::take(&mut self.pending);
        // Line breaks are ASCII so a complete line never splits a code point
        let line = String::from_utf8_lossy(&raw);
        if line.is_empty() {
            if let Some(message) = self.dispatch() {
                out.push(message);
            }
            return;
        }
        if line.starts_with(':') {
            return;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (&*line, ""),
        };
        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            // id and retry only matter for reconnection, which this client never does
            _ => {}
        }
    }

    fn dispatch(&mut self) -> Option<SseMessage> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseMessage { event, data })
    }
}
