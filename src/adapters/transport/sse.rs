//! Incremental server-sent-events decoder.
//!
//! Chunks from the network do not respect line or UTF-8 boundaries, so the
//! decoder buffers raw bytes and only decodes complete lines.
//!
//! ```text
//! data: {"id": 1, "message": "Laundry day"}
//!
//! : keep-alive
//! ```
//!
//! A line longer than the decoder's limit is dropped up to its newline.

use tracing::warn;

/// Longest line kept by [`SseDecoder::new`].
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Accumulates bytes and yields the data payload of each completed event.
#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
    max_line: usize,
    skipping: bool,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            data: Vec::new(),
            max_line,
            skipping: false,
        }
    }

    /// Feed a chunk; returns the payloads of events it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if self.skipping {
                self.skipping = false;
                continue;
            }
            if line.len() > self.max_line + 1 {
                warn!(bytes = line.len(), limit = self.max_line, "Dropping oversized event line");
                continue;
            }
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);

            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                }
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data
                    .push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
            // `event:`, `id:`, `retry:` and `:` comments carry nothing we use.
        }

        if self.buffer.len() > self.max_line {
            warn!(bytes = self.buffer.len(), limit = self.max_line, "Dropping oversized event line");
            self.buffer.clear();
            self.skipping = true;
        }

        events
    }
}
