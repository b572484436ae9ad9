//! Newline framing for ndjson byte streams.
//!
//! Chunks arrive with arbitrary boundaries: one read may carry several
//! records or half of one. The framer keeps the unterminated tail as raw
//! bytes until the next chunk completes it, so a record (or a multi-byte
//! UTF-8 sequence) split across reads is reassembled before decoding.

/// Splits a chunked byte stream into complete, non-blank lines.
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every line it completed, in order.
    ///
    /// Blank lines are dropped; a trailing `\r` is stripped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + pos;
            if let Some(line) = decode_line(&self.pending[start..end]) {
                lines.push(line);
            }
            start = end + 1;
        }
        self.pending.drain(..start);
        lines
    }

    /// Take whatever unterminated fragment is left at end-of-stream.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        decode_line(&rest)
    }

    /// Bytes held back waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode_line(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.strip_suffix('\r').unwrap_or(&text);
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
