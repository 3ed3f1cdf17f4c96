use crate::events::{interpret_payload, ChatStreamEvent};

/// Envelope prefix for payload-bearing lines.
pub const DATA_PREFIX: &str = "data:";

/// Incremental decoder for line-delimited chat streams.
///
/// Chunks arrive with arbitrary boundaries; a trailing partial line is
/// buffered and re-joined with the next chunk before splitting. Blank lines
/// and lines without the envelope prefix are protocol framing and dropped.
#[derive(Debug, Default)]
pub struct ChatStreamDecoder {
    buffer: String,
}

impl ChatStreamDecoder {
    /// Feed arbitrary bytes into the decoder and drain complete events.
    ///
    /// A payload that fails structured decoding yields no event and is
    /// logged; one corrupt record does not abort the stream.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<ChatStreamEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));
        let mut events = Vec::new();

        while let Some(split) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(0..=split).collect();
            let Some(payload) = extract_data_payload(&line) else {
                continue;
            };

            match interpret_payload(&payload) {
                Ok(decoded) => events.extend(decoded),
                Err(error) => {
                    tracing::warn!(%error, "skipping undecodable stream record");
                }
            }
        }

        events
    }

    /// Decode a complete stream body in one shot.
    pub fn parse_lines(input: &str) -> Vec<ChatStreamEvent> {
        let mut decoder = Self::default();
        decoder.feed(input.as_bytes())
    }

    /// True when no partial line remains buffered.
    #[must_use]
    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.trim().is_empty()
    }

    /// Consume the decoder at stream end.
    ///
    /// A truncated trailing line is never emitted as an event; it is
    /// reported at debug level and discarded.
    pub fn finish(self) {
        if !self.is_empty_buffer() {
            tracing::debug!(partial = %self.buffer.trim(), "discarding truncated trailing line");
        }
    }
}

fn extract_data_payload(line: &str) -> Option<String> {
    let payload = line.trim_end().strip_prefix(DATA_PREFIX)?.trim();
    if payload.is_empty() {
        None
    } else {
        Some(payload.to_string())
    }
}
