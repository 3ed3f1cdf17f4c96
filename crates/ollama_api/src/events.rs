use serde::{Deserialize, Serialize};

/// Throughput metrics attached to a terminal `done` record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChatMetrics {
    /// Number of generated tokens.
    #[serde(default)]
    pub eval_count: u64,
    /// Generation wall time in seconds.
    #[serde(default)]
    pub eval_duration: f64,
    /// Total request wall time in seconds.
    #[serde(default)]
    pub total_duration: f64,
}

impl ChatMetrics {
    /// Durations at or below this many seconds produce no rate.
    pub const MIN_RATE_DURATION_SECS: f64 = 0.1;

    /// Tokens-per-second, when the sample is large enough to mean anything.
    ///
    /// Single-token completions and near-instant durations report `None`
    /// rather than a spurious instantaneous rate.
    #[must_use]
    pub fn tokens_per_second(&self) -> Option<f64> {
        if self.eval_count > 1 && self.eval_duration > Self::MIN_RATE_DURATION_SECS {
            Some(self.eval_count as f64 / self.eval_duration)
        } else {
            None
        }
    }

    /// Display form of the rate; `"—"` when the rate is undefined.
    #[must_use]
    pub fn rate_label(&self) -> String {
        match self.tokens_per_second() {
            Some(rate) => format!("{rate:.1} tok/s"),
            None => "—".to_string(),
        }
    }
}

/// Stream event emitted by the interpreter after classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatStreamEvent {
    ReasoningDelta { text: String },
    ContentDelta { text: String },
    Done { metrics: Option<ChatMetrics> },
    Error { message: String },
}

/// One decoded wire record.
///
/// Field presence governs classification; the fields are not mutually
/// exclusive within a single record.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatRecord {
    thinking: Option<String>,
    content: Option<String>,
    error: Option<String>,
    #[serde(default)]
    done: bool,
    metrics: Option<ChatMetrics>,
}

/// Decode one raw payload string into its stream events.
///
/// A record may carry a reasoning delta and a content delta at once; both
/// are emitted, reasoning first, ahead of any later record. A `done` flag
/// follows the deltas of its own record and signals logical completion only;
/// it does not terminate the transport read. A present `error` field
/// supersedes everything else in the record.
pub fn interpret_payload(payload: &str) -> Result<Vec<ChatStreamEvent>, serde_json::Error> {
    let record: ChatRecord = serde_json::from_str(payload)?;
    Ok(interpret_record(record))
}

pub(crate) fn interpret_record(record: ChatRecord) -> Vec<ChatStreamEvent> {
    if let Some(message) = record.error {
        return vec![ChatStreamEvent::Error { message }];
    }

    let mut events = Vec::new();
    if let Some(text) = record.thinking {
        if !text.is_empty() {
            events.push(ChatStreamEvent::ReasoningDelta { text });
        }
    }
    if let Some(text) = record.content {
        if !text.is_empty() {
            events.push(ChatStreamEvent::ContentDelta { text });
        }
    }
    if record.done {
        events.push(ChatStreamEvent::Done {
            metrics: record.metrics,
        });
    }

    events
}
