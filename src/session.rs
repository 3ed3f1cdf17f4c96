use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ollama_api::{CancellationSignal, ChatMetrics, ChatStreamEvent};

/// Lifecycle of a single generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sending,
    Streaming,
    Cancelled,
    Errored,
}

impl SessionState {
    /// True while a generation occupies the session.
    #[must_use]
    pub fn is_generating(&self) -> bool {
        matches!(self, Self::Sending | Self::Streaming)
    }
}

/// Terminal outcome of one generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalOutcome {
    Completed,
    Cancelled,
    Errored,
}

/// Accumulated output of the in-flight generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationResult {
    pub reasoning_text: String,
    pub content_text: String,
    pub metrics: Option<ChatMetrics>,
}

/// Error returned when a generation is started while one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionBusy;

impl std::fmt::Display for SessionBusy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("a generation is already active")
    }
}

impl std::error::Error for SessionBusy {}

/// Single-generation session state machine.
///
/// Owns the [`SessionState`], the revocable cancellation handle, and the
/// [`GenerationResult`] accumulator. At most one generation may hold the
/// session at a time; [`Session::begin`] enforces it.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    cancel: Option<CancellationSignal>,
    result: GenerationResult,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            cancel: None,
            result: GenerationResult::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_generating(&self) -> bool {
        self.state.is_generating()
    }

    #[must_use]
    pub fn result(&self) -> &GenerationResult {
        &self.result
    }

    /// `Idle -> Sending`: opens a fresh accumulator and mints the
    /// cancellation handle for the new attempt.
    pub fn begin(&mut self) -> Result<CancellationSignal, SessionBusy> {
        if self.state.is_generating() {
            return Err(SessionBusy);
        }

        let cancel: CancellationSignal = Arc::new(AtomicBool::new(false));
        self.state = SessionState::Sending;
        self.result = GenerationResult::default();
        self.cancel = Some(Arc::clone(&cancel));
        Ok(cancel)
    }

    /// `Sending -> Streaming` on the first arriving event.
    ///
    /// Returns whether the transition happened; already-streaming calls are
    /// no-ops.
    pub fn mark_streaming(&mut self) -> bool {
        if self.state == SessionState::Sending {
            self.state = SessionState::Streaming;
            return true;
        }
        false
    }

    /// Folds one stream event into the accumulator, in arrival order.
    pub fn apply(&mut self, event: &ChatStreamEvent) {
        match event {
            ChatStreamEvent::ReasoningDelta { text } => {
                self.result.reasoning_text.push_str(text);
            }
            ChatStreamEvent::ContentDelta { text } => {
                self.result.content_text.push_str(text);
            }
            ChatStreamEvent::Done { metrics } => {
                if metrics.is_some() {
                    self.result.metrics = *metrics;
                }
            }
            ChatStreamEvent::Error { .. } => {}
        }
    }

    /// Signals the transport to abort the active generation.
    ///
    /// Returns whether a signal was delivered; repeated calls and calls
    /// outside a generation are no-ops.
    pub fn cancel(&self) -> bool {
        match &self.cancel {
            Some(handle) if self.state.is_generating() && !handle.load(Ordering::Acquire) => {
                handle.store(true, Ordering::Release);
                true
            }
            _ => false,
        }
    }

    /// Ends the attempt: invalidates the cancellation handle, takes the
    /// accumulator, and moves to the pass-through terminal state
    /// (`Cancelled`/`Errored`) or straight back to `Idle` on completion.
    pub fn settle(&mut self, outcome: TerminalOutcome) -> GenerationResult {
        self.cancel = None;
        self.state = match outcome {
            TerminalOutcome::Completed => SessionState::Idle,
            TerminalOutcome::Cancelled => SessionState::Cancelled,
            TerminalOutcome::Errored => SessionState::Errored,
        };
        std::mem::take(&mut self.result)
    }

    /// Returns to `Idle` after a pass-through terminal state was observed.
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
    }
}
