use std::sync::{Arc, Mutex, MutexGuard};

use chat_store::{DraftCache, HistoryStore, Role, Turn};
use ollama_api::{
    CancellationSignal, ChatApiError, ChatMessage, ChatRequest, ChatStreamEvent, StreamCompletion,
};
use tokio::task::JoinHandle;

use crate::observer::SessionListener;
use crate::session::{Session, SessionState, TerminalOutcome};
use crate::transport::ChatTransport;

/// Result of a submit call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A generation was started for the submitted text.
    Accepted,
    /// Empty or whitespace-only input; nothing changed.
    RejectedEmpty,
    /// Lost a race with a concurrent submit for the freed slot.
    RejectedBusy,
}

/// Orchestrates one conversation: accepts user turns, drives the transport
/// stream into the session accumulator, fans events out to the listener,
/// and commits terminal outcomes to history.
///
/// Submit policy: a submit while a generation is active preempts it. The
/// active generation is forced through its cancelled terminal, including
/// the partial-commit policy, before the new one starts.
pub struct SessionController {
    inner: Arc<ControllerInner>,
    active: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

struct ControllerInner {
    session: Mutex<Session>,
    history: Mutex<HistoryStore>,
    draft: Mutex<DraftCache>,
    transport: Arc<dyn ChatTransport>,
    listener: Arc<dyn SessionListener>,
}

impl SessionController {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        history: HistoryStore,
        draft: DraftCache,
        listener: Arc<dyn SessionListener>,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                session: Mutex::new(Session::new()),
                history: Mutex::new(history),
                draft: Mutex::new(draft),
                transport,
                listener,
            }),
            active: tokio::sync::Mutex::new(None),
        }
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        lock_unpoisoned(&self.inner.session).state()
    }

    /// True while a generation is sending or streaming.
    #[must_use]
    pub fn is_generating(&self) -> bool {
        lock_unpoisoned(&self.inner.session).is_generating()
    }

    /// Committed turns, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<Turn> {
        lock_unpoisoned(&self.inner.history).turns().to_vec()
    }

    /// Removes all committed turns.
    pub fn clear_history(&self) {
        lock_unpoisoned(&self.inner.history).clear();
    }

    /// Restores a previously cached input draft.
    #[must_use]
    pub fn load_draft(&self) -> Option<String> {
        lock_unpoisoned(&self.inner.draft).load()
    }

    /// Caches the in-progress input draft (debounced).
    pub fn save_draft(&self, text: &str) {
        lock_unpoisoned(&self.inner.draft).save(text);
    }

    /// Flushes any held draft write. Call before shutdown.
    pub fn flush_draft(&self) {
        lock_unpoisoned(&self.inner.draft).flush();
    }

    /// Accepts a user turn and starts a generation for it.
    ///
    /// Empty or whitespace-only input is rejected as a no-op. An active
    /// generation is preempted first. On acceptance the user turn is
    /// committed optimistically, independent of the generation outcome, and
    /// the draft cache is cleared.
    pub async fn submit(&self, user_text: &str) -> SubmitOutcome {
        let text = user_text.trim();
        if text.is_empty() {
            return SubmitOutcome::RejectedEmpty;
        }

        self.preempt_active().await;

        let cancel = {
            let mut session = lock_unpoisoned(&self.inner.session);
            match session.begin() {
                Ok(cancel) => cancel,
                Err(_busy) => return SubmitOutcome::RejectedBusy,
            }
        };

        let request = {
            let mut history = lock_unpoisoned(&self.inner.history);
            let context = wire_history(history.turns());
            history.append(Turn::user(text));
            ChatRequest::new(text).with_history(context)
        };
        lock_unpoisoned(&self.inner.draft).clear();
        self.inner.listener.on_state_change(SessionState::Sending);

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            inner.run_generation(request, cancel).await;
        });
        *self.active.lock().await = Some(handle);

        SubmitOutcome::Accepted
    }

    /// Requests cancellation of the active generation, if any.
    ///
    /// Cooperative and immediate at the transport layer; whatever was
    /// accumulated before the abort is observed stays subject to the
    /// partial-commit policy.
    pub fn cancel(&self) -> bool {
        lock_unpoisoned(&self.inner.session).cancel()
    }

    /// Waits for the active generation, if any, to reach its terminal fold.
    pub async fn wait(&self) {
        let mut active = self.active.lock().await;
        if let Some(handle) = active.as_mut() {
            if let Err(error) = handle.await {
                tracing::warn!(%error, "generation task aborted abnormally");
            }
        }
        *active = None;
    }

    async fn preempt_active(&self) {
        self.cancel();
        self.wait().await;
    }
}

impl ControllerInner {
    async fn run_generation(self: Arc<Self>, request: ChatRequest, cancel: CancellationSignal) {
        let inner = Arc::clone(&self);
        let mut on_event = move |event: ChatStreamEvent| {
            let became_streaming = {
                let mut session = lock_unpoisoned(&inner.session);
                let became_streaming = session.mark_streaming();
                session.apply(&event);
                became_streaming
            };

            if became_streaming {
                inner.listener.on_state_change(SessionState::Streaming);
            }
            match &event {
                ChatStreamEvent::ReasoningDelta { text } => {
                    inner.listener.on_reasoning_delta(text);
                }
                ChatStreamEvent::ContentDelta { text } => {
                    inner.listener.on_content_delta(text);
                }
                ChatStreamEvent::Done { metrics } => {
                    inner.listener.on_done(metrics.as_ref());
                }
                ChatStreamEvent::Error { .. } => {}
            }
        };

        let outcome = self
            .transport
            .stream_chat(request, cancel, &mut on_event)
            .await;
        self.settle(outcome);
    }

    /// Exactly one terminal fold per generation.
    fn settle(&self, outcome: Result<StreamCompletion, ChatApiError>) {
        match outcome {
            Ok(completion) => {
                let result = lock_unpoisoned(&self.session).settle(TerminalOutcome::Completed);
                if result.content_text.is_empty() {
                    // An empty completed bubble is retracted, not committed.
                    tracing::debug!(done = completion.done, "generation ended with no content");
                } else {
                    lock_unpoisoned(&self.history).append(Turn::assistant(result.content_text));
                }
                self.listener.on_state_change(SessionState::Idle);
            }
            Err(error) if error.is_cancelled() => {
                let result = lock_unpoisoned(&self.session).settle(TerminalOutcome::Cancelled);
                if !result.content_text.is_empty() {
                    lock_unpoisoned(&self.history)
                        .append(Turn::assistant_interrupted(result.content_text));
                }
                self.listener.on_state_change(SessionState::Cancelled);
                lock_unpoisoned(&self.session).reset();
                self.listener.on_state_change(SessionState::Idle);
            }
            Err(error) => {
                let _ = lock_unpoisoned(&self.session).settle(TerminalOutcome::Errored);
                self.listener.on_state_change(SessionState::Errored);
                self.listener.on_error(&error.to_string());
                lock_unpoisoned(&self.session).reset();
                self.listener.on_state_change(SessionState::Idle);
            }
        }
    }
}

fn wire_history(turns: &[Turn]) -> Vec<ChatMessage> {
    turns
        .iter()
        .map(|turn| match turn.role {
            Role::User => ChatMessage::user(turn.content.clone()),
            Role::Assistant => ChatMessage::assistant(turn.content.clone()),
        })
        .collect()
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
