#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chat_store::{DraftCache, HistoryStore, KeyValueStorage, StoreError};
use ollama_api::{
    CancellationSignal, ChatApiError, ChatMetrics, ChatRequest, ChatStreamEvent, StreamCompletion,
};
use ollama_chat::observer::SessionListener;
use ollama_chat::session::SessionState;
use ollama_chat::transport::ChatTransport;

/// One scripted step of a [`ScriptedTransport`] stream.
#[derive(Clone)]
pub enum Step {
    /// Emit one decoded event.
    Emit(ChatStreamEvent),
    /// Park until the cancellation signal trips, then resolve cancelled.
    WaitForCancel,
    /// Fail the stream with a protocol error.
    Fail(String),
}

/// Transport double that replays a fixed script for every request.
pub struct ScriptedTransport {
    steps: Vec<Step>,
    completion: StreamCompletion,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            completion: StreamCompletion::default(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_completion(mut self, completion: StreamCompletion) -> Self {
        self.completion = completion;
        self
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn stream_chat(
        &self,
        request: ChatRequest,
        cancellation: CancellationSignal,
        on_event: &mut (dyn FnMut(ChatStreamEvent) + Send),
    ) -> Result<StreamCompletion, ChatApiError> {
        self.requests.lock().expect("requests lock").push(request);

        for step in &self.steps {
            if cancellation.load(Ordering::Acquire) {
                return Err(ChatApiError::Cancelled);
            }

            match step {
                Step::Emit(event) => on_event(event.clone()),
                Step::WaitForCancel => {
                    while !cancellation.load(Ordering::Acquire) {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    }
                    return Err(ChatApiError::Cancelled);
                }
                Step::Fail(message) => {
                    return Err(ChatApiError::StreamFailed {
                        message: message.clone(),
                    });
                }
            }
        }

        Ok(self.completion)
    }
}

/// Listener that records every notification for later assertions.
#[derive(Default)]
pub struct RecordingListener {
    pub states: Mutex<Vec<SessionState>>,
    pub reasoning: Mutex<String>,
    pub content: Mutex<String>,
    pub metrics: Mutex<Option<ChatMetrics>>,
    pub errors: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn states(&self) -> Vec<SessionState> {
        self.states.lock().expect("states lock").clone()
    }

    pub fn content(&self) -> String {
        self.content.lock().expect("content lock").clone()
    }

    pub fn reasoning(&self) -> String {
        self.reasoning.lock().expect("reasoning lock").clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().expect("errors lock").clone()
    }

    pub fn metrics(&self) -> Option<ChatMetrics> {
        *self.metrics.lock().expect("metrics lock")
    }
}

impl SessionListener for RecordingListener {
    fn on_state_change(&self, state: SessionState) {
        self.states.lock().expect("states lock").push(state);
    }

    fn on_reasoning_delta(&self, text: &str) {
        self.reasoning.lock().expect("reasoning lock").push_str(text);
    }

    fn on_content_delta(&self, text: &str) {
        self.content.lock().expect("content lock").push_str(text);
    }

    fn on_done(&self, metrics: Option<&ChatMetrics>) {
        *self.metrics.lock().expect("metrics lock") = metrics.copied();
    }

    fn on_error(&self, message: &str) {
        self.errors
            .lock()
            .expect("errors lock")
            .push(message.to_string());
    }
}

/// In-memory storage double shared between history and draft in tests.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().expect("storage lock").get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .lock()
            .expect("storage lock")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.lock().expect("storage lock").remove(key);
        Ok(())
    }
}

pub fn history(max_turns: usize) -> HistoryStore {
    HistoryStore::open(Box::new(MemoryStorage::default()), max_turns)
}

pub fn draft() -> DraftCache {
    DraftCache::with_interval(Box::new(MemoryStorage::default()), Duration::ZERO)
}

pub fn thinking(text: &str) -> Step {
    Step::Emit(ChatStreamEvent::ReasoningDelta {
        text: text.to_string(),
    })
}

pub fn delta(text: &str) -> Step {
    Step::Emit(ChatStreamEvent::ContentDelta {
        text: text.to_string(),
    })
}

pub fn done(metrics: Option<ChatMetrics>) -> Step {
    Step::Emit(ChatStreamEvent::Done { metrics })
}

/// Polls `predicate` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < timeout {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    predicate()
}
