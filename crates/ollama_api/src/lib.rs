//! Transport-only chat API client primitives.
//!
//! This crate owns request building, line-frame decoding, and stream-event
//! interpretation for the blog chat endpoint only. It intentionally contains
//! no persistence and no presentation coupling.
//!
//! The wire contract is a POST of `{message, messages}` answered by a chunked
//! body of `data: {json}` lines, where each record may carry a reasoning
//! delta, a content delta, a terminal `done` flag with metrics, or a
//! server-side error message.
//!
//! Cancellation is cooperative via a shared [`CancellationSignal`]; a tripped
//! signal resolves pending awaits as [`ChatApiError::Cancelled`].

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod frames;
pub mod payload;
pub mod url;

pub use client::{CancellationSignal, ChatApiClient, StreamCompletion, StreamResult};
pub use config::ChatApiConfig;
pub use error::ChatApiError;
pub use events::{ChatMetrics, ChatStreamEvent};
pub use frames::ChatStreamDecoder;
pub use payload::{ChatMessage, ChatRequest, ChatRole};
pub use url::normalize_chat_url;
