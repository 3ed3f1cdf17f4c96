use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};

use crate::config::ChatApiConfig;
use crate::error::{parse_error_message, ChatApiError};
use crate::events::{ChatMetrics, ChatStreamEvent};
use crate::frames::ChatStreamDecoder;
use crate::payload::ChatRequest;
use crate::url::normalize_chat_url;

/// Cancellation signal shared across the request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct ChatApiClient {
    http: Client,
    config: ChatApiConfig,
}

/// Logical completion reported for one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamCompletion {
    /// Whether a `done` record was observed.
    pub done: bool,
    /// Metrics attached to the `done` record, when present.
    pub metrics: Option<ChatMetrics>,
}

/// Collected outcome of [`ChatApiClient::stream`].
#[derive(Debug, Clone)]
pub struct StreamResult {
    pub events: Vec<ChatStreamEvent>,
    pub completion: StreamCompletion,
}

impl ChatApiClient {
    pub fn new(config: ChatApiConfig) -> Result<Self, ChatApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ChatApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatApiConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_chat_url(&self.config.base_url)
    }

    fn build_headers(&self) -> Result<HeaderMap, ChatApiError> {
        let mut headers = HeaderMap::new();
        if let Some(user_agent) = self.config.user_agent.as_deref() {
            headers.insert(
                reqwest::header::USER_AGENT,
                HeaderValue::from_str(user_agent)
                    .map_err(|_| ChatApiError::InvalidHeader("User-Agent".to_string()))?,
            );
        }
        for (key, value) in &self.config.extra_headers {
            headers.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| ChatApiError::InvalidHeader(key.clone()))?,
                HeaderValue::from_str(value)
                    .map_err(|_| ChatApiError::InvalidHeader(key.clone()))?,
            );
        }
        Ok(headers)
    }

    pub fn build_request(
        &self,
        request: &ChatRequest,
    ) -> Result<reqwest::RequestBuilder, ChatApiError> {
        let headers = self.build_headers()?;
        Ok(self
            .http
            .post(self.normalized_endpoint())
            .headers(headers)
            .json(request))
    }

    /// Issue the chat request once.
    ///
    /// Failed attempts are never retried here; the error is reported to the
    /// caller, which may resend on user action.
    pub async fn send(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Response, ChatApiError> {
        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        let response = self.build_request(request)?.send();
        let response = await_or_cancel(response, cancellation)
            .await?
            .map_err(ChatApiError::from)?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = await_or_cancel(response.text(), cancellation)
            .await?
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        Err(ChatApiError::Status(status, parse_error_message(status, &body)))
    }

    /// Stream a chat response, forwarding each decoded event to `on_event`.
    ///
    /// A protocol error record aborts the stream as
    /// [`ChatApiError::StreamFailed`]. A `done` record is recorded but does
    /// not stop the read loop; the transport may still deliver trailing
    /// flush chunks.
    pub async fn stream_with_handler<F>(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
        mut on_event: F,
    ) -> Result<StreamCompletion, ChatApiError>
    where
        F: FnMut(ChatStreamEvent),
    {
        let response = self.send(request, cancellation).await?;
        let mut bytes = response.bytes_stream();
        let mut decoder = ChatStreamDecoder::default();
        let mut completion = StreamCompletion::default();

        loop {
            let Some(chunk) = await_or_cancel(bytes.next(), cancellation).await? else {
                break;
            };
            if is_cancelled(cancellation) {
                return Err(ChatApiError::Cancelled);
            }
            let chunk = chunk.map_err(ChatApiError::from)?;
            for event in decoder.feed(&chunk) {
                process_stream_event(event, &mut completion, &mut on_event)?;
            }
        }

        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        decoder.finish();
        Ok(completion)
    }

    /// Stream a chat response and collect every event.
    pub async fn stream(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<StreamResult, ChatApiError> {
        let mut events = Vec::new();
        let completion = self
            .stream_with_handler(request, cancellation, |event| events.push(event))
            .await?;

        Ok(StreamResult { events, completion })
    }
}

fn process_stream_event<F>(
    event: ChatStreamEvent,
    completion: &mut StreamCompletion,
    on_event: &mut F,
) -> Result<(), ChatApiError>
where
    F: FnMut(ChatStreamEvent),
{
    if let ChatStreamEvent::Error { message } = &event {
        return Err(ChatApiError::StreamFailed {
            message: message.clone(),
        });
    }

    if let ChatStreamEvent::Done { metrics } = &event {
        completion.done = true;
        if metrics.is_some() {
            completion.metrics = *metrics;
        }
    }

    on_event(event);
    Ok(())
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|signal| signal.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, ChatApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(ChatApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
