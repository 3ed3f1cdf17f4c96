use async_trait::async_trait;
use ollama_api::{
    CancellationSignal, ChatApiClient, ChatApiError, ChatRequest, ChatStreamEvent,
    StreamCompletion,
};

/// Transport seam between the orchestrator and the chat service.
///
/// Implementations emit decoded events in arrival order and resolve a
/// tripped cancellation signal as [`ChatApiError::Cancelled`]. The
/// production implementation wraps [`ChatApiClient`]; tests script the
/// stream instead.
#[async_trait]
pub trait ChatTransport: Send + Sync + 'static {
    async fn stream_chat(
        &self,
        request: ChatRequest,
        cancellation: CancellationSignal,
        on_event: &mut (dyn FnMut(ChatStreamEvent) + Send),
    ) -> Result<StreamCompletion, ChatApiError>;
}

/// HTTP transport over the blog chat endpoint.
pub struct OllamaTransport {
    client: ChatApiClient,
}

impl OllamaTransport {
    #[must_use]
    pub fn new(client: ChatApiClient) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn client(&self) -> &ChatApiClient {
        &self.client
    }
}

#[async_trait]
impl ChatTransport for OllamaTransport {
    async fn stream_chat(
        &self,
        request: ChatRequest,
        cancellation: CancellationSignal,
        on_event: &mut (dyn FnMut(ChatStreamEvent) + Send),
    ) -> Result<StreamCompletion, ChatApiError> {
        self.client
            .stream_with_handler(&request, Some(&cancellation), |event| on_event(event))
            .await
    }
}
