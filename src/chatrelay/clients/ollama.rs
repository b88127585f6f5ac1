//! Local Ollama runtime client.
//!
//! Ollama exposes an OpenAI-compatible surface under `/v1`, so this wrapper
//! delegates all transport work to [`OpenAiCompatClient`] pointed at the
//! local daemon.  Swapping between local and cloud backends only requires a
//! different constructor.

use async_trait::async_trait;

use crate::client_wrapper::{ChunkStream, ClientWrapper, CompletionError, Message};
use crate::clients::openai_compat::OpenAiCompatClient;
use crate::tool_invoker::ToolDescriptor;

/// Default address of a locally running Ollama daemon.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Client wrapper for a local Ollama runtime.
pub struct OllamaClient {
    delegate: OpenAiCompatClient,
}

impl OllamaClient {
    /// Create a client targeting the default local daemon.
    pub fn new(model: &str) -> Self {
        Self::new_with_base_url(model, DEFAULT_OLLAMA_BASE_URL)
    }

    /// Create a client targeting an Ollama daemon at a custom address.
    /// `base_url` is the daemon root (without the `/v1` suffix).
    pub fn new_with_base_url(model: &str, base_url: &str) -> Self {
        let compat_url = format!("{}/v1", base_url.trim_end_matches('/'));
        Self {
            // Ollama ignores the bearer token, so no key is passed.
            delegate: OpenAiCompatClient::new(&compat_url, "", model),
        }
    }
}

#[async_trait]
impl ClientWrapper for OllamaClient {
    fn model_name(&self) -> &str {
        self.delegate.model_name()
    }

    async fn send_message(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDescriptor]>,
    ) -> Result<Message, CompletionError> {
        self.delegate.send_message(messages, tools).await
    }

    async fn send_message_stream(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDescriptor]>,
    ) -> Result<ChunkStream, CompletionError> {
        self.delegate.send_message_stream(messages, tools).await
    }
}
