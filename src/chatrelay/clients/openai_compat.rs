//! Generic client for any OpenAI-compatible chat endpoint.
//!
//! This is the workhorse wrapper: every named cloud provider in the router's
//! table, and the local runtime via [`OllamaClient`](crate::clients::ollama::OllamaClient),
//! ends up here.  It owns nothing but the endpoint coordinates and the model
//! name; HTTP connections come from the shared pool.
//!
//! # Example
//!
//! ```rust,no_run
//! use chatrelay::client_wrapper::{ClientWrapper, Message};
//! use chatrelay::clients::openai_compat::OpenAiCompatClient;
//!
//! # async {
//! let client = OpenAiCompatClient::new(
//!     "https://api.openai.com/v1",
//!     &std::env::var("OPENAI_API_KEY").unwrap_or_default(),
//!     "gpt-4o-mini",
//! );
//! let reply = client
//!     .send_message(&[Message::user("Hello!")], None)
//!     .await?;
//! println!("{}", reply.content.unwrap_or_default());
//! # Ok::<(), chatrelay::client_wrapper::CompletionError>(())
//! # };
//! ```

use async_trait::async_trait;

use crate::client_wrapper::{ChunkStream, ClientWrapper, CompletionError, Message};
use crate::clients::common::{build_request, send_chat, send_chat_stream};
use crate::http_pool::get_shared_http_client;
use crate::tool_invoker::ToolDescriptor;

/// Client wrapper for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatClient {
    /// Construct a client for the given endpoint, key, and model name.
    /// Pass an empty key for endpoints that do not authenticate.
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http: get_shared_http_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl ClientWrapper for OpenAiCompatClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn send_message(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDescriptor]>,
    ) -> Result<Message, CompletionError> {
        let request = build_request(&self.model, messages, tools, false);
        send_chat(&self.http, &self.base_url, &self.api_key, &request).await
    }

    async fn send_message_stream(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDescriptor]>,
    ) -> Result<ChunkStream, CompletionError> {
        let request = build_request(&self.model, messages, tools, true);
        send_chat_stream(&self.http, &self.base_url, &self.api_key, &request).await
    }
}
