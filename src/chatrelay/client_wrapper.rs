//! A ClientWrapper is a wrapper around a specific LLM backend, local or
//! cloud-hosted.  It provides a common interface to issue one completion
//! request, either materialized or as a lazy stream of chunks.  It knows
//! nothing about tools beyond forwarding their descriptors, and nothing
//! about loops; for agent orchestration see [`AgentLoop`](crate::agent::AgentLoop).

use std::error::Error;
use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};

/// Represents the possible roles for a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Set by the developer to steer the model's responses.
    System,
    /// A message sent by a human user (or app user).
    User,
    /// Content generated by the model in response to a user message.
    Assistant,
    /// The result of a tool invocation, fed back to the model.
    Tool,
}

/// A tool invocation requested by the model inside an assistant message.
///
/// Produced by the backend, consumed exactly once by the
/// [`ToolRegistry`](crate::tool_invoker::ToolRegistry) during dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCall {
    /// Opaque identifier assigned by the backend; unique within one turn.
    pub id: String,
    /// Name of the tool the model wants to invoke.
    pub name: String,
    /// JSON-encoded argument object, exactly as the model emitted it.
    pub arguments: String,
}

/// Represents a generic message exchanged with an LLM.
#[derive(Clone, Debug)]
pub struct Message {
    /// The role associated with the message.
    pub role: Role,
    /// The text content, absent on assistant messages that only carry tool calls.
    pub content: Option<String>,
    /// Tool invocations requested by the model (assistant messages only).
    pub tool_calls: Vec<ToolCall>,
    /// On tool-role messages, the id of the [`ToolCall`] this result answers.
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Build a plain assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Build a tool-result message answering the tool call with the given id.
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Why the backend stopped emitting chunks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FinishReason {
    /// The model produced a complete answer.
    Stop,
    /// The model stopped to request tool invocations.
    ToolCalls,
    /// Any other backend-specific reason (length, content filter, ...).
    Other(String),
}

impl FinishReason {
    /// Map the wire string onto the typed variant.
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "stop" => FinishReason::Stop,
            "tool_calls" => FinishReason::ToolCalls,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

/// A fragment of a streamed tool call.  The backend may split one call across
/// many chunks; fragments carrying the same `index` belong to the same call
/// and their `arguments` pieces concatenate in arrival order.
#[derive(Clone, Debug, Default)]
pub struct ToolCallDelta {
    /// Position of the call this fragment belongs to within the turn.
    pub index: usize,
    /// Present on the first fragment of a call.
    pub id: Option<String>,
    /// Present on the first fragment of a call.
    pub name: Option<String>,
    /// Argument text fragment, possibly empty.
    pub arguments: Option<String>,
}

/// Represents a chunk of a streaming completion response.
#[derive(Clone, Debug, Default)]
pub struct MessageChunk {
    /// The incremental content in this chunk (may be empty).
    pub content: String,
    /// Tool-call fragments carried by this chunk.
    pub tool_call_deltas: Vec<ToolCallDelta>,
    /// Set on the final chunk of the stream.
    pub finish_reason: Option<FinishReason>,
}

impl MessageChunk {
    /// Build a plain content chunk, the common case in tests and adapters.
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: text.into(),
            ..Default::default()
        }
    }

    /// Build a terminal chunk carrying only a finish reason.
    pub fn finished(reason: FinishReason) -> Self {
        Self {
            finish_reason: Some(reason),
            ..Default::default()
        }
    }
}

/// A lazy, finite, non-restartable sequence of completion chunks.
/// Must be consumed exactly once, in arrival order.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<MessageChunk, CompletionError>> + Send>>;

/// Errors surfaced by completion clients.  The client performs no retries;
/// the caller decides whether to retry or surface the failure.
#[derive(Debug)]
pub enum CompletionError {
    /// The HTTP request itself failed (connect, timeout, TLS, ...).
    Transport(String),
    /// The backend answered with a non-success status.
    Api { status: u16, body: String },
    /// The backend answered 2xx but the payload did not parse.
    MalformedResponse(String),
    /// A mid-stream failure after the response started arriving.
    Stream(String),
    /// The requested provider is not configured.
    UnknownProvider(String),
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionError::Transport(msg) => write!(f, "transport error: {}", msg),
            CompletionError::Api { status, body } => {
                write!(f, "backend returned status {}: {}", status, body)
            }
            CompletionError::MalformedResponse(msg) => {
                write!(f, "malformed backend response: {}", msg)
            }
            CompletionError::Stream(msg) => write!(f, "stream error: {}", msg),
            CompletionError::UnknownProvider(name) => {
                write!(f, "unknown provider: {}", name)
            }
        }
    }
}

impl Error for CompletionError {}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        CompletionError::Transport(err.to_string())
    }
}

/// Trait defining the interface to interact with an LLM backend.
///
/// When `tools` is `Some`, the backend is told that tool invocation is
/// permitted and selection is automatic; the backend decides whether to call
/// a tool, it is never forced.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Identifier of the concrete model this wrapper targets.
    fn model_name(&self) -> &str;

    /// Send the conversation and get one materialized assistant message,
    /// with any tool calls the model requested.
    async fn send_message(
        &self,
        messages: &[Message],
        tools: Option<&[crate::tool_invoker::ToolDescriptor]>,
    ) -> Result<Message, CompletionError>;

    /// Send the conversation and get a streaming response.  Content
    /// fragments reconstruct the full text by naive concatenation;
    /// tool-call fragments must be reassembled by index before dispatch
    /// (see [`ToolCallAccumulator`](crate::clients::common::ToolCallAccumulator)).
    async fn send_message_stream(
        &self,
        messages: &[Message],
        tools: Option<&[crate::tool_invoker::ToolDescriptor]>,
    ) -> Result<ChunkStream, CompletionError>;
}
