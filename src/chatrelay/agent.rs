//! Agent Loop
//!
//! This module provides the core [`AgentLoop`] that alternates completion
//! calls and tool dispatch until the model produces a final answer, then
//! hands the caller either a materialized message or a chunk stream.
//!
//! The loop is a small state machine:
//!
//! ```text
//! AWAITING_COMPLETION ──(tool calls)──▶ DISPATCHING_TOOLS ──▶ AWAITING_COMPLETION
//!         │
//!         └─(plain answer)──▶ STREAMING_FINAL (terminal)
//! ```
//!
//! While tools are offered, completion calls are non-streaming: backends do
//! not reliably surface a complete tool-call list mid-stream, and dispatch
//! needs the full list.  Once the model answers without requesting tools the
//! loop re-issues the call with `stream=true` and no tool offer (or returns
//! the materialized answer when the caller asked for one).
//!
//! One logical task drives the whole loop: completion calls and tool
//! dispatches within a conversation are strictly sequential, and each
//! conversation's message list is owned by exactly one loop invocation.
//!
//! # Example
//!
//! ```rust,no_run
//! use chatrelay::agent::{AgentLoop, AgentOutcome};
//! use chatrelay::client_wrapper::Message;
//! use chatrelay::clients::ollama::OllamaClient;
//! use chatrelay::tool_invoker::ToolRegistry;
//! use std::sync::Arc;
//!
//! # async {
//! let agent = AgentLoop::new(Arc::new(OllamaClient::new("gpt-oss:20b")));
//! let mut conversation = vec![Message::user("What is the AAPL price?")];
//! let registry = ToolRegistry::new();
//!
//! match agent.run(&mut conversation, &registry, true).await? {
//!     AgentOutcome::Stream(_chunks) => { /* feed to a stream splitter */ }
//!     AgentOutcome::Full(message) => println!("{:?}", message.content),
//! }
//! # Ok::<(), chatrelay::agent::AgentError>(())
//! # };
//! ```

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::client_wrapper::{ChunkStream, ClientWrapper, CompletionError, Message};
use crate::tool_invoker::ToolRegistry;

/// Default cap on tool-dispatch turns per loop invocation.
pub const DEFAULT_MAX_TOOL_TURNS: usize = 8;

/// The final response of one agent loop invocation, matching the caller's
/// streaming preference for the final turn.
pub enum AgentOutcome {
    /// A materialized assistant message.
    Full(Message),
    /// A lazy chunk stream; consume it exactly once, in order.
    Stream(ChunkStream),
}

/// Errors surfaced by the agent loop.
#[derive(Debug)]
pub enum AgentError {
    /// The caller submitted a conversation with zero messages.  Rejected
    /// before any network call.
    EmptyConversation,
    /// A completion call failed.  The loop performs no retries; the caller
    /// decides whether to retry or surface the failure.
    Completion(CompletionError),
    /// The model emitted tool-call arguments that are not valid JSON.  This
    /// aborts the loop rather than being encoded as a tool error.
    ToolArguments {
        tool_name: String,
        detail: String,
    },
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentError::EmptyConversation => {
                write!(f, "conversation must contain at least one message")
            }
            AgentError::Completion(err) => write!(f, "completion failed: {}", err),
            AgentError::ToolArguments { tool_name, detail } => {
                write!(f, "malformed arguments for tool '{}': {}", tool_name, detail)
            }
        }
    }
}

impl Error for AgentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AgentError::Completion(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CompletionError> for AgentError {
    fn from(err: CompletionError) -> Self {
        AgentError::Completion(err)
    }
}

/// Orchestrates repeated completion calls and tool dispatch for one
/// conversation at a time.
///
/// The loop holds no conversation state of its own: the caller owns the
/// message list and the tool registry, both scoped to the invocation.
pub struct AgentLoop {
    client: Arc<dyn ClientWrapper>,
    max_tool_turns: usize,
}

impl AgentLoop {
    /// Build a loop over the given backend client with the default tool cap.
    pub fn new(client: Arc<dyn ClientWrapper>) -> Self {
        Self {
            client,
            max_tool_turns: DEFAULT_MAX_TOOL_TURNS,
        }
    }

    /// Override the tool-turn cap (builder pattern).
    ///
    /// When the cap is reached the loop stops offering tools and issues one
    /// final completion, so the caller still gets an answer instead of an
    /// error.
    pub fn with_max_tool_turns(mut self, max_tool_turns: usize) -> Self {
        self.max_tool_turns = max_tool_turns;
        self
    }

    /// Borrow the underlying client.
    pub fn client(&self) -> &Arc<dyn ClientWrapper> {
        &self.client
    }

    /// Drive the conversation to a final answer.
    ///
    /// `conversation` is mutated in place: each tool turn appends the
    /// assistant message (exactly once, even with multiple tool calls)
    /// followed by one tool-role message per call, preserving dispatch order
    /// and each call's id.  On a [`AgentError::ToolArguments`] abort the
    /// conversation is left exactly as submitted.  `stream_final` selects
    /// whether the final turn is returned as a chunk stream or a
    /// materialized message.
    pub async fn run(
        &self,
        conversation: &mut Vec<Message>,
        tools: &ToolRegistry,
        stream_final: bool,
    ) -> Result<AgentOutcome, AgentError> {
        if conversation.is_empty() {
            return Err(AgentError::EmptyConversation);
        }

        let descriptors = tools.descriptors();
        if descriptors.is_empty() {
            return self.final_turn(conversation, stream_final).await;
        }

        let mut turn = 0;
        loop {
            if turn >= self.max_tool_turns {
                log::warn!(
                    "tool turn cap ({}) reached; forcing a final completion without tools",
                    self.max_tool_turns
                );
                return self.final_turn(conversation, stream_final).await;
            }

            let response = self
                .client
                .send_message(conversation, Some(&descriptors))
                .await?;

            if response.tool_calls.is_empty() {
                if stream_final {
                    // The probe carried the answer, but the caller wants a
                    // stream: re-issue with stream=true and no tool offer.
                    return self.final_turn(conversation, true).await;
                }
                return Ok(AgentOutcome::Full(response));
            }

            turn += 1;

            // Parse every argument payload before touching the conversation,
            // so an abort never leaves an assistant message with dangling
            // tool calls in the caller's history.
            let mut parsed: Vec<serde_json::Value> = Vec::with_capacity(response.tool_calls.len());
            for call in &response.tool_calls {
                let arguments = serde_json::from_str(&call.arguments).map_err(|e| {
                    AgentError::ToolArguments {
                        tool_name: call.name.clone(),
                        detail: e.to_string(),
                    }
                })?;
                parsed.push(arguments);
            }

            let calls = response.tool_calls.clone();
            conversation.push(response);

            for (call, arguments) in calls.into_iter().zip(parsed) {
                let result = tools.invoke(&call.name, arguments).await;
                log::info!("tool {} ({}) result: {}", call.name, call.id, result);
                conversation.push(Message::tool(call.id, result));
            }
        }
    }

    async fn final_turn(
        &self,
        conversation: &[Message],
        stream: bool,
    ) -> Result<AgentOutcome, AgentError> {
        if stream {
            let chunks = self.client.send_message_stream(conversation, None).await?;
            Ok(AgentOutcome::Stream(chunks))
        } else {
            let message = self.client.send_message(conversation, None).await?;
            Ok(AgentOutcome::Full(message))
        }
    }
}
