//! # chatrelay
//!
//! chatrelay is a Rust toolkit for building conversational front-ends that
//! route chat turns to Large Language Model backends — a local Ollama
//! runtime or an open set of OpenAI-compatible cloud providers — with agent
//! tool-calling and token-by-token streaming of the answer.
//!
//! The crate provides carefully layered abstractions for:
//!
//! * **Completion Clients**: the [`ClientWrapper`] trait with concrete
//!   implementations for the local runtime
//!   ([`clients::ollama::OllamaClient`]) and any OpenAI-compatible endpoint
//!   ([`clients::openai_compat::OpenAiCompatClient`]), returning either a
//!   materialized message or a lazy chunk stream
//! * **Backend Routing**: [`router::ModelRef`] parses `provider:model`
//!   identifiers once at the boundary into a typed value; the
//!   [`router::ProviderRouter`] resolves it against a [`RelayConfig`]
//! * **Agent Loop**: [`AgentLoop`] alternates completion calls and tool
//!   dispatch through a per-conversation
//!   [`tool_invoker::ToolRegistry`] until the model produces a final
//!   answer, then streams it
//! * **Stream Splitting**: [`Splitter`] demultiplexes the final stream into
//!   reasoning and visible-answer sub-streams on inline sentinel markers,
//!   delivered through an injected [`SplitSink`]
//!
//! ## Quickstart
//!
//! ```rust,no_run
//! use chatrelay::{AgentLoop, AgentOutcome, RelayConfig};
//! use chatrelay::client_wrapper::Message;
//! use chatrelay::router::{ModelRef, ProviderRouter};
//! use chatrelay::tool_invoker::ToolRegistry;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     chatrelay::init_logger();
//!
//!     let router = ProviderRouter::new(RelayConfig::default());
//!     let model = ModelRef::parse("ollama:gpt-oss:20b");
//!     let client = router.client_for(&model)?;
//!
//!     let agent = AgentLoop::new(client);
//!     let mut conversation = vec![Message::user("Hello!")];
//!     let registry = ToolRegistry::new();
//!
//!     match agent.run(&mut conversation, &registry, true).await? {
//!         AgentOutcome::Stream(_chunks) => { /* consume via split_stream */ }
//!         AgentOutcome::Full(message) => println!("{:?}", message.content),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Tool connections (typically MCP servers) are registered by external
//! session-management code through
//! [`tool_invoker::ToolRegistry::add_connection`]; the core never initiates
//! a connection itself.

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// The helper is intentionally lightweight so that applications embedding
/// chatrelay can opt in to simple `RUST_LOG` driven diagnostics without
/// having to choose a specific logging backend upfront.
///
/// ```rust
/// chatrelay::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

// Import the top-level `chatrelay` module.
pub mod chatrelay;

// Re-exporting key items for easier external access.
pub use crate::chatrelay::agent;
pub use crate::chatrelay::agent::{AgentError, AgentLoop, AgentOutcome};
pub use crate::chatrelay::client_wrapper;
pub use crate::chatrelay::client_wrapper::{
    ChunkStream, ClientWrapper, CompletionError, FinishReason, Message, MessageChunk, Role,
    ToolCall,
};
pub use crate::chatrelay::clients;
pub use crate::chatrelay::config;
pub use crate::chatrelay::config::{ProviderConfig, RelayConfig};
pub use crate::chatrelay::http_pool;
pub use crate::chatrelay::models;
pub use crate::chatrelay::models::{list_models, ModelEntry};
pub use crate::chatrelay::router;
pub use crate::chatrelay::router::{ModelRef, ProviderRouter};
pub use crate::chatrelay::stream_splitter;
pub use crate::chatrelay::stream_splitter::{split_stream, SplitEvent, SplitSink, Splitter};
pub use crate::chatrelay::tool_invoker;
pub use crate::chatrelay::tool_invoker::{ToolDescriptor, ToolRegistry, ToolSession};
