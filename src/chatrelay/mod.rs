// src/chatrelay/mod.rs

pub mod agent;
pub mod client_wrapper;
pub mod clients;
pub mod config;
pub mod http_pool;
pub mod models;
pub mod router;
pub mod stream_splitter;
pub mod tool_invoker;

// Export the agent loop at the module root so callers reach it as
// chatrelay::AgentLoop instead of chatrelay::agent::AgentLoop.
pub use agent::{AgentLoop, AgentOutcome};
pub use stream_splitter::{SplitSink, Splitter};
