//! Tool Invoker Boundary
//!
//! This module resolves tool names against a registry of descriptors grouped
//! by provider connection (e.g. one entry per connected MCP server) and
//! executes the call through the connection's session.
//!
//! The registry is supplied by external session-management code at loop
//! invocation time and is scoped to one conversation; the invoker never
//! initiates a connection itself.  All failure modes (tool not found,
//! session unavailable, invocation error) are rendered as structured JSON
//! payloads that become the tool message's content, so the agent loop keeps
//! going and the model can react to the error.
//!
//! # Example
//!
//! ```rust,no_run
//! use chatrelay::tool_invoker::{ToolDescriptor, ToolRegistry};
//! use serde_json::json;
//!
//! let descriptor = ToolDescriptor::new(
//!     "get_stock_price",
//!     "Given a stock ticker, returns the current price of the stock",
//!     json!({
//!         "type": "object",
//!         "properties": { "ticker": { "type": "string" } },
//!         "required": ["ticker"]
//!     }),
//! );
//! let mut registry = ToolRegistry::new();
//! registry.add_connection("finance", vec![descriptor], None);
//! ```

use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

/// Describes one externally registered tool the model may request.
///
/// Immutable for the duration of a conversation turn; looked up by name
/// during dispatch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name within the registry.
    pub name: String,
    /// Human readable description surfaced to the model.
    pub description: String,
    /// JSON Schema object describing the tool's arguments.
    pub input_schema: JsonValue,
}

impl ToolDescriptor {
    /// Create a descriptor with the supplied identifier, description, and schema.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: JsonValue,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Live session to one tool provider connection.
///
/// Implemented by external session-management code (typically an MCP client
/// transport).  One call per [`ToolCall`](crate::client_wrapper::ToolCall);
/// any error is caught by the invoker and rendered as a payload.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Execute the named tool with the given argument object and return its
    /// textual output.
    async fn call_tool(
        &self,
        name: &str,
        arguments: JsonValue,
    ) -> Result<String, Box<dyn Error + Send + Sync>>;
}

struct ToolConnection {
    descriptors: Vec<ToolDescriptor>,
    /// `None` when the connection is registered but its session is down.
    session: Option<Arc<dyn ToolSession>>,
}

/// Registry of tool connections for one conversation.
///
/// Maps provider-connection name to the list of tools that connection
/// exposes plus its live session.  Read-only during dispatch; callers that
/// share a registry across conversations must replace it wholesale rather
/// than mutate it while a dispatch is reading it.
#[derive(Default)]
pub struct ToolRegistry {
    connections: HashMap<String, ToolConnection>,
}

impl ToolRegistry {
    /// Build an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection with the tools it exposes.  Pass `None` for the
    /// session to register a connection whose transport is currently down.
    pub fn add_connection(
        &mut self,
        connection_name: impl Into<String>,
        descriptors: Vec<ToolDescriptor>,
        session: Option<Arc<dyn ToolSession>>,
    ) {
        self.connections.insert(
            connection_name.into(),
            ToolConnection {
                descriptors,
                session,
            },
        );
    }

    /// Remove a connection and all of its tools.
    pub fn remove_connection(&mut self, connection_name: &str) {
        self.connections.remove(connection_name);
    }

    /// True when no connection exposes any tool.
    pub fn is_empty(&self) -> bool {
        self.connections.values().all(|c| c.descriptors.is_empty())
    }

    /// All descriptors across connections, the set offered to the model.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut all: Vec<ToolDescriptor> = self
            .connections
            .values()
            .flat_map(|c| c.descriptors.iter().cloned())
            .collect();
        // Stable offering order regardless of map iteration.
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    fn connection_for(&self, tool_name: &str) -> Option<(&str, &ToolConnection)> {
        self.connections
            .iter()
            .find(|(_, conn)| conn.descriptors.iter().any(|d| d.name == tool_name))
            .map(|(name, conn)| (name.as_str(), conn))
    }

    /// Resolve and execute a tool call, returning the payload that becomes
    /// the tool message's content.
    ///
    /// Never fails: the three error cases (no connection exposes the tool,
    /// the connection's session is unavailable, the invocation itself
    /// errors) are all encoded as `{"error": "..."}` strings.
    pub async fn invoke(&self, tool_name: &str, arguments: JsonValue) -> String {
        let (connection_name, connection) = match self.connection_for(tool_name) {
            Some(found) => found,
            None => {
                log::warn!("tool '{}' not found in any MCP connection", tool_name);
                return json!({
                    "error": format!("Tool {} not found in any MCP connection", tool_name)
                })
                .to_string();
            }
        };

        let session = match &connection.session {
            Some(session) => session,
            None => {
                log::warn!(
                    "MCP connection '{}' has no live session for tool '{}'",
                    connection_name,
                    tool_name
                );
                return json!({
                    "error": format!("MCP {} not found in any MCP connection", connection_name)
                })
                .to_string();
            }
        };

        match session.call_tool(tool_name, arguments).await {
            Ok(output) => output,
            Err(err) => {
                log::warn!("tool '{}' invocation failed: {}", tool_name, err);
                json!({ "error": err.to_string() }).to_string()
            }
        }
    }
}
