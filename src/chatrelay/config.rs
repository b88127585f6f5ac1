//! Configuration for chatrelay.
//!
//! Provides the [`RelayConfig`] struct describing where the local runtime
//! lives, which cloud providers are reachable, and the agent loop's tool
//! turn cap.  Users construct this manually — no file parsing dependencies
//! are introduced.
//!
//! # Example
//!
//! ```rust
//! use chatrelay::config::{ProviderConfig, RelayConfig};
//!
//! let mut config = RelayConfig::default();
//! config.providers.insert(
//!     "openai".to_string(),
//!     ProviderConfig {
//!         base_url: "https://api.openai.com/v1".to_string(),
//!         api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
//!         models: vec!["gpt-4o-mini".to_string()],
//!     },
//! );
//! ```

use std::collections::HashMap;

use crate::clients::ollama::DEFAULT_OLLAMA_BASE_URL;

/// Coordinates of one named cloud provider.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    /// OpenAI-compatible endpoint root (including any `/v1` suffix).
    pub base_url: String,
    /// Bearer token; empty for unauthenticated endpoints.
    pub api_key: String,
    /// Models this provider advertises, surfaced by
    /// [`list_models`](crate::models::list_models).
    pub models: Vec<String>,
}

/// Configuration shared by the router, the model listing, and the agent loop.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Root address of the local Ollama daemon.
    pub ollama_base_url: String,
    /// Named cloud providers keyed by the prefix used in model identifiers.
    pub providers: HashMap<String, ProviderConfig>,
    /// Maximum number of tool-dispatch turns per agent loop invocation.
    pub max_tool_turns: usize,
}

impl Default for RelayConfig {
    /// Local daemon at its default address, no cloud providers, and an
    /// eight-turn tool cap.
    fn default() -> Self {
        Self {
            ollama_base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            providers: HashMap::new(),
            max_tool_turns: 8,
        }
    }
}
