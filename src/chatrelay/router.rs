//! Model identifier parsing and backend selection.
//!
//! Model identifiers are `provider:model` strings (e.g. `ollama:gpt-oss:20b`
//! or `openai:gpt-4o-mini`).  The prefix is parsed exactly once at this
//! boundary into a [`ModelRef`], a typed value carried through the rest of
//! the core; nothing downstream re-inspects strings to pick a backend.
//!
//! The set of cloud providers is open: any prefix found in the
//! [`RelayConfig`] provider table resolves, and only the `ollama` prefix is
//! distinguished as the local runtime.

use std::fmt;
use std::sync::Arc;

use crate::client_wrapper::{ClientWrapper, CompletionError};
use crate::clients::ollama::OllamaClient;
use crate::clients::openai_compat::OpenAiCompatClient;
use crate::config::RelayConfig;

/// Prefix that denotes the local runtime.
pub const LOCAL_PROVIDER: &str = "ollama";

/// A parsed model identifier: which backend, and which model on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelRef {
    /// A model served by the local Ollama runtime.
    Local { model: String },
    /// A model served by a named cloud provider.
    Cloud { provider: String, model: String },
}

impl ModelRef {
    /// Parse a `provider:model` identifier.
    ///
    /// Model names may themselves contain colons (`ollama:gpt-oss:20b`), so
    /// only the first colon separates provider from model.  An identifier
    /// without a provider prefix defaults to the local runtime.
    pub fn parse(identifier: &str) -> Self {
        match identifier.split_once(':') {
            Some((LOCAL_PROVIDER, model)) => ModelRef::Local {
                model: model.to_string(),
            },
            Some((provider, model)) => ModelRef::Cloud {
                provider: provider.to_string(),
                model: model.to_string(),
            },
            None => ModelRef::Local {
                model: identifier.to_string(),
            },
        }
    }

    /// The model name without the provider prefix.
    pub fn model(&self) -> &str {
        match self {
            ModelRef::Local { model } => model,
            ModelRef::Cloud { model, .. } => model,
        }
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelRef::Local { model } => write!(f, "{}:{}", LOCAL_PROVIDER, model),
            ModelRef::Cloud { provider, model } => write!(f, "{}:{}", provider, model),
        }
    }
}

/// Resolves a [`ModelRef`] to a concrete [`ClientWrapper`].
pub struct ProviderRouter {
    config: RelayConfig,
}

impl ProviderRouter {
    /// Build a router over the given configuration.
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Borrow the configuration the router was built with.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Build a client for the referenced backend.
    ///
    /// Fails with [`CompletionError::UnknownProvider`] when a cloud prefix is
    /// not present in the provider table; no network traffic is involved.
    pub fn client_for(&self, model: &ModelRef) -> Result<Arc<dyn ClientWrapper>, CompletionError> {
        match model {
            ModelRef::Local { model } => Ok(Arc::new(OllamaClient::new_with_base_url(
                model,
                &self.config.ollama_base_url,
            ))),
            ModelRef::Cloud { provider, model } => {
                let provider_config = self
                    .config
                    .providers
                    .get(provider)
                    .ok_or_else(|| CompletionError::UnknownProvider(provider.clone()))?;
                Ok(Arc::new(OpenAiCompatClient::new(
                    &provider_config.base_url,
                    &provider_config.api_key,
                    model,
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;

    #[test]
    fn parse_splits_on_first_colon_only() {
        assert_eq!(
            ModelRef::parse("ollama:gpt-oss:20b"),
            ModelRef::Local {
                model: "gpt-oss:20b".to_string()
            }
        );
        assert_eq!(
            ModelRef::parse("openai:gpt-4o-mini"),
            ModelRef::Cloud {
                provider: "openai".to_string(),
                model: "gpt-4o-mini".to_string()
            }
        );
    }

    #[test]
    fn parse_defaults_to_local_runtime() {
        assert_eq!(
            ModelRef::parse("llama3.1"),
            ModelRef::Local {
                model: "llama3.1".to_string()
            }
        );
    }

    #[test]
    fn display_round_trips() {
        for id in ["ollama:gpt-oss:20b", "together:meta-llama/Llama-3.1-70B"] {
            assert_eq!(ModelRef::parse(id).to_string(), id);
        }
    }

    #[test]
    fn router_rejects_unconfigured_provider() {
        let router = ProviderRouter::new(RelayConfig::default());
        let err = router
            .client_for(&ModelRef::parse("missing:model"))
            .err()
            .expect("expected resolution failure");
        assert!(matches!(err, CompletionError::UnknownProvider(name) if name == "missing"));
    }

    #[test]
    fn router_resolves_local_and_configured_cloud() {
        let mut config = RelayConfig::default();
        config.providers.insert(
            "openai".to_string(),
            ProviderConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                api_key: "key".to_string(),
                models: vec![],
            },
        );
        let router = ProviderRouter::new(config);

        let local = router.client_for(&ModelRef::parse("ollama:llama3.1")).unwrap();
        assert_eq!(local.model_name(), "llama3.1");

        let cloud = router.client_for(&ModelRef::parse("openai:gpt-4o-mini")).unwrap();
        assert_eq!(cloud.model_name(), "gpt-4o-mini");
    }
}
