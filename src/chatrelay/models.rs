//! Model listing across the local runtime and configured cloud providers.
//!
//! The local Ollama daemon is queried live over its `/api/tags` endpoint;
//! cloud entries come from the provider table in [`RelayConfig`].  When the
//! daemon is unreachable the error is logged and the cloud entries are
//! returned alone, so a missing local runtime never breaks model selection.

use serde::Deserialize;

use crate::config::RelayConfig;
use crate::http_pool::get_shared_http_client;
use crate::router::LOCAL_PROVIDER;

/// One selectable model with its provider prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelEntry {
    /// Short display name.
    pub name: String,
    /// Provider prefix (`ollama` for the local runtime).
    pub provider: String,
    /// Full `provider:model` identifier accepted by
    /// [`ModelRef::parse`](crate::router::ModelRef::parse).
    pub model: String,
}

#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaTag>,
}

#[derive(Deserialize)]
struct OllamaTag {
    model: String,
}

/// List every model reachable through the given configuration: local tags
/// first, then each configured provider's advertised models.
pub async fn list_models(config: &RelayConfig) -> Vec<ModelEntry> {
    let mut entries = Vec::new();

    match fetch_local_tags(&config.ollama_base_url).await {
        Ok(tags) => {
            for tag in tags {
                entries.push(ModelEntry {
                    name: tag.clone(),
                    provider: LOCAL_PROVIDER.to_string(),
                    model: format!("{}:{}", LOCAL_PROVIDER, tag),
                });
            }
        }
        Err(err) => {
            log::error!("Ollama server connect error: {}", err);
        }
    }

    let mut providers: Vec<_> = config.providers.iter().collect();
    providers.sort_by(|a, b| a.0.cmp(b.0));
    for (provider, provider_config) in providers {
        for model in &provider_config.models {
            entries.push(ModelEntry {
                name: model.clone(),
                provider: provider.clone(),
                model: format!("{}:{}", provider, model),
            });
        }
    }

    entries
}

async fn fetch_local_tags(base_url: &str) -> Result<Vec<String>, reqwest::Error> {
    let url = format!("{}/api/tags", base_url.trim_end_matches('/'));
    let response = get_shared_http_client()
        .get(&url)
        .send()
        .await?
        .error_for_status()?;
    let tags: OllamaTagsResponse = response.json().await?;
    Ok(tags.models.into_iter().map(|m| m.model).collect())
}
