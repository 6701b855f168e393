//! Process-wide provider cache.
//!
//! Providers are expensive to create (model load or endpoint probe) and
//! stateless once built, so they are cached for the lifetime of the process
//! keyed by their configuration. The core never invalidates an entry;
//! credential rotation is a restart concern.

use crate::error::Result;
use crate::http::{HttpEmbedConfig, HttpEmbeddingProvider};
use crate::provider::{EmbeddingProvider, FastEmbedProvider, LocalEmbedConfig};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// Which embedding backend to use.
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    /// Local on-device ONNX model.
    Local(LocalEmbedConfig),
    /// Remote OpenAI-compatible endpoint.
    Http(HttpEmbedConfig),
}

impl ProviderConfig {
    fn cache_key(&self) -> String {
        match self {
            ProviderConfig::Local(c) => format!("local:{}", c.model_name),
            ProviderConfig::Http(c) => format!(
                "http:{}:{}:{}",
                c.endpoint,
                c.model,
                c.api_key.as_deref().unwrap_or("")
            ),
        }
    }
}

static PROVIDER_CACHE: OnceLock<Mutex<HashMap<String, Arc<dyn EmbeddingProvider>>>> =
    OnceLock::new();

fn cache() -> &'static Mutex<HashMap<String, Arc<dyn EmbeddingProvider>>> {
    PROVIDER_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Get or lazily create the provider for `config`.
///
/// The first call per configuration pays the model-load / probe cost; later
/// calls return the cached instance.
pub async fn get_provider(config: &ProviderConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let key = config.cache_key();

    if let Some(provider) = cache().lock().unwrap().get(&key) {
        tracing::debug!("provider cache hit: {key}");
        return Ok(Arc::clone(provider));
    }

    let provider: Arc<dyn EmbeddingProvider> = match config {
        ProviderConfig::Local(c) => Arc::new(FastEmbedProvider::create(c.clone()).await?),
        ProviderConfig::Http(c) => Arc::new(HttpEmbeddingProvider::create(c.clone()).await?),
    };

    cache().lock().unwrap().insert(key, Arc::clone(&provider));
    Ok(provider)
}

/// Number of cached providers (for diagnostics and tests).
pub fn cache_size() -> usize {
    cache().lock().unwrap().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_keys_distinguish_configurations() {
        let a = ProviderConfig::Local(LocalEmbedConfig::new("all-MiniLM-L6-v2"));
        let b = ProviderConfig::Local(LocalEmbedConfig::new("bge-small-en-v1.5"));
        let c = ProviderConfig::Http(HttpEmbedConfig::new("http://x/v1/embeddings", "m"));
        assert_ne!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
    }

    #[test]
    fn cache_keys_include_credentials() {
        let plain = ProviderConfig::Http(HttpEmbedConfig::new("http://x", "m"));
        let keyed =
            ProviderConfig::Http(HttpEmbedConfig::new("http://x", "m").with_api_key("secret"));
        assert_ne!(plain.cache_key(), keyed.cache_key());
    }

    #[test]
    fn cache_keys_are_deterministic() {
        let config = ProviderConfig::Local(LocalEmbedConfig::default());
        assert_eq!(config.cache_key(), config.cache_key());
    }
}
