//! Remote embedding provider for OpenAI-compatible endpoints.

use crate::error::{EmbedError, Result};
use crate::provider::{EmbeddingBatch, EmbeddingProvider, normalize_to_f16};
use async_trait::async_trait;
use half::f16;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a remote `/v1/embeddings`-style endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpEmbedConfig {
    /// Full URL of the embeddings endpoint.
    pub endpoint: String,
    /// Bearer token, if the endpoint requires one.
    pub api_key: Option<String>,
    /// Model name sent with each request.
    pub model: String,
    /// Per-request timeout. A timed-out batch fails only that batch.
    pub timeout: Duration,
}

impl HttpEmbedConfig {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            model: model.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Embedding provider backed by a remote HTTP endpoint.
///
/// The dimension is discovered with a probe request at creation time, so a
/// misconfigured endpoint fails fast instead of at the first index build.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingProvider {
    config: HttpEmbedConfig,
    client: reqwest::Client,
    dimension: usize,
}

impl HttpEmbeddingProvider {
    pub async fn create(config: HttpEmbedConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let mut provider = Self {
            config,
            client,
            dimension: 0,
        };

        // Probe for the model's dimension.
        let probe = provider.request(&["probe".to_string()]).await?;
        provider.dimension = probe.first().map(|v| v.len()).unwrap_or(0);
        if provider.dimension == 0 {
            return Err(EmbedError::invalid_config(
                "endpoint returned an empty probe embedding",
            ));
        }
        tracing::info!(
            "remote embedding endpoint ready, model {} dimension {}",
            provider.config.model,
            provider.dimension
        );
        Ok(provider)
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f16>>> {
        let body = EmbeddingsRequest {
            model: &self.config.model,
            input: texts,
        };

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response: EmbeddingsResponse =
            request.send().await?.error_for_status()?.json().await?;

        if response.data.len() != texts.len() {
            return Err(EmbedError::CountMismatch {
                expected: texts.len(),
                actual: response.data.len(),
            });
        }

        Ok(normalize_to_f16(
            response.data.into_iter().map(|d| d.embedding).collect(),
        ))
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<EmbeddingBatch> {
        if texts.is_empty() {
            return Ok(EmbeddingBatch::new(vec![]));
        }
        let embeddings = self.request(texts).await?;
        Ok(EmbeddingBatch::new(embeddings))
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f16>> {
        let batch = self.embed_batch(&[text.to_string()]).await?;
        batch
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::invalid_config("no embedding generated for query"))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_sets_fields() {
        let config = HttpEmbedConfig::new("http://localhost:8080/v1/embeddings", "test-model")
            .with_api_key("secret")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.model, "test-model");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn request_body_serializes_to_openai_shape() {
        let input = vec!["hello".to_string()];
        let body = EmbeddingsRequest {
            model: "test-model",
            input: &input,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["input"][0], "hello");
    }

    #[test]
    fn response_parses_embedding_data() {
        let raw = r#"{"data":[{"embedding":[0.1,0.2]},{"embedding":[0.3,0.4]}]}"#;
        let parsed: EmbeddingsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.data[0].embedding, vec![0.1, 0.2]);
    }
}
