//! Embedding provider trait and the local fastembed implementation.

use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use half::f16;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Result of a batch embedding call.
///
/// Vectors come back in input order, one per input text, all with the same
/// dimension. The dimension is inferred from the first vector rather than
/// configured, since it is a property of the model.
#[derive(Debug, Clone)]
pub struct EmbeddingBatch {
    pub embeddings: Vec<Vec<f16>>,
    pub dimension: usize,
}

impl EmbeddingBatch {
    pub fn new(embeddings: Vec<Vec<f16>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// A capability that turns text into fixed-dimension vectors.
///
/// Index builds use [`embed_batch`](Self::embed_batch); query-time lookups
/// use [`embed_query`](Self::embed_query). Both must produce vectors of the
/// same dimension for a given provider instance; the index treats the
/// dimension as opaque and checks it, never assumes it.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, preserving order and count.
    async fn embed_batch(&self, texts: &[String]) -> Result<EmbeddingBatch>;

    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f16>>;

    /// Dimension of vectors this provider produces.
    fn dimension(&self) -> usize;

    /// Short identifier for logs and the provider cache.
    fn provider_name(&self) -> &str;
}

/// Configuration for the local fastembed provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalEmbedConfig {
    /// Model name; must map to a model fastembed ships.
    pub model_name: String,
}

impl Default for LocalEmbedConfig {
    fn default() -> Self {
        Self {
            model_name: "all-MiniLM-L6-v2".to_string(),
        }
    }
}

impl LocalEmbedConfig {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
        }
    }

    fn model(&self) -> Result<EmbeddingModel> {
        match self.model_name.as_str() {
            "all-MiniLM-L6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
            "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
            other => Err(EmbedError::invalid_config(format!(
                "unknown embedding model: {other}"
            ))),
        }
    }
}

/// Local on-device embedding provider backed by fastembed ONNX models.
///
/// Inference is synchronous and CPU-bound, so every call runs on a blocking
/// task. The loaded model is shared behind a mutex; batches are serialized
/// through it.
#[derive(Clone)]
pub struct FastEmbedProvider {
    config: LocalEmbedConfig,
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("config", &self.config)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedProvider {
    /// Load the configured model and probe its dimension with a test
    /// embedding. Downloading (first use only) is handled by fastembed.
    pub async fn create(config: LocalEmbedConfig) -> Result<Self> {
        tracing::info!("loading embedding model: {}", config.model_name);
        let model_kind = config.model()?;

        let (model, dimension) =
            tokio::task::spawn_blocking(move || -> Result<(TextEmbedding, usize)> {
                let init_options =
                    InitOptions::new(model_kind).with_show_download_progress(false);
                let mut model = TextEmbedding::try_new(init_options)
                    .map_err(|e| EmbedError::Backend { source: e })?;

                // Probe the dimension instead of hard-coding it.
                let probe = model
                    .embed(vec!["probe".to_string()], None)
                    .map_err(|e| EmbedError::Backend { source: e })?;
                let dimension = probe.first().map(|v| v.len()).unwrap_or(0);
                Ok((model, dimension))
            })
            .await??;

        if dimension == 0 {
            return Err(EmbedError::invalid_config(
                "model produced an empty probe embedding",
            ));
        }
        tracing::info!("embedding model ready, dimension {dimension}");

        Ok(Self {
            config,
            model: Arc::new(Mutex::new(model)),
            dimension,
        })
    }
}

/// Convert f32 vectors to L2-normalized f16 vectors.
pub(crate) fn normalize_to_f16(embeddings: Vec<Vec<f32>>) -> Vec<Vec<f16>> {
    embeddings
        .into_iter()
        .map(|embedding| {
            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            let scale = if norm > 0.0 { 1.0 / norm } else { 1.0 };
            embedding
                .into_iter()
                .map(|x| f16::from_f32(x * scale))
                .collect()
        })
        .collect()
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<EmbeddingBatch> {
        if texts.is_empty() {
            return Ok(EmbeddingBatch::new(vec![]));
        }

        tracing::debug!("embedding {} texts", texts.len());
        let expected = texts.len();

        // Keep batches small to bound peak memory in the ONNX runtime.
        let inference_batch = 16;
        let mut all = Vec::with_capacity(expected);
        for window in texts.chunks(inference_batch) {
            let window = window.to_vec();
            let model = Arc::clone(&self.model);
            let batch = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
                let mut guard = model.lock().unwrap();
                guard
                    .embed(window, None)
                    .map_err(|e| EmbedError::Backend { source: e })
            })
            .await??;
            all.extend(normalize_to_f16(batch));
        }

        if all.len() != expected {
            return Err(EmbedError::CountMismatch {
                expected,
                actual: all.len(),
            });
        }
        Ok(EmbeddingBatch::new(all))
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
        "fastembed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_infers_dimension_from_first_vector() {
        let batch = EmbeddingBatch::new(vec![
            vec![f16::from_f32(0.1), f16::from_f32(0.2), f16::from_f32(0.3)],
            vec![f16::from_f32(0.4), f16::from_f32(0.5), f16::from_f32(0.6)],
        ]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.dimension, 3);
        assert!(!batch.is_empty());
    }

    #[test]
    fn empty_batch_has_zero_dimension() {
        let batch = EmbeddingBatch::new(vec![]);
        assert_eq!(batch.dimension, 0);
        assert!(batch.is_empty());
    }

    #[test]
    fn unknown_model_name_is_rejected() {
        let config = LocalEmbedConfig::new("no-such-model");
        assert!(config.model().is_err());
    }

    #[test]
    fn normalization_produces_unit_vectors() {
        let out = normalize_to_f16(vec![vec![3.0, 4.0]]);
        let norm: f32 = out[0].iter().map(|x| x.to_f32() * x.to_f32()).sum();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[test]
    fn zero_vector_survives_normalization() {
        let out = normalize_to_f16(vec![vec![0.0, 0.0, 0.0]]);
        assert!(out[0].iter().all(|x| x.to_f32() == 0.0));
    }

    #[tokio::test]
    #[ignore] // Downloads the real MiniLM model; run with: cargo test -- --ignored
    async fn minilm_embeds_and_ranks_related_text_closer() -> Result<()> {
        let provider = FastEmbedProvider::create(LocalEmbedConfig::default()).await?;
        assert_eq!(provider.dimension(), 384);

        let texts = vec![
            "a cat sat on the mat".to_string(),
            "a kitten played with yarn".to_string(),
            "the stock market closed lower today".to_string(),
        ];
        let batch = provider.embed_batch(&texts).await?;
        assert_eq!(batch.len(), 3);

        let dot = |a: &[f16], b: &[f16]| -> f32 {
            a.iter()
                .zip(b.iter())
                .map(|(x, y)| x.to_f32() * y.to_f32())
                .sum()
        };
        let cats = dot(&batch.embeddings[0], &batch.embeddings[1]);
        let finance = dot(&batch.embeddings[0], &batch.embeddings[2]);
        assert!(cats > finance, "related texts should be closer: {cats} vs {finance}");
        Ok(())
    }
}
