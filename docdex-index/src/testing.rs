//! Deterministic embedding provider for tests.
//!
//! Hashes words into buckets so texts sharing vocabulary land close together
//! in vector space, with a small synonym table so semantic-ranking tests can
//! assert that "feline" retrieves the cat document.

use async_trait::async_trait;
use docdex_embed::{EmbedError, EmbeddingBatch, EmbeddingProvider};
use half::f16;
use std::hash::{DefaultHasher, Hash, Hasher};

pub(crate) struct StubProvider {
    dimension: usize,
    fail: bool,
}

impl StubProvider {
    pub(crate) fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail: false,
        }
    }

    /// A provider whose every call fails, for build-failure paths.
    pub(crate) fn failing(dimension: usize) -> Self {
        Self {
            dimension,
            fail: true,
        }
    }

    fn canonical(word: &str) -> &str {
        match word {
            "feline" | "felines" | "kitten" | "kittens" => "cat",
            "canine" | "canines" | "puppy" | "puppies" => "dog",
            other => other,
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f16> {
        let mut accum = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();
        for word in lowered.split_whitespace() {
            let word: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
            if word.is_empty() {
                continue;
            }
            let mut hasher = DefaultHasher::new();
            Self::canonical(&word).hash(&mut hasher);
            accum[(hasher.finish() % self.dimension as u64) as usize] += 1.0;
        }
        let norm = accum.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut accum {
                *v /= norm;
            }
        }
        accum.into_iter().map(f16::from_f32).collect()
    }
}

#[async_trait]
impl EmbeddingProvider for StubProvider {
    async fn embed_batch(&self, texts: &[String]) -> docdex_embed::Result<EmbeddingBatch> {
        if self.fail {
            return Err(EmbedError::Backend {
                source: anyhow::anyhow!("stub provider configured to fail"),
            });
        }
        let embeddings = texts.iter().map(|t| self.embed_one(t)).collect();
        Ok(EmbeddingBatch {
            embeddings,
            dimension: self.dimension,
        })
    }

    async fn embed_query(&self, text: &str) -> docdex_embed::Result<Vec<f16>> {
        if self.fail {
            return Err(EmbedError::Backend {
                source: anyhow::anyhow!("stub provider configured to fail"),
            });
        }
        Ok(self.embed_one(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "stub"
    }
}
