//! # docdex-embed
//!
//! Embedding providers for docdex, behind a single async trait so the index
//! never knows which backend produced its vectors.
//!
//! - [`provider`]: the [`EmbeddingProvider`] trait plus the local
//!   fastembed-backed implementation (ONNX models, no network at query time).
//! - [`http`]: a remote OpenAI-compatible endpoint provider for API-key
//!   setups, with per-request timeouts.
//! - [`cache`]: process-wide provider cache keyed by configuration,
//!   created lazily and retained for the process lifetime.
//! - [`answer`]: answer synthesis over retrieved context, with a model-free
//!   extractive fallback.
//!
//! Vectors are half-precision ([`half::f16`]) and L2-normalized; the
//! dimension is always discovered from the model, never configured.
//!
//! All fallible operations return [`Result`] with [`EmbedError`], which
//! distinguishes configuration problems from backend and transport failures.

pub mod answer;
pub mod cache;
pub mod error;
pub mod http;
pub mod provider;

pub use answer::{AnswerGenerator, ExtractiveAnswerer, extract_answer, summarize};
pub use cache::{ProviderConfig, get_provider};
pub use error::{EmbedError, Result};
pub use http::{HttpEmbedConfig, HttpEmbeddingProvider};
pub use provider::{EmbeddingBatch, EmbeddingProvider, FastEmbedProvider, LocalEmbedConfig};
