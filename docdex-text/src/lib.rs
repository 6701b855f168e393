//! docdex-text: text adapters for the docdex indexing pipeline.
//!
//! This crate holds the leaf-level text processing the indexer depends on:
//!
//! - [`extract`]: pulling plain text out of files on disk, behind the
//!   [`TextExtractor`](extract::TextExtractor) trait so unsupported formats
//!   degrade to "no text" instead of errors.
//! - [`chunk`]: deterministic splitting of extracted text into bounded,
//!   non-overlapping chunks, the unit of embedding and retrieval.
//! - [`tags`]: cheap keyword derivation used for display next to results.

pub mod chunk;
pub mod extract;
pub mod tags;

pub use chunk::Chunker;
pub use extract::{PlainTextExtractor, TextExtractor};
pub use tags::{TagPolicy, derive_tags};
