//! docdex-index: local document indexing and semantic retrieval
//!
//! This crate ties the text and embedding layers together into a searchable
//! index over a folder of documents. It owns the vector index, the persisted
//! snapshot format, the SQLite metadata store, and the rebuild machinery.
//!
//! ## Key Modules
//!
//! - **[`vector_index`]**: exact nearest-neighbor search over f16 vectors
//! - **[`snapshot`]**: the on-disk index triple (vectors, chunks, tags)
//! - **[`metadata`]**: SQLite store for file records, history, preferences
//! - **[`pipeline`]**: full builds (walk, extract, chunk, embed, commit)
//! - **[`service`]** / **[`search`]**: the long-lived service and its query API
//! - **[`watcher`]**: filesystem-driven rebuilds
//!
//! ## Architecture
//!
//! ```text
//! Files → Extractor → Chunker → Embeddings → FlatIndex + SQLite metadata
//!   ↑                                              ↓
//! WatchedIndexer  →  IndexService (snapshot swap)  →  search / answer
//! ```

pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod search;
pub mod service;
pub mod snapshot;
pub mod vector_index;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{BuildError, IndexError, SearchError};
pub use metadata::{FileRecord, MetadataStore, SearchHistoryEntry};
pub use pipeline::{BuildOutput, IndexPipeline, PipelineConfig};
pub use search::SearchResult;
pub use service::IndexService;
pub use snapshot::IndexSnapshot;
pub use vector_index::{FlatIndex, SearchHit};
pub use watcher::WatchedIndexer;
