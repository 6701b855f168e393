//! Full index build: walk, extract, chunk, embed, commit.
//!
//! A build is all-or-nothing from the outside. Chunks and staged file
//! records accumulate in memory; only after embedding and snapshot
//! construction succeed does the metadata store get updated, so a failed
//! build leaves the previous generation fully intact.

use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use docdex_embed::EmbeddingProvider;
use docdex_text::{Chunker, TagPolicy, TextExtractor, derive_tags};
use ignore::WalkBuilder;
use tracing::{debug, info, warn};

use crate::error::BuildError;
use crate::metadata::{FileRecord, MetadataStore, file_record_for};
use crate::snapshot::IndexSnapshot;
use crate::vector_index::FlatIndex;

/// Tunables for a build.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_chunk_len: usize,
    pub tag_policy: TagPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_chunk_len: docdex_text::chunk::DEFAULT_MAX_CHUNK_LEN,
            tag_policy: TagPolicy::default(),
        }
    }
}

/// Result of a successful build.
#[derive(Debug)]
pub struct BuildOutput {
    pub snapshot: Arc<IndexSnapshot>,
    pub files_indexed: usize,
    /// Files that were walked but contributed nothing (unreadable, not
    /// extractable, or empty after chunking).
    pub files_skipped: usize,
}

/// Called after each file is staged: number of files staged so far and the
/// file just processed.
pub type ProgressFn = dyn Fn(usize, &Path) + Send + Sync;

/// Builds an [`IndexSnapshot`] from a document root.
pub struct IndexPipeline {
    extractor: Arc<dyn TextExtractor>,
    provider: Arc<dyn EmbeddingProvider>,
    store: MetadataStore,
    config: PipelineConfig,
    progress: Option<Box<ProgressFn>>,
}

impl IndexPipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        provider: Arc<dyn EmbeddingProvider>,
        store: MetadataStore,
        config: PipelineConfig,
    ) -> Self {
        Self {
            extractor,
            provider,
            store,
            config,
            progress: None,
        }
    }

    /// Report per-file progress during builds through `callback`.
    pub fn with_progress(mut self, callback: Box<ProgressFn>) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Walks `root` and builds a fresh snapshot from every extractable file.
    ///
    /// One bad file never aborts the build; it is logged and skipped. The
    /// metadata store is only touched after the index is fully constructed.
    pub async fn build(&self, root: &Path) -> Result<BuildOutput, BuildError> {
        let chunker = Chunker::new(self.config.max_chunk_len);

        let mut chunks: Vec<String> = Vec::new();
        let mut tags: Vec<Vec<String>> = Vec::new();
        let mut staged: Vec<FileRecord> = Vec::new();
        let mut files_skipped = 0usize;

        // Lexical order makes offsets deterministic for identical trees.
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .hidden(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    warn!(%error, "skipping unreadable directory entry");
                    files_skipped += 1;
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();

            let text = match self.extractor.extract(path) {
                Ok(Some(text)) => text,
                Ok(None) => {
                    debug!(path = %path.display(), "not an extractable document");
                    files_skipped += 1;
                    continue;
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "extraction failed, skipping file");
                    files_skipped += 1;
                    continue;
                }
            };

            let file_chunks = chunker.split(&text);
            if file_chunks.is_empty() {
                debug!(path = %path.display(), "no content after chunking");
                files_skipped += 1;
                continue;
            }

            let start = chunks.len() as i64;
            match self.config.tag_policy {
                TagPolicy::PerFile => {
                    // First chunk only, so tag cost stays bounded for large files.
                    let file_tags = derive_tags(&file_chunks[0]);
                    tags.extend(std::iter::repeat_n(file_tags, file_chunks.len()));
                }
                TagPolicy::PerChunk => {
                    tags.extend(file_chunks.iter().map(|c| derive_tags(c)));
                }
            }
            let chunk_count = file_chunks.len();
            chunks.extend(file_chunks);

            let (size_bytes, modified_unix) = match std::fs::metadata(path) {
                Ok(meta) => {
                    let modified = meta
                        .modified()
                        .ok()
                        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                        .map(|d| d.as_secs() as i64)
                        .unwrap_or(0);
                    (meta.len(), modified)
                }
                Err(_) => (text.len() as u64, 0),
            };

            // Same path walked twice keeps only the latest staging.
            let record = file_record_for(path, size_bytes, modified_unix, chunk_count, start);
            staged.retain(|r| r.path != record.path);
            staged.push(record);

            info!(path = %path.display(), chunks = chunk_count, "staged file");
            if let Some(progress) = &self.progress {
                progress(staged.len(), path);
            }
        }

        if chunks.is_empty() {
            return Err(BuildError::NoDocuments);
        }

        info!(
            files = staged.len(),
            chunks = chunks.len(),
            "embedding staged chunks"
        );
        let batch = self.provider.embed_batch(&chunks).await?;

        let mut index = FlatIndex::new(batch.dimension)?;
        index.add_batch(&batch.embeddings)?;
        let snapshot = Arc::new(IndexSnapshot::new(index, chunks, tags)?);

        self.store
            .replace_all_files(&staged)
            .await
            .map_err(BuildError::Metadata)?;

        Ok(BuildOutput {
            snapshot,
            files_indexed: staged.len(),
            files_skipped,
        })
    }
}
