//! Query-time retrieval over the active snapshot.

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::SearchError;
use crate::service::IndexService;

/// One retrieved chunk, closest first in a result list.
///
/// `file_path`/`file_name` are `None` when the metadata store has no record
/// covering the chunk's offset, which can happen if the store and snapshot
/// diverge; the chunk itself is still returned.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub offset: i64,
    pub chunk_text: String,
    pub distance: f32,
    pub tags: Vec<String>,
    pub file_path: Option<PathBuf>,
    pub file_name: Option<String>,
}

impl IndexService {
    /// Embeds `text` and returns up to `k` nearest chunks, ascending by
    /// squared L2 distance.
    ///
    /// Fewer than `k` results only means the index holds fewer chunks; an
    /// absent index is [`SearchError::NoIndex`], distinct from zero hits.
    /// Each search is appended to the history table; a history write failure
    /// is logged, never surfaced.
    pub async fn search(&self, text: &str, k: usize) -> Result<Vec<SearchResult>, SearchError> {
        let snapshot = self.current().await.ok_or(SearchError::NoIndex)?;
        let started = Instant::now();

        let query = self.provider().embed_query(text).await?;
        if query.len() != snapshot.index().dimension() {
            return Err(SearchError::DimensionMismatch {
                expected: snapshot.index().dimension(),
                actual: query.len(),
            });
        }

        let hits = snapshot.index().search(&query, k)?;
        let mut results = Vec::with_capacity(k);
        for hit in hits {
            if hit.is_sentinel() {
                continue;
            }
            // Stale-offset guard: an index larger than its chunk list would
            // have failed snapshot validation, but never trust it here.
            let Some(chunk_text) = snapshot.chunk(hit.offset) else {
                warn!(offset = hit.offset, "hit beyond chunk list, dropping");
                continue;
            };
            let record = self
                .store()
                .file_for_offset(hit.offset)
                .await
                .map_err(SearchError::Metadata)?;

            results.push(SearchResult {
                offset: hit.offset,
                chunk_text: chunk_text.to_string(),
                distance: hit.distance,
                tags: snapshot.tags(hit.offset).unwrap_or_default().to_vec(),
                file_path: record.as_ref().map(|r| PathBuf::from(&r.path)),
                file_name: record.map(|r| r.filename),
            });
        }

        let elapsed_ms = started.elapsed().as_millis() as i64;
        if let Err(error) = self
            .store()
            .record_search(text, results.len() as i64, elapsed_ms)
            .await
        {
            warn!(%error, "failed to record search history");
        }
        debug!(query = text, results = results.len(), elapsed_ms, "search complete");
        Ok(results)
    }

    /// Retrieves context for `question` and synthesizes an extractive answer.
    ///
    /// `Ok(None)` means retrieval found nothing to ground an answer in.
    pub async fn answer(&self, question: &str, k: usize) -> Result<Option<String>, SearchError> {
        let results = self.search(question, k).await?;
        if results.is_empty() {
            return Ok(None);
        }

        let context = results
            .iter()
            .map(|r| r.chunk_text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let answer = docdex_embed::extract_answer(&context, question)
            .unwrap_or_else(|| docdex_embed::summarize(&context));
        Ok(Some(answer))
    }
}
