//! Long-lived index service: one active snapshot, swapped atomically.
//!
//! Queries clone the current `Arc<IndexSnapshot>` and run against it even
//! while a rebuild is in flight; they observe either the pre-build or the
//! post-build index in full, never a mix. The swap happens only after a
//! build has fully succeeded (including persistence), so any failure leaves
//! the previous generation active and queryable.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use docdex_embed::EmbeddingProvider;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::error::{BuildError, IndexError};
use crate::metadata::MetadataStore;
use crate::pipeline::{BuildOutput, IndexPipeline};
use crate::snapshot::IndexSnapshot;

/// Owns the pipeline, the active snapshot slot, and the optional on-disk
/// snapshot location.
pub struct IndexService {
    pipeline: IndexPipeline,
    current: RwLock<Option<Arc<IndexSnapshot>>>,
    /// Held for the duration of a build; `try_lock` failure means one is
    /// already running.
    build_guard: Mutex<()>,
    snapshot_base: Option<PathBuf>,
}

impl IndexService {
    pub fn new(pipeline: IndexPipeline, snapshot_base: Option<PathBuf>) -> Self {
        Self {
            pipeline,
            current: RwLock::new(None),
            build_guard: Mutex::new(()),
            snapshot_base,
        }
    }

    pub fn store(&self) -> &MetadataStore {
        self.pipeline.store()
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        self.pipeline.provider()
    }

    /// The active snapshot, if any. Cheap; clones an `Arc`.
    pub async fn current(&self) -> Option<Arc<IndexSnapshot>> {
        self.current.read().await.clone()
    }

    /// Rebuilds the index from `root`, persists it (when a snapshot base is
    /// configured), and swaps it in.
    ///
    /// At most one build runs at a time; a second request fails fast with
    /// [`BuildError::BuildInProgress`] rather than queueing. On any failure
    /// the previously active snapshot stays in place.
    pub async fn rebuild(&self, root: &Path) -> Result<BuildOutput, BuildError> {
        let Ok(_guard) = self.build_guard.try_lock() else {
            return Err(BuildError::BuildInProgress);
        };

        let output = self.pipeline.build(root).await?;

        if let Some(base) = &self.snapshot_base {
            output.snapshot.save(base)?;
        }

        *self.current.write().await = Some(output.snapshot.clone());
        info!(
            files = output.files_indexed,
            skipped = output.files_skipped,
            chunks = output.snapshot.len(),
            "index rebuilt and activated"
        );
        Ok(output)
    }

    /// Loads the persisted snapshot (if the service has a snapshot base and
    /// a complete triple exists there) into the active slot.
    ///
    /// Returns whether a snapshot was activated.
    pub async fn load(&self) -> Result<bool, IndexError> {
        let Some(base) = &self.snapshot_base else {
            return Ok(false);
        };
        match IndexSnapshot::load(base)? {
            Some(snapshot) => {
                info!(chunks = snapshot.len(), "loaded persisted index");
                *self.current.write().await = Some(snapshot);
                Ok(true)
            }
            None => {
                warn!(base = %base.display(), "no persisted index found");
                Ok(false)
            }
        }
    }
}
