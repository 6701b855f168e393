//! Filesystem watcher driving full rebuilds of the index.
//!
//! Change events under the document root are debounced, funneled through a
//! bounded channel, and coalesced: a burst of edits triggers one rebuild,
//! not one per file. Rebuilds go through [`IndexService::rebuild`], so they
//! inherit its single-build guarantee and its failure behavior (previous
//! snapshot stays active).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::BuildError;
use crate::service::IndexService;

/// Handle to a running watch loop. Dropping it stops the watcher; the
/// consumer task ends once the channel drains.
pub struct WatchedIndexer {
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
    consumer: tokio::task::JoinHandle<()>,
}

impl WatchedIndexer {
    /// Watches `root` recursively and rebuilds the index after changes,
    /// waiting `quiet_period` for bursts to settle.
    pub fn spawn(
        service: Arc<IndexService>,
        root: PathBuf,
        quiet_period: Duration,
    ) -> Result<Self> {
        let (events_tx, events_rx) = mpsc::channel::<()>(128);

        // Only the debouncer holds a sender: once it is dropped the channel
        // closes and the consumer drains out.
        let consumer = tokio::task::spawn(Self::consume(
            service,
            root.clone(),
            events_rx,
            quiet_period,
        ));

        let mut debouncer = notify_debouncer_mini::new_debouncer(
            quiet_period,
            move |res: notify_debouncer_mini::DebounceEventResult| {
                // Runs on the notify thread, not in async context. A full
                // channel just means a rebuild is already pending, so the
                // notification is safely droppable.
                if res.ok().is_some_and(|events| !events.is_empty()) {
                    let _ = events_tx.try_send(());
                }
            },
        )?;
        debouncer
            .watcher()
            .watch(&root, notify::RecursiveMode::Recursive)?;
        info!(root = %root.display(), "watching for document changes");

        Ok(Self {
            _debouncer: debouncer,
            consumer,
        })
    }

    /// Single consumer: drains queued notifications into one rebuild each
    /// cycle. A build already in progress defers one quiet period and
    /// retries instead of stacking requests.
    async fn consume(
        service: Arc<IndexService>,
        root: PathBuf,
        mut events_rx: mpsc::Receiver<()>,
        quiet_period: Duration,
    ) {
        while events_rx.recv().await.is_some() {
            // coalesce whatever queued while we were away
            while events_rx.try_recv().is_ok() {}

            loop {
                match service.rebuild(&root).await {
                    Ok(output) => {
                        info!(
                            files = output.files_indexed,
                            chunks = output.snapshot.len(),
                            "rebuild after change complete"
                        );
                        break;
                    }
                    Err(BuildError::BuildInProgress) => {
                        debug!("rebuild already running, deferring");
                        tokio::time::sleep(quiet_period).await;
                    }
                    Err(error) => {
                        warn!(%error, "rebuild after change failed, keeping previous index");
                        break;
                    }
                }
            }
        }
    }

    /// Waits for the consumer task after the watcher is stopped.
    pub async fn join(self) {
        drop(self._debouncer);
        let _ = self.consumer.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataStore;
    use crate::pipeline::{IndexPipeline, PipelineConfig};
    use crate::testing::StubProvider;
    use docdex_text::PlainTextExtractor;
    use std::fs;
    use tracing_test::traced_test;

    async fn service(docs_store_dir: &std::path::Path) -> Arc<IndexService> {
        let store = MetadataStore::open_memory().await.unwrap();
        let pipeline = IndexPipeline::new(
            Arc::new(PlainTextExtractor),
            Arc::new(StubProvider::new(8)),
            store,
            PipelineConfig::default(),
        );
        Arc::new(IndexService::new(
            pipeline,
            Some(docs_store_dir.join("index")),
        ))
    }

    #[traced_test]
    #[tokio::test]
    async fn change_triggers_a_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir(&docs).unwrap();
        let state = dir.path().join("state");
        fs::create_dir(&state).unwrap();

        let service = service(&state).await;
        let watcher = WatchedIndexer::spawn(
            service.clone(),
            docs.clone(),
            Duration::from_millis(100),
        )
        .unwrap();

        fs::write(docs.join("new.txt"), "freshly written document").unwrap();

        // wait out the debounce plus some slack for the rebuild
        let mut activated = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if service.current().await.is_some() {
                activated = true;
                break;
            }
        }
        assert!(activated, "watcher never produced an active snapshot");

        let snapshot = service.current().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        watcher.join().await;
    }

    #[traced_test]
    #[tokio::test]
    async fn burst_of_events_coalesces() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir(&docs).unwrap();

        let service = service(dir.path()).await;
        let watcher =
            WatchedIndexer::spawn(service.clone(), docs.clone(), Duration::from_millis(200))
                .unwrap();

        for i in 0..10 {
            fs::write(docs.join(format!("doc{i}.txt")), format!("document {i}")).unwrap();
        }

        let mut indexed = 0;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if let Some(snapshot) = service.current().await {
                indexed = snapshot.len();
                if indexed == 10 {
                    break;
                }
            }
        }
        assert_eq!(indexed, 10, "all burst files should land in one index");
        watcher.join().await;
    }
}
