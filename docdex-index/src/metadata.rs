//! SQLite metadata store for indexed files, search history, and preferences.
//!
//! The vector store itself lives in the snapshot files; this database only
//! tracks which file owns which contiguous offset range, so search results
//! can be attributed back to their source documents.
//!
//! ## Schema
//!
//! ```sql
//! CREATE TABLE files (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     path TEXT UNIQUE NOT NULL,       -- natural key, one row per file
//!     filename TEXT NOT NULL,
//!     extension TEXT,
//!     size_bytes INTEGER NOT NULL,
//!     modified_date TIMESTAMP NOT NULL,
//!     indexed_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
//!     chunk_count INTEGER NOT NULL,
//!     vector_start_idx INTEGER NOT NULL,  -- inclusive
//!     vector_end_idx INTEGER NOT NULL     -- exclusive
//! );
//!
//! CREATE TABLE search_history (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     query TEXT NOT NULL,
//!     timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
//!     result_count INTEGER NOT NULL,
//!     execution_time_ms INTEGER NOT NULL
//! );
//!
//! CREATE TABLE preferences (key TEXT PRIMARY KEY, value TEXT NOT NULL);
//! ```
//!
//! All writes to `files` go through [`MetadataStore::replace_all_files`],
//! which clears and repopulates in one transaction: a crash mid-build can
//! never leave a partially populated table.

use anyhow::Result;
use chrono::NaiveDateTime;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::debug;

/// One indexed file and the offset range its chunks occupy in the vector
/// index. `vector_start_idx..vector_end_idx` is half-open and
/// `vector_end_idx - vector_start_idx == chunk_count`.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub id: Option<i64>,
    /// Absolute path, the natural key.
    pub path: String,
    pub filename: String,
    pub extension: Option<String>,
    pub size_bytes: i64,
    /// Last modification time (Unix timestamp).
    pub modified_date: i64,
    pub indexed_date: Option<NaiveDateTime>,
    pub chunk_count: i64,
    pub vector_start_idx: i64,
    pub vector_end_idx: i64,
}

/// A past query with its outcome, newest first in listings.
#[derive(Debug, Clone)]
pub struct SearchHistoryEntry {
    pub id: i64,
    pub query: String,
    pub timestamp: NaiveDateTime,
    pub result_count: i64,
    pub execution_time_ms: i64,
}

/// SQLite-backed metadata store.
///
/// Cloning is cheap (the pool is shared). Concurrent readers are fine under
/// WAL; writer contention is bounded by the busy timeout.
#[derive(Clone, Debug)]
pub struct MetadataStore {
    pool: SqlitePool,
}

impl MetadataStore {
    /// Opens (creating if needed) the metadata database under `base`.
    pub async fn open(base: &Path) -> Result<Self> {
        let db_path = base.join("docdex.db");
        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
                .create_if_missing(true)
                .auto_vacuum(sqlx::sqlite::SqliteAutoVacuum::Full)
                .optimize_on_close(true, 1 << 10),
        )
        .await?;
        Self::new_with_pool(pool).await
    }

    /// Opens an in-memory store for testing.
    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        Self::new_with_pool(pool).await
    }

    async fn new_with_pool(pool: SqlitePool) -> Result<Self> {
        Self::create_tables(&pool).await?;
        Ok(Self { pool })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT UNIQUE NOT NULL,
                filename TEXT NOT NULL,
                extension TEXT,
                size_bytes INTEGER NOT NULL,
                modified_date TIMESTAMP NOT NULL,
                indexed_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                chunk_count INTEGER NOT NULL,
                vector_start_idx INTEGER NOT NULL,
                vector_end_idx INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS search_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query TEXT NOT NULL,
                timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                result_count INTEGER NOT NULL,
                execution_time_ms INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_range ON files(vector_start_idx, vector_end_idx)")
            .execute(pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_history_timestamp ON search_history(timestamp)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Clears the files table and repopulates it from `records`, atomically.
    ///
    /// This is the only write path for file metadata: either every record of
    /// the new build lands, or none do and the previous generation survives.
    pub async fn replace_all_files(&self, records: &[FileRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM files").execute(&mut *tx).await?;
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO files
                    (path, filename, extension, size_bytes, modified_date,
                     indexed_date, chunk_count, vector_start_idx, vector_end_idx)
                VALUES (?1, ?2, ?3, ?4, datetime(?5, 'unixepoch'), datetime('now'), ?6, ?7, ?8)
                "#,
            )
            .bind(&record.path)
            .bind(&record.filename)
            .bind(&record.extension)
            .bind(record.size_bytes)
            .bind(record.modified_date)
            .bind(record.chunk_count)
            .bind(record.vector_start_idx)
            .bind(record.vector_end_idx)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(files = records.len(), "replaced file metadata");
        Ok(())
    }

    /// All indexed files, ordered by path.
    pub async fn all_files(&self) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query(
            "SELECT id, path, filename, extension, size_bytes, \
             strftime('%s', modified_date) AS modified_unix, indexed_date, \
             chunk_count, vector_start_idx, vector_end_idx \
             FROM files ORDER BY path",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(file_record_from_row).collect()
    }

    pub async fn file_by_path(&self, path: &str) -> Result<Option<FileRecord>> {
        let row = sqlx::query(
            "SELECT id, path, filename, extension, size_bytes, \
             strftime('%s', modified_date) AS modified_unix, indexed_date, \
             chunk_count, vector_start_idx, vector_end_idx \
             FROM files WHERE path = ?1",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(file_record_from_row).transpose()
    }

    /// Finds the file whose offset range contains `offset`.
    ///
    /// Returns `None` when no range covers it, which signals index/metadata
    /// divergence rather than an error.
    pub async fn file_for_offset(&self, offset: i64) -> Result<Option<FileRecord>> {
        let row = sqlx::query(
            "SELECT id, path, filename, extension, size_bytes, \
             strftime('%s', modified_date) AS modified_unix, indexed_date, \
             chunk_count, vector_start_idx, vector_end_idx \
             FROM files WHERE vector_start_idx <= ?1 AND ?1 < vector_end_idx",
        )
        .bind(offset)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(file_record_from_row).transpose()
    }

    pub async fn record_search(
        &self,
        query: &str,
        result_count: i64,
        execution_time_ms: i64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO search_history (query, result_count, execution_time_ms) VALUES (?1, ?2, ?3)",
        )
        .bind(query)
        .bind(result_count)
        .bind(execution_time_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent searches first.
    pub async fn history(&self, limit: i64) -> Result<Vec<SearchHistoryEntry>> {
        let rows = sqlx::query(
            "SELECT id, query, timestamp, result_count, execution_time_ms \
             FROM search_history ORDER BY timestamp DESC, id DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SearchHistoryEntry {
                id: row.get("id"),
                query: row.get("query"),
                timestamp: row.get("timestamp"),
                result_count: row.get("result_count"),
                execution_time_ms: row.get("execution_time_ms"),
            })
            .collect())
    }

    pub async fn delete_history_item(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM search_history WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn clear_history(&self) -> Result<usize> {
        let result = sqlx::query("DELETE FROM search_history")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    pub async fn get_preference(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar("SELECT value FROM preferences WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    pub async fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO preferences (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn file_record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<FileRecord> {
    let modified_unix: Option<String> = row.get("modified_unix");
    Ok(FileRecord {
        id: Some(row.get("id")),
        path: row.get("path"),
        filename: row.get("filename"),
        extension: row.get("extension"),
        size_bytes: row.get("size_bytes"),
        modified_date: modified_unix.and_then(|s| s.parse().ok()).unwrap_or(0),
        indexed_date: row.get("indexed_date"),
        chunk_count: row.get("chunk_count"),
        vector_start_idx: row.get("vector_start_idx"),
        vector_end_idx: row.get("vector_end_idx"),
    })
}

/// Builds a [`FileRecord`] from filesystem metadata and chunk accounting.
pub fn file_record_for(
    path: &Path,
    size_bytes: u64,
    modified_unix: i64,
    chunk_count: usize,
    vector_start_idx: i64,
) -> FileRecord {
    FileRecord {
        id: None,
        path: path.to_string_lossy().into_owned(),
        filename: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        extension: path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase()),
        size_bytes: size_bytes as i64,
        modified_date: modified_unix,
        indexed_date: None,
        chunk_count: chunk_count as i64,
        vector_start_idx,
        vector_end_idx: vector_start_idx + chunk_count as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, start: i64, count: i64) -> FileRecord {
        FileRecord {
            id: None,
            path: path.to_string(),
            filename: Path::new(path)
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned(),
            extension: Path::new(path)
                .extension()
                .map(|e| e.to_string_lossy().into_owned()),
            size_bytes: 100,
            modified_date: 1_700_000_000,
            indexed_date: None,
            chunk_count: count,
            vector_start_idx: start,
            vector_end_idx: start + count,
        }
    }

    #[tokio::test]
    async fn replace_all_files_swaps_generations() {
        let store = MetadataStore::open_memory().await.unwrap();
        store
            .replace_all_files(&[record("/docs/a.txt", 0, 2), record("/docs/b.md", 2, 3)])
            .await
            .unwrap();
        assert_eq!(store.all_files().await.unwrap().len(), 2);

        store
            .replace_all_files(&[record("/docs/c.txt", 0, 1)])
            .await
            .unwrap();
        let files = store.all_files().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "/docs/c.txt");
        assert_eq!(files[0].modified_date, 1_700_000_000);
        assert!(files[0].indexed_date.is_some());
    }

    #[tokio::test]
    async fn file_for_offset_uses_half_open_ranges() {
        let store = MetadataStore::open_memory().await.unwrap();
        store
            .replace_all_files(&[record("/docs/a.txt", 0, 2), record("/docs/b.md", 2, 3)])
            .await
            .unwrap();

        async fn owner(store: &MetadataStore, offset: i64) -> Option<String> {
            store
                .file_for_offset(offset)
                .await
                .unwrap()
                .map(|r| r.path)
        }
        assert_eq!(owner(&store, 0).await.as_deref(), Some("/docs/a.txt"));
        assert_eq!(owner(&store, 1).await.as_deref(), Some("/docs/a.txt"));
        assert_eq!(owner(&store, 2).await.as_deref(), Some("/docs/b.md"));
        assert_eq!(owner(&store, 4).await.as_deref(), Some("/docs/b.md"));
        assert_eq!(owner(&store, 5).await, None);
    }

    #[tokio::test]
    async fn file_by_path_round_trips_fields() {
        let store = MetadataStore::open_memory().await.unwrap();
        store
            .replace_all_files(&[record("/docs/notes.md", 0, 4)])
            .await
            .unwrap();

        let found = store.file_by_path("/docs/notes.md").await.unwrap().unwrap();
        assert_eq!(found.filename, "notes.md");
        assert_eq!(found.extension.as_deref(), Some("md"));
        assert_eq!(found.chunk_count, 4);
        assert_eq!(found.vector_end_idx, 4);
        assert!(store.file_by_path("/missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn history_is_newest_first_and_deletable() {
        let store = MetadataStore::open_memory().await.unwrap();
        store.record_search("first query", 3, 12).await.unwrap();
        store.record_search("second query", 0, 4).await.unwrap();

        let history = store.history(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].query, "second query");
        assert_eq!(history[1].result_count, 3);

        assert!(store.delete_history_item(history[0].id).await.unwrap());
        assert!(!store.delete_history_item(history[0].id).await.unwrap());
        assert_eq!(store.clear_history().await.unwrap(), 1);
        assert!(store.history(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn preferences_upsert() {
        let store = MetadataStore::open_memory().await.unwrap();
        assert!(store.get_preference("theme").await.unwrap().is_none());
        store.set_preference("theme", "dark").await.unwrap();
        store.set_preference("theme", "light").await.unwrap();
        assert_eq!(
            store.get_preference("theme").await.unwrap().as_deref(),
            Some("light")
        );
    }
}
