//! On-disk snapshot of a built index.
//!
//! A snapshot is a triple of files next to each other:
//! - `<base>`: the vector blob, a fixed header then raw f16 vectors,
//! - `<base>_docs`: JSON array of chunk texts, offset-aligned,
//! - `<base>_tags`: JSON array of per-chunk tag lists, offset-aligned.
//!
//! All three are written via temp-file + rename so a crash mid-save leaves
//! either the old snapshot or the new one, never a torn file. Loading
//! validates the triple as a unit and refuses anything inconsistent.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use half::f16;
use tracing::{debug, info};

use crate::error::IndexError;
use crate::vector_index::FlatIndex;

const MAGIC: &[u8; 8] = b"DOCDEXV1";
const HEADER_LEN: usize = MAGIC.len() + 8; // magic + dimension (u32) + count (u32)

/// An immutable built index: vectors plus the chunk texts and tags that
/// produced them, aligned by offset.
///
/// Construction enforces `index.count() == chunks.len() == tags.len()`; a
/// snapshot handed out behind an [`Arc`] therefore never needs re-checking.
#[derive(Debug)]
pub struct IndexSnapshot {
    index: FlatIndex,
    chunks: Vec<String>,
    tags: Vec<Vec<String>>,
}

impl IndexSnapshot {
    pub fn new(
        index: FlatIndex,
        chunks: Vec<String>,
        tags: Vec<Vec<String>>,
    ) -> Result<Self, IndexError> {
        if index.count() != chunks.len() || chunks.len() != tags.len() {
            return Err(IndexError::CorruptSnapshot {
                reason: format!(
                    "misaligned triple: {} vectors, {} chunks, {} tag lists",
                    index.count(),
                    chunks.len(),
                    tags.len()
                ),
            });
        }
        Ok(Self {
            index,
            chunks,
            tags,
        })
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    /// Number of indexed chunks (equal to the vector count).
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk text at an index offset, if the offset is in range.
    pub fn chunk(&self, offset: i64) -> Option<&str> {
        usize::try_from(offset)
            .ok()
            .and_then(|i| self.chunks.get(i))
            .map(String::as_str)
    }

    /// Tags for the chunk at an index offset.
    pub fn tags(&self, offset: i64) -> Option<&[String]> {
        usize::try_from(offset)
            .ok()
            .and_then(|i| self.tags.get(i))
            .map(Vec::as_slice)
    }

    fn docs_path(base: &Path) -> PathBuf {
        sibling_with_suffix(base, "_docs")
    }

    fn tags_path(base: &Path) -> PathBuf {
        sibling_with_suffix(base, "_tags")
    }

    /// Persists the triple under `base`. Each file is written to a temp
    /// sibling first and renamed into place.
    pub fn save(&self, base: &Path) -> Result<(), IndexError> {
        if let Some(parent) = base.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut blob = Vec::with_capacity(HEADER_LEN + self.index.raw().len() * 2);
        blob.extend_from_slice(MAGIC);
        blob.extend_from_slice(&(self.index.dimension() as u32).to_le_bytes());
        blob.extend_from_slice(&(self.index.count() as u32).to_le_bytes());
        blob.extend_from_slice(bytemuck::cast_slice::<f16, u8>(self.index.raw()));

        write_atomic(base, &blob)?;
        write_atomic(&Self::docs_path(base), &serde_json::to_vec(&self.chunks)?)?;
        write_atomic(&Self::tags_path(base), &serde_json::to_vec(&self.tags)?)?;

        info!(
            base = %base.display(),
            chunks = self.len(),
            dimension = self.index.dimension(),
            "saved index snapshot"
        );
        Ok(())
    }

    /// Loads and validates the triple under `base`.
    ///
    /// A fully absent triple is reported as `Ok(None)`; a partially present
    /// one is [`IndexError::TripleMismatch`], since that means a previous
    /// save or an external process damaged the snapshot.
    pub fn load(base: &Path) -> Result<Option<Arc<Self>>, IndexError> {
        let docs_path = Self::docs_path(base);
        let tags_path = Self::tags_path(base);

        let present: Vec<(&str, bool)> = [
            ("vectors", base.exists()),
            ("docs", docs_path.exists()),
            ("tags", tags_path.exists()),
        ]
        .into();
        if present.iter().all(|(_, p)| !p) {
            return Ok(None);
        }
        if !present.iter().all(|(_, p)| *p) {
            let join = |want: bool| {
                present
                    .iter()
                    .filter(|(_, p)| *p == want)
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            return Err(IndexError::TripleMismatch {
                present: join(true),
                missing: join(false),
            });
        }

        let blob = fs::read(base)?;
        if blob.len() < HEADER_LEN || &blob[..MAGIC.len()] != MAGIC {
            return Err(IndexError::CorruptSnapshot {
                reason: format!("bad header in {}", base.display()),
            });
        }
        let dimension = u32::from_le_bytes(blob[8..12].try_into().unwrap()) as usize;
        let count = u32::from_le_bytes(blob[12..16].try_into().unwrap()) as usize;
        let payload = &blob[HEADER_LEN..];
        if dimension == 0 || payload.len() != count * dimension * 2 {
            return Err(IndexError::CorruptSnapshot {
                reason: format!(
                    "payload of {} bytes does not match {count} vectors of dimension {dimension}",
                    payload.len()
                ),
            });
        }
        let mut data = vec![f16::ZERO; count * dimension];
        bytemuck::cast_slice_mut::<f16, u8>(&mut data).copy_from_slice(payload);
        let index = FlatIndex::from_raw(dimension, data)?;

        let chunks: Vec<String> = serde_json::from_slice(&fs::read(&docs_path)?)?;
        let tags: Vec<Vec<String>> = serde_json::from_slice(&fs::read(&tags_path)?)?;

        let snapshot = Self::new(index, chunks, tags)?;
        debug!(
            base = %base.display(),
            chunks = snapshot.len(),
            dimension,
            "loaded index snapshot"
        );
        Ok(Some(Arc::new(snapshot)))
    }
}

fn sibling_with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    base.with_file_name(name)
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), IndexError> {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> IndexSnapshot {
        let mut index = FlatIndex::new(2).unwrap();
        index
            .add(&[f16::from_f32(1.0), f16::from_f32(0.0)])
            .unwrap();
        index
            .add(&[f16::from_f32(0.0), f16::from_f32(1.0)])
            .unwrap();
        IndexSnapshot::new(
            index,
            vec!["alpha chunk".into(), "beta chunk".into()],
            vec![vec!["alpha".into()], vec!["beta".into()]],
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_misaligned_triple() {
        let index = FlatIndex::new(2).unwrap();
        let err = IndexSnapshot::new(index, vec!["orphan".into()], vec![]).unwrap_err();
        assert!(matches!(err, IndexError::CorruptSnapshot { .. }));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("faq_index");
        let original = sample_snapshot();
        original.save(&base).unwrap();

        let loaded = IndexSnapshot::load(&base).unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.chunk(0), Some("alpha chunk"));
        assert_eq!(loaded.tags(1), Some(&["beta".to_string()][..]));

        // identical search behaviour after the round trip
        let query = [f16::from_f32(0.9), f16::from_f32(0.1)];
        let before = original.index().search(&query, 2).unwrap();
        let after = loaded.index().search(&query, 2).unwrap();
        assert_eq!(
            before.iter().map(|h| h.offset).collect::<Vec<_>>(),
            after.iter().map(|h| h.offset).collect::<Vec<_>>()
        );
    }

    #[test]
    fn load_missing_triple_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("never_saved");
        assert!(IndexSnapshot::load(&base).unwrap().is_none());
    }

    #[test]
    fn load_partial_triple_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("faq_index");
        sample_snapshot().save(&base).unwrap();
        fs::remove_file(sibling_with_suffix(&base, "_tags")).unwrap();

        let err = IndexSnapshot::load(&base).unwrap_err();
        assert!(matches!(err, IndexError::TripleMismatch { .. }));
    }

    #[test]
    fn load_truncated_blob_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("faq_index");
        sample_snapshot().save(&base).unwrap();

        let blob = fs::read(&base).unwrap();
        fs::write(&base, &blob[..blob.len() - 3]).unwrap();

        let err = IndexSnapshot::load(&base).unwrap_err();
        assert!(matches!(err, IndexError::CorruptSnapshot { .. }));
    }

    #[test]
    fn load_rejects_doc_count_drift() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("faq_index");
        sample_snapshot().save(&base).unwrap();
        fs::write(
            sibling_with_suffix(&base, "_docs"),
            serde_json::to_vec(&vec!["only one".to_string()]).unwrap(),
        )
        .unwrap();

        let err = IndexSnapshot::load(&base).unwrap_err();
        assert!(matches!(err, IndexError::CorruptSnapshot { .. }));
    }

    #[test]
    fn chunk_lookup_out_of_range_is_none() {
        let snapshot = sample_snapshot();
        assert!(snapshot.chunk(-1).is_none());
        assert!(snapshot.chunk(2).is_none());
    }
}
