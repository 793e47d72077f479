use crate::generation::IndexGeneration;
use crate::index::FlatL2Index;
use binwise_core::{BinwiseError, BinwiseResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Locations of the two files that make up one persisted generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPaths {
    /// Binary vector index.
    pub index: PathBuf,
    /// JSON name list, bound to the index by its SHA-256.
    pub names: PathBuf,
}

impl SnapshotPaths {
    /// Derive the name-list path from the index path:
    /// `items.index` pairs with `items.names.json`.
    pub fn for_index(index: impl Into<PathBuf>) -> Self {
        let index = index.into();
        let names = index.with_extension("names.json");
        Self { index, names }
    }

    /// Whether a snapshot has been written here (judged by the index file).
    pub fn exists(&self) -> bool {
        self.index.exists()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct NameListFile {
    index_sha256: String,
    built_at: DateTime<Utc>,
    names: Vec<String>,
}

/// Persist a generation as one unit.
///
/// Both files are written to temp siblings before either is renamed into
/// place, and the previous index is parked at `<index>.prev` until the name
/// list has been committed. A failed commit puts the previous index back, so
/// the pair on disk always belongs to a single generation. If the process
/// dies between the two renames, [`load_snapshot`] recovers from `.prev`.
pub async fn save_snapshot(paths: &SnapshotPaths, generation: &IndexGeneration) -> BinwiseResult<()> {
    let index_bytes = generation.index().to_bytes();
    let names = NameListFile {
        index_sha256: sha256_hex(&index_bytes),
        built_at: generation.built_at(),
        names: generation.names().to_vec(),
    };
    let names_bytes = serde_json::to_vec(&names)?;

    let index_tmp = sibling(&paths.index, ".tmp");
    let names_tmp = sibling(&paths.names, ".tmp");
    let prev = sibling(&paths.index, ".prev");

    create_parent(&paths.index).await?;
    create_parent(&paths.names).await?;
    if let Err(e) = write_pair(&index_tmp, &index_bytes, &names_tmp, &names_bytes).await {
        discard(&index_tmp).await;
        discard(&names_tmp).await;
        return Err(e);
    }

    let had_previous = tokio::fs::try_exists(&paths.index).await?;
    if had_previous {
        tokio::fs::rename(&paths.index, &prev).await?;
    }
    if let Err(e) = commit_pair(paths, &index_tmp, &names_tmp).await {
        if had_previous {
            if let Err(restore) = tokio::fs::rename(&prev, &paths.index).await {
                warn!(error = %restore, "Failed to restore previous index");
            }
        } else {
            discard(&paths.index).await;
        }
        discard(&index_tmp).await;
        discard(&names_tmp).await;
        return Err(e);
    }
    if had_previous {
        discard(&prev).await;
    }

    debug!(
        index = %paths.index.display(),
        items = generation.len(),
        "Snapshot written"
    );
    Ok(())
}

async fn write_pair(
    index_tmp: &Path,
    index_bytes: &[u8],
    names_tmp: &Path,
    names_bytes: &[u8],
) -> BinwiseResult<()> {
    tokio::fs::write(index_tmp, index_bytes).await?;
    tokio::fs::write(names_tmp, names_bytes).await?;
    Ok(())
}

async fn commit_pair(paths: &SnapshotPaths, index_tmp: &Path, names_tmp: &Path) -> BinwiseResult<()> {
    tokio::fs::rename(index_tmp, &paths.index).await?;
    tokio::fs::rename(names_tmp, &paths.names).await?;
    Ok(())
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!(path = %path.display(), error = %e, "Could not remove snapshot leftover");
        }
    }
}

/// Load and cross-check a persisted generation.
///
/// When the index and name list disagree but a parked `.prev` index matches
/// the name list, the interrupted save is rolled back and that index is used.
pub async fn load_snapshot(paths: &SnapshotPaths) -> BinwiseResult<IndexGeneration> {
    let index_bytes = tokio::fs::read(&paths.index).await.map_err(|e| {
        BinwiseError::IndexCorrupt(format!("failed to read {}: {e}", paths.index.display()))
    })?;
    let names_bytes = tokio::fs::read(&paths.names).await.map_err(|e| {
        BinwiseError::IndexCorrupt(format!(
            "name list {} unreadable: {e}",
            paths.names.display()
        ))
    })?;

    let names: NameListFile = serde_json::from_slice(&names_bytes)
        .map_err(|e| BinwiseError::IndexCorrupt(format!("invalid name list: {e}")))?;

    let digest = sha256_hex(&index_bytes);
    let index_bytes = if digest == names.index_sha256 {
        index_bytes
    } else {
        match recover_previous(paths, &names.index_sha256).await {
            Some(previous) => previous,
            None => {
                return Err(BinwiseError::IndexCorrupt(format!(
                    "name list belongs to index {} but index file hashes to {digest}",
                    names.index_sha256
                )))
            }
        }
    };

    let index = FlatL2Index::from_bytes(&index_bytes)?;
    IndexGeneration::with_timestamp(index, names.names, names.built_at)
}

/// Move `<index>.prev` back into place if it is the index the name list names.
async fn recover_previous(paths: &SnapshotPaths, expected_sha256: &str) -> Option<Vec<u8>> {
    let prev = sibling(&paths.index, ".prev");
    let bytes = tokio::fs::read(&prev).await.ok()?;
    if sha256_hex(&bytes) != expected_sha256 {
        return None;
    }
    match tokio::fs::rename(&prev, &paths.index).await {
        Ok(()) => warn!(index = %paths.index.display(), "Rolled back interrupted snapshot write"),
        Err(e) => warn!(error = %e, "Using parked index without restoring it"),
    }
    Some(bytes)
}

/// Write `bytes` to a sibling temp file, then rename it over `path`.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> BinwiseResult<()> {
    create_parent(path).await?;
    let tmp = sibling(path, ".tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

async fn create_parent(path: &Path) -> BinwiseResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
