use crate::generation::IndexGeneration;
use crate::index::FlatL2Index;
use crate::snapshot::{load_snapshot, save_snapshot, SnapshotPaths};
use binwise_core::{BinwiseError, BinwiseResult};
use binwise_graph::GraphStore;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Persistence settings for the vector index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index file; defaults to `<data_dir>/items.index`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Rebuild from the graph instead of failing when the snapshot is corrupt.
    #[serde(default)]
    pub rebuild_on_corrupt: bool,
}

/// The generation that searches currently run against.
///
/// Readers clone the `Arc` and release the lock immediately, so a swap never
/// waits on a search and a search never sees a half-installed generation.
pub struct SharedIndex {
    current: RwLock<Arc<IndexGeneration>>,
}

impl SharedIndex {
    pub fn new(generation: IndexGeneration) -> Self {
        Self {
            current: RwLock::new(Arc::new(generation)),
        }
    }

    /// A handle with no items; searches return nothing until a refresh.
    pub fn empty() -> Self {
        Self::new(IndexGeneration::empty())
    }

    /// Snapshot of the current generation.
    pub fn current(&self) -> Arc<IndexGeneration> {
        self.current.read().clone()
    }

    /// Install `generation`, returning the one it replaced.
    pub fn replace(&self, generation: Arc<IndexGeneration>) -> Arc<IndexGeneration> {
        std::mem::replace(&mut *self.current.write(), generation)
    }
}

impl Default for SharedIndex {
    fn default() -> Self {
        Self::empty()
    }
}

/// Nearest-neighbour lookup of item names by embedding.
pub trait SimilaritySearch: Send + Sync {
    /// Names of up to `k` items closest to `query`, closest first.
    fn nearest_names(&self, query: &[f32], k: usize) -> BinwiseResult<Vec<String>>;
}

impl SimilaritySearch for SharedIndex {
    fn nearest_names(&self, query: &[f32], k: usize) -> BinwiseResult<Vec<String>> {
        self.current().nearest_names(query, k)
    }
}

/// Keeps the shared index in step with the graph store.
///
/// Every refresh is a full rebuild from an export of the graph. Nothing is
/// refreshed automatically; callers decide when the index is stale.
pub struct IndexSynchronizer {
    store: Arc<dyn GraphStore>,
    paths: SnapshotPaths,
    shared: Arc<SharedIndex>,
    rebuild_on_corrupt: bool,
    refresh_lock: Mutex<()>,
}

impl IndexSynchronizer {
    pub fn new(store: Arc<dyn GraphStore>, paths: SnapshotPaths, shared: Arc<SharedIndex>) -> Self {
        Self {
            store,
            paths,
            shared,
            rebuild_on_corrupt: false,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Rebuild instead of failing when `load_or_build` finds a corrupt snapshot.
    pub fn with_rebuild_on_corrupt(mut self, rebuild: bool) -> Self {
        self.rebuild_on_corrupt = rebuild;
        self
    }

    /// The handle searches read from.
    pub fn shared(&self) -> Arc<SharedIndex> {
        self.shared.clone()
    }

    pub fn paths(&self) -> &SnapshotPaths {
        &self.paths
    }

    /// Rebuild the index from the graph, persist it, then swap it in.
    ///
    /// If export, build or persistence fails the previous generation stays
    /// installed. Concurrent refreshes run one after another.
    pub async fn refresh(&self) -> BinwiseResult<Arc<IndexGeneration>> {
        let _guard = self.refresh_lock.lock().await;
        self.rebuild().await
    }

    /// Install the persisted snapshot if there is one, otherwise build it.
    pub async fn load_or_build(&self) -> BinwiseResult<Arc<IndexGeneration>> {
        let _guard = self.refresh_lock.lock().await;

        if !self.paths.exists() {
            info!(
                path = %self.paths.index.display(),
                "No index snapshot found, building from graph"
            );
            return self.rebuild().await;
        }

        match load_snapshot(&self.paths).await {
            Ok(generation) => {
                let generation = Arc::new(generation);
                self.shared.replace(generation.clone());
                info!(
                    path = %self.paths.index.display(),
                    items = generation.len(),
                    built_at = %generation.built_at(),
                    "Loaded index snapshot"
                );
                Ok(generation)
            }
            Err(BinwiseError::IndexCorrupt(reason)) if self.rebuild_on_corrupt => {
                warn!(%reason, "Index snapshot corrupt, rebuilding from graph");
                self.rebuild().await
            }
            Err(e) => Err(e),
        }
    }

    async fn rebuild(&self) -> BinwiseResult<Arc<IndexGeneration>> {
        let items = self.store.export_all_embeddings().await?;
        let (names, vectors): (Vec<String>, Vec<Vec<f32>>) =
            items.into_iter().map(|i| (i.name, i.embedding)).unzip();

        let index = FlatL2Index::build(&vectors)?;
        let generation = IndexGeneration::new(index, names)?;
        save_snapshot(&self.paths, &generation).await?;

        let generation = Arc::new(generation);
        let previous = self.shared.replace(generation.clone());
        info!(
            items = generation.len(),
            previous_items = previous.len(),
            dimension = generation.index().dimension(),
            "Index refreshed"
        );
        Ok(generation)
    }
}
