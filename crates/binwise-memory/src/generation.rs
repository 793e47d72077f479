use crate::index::FlatL2Index;
use binwise_core::{BinwiseError, BinwiseResult};
use chrono::{DateTime, Utc};

/// An immutable vector index paired with the item names it was built from.
///
/// Position `i` in the index is the item at `names[i]`. The two halves are
/// only ever created, persisted, loaded and swapped together.
#[derive(Debug, Clone)]
pub struct IndexGeneration {
    index: FlatL2Index,
    names: Vec<String>,
    built_at: DateTime<Utc>,
}

impl IndexGeneration {
    /// Pair an index with its name list, stamped with the current time.
    pub fn new(index: FlatL2Index, names: Vec<String>) -> BinwiseResult<Self> {
        Self::with_timestamp(index, names, Utc::now())
    }

    /// Pair an index with its name list and an explicit build time.
    pub fn with_timestamp(
        index: FlatL2Index,
        names: Vec<String>,
        built_at: DateTime<Utc>,
    ) -> BinwiseResult<Self> {
        if index.len() != names.len() {
            return Err(BinwiseError::IndexCorrupt(format!(
                "index has {} vectors but name list has {} entries",
                index.len(),
                names.len()
            )));
        }
        Ok(Self {
            index,
            names,
            built_at,
        })
    }

    /// A generation with no items.
    pub fn empty() -> Self {
        Self {
            index: FlatL2Index::default(),
            names: Vec::new(),
            built_at: Utc::now(),
        }
    }

    pub fn index(&self) -> &FlatL2Index {
        &self.index
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names of the `k` items nearest to `query`, closest first.
    pub fn nearest_names(&self, query: &[f32], k: usize) -> BinwiseResult<Vec<String>> {
        let positions = self.index.search(query, k)?;
        Ok(self.names_at(&positions))
    }

    /// Map index positions to item names, preserving order.
    ///
    /// Positions outside the generation are skipped.
    pub fn names_at(&self, positions: &[usize]) -> Vec<String> {
        positions
            .iter()
            .filter_map(|&p| self.names.get(p).cloned())
            .collect()
    }
}
