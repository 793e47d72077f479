use crate::snapshot::write_atomic;
use binwise_core::{BinwiseError, BinwiseResult};
use std::cmp::Ordering;
use std::path::Path;

const MAGIC: &[u8; 4] = b"BWIX";
const FORMAT_VERSION: u32 = 1;
/// magic + version + dimension + count
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// One search hit: a position in the index and its squared L2 distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

/// Exact nearest-neighbour index over Euclidean (L2) distance.
///
/// Vectors are stored row-major in insertion order, so position `i` always
/// refers to the `i`-th vector passed to [`FlatL2Index::build`]. The index is
/// immutable once built; a refresh builds a new one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatL2Index {
    dimension: usize,
    vectors: Vec<f32>,
}

impl FlatL2Index {
    /// Build an index over `embeddings`, preserving their order.
    ///
    /// All vectors must share one non-zero dimension. An empty input yields
    /// an empty index.
    pub fn build<V: AsRef<[f32]>>(embeddings: &[V]) -> BinwiseResult<Self> {
        let Some(first) = embeddings.first() else {
            return Ok(Self::default());
        };
        let dimension = first.as_ref().len();
        if dimension == 0 {
            return Err(BinwiseError::Validation(
                "Cannot index zero-length embeddings".to_string(),
            ));
        }

        let mut vectors = Vec::with_capacity(dimension * embeddings.len());
        for embedding in embeddings {
            let embedding = embedding.as_ref();
            if embedding.len() != dimension {
                return Err(BinwiseError::DimensionMismatch {
                    expected: dimension,
                    actual: embedding.len(),
                });
            }
            vectors.extend_from_slice(embedding);
        }

        Ok(Self { dimension, vectors })
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.vectors.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector dimension; `0` for an empty index.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The stored vector at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        if position >= self.len() {
            return None;
        }
        let start = position * self.dimension;
        Some(&self.vectors[start..start + self.dimension])
    }

    /// Positions of the `k` nearest vectors, closest first.
    pub fn search(&self, query: &[f32], k: usize) -> BinwiseResult<Vec<usize>> {
        Ok(self
            .search_with_distances(query, k)?
            .into_iter()
            .map(|n| n.position)
            .collect())
    }

    /// The `k` nearest vectors with their squared L2 distances.
    ///
    /// Results are ordered by ascending distance; equal distances keep index
    /// order. Returns at most `len()` results and never pads. Searching an
    /// empty index yields no results for any query.
    pub fn search_with_distances(&self, query: &[f32], k: usize) -> BinwiseResult<Vec<Neighbor>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(BinwiseError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<Neighbor> = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, v)| Neighbor {
                position,
                distance: squared_l2(query, v),
            })
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, closest_first);
            scored.truncate(k);
        }
        scored.sort_by(closest_first);
        Ok(scored)
    }

    /// Encode the index in the snapshot format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.vectors.len() * 4);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        out.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for value in &self.vectors {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }

    /// Decode an index from the snapshot format.
    pub fn from_bytes(bytes: &[u8]) -> BinwiseResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(corrupt(format!("file too short ({} bytes)", bytes.len())));
        }
        let (header, body) = bytes.split_at(HEADER_LEN);
        if &header[0..4] != MAGIC {
            return Err(corrupt("bad magic".to_string()));
        }
        let version = u32::from_le_bytes(le_array(&header[4..8]));
        if version != FORMAT_VERSION {
            return Err(corrupt(format!("unsupported format version {version}")));
        }
        let dimension = u32::from_le_bytes(le_array(&header[8..12])) as usize;
        let count = u64::from_le_bytes(le_array(&header[12..20]));

        if count == 0 {
            if !body.is_empty() {
                return Err(corrupt("trailing data after empty index".to_string()));
            }
            return Ok(Self::default());
        }
        if dimension == 0 {
            return Err(corrupt("non-empty index with zero dimension".to_string()));
        }

        let expected = usize::try_from(count)
            .ok()
            .and_then(|c| c.checked_mul(dimension))
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| corrupt(format!("count {count} overflows")))?;
        if body.len() != expected {
            return Err(corrupt(format!(
                "expected {expected} bytes of vectors, found {}",
                body.len()
            )));
        }

        let vectors = body
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes(le_array(chunk)))
            .collect();
        Ok(Self { dimension, vectors })
    }

    /// Write the index to `path`, replacing any existing file atomically.
    pub async fn save(&self, path: &Path) -> BinwiseResult<()> {
        write_atomic(path, &self.to_bytes()).await
    }

    /// Read an index previously written with [`FlatL2Index::save`].
    pub async fn load(path: &Path) -> BinwiseResult<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            corrupt(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_bytes(&bytes)
    }
}

fn closest_first(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.position.cmp(&b.position))
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Callers pass slices whose length was checked against the header layout.
fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

fn corrupt(msg: String) -> BinwiseError {
    BinwiseError::IndexCorrupt(msg)
}
