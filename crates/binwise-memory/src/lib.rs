//! Embeddings, the item vector index and its synchronization with the graph.
//!
//! # Main types
//!
//! - [`EmbeddingProvider`] — Trait for turning text into a vector.
//! - [`OpenAiEmbedding`] — OpenAI-compatible `/v1/embeddings` client.
//! - [`RetryingEmbedding`] — Backoff wrapper for rate-limited embedding calls.
//! - [`FlatL2Index`] — Exact Euclidean nearest-neighbour index with a binary snapshot format.
//! - [`IndexGeneration`] — An index paired with the item names it was built from.
//! - [`SharedIndex`] — The generation searches read, swapped atomically on refresh.
//! - [`IndexSynchronizer`] — Full rebuilds from the graph store, persisted to disk.

/// Embedding provider trait and OpenAI client.
pub mod embedding;
/// Index paired with its name list.
pub mod generation;
/// Exact L2 vector index.
pub mod index;
/// Retry wrapper for rate-limited embedding calls.
pub mod retry;
/// On-disk snapshot of an index generation.
pub mod snapshot;
/// Rebuilding and swapping the shared index.
pub mod sync;

pub use embedding::{EmbeddingConfig, EmbeddingProvider, OpenAiEmbedding};
pub use generation::IndexGeneration;
pub use index::{FlatL2Index, Neighbor};
pub use retry::{RetryPolicy, RetryingEmbedding};
pub use snapshot::{load_snapshot, save_snapshot, SnapshotPaths};
pub use sync::{IndexConfig, IndexSynchronizer, SharedIndex, SimilaritySearch};
