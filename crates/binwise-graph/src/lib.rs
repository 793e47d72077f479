//! Graph store adapter for `(Item)-[:SHOULD_GO_IN]->(Bin)` facts.
//!
//! # Main types
//!
//! - [`GraphStore`] — Trait for exact lookups, full embedding export and merge writes.
//! - [`Neo4jGraphStore`] — Neo4j (Bolt) implementation with bounded query time.
//! - [`InMemoryGraphStore`] — In-process implementation with the same merge semantics.
//! - [`ItemEmbedding`] — An item name paired with its embedding.
//! - [`FactRecord`] — One row of a CSV facts file, see [`read_facts`].

/// CSV facts files.
pub mod import;
/// Neo4j-backed graph store.
pub mod neo4j;
/// Graph store trait and in-memory implementation.
pub mod store;

pub use import::{read_facts, FactRecord};
pub use neo4j::{Neo4jConfig, Neo4jGraphStore};
pub use store::{GraphStore, InMemoryGraphStore, ItemEmbedding};
