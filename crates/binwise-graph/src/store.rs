use async_trait::async_trait;
use binwise_core::BinwiseResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// An item name paired with its stored embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEmbedding {
    pub name: String,
    pub embedding: Vec<f32>,
}

impl ItemEmbedding {
    pub fn new(name: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            embedding,
        }
    }
}

/// Access to `(Item)-[:SHOULD_GO_IN]->(Bin)` facts.
///
/// Item names are exact keys: no trimming or case folding happens here or in
/// any caller.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Bin label for an exact item-name match, `None` if no fact exists.
    async fn find_bin(&self, item_name: &str) -> BinwiseResult<Option<String>>;

    /// Every stored item that carries an embedding.
    ///
    /// The order is not stable across calls; a caller building an index must
    /// treat the returned order as canonical for that build.
    async fn export_all_embeddings(&self) -> BinwiseResult<Vec<ItemEmbedding>>;

    /// Merge an item, a bin and the relationship between them.
    async fn upsert_fact(&self, item_name: &str, bin_type: &str) -> BinwiseResult<()>;

    /// Like [`GraphStore::upsert_fact`], also setting the item's embedding.
    async fn upsert_fact_with_embedding(
        &self,
        item_name: &str,
        bin_type: &str,
        embedding: &[f32],
    ) -> BinwiseResult<()>;
}

#[derive(Debug, Default)]
struct StoredItem {
    bins: Vec<String>,
    embedding: Option<Vec<f32>>,
}

#[derive(Debug, Default)]
struct Facts {
    order: Vec<String>,
    items: HashMap<String, StoredItem>,
}

impl Facts {
    fn merge(&mut self, item_name: &str, bin_type: &str) -> &mut StoredItem {
        if !self.items.contains_key(item_name) {
            self.order.push(item_name.to_string());
        }
        let item = self.items.entry(item_name.to_string()).or_default();
        if !item.bins.iter().any(|b| b == bin_type) {
            item.bins.push(bin_type.to_string());
        }
        item
    }
}

/// In-process graph store with the same merge semantics as the Neo4j adapter.
///
/// Like the real graph, merging a second bin for an existing item adds a
/// second relationship instead of replacing the first; lookups return the
/// earliest one. Export order is insertion order.
#[derive(Default)]
pub struct InMemoryGraphStore {
    facts: RwLock<Facts>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct items.
    pub async fn len(&self) -> usize {
        self.facts.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn find_bin(&self, item_name: &str) -> BinwiseResult<Option<String>> {
        let facts = self.facts.read().await;
        Ok(facts
            .items
            .get(item_name)
            .and_then(|item| item.bins.first().cloned()))
    }

    async fn export_all_embeddings(&self) -> BinwiseResult<Vec<ItemEmbedding>> {
        let facts = self.facts.read().await;
        Ok(facts
            .order
            .iter()
            .filter_map(|name| {
                let embedding = facts.items.get(name)?.embedding.clone()?;
                Some(ItemEmbedding::new(name.clone(), embedding))
            })
            .collect())
    }

    async fn upsert_fact(&self, item_name: &str, bin_type: &str) -> BinwiseResult<()> {
        let mut facts = self.facts.write().await;
        facts.merge(item_name, bin_type);
        Ok(())
    }

    async fn upsert_fact_with_embedding(
        &self,
        item_name: &str,
        bin_type: &str,
        embedding: &[f32],
    ) -> BinwiseResult<()> {
        let mut facts = self.facts.write().await;
        facts.merge(item_name, bin_type).embedding = Some(embedding.to_vec());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_bin_exact_match_only() {
        let store = InMemoryGraphStore::new();
        store.upsert_fact("glass jar", "recyclable").await.unwrap();

        assert_eq!(
            store.find_bin("glass jar").await.unwrap().as_deref(),
            Some("recyclable")
        );
        assert_eq!(store.find_bin("Glass Jar").await.unwrap(), None);
        assert_eq!(store.find_bin("glass jar ").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = InMemoryGraphStore::new();
        for _ in 0..3 {
            store.upsert_fact("banana peel", "compostable").await.unwrap();
        }
        assert_eq!(store.len().await, 1);
        assert_eq!(
            store.find_bin("banana peel").await.unwrap().as_deref(),
            Some("compostable")
        );
    }

    #[tokio::test]
    async fn test_second_bin_keeps_first_for_lookup() {
        let store = InMemoryGraphStore::new();
        store.upsert_fact("pizza box", "recyclable").await.unwrap();
        store.upsert_fact("pizza box", "compostable").await.unwrap();
        assert_eq!(
            store.find_bin("pizza box").await.unwrap().as_deref(),
            Some("recyclable")
        );
    }

    #[tokio::test]
    async fn test_export_skips_items_without_embedding() {
        let store = InMemoryGraphStore::new();
        store
            .upsert_fact_with_embedding("can", "recyclable", &[1.0, 0.0])
            .await
            .unwrap();
        store.upsert_fact("napkin", "compostable").await.unwrap();
        store
            .upsert_fact_with_embedding("cup", "garbage", &[0.0, 1.0])
            .await
            .unwrap();

        let exported = store.export_all_embeddings().await.unwrap();
        let names: Vec<&str> = exported.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["can", "cup"]);
        assert_eq!(exported[1].embedding, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_embedding_upsert_overwrites_vector() {
        let store = InMemoryGraphStore::new();
        store
            .upsert_fact_with_embedding("can", "recyclable", &[1.0, 0.0])
            .await
            .unwrap();
        store
            .upsert_fact_with_embedding("can", "recyclable", &[0.5, 0.5])
            .await
            .unwrap();

        let exported = store.export_all_embeddings().await.unwrap();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].embedding, vec![0.5, 0.5]);
    }

    #[tokio::test]
    async fn test_literal_none_bin_is_returned_as_stored() {
        let store = InMemoryGraphStore::new();
        store.upsert_fact("mystery", "None").await.unwrap();
        assert_eq!(
            store.find_bin("mystery").await.unwrap().as_deref(),
            Some("None")
        );
    }
}
