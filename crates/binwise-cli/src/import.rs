use anyhow::Context;
use binwise_graph::{FactRecord, GraphStore};
use binwise_memory::EmbeddingProvider;
use tracing::{debug, info};

/// Write `facts` to the graph in order, embedding each item when an embedder
/// is given. Stops at the first failing row; earlier rows stay written.
pub async fn import_facts(
    store: &dyn GraphStore,
    facts: &[FactRecord],
    embedder: Option<&dyn EmbeddingProvider>,
) -> anyhow::Result<usize> {
    for fact in facts {
        let written = match embedder {
            Some(embedder) => {
                let embedding = embedder
                    .embed(&fact.item)
                    .await
                    .with_context(|| format!("line {}: embedding '{}' failed", fact.line, fact.item))?;
                store
                    .upsert_fact_with_embedding(&fact.item, &fact.bin, &embedding)
                    .await
            }
            None => store.upsert_fact(&fact.item, &fact.bin).await,
        };
        written.with_context(|| format!("line {}: writing '{}' failed", fact.line, fact.item))?;
        debug!(line = fact.line, item = %fact.item, bin = %fact.bin, "Fact imported");
    }
    info!(count = facts.len(), embedded = embedder.is_some(), "Facts imported");
    Ok(facts.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use binwise_core::EmbeddingError;
    use binwise_graph::{read_facts, InMemoryGraphStore};

    struct LengthEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LengthEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if text == "poison" {
                return Err(EmbeddingError::Service("boom".into()));
            }
            Ok(vec![text.len() as f32, 1.0])
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    #[tokio::test]
    async fn test_import_without_embeddings() {
        let store = InMemoryGraphStore::new();
        let facts = read_facts("item,bin\ncup,garbage\ncan,recyclable\n".as_bytes()).unwrap();

        assert_eq!(import_facts(&store, &facts, None).await.unwrap(), 2);
        assert_eq!(store.find_bin("can").await.unwrap().as_deref(), Some("recyclable"));
        assert!(store.export_all_embeddings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_with_embeddings() {
        let store = InMemoryGraphStore::new();
        let facts = read_facts("item,bin\ncup,garbage\njar,recyclable\n".as_bytes()).unwrap();

        import_facts(&store, &facts, Some(&LengthEmbedder)).await.unwrap();
        let exported = store.export_all_embeddings().await.unwrap();
        assert_eq!(exported.len(), 2);
        assert_eq!(exported[0].name, "cup");
        assert_eq!(exported[0].embedding, vec![3.0, 1.0]);
    }

    #[tokio::test]
    async fn test_import_stops_at_failing_row() {
        let store = InMemoryGraphStore::new();
        let facts =
            read_facts("item,bin\ncup,garbage\npoison,garbage\njar,glass\n".as_bytes()).unwrap();

        let err = import_facts(&store, &facts, Some(&LengthEmbedder))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("line 3"));
        assert_eq!(store.find_bin("cup").await.unwrap().as_deref(), Some("garbage"));
        assert_eq!(store.find_bin("jar").await.unwrap(), None);
    }
}
