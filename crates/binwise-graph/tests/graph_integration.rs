#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for the in-memory graph store used as a trait object.

use std::sync::Arc;

use binwise_graph::{GraphStore, InMemoryGraphStore};

fn shared_store() -> Arc<dyn GraphStore> {
    Arc::new(InMemoryGraphStore::new())
}

#[tokio::test]
async fn concurrent_upserts_do_not_duplicate_items() {
    let store = shared_store();
    let mut handles = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let embedding = vec![i as f32, 1.0];
            store
                .upsert_fact_with_embedding("aluminium can", "recyclable", &embedding)
                .await
                .unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let exported = store.export_all_embeddings().await.unwrap();
    assert_eq!(exported.len(), 1);
    assert_eq!(exported[0].name, "aluminium can");
    assert_eq!(
        store.find_bin("aluminium can").await.unwrap().as_deref(),
        Some("recyclable")
    );
}

#[tokio::test]
async fn plain_upsert_preserves_existing_embedding() {
    let store = shared_store();
    store
        .upsert_fact_with_embedding("egg shell", "compostable", &[0.1, 0.2, 0.3])
        .await
        .unwrap();
    store.upsert_fact("egg shell", "compostable").await.unwrap();

    let exported = store.export_all_embeddings().await.unwrap();
    assert_eq!(exported.len(), 1);
    assert_eq!(exported[0].embedding, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn missing_item_is_absent_not_error() {
    let store = shared_store();
    assert_eq!(store.find_bin("unknown thing").await.unwrap(), None);
    assert!(store.export_all_embeddings().await.unwrap().is_empty());
}
