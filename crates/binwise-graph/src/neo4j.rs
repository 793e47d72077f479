use crate::store::{GraphStore, ItemEmbedding};
use async_trait::async_trait;
use binwise_core::{BinwiseError, BinwiseResult};
use neo4rs::{query, ConfigBuilder, Graph, Query, Row};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

const FIND_BIN: &str = "MATCH (i:Item {name: $name})-[:SHOULD_GO_IN]->(b:Bin) \
                        RETURN b.type AS bin_type LIMIT 1";

const EXPORT_EMBEDDINGS: &str = "MATCH (i:Item) \
                                 WHERE i.name IS NOT NULL AND i.embedding IS NOT NULL \
                                 RETURN i.name AS name, i.embedding AS embedding";

const MERGE_FACT: &str = "MERGE (i:Item {name: $item}) \
                          MERGE (b:Bin {type: $bin}) \
                          MERGE (i)-[:SHOULD_GO_IN]->(b)";

const MERGE_FACT_WITH_EMBEDDING: &str = "MERGE (i:Item {name: $item}) \
                                         SET i.embedding = $embedding \
                                         MERGE (b:Bin {type: $bin}) \
                                         MERGE (i)-[:SHOULD_GO_IN]->(b)";

/// Connection settings for the Neo4j graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neo4jConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_user")]
    pub user: String,
    /// Falls back to `NEO4J_PASSWORD` when left empty.
    #[serde(default)]
    pub password: String,
    /// Target database; the server default when unset.
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Upper bound on any single query, in seconds.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_max_connections() -> usize {
    8
}

fn default_query_timeout_secs() -> u64 {
    10
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: String::new(),
            database: None,
            max_connections: default_max_connections(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

/// Graph store backed by Neo4j over Bolt.
pub struct Neo4jGraphStore {
    graph: Graph,
    timeout: Duration,
}

impl Neo4jGraphStore {
    /// Connect to the configured Neo4j instance.
    pub async fn connect(config: &Neo4jConfig) -> BinwiseResult<Self> {
        let mut builder = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.user.as_str())
            .password(config.password.as_str())
            .max_connections(config.max_connections);
        if let Some(db) = &config.database {
            builder = builder.db(db.as_str());
        }
        let neo_config = builder
            .build()
            .map_err(|e| BinwiseError::Config(format!("Invalid Neo4j config: {e}")))?;

        let timeout = Duration::from_secs(config.query_timeout_secs);
        let graph = bounded(timeout, "connect", Graph::connect(neo_config)).await?;
        info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self { graph, timeout })
    }

    async fn run(&self, q: Query, op: &'static str) -> BinwiseResult<()> {
        bounded(self.timeout, op, self.graph.run(q)).await
    }
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn find_bin(&self, item_name: &str) -> BinwiseResult<Option<String>> {
        let timeout = self.timeout;
        let q = query(FIND_BIN).param("name", item_name);
        let bin = bounded(timeout, "find_bin", async {
            let mut rows = self.graph.execute(q).await?;
            let bin = match rows.next().await? {
                Some(row) => bin_from_row(&row)?,
                None => None,
            };
            Ok::<_, neo4rs::Error>(bin)
        })
        .await?;
        debug!(item = item_name, found = bin.is_some(), "Graph lookup");
        Ok(bin)
    }

    async fn export_all_embeddings(&self) -> BinwiseResult<Vec<ItemEmbedding>> {
        let rows = bounded(self.timeout, "export_all_embeddings", async {
            let mut stream = self.graph.execute(query(EXPORT_EMBEDDINGS)).await?;
            let mut rows = Vec::new();
            while let Some(row) = stream.next().await? {
                rows.push(row);
            }
            Ok::<_, neo4rs::Error>(rows)
        })
        .await?;

        let items = rows
            .iter()
            .map(item_from_row)
            .collect::<BinwiseResult<Vec<_>>>()?;
        info!(count = items.len(), "Exported item embeddings from Neo4j");
        Ok(items)
    }

    async fn upsert_fact(&self, item_name: &str, bin_type: &str) -> BinwiseResult<()> {
        let q = query(MERGE_FACT)
            .param("item", item_name)
            .param("bin", bin_type);
        self.run(q, "upsert_fact").await
    }

    async fn upsert_fact_with_embedding(
        &self,
        item_name: &str,
        bin_type: &str,
        embedding: &[f32],
    ) -> BinwiseResult<()> {
        let as_f64: Vec<f64> = embedding.iter().map(|&x| f64::from(x)).collect();
        let q = query(MERGE_FACT_WITH_EMBEDDING)
            .param("item", item_name)
            .param("bin", bin_type)
            .param("embedding", as_f64);
        self.run(q, "upsert_fact_with_embedding").await
    }
}

/// A `Bin` whose `type` is null reads as no bin at all.
fn bin_from_row(row: &Row) -> Result<Option<String>, neo4rs::Error> {
    row.get::<Option<String>>("bin_type")
        .map_err(neo4rs::Error::DeserializationError)
}

fn item_from_row(row: &Row) -> BinwiseResult<ItemEmbedding> {
    let name: String = row.get("name").map_err(|e| {
        BinwiseError::StoreUnavailable(format!("Unreadable item name in export: {e}"))
    })?;
    let embedding: Vec<f64> = row.get("embedding").map_err(|e| {
        BinwiseError::StoreUnavailable(format!("Malformed embedding for item '{name}': {e}"))
    })?;
    Ok(ItemEmbedding {
        name,
        embedding: embedding.into_iter().map(|x| x as f32).collect(),
    })
}

/// Runs a driver future under a deadline, folding driver errors and timeouts
/// into [`BinwiseError::StoreUnavailable`].
async fn bounded<T, F>(timeout: Duration, op: &'static str, fut: F) -> BinwiseResult<T>
where
    F: Future<Output = Result<T, neo4rs::Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(BinwiseError::StoreUnavailable(format!("{op}: {e}"))),
        Err(_) => Err(BinwiseError::StoreUnavailable(format!(
            "{op}: timed out after {}s",
            timeout.as_secs()
        ))),
    }
}
