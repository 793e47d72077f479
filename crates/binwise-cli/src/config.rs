//! `binwise.toml` loading.
//!
//! Every section has defaults, so a file containing only secrets-free
//! overrides is valid. Secrets left empty in the file are taken from the
//! environment (after `.env` has been loaded).

use binwise_agent::ModelConfig;
use binwise_gateway::ServerConfig;
use binwise_graph::Neo4jConfig;
use binwise_memory::{EmbeddingConfig, IndexConfig, SnapshotPaths};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const NEO4J_PASSWORD_ENV: &str = "NEO4J_PASSWORD";
const EMBEDDING_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Deserialize)]
pub struct BinwiseConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub graph: Neo4jConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl BinwiseConfig {
    /// Read and parse `path`, then fill empty secrets from the environment.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;
        let mut config = Self::parse(&raw)?;
        config.apply_env_fallbacks(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Fill secrets that the file left empty using `lookup`.
    pub fn apply_env_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fill(&mut self.graph.password, lookup(NEO4J_PASSWORD_ENV));
        fill(&mut self.embedding.api_key, lookup(EMBEDDING_API_KEY_ENV));
        let model_key_env = self.model.api_key_env();
        fill(&mut self.model.api_key, lookup(model_key_env));
    }

    /// Where the index snapshot lives.
    pub fn snapshot_paths(&self) -> SnapshotPaths {
        let index = self
            .index
            .path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("items.index"));
        SnapshotPaths::for_index(index)
    }
}

fn fill(slot: &mut String, value: Option<String>) {
    if slot.is_empty() {
        if let Some(value) = value {
            *slot = value;
        }
    }
}
