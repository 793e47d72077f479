mod config;
mod import;

use anyhow::Context;
use binwise_agent::{LlmClient, Resolver};
use binwise_gateway::{AuthConfig, GatewayServer};
use binwise_graph::{read_facts, GraphStore, Neo4jGraphStore};
use binwise_memory::{
    EmbeddingConfig, EmbeddingProvider, IndexSynchronizer, OpenAiEmbedding, RetryingEmbedding,
    SharedIndex,
};
use clap::{Parser, Subcommand};
use config::BinwiseConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "binwise", about = "Binwise: waste item to bin classification")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "binwise.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the classification server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Classify one object name and print the result as JSON
    Classify {
        /// Object name, matched exactly against the graph
        object_name: String,
    },
    /// Rebuild the vector index from the graph
    Refresh,
    /// Record that an item goes into a bin
    Upsert {
        item: String,
        bin: String,
        /// Also store the item's embedding so the next refresh indexes it
        #[arg(long)]
        embed: bool,
    },
    /// Load facts from a CSV file with an `item,bin` header
    Import {
        path: PathBuf,
        /// Also store each item's embedding
        #[arg(long)]
        embed: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = BinwiseConfig::load(&cli.config).await?;

    let store: Arc<dyn GraphStore> = Arc::new(Neo4jGraphStore::connect(&config.graph).await?);

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let synchronizer = build_synchronizer(&config, store.clone());
            synchronizer.load_or_build().await?;
            let resolver = Arc::new(build_resolver(&config, store, &synchronizer)?);

            let auth_config = AuthConfig::new(config.server.api_keys.clone());
            if auth_config.is_enabled() {
                info!(keys = config.server.api_keys.len(), "API key auth enabled");
            }
            let app = GatewayServer::build_with_auth(resolver, synchronizer, auth_config);

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("Binwise listening on {addr}");
            axum::serve(listener, app).await?;
        }
        Commands::Classify { object_name } => {
            let synchronizer = build_synchronizer(&config, store.clone());
            synchronizer.load_or_build().await?;
            let resolver = build_resolver(&config, store, &synchronizer)?;

            let classification = resolver.classify(&object_name).await?;
            println!("{}", serde_json::to_string(&classification)?);
        }
        Commands::Refresh => {
            let synchronizer = build_synchronizer(&config, store);
            let generation = synchronizer.refresh().await?;
            println!(
                "Indexed {} item(s) into {} (built {})",
                generation.len(),
                synchronizer.paths().index.display(),
                generation.built_at().to_rfc3339()
            );
        }
        Commands::Upsert { item, bin, embed } => {
            if embed {
                let embedding = build_embedder(&config.embedding)?.embed(&item).await?;
                store
                    .upsert_fact_with_embedding(&item, &bin, &embedding)
                    .await?;
            } else {
                store.upsert_fact(&item, &bin).await?;
            }
            info!(item = %item, bin = %bin, embedded = embed, "Fact recorded");
            println!("{item} goes into {bin}");
            if embed {
                println!("Run `binwise refresh` to include it in similarity search.");
            }
        }
        Commands::Import { path, embed } => {
            let file = std::fs::File::open(&path)
                .with_context(|| format!("Failed to open facts file '{}'", path.display()))?;
            let facts = read_facts(file)?;
            let embedder = if embed {
                Some(build_embedder(&config.embedding)?)
            } else {
                None
            };
            let count =
                import::import_facts(store.as_ref(), &facts, embedder.as_deref()).await?;
            println!("Imported {count} fact(s) from {}", path.display());
            if embed {
                println!("Run `binwise refresh` to include them in similarity search.");
            }
        }
    }

    Ok(())
}

fn build_synchronizer(config: &BinwiseConfig, store: Arc<dyn GraphStore>) -> Arc<IndexSynchronizer> {
    Arc::new(
        IndexSynchronizer::new(store, config.snapshot_paths(), Arc::new(SharedIndex::empty()))
            .with_rebuild_on_corrupt(config.index.rebuild_on_corrupt),
    )
}

fn build_embedder(config: &EmbeddingConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let client = OpenAiEmbedding::new(config.clone())?;
    let embedder: Arc<dyn EmbeddingProvider> = match &config.retry_policy {
        Some(policy) => Arc::new(RetryingEmbedding::new(client, policy.clone())),
        None => Arc::new(client),
    };
    Ok(embedder)
}

fn build_resolver(
    config: &BinwiseConfig,
    store: Arc<dyn GraphStore>,
    synchronizer: &IndexSynchronizer,
) -> anyhow::Result<Resolver> {
    let embedder = build_embedder(&config.embedding)?;
    let generator = Arc::new(LlmClient::new(config.model.clone())?);
    info!(
        model = generator.model_id(),
        embedding_model = %config.embedding.model,
        "Resolver ready"
    );
    Ok(
        Resolver::new(store, embedder, synchronizer.shared(), generator)
            .with_max_output_tokens(config.model.max_tokens),
    )
}
