//! Indexer binary entry point.
//!
//! This binary runs the offline indexing pipeline: it loads the project
//! catalog, embeds every project, and upserts the vectors with their display
//! metadata into the Pinecone index used by semantic search.
//!
//! # Examples
//!
//! Index the catalog with default batch sizes:
//! ```bash
//! OPENAI_API_KEY=sk-... PINECONE_API_KEY=... PINECONE_INDEX_HOST=fyp-abc.svc.pinecone.io \
//!     project-indexer --catalog projects.json
//! ```
//!
//! Smaller batches and verbose logging:
//! ```bash
//! project-indexer --catalog projects.json --embed-batch-size 20 --log-level debug
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use project_finder::{
    catalog::{json::JsonFileSource, Catalog},
    config::ProviderSettings,
    embedding::EmbeddingProvider,
    ingestion::{IndexingPipeline, DEFAULT_EMBED_BATCH_SIZE, DEFAULT_UPSERT_BATCH_SIZE},
};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Indexer CLI for publishing the catalog to the vector index
#[derive(Parser, Debug)]
#[command(
    name = "project-indexer",
    version,
    about = "Embed the project catalog and upsert it into the vector index",
    long_about = "Indexing pipeline that embeds each project's title, summary and keywords and \
                  upserts the vectors into Pinecone. Requires OPENAI_API_KEY, PINECONE_API_KEY \
                  and PINECONE_INDEX_HOST (or the matching flags).

EXAMPLES:
  Index the catalog:
    project-indexer --catalog projects.json

  Use a different embedding model (the server must use the same one):
    project-indexer --catalog projects.json --embedding-model text-embedding-3-small

  Custom batch sizes and logging:
    project-indexer --catalog projects.json --embed-batch-size 20 --log-level debug"
)]
struct IndexerArgs {
    /// Project catalog JSON file
    #[arg(long, env = "PROJECTS_FILE", value_name = "FILE")]
    catalog: PathBuf,

    /// Number of projects embedded per request
    #[arg(long, value_name = "N", default_value_t = DEFAULT_EMBED_BATCH_SIZE)]
    embed_batch_size: usize,

    /// Number of vectors written per upsert request
    #[arg(long, value_name = "N", default_value_t = DEFAULT_UPSERT_BATCH_SIZE)]
    upsert_batch_size: usize,

    #[command(flatten)]
    providers: ProviderSettings,

    /// Logging verbosity level
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

/// Initialize logging subsystem with the specified level
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Create a progress bar for tracking indexing
fn create_progress_bar(total: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} projects | Upserted: {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("##-"),
    );
    Ok(pb)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = IndexerArgs::parse();
    init_logging(&args.log_level);

    info!("Starting project indexing pipeline");
    let start_time = Instant::now();

    let catalog = Catalog::load(&JsonFileSource::new(&args.catalog))
        .await
        .with_context(|| format!("Failed to load project catalog from {:?}", args.catalog))?;

    if catalog.is_empty() {
        warn!("No projects found in {:?}", args.catalog);
        return Ok(());
    }

    let embedding = args
        .providers
        .embedding()
        .context("Failed to create embedding provider")?;
    info!(
        "OpenAI provider initialized: model={}, dimension={}",
        embedding.model_name(),
        embedding.dimension()
    );

    let index = args
        .providers
        .index()
        .context("Failed to create Pinecone client")?;
    debug!("Pinecone index: {}", index.host());

    let pipeline = IndexingPipeline::new(Arc::new(embedding), Arc::new(index))
        .with_embed_batch_size(args.embed_batch_size)
        .with_upsert_batch_size(args.upsert_batch_size);

    let progress = create_progress_bar(catalog.len())?;
    progress.set_message("0");

    let stats = pipeline
        .run_with_progress(&catalog, |stats| {
            progress.set_position(stats.total as u64);
            progress.set_message(stats.upserted.to_string());
        })
        .await
        .context("Failed to index projects")?;

    progress.finish_with_message(stats.upserted.to_string());

    let elapsed = start_time.elapsed();
    println!("\n╔════════════════════════════════════════╗");
    println!("║      Indexing Completed                ║");
    println!("╠════════════════════════════════════════╣");
    println!("║ Total projects:       {:>16} ║", stats.total);
    println!("║ Embedded:             {:>16} ║", stats.embedded);
    println!("║ Upserted:             {:>16} ║", stats.upserted);
    println!("║ Skipped:              {:>16} ║", stats.skipped);
    println!("║ Failed:               {:>16} ║", stats.failed);
    println!("║ Elapsed time:         {:>13.2?} ║", elapsed);
    println!("╚════════════════════════════════════════╝");

    if stats.failed > 0 {
        warn!(
            "{} projects failed to index - check logs for details",
            stats.failed
        );
    }

    info!("Indexing pipeline completed");
    Ok(())
}
