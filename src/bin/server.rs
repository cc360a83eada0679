//! Search API server entry point.
//!
//! Loads the project catalog, wires the ranking engine from the provider
//! settings, and serves the HTTP search API until Ctrl-C.
//!
//! # Examples
//!
//! Lexical-only server on the default port:
//! ```bash
//! project-server --catalog projects.json
//! ```
//!
//! Semantic search enabled through the environment:
//! ```bash
//! OPENAI_API_KEY=sk-... PINECONE_API_KEY=... PINECONE_INDEX_HOST=fyp-abc.svc.pinecone.io \
//!     project-server --catalog projects.json --port 8080
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use project_finder::{
    catalog::{json::JsonFileSource, Catalog, CatalogSource},
    config::ProviderSettings,
    server::{self, AppState, ServerConfig},
};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// HTTP server for the project search API
#[derive(Parser, Debug)]
#[command(
    name = "project-server",
    version,
    about = "Serve the project search API over HTTP",
    long_about = "Serve GET/POST /api/projects/search and GET /health. Semantic ranking is enabled \
                  when the OpenAI and Pinecone settings are all present; otherwise every search \
                  uses lexical ranking."
)]
struct Args {
    /// Project catalog JSON file
    #[arg(long, env = "PROJECTS_FILE", value_name = "FILE")]
    catalog: PathBuf,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Upper bound in seconds on answering one search
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    request_timeout_secs: u64,

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

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);
    debug!("Catalog file: {:?}, bind: {}:{}", args.catalog, args.host, args.port);

    let source = JsonFileSource::new(&args.catalog);
    let catalog = Catalog::load(&source)
        .await
        .with_context(|| format!("Failed to load project catalog from {:?}", args.catalog))?
        .require_projects(source.name())
        .context("Refusing to start without projects")?;

    let engine = args
        .providers
        .ranking_engine(Arc::new(catalog))
        .context("Failed to configure semantic search")?;

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        request_timeout_secs: args.request_timeout_secs,
    };
    info!(
        "Starting project search server (semantic: {})",
        engine.semantic_configured()
    );

    let state = AppState::new(Arc::new(engine), &config);
    server::serve(&config, state)
        .await
        .with_context(|| format!("Server on {} failed", config.bind_addr()))?;

    Ok(())
}
