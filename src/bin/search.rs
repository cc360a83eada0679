//! Search binary entry point.
//!
//! This binary provides a command-line interface for searching the project
//! catalog. It supports both single-query and interactive REPL modes, with
//! flexible output formatting (table or JSON), and uses the same ranking engine
//! as the HTTP server.
//!
//! # Examples
//!
//! Single query with default settings:
//! ```bash
//! project-search --catalog projects.json --query "machine learning"
//! ```
//!
//! JSON output restricted to one supervisor:
//! ```bash
//! project-search --catalog projects.json --query "robotics" --supervisor "Tan" --format json
//! ```
//!
//! Interactive mode:
//! ```bash
//! project-search --catalog projects.json --interactive
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use project_finder::{
    catalog::{json::JsonFileSource, Catalog, FilterSpec},
    config::ProviderSettings,
    models::{RelevanceLevel, ScoredResult},
    query::{RankingEngine, SearchOutcome, SearchQuery},
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Output format for search results
#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Human-friendly table with colored relevance levels
    Table,
    /// Machine-readable JSON format
    Json,
}

/// Search binary CLI for querying the project catalog
#[derive(Parser, Debug)]
#[command(
    name = "project-search",
    version,
    about = "Search final-year projects from the command line",
    long_about = "Query the project catalog with semantic ranking when configured, falling back \
                  to keyword ranking. Supports both single-query and interactive modes.

EXAMPLES:
  Single query:
    project-search --catalog projects.json --query \"machine learning\"

  Joint or URECA projects only, as JSON:
    project-search --catalog projects.json --query \"blockchain\" --joint --format json

  Interactive mode:
    project-search --catalog projects.json --interactive

  List the first 50 software projects:
    project-search --catalog projects.json --browse --category software --top 50"
)]
struct Args {
    /// Project catalog JSON file
    #[arg(long, env = "PROJECTS_FILE", value_name = "FILE")]
    catalog: PathBuf,

    /// Search query (required for single-query mode, omitted in interactive mode)
    #[arg(long, value_name = "TEXT", conflicts_with = "interactive")]
    query: Option<String>,

    /// List the filtered catalog by project number instead of ranking
    #[arg(long, conflicts_with_all = ["query", "interactive"])]
    browse: bool,

    /// Number of results to return
    #[arg(long, value_name = "N", default_value = "20")]
    top: usize,

    /// Only projects whose category contains this text
    #[arg(long, value_name = "TEXT")]
    category: Option<String>,

    /// Only projects whose type contains this text
    #[arg(long = "type", value_name = "TEXT")]
    project_type: Option<String>,

    /// Only projects whose supervisor contains this text
    #[arg(long, value_name = "TEXT")]
    supervisor: Option<String>,

    /// Only joint or URECA projects
    #[arg(long)]
    joint: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Enable interactive REPL mode
    #[arg(long, short = 'i')]
    interactive: bool,

    #[command(flatten)]
    providers: ProviderSettings,

    /// Logging verbosity level
    #[arg(long, default_value = "warn", value_name = "LEVEL")]
    log_level: String,
}

/// Setup logging with the specified level
fn setup_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();
}

/// Execute a search query and return the outcome
async fn execute_search(
    engine: &RankingEngine,
    query_text: &str,
    top: usize,
    filters: &FilterSpec,
    browse: bool,
) -> Result<SearchOutcome> {
    debug!("Executing search for query: {}", query_text);

    let query = SearchQuery::new(query_text.to_string(), Some(top), filters.clone())
        .with_initial_load(browse);

    engine
        .search(&query)
        .await
        .with_context(|| format!("Failed to execute search for query: '{}'", query_text))
}

/// Shorten `text` to at most `max` characters
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Format results as a pretty table
fn format_results_table(results: &[ScoredResult]) -> String {
    if results.is_empty() {
        return "No results found.".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Rank").add_attribute(Attribute::Bold),
        Cell::new("Project").add_attribute(Attribute::Bold),
        Cell::new("Title").add_attribute(Attribute::Bold),
        Cell::new("Supervisor").add_attribute(Attribute::Bold),
        Cell::new("Category").add_attribute(Attribute::Bold),
        Cell::new("Relevance").add_attribute(Attribute::Bold),
        Cell::new("Score").add_attribute(Attribute::Bold),
    ]);

    for (idx, result) in results.iter().enumerate() {
        let color = match result.relevance {
            RelevanceLevel::Strong => Color::Green,
            RelevanceLevel::Moderate => Color::Yellow,
            RelevanceLevel::Low => Color::DarkGrey,
        };

        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(&result.project.project_no),
            Cell::new(truncate(&result.project.title, 60)),
            Cell::new(truncate(&result.project.supervisor, 30)),
            Cell::new(truncate(&result.project.category, 24)),
            Cell::new(result.relevance.as_str()).fg(color),
            Cell::new(format!("{:.4}", result.score)),
        ]);
    }

    table.to_string()
}

/// Format results as JSON
fn format_results_json(outcome: &SearchOutcome) -> Result<String> {
    let value = serde_json::json!({
        "results": outcome.results,
        "total": outcome.total,
        "usingSemantic": outcome.using_semantic,
    });
    serde_json::to_string_pretty(&value).with_context(|| "Failed to serialize results to JSON")
}

/// Print an outcome in the selected format
fn print_outcome(outcome: &SearchOutcome, format: &OutputFormat, elapsed_secs: f64) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", format_results_table(&outcome.results));
            println!(
                "\nShowing {} of {} results in {:.2}s ({} ranking)",
                outcome.results.len(),
                outcome.total,
                elapsed_secs,
                if outcome.using_semantic { "semantic" } else { "keyword" }
            );
        }
        OutputFormat::Json => println!("{}", format_results_json(outcome)?),
    }
    Ok(())
}

/// Display detailed view of a single result
fn display_result_detail(result: &ScoredResult, rank: usize) {
    let project = &result.project;
    println!("\n{}", "═".repeat(80));
    println!("Rank: {}", rank);
    println!("Project: {}", project.project_no);
    println!("Title: {}", project.title);
    println!("Supervisor: {}", project.supervisor);
    println!("Category: {}", project.category);
    println!("Type: {}", project.project_type);
    println!("Joint/URECA: {}", project.is_joint_or_ureca);
    println!("Keywords: {}", project.keywords.join(", "));
    println!("Relevance: {}", result.relevance.as_str());
    println!("Score: {:.4}", result.score);
    println!("\nSummary:\n{}", project.summary);
    println!("{}", "═".repeat(80));
}

fn print_help() {
    println!("Commands:");
    println!("  <query>             - Search for projects");
    println!("  /top N              - Set number of results to N");
    println!("  /filter KEY VALUE   - Filter by category, type or supervisor");
    println!("  /filter clear       - Clear all filters");
    println!("  /joint on|off       - Only joint or URECA projects");
    println!("  /format table|json  - Choose output format");
    println!("  /detail N           - Show full details for result rank N");
    println!("  /help               - Show this help");
    println!("  Ctrl+D or Ctrl+C    - Exit");
}

/// Run interactive REPL mode
async fn run_interactive(
    engine: RankingEngine,
    mut top: usize,
    mut filters: FilterSpec,
    mut format: OutputFormat,
) -> Result<()> {
    println!(
        "Interactive Project Search ({} projects, semantic ranking {})",
        engine.catalog().len(),
        if engine.semantic_configured() { "on" } else { "off" }
    );
    print_help();
    println!();

    let mut rl = DefaultEditor::new().with_context(|| "Failed to create readline editor")?;

    let mut last_results: Vec<ScoredResult> = Vec::new();

    loop {
        let readline = rl.readline("Search> ");
        match readline {
            Ok(line) => {
                let line = line.trim();

                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(line).ok();

                if line.starts_with('/') {
                    let parts: Vec<&str> = line.split_whitespace().collect();
                    match parts[0] {
                        "/help" => print_help(),
                        "/top" => match parts.get(1).map(|n| n.parse::<usize>()) {
                            Some(Ok(n)) if n > 0 => {
                                top = n;
                                println!("Set top to {}", top);
                            }
                            _ => eprintln!("Usage: /top N (N must be a positive integer)"),
                        },
                        "/filter" => {
                            if parts.len() == 2 && parts[1] == "clear" {
                                filters = FilterSpec::default();
                                println!("Cleared filters");
                            } else if parts.len() >= 3 {
                                let value = Some(parts[2..].join(" "));
                                match parts[1] {
                                    "category" => filters.category = value,
                                    "type" => filters.project_type = value,
                                    "supervisor" => filters.supervisor = value,
                                    other => {
                                        eprintln!("Unknown filter '{}': use category, type or supervisor", other);
                                        continue;
                                    }
                                }
                                println!("Filters: {:?}", filters);
                            } else {
                                eprintln!("Usage: /filter KEY VALUE  or  /filter clear");
                            }
                        }
                        "/joint" => match parts.get(1) {
                            Some(&"on") => {
                                filters.joint_or_ureca = true;
                                println!("Showing joint or URECA projects only");
                            }
                            Some(&"off") => {
                                filters.joint_or_ureca = false;
                                println!("Showing all projects");
                            }
                            _ => eprintln!("Usage: /joint on|off"),
                        },
                        "/format" => match parts.get(1) {
                            Some(&"table") => {
                                format = OutputFormat::Table;
                                println!("Set output format to table");
                            }
                            Some(&"json") => {
                                format = OutputFormat::Json;
                                println!("Set output format to JSON");
                            }
                            _ => eprintln!("Usage: /format [table|json]"),
                        },
                        "/detail" => match parts.get(1).map(|n| n.parse::<usize>()) {
                            Some(Ok(rank)) if rank > 0 && rank <= last_results.len() => {
                                display_result_detail(&last_results[rank - 1], rank);
                            }
                            Some(Ok(rank)) if rank > last_results.len() => {
                                eprintln!(
                                    "Rank {} out of range (last search had {} results)",
                                    rank,
                                    last_results.len()
                                );
                            }
                            _ => eprintln!("Usage: /detail N (N must be a positive integer)"),
                        },
                        _ => eprintln!("Unknown command: {}. Type /help for available commands.", parts[0]),
                    }
                } else {
                    let start = Instant::now();
                    match execute_search(&engine, line, top, &filters, false).await {
                        Ok(outcome) => {
                            if let Err(e) = print_outcome(&outcome, &format, start.elapsed().as_secs_f64()) {
                                eprintln!("Error formatting results: {}", e);
                            }
                            last_results = outcome.results;
                        }
                        Err(e) => eprintln!("Search failed: {:#}", e),
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                error!("Error reading input: {}", err);
                break;
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args.log_level);

    if !args.interactive && !args.browse && args.query.is_none() {
        anyhow::bail!(
            "One of --query, --browse or --interactive must be specified.\n\
             Use --help for usage information."
        );
    }

    if args.top == 0 {
        anyhow::bail!("--top must be at least 1");
    }

    info!("Loading catalog from: {}", args.catalog.display());
    let catalog = Catalog::load(&JsonFileSource::new(&args.catalog))
        .await
        .with_context(|| format!("Failed to load project catalog from {:?}", args.catalog))?;

    let engine = args
        .providers
        .ranking_engine(Arc::new(catalog))
        .context("Failed to configure semantic search")?;

    let filters = FilterSpec {
        category: args.category,
        project_type: args.project_type,
        supervisor: args.supervisor,
        joint_or_ureca: args.joint,
    };

    if args.interactive {
        run_interactive(engine, args.top, filters, args.format).await?;
    } else {
        let query = args.query.unwrap_or_default();
        let start = Instant::now();
        let outcome = execute_search(&engine, &query, args.top, &filters, args.browse).await?;
        print_outcome(&outcome, &args.format, start.elapsed().as_secs_f64())?;
    }

    Ok(())
}
