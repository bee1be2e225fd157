//! # RAG-MCP Assistant CLI (`ragmcp`)
//!
//! ## Usage
//!
//! ```bash
//! ragmcp --config ./config/ragmcp.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragmcp check` | Validate the configuration and print effective settings |
//! | `ragmcp query "<text>"` | Answer one question |
//! | `ragmcp add <paths...>` | Index files or directories (`.txt`, `.md`, `.pdf`) |
//! | `ragmcp refresh` | Reload the vector index from disk |
//! | `ragmcp health` | Print component health |
//! | `ragmcp serve` | Start the HTTP service |
//!
//! Log verbosity follows `RUST_LOG` (default `info`). Logs go to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info_span;
use tracing_subscriber::EnvFilter;

use rag_mcp_assistant::app::App;
use rag_mcp_assistant::config::{load_config, load_config_or_default, Config};
use rag_mcp_assistant::models::{Query, SourceRecord};
use rag_mcp_assistant::server::run_server;

const DEFAULT_CONFIG: &str = "./config/ragmcp.toml";

/// Answer questions from local documents first, falling back to web search.
#[derive(Parser)]
#[command(name = "ragmcp", version)]
struct Cli {
    /// Path to configuration file (TOML). Defaults to `./config/ragmcp.toml`;
    /// built-in defaults are used if that file does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and print the effective settings.
    Check,

    /// Answer a single question.
    Query {
        text: String,

        /// Maximum number of candidates or web results to use.
        #[arg(long)]
        max_results: Option<usize>,

        /// Skip local retrieval and go straight to web search.
        #[arg(long)]
        force_web: bool,

        /// Do not print sources.
        #[arg(long)]
        no_sources: bool,
    },

    /// Add files or directories to the local index.
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Reload the vector index from disk.
    Refresh,

    /// Print component health.
    Health,

    /// Start the HTTP service on `[server].bind`.
    Serve,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(p) => load_config(p),
        None => load_config_or_default(Path::new(DEFAULT_CONFIG)),
    };
    config.context("failed to load configuration")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Check => {
            println!("Configuration OK.\n");
            print!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Query {
            text,
            max_results,
            force_web,
            no_sources,
        } => {
            let app = App::from_config(&config).await?;
            let query = Query::new(text)
                .with_max_results(max_results.unwrap_or(config.retrieval.max_results))
                .force_web(force_web)
                .include_sources(!no_sources);
            let result = app.controller.query(query).await;

            println!(
                "method: {}  confidence: {:.3}  time: {:.2}s\n",
                result.search_method,
                result.confidence,
                result.execution_time.as_secs_f64()
            );
            println!("{}", result.response);

            if !result.sources.is_empty() {
                println!("\nSources:");
                for (i, source) in result.sources.iter().enumerate() {
                    match source {
                        SourceRecord::Local {
                            metadata, score, ..
                        } => {
                            let name = metadata.get("source").map(String::as_str).unwrap_or("?");
                            println!("  {}. {} (distance {:.3})", i + 1, name, score);
                        }
                        SourceRecord::Web(web) => {
                            println!("  {}. {} <{}>", i + 1, web.title, web.url);
                        }
                    }
                }
            }
        }
        Commands::Add { paths } => {
            let app = App::from_config(&config).await?;
            let report = app.retriever.add_documents(&paths).await?;
            println!(
                "Indexed {} files: {} chunks added, {} duplicates skipped.",
                report.files_loaded, report.chunks_added, report.duplicates_skipped
            );
            for path in &report.unsupported {
                println!("  skipped unsupported file: {}", path.display());
            }
            println!("Index now holds {} chunks.", app.retriever.len());
        }
        Commands::Refresh => {
            let app = App::from_config(&config).await?;
            app.retriever.update_vector_store().await?;
            println!("Vector store refreshed: {} chunks.", app.retriever.len());
        }
        Commands::Health => {
            let app = App::from_config(&config).await?;
            let report = app.controller.health().await;
            let status = |ok: bool| if ok { "ok" } else { "unavailable" };
            println!("retriever:   {}", status(report.retriever));
            println!("web_search:  {}", status(report.web_search));
            println!(
                "synthesis:   {} ({})",
                status(report.synthesis),
                report.synthesis_provider
            );
            println!("timestamp:   {}", report.timestamp);
        }
        Commands::Serve => {
            let app = App::from_config(&config).await?;
            run_server(&config, app.controller, info_span!("server")).await?;
        }
    }

    Ok(())
}
