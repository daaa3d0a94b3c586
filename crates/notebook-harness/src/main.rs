//! # Notebook Harness CLI (`nbx`)
//!
//! The `nbx` binary is a thin operational shell over the notebook-backed
//! storage adapter: collection management, record smoke operations,
//! semantic search, and health/stats checks.
//!
//! Record reads (`get`, `count`) answer from the in-process cache, so they
//! only reflect records inserted earlier in the same invocation or
//! process; the adapter does not persist its cache.
//!
//! ## Usage
//!
//! ```bash
//! nbx --config ./config/nbx.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `nbx collections` | List mapped collections |
//! | `nbx info <collection>` | Show notebook metadata for a collection |
//! | `nbx create <name>` | Create a notebook for a new collection |
//! | `nbx drop <name>` | Delete a collection's notebook |
//! | `nbx insert <collection> <content>` | Insert a record, print its id |
//! | `nbx search <collection> "<query>"` | Semantic search over a collection |
//! | `nbx health` | Check the notebook service answers |
//! | `nbx stats` | Show adapter statistics |

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use notebook_harness::backend::NotebookBackend;
use notebook_harness::config;
use notebook_harness_core::models::RecordDraft;
use notebook_harness_core::store::{CollectionStore, SearchRequest};

/// Notebook Harness CLI — a document-collection storage adapter backed by
/// a semantic notebook service.
#[derive(Parser)]
#[command(
    name = "nbx",
    about = "Notebook Harness — a document-collection storage adapter backed by a semantic notebook service",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/nbx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// List mapped collections.
    Collections,

    /// Show notebook metadata and statistics for a collection.
    Info {
        /// Collection name.
        collection: String,
    },

    /// Create a notebook for a new collection and add it to the mapping.
    ///
    /// The mapping change lives only for this process; persist it in the
    /// config file to keep it.
    Create {
        /// Collection name.
        name: String,

        /// Notebook description.
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a collection's notebook and forget the mapping.
    Drop {
        /// Collection name.
        name: String,
    },

    /// Insert a single record and print the generated id.
    Insert {
        /// Collection name.
        collection: String,

        /// Record content.
        content: String,

        /// Record URI. Defaults to a generated `nbx://` URI.
        #[arg(long)]
        uri: Option<String>,

        /// Record title. Defaults to the last URI segment.
        #[arg(long)]
        title: Option<String>,

        /// Context classification (resource, memory, skill).
        #[arg(long)]
        context_type: Option<String>,
    },

    /// Semantic search over a collection.
    Search {
        /// Collection name.
        collection: String,

        /// Free-text query.
        query: String,

        /// Maximum number of results.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Check whether the notebook service answers.
    Health,

    /// Show adapter statistics.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let backend = NotebookBackend::connect(&cfg)?;

    match cli.command {
        Commands::Collections => {
            for name in backend.list_collections().await? {
                println!("{name}");
            }
        }
        Commands::Info { collection } => match backend.collection_info(&collection).await? {
            Some(info) => {
                println!("{}", serde_json::to_string_pretty(&info)?);
            }
            None => {
                println!("Collection '{collection}' not found.");
                std::process::exit(1);
            }
        },
        Commands::Create { name, description } => {
            let schema = match description {
                Some(d) => json!({ "description": d }),
                None => json!({}),
            };
            if backend.create_collection(&name, &schema).await? {
                println!("Created collection '{name}'.");
            } else {
                println!("Collection '{name}' not created (already mapped or service error).");
                std::process::exit(1);
            }
        }
        Commands::Drop { name } => {
            if backend.drop_collection(&name).await? {
                println!("Dropped collection '{name}'.");
            } else {
                println!("Collection '{name}' not dropped.");
                std::process::exit(1);
            }
        }
        Commands::Insert {
            collection,
            content,
            uri,
            title,
            context_type,
        } => {
            let id = backend
                .insert(
                    &collection,
                    RecordDraft {
                        uri,
                        content: Some(content),
                        title,
                        context_type,
                        ..Default::default()
                    },
                )
                .await?;
            println!("{id}");
        }
        Commands::Search {
            collection,
            query,
            limit,
        } => {
            let hits = backend
                .search(
                    &collection,
                    SearchRequest {
                        filter: Some(json!({ "query": query })),
                        limit,
                        ..Default::default()
                    },
                )
                .await?;
            if hits.is_empty() {
                println!("No results.");
            } else {
                for hit in hits {
                    let score = hit.get("_score").and_then(|s| s.as_f64()).unwrap_or(0.0);
                    let title = hit.get("title").and_then(|t| t.as_str()).unwrap_or("");
                    let snippet = hit.get("content").and_then(|c| c.as_str()).unwrap_or("");
                    println!("[{score:.1}] {title}");
                    if !snippet.is_empty() {
                        println!("      {snippet}");
                    }
                }
            }
        }
        Commands::Health => {
            if backend.health_check().await? {
                println!("ok");
            } else {
                println!("notebook service unreachable");
                std::process::exit(1);
            }
        }
        Commands::Stats => {
            let stats = backend.stats().await?;
            println!("Notebook Harness — Adapter Stats");
            println!("================================");
            println!();
            println!("  Backend:       {}", stats.backend);
            println!("  Collections:   {}", stats.collections);
            println!("  Cached records: {}", stats.total_records);
            println!(
                "  Tiers:         L0 <= {} words, L1 <= {} words, L2 unlimited",
                stats.tier_config.l0, stats.tier_config.l1
            );
        }
    }

    Ok(())
}
