//! Lorekeep CLI - knowledge graph memory over plain text

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use lorekeep_core::config::{Config, GraphBackend};
use lorekeep_core::domain::graph::{EntityResolver, GraphStore, MergeEngine};
use lorekeep_core::domain::ingest::{InMemoryDocumentIndex, IngestService, TripleExtractor};
use lorekeep_core::infrastructure::graph::{EmbeddedGraphStore, SqliteGraphStore};
use lorekeep_core::llm::LlmClient;
use lorekeep_core::storage::{Database, DatabaseConfig};

#[derive(Parser)]
#[command(name = "lorekeep")]
#[command(author, version, about = "Knowledge graph memory over plain text", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a document into the graph
    Ingest {
        /// File to ingest
        file: Option<PathBuf>,
        /// Ingest this text instead of a file
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,
        /// Document type recorded in the minted uid
        #[arg(long)]
        doc_type: Option<String>,
    },

    /// Show every relation of an entity
    Relations {
        /// Entity label (aliases and space/underscore variants match)
        label: String,
    },

    /// Search ingested documents
    Search {
        query: String,
        /// Maximum results
        #[arg(short, long, default_value_t = 5)]
        k: usize,
    },

    /// Show graph statistics
    Stats,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the active configuration
    Show,
    /// Show config file path
    Path,
    /// Reset configuration to defaults
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lorekeep=warn".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest {
            file,
            text,
            doc_type,
        } => cmd_ingest(file, text, doc_type.as_deref(), cli.format, cli.quiet).await,

        Commands::Relations { label } => cmd_relations(&label, cli.format).await,

        Commands::Search { query, k } => cmd_search(&query, k, cli.format).await,

        Commands::Stats => cmd_stats(cli.format).await,

        Commands::Config { action } => cmd_config(action, cli.quiet),

        Commands::Doctor => cmd_doctor(cli.quiet).await,
    }
}

/// Build the configured graph store backend
async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn GraphStore>> {
    match config.graph.backend {
        GraphBackend::Embedded => {
            let store = EmbeddedGraphStore::open(config.graph.snapshot_path()?)?;
            Ok(Arc::new(store))
        }
        GraphBackend::Sqlite => {
            let db =
                Database::new(DatabaseConfig::with_path(config.graph.database_path()?)).await?;
            Ok(Arc::new(SqliteGraphStore::new(&db).await?))
        }
    }
}

/// Wire the full ingest service from configuration
async fn build_service(config: &Config) -> anyhow::Result<IngestService> {
    let store = build_store(config).await?;
    let client = Arc::new(LlmClient::new(config.llm.clone())?);

    let resolver = EntityResolver::new(store.clone())
        .with_disambiguator(client.clone())
        .with_candidate_limit(config.ingest.candidate_limit);
    let merge = MergeEngine::new(store.clone(), resolver);
    let extractor = TripleExtractor::new(client, config.ingest.max_triples);

    Ok(IngestService::new(
        store,
        extractor,
        merge,
        Arc::new(InMemoryDocumentIndex::new()),
    ))
}

async fn cmd_ingest(
    file: Option<PathBuf>,
    text: Option<String>,
    doc_type: Option<&str>,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let content = match (file, text) {
        (Some(path), None) => std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?,
        (None, Some(text)) => text,
        _ => return Err(anyhow::anyhow!("Provide a file to ingest, or --text")),
    };

    let config = Config::load()?;
    let service = build_service(&config).await?;
    let receipt = service.ingest_text(&content, doc_type).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&receipt)?),
        OutputFormat::Text => {
            println!("{}", receipt.doc_uid);
            if !quiet {
                println!(
                    "  Triples: {} extracted, {} merged, {} failed",
                    receipt.extracted, receipt.applied, receipt.failed
                );
                if receipt.failed > 0 {
                    println!("  Some merges failed; re-ingesting is safe.");
                }
            }
        }
    }
    Ok(())
}

async fn cmd_relations(label: &str, format: OutputFormat) -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = build_store(&config).await?;
    let relations = store.relations_of(label).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&relations)?),
        OutputFormat::Text => {
            if relations.is_empty() {
                println!("No relations found for '{}'.", label);
            } else {
                for relation in relations {
                    println!("{}", relation);
                }
            }
        }
    }
    Ok(())
}

async fn cmd_search(query: &str, k: usize, format: OutputFormat) -> anyhow::Result<()> {
    let config = Config::load()?;
    let service = build_service(&config).await?;
    let hits = service.search(query, k).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&hits)?),
        OutputFormat::Text => {
            if hits.is_empty() {
                println!("No documents matched '{}'.", query);
            } else {
                for hit in hits {
                    println!("[{:.2}] {}", hit.score, hit.uid);
                    println!("  {}", hit.content.lines().next().unwrap_or(""));
                }
            }
        }
    }
    Ok(())
}

async fn cmd_stats(format: OutputFormat) -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = build_store(&config).await?;
    let stats = store.stats().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => {
            println!("Nodes: {}", stats.node_count);
            println!("Edges: {}", stats.edge_count);
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            // The config file never contains API keys; neither does this output
            let config = Config::load()?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", Config::config_path()?.display());
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
    }
    Ok(())
}

async fn cmd_doctor(quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        println!("Lorekeep Health Check");
        println!("=====================");
        println!();
    }

    let mut all_ok = true;

    // Configuration
    let config = match Config::load() {
        Ok(config) => {
            println!("[OK] Configuration: Valid");
            Some(config)
        }
        Err(e) => {
            all_ok = false;
            println!("[!!] Configuration: Error - {}", e);
            None
        }
    };

    if let Some(config) = &config {
        // API key (optional: local endpoints need none)
        match config.llm.redacted_api_key() {
            Ok(Some(redacted)) => println!("[OK] API Key: Configured ({})", redacted),
            Ok(None) => {
                println!("[--] API Key: Not set (fine for local endpoints)");
                println!("     Set LOREKEEP_API_KEY or OPENAI_API_KEY for hosted providers");
            }
            Err(e) => {
                all_ok = false;
                println!("[!!] API Key: Error - {}", e);
            }
        }

        // Config file location
        match Config::config_path() {
            Ok(path) if path.exists() => println!("[OK] Config file: {}", path.display()),
            Ok(path) => println!("[--] Config file: {} (using defaults)", path.display()),
            Err(e) => println!("[!!] Config file: Error - {}", e),
        }

        // Graph store
        match config.graph.backend {
            GraphBackend::Embedded => match config.graph.snapshot_path() {
                Ok(path) => match EmbeddedGraphStore::open(&path) {
                    Ok(store) => {
                        let stats = store.stats().await.unwrap_or_default();
                        println!("[OK] Graph store: Embedded ({})", path.display());
                        println!(
                            "     Nodes: {}, Edges: {}",
                            stats.node_count, stats.edge_count
                        );
                    }
                    Err(e) => {
                        all_ok = false;
                        println!("[!!] Graph store: Snapshot error - {}", e);
                    }
                },
                Err(e) => {
                    all_ok = false;
                    println!("[!!] Graph store: {}", e);
                }
            },
            GraphBackend::Sqlite => match config.graph.database_path() {
                Ok(path) => match Database::new(DatabaseConfig::with_path(&path)).await {
                    Ok(db) => match db.health_check().await {
                        Ok(()) => {
                            println!("[OK] Graph store: SQLite ({})", path.display());
                            match db.migration_status().await {
                                Ok(status) if status.needs_migration => println!(
                                    "[!!] Database: Migrations pending (v{} -> v{})",
                                    status.current_version, status.target_version
                                ),
                                Ok(status) => {
                                    println!("[OK] Database: Schema v{}", status.current_version)
                                }
                                Err(e) => {
                                    println!("[!!] Database: Migration check failed - {}", e)
                                }
                            }
                            match SqliteGraphStore::new(&db).await {
                                Ok(store) if store.fuzzy_matching() => {
                                    println!("[OK] Fuzzy matching: editdist3 available")
                                }
                                Ok(_) => println!(
                                    "[--] Fuzzy matching: editdist3 unavailable, using substring fallback"
                                ),
                                Err(e) => println!("[!!] Graph store: {}", e),
                            }
                        }
                        Err(e) => {
                            all_ok = false;
                            println!("[!!] Database: Health check failed - {}", e);
                        }
                    },
                    Err(e) => {
                        all_ok = false;
                        println!("[!!] Database: Failed to open - {}", e);
                    }
                },
                Err(e) => {
                    all_ok = false;
                    println!("[!!] Graph store: {}", e);
                }
            },
        }

        // Generation endpoint
        let probe_url = format!("{}/models", config.llm.base_url);
        let probe = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()?
            .get(&probe_url)
            .send()
            .await;
        match probe {
            Ok(response) if response.status().is_success() || response.status().as_u16() == 401 => {
                println!("[OK] Generation endpoint: Reachable ({})", config.llm.base_url);
                println!("     Model: {}", config.llm.model);
            }
            Ok(response) => {
                println!(
                    "[--] Generation endpoint: Unexpected status {} from {}",
                    response.status(),
                    probe_url
                );
            }
            Err(e) => {
                // Ingestion still works without it; triples just come back empty
                println!("[--] Generation endpoint: Unreachable - {}", e);
                println!("     Ingestion degrades to storing documents without triples");
            }
        }
    }

    if !quiet {
        println!();
        if all_ok {
            println!("All checks passed!");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }

    Ok(())
}
