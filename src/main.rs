//! chunkindex CLI
//!
//! Command-line interface for managing sidecar chunk indexes:
//! - Create an index for a source archive
//! - Synchronize an index with its source files
//! - Inspect an existing index
//! - Generate a default config file

use anyhow::Context;
use chunkindex::config::{generate_default_config, Config};
use chunkindex::index::{
    BlockManifestTranslator, IndexBuilder, IndexConfig, IndexStore, OpenMode, SyncOptions,
};
use chunkindex::vfs::{filesystem_for, FileSystem, LocalFileSystem};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "chunkindex")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Manage sidecar chunk indexes for remote NetCDF/HDF5 archives")]
#[command(
    long_about = "A chunk index is a directory holding one configuration blob plus a \
mirrored tree of chunk manifests, one JSON manifest per source file. Manifests let \
readers fetch byte ranges of remote files without re-parsing their format."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a config file (default: standard locations)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new chunk index
    Create {
        /// Index directory path (default: from config)
        #[arg(long)]
        index: Option<String>,

        /// Source path or URL, e.g. /data/smos or s3://bucket/SMOS
        #[arg(long)]
        source: String,

        /// Source protocol; derived from the source path when omitted
        #[arg(long)]
        protocol: Option<String>,

        /// Source storage option in key=value form; repeatable
        #[arg(long = "option", value_name = "KEY=VALUE")]
        options: Vec<String>,

        /// Scan category in name=prefix form; repeatable
        #[arg(long = "category", value_name = "NAME=PREFIX")]
        categories: Vec<String>,

        /// Replace an existing index
        #[arg(long)]
        replace: bool,
    },

    /// Synchronize a chunk index with its source files
    Sync {
        /// Index directory path (default: from config)
        #[arg(long)]
        index: Option<String>,

        /// Only process files under this source prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Number of concurrent workers (default: from config)
        #[arg(long)]
        workers: Option<usize>,

        /// Files per dispatched block (default: from config)
        #[arg(long)]
        block_size: Option<usize>,

        /// Do not skip existing manifests
        #[arg(long)]
        force: bool,

        /// Do not write any manifests
        #[arg(long)]
        dry_run: bool,
    },

    /// Show information about a chunk index
    Info {
        /// Index directory path (default: from config)
        #[arg(long)]
        index: Option<String>,
    },

    /// Generate a default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let app_config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    init_logging(&app_config);

    match cli.command {
        Commands::Create {
            index,
            source,
            protocol,
            options,
            categories,
            replace,
        } => {
            let index_root = resolve_index_root(index, &app_config);

            let mut config = IndexConfig::new(source);
            if let Some(protocol) = protocol {
                config = config.protocol(protocol);
            }
            config = config.storage_options(parse_key_values(&options)?);
            for (name, prefix) in parse_pairs(&categories)? {
                config = config.path_prefix(name, prefix);
            }

            let fs: Arc<dyn FileSystem> = Arc::new(LocalFileSystem::new());
            let store = IndexStore::create(fs, &index_root, config, replace).await?;
            println!("Created empty index {}", store.root());
        }

        Commands::Sync {
            index,
            prefix,
            workers,
            block_size,
            force,
            dry_run,
        } => {
            let index_root = resolve_index_root(index, &app_config);
            let builder = open_builder(&index_root, &app_config).await?;

            let mut options = SyncOptions::default()
                .workers(workers.unwrap_or(app_config.sync.num_workers))
                .block_size(block_size.unwrap_or(app_config.sync.block_size))
                .force(force)
                .dry_run(dry_run);
            if let Some(prefix) = prefix {
                options = options.prefix(prefix);
            }

            let report = builder.sync(&options).await?;
            println!(
                "{} file(s) synchronized in {}",
                report.files_indexed, index_root
            );
            if !report.problems.is_empty() {
                println!("{} problem(s) encountered:", report.problems.len());
                for problem in &report.problems {
                    println!("  {problem}");
                }
            }
        }

        Commands::Info { index } => {
            let index_root = resolve_index_root(index, &app_config);
            let fs: Arc<dyn FileSystem> = Arc::new(LocalFileSystem::new());
            let store = IndexStore::open(fs, &index_root, OpenMode::Read).await?;
            let config = store.config();

            println!("Index path: {}", store.root());
            println!("Index version: {}", config.version);
            println!("Source path: {}", config.source_path);
            println!("Source protocol: {}", config.source_protocol);
            if config.path_prefixes.is_empty() {
                println!("No defined scan categories.");
            } else {
                println!("Scan categories:");
                for (name, prefix) in &config.path_prefixes {
                    println!("  {name}: {prefix}");
                }
            }
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("writing config to {path:?}"))?;
                    println!("Wrote default config to {path:?}");
                }
                None => print!("{content}"),
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| format!("chunkindex={}", config.logging.level)),
    );
    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn resolve_index_root(index: Option<String>, config: &Config) -> String {
    index.unwrap_or_else(|| config.index.root.clone())
}

/// Open the store named by `index_root` and wire up a builder for its
/// configured source protocol.
async fn open_builder(index_root: &str, app_config: &Config) -> anyhow::Result<IndexBuilder> {
    let index_fs: Arc<dyn FileSystem> = Arc::new(LocalFileSystem::new());
    let store = IndexStore::open(index_fs, index_root, OpenMode::Write)
        .await?
        .with_cache_size(app_config.index.cache_size);

    let protocol = store.config().source_protocol.clone();
    let source_fs = filesystem_for(&protocol)
        .with_context(|| format!("no storage backend for protocol {protocol:?}"))?;

    let builder = IndexBuilder::new(
        Arc::new(store),
        source_fs,
        Arc::new(BlockManifestTranslator::default()),
    )
    .source_suffix(app_config.source.suffix.clone());
    Ok(builder)
}

fn parse_pairs(raw: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    raw.iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .with_context(|| format!("expected KEY=VALUE, got {entry:?}"))
        })
        .collect()
}

fn parse_key_values(raw: &[String]) -> anyhow::Result<HashMap<String, serde_json::Value>> {
    Ok(parse_pairs(raw)?
        .into_iter()
        .map(|(k, v)| {
            // Bare words stay strings; valid JSON scalars keep their type
            let value = serde_json::from_str(&v)
                .unwrap_or(serde_json::Value::String(v));
            (k, value)
        })
        .collect())
}
