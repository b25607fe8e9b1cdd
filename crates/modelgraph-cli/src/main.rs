//! CLI binary for loading, validating and inspecting model stores.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use modelgraph_loader::{LoaderConfig, ModelLoader, SequentialIds, StageContext, SuffixVersion};
use modelgraph_store::{MemoryNode, MemoryStore};
use modelgraph_types::ModelError;

#[derive(Parser)]
#[command(name = "modelgraph", version, about = "Hierarchical model store loader")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Loader configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a subtree and print it
    Load {
        /// Path to the store .json document
        store: PathBuf,

        /// Path of the node to load from (default: the store root)
        #[arg(long)]
        root: Option<String>,

        /// What to print
        #[arg(long, value_enum, default_value = "output")]
        format: Format,

        /// Identifier scheme for output objects
        #[arg(long, value_enum, default_value = "uuid")]
        ids: Ids,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load and resolve a subtree, reporting the first integrity error
    Validate {
        /// Path to the store .json document
        store: PathBuf,

        #[arg(long)]
        root: Option<String>,
    },

    /// Show record counts per type
    Info {
        /// Path to the store .json document
        store: PathBuf,

        #[arg(long)]
        root: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// Records nested through their child lists
    Tree,
    /// Every record keyed by path
    Flat,
    /// Transformed output model
    Output,
}

#[derive(Clone, Copy, ValueEnum)]
enum Ids {
    Uuid,
    Sequential,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match cli.config {
        Some(ref path) => LoaderConfig::from_file(path)?,
        None => LoaderConfig::default(),
    };

    match cli.command {
        Commands::Load {
            store,
            root,
            format,
            ids,
            output,
        } => {
            cmd_load(config, &store, root.as_deref(), format, ids, output.as_deref()).await?;
        }
        Commands::Validate { store, root } => {
            cmd_validate(config, &store, root.as_deref()).await?;
        }
        Commands::Info { store, root } => {
            cmd_info(config, &store, root.as_deref()).await?;
        }
    }

    Ok(())
}

fn open_store(path: &Path, root: Option<&str>) -> anyhow::Result<(MemoryStore, MemoryNode)> {
    let store = MemoryStore::from_file(path)?;
    let node = match root {
        Some(p) => store
            .node(p)
            .ok_or_else(|| anyhow::anyhow!("No node at path '{}'", p))?,
        None => store
            .root()
            .ok_or_else(|| anyhow::anyhow!("Store {} has no root node", path.display()))?,
    };
    Ok((store, node))
}

async fn cmd_load(
    config: LoaderConfig,
    path: &Path,
    root: Option<&str>,
    format: Format,
    ids: Ids,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let (store, node) = open_store(path, root)?;

    let mut loader = ModelLoader::with_config(config);
    if let Ids::Sequential = ids {
        loader = loader.with_context(StageContext::new(
            Arc::new(SequentialIds::new("id-")),
            Arc::new(SuffixVersion::default()),
        ));
    }

    let value = match format {
        Format::Tree => loader.load_graph(&store, &node).await?.to_tree_json(),
        Format::Flat => loader.load_graph(&store, &node).await?.to_flat_json(),
        Format::Output => serde_json::to_value(&loader.load(&store, &node).await?.output)?,
    };
    let rendered = serde_json::to_string_pretty(&value)?;

    match output {
        Some(out) => {
            std::fs::write(out, rendered)?;
            tracing::info!(path = %out.display(), "Wrote model");
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

async fn cmd_validate(config: LoaderConfig, path: &Path, root: Option<&str>) -> anyhow::Result<()> {
    let (store, node) = open_store(path, root)?;
    let loader = ModelLoader::with_config(config);

    match loader.load_graph(&store, &node).await {
        Ok(graph) => {
            println!("Model is valid ({} records)", graph.len());
            Ok(())
        }
        Err(e) => {
            println!("[{}] {}", error_kind(&e), e);
            std::process::exit(1);
        }
    }
}

fn error_kind(e: &ModelError) -> &'static str {
    if e.is_integrity() {
        "INTEGRITY"
    } else if e.is_store_failure() {
        "STORE"
    } else {
        "ERROR"
    }
}

async fn cmd_info(config: LoaderConfig, path: &Path, root: Option<&str>) -> anyhow::Result<()> {
    let (store, node) = open_store(path, root)?;
    let graph = ModelLoader::with_config(config)
        .load_graph(&store, &node)
        .await?;

    let root = graph.root();
    println!("Root: {} ({})", root.name, if root.path.is_empty() { "/" } else { &root.path });
    println!("Type: {}", root.node_type);
    println!("Records: {}", graph.len());

    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    for (_, record) in graph.iter() {
        *by_type.entry(record.node_type.as_str()).or_default() += 1;
    }
    println!("\nTypes:");
    for (node_type, count) in by_type {
        println!("  {} {}", node_type, count);
    }
    Ok(())
}
