//! astgraph CLI - Python syntax trees as colored graphs.
//!
//! Usage:
//!   astgraph build <file.py>             # Summary of one graph
//!   astgraph build <file.py> --json      # Graph document for a renderer
//!   astgraph scan <dir>                  # Every Python file under dir
//!   astgraph kinds                       # Known node kinds and colors

use anyhow::{bail, Context, Result};
use astgraph::config::{AstGraphConfig, BuilderConfig};
use astgraph::graph::{node_color, scan_directory, AllowList, Preset, SyntaxGraph};
use astgraph::{NodeKind, SyntaxGraphBuilder};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = "astgraph.toml";

#[derive(Parser)]
#[command(name = "astgraph")]
#[command(about = "astgraph - Python syntax trees as colored graphs", long_about = None)]
struct Cli {
    /// Configuration file (default: ./astgraph.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the graph for one source file
    Build {
        /// Python source file
        path: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,

        /// Print the graph as JSON instead of a summary
        #[arg(long)]
        json: bool,

        /// Write the JSON document to a file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build graphs for every Python file in a directory
    Scan {
        /// Directory to walk (honours .gitignore)
        dir: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// List node kinds with their colors
    Kinds,
}

#[derive(Args)]
struct FilterArgs {
    /// Allow-list preset: full or definitions
    #[arg(short, long)]
    preset: Option<Preset>,

    /// Keep every syntax node
    #[arg(long)]
    no_filter: bool,

    /// Keep this kind (repeatable; overrides --preset)
    #[arg(short, long = "allow", value_name = "KIND")]
    allow: Vec<String>,
}

impl FilterArgs {
    /// Command-line flags layered over the configuration file.
    fn resolve(&self, base: BuilderConfig) -> Result<BuilderConfig> {
        let mut config = if !self.allow.is_empty() {
            BuilderConfig::with_allow_list(AllowList::from_names(&self.allow)?)
        } else if let Some(preset) = self.preset {
            BuilderConfig::preset(preset)
        } else {
            base
        };
        if self.no_filter {
            config.filtering_enabled = false;
        }
        Ok(config)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    if cli.config.is_some() && !config_path.exists() {
        bail!("config file not found: {}", config_path.display());
    }

    match cli.command {
        Commands::Build {
            path,
            filter,
            json,
            output,
        } => {
            let config = filter.resolve(load_config(&config_path)?)?;
            let graph = SyntaxGraphBuilder::new(config).build_file(&path)?;

            if let Some(output) = output {
                let document = serde_json::to_string_pretty(&graph)?;
                fs::write(&output, document)
                    .with_context(|| format!("cannot write {}", output.display()))?;
                println!("✓ Graph written to {}", output.display());
            } else if json {
                println!("{}", serde_json::to_string_pretty(&graph)?);
            } else {
                print_summary(&path, &graph);
            }
        }

        Commands::Scan { dir, filter } => {
            if !dir.is_dir() {
                bail!("not a directory: {}", dir.display());
            }
            let config = filter.resolve(load_config(&config_path)?)?;
            let results = scan_directory(&dir, &config);

            let mut failed = 0;
            for file in &results {
                match &file.result {
                    Ok(graph) => println!(
                        "  {}  nodes={} edges={}",
                        file.path.display(),
                        graph.node_count(),
                        graph.edge_count()
                    ),
                    Err(e) => {
                        failed += 1;
                        println!("✗ {}  {}", file.path.display(), e);
                    }
                }
            }
            println!();
            println!("{} files, {} failed", results.len(), failed);

            if failed > 0 {
                bail!("{} of {} files failed to build", failed, results.len());
            }
        }

        Commands::Kinds => {
            for kind in NodeKind::ALL {
                println!("{:<18} {}", kind, node_color(*kind));
            }
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<BuilderConfig> {
    let config = AstGraphConfig::load(path)?;
    Ok(config.builder_config()?)
}

fn print_summary(path: &Path, graph: &SyntaxGraph) {
    let stats = graph.stats();
    println!("✓ {}", path.display());
    println!("  Nodes: {}", stats.node_count);
    println!("  Edges: {}", stats.edge_count);
    println!("  Depth: {}", stats.max_depth);
    if !stats.kinds.is_empty() {
        println!();
        println!("Kinds:");
        for (kind, count) in &stats.kinds {
            println!("  {:<18} {}", kind.as_str(), count);
        }
    }
}
