//! markdown-graph CLI tool
//!
//! ## Commands
//!
//! - `generate`: scan a directory once and write the graph JSON
//! - `watch`: scan, write, then keep the graph JSON current until Ctrl-C
//!
//! Settings come from the command line, then a `markdown-graph.toml` or
//! `.markdown-graph.json` config file, then built-in defaults.

use clap::{Args, Parser, Subcommand};
use markdown_graph::{
    config::{ConfigOverrides, GraphConfig},
    event::WatchEvent,
    garden::create_garden,
    report_error,
    watch::GraphWatcher,
    GraphError,
};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

#[derive(Parser)]
#[command(name = "markdown-graph")]
#[command(author, version, about = "Build a node/link graph from a directory of markdown notes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Directory containing the markdown files (default: current directory)
    #[arg(short = 't', long)]
    target_directory: Option<PathBuf>,

    /// Where to write the graph JSON (default: <target-directory>/.garden-graph.json)
    #[arg(short = 'o', long)]
    output_file: Option<PathBuf>,

    /// Directory name to skip. Repeat for several
    #[arg(short = 'e', long = "exclude")]
    excludes: Vec<String>,

    /// Include hidden files and directories
    #[arg(long)]
    include_hidden: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Only report errors
    #[arg(short, long)]
    quiet: bool,

    /// Emit bare node ids without labels, metadata or links
    #[arg(long)]
    just_node_names: bool,

    /// Only create one node per document
    #[arg(long)]
    no_sections: bool,
}

impl CommonArgs {
    fn overrides(&self) -> ConfigOverrides {
        let flag = |set: bool| set.then_some(true);
        ConfigOverrides {
            target_directory: self.target_directory.clone(),
            output_file: self.output_file.clone(),
            verbose: flag(self.verbose),
            quiet: flag(self.quiet),
            excludes: (!self.excludes.is_empty()).then(|| self.excludes.clone()),
            include_hidden: flag(self.include_hidden),
            debounce_ms: None,
            just_node_names: flag(self.just_node_names),
            no_sections: flag(self.no_sections),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the target directory once and write the graph
    Generate {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Write the graph, then rewrite it whenever a markdown file changes
    Watch {
        #[command(flatten)]
        common: CommonArgs,

        /// Quiet period in milliseconds before a changed graph is written (default: 300)
        #[arg(short, long)]
        debounce_ms: Option<u64>,
    },
}

fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
}

async fn generate(config: GraphConfig) -> Result<(), GraphError> {
    let garden = create_garden(config.repository_options()).await?;
    let output = garden.save().await?;
    for diagnostic in garden.diagnostics.iter() {
        tracing::warn!("{}", diagnostic);
    }
    tracing::info!(
        "Graph with {} nodes and {} links written to {}",
        garden.graph.nodes.len(),
        garden.graph.links.len(),
        output.display()
    );
    Ok(())
}

async fn watch(config: GraphConfig) -> Result<(), GraphError> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| GraphError::Unexpected(format!("cannot install Ctrl-C handler: {e}")))?;

    let mut watcher = GraphWatcher::new(config.watch_options());
    let mut events = watcher.subscribe();
    watcher.start().await?;
    tracing::info!("Press Ctrl+C to stop watching");

    while running.load(Ordering::SeqCst) {
        match tokio::time::timeout(Duration::from_millis(100), events.recv()).await {
            Ok(Ok(WatchEvent::GraphWritten {
                output_file,
                node_count,
                link_count,
            })) => tracing::debug!(
                "Graph written to {} ({} nodes, {} links)",
                output_file.display(),
                node_count,
                link_count
            ),
            Ok(Ok(_)) | Err(_) => {}
            Ok(Err(e)) => tracing::debug!("Event stream: {}", e),
        }
    }

    tracing::info!("Shutting down...");
    watcher.stop().await
}

fn run(command: Commands, config: GraphConfig) -> Result<(), GraphError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        match command {
            Commands::Generate { .. } => generate(config).await,
            Commands::Watch { .. } => watch(config).await,
        }
    })
}

fn main() {
    let cli = Cli::parse();
    let (common, debounce_ms) = match &cli.command {
        Commands::Generate { common } => (common, None),
        Commands::Watch {
            common,
            debounce_ms,
        } => (common, *debounce_ms),
    };
    let overrides = ConfigOverrides {
        debounce_ms,
        ..common.overrides()
    };

    let resolved = std::env::current_dir()
        .map_err(GraphError::from)
        .and_then(|dir| GraphConfig::resolve(overrides, &dir));
    let config = match resolved {
        Ok(config) => config,
        Err(e) => {
            // The config could not be read, so only the command line decides verbosity.
            let fallback = GraphConfig {
                verbose: common.verbose,
                quiet: common.quiet && !common.verbose,
                ..GraphConfig::default()
            };
            init_logging(fallback.log_level());
            report_error(&e, fallback.verbose);
            std::process::exit(1);
        }
    };

    init_logging(config.log_level());
    let verbose = config.verbose;
    if let Err(e) = run(cli.command, config) {
        report_error(&e, verbose);
        std::process::exit(1);
    }
}
