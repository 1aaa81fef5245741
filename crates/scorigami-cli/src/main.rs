//! Scorigami CLI - build, stream and lay out tennis score-sequence graphs.

mod commands;
mod config;
mod http_source;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::FilterArgs;
use scorigami_runtime::encoding::NodeColorMode;
use scorigami_runtime::render::RenderOptions;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "scorigami")]
#[command(author, version, about = "Scorigami - tennis score-sequence graphs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new scorigami project
    Init {
        /// Project directory (default: current directory)
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Show which aggregate a filter selection reads
    Resolve {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Generate synthetic aggregates
    Seed {
        /// Output path (default: the configured store)
        #[arg(short, long)]
        output: Option<String>,

        /// Output format: sqlite or json
        #[arg(short, long, default_value = "sqlite")]
        format: String,

        /// Number of matches to simulate
        #[arg(short, long)]
        matches: Option<usize>,

        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Export the dataset for a selection
    Export {
        /// Output file path
        output: String,

        /// Export format: json or ndjson
        #[arg(short, long, default_value = "json")]
        format: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Stream a selection from a running server
    Fetch {
        #[command(flatten)]
        filter: FilterArgs,

        /// Server base URL (default: from config)
        #[arg(long)]
        server: Option<String>,

        /// Write the render graph as JSON
        #[arg(short, long)]
        output: Option<String>,

        /// Node coloring: category or gradient
        #[arg(short, long, default_value = "category")]
        color: NodeColorMode,
    },

    /// Lay out a selection from the local store
    Layout {
        #[command(flatten)]
        filter: FilterArgs,

        /// Write the render graph as JSON
        #[arg(short, long)]
        output: Option<String>,

        /// Node coloring: category or gradient
        #[arg(short, long, default_value = "category")]
        color: NodeColorMode,
    },

    /// Summarize a saved NDJSON stream
    Inspect {
        /// Stream file
        path: String,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn render_options(config: &Config, color_mode: NodeColorMode) -> RenderOptions {
    RenderOptions {
        color_mode,
        layout: config.layout,
        reducer: config.reducer,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init { path } => commands::init::run(path),
        Commands::Resolve { filter } => commands::resolve::run(&filter),
        Commands::Seed {
            output,
            format,
            matches,
            seed,
        } => commands::seed::run(&Config::load()?, output, &format, matches, seed),
        Commands::Export {
            output,
            format,
            filter,
        } => commands::export::run(&Config::load()?, &filter, &output, &format).await,
        Commands::Fetch {
            filter,
            server,
            output,
            color,
        } => {
            let config = Config::load()?;
            let options = render_options(&config, color);
            commands::fetch::run(&config, &filter, server, output, options).await
        }
        Commands::Layout {
            filter,
            output,
            color,
        } => {
            let config = Config::load()?;
            let options = render_options(&config, color);
            commands::layout::run(&config, &filter, output, options).await
        }
        Commands::Inspect { path, json } => commands::inspect::run(&path, json).await,
    }
}
