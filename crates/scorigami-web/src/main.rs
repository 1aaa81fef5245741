//! Scorigami web server.

use anyhow::{Context, Result};
use clap::Parser;
use scorigami_runtime::encoder::EncoderConfig;
use scorigami_web::routes::create_router;
use scorigami_web::{AppState, ServerConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scorigami-web")]
#[command(about = "Scorigami graph server - streams score-sequence graphs as NDJSON")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// SQLite aggregate database
    #[arg(short, long)]
    db: Option<PathBuf>,

    /// JSON fixture written by `scorigami seed --format json`
    #[arg(long, conflicts_with = "db")]
    fixture: Option<PathBuf>,

    /// Nodes per stream frame
    #[arg(long, default_value = "5000")]
    node_batch: usize,

    /// Edges per stream frame
    #[arg(long, default_value = "2000")]
    edge_batch: usize,

    /// Pause between batch frames, in milliseconds
    #[arg(long, default_value = "10")]
    batch_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let addr = format!("{}:{}", cli.host, cli.port);

    let config = ServerConfig {
        encoder: EncoderConfig {
            node_batch: cli.node_batch.max(1),
            edge_batch: cli.edge_batch.max(1),
            batch_delay_ms: cli.batch_delay_ms,
        },
        ..Default::default()
    };
    let state = AppState::open(cli.db.as_deref(), cli.fixture.as_deref(), config)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, "scorigami-web listening");
    axum::serve(listener, app).await?;

    Ok(())
}
