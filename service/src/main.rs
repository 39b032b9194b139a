#![deny(
    clippy::expect_used,
    clippy::panic,
    clippy::print_stdout,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used
)]

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use makenoise_api::{
    aggregation::AggregationState,
    config::Config,
    http::build_app,
    sources::{HttpTransport, SourceTransport},
};
use tracing_subscriber::EnvFilter;

/// Lawmaker contact aggregation service.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// YAML configuration file (environment variables with MN_ prefix still win)
    #[arg(long, default_value = "config.yaml")]
    config: String,

    /// Fetch every source once, print the snapshots as JSON, and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    // Load and validate configuration first (fail-fast)
    let config = Config::load_from(&args.config).map_err(|e| anyhow::anyhow!("{e}"))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "makenoise-api starting up"
    );

    let transport: Arc<dyn SourceTransport> = Arc::new(HttpTransport::new(
        Duration::from_secs(config.http.timeout_secs),
        &config.http.user_agent,
    )?);
    let descriptors = config.descriptors().map_err(|e| anyhow::anyhow!("{e}"))?;
    let state = AggregationState::new(descriptors, &config.credentials, transport)?;

    for source in state.sources() {
        if !config.credentials.contains_key(source) {
            tracing::info!(source, "no credential configured");
        }
    }

    let started = state.trigger_all();
    tracing::info!(sources = started.len(), "initial fetch attempts started");

    if args.once {
        return print_settled(&state).await;
    }

    let app = build_app(state, &config.cors);

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    tracing::info!("Starting server at http://{}/lawmakers", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn print_settled(state: &AggregationState) -> Result<(), anyhow::Error> {
    let mut settled = BTreeMap::new();
    for source in state.sources() {
        settled.insert(source.to_string(), state.settled(source).await?);
    }

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &settled)?;
    writeln!(stdout)?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
