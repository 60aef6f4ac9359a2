use anyhow::{Context, Result};
use envconfig::Envconfig;
use tokio::signal;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use users_api::config::Config;
use users_api::server::serve;
use users_api::state::State;

async fn shutdown() {
    let mut term = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("failed to register SIGTERM handler");

    let mut interrupt = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .expect("failed to register SIGINT handler");

    tokio::select! {
        _ = term.recv() => {},
        _ = interrupt.recv() => {},
    };

    tracing::info!("Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> Result<()> {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(fmt_layer).init();

    let config = Config::init_from_env().context("Invalid configuration")?;
    let state = State::from_config(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.address)
        .await
        .with_context(|| format!("could not bind {}", config.address))?;
    serve(state, listener, shutdown()).await?;

    tracing::info!("Server stopped");
    Ok(())
}
