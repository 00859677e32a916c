use anyhow::{Context, Result};
use clap::Parser;
use convene_relay::{RelayConfig, RelayHub, router};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Signaling relay for convene rooms.
#[derive(Parser, Debug)]
#[command(name = "convene-relay", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// How long a dropped member keeps its seat before others see it leave.
    #[arg(long, default_value_t = 10_000)]
    presence_grace_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let hub = RelayHub::new(RelayConfig {
        presence_grace: Duration::from_millis(args.presence_grace_ms),
    });

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    info!("Relay listening on {}", args.bind);

    axum::serve(listener, router(hub))
        .await
        .context("Relay server stopped")?;
    Ok(())
}
