//! Live Score Server
//!
//! Starts the simulated matches and serves them to WebSocket viewers until
//! Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use live_score::{
    VERSION,
    LiveScoreServer, ServerConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = ServerConfig::from_env().context("Invalid configuration")?;

    info!("Live Score Server v{}", VERSION);
    info!("Tick period: {:?}", config.tick_period);
    info!("Pairing: {}", config.pairing);

    let server = Arc::new(LiveScoreServer::new(config));
    info!("Master seed: {}", server.seed());

    for snapshot in server.scheduler().snapshots().await {
        info!("Court {}: {} vs {}", snapshot.id, snapshot.player_a, snapshot.player_b);
    }

    let signal_server = server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                signal_server.shutdown();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    server.run().await.context("Server failed")?;

    let scheduler = server.scheduler();
    info!(
        "Stopped after {} ticks with {} viewers connected",
        scheduler.tick_count(),
        scheduler.subscriber_count().await
    );

    Ok(())
}
