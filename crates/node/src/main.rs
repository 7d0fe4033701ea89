//! cellstore-node: entry point for a tablet server.
//!
//! Loads config, opens the tablet engine (replaying the WAL), then serves
//! the Admin and Table gRPC services on the configured listen address.

use cellstore_store::{FsyncPolicy, TabletEngine};
use std::sync::Arc;
use tokio::sync::RwLock;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    cellstore_metrics::init_tracing();

    // Load config: first CLI arg is the YAML config path
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    let config = cellstore_config::load_server_config(std::path::Path::new(&config_path))
        .unwrap_or_else(|e| {
            tracing::warn!(
                "failed to load config from {}: {}, using defaults",
                config_path,
                e
            );
            cellstore_config::server_config_from_str("listen: \"127.0.0.1:7700\"\n")
                .expect("hardcoded default config must parse")
        });

    tracing::info!(
        "node {} listening on {}",
        config.node_name,
        config.listen
    );

    // Open the tablet engine
    let fsync = FsyncPolicy::from_str_config(&config.storage.fsync);
    let engine = TabletEngine::open(&config.storage.data_dir, fsync)?;
    let engine = Arc::new(RwLock::new(engine));

    // Build gRPC server
    let router = cellstore_net::build_server(engine.clone(), config.node_name.clone());

    // Spawn metrics HTTP server if configured
    if let Some(metrics_port) = config.metrics_port {
        let metrics_addr: std::net::SocketAddr = format!("0.0.0.0:{}", metrics_port).parse()?;
        tokio::spawn(async move {
            if let Err(e) = cellstore_metrics::serve_metrics(metrics_addr).await {
                tracing::warn!("metrics server failed: {}", e);
            }
        });
    }

    // Serve with graceful shutdown on Ctrl+C
    tracing::info!("serving gRPC on {}", config.listen);
    tokio::select! {
        result = router.serve(config.listen) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received Ctrl+C, shutting down");
        }
    }

    // Flush the WAL on the way out so batch mode loses nothing.
    engine.write().await.sync()?;

    Ok(())
}
