// lebrq-offline - Offline request router for the LebrQ client shell
// Author: kelexine (https://github.com/kelexine)

use anyhow::Result;
use clap::Parser;
use lebrq_offline::cli::Args;
use lebrq_offline::config::AppConfig;
use lebrq_offline::fetch::UpstreamClient;
use lebrq_offline::server::create_router;
use lebrq_offline::utils::logging;
use lebrq_offline::{app, store};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply_args(&args);
    config.validate()?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting lebrq-offline v{}", env!("CARGO_PKG_VERSION"));

    // Phase 3: Cache store and upstream client
    let store = store::from_config(&config.cache);
    info!(
        "Using {:?} cache store, epoch {}, upstream {}",
        config.cache.backend, config.cache.epoch, config.upstream.origin
    );
    let fetcher = Arc::new(UpstreamClient::new(&config.upstream)?);

    // Phase 4: Install and activate the current epoch
    let router = app::build(&config, store, fetcher)?;
    app::start(&router).await?;

    // Phase 5: Build and start HTTP server
    let http = create_router(config.clone(), router)?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Phase 6: Run server with graceful shutdown
    axum::serve(listener, http)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
