use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mayfly::api;
use mayfly::config::Config;
use mayfly::storage::{self, ExpirySweeper};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mayfly=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    if config.lifecycle.allow_clock_override {
        warn!("⚠ Clock override is enabled - request timestamps can be set by clients. Use only for testing!");
    }
    if !config.lifecycle.strict_view_limit {
        info!("View limits are enforced with separate check and increment; concurrent reads may overshoot max_views");
    }

    // Initialize storage
    let storage = storage::connect(&config.storage).await?;
    info!("Storage initialized successfully");

    let sweeper = if config.storage.sweep_interval_secs > 0 {
        info!(
            "🧹 Expiry sweeper running every {}s",
            config.storage.sweep_interval_secs
        );
        Some(ExpirySweeper::spawn(
            Arc::clone(&storage),
            config.storage.sweep_interval_secs,
        ))
    } else {
        info!("Expiry sweeper disabled");
        None
    };

    let router = api::create_router(Arc::clone(&storage), &config);

    // Log frontend configuration
    if let Some(ref static_dir) = config.frontend.static_dir {
        info!("🎨 Serving frontend from directory: {}", static_dir);
    } else {
        info!("🎨 Serving embedded frontend");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Server listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down...");
    if let Some(sweeper) = sweeper {
        sweeper.shutdown().await;
    }
    storage.close().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
