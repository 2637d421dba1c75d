//! PetPal: dual-source pet care assistant
//!
//! This is the main entry point for the application.

use anyhow::Result;
use petpal::{
    config::Settings,
    web::{create_router, AppState},
};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration before logging so `general.debug` picks the level
    let (settings, source) = load_settings()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_level())),
        )
        .with_target(false)
        .init();

    info!("Starting PetPal v{}", petpal::VERSION);
    match &source {
        Some(path) => info!("Loaded settings from: {}", path.display()),
        None => info!("No settings file found, using defaults"),
    }

    settings.validate()?;
    info!("Loaded configuration for instance: {}", settings.general.instance_name);
    info!(
        primary = %settings.outgoing.primary_url,
        secondary = %settings.outgoing.secondary_url,
        timeout = settings.effective_timeout(),
        "Proxy endpoints configured"
    );

    // Create application state
    let state = AppState::new(settings.clone())?;
    let shutdown = state.shutdown.clone();
    info!("Application state initialized");

    // Create router
    let app = create_router(state);

    // Bind address
    let addr = SocketAddr::new(settings.server.bind_address.parse()?, settings.server.port);

    info!("Starting server on http://{}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM, then cancel in-flight orchestrations
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
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

    info!("Shutting down");
    shutdown.cancel();
}

/// Load settings from file or use defaults. Also returns the file used.
fn load_settings() -> Result<(Settings, Option<PathBuf>)> {
    // Check environment variable first
    if let Ok(path) = std::env::var("PETPAL_SETTINGS_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            let mut settings = Settings::from_file(&path)?;
            settings.merge_env();
            return Ok((settings, Some(path)));
        }
    }

    let mut paths = vec![
        PathBuf::from("settings.yml"),
        PathBuf::from("config/settings.yml"),
        PathBuf::from("/etc/petpal/settings.yml"),
    ];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("petpal/settings.yml"));
    }

    for path in paths {
        if path.exists() {
            let mut settings = Settings::from_file(&path)?;
            settings.merge_env();
            return Ok((settings, Some(path)));
        }
    }

    // Use defaults
    let mut settings = Settings::default();
    settings.merge_env();
    Ok((settings, None))
}
