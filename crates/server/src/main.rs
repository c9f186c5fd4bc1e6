use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use packforge_core::{
    load_config, validate_config, ContentCache, Converter, DirectoryTransport, NoopContentCache,
    PrometheusMetrics, RunSupervisor, SqliteContentCache, StatusBoard, StickerConverter,
};
use packforge_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("PACKFORGE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Sources: {:?}", config.transport.source_root);
    info!("Outbox: {:?}", config.transport.outbox_dir);

    // Converter: missing tools only fail the items that need them
    let converter = StickerConverter::new(config.converter.clone());
    match converter.validate().await {
        Ok(()) => info!("Converter tools available"),
        Err(e) => warn!(error = %e, "Converter validation failed, conversions may fail"),
    }

    // Content cache
    let (cache, sqlite_cache): (Arc<dyn ContentCache>, Option<Arc<SqliteContentCache>>) =
        if config.cache.enabled {
            let db_path = config.cache.resolved_database_path();
            let sqlite = Arc::new(
                SqliteContentCache::new(&db_path, &config.cache.dir)
                    .with_context(|| format!("Failed to open content cache at {:?}", db_path))?,
            );
            info!("Content cache initialized at {:?}", config.cache.dir);
            (sqlite.clone() as Arc<dyn ContentCache>, Some(sqlite))
        } else {
            info!("Content cache disabled");
            (Arc::new(NoopContentCache), None)
        };

    let run_config = config.run.clone().with_cache_writes(config.cache.enabled);
    let supervisor = Arc::new(RunSupervisor::new(
        run_config,
        Arc::new(converter),
        cache,
        Arc::new(PrometheusMetrics),
    ));

    let transport = DirectoryTransport::new(config.transport.clone(), StatusBoard::new());

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        supervisor,
        transport,
        sqlite_cache,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
