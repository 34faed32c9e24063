use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coverscan::api::{create_router, AppState};
use coverscan::config::Config;
use coverscan::db::{Database, DatabaseBackend, LibSqlBackend};
use coverscan::recognition::ProviderRegistry;
use coverscan::storage::UploadStore;

#[derive(Parser)]
#[command(name = "coverscan")]
#[command(about = "Self-hostable book cover recognition service")]
struct Args {
    /// Override COVERSCAN_HOST
    #[arg(long)]
    host: Option<String>,

    /// Override COVERSCAN_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "coverscan=info,tower_http=debug".into());
    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    if config.server.api_keys.is_empty() {
        tracing::warn!("COVERSCAN_API_KEYS is not set, the API is open to anyone who can reach it");
    }

    tracing::info!("Initializing database...");
    let raw_db = Database::new(&config.database).await?;
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));

    tracing::info!("Initializing recognition providers...");
    let registry = ProviderRegistry::from_config(&config.recognition);
    for (id, reason) in registry.unavailable() {
        tracing::warn!(
            provider = id,
            "Provider unavailable, requests will return degraded results: {}",
            reason
        );
    }

    let uploads = UploadStore::new(&config.uploads);
    uploads.ensure_dir().await?;
    tracing::info!("Storing uploads in {}", uploads.root().display());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, db, registry);
    let app = create_router(state);

    tracing::info!("Coverscan starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  API docs:     http://{}/api/v1/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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

    tracing::info!("Shutdown signal received, draining connections...");
}
