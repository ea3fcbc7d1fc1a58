mod config;

use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use cramr_api::auth::{AppState, AppStateInner};
use cramr_core::{Backend, EnrollmentController, Reachability, SqliteBackend};
use cramr_push::PushHub;

use crate::config::{Config, read_course_titles};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cramr=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Arc::new(cramr_db::Database::open(&config.db_path)?);
    let backend: Arc<dyn Backend> = Arc::new(SqliteBackend::new(db));
    let reachability = Reachability::new();

    if let Some(path) = &config.courses_file {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading course list {}", path.display()))?;
        let titles = read_course_titles(&contents);
        if titles.is_empty() {
            warn!("Course list {} is empty", path.display());
        }
        EnrollmentController::new(backend.clone(), reachability.clone())
            .import_courses(titles)
            .await?;
    }

    // Shared state
    let state: AppState = Arc::new(AppStateInner::new(
        backend,
        PushHub::new(),
        reachability,
        config.jwt_secret.clone(),
    ));

    let app = cramr_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Cramr server listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Cramr server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
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
    info!("Shutdown signal received");
}
