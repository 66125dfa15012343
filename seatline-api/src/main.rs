use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use seatline_api::{app, metrics::Metrics, worker, AppState};
use seatline_core::{Clock, ShowRepository, SystemClock};
use seatline_reservation::{EngineConfig, ReservationEngine};
use seatline_store::app_config::{Config, StorageBackend};
use seatline_store::{DbClient, InMemoryShowRepository, PgShowRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seatline_api=debug,seatline_reservation=info,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Seatline API on port {}", config.server.port);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let (repo, db): (Arc<dyn ShowRepository>, Option<DbClient>) = match config.storage.backend {
        StorageBackend::Postgres => {
            let db = DbClient::new(&config.database)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            let repo: Arc<dyn ShowRepository> = Arc::new(PgShowRepository::new(db.pool.clone()));
            (repo, Some(db))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, shows are lost on restart");
            let repo: Arc<dyn ShowRepository> =
                Arc::new(InMemoryShowRepository::with_clock(clock.clone()));
            (repo, None)
        }
    };

    let engine = Arc::new(ReservationEngine::new(
        repo,
        clock,
        EngineConfig {
            default_hold_minutes: config.reservation.default_hold_minutes,
            max_conflict_retries: config.reservation.max_conflict_retries,
        },
    ));
    let metrics = Arc::new(Metrics::new().context("Failed to register metrics")?);

    let reaper = worker::start_expiry_reaper(
        engine.clone(),
        config.reaper.interval_seconds,
        metrics.clone(),
    );

    let app = app(AppState::new(engine, metrics));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    reaper.stop().await;
    if let Some(db) = db {
        db.close().await;
    }
    tracing::info!("Shutdown complete");
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
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

    tracing::info!("Shutdown signal received");
}
