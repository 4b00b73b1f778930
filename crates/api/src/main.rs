//! API server entry point.

use std::error::Error;
use std::sync::Arc;

use api::config::{Config, LogFormat};
use api::routes::orders::AppState;
use checkout::{CheckoutCoordinator, LogNotifier, NotificationDispatcher, RazorpayGateway};
use ledger::{CatalogStore, InMemoryStore, OrderLedger, PostgresStore};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

async fn serve<S>(
    config: Config,
    store: S,
    metrics_handle: PrometheusHandle,
) -> Result<(), Box<dyn Error>>
where
    S: CatalogStore + OrderLedger + 'static,
{
    if let Some(path) = &config.catalog_seed_file {
        api::seed::seed_catalog(&store, path).await?;
    }

    let gateway = RazorpayGateway::new(config.gateway.clone())?;
    let notifications = NotificationDispatcher::spawn(LogNotifier);
    let coordinator = CheckoutCoordinator::new(store, gateway, notifications);
    let app = api::create_app(Arc::new(AppState::new(coordinator)), metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, currency = %config.gateway.currency, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // 1. Load .env and configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    // 2. Initialize tracing
    init_tracing(&config);

    // 3. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 4. Pick the store and serve
    match config.database_url.clone() {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(&url)
                .await?;
            let store = PostgresStore::new(pool);
            store.run_migrations().await?;
            tracing::info!("connected to PostgreSQL and applied migrations");
            serve(config, store, metrics_handle).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, orders will be kept in memory only");
            serve(config, InMemoryStore::new(), metrics_handle).await
        }
    }
}
