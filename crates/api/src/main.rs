//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use api::seed::Seed;
use api::{AppState, OrderBackend};
use domain::{BroadcastNotifier, InMemoryCatalog, OrderLifecycle};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use store::{InMemoryStore, PostgresStore};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const NOTIFICATION_BUFFER: usize = 1024;

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
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Logs every notification; stands in for the delivery transport.
fn spawn_notification_logger(notifier: &BroadcastNotifier) -> tokio::task::JoinHandle<()> {
    let mut receiver = notifier.subscribe();

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(notification) => tracing::info!(
                    kind = %notification.kind,
                    order_id = %notification.order_id,
                    order_number = %notification.order_number,
                    message = %notification.message,
                    "notification"
                ),
                Err(RecvError::Lagged(missed)) => {
                    metrics::counter!("notifications_dropped_total", "kind" => "lagged")
                        .increment(missed);
                    tracing::warn!(missed, "notification consumer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn serve<S: OrderBackend>(store: S, config: Config, metrics_handle: PrometheusHandle) {
    // 1. Catalog and stock
    let catalog = InMemoryCatalog::new();
    match &config.catalog_path {
        Some(path) => Seed::load(path)
            .await
            .expect("failed to read catalog seed")
            .apply(&catalog, &store)
            .await
            .expect("failed to seed catalog"),
        None => tracing::warn!("CATALOG_PATH not set, starting with an empty catalog"),
    }

    // 2. Notifications
    let notifier = BroadcastNotifier::new(NOTIFICATION_BUFFER);
    let notification_logger = spawn_notification_logger(&notifier);

    // 3. Lifecycle engine and sweeper
    let lifecycle = Arc::new(OrderLifecycle::with_config(
        store,
        Arc::new(catalog),
        Arc::new(notifier),
        config.lifecycle_config(),
    ));
    let state = Arc::new(AppState::new(lifecycle, config.sweeper_config()));
    let sweeper = state.sweeper.clone().spawn();

    // 4. Serve
    let app = api::create_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // 5. Drain background work
    if let Err(e) = sweeper.shutdown().await {
        tracing::error!(error = %e, "sweeper did not stop cleanly");
    }
    notification_logger.abort();

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the store
    match config.database_url.clone() {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(&url)
                .await
                .expect("failed to connect to PostgreSQL");
            let store = PostgresStore::new(pool);
            store.run_migrations().await.expect("migrations failed");
            tracing::info!("using PostgreSQL store");
            serve(store, config, metrics_handle).await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory store");
            serve(InMemoryStore::new(), config, metrics_handle).await;
        }
    }
}
