//! Contest live backend entrypoint wiring REST, WebSocket and storage layers.

use std::{env, net::SocketAddr};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use contest_live_back::{
    config::AppConfig,
    routes,
    services::broadcast,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(config);

    spawn_storage(app_state.clone());
    tokio::spawn(broadcast::run_heartbeat(app_state.clone()));

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Connect the MongoDB backend under the storage supervisor, which keeps
/// retrying and toggles degraded mode when connectivity changes.
#[cfg(feature = "mongo-store")]
fn spawn_storage(state: SharedState) {
    use std::sync::Arc;

    use contest_live_back::{
        dao::{
            contest_store::ContestStore,
            mongodb::{MongoConfig, MongoContestStore, MongoDaoError},
            storage::StorageError,
        },
        services::storage_supervisor,
    };

    let connect = move || async move {
        // Environment wins; a local instance is the development fallback.
        let config = match MongoConfig::from_env().await {
            Ok(config) => config,
            Err(MongoDaoError::MissingEnvVar { .. }) => {
                MongoConfig::from_uri("mongodb://localhost:27017", None)
                    .await
                    .map_err(StorageError::from)?
            }
            Err(err) => return Err(StorageError::from(err)),
        };
        let store = MongoContestStore::connect(config)
            .await
            .map_err(StorageError::from)?;
        Ok(Arc::new(store) as Arc<dyn ContestStore>)
    };

    tokio::spawn(storage_supervisor::run(state, connect));
}

/// Without a database backend, install the volatile in-memory store.
#[cfg(not(feature = "mongo-store"))]
fn spawn_storage(state: SharedState) {
    use std::sync::Arc;

    use contest_live_back::dao::memory::MemoryStore;

    tokio::spawn(async move {
        state.install_store(Arc::new(MemoryStore::new())).await;
        tracing::warn!("running with volatile in-memory storage");
    });
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
