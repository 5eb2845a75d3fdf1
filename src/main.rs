//! Foosball Back binary entrypoint wiring the WebSocket hub, health routes and storage.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foosball_back::{
    config::AppConfig,
    dao::match_store::{MatchStore, MemoryMatchStore},
    routes,
    services::{hub, storage_supervisor},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let store = build_store(&config).await?;

    let (app_state, receivers) = AppState::new(config, store);
    let _hub = hub::spawn(&app_state, receivers);
    tokio::spawn(storage_supervisor::run(app_state.clone()));

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

/// Pick the store backend from `STORE_BACKEND` (`mongo` or `memory`).
async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn MatchStore>> {
    let backend = env::var("STORE_BACKEND").unwrap_or_else(|_| default_backend().into());

    match backend.as_str() {
        "memory" => {
            let store = MemoryMatchStore::new();
            for player in config.seed_players() {
                store.insert_player(&player.sub, &player.picture);
            }
            info!(players = config.seed_players().len(), "using in-memory store");
            Ok(Arc::new(store))
        }
        #[cfg(feature = "mongo-store")]
        "mongo" => {
            use foosball_back::dao::match_store::mongodb::{MongoConfig, MongoMatchStore};

            let mongo = MongoConfig::from_env().await.context("parsing MONGO_URI")?;
            let store = MongoMatchStore::connect(mongo)
                .await
                .context("connecting to MongoDB")?;
            info!("connected to MongoDB");
            Ok(Arc::new(store))
        }
        other => anyhow::bail!("unsupported STORE_BACKEND `{other}`"),
    }
}

fn default_backend() -> &'static str {
    if cfg!(feature = "mongo-store") {
        "mongo"
    } else {
        "memory"
    }
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
