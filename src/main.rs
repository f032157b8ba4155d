//! Hot Seat backend entrypoint wiring REST, SSE and the session store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hot_seat_back::{
    config::AppConfig,
    dao::session_store::{InMemorySessionStore, SessionStore},
    questions::generator::QuestionGenerator,
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let generator = build_generator(&config)?;
    let app_state = AppState::with_generator(config, generator);

    install_session_store(&app_state).await?;
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick the session store from `SESSION_STORE` (`memory` or `couch`).
async fn install_session_store(state: &SharedState) -> anyhow::Result<()> {
    let backend = env::var("SESSION_STORE").unwrap_or_else(|_| "memory".into());
    match backend.as_str() {
        "memory" => {
            info!("using the in-memory session store; sessions are lost on restart");
            let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
            state.set_session_store(store).await;
            Ok(())
        }
        #[cfg(feature = "couch-store")]
        "couch" => {
            use hot_seat_back::{
                dao::{
                    session_store::couchdb::{CouchConfig, CouchSessionStore},
                    storage::StorageError,
                },
                services::storage_supervisor,
            };

            let couch_config = CouchConfig::from_env().context("reading CouchDB settings")?;
            tokio::spawn(storage_supervisor::run(state.clone(), move || {
                let couch_config = couch_config.clone();
                async move {
                    let store = CouchSessionStore::connect(couch_config)
                        .await
                        .map_err(StorageError::from)?;
                    Ok::<_, StorageError>(Arc::new(store) as Arc<dyn SessionStore>)
                }
            }));
            Ok(())
        }
        other => anyhow::bail!("unsupported SESSION_STORE `{other}`"),
    }
}

#[cfg(feature = "generator")]
fn build_generator(config: &AppConfig) -> anyhow::Result<Option<Arc<dyn QuestionGenerator>>> {
    use hot_seat_back::questions::generator::HttpQuestionGenerator;

    let Some(settings) = config.generator.as_ref() else {
        return Ok(None);
    };
    let generator = HttpQuestionGenerator::new(settings.url.clone(), settings.timeout)
        .context("building question generator client")?;
    info!(url = %settings.url, "question generator configured");
    Ok(Some(Arc::new(generator)))
}

#[cfg(not(feature = "generator"))]
fn build_generator(config: &AppConfig) -> anyhow::Result<Option<Arc<dyn QuestionGenerator>>> {
    if config.generator.is_some() {
        warn!("generator settings ignored; built without the `generator` feature");
    }
    Ok(None)
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

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "could not install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
