use axum::{Router, http::Uri};

use crate::{error::AppError, state::SharedState};

pub mod docs;
pub mod health;
pub mod sessions;
pub mod sse;

/// Compose the health, session and SSE routers with the documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sessions::router())
        .merge(sse::router())
        .fallback(unknown_route);

    api_router.merge(docs::router(state.clone())).with_state(state)
}

async fn unknown_route(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for `{}`", uri.path()))
}
