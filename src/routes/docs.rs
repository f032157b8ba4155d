use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Swagger UI at `/docs`, backed by the document served at `/api-doc/openapi.json`.
pub fn router(state: SharedState) -> Router<SharedState> {
    let mut doc = ApiDoc::openapi();
    doc.info.title = "Hot Seat Back".into();
    doc.info.version = env!("CARGO_PKG_VERSION").into();

    let ui: Router<SharedState> = SwaggerUi::new("/docs")
        .url("/api-doc/openapi.json", doc)
        .into();
    ui.with_state(state)
}
