use crate::{models::LinkRecord, AppState};
use axum::{
    extract::{Form, State},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ── Request / response types ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateLinkForm {
    /// Missing is treated like empty so it is reported as an invalid URL.
    #[serde(default)]
    url: String,
    shortcode: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreatedLink {
    #[serde(flatten)]
    record: LinkRecord,
    short_url: String,
}

// ── Handlers ───────────────────────────────────────────────────────────────

/// GET /
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}

/// GET /links
/// Every link as a `{ "code": "url" }` object.
pub async fn list_links(State(state): State<Arc<AppState>>) -> Response {
    match state.registry.list_all().await {
        Ok(links) => Json(links.urls()).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /submit (HTML form)
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CreateLinkForm>,
) -> Response {
    create(&state, form).await
}

/// POST /links (JSON)
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    Json(form): Json<CreateLinkForm>,
) -> Response {
    create(&state, form).await
}

// ── Private helpers ────────────────────────────────────────────────────────

async fn create(state: &AppState, form: CreateLinkForm) -> Response {
    // HTML forms always send the field, so an empty one means "generate
    // one". Anything else, padding included, is validated as given.
    let requested = form.shortcode.as_deref().filter(|s| !s.is_empty());

    match state.registry.create(&form.url, requested).await {
        Ok(record) => {
            let short_url = format!("{}/{}", state.config.base_url, record.shortcode);
            Json(CreatedLink { record, short_url }).into_response()
        }
        Err(e) => e.into_response(),
    }
}
