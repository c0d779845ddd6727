use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// GET /:code
///
/// Answers with a 302 to the stored URL, or 404 when the code is unknown.
/// `axum::response::Redirect` only offers 303/307/308, so the response is
/// built by hand.
pub async fn redirect(State(state): State<Arc<AppState>>, Path(code): Path<String>) -> Response {
    match state.registry.resolve(&code).await {
        Ok(Some(url)) => (StatusCode::FOUND, [(header::LOCATION, url)]).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Shortlink not found").into_response(),
        Err(e) => e.into_response(),
    }
}
