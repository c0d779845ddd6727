pub mod links;
pub mod redirect;

use crate::error::RegistryError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            RegistryError::InvalidUrl(_) | RegistryError::InvalidShortcode(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            RegistryError::ShortcodeTaken(_) => (StatusCode::CONFLICT, self.to_string()),
            RegistryError::CorruptStore(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Link store is unreadable".to_owned(),
            ),
            RegistryError::GenerationExhausted(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not generate a free short code, please retry".to_owned(),
            ),
            RegistryError::Persistence(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save link".to_owned(),
            ),
        };

        if !self.is_client_error() {
            tracing::error!("Link registry error: {}", self);
        }
        (status, message).into_response()
    }
}
