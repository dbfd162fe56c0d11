//! Session endpoint.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::state::FederationState;

/// GET handler returning the current session ticket, or `401` when the
/// request carries no valid session.
pub async fn current_session(
    State(state): State<FederationState>,
    headers: HeaderMap,
) -> Response {
    match state.cookies.read(cookie_headers(&headers)) {
        Some(ticket) => Json(ticket).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "no_session" })),
        )
            .into_response(),
    }
}

/// The values of every `Cookie` header.
pub fn cookie_headers(headers: &HeaderMap) -> impl Iterator<Item = &str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
}
