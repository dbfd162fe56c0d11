//! Sign-in router configuration.

use axum::routing::{get, post};
use axum::Router;

use super::session::current_session;
use super::signin::signin_post;
use super::state::FederationState;

/// Creates the sign-in router, mounted under the application root.
///
/// | Method | Path                  | Handler           |
/// |--------|-----------------------|-------------------|
/// | POST   | `{app_root}signin`    | `signin_post`     |
/// | GET    | `{app_root}session`   | `current_session` |
pub fn federation_router(app_root: &str) -> Router<FederationState> {
    let routes = Router::new()
        .route("/signin", post(signin_post))
        .route("/session", get(current_session));

    let root = app_root.trim_matches('/');
    if root.is_empty() {
        routes
    } else {
        Router::new().nest(&format!("/{root}"), routes)
    }
}
