//! Sign-in endpoint.
//!
//! Receives the identity provider's form post, runs the sign-in flow and
//! redirects the browser with the session cookies set.

use std::net::SocketAddr;

use axum::body::{self, Bytes};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};

use crate::error::LoginError;
use crate::login::SessionContext;

use super::session::cookie_headers;
use super::state::FederationState;

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// POST handler for the sign-in endpoint.
pub async fn signin_post(State(state): State<FederationState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let secure = is_secure_request(&parts.uri, &parts.headers, state.trust_forwarded_proto);
    let client_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let user_agent = parts
        .headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut ctx = SessionContext::new(secure)
        .with_client_addr(client_addr)
        .with_user_agent(user_agent)
        .with_session_lifetime(state.cookies.lifetime());

    // An insecure request is rejected before its body is even buffered.
    let body = if state.orchestrator.requires_secure_transport() && !secure {
        Bytes::new()
    } else {
        match body::to_bytes(body, state.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(_) => {
                return error_response(&LoginError::MalformedRequest(
                    "request body is too large".to_string(),
                ));
            }
        }
    };

    let outcome = match state.orchestrator.sign_in(&mut ctx, &body).await {
        Ok(outcome) => outcome,
        Err(failure) => return error_response(&failure.error),
    };

    let set_cookies = match ctx.take_issued_session() {
        Some(ticket) => {
            let previous = state.cookies.chunk_count(cookie_headers(&parts.headers));
            match state.cookies.write(&ticket, previous) {
                Ok(cookies) => cookies,
                Err(e) => {
                    let err = LoginError::from(e);
                    tracing::error!(error = %err, "Failed to write session cookie");
                    return error_response(&err);
                }
            }
        }
        None => Vec::new(),
    };

    redirect_response(&outcome.location, &set_cookies)
}

/// Whether the request arrived over TLS, directly or, when trusted, as
/// reported by a fronting proxy.
#[must_use]
pub fn is_secure_request(uri: &Uri, headers: &HeaderMap, trust_forwarded_proto: bool) -> bool {
    if uri.scheme_str() == Some("https") {
        return true;
    }
    trust_forwarded_proto
        && headers
            .get(X_FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}

fn redirect_response(location: &str, set_cookies: &[String]) -> Response {
    let Ok(location) = HeaderValue::from_str(location) else {
        return error_response(&LoginError::MalformedRequest(
            "invalid redirect destination".to_string(),
        ));
    };

    let mut response = StatusCode::FOUND.into_response();
    let headers = response.headers_mut();
    headers.insert(header::LOCATION, location);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    for cookie in set_cookies {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            headers.append(header::SET_COOKIE, value);
        }
    }
    response
}

fn error_response(err: &LoginError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Sign-in Error</title></head>
<body>
<h1>Sign-in Error</h1>
<p>{}</p>
<p><code>{}</code></p>
</body>
</html>"#,
        html_escape(&err.public_message()),
        err.code()
    );
    let mut response = (status, Html(html)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
