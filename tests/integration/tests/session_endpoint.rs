//! Session endpoint tests.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::Value;

use crate::common::{
    body_string, cookie_header_from, secure_signin, signin_form, token_response, TestApp,
    TRUSTED_SIGNER,
};

fn session_request(cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/session");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn cookie_from_signin_resolves_to_the_ticket() {
    let app = TestApp::new();
    let signin = app
        .send(secure_signin("/signin", signin_form(&token_response(TRUSTED_SIGNER), None)))
        .await;
    let cookie = cookie_header_from(&signin);

    let response = app.send(session_request(Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let ticket: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(ticket["user_id"], "local-u1");
    assert_eq!(ticket["username"], "u1@x.com");
    assert_eq!(ticket["email"], "u1@x.com");
    assert_eq!(ticket["issuer"], "CN=Test STS");
}

#[tokio::test]
async fn chunked_cookie_is_reassembled() {
    let app = TestApp::builder()
        .config(|c| c.cookie.chunk_size = 40)
        .build();
    let signin = app
        .send(secure_signin("/signin", signin_form(&token_response(TRUSTED_SIGNER), None)))
        .await;
    assert!(signin.headers().get_all(header::SET_COOKIE).iter().count() > 1);

    let response = app
        .send(session_request(Some(&cookie_header_from(&signin))))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn no_cookie_is_unauthorized() {
    let app = TestApp::new();
    let response = app.send(session_request(None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"], "no_session");
}

#[tokio::test]
async fn tampered_cookie_is_unauthorized() {
    let app = TestApp::new();
    let signin = app
        .send(secure_signin("/signin", signin_form(&token_response(TRUSTED_SIGNER), None)))
        .await;
    let cookie = cookie_header_from(&signin);

    // Flip one base64url character in the middle of the value.
    let mut bytes = cookie.into_bytes();
    let i = bytes.len() / 2;
    bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(bytes).unwrap();

    let response = app.send(session_request(Some(&tampered))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cookie_from_another_deployment_is_unauthorized() {
    let signed_elsewhere = TestApp::builder()
        .config(|c| c.cookie.keys[0].epoch = 9)
        .build();
    let signin = signed_elsewhere
        .send(secure_signin("/signin", signin_form(&token_response(TRUSTED_SIGNER), None)))
        .await;

    let app = TestApp::new();
    let response = app
        .send(session_request(Some(&cookie_header_from(&signin))))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
