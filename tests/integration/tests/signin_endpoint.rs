//! Sign-in endpoint tests.
//!
//! Each test posts a WS-Federation form through the full router and checks
//! the response a browser would see, together with which collaborators the
//! request reached.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use fedauth_protocol::claims::claim_types::{EMAIL, GIVEN_NAME, NAME, SURNAME};
use fedauth_protocol::{ClaimSet, UserDescriptor};

use crate::common::{
    body_string, secure_signin, signin_form, token_response, TestApp, TRUSTED_SIGNER,
};

fn location(response: &axum::http::Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn set_cookies(response: &axum::http::Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

mod transport {
    use super::*;

    #[tokio::test]
    async fn plain_http_is_refused_before_the_token_is_touched() {
        let app = TestApp::new();
        let request = Request::builder()
            .method("POST")
            .uri("/signin")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(signin_form(&token_response(TRUSTED_SIGNER), None)))
            .unwrap();

        let response = app.send(request).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(set_cookies(&response).is_empty());
        assert_eq!(app.extractor_calls(), 0);
        assert_eq!(app.validator_calls(), 0);
        assert_eq!(app.linker_calls(), 0);
        assert!(body_string(response).await.contains("insecure_transport"));
    }

    #[tokio::test]
    async fn forwarded_proto_counts_only_when_trusted() {
        let body = signin_form(&token_response(TRUSTED_SIGNER), None);
        let request = || {
            Request::builder()
                .method("POST")
                .uri("/signin")
                .header("x-forwarded-proto", "https")
                .body(Body::from(body.clone()))
                .unwrap()
        };

        let untrusting = TestApp::builder()
            .config(|c| c.trust_forwarded_proto = false)
            .build();
        let response = untrusting.send(request()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let trusting = TestApp::builder()
            .config(|c| c.trust_forwarded_proto = true)
            .build();
        let response = trusting.send(request()).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(trusting.extractor_calls(), 1);
    }

    #[tokio::test]
    async fn insecure_transport_allowed_when_not_required() {
        let app = TestApp::builder()
            .config(|c| {
                c.require_secure_transport = false;
                c.trust_forwarded_proto = false;
            })
            .build();
        let request = Request::builder()
            .method("POST")
            .uri("/signin")
            .body(Body::from(signin_form(&token_response(TRUSTED_SIGNER), None)))
            .unwrap();

        let response = app.send(request).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        // Cookies issued over plain http must not be marked Secure.
        assert!(set_cookies(&response).iter().all(|c| !c.contains("Secure")));
    }
}

mod success {
    use super::*;

    #[tokio::test]
    async fn issues_session_and_redirects_to_app_root() {
        let app = TestApp::new();

        let response = app
            .send(secure_signin("/signin", signin_form(&token_response(TRUSTED_SIGNER), None)))
            .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/");
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );

        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].starts_with("FedAuth="));
        assert!(cookies[0].contains("HttpOnly"));
        assert!(cookies[0].contains("Secure"));
    }

    #[tokio::test]
    async fn linker_sees_the_extracted_user() {
        let app = TestApp::new();

        app.send(secure_signin("/signin", signin_form(&token_response(TRUSTED_SIGNER), None)))
            .await;

        assert_eq!(
            app.linker.users.lock().as_slice(),
            [UserDescriptor {
                user_id: "u1".into(),
                username: "u1@x.com".into(),
                email: Some("u1@x.com".into()),
            }]
        );
    }

    #[tokio::test]
    async fn name_claim_wins_over_email_for_username() {
        let app = TestApp::builder()
            .claims(ClaimSet::from_pairs([
                (NAME, "alice"),
                (GIVEN_NAME, "Alice"),
                (SURNAME, "Liddell"),
                (EMAIL, "alice@example.com"),
            ]))
            .build();

        let response = app
            .send(secure_signin("/signin", signin_form(&token_response(TRUSTED_SIGNER), None)))
            .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        let users = app.linker.users.lock();
        assert_eq!(users[0].user_id, "alice");
        assert_eq!(users[0].username, "alice");
    }

    #[tokio::test]
    async fn fingerprint_match_ignores_case() {
        let app = TestApp::new();
        let response = app
            .send(secure_signin(
                "/signin",
                signin_form(&token_response(&TRUSTED_SIGNER.to_lowercase()), None),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::FOUND);
    }

    #[tokio::test]
    async fn surplus_chunks_from_a_previous_session_are_expired() {
        let app = TestApp::new();
        let mut request =
            secure_signin("/signin", signin_form(&token_response(TRUSTED_SIGNER), None));
        request.headers_mut().insert(
            header::COOKIE,
            "FedAuth=old0; FedAuth1=old1; FedAuth2=old2".parse().unwrap(),
        );

        let response = app.send(request).await;

        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 3);
        assert!(cookies[1].starts_with("FedAuth1=;"));
        assert!(cookies[2].starts_with("FedAuth2=;"));
        assert!(cookies[1..].iter().all(|c| c.contains("Max-Age=0")));
    }
}

mod redirects {
    use super::*;

    #[tokio::test]
    async fn relative_context_is_appended_to_app_root() {
        let app = TestApp::new();
        let response = app
            .send(secure_signin(
                "/signin",
                signin_form(&token_response(TRUSTED_SIGNER), Some("#/rooms/42")),
            ))
            .await;
        assert_eq!(location(&response), "/#/rooms/42");
    }

    #[tokio::test]
    async fn absolute_context_falls_back_to_app_root() {
        for hint in [
            "https://evil.example/",
            "//evil.example/",
            "javascript:alert(1)",
            "/\\evil.example",
        ] {
            let app = TestApp::new();
            let response = app
                .send(secure_signin(
                    "/signin",
                    signin_form(&token_response(TRUSTED_SIGNER), Some(hint)),
                ))
                .await;
            assert_eq!(response.status(), StatusCode::FOUND, "hint {hint}");
            assert_eq!(location(&response), "/", "hint {hint}");
        }
    }

    #[tokio::test]
    async fn endpoints_live_under_a_configured_app_root() {
        let app = TestApp::builder()
            .config(|c| c.app_root = "/chat".to_string())
            .build();

        let response = app
            .send(secure_signin(
                "/chat/signin",
                signin_form(&token_response(TRUSTED_SIGNER), Some("lobby")),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/chat/lobby");
        assert!(set_cookies(&response)[0].contains("; Path=/chat/;"));

        let response = app
            .send(secure_signin("/signin", signin_form(&token_response(TRUSTED_SIGNER), None)))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn missing_wresult_is_a_bad_request() {
        let app = TestApp::new();
        let response = app
            .send(secure_signin("/signin", "wa=wsignin1.0&wctx=x".to_string()))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(app.validator_calls(), 0);
        assert!(body_string(response).await.contains("malformed_request"));
    }

    #[tokio::test]
    async fn unexpected_action_is_a_bad_request() {
        let app = TestApp::new();
        let body = signin_form(&token_response(TRUSTED_SIGNER), None)
            .replace("wsignin1.0", "wsignout1.0");
        let response = app.send(secure_signin("/signin", body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn untrusted_signer_is_unauthorized() {
        let app = TestApp::new();
        let response = app
            .send(secure_signin("/signin", signin_form(&token_response("AA:BB:CC"), None)))
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(set_cookies(&response).is_empty());
        assert_eq!(app.validator_calls(), 1);
        assert_eq!(app.linker_calls(), 0);
        assert!(body_string(response).await.contains("untrusted_issuer"));
    }

    #[tokio::test]
    async fn missing_user_id_lists_claim_types_but_not_values() {
        let app = TestApp::builder()
            .claims(ClaimSet::from_pairs([(SURNAME, "Secretvalue")]))
            .build();

        let response = app
            .send(secure_signin("/signin", signin_form(&token_response(TRUSTED_SIGNER), None)))
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(app.linker_calls(), 0);
        let body = body_string(response).await;
        assert!(body.contains("missing_user_id"));
        assert!(body.contains(SURNAME));
        assert!(!body.contains("Secretvalue"));
    }

    #[tokio::test]
    async fn rejected_link_is_forbidden_with_reason() {
        let app = TestApp::builder()
            .reject_link("account disabled")
            .build();

        let response = app
            .send(secure_signin("/signin", signin_form(&token_response(TRUSTED_SIGNER), None)))
            .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(app.linker_calls(), 1);
        assert!(set_cookies(&response).is_empty());
        let body = body_string(response).await;
        assert!(body.contains("account disabled"));
        assert!(body.contains("link_failed"));
    }

    #[tokio::test]
    async fn oversized_token_is_rejected() {
        let app = TestApp::builder()
            .config(|c| c.quotas.max_token_bytes = 64)
            .build();

        let response = app
            .send(secure_signin("/signin", signin_form(&token_response(TRUSTED_SIGNER), None)))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(app.validator_calls(), 0);
    }
}
