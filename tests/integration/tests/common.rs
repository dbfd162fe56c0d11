//! Common test utilities and fixtures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use fedauth_core::FederationConfig;
use fedauth_protocol::bindings::WsFedPostExtractor;
use fedauth_protocol::claims::claim_types::{EMAIL, NAME_IDENTIFIER};
use fedauth_protocol::endpoints::FederationState;
use fedauth_protocol::{
    ClaimSet, IdentityLinker, IssuerTrustRegistry, LinkError, LoginOrchestrator, LoginResult,
    RawToken, SignInRequest, TokenExtractor, TokenQuotas, TokenValidator, TrustedIssuerResolver,
    UserDescriptor, ValidationError, ValidationPolicy,
};
use fedauth_session::SessionCookieCodec;
use parking_lot::Mutex;
use tower::ServiceExt;

/// Thumbprint trusted by [`FederationConfig::for_testing`].
pub const TRUSTED_SIGNER: &str = "3F:2A:9C:71:0B";

/// WS-Federation extractor that counts invocations.
pub struct CountingExtractor {
    inner: WsFedPostExtractor,
    pub calls: AtomicUsize,
}

impl CountingExtractor {
    fn new(quotas: TokenQuotas) -> Self {
        Self {
            inner: WsFedPostExtractor::new(quotas),
            calls: AtomicUsize::new(0),
        }
    }
}

impl TokenExtractor for CountingExtractor {
    fn extract_signed_token(&self, body: &[u8]) -> LoginResult<SignInRequest> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.extract_signed_token(body)
    }
}

/// Validator that trusts the `signer` attribute of the token element and
/// returns a fixed claim set.
pub struct MockValidator {
    claims: ClaimSet,
    pub calls: AtomicUsize,
}

#[async_trait]
impl TokenValidator for MockValidator {
    async fn validate_token(
        &self,
        token: &RawToken,
        issuers: &dyn TrustedIssuerResolver,
        policy: &ValidationPolicy,
    ) -> Result<ClaimSet, ValidationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(policy.audience, "https://chat.example.com/");

        let fingerprint = token
            .xml()
            .split("signer=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .ok_or_else(|| ValidationError::InvalidSignature("no signer".into()))?;

        let issuer = issuers
            .resolve_issuer(fingerprint)
            .ok_or_else(|| ValidationError::UntrustedIssuer {
                fingerprint: fingerprint.to_string(),
            })?;

        Ok(self.claims.clone().with_issuer(issuer))
    }
}

/// Linker that records the users it sees and signs them in.
#[derive(Default)]
pub struct MockLinker {
    pub calls: AtomicUsize,
    pub users: Mutex<Vec<UserDescriptor>>,
    pub reject: Option<String>,
}

#[async_trait]
impl IdentityLinker for MockLinker {
    async fn link_identity(
        &self,
        ctx: &mut fedauth_protocol::SessionContext,
        user: &UserDescriptor,
    ) -> Result<(), LinkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.users.lock().push(user.clone());
        if let Some(reason) = &self.reject {
            return Err(LinkError::Rejected(reason.clone()));
        }
        ctx.sign_in(
            format!("local-{}", user.user_id),
            user.username.clone(),
            user.email.clone(),
        );
        Ok(())
    }
}

/// A router wired to counting mocks.
pub struct TestApp {
    pub router: Router,
    pub extractor: Arc<CountingExtractor>,
    pub validator: Arc<MockValidator>,
    pub linker: Arc<MockLinker>,
}

impl TestApp {
    /// Default claims: a name identifier and an email.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> TestAppBuilder {
        TestAppBuilder {
            config: FederationConfig::for_testing(),
            claims: ClaimSet::from_pairs([(NAME_IDENTIFIER, "u1"), (EMAIL, "u1@x.com")]),
            linker: MockLinker::default(),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("fedauth_protocol=debug,fedauth_session=debug")
            .with_test_writer()
            .try_init();

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub fn extractor_calls(&self) -> usize {
        self.extractor.calls.load(Ordering::SeqCst)
    }

    pub fn validator_calls(&self) -> usize {
        self.validator.calls.load(Ordering::SeqCst)
    }

    pub fn linker_calls(&self) -> usize {
        self.linker.calls.load(Ordering::SeqCst)
    }
}

pub struct TestAppBuilder {
    pub config: FederationConfig,
    pub claims: ClaimSet,
    pub linker: MockLinker,
}

impl TestAppBuilder {
    pub fn config(mut self, f: impl FnOnce(&mut FederationConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn claims(mut self, claims: ClaimSet) -> Self {
        self.claims = claims;
        self
    }

    pub fn reject_link(mut self, reason: &str) -> Self {
        self.linker.reject = Some(reason.to_string());
        self
    }

    pub fn build(self) -> TestApp {
        let config = self.config;
        let extractor = Arc::new(CountingExtractor::new(TokenQuotas::from(&config.quotas)));
        let validator = Arc::new(MockValidator {
            claims: self.claims,
            calls: AtomicUsize::new(0),
        });
        let linker = Arc::new(self.linker);

        let registry = Arc::new(
            IssuerTrustRegistry::from_config(&config.trusted_issuers).expect("trusted issuers"),
        );
        let cookies = Arc::new(SessionCookieCodec::from_config(&config).expect("cookie keys"));
        let orchestrator = Arc::new(
            LoginOrchestrator::new(
                &config,
                registry,
                Arc::clone(&validator) as Arc<dyn TokenValidator>,
                Arc::clone(&linker) as Arc<dyn IdentityLinker>,
            )
            .with_extractor(Arc::clone(&extractor) as Arc<dyn TokenExtractor>),
        );
        let state = FederationState::new(orchestrator, cookies)
            .with_trust_forwarded_proto(config.trust_forwarded_proto);

        TestApp {
            router: fedauth_server::create_router(state),
            extractor,
            validator,
            linker,
        }
    }
}

/// A `RequestSecurityTokenResponse` wrapping a token signed by `signer`.
pub fn token_response(signer: &str) -> String {
    format!(
        r#"<t:RequestSecurityTokenResponse xmlns:t="http://schemas.xmlsoap.org/ws/2005/02/trust"><t:RequestedSecurityToken><saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:1.0:assertion" signer="{signer}"><saml:Subject>opaque</saml:Subject></saml:Assertion></t:RequestedSecurityToken></t:RequestSecurityTokenResponse>"#
    )
}

/// A form-encoded sign-in body.
pub fn signin_form(wresult: &str, wctx: Option<&str>) -> String {
    let mut body = format!(
        "wa=wsignin1.0&wresult={}",
        urlencoding::encode(wresult)
    );
    if let Some(wctx) = wctx {
        body.push_str("&wctx=");
        body.push_str(&urlencoding::encode(wctx));
    }
    body
}

/// A sign-in POST over https.
pub fn secure_signin(path: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("https://chat.example.com{path}"))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .expect("valid request")
}

/// The `Cookie` header a browser would send back after `response`.
pub fn cookie_header_from(response: &Response<Body>) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|c| c.split(';').next())
        .filter(|pair| !pair.ends_with('='))
        .collect::<Vec<_>>()
        .join("; ")
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}
