//! The sign-in flow.
//!
//! ```text
//! Received -> TransportExtracted -> SignatureValidated -> ClaimsExtracted -> Linked -> Redirected
//! ```
//!
//! Every step can reject the request; the first failure ends it and no
//! partial identity is ever linked. When a secure channel is required an
//! insecure request is rejected before the body is looked at.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use fedauth_core::FederationConfig;
use fedauth_session::SessionTicket;

use crate::bindings::WsFedPostExtractor;
use crate::claims::{extract_user, UserDescriptor};
use crate::error::{LinkError, LoginError};
use crate::token::{TokenExtractor, TokenValidator, ValidationPolicy};
use crate::trust::IssuerTrustRegistry;

/// How far a sign-in got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    /// The request arrived.
    Received,
    /// The signed token was located in the request.
    TransportExtracted,
    /// The token was verified and its claims parsed.
    SignatureValidated,
    /// A user identity was derived from the claims.
    ClaimsExtracted,
    /// The identity was bound to a local account.
    Linked,
    /// The browser was sent on.
    Redirected,
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::TransportExtracted => "transport_extracted",
            Self::SignatureValidated => "signature_validated",
            Self::ClaimsExtracted => "claims_extracted",
            Self::Linked => "linked",
            Self::Redirected => "redirected",
        };
        f.write_str(name)
    }
}

/// A rejected sign-in.
#[derive(Debug)]
pub struct LoginFailure {
    /// The last state reached before the failure.
    pub state: LoginState,
    /// Why the request was rejected.
    pub error: LoginError,
}

impl fmt::Display for LoginFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sign-in rejected after {}: {}", self.state, self.error)
    }
}

impl std::error::Error for LoginFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// A completed sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    /// Where to redirect the browser.
    pub location: String,
}

/// Request metadata and session issuance handed to the identity linker.
#[derive(Debug, Clone)]
pub struct SessionContext {
    client_addr: Option<SocketAddr>,
    user_agent: Option<String>,
    secure: bool,
    issuer: Option<String>,
    session_lifetime: Duration,
    issued: Option<SessionTicket>,
}

impl SessionContext {
    /// Creates a context for a request that did or did not arrive over a
    /// secure channel.
    #[must_use]
    pub fn new(secure: bool) -> Self {
        Self {
            client_addr: None,
            user_agent: None,
            secure,
            issuer: None,
            session_lifetime: Duration::hours(10),
            issued: None,
        }
    }

    /// Records the client address.
    #[must_use]
    pub fn with_client_addr(mut self, addr: Option<SocketAddr>) -> Self {
        self.client_addr = addr;
        self
    }

    /// Records the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Sets the lifetime of sessions issued through [`Self::sign_in`].
    #[must_use]
    pub fn with_session_lifetime(mut self, lifetime: Duration) -> Self {
        self.session_lifetime = lifetime;
        self
    }

    /// Client address, if known.
    #[must_use]
    pub const fn client_addr(&self) -> Option<SocketAddr> {
        self.client_addr
    }

    /// User agent, if sent.
    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Whether the request arrived over a secure channel.
    #[must_use]
    pub const fn is_secure(&self) -> bool {
        self.secure
    }

    /// The trusted issuer that vouched for the user, once validated.
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    /// Issues a session. A later call replaces an earlier one.
    pub fn issue_session(&mut self, ticket: SessionTicket) {
        self.issued = Some(ticket);
    }

    /// Issues a session for a local account, stamped with the issuer and
    /// the configured lifetime.
    pub fn sign_in(
        &mut self,
        user_id: impl Into<String>,
        username: impl Into<String>,
        email: Option<String>,
    ) {
        let mut ticket = SessionTicket::new(user_id, username, email, self.session_lifetime);
        ticket.issuer = self.issuer.clone();
        self.issue_session(ticket);
    }

    /// The session issued by the linker, if any.
    #[must_use]
    pub fn issued_session(&self) -> Option<&SessionTicket> {
        self.issued.as_ref()
    }

    /// Takes the issued session out of the context.
    pub fn take_issued_session(&mut self) -> Option<SessionTicket> {
        self.issued.take()
    }
}

/// Binds a federated identity to a local account.
#[async_trait]
pub trait IdentityLinker: Send + Sync {
    /// Links `user` and, typically, issues a session through `ctx`.
    async fn link_identity(
        &self,
        ctx: &mut SessionContext,
        user: &UserDescriptor,
    ) -> Result<(), LinkError>;
}

/// Drives one sign-in from request body to redirect.
pub struct LoginOrchestrator {
    require_secure_transport: bool,
    app_root: String,
    policy: ValidationPolicy,
    registry: Arc<IssuerTrustRegistry>,
    extractor: Arc<dyn TokenExtractor>,
    validator: Arc<dyn TokenValidator>,
    linker: Arc<dyn IdentityLinker>,
}

impl fmt::Debug for LoginOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginOrchestrator")
            .field("require_secure_transport", &self.require_secure_transport)
            .field("app_root", &self.app_root)
            .field("policy", &self.policy)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl LoginOrchestrator {
    /// Creates an orchestrator using the WS-Federation POST extractor.
    pub fn new(
        config: &FederationConfig,
        registry: Arc<IssuerTrustRegistry>,
        validator: Arc<dyn TokenValidator>,
        linker: Arc<dyn IdentityLinker>,
    ) -> Self {
        let policy = ValidationPolicy::from_config(config);
        Self {
            require_secure_transport: config.require_secure_transport,
            app_root: config.normalized_app_root(),
            extractor: Arc::new(WsFedPostExtractor::new(policy.quotas)),
            policy,
            registry,
            validator,
            linker,
        }
    }

    /// Replaces the token extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn TokenExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// The trust registry consulted by the validator.
    #[must_use]
    pub fn registry(&self) -> &Arc<IssuerTrustRegistry> {
        &self.registry
    }

    /// Whether insecure requests are rejected.
    #[must_use]
    pub const fn requires_secure_transport(&self) -> bool {
        self.require_secure_transport
    }

    /// The policy handed to the validator.
    #[must_use]
    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// The application root, with leading and trailing `/`.
    #[must_use]
    pub fn app_root(&self) -> &str {
        &self.app_root
    }

    /// Runs the sign-in flow for a form-encoded request body.
    ///
    /// # Errors
    ///
    /// Returns the state reached and the first error encountered.
    pub async fn sign_in(
        &self,
        ctx: &mut SessionContext,
        body: &[u8],
    ) -> Result<LoginOutcome, LoginFailure> {
        let mut state = LoginState::Received;
        let result = self.run(&mut state, ctx, body).await;
        result.map_err(|error| {
            tracing::warn!(
                state = %state,
                error_code = error.code(),
                error = %error,
                "Sign-in rejected"
            );
            LoginFailure { state, error }
        })
    }

    async fn run(
        &self,
        state: &mut LoginState,
        ctx: &mut SessionContext,
        body: &[u8],
    ) -> Result<LoginOutcome, LoginError> {
        if self.require_secure_transport && !ctx.is_secure() {
            return Err(LoginError::InsecureTransport);
        }

        let request = self.extractor.extract_signed_token(body)?;
        advance(state, LoginState::TransportExtracted);

        if request.token.size() > self.policy.quotas.max_token_bytes {
            return Err(LoginError::MalformedRequest(format!(
                "token exceeds {} bytes",
                self.policy.quotas.max_token_bytes
            )));
        }

        let claims = self
            .validator
            .validate_token(&request.token, self.registry.as_ref(), &self.policy)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Token validation failed");
                LoginError::from(e)
            })?;
        advance(state, LoginState::SignatureValidated);
        ctx.issuer = claims.issuer().map(str::to_string);

        let user = extract_user(&claims)?;
        advance(state, LoginState::ClaimsExtracted);

        self.linker.link_identity(ctx, &user).await?;
        advance(state, LoginState::Linked);

        let location = redirect_destination(&self.app_root, request.context.as_deref());
        advance(state, LoginState::Redirected);
        tracing::info!(
            issuer = ctx.issuer().unwrap_or("unknown"),
            session_issued = ctx.issued_session().is_some(),
            "Federated sign-in completed"
        );

        Ok(LoginOutcome { location })
    }
}

fn advance(state: &mut LoginState, next: LoginState) {
    tracing::debug!(from = %state, to = %next, "Sign-in state transition");
    *state = next;
}

/// Computes the post sign-in destination: `app_root` followed by the
/// continuation hint.
///
/// The hint is only honoured when it is a relative path, query or fragment;
/// anything that could leave the application falls back to `app_root`.
#[must_use]
pub fn redirect_destination(app_root: &str, hint: Option<&str>) -> String {
    match hint.map(str::trim) {
        Some(hint) if !hint.is_empty() && is_relative_hint(hint) => {
            format!("{app_root}{}", hint.trim_start_matches('/'))
        }
        _ => app_root.to_string(),
    }
}

fn is_relative_hint(hint: &str) -> bool {
    if !hint.is_ascii()
        || hint.starts_with("//")
        || hint.contains('\\')
        || hint.chars().any(|c| c.is_ascii_control())
    {
        return false;
    }
    // A ':' before the first '/', '?' or '#' would be a scheme.
    let head = hint.split(['/', '?', '#']).next().unwrap_or_default();
    !head.contains(':')
}
