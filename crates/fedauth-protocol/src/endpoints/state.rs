//! Endpoint state.

use std::sync::Arc;

use fedauth_session::SessionCookieCodec;

use crate::login::LoginOrchestrator;

/// Slack for form field names and other fields around `wresult`.
const FORM_OVERHEAD: usize = 64 * 1024;

/// Shared state of the sign-in endpoints.
#[derive(Debug, Clone)]
pub struct FederationState {
    /// The sign-in flow.
    pub orchestrator: Arc<LoginOrchestrator>,
    /// Session cookie reader and writer.
    pub cookies: Arc<SessionCookieCodec>,
    /// Whether `X-Forwarded-Proto` from a fronting proxy is believed.
    pub trust_forwarded_proto: bool,
    /// Largest sign-in body that is read.
    pub max_body_bytes: usize,
}

impl FederationState {
    /// Creates endpoint state. The body limit allows a token at the
    /// configured quota even when fully percent-encoded.
    pub fn new(orchestrator: Arc<LoginOrchestrator>, cookies: Arc<SessionCookieCodec>) -> Self {
        let max_body_bytes = orchestrator
            .policy()
            .quotas
            .max_token_bytes
            .saturating_mul(3)
            .saturating_add(FORM_OVERHEAD);
        Self {
            orchestrator,
            cookies,
            trust_forwarded_proto: false,
            max_body_bytes,
        }
    }

    /// Sets whether `X-Forwarded-Proto` is trusted.
    #[must_use]
    pub fn with_trust_forwarded_proto(mut self, trust: bool) -> Self {
        self.trust_forwarded_proto = trust;
        self
    }
}
