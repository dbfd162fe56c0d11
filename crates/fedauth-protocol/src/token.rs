//! Signed tokens and the collaborators that extract and validate them.

use async_trait::async_trait;
use chrono::Duration;
use fedauth_core::{config::DEFAULT_TOKEN_QUOTA, FederationConfig, QuotaConfig};

use crate::claims::ClaimSet;
use crate::error::{LoginResult, ValidationError};
use crate::trust::TrustedIssuerResolver;

/// Default tolerated clock difference between this host and the issuer.
pub const DEFAULT_CLOCK_SKEW_SECS: i64 = 300;

/// The signed token XML, as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    xml: String,
}

impl RawToken {
    /// Wraps token XML.
    pub fn new(xml: impl Into<String>) -> Self {
        Self { xml: xml.into() }
    }

    /// The token XML.
    #[must_use]
    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.xml.len()
    }
}

/// What the transport delivered for one sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInRequest {
    /// The signed token.
    pub token: RawToken,
    /// Opaque continuation hint (`wctx`).
    pub context: Option<String>,
}

/// Reader quotas bounding the work spent on one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenQuotas {
    /// Largest accepted token.
    pub max_token_bytes: usize,
    /// Longest accepted text node.
    pub max_string_content_length: usize,
    /// Largest accepted binary array (e.g. a base64 certificate).
    pub max_array_length: usize,
}

impl Default for TokenQuotas {
    fn default() -> Self {
        Self {
            max_token_bytes: DEFAULT_TOKEN_QUOTA,
            max_string_content_length: DEFAULT_TOKEN_QUOTA,
            max_array_length: DEFAULT_TOKEN_QUOTA,
        }
    }
}

impl From<&QuotaConfig> for TokenQuotas {
    fn from(config: &QuotaConfig) -> Self {
        Self {
            max_token_bytes: config.max_token_bytes,
            max_string_content_length: config.max_string_content_length,
            max_array_length: config.max_array_length,
        }
    }
}

/// Constraints the validator must enforce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Audience URI tokens must be addressed to.
    pub audience: String,
    /// Reader quotas.
    pub quotas: TokenQuotas,
    /// Tolerated clock skew when checking token lifetimes.
    pub clock_skew: Duration,
}

impl ValidationPolicy {
    /// Creates a policy with default quotas and clock skew.
    pub fn new(audience: impl Into<String>) -> Self {
        Self {
            audience: audience.into(),
            quotas: TokenQuotas::default(),
            clock_skew: Duration::seconds(DEFAULT_CLOCK_SKEW_SECS),
        }
    }

    /// Builds the policy from configuration.
    #[must_use]
    pub fn from_config(config: &FederationConfig) -> Self {
        Self {
            quotas: TokenQuotas::from(&config.quotas),
            ..Self::new(config.expected_audience_uri.clone())
        }
    }
}

/// Pulls the signed token out of a sign-in request body.
pub trait TokenExtractor: Send + Sync {
    /// Extracts the token and continuation hint from a form-encoded body.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LoginError::MalformedRequest`] if the body does not
    /// carry a locatable token.
    fn extract_signed_token(&self, body: &[u8]) -> LoginResult<SignInRequest>;
}

/// Verifies a token signature and parses its claims.
///
/// Implementations must reject any token whose signing certificate does
/// not resolve through `issuers`, and must enforce the audience and quotas
/// in `policy`.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Validates `token` and returns its claims.
    async fn validate_token(
        &self,
        token: &RawToken,
        issuers: &dyn TrustedIssuerResolver,
        policy: &ValidationPolicy,
    ) -> Result<ClaimSet, ValidationError>;
}
