//! Sign-in error types.
//!
//! [`LoginError`] is the single taxonomy surfaced by the login flow. The
//! collaborator errors ([`ValidationError`], [`LinkError`]) and claim
//! extraction failures ([`ExtractionError`]) convert into it.

use fedauth_session::{SessionError, TransformError};
use thiserror::Error;

/// Result type for sign-in operations.
pub type LoginResult<T> = Result<T, LoginError>;

/// Why a sign-in request was rejected.
#[derive(Debug, Error)]
pub enum LoginError {
    /// A secure channel is required and the request did not arrive on one.
    #[error("a secure connection is required to sign in")]
    InsecureTransport,

    /// The request does not carry a usable token.
    #[error("malformed sign-in request: {0}")]
    MalformedRequest(String),

    /// The token was signed by a certificate that is not trusted.
    #[error("the token issuer is not trusted")]
    UntrustedIssuer,

    /// The token signature did not verify.
    #[error("the token signature is invalid")]
    InvalidSignature,

    /// The token lifetime has elapsed.
    #[error("the token has expired")]
    TokenExpired,

    /// The token is addressed to another relying party.
    #[error("the token is not addressed to this application")]
    AudienceMismatch,

    /// No claim yields a user identifier.
    #[error("no user identifier claim; claim types present: {present}")]
    MissingUserId {
        /// Claim types present in the token.
        present: String,
    },

    /// No claim yields a non-empty user name.
    #[error("no user name claim; claim types present: {present}")]
    MissingUsername {
        /// Claim types present in the token.
        present: String,
    },

    /// The identity linker failed.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// The session could not be encoded.
    #[error("session error: {0}")]
    Transform(#[from] TransformError),
}

impl LoginError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::MalformedRequest(_) => 400,
            Self::UntrustedIssuer
            | Self::InvalidSignature
            | Self::TokenExpired
            | Self::AudienceMismatch
            | Self::MissingUserId { .. }
            | Self::MissingUsername { .. } => 401,
            Self::InsecureTransport | Self::Link(LinkError::Rejected(_)) => 403,
            Self::Link(_) | Self::Transform(_) => 500,
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InsecureTransport => "insecure_transport",
            Self::MalformedRequest(_) => "malformed_request",
            Self::UntrustedIssuer => "untrusted_issuer",
            Self::InvalidSignature => "invalid_signature",
            Self::TokenExpired => "token_expired",
            Self::AudienceMismatch => "audience_mismatch",
            Self::MissingUserId { .. } => "missing_user_id",
            Self::MissingUsername { .. } => "missing_username",
            Self::Link(_) => "link_failed",
            Self::Transform(_) => "session_error",
        }
    }

    /// Message that is safe to show to the user.
    ///
    /// Server-side failures are not described beyond their code.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Link(LinkError::Rejected(reason)) => reason.clone(),
            Self::Link(_) | Self::Transform(_) => "The sign-in could not be completed.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<SessionError> for LoginError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Transform(e) => Self::Transform(e),
            other => Self::Transform(TransformError::EncodeFailed(other.to_string())),
        }
    }
}

/// Errors reported by the token validator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The signing certificate did not resolve to a trusted issuer.
    #[error("untrusted signer {fingerprint}")]
    UntrustedIssuer {
        /// Thumbprint of the signing certificate.
        fingerprint: String,
    },

    /// The signature is missing or does not verify.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// The token is outside its validity window.
    #[error("token expired")]
    TokenExpired,

    /// The audience restriction does not name this application.
    #[error("audience mismatch: {actual}")]
    AudienceMismatch {
        /// The audience the token was issued for.
        actual: String,
    },

    /// The token is not well formed or exceeds a quota.
    #[error("malformed token: {0}")]
    Malformed(String),
}

impl From<ValidationError> for LoginError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::UntrustedIssuer { .. } => Self::UntrustedIssuer,
            ValidationError::InvalidSignature(_) => Self::InvalidSignature,
            ValidationError::TokenExpired => Self::TokenExpired,
            ValidationError::AudienceMismatch { .. } => Self::AudienceMismatch,
            ValidationError::Malformed(detail) => Self::MalformedRequest(detail),
        }
    }
}

/// Errors reported by the identity linker.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The account exists but may not sign in. The reason is shown to the
    /// user.
    #[error("sign-in rejected: {0}")]
    Rejected(String),

    /// The account store could not be reached.
    #[error("account store unavailable: {0}")]
    Unavailable(String),

    /// Any other linker failure.
    #[error("identity link failed: {0}")]
    Internal(String),
}

/// Claim extraction failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// No user identifier could be derived.
    #[error("no user identifier claim; claim types present: {present}")]
    MissingUserId {
        /// Claim types present, joined with `"; "`.
        present: String,
    },

    /// No non-empty user name could be derived.
    #[error("no user name claim; claim types present: {present}")]
    MissingUsername {
        /// Claim types present, joined with `"; "`.
        present: String,
    },
}

impl From<ExtractionError> for LoginError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::MissingUserId { present } => Self::MissingUserId { present },
            ExtractionError::MissingUsername { present } => Self::MissingUsername { present },
        }
    }
}
