//! Configuration error types.
//!
//! Configuration problems are reported at startup, before any request is
//! accepted. Messages name the offending setting but never echo secret
//! material such as cookie keys.

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    /// A setting is present but cannot be parsed.
    #[error("invalid value for {setting}: {reason}")]
    Invalid {
        /// The setting (environment variable) name.
        setting: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// No trusted signer fingerprints are configured.
    #[error("at least one trusted issuer fingerprint must be configured")]
    EmptyTrustList,

    /// The expected audience URI is empty.
    #[error("the expected audience URI must not be empty")]
    EmptyAudience,

    /// No cookie protection keys are configured.
    #[error("at least one cookie protection key must be configured")]
    NoCookieKeys,

    /// A size quota is zero.
    #[error("quota {0} must be greater than zero")]
    ZeroQuota(&'static str),
}

impl ConfigError {
    /// Creates an [`ConfigError::Invalid`] for the given setting.
    pub fn invalid(setting: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            setting,
            reason: reason.into(),
        }
    }
}
