//! # fedauth-core
//!
//! Configuration and configuration errors shared by the federated sign-in
//! crates.
//!
//! The configuration surface is intentionally small: whether TLS is
//! required, the audience tokens must be addressed to, the trusted signer
//! fingerprints, reader quotas and the session cookie keys.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;

pub use config::{CookieConfig, CookieKeyConfig, FederationConfig, QuotaConfig, TrustedIssuerConfig};
pub use error::{ConfigError, ConfigResult};
