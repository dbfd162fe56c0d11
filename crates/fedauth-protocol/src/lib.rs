//! WS-Federation sign-in for relying parties.
//!
//! This crate turns an identity provider's sign-in post into a local
//! session:
//!
//! - **Issuer trust** - allow list of signer thumbprints ([`trust`])
//! - **Claim extraction** - prioritized fallback rules for user id, name
//!   and email ([`claims`])
//! - **Token transport** - locating the signed token in a WS-Federation
//!   form post ([`bindings`])
//! - **Login flow** - the state machine tying these to the external token
//!   validator and identity linker ([`login`])
//! - **Endpoints** - Axum handlers and router ([`endpoints`])
//!
//! Signature verification and the account store stay outside this crate,
//! behind [`TokenValidator`] and [`IdentityLinker`].
//!
//! # Example
//!
//! ```rust,ignore
//! use fedauth_protocol::endpoints::{federation_router, FederationState};
//!
//! let orchestrator = Arc::new(LoginOrchestrator::new(&config, registry, validator, linker));
//! let app = federation_router(orchestrator.app_root())
//!     .with_state(FederationState::new(orchestrator, cookies));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod claims;
pub mod endpoints;
pub mod error;
pub mod login;
pub mod token;
pub mod trust;

pub use claims::{extract_user, first_matching_claim, Claim, ClaimSet, UserDescriptor};
pub use error::{ExtractionError, LinkError, LoginError, LoginResult, ValidationError};
pub use login::{
    redirect_destination, IdentityLinker, LoginFailure, LoginOrchestrator, LoginOutcome,
    LoginState, SessionContext,
};
pub use token::{RawToken, SignInRequest, TokenExtractor, TokenQuotas, TokenValidator, ValidationPolicy};
pub use trust::{IssuerTrustRegistry, TrustedIssuerEntry, TrustedIssuerResolver};
