//! Claim sets and the user identity derived from them.
//!
//! Identity providers populate different claim types, so each field of the
//! [`UserDescriptor`] is derived by walking a fixed list of candidate types
//! in priority order.

use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

/// Well-known claim type URIs.
pub mod claim_types {
    /// Name identifier.
    pub const NAME_IDENTIFIER: &str =
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier";
    /// Name.
    pub const NAME: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name";
    /// Given name.
    pub const GIVEN_NAME: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/givenname";
    /// Surname.
    pub const SURNAME: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/surname";
    /// Email address.
    pub const EMAIL: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress";
    /// Email address in the older claims schema some providers still emit.
    pub const ALT_EMAIL: &str = "http://schemas.xmlsoap.org/claims/EmailAddress";
}

/// Candidate types for the user identifier, highest priority first.
pub const USER_ID_CLAIMS: [&str; 4] = [
    claim_types::NAME_IDENTIFIER,
    claim_types::NAME,
    claim_types::EMAIL,
    claim_types::ALT_EMAIL,
];

/// Candidate types for the user name, highest priority first.
pub const USERNAME_CLAIMS: [&str; 5] = [
    claim_types::NAME,
    claim_types::GIVEN_NAME,
    claim_types::SURNAME,
    claim_types::EMAIL,
    claim_types::ALT_EMAIL,
];

/// Candidate types for the email address, highest priority first.
pub const EMAIL_CLAIMS: [&str; 2] = [claim_types::EMAIL, claim_types::ALT_EMAIL];

/// A single typed attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Claim type URI.
    pub claim_type: String,
    /// Claim value.
    pub value: String,
}

impl Claim {
    /// Creates a claim.
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// The claims of one validated token, in token order.
///
/// A type may occur more than once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimSet {
    issuer: Option<String>,
    claims: Vec<Claim>,
}

impl ClaimSet {
    /// Creates an empty claim set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a claim set from `(type, value)` pairs.
    pub fn from_pairs<I, T, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, V)>,
        T: Into<String>,
        V: Into<String>,
    {
        Self {
            issuer: None,
            claims: pairs.into_iter().map(|(t, v)| Claim::new(t, v)).collect(),
        }
    }

    /// Records the trusted issuer that vouched for these claims.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Appends a claim.
    pub fn push(&mut self, claim_type: impl Into<String>, value: impl Into<String>) {
        self.claims.push(Claim::new(claim_type, value));
    }

    /// The issuer name, if the validator recorded one.
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    /// Iterates over the claims in token order.
    pub fn iter(&self) -> impl Iterator<Item = &Claim> {
        self.claims.iter()
    }

    /// Number of claims.
    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Whether the set holds no claims.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Claim types present, in token order, joined with `"; "`. Values are
    /// never included.
    #[must_use]
    pub fn describe_types(&self) -> String {
        self.claims
            .iter()
            .map(|c| c.claim_type.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// The identity derived from a claim set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDescriptor {
    /// Stable identifier at the identity provider.
    pub user_id: String,
    /// Display name.
    pub username: String,
    /// Email address, if any.
    pub email: Option<String>,
}

/// Returns the value of the first claim of the highest-priority candidate
/// type present in `claims`.
///
/// Priority follows `candidates`, not claim order. Types compare
/// case-insensitively.
pub fn first_matching_claim<'a>(claims: &'a ClaimSet, candidates: &[&str]) -> Option<&'a str> {
    candidates.iter().find_map(|candidate| {
        claims
            .iter()
            .find(|c| c.claim_type.eq_ignore_ascii_case(candidate))
            .map(|c| c.value.as_str())
    })
}

/// Derives the user identity from a validated claim set.
///
/// # Errors
///
/// Fails with [`ExtractionError::MissingUserId`] or
/// [`ExtractionError::MissingUsername`] when the field is absent or empty.
pub fn extract_user(claims: &ClaimSet) -> Result<UserDescriptor, ExtractionError> {
    let user_id = first_matching_claim(claims, &USER_ID_CLAIMS)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ExtractionError::MissingUserId {
            present: claims.describe_types(),
        })?;

    let username = first_matching_claim(claims, &USERNAME_CLAIMS)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ExtractionError::MissingUsername {
            present: claims.describe_types(),
        })?;

    let email = first_matching_claim(claims, &EMAIL_CLAIMS)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    Ok(UserDescriptor {
        user_id: user_id.to_string(),
        username: username.to_string(),
        email,
    })
}
