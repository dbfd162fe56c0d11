//! Issuer trust registry.
//!
//! An allow list of signer certificate thumbprints. A token signed by a
//! certificate that is not listed is untrusted, whatever its signature.

use fedauth_core::{ConfigError, ConfigResult, TrustedIssuerConfig};
use fedauth_crypto::{thumbprint, ThumbprintAlgorithm};
use parking_lot::RwLock;

/// Resolves a signer thumbprint to an issuer name.
///
/// `None` means the signer is not trusted and the token must be rejected.
pub trait TrustedIssuerResolver: Send + Sync {
    /// Resolves a thumbprint, compared case-insensitively.
    fn resolve_issuer(&self, fingerprint: &str) -> Option<String>;

    /// Resolves a DER-encoded signing certificate by its SHA-1 thumbprint,
    /// then by its SHA-256 thumbprint.
    fn resolve_certificate(&self, cert_der: &[u8]) -> Option<String> {
        [ThumbprintAlgorithm::Sha1, ThumbprintAlgorithm::Sha256]
            .into_iter()
            .find_map(|alg| self.resolve_issuer(&thumbprint(cert_der, alg)))
    }
}

/// A trusted thumbprint and the issuer name it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedIssuerEntry {
    /// Certificate thumbprint (hex).
    pub fingerprint: String,
    /// Issuer name reported for tokens signed by this certificate.
    pub issuer_name: String,
}

impl TrustedIssuerEntry {
    /// Creates an entry named after its uppercased fingerprint.
    pub fn new(fingerprint: impl Into<String>) -> Self {
        let fingerprint = fingerprint.into();
        let issuer_name = fingerprint.to_ascii_uppercase();
        Self {
            fingerprint,
            issuer_name,
        }
    }

    /// Creates an entry with an explicit issuer name.
    pub fn named(fingerprint: impl Into<String>, issuer_name: impl Into<String>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            issuer_name: issuer_name.into(),
        }
    }

    fn matches(&self, fingerprint: &str) -> bool {
        self.fingerprint.eq_ignore_ascii_case(fingerprint)
    }
}

impl From<&TrustedIssuerConfig> for TrustedIssuerEntry {
    fn from(config: &TrustedIssuerConfig) -> Self {
        match &config.name {
            Some(name) => Self::named(config.fingerprint.clone(), name.clone()),
            None => Self::new(config.fingerprint.clone()),
        }
    }
}

/// Ordered, append-only set of trusted issuers.
///
/// Lookups take a read lock; [`IssuerTrustRegistry::add_trusted_issuer`]
/// takes the write lock, so readers never observe a partial update.
#[derive(Debug)]
pub struct IssuerTrustRegistry {
    entries: RwLock<Vec<TrustedIssuerEntry>>,
}

impl IssuerTrustRegistry {
    /// Creates a registry from an initial, non-empty list of entries.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyTrustList`] if `entries` is empty.
    pub fn new(entries: Vec<TrustedIssuerEntry>) -> ConfigResult<Self> {
        if entries.is_empty() {
            return Err(ConfigError::EmptyTrustList);
        }
        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    /// Creates a registry from configuration, keeping its order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyTrustList`] if nothing is configured.
    pub fn from_config(issuers: &[TrustedIssuerConfig]) -> ConfigResult<Self> {
        Self::new(issuers.iter().map(TrustedIssuerEntry::from).collect())
    }

    /// Trusts another thumbprint. Its issuer name is the uppercased
    /// thumbprint.
    pub fn add_trusted_issuer(&self, fingerprint: impl Into<String>) {
        self.push(TrustedIssuerEntry::new(fingerprint));
    }

    /// Trusts another thumbprint under an explicit issuer name.
    pub fn add_named_issuer(&self, fingerprint: impl Into<String>, issuer_name: impl Into<String>) {
        self.push(TrustedIssuerEntry::named(fingerprint, issuer_name));
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Always false; a registry cannot be built empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn push(&self, entry: TrustedIssuerEntry) {
        tracing::info!(issuer = %entry.issuer_name, "Trusted issuer added");
        self.entries.write().push(entry);
    }
}

impl TrustedIssuerResolver for IssuerTrustRegistry {
    fn resolve_issuer(&self, fingerprint: &str) -> Option<String> {
        let found = self
            .entries
            .read()
            .iter()
            .find(|e| e.matches(fingerprint))
            .map(|e| e.issuer_name.clone());
        if found.is_none() {
            tracing::debug!(fingerprint, "Signer thumbprint is not trusted");
        }
        found
    }
}
