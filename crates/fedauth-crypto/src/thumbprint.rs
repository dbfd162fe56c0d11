//! Certificate thumbprints.
//!
//! A thumbprint is the digest of a certificate's DER encoding, rendered as
//! uppercase hex. WS-Federation deployments conventionally identify signing
//! certificates by their SHA-1 thumbprint; SHA-256 is offered for newer
//! providers. These digests identify a certificate, they are not used as a
//! signature primitive.

use aws_lc_rs::digest;

/// Digest used to compute a thumbprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThumbprintAlgorithm {
    /// SHA-1, the classic WS-Federation thumbprint.
    #[default]
    Sha1,
    /// SHA-256.
    Sha256,
}

impl ThumbprintAlgorithm {
    /// Digest length in bytes.
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }
}

/// Computes the thumbprint of a DER-encoded certificate.
#[must_use]
pub fn thumbprint(cert_der: &[u8], algorithm: ThumbprintAlgorithm) -> String {
    let alg = match algorithm {
        ThumbprintAlgorithm::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
        ThumbprintAlgorithm::Sha256 => &digest::SHA256,
    };
    to_hex(digest::digest(alg, cert_der).as_ref())
}

/// Computes the SHA-1 thumbprint of a DER-encoded certificate.
#[must_use]
pub fn sha1_thumbprint(cert_der: &[u8]) -> String {
    thumbprint(cert_der, ThumbprintAlgorithm::Sha1)
}

/// Renders bytes as uppercase hex without separators.
#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02X}");
        out
    })
}
