//! Cryptographic error types.

use thiserror::Error;

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors from key handling, sealing and opening.
///
/// Opening failures deliberately carry no detail about *why* the
/// authentication tag did not verify.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Key material has the wrong length.
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Required length in bytes.
        expected: usize,
        /// Supplied length in bytes.
        actual: usize,
    },

    /// Key material is not valid base64.
    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    /// Two keys share the same epoch.
    #[error("duplicate key epoch: {0}")]
    DuplicateEpoch(u32),

    /// The key ring has no keys.
    #[error("key ring is empty")]
    EmptyKeyRing,

    /// A sealed frame is shorter than its fixed header.
    #[error("sealed frame too short")]
    FrameTooShort,

    /// A sealed frame has an unknown format version.
    #[error("unsupported frame version: {0}")]
    UnsupportedVersion(u8),

    /// The frame was sealed under a key epoch this ring does not hold.
    #[error("unknown key epoch: {0}")]
    UnknownEpoch(u32),

    /// Authentication tag verification failed.
    #[error("integrity check failed")]
    IntegrityCheckFailed,

    /// Sealing failed inside the AEAD implementation.
    #[error("seal failed")]
    Seal,

    /// The system random number generator failed.
    #[error("random number generation failed")]
    Random,
}
