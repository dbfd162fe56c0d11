//! Session and cookie transform error types.

use fedauth_crypto::CryptoError;
use thiserror::Error;

/// Result type for transform operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for session cookie operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// A transform stage failed to encode or decode.
///
/// On the decode side every variant means the same thing to callers: the
/// cookie does not carry a valid session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    /// The compressed stream ended before its final block.
    #[error("compressed payload is truncated")]
    Truncated,

    /// The compressed stream is malformed.
    #[error("compressed payload is corrupt: {0}")]
    Corrupt(String),

    /// Bytes follow the end of the compressed stream.
    #[error("unexpected data after compressed payload")]
    TrailingData,

    /// Decompressed output exceeds the stage limit.
    #[error("decoded payload exceeds {limit} bytes")]
    TooLarge {
        /// The configured limit.
        limit: usize,
    },

    /// The protected frame is structurally invalid.
    #[error("malformed protected payload: {0}")]
    Malformed(String),

    /// The protected frame uses an unknown format version.
    #[error("unsupported protection format version {0}")]
    UnsupportedVersion(u8),

    /// The frame was protected under a key epoch that is no longer held.
    #[error("unrecognized key epoch {0}")]
    UnknownKeyEpoch(u32),

    /// Authentication failed; the payload was altered or forged.
    #[error("integrity check failed")]
    IntegrityCheckFailed,

    /// The outer text encoding of the payload is invalid.
    #[error("payload encoding error: {0}")]
    Encoding(String),

    /// Encoding failed.
    #[error("encode failed: {0}")]
    EncodeFailed(String),
}

impl From<CryptoError> for TransformError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::FrameTooShort => Self::Malformed("frame too short".to_string()),
            CryptoError::UnsupportedVersion(v) => Self::UnsupportedVersion(v),
            CryptoError::UnknownEpoch(epoch) => Self::UnknownKeyEpoch(epoch),
            CryptoError::IntegrityCheckFailed => Self::IntegrityCheckFailed,
            other => Self::EncodeFailed(other.to_string()),
        }
    }
}

/// Errors reading or writing a session cookie.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The transform pipeline rejected the payload.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// The ticket could not be (de)serialized.
    #[error("session ticket serialization error: {0}")]
    Serialization(String),

    /// The ticket lifetime has elapsed.
    #[error("session ticket expired")]
    Expired,

    /// The configured keys could not be loaded.
    #[error("cookie key error: {0}")]
    Keys(#[from] CryptoError),
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<base64::DecodeError> for TransformError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Encoding(err.to_string())
    }
}
