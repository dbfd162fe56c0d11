//! # fedauth-crypto
//!
//! Cryptographic building blocks for federated sign-in, on top of
//! aws-lc-rs:
//!
//! - [`thumbprint`] - certificate thumbprints in the trust registry's format
//! - [`aead`] - AES-256-GCM key ring with key epochs for cookie protection

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aead;
pub mod error;
pub mod thumbprint;

pub use aead::{KeyRing, ProtectionKey, FRAME_OVERHEAD, KEY_LEN};
pub use error::{CryptoError, CryptoResult};
pub use thumbprint::{sha1_thumbprint, thumbprint, ThumbprintAlgorithm};
