//! Authenticated encryption with rotating key epochs.
//!
//! Sealed frames have the layout
//!
//! ```text
//! version (1) | epoch (4, big endian) | nonce (12) | ciphertext | tag (16)
//! ```
//!
//! The version and epoch bytes are bound into the AEAD as associated data,
//! so a frame cannot be re-labelled with another epoch without failing the
//! integrity check. New frames are always sealed under the active (first)
//! key; older epochs stay readable until they are removed from the ring.

use std::fmt;

use aws_lc_rs::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use aws_lc_rs::rand::{SecureRandom, SystemRandom};
use base64::Engine;

use crate::error::{CryptoError, CryptoResult};

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// Current frame format version.
pub const FRAME_VERSION: u8 = 1;

/// Authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

const HEADER_LEN: usize = 1 + 4;

/// Fixed bytes added to every sealed frame.
pub const FRAME_OVERHEAD: usize = HEADER_LEN + NONCE_LEN + TAG_LEN;

/// A single AES-256-GCM key tagged with its epoch.
pub struct ProtectionKey {
    epoch: u32,
    key: LessSafeKey,
}

impl ProtectionKey {
    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not exactly [`KEY_LEN`] long.
    pub fn new(epoch: u32, bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_LEN,
                actual: bytes.len(),
            });
        }
        let unbound = UnboundKey::new(&AES_256_GCM, bytes).map_err(|_| {
            CryptoError::InvalidKeyLength {
                expected: KEY_LEN,
                actual: bytes.len(),
            }
        })?;
        Ok(Self {
            epoch,
            key: LessSafeKey::new(unbound),
        })
    }

    /// Creates a key from standard base64.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoding or the decoded length is invalid.
    pub fn from_base64(epoch: u32, encoded: &str) -> CryptoResult<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKeyEncoding(e.to_string()))?;
        Self::new(epoch, &bytes)
    }

    /// The epoch this key seals under.
    #[must_use]
    pub const fn epoch(&self) -> u32 {
        self.epoch
    }
}

impl fmt::Debug for ProtectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtectionKey")
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

/// An ordered set of protection keys; the first key is active.
pub struct KeyRing {
    keys: Vec<ProtectionKey>,
    rng: SystemRandom,
}

impl KeyRing {
    /// Creates a key ring. The first key becomes the active one.
    ///
    /// # Errors
    ///
    /// Returns an error if `keys` is empty or two keys share an epoch.
    pub fn new(keys: Vec<ProtectionKey>) -> CryptoResult<Self> {
        if keys.is_empty() {
            return Err(CryptoError::EmptyKeyRing);
        }
        for (i, key) in keys.iter().enumerate() {
            if keys[..i].iter().any(|k| k.epoch == key.epoch) {
                return Err(CryptoError::DuplicateEpoch(key.epoch));
            }
        }
        tracing::debug!(
            active_epoch = keys[0].epoch,
            key_count = keys.len(),
            "Cookie key ring loaded"
        );
        Ok(Self {
            keys,
            rng: SystemRandom::new(),
        })
    }

    /// Creates a key ring holding a single key.
    #[must_use]
    pub fn single(key: ProtectionKey) -> Self {
        Self {
            keys: vec![key],
            rng: SystemRandom::new(),
        }
    }

    /// Epoch of the key used for sealing.
    #[must_use]
    pub fn active_epoch(&self) -> u32 {
        self.keys[0].epoch
    }

    /// Seals `plaintext` under the active key.
    ///
    /// # Errors
    ///
    /// Returns an error if nonce generation or encryption fails.
    pub fn seal(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let key = &self.keys[0];

        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CryptoError::Random)?;

        let header = frame_header(key.epoch);
        let mut in_out = plaintext.to_vec();
        key.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(header),
                &mut in_out,
            )
            .map_err(|_| CryptoError::Seal)?;

        let mut frame = Vec::with_capacity(HEADER_LEN + NONCE_LEN + in_out.len());
        frame.extend_from_slice(&header);
        frame.extend_from_slice(&nonce_bytes);
        frame.extend_from_slice(&in_out);
        Ok(frame)
    }

    /// Opens a frame produced by [`KeyRing::seal`].
    ///
    /// # Errors
    ///
    /// Fails if the frame is malformed, was sealed under an epoch this ring
    /// does not hold, or does not authenticate.
    pub fn open(&self, frame: &[u8]) -> CryptoResult<Vec<u8>> {
        if frame.len() < FRAME_OVERHEAD {
            return Err(CryptoError::FrameTooShort);
        }

        let (header, rest) = frame.split_at(HEADER_LEN);
        if header[0] != FRAME_VERSION {
            return Err(CryptoError::UnsupportedVersion(header[0]));
        }

        let mut epoch_bytes = [0u8; 4];
        epoch_bytes.copy_from_slice(&header[1..]);
        let epoch = u32::from_be_bytes(epoch_bytes);

        let key = self
            .keys
            .iter()
            .find(|k| k.epoch == epoch)
            .ok_or(CryptoError::UnknownEpoch(epoch))?;

        let (nonce_bytes, sealed) = rest.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| CryptoError::FrameTooShort)?;

        let mut in_out = sealed.to_vec();
        let plaintext_len = key
            .key
            .open_in_place(nonce, Aad::from(header), &mut in_out)
            .map_err(|_| CryptoError::IntegrityCheckFailed)?
            .len();
        in_out.truncate(plaintext_len);
        Ok(in_out)
    }
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRing")
            .field(
                "epochs",
                &self.keys.iter().map(|k| k.epoch).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

fn frame_header(epoch: u32) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[0] = FRAME_VERSION;
    header[1..].copy_from_slice(&epoch.to_be_bytes());
    header
}
