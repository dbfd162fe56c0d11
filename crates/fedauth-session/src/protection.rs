//! Authenticated encryption stage.

use std::sync::Arc;

use fedauth_core::CookieConfig;
use fedauth_crypto::{KeyRing, ProtectionKey};

use crate::error::{SessionResult, TransformResult};

/// Seals on encode and opens on decode, using a shared [`KeyRing`].
#[derive(Debug, Clone)]
pub struct ProtectionStage {
    keys: Arc<KeyRing>,
}

impl ProtectionStage {
    /// Creates a stage over an existing key ring.
    #[must_use]
    pub fn new(keys: Arc<KeyRing>) -> Self {
        Self { keys }
    }

    /// Builds the key ring from cookie configuration. The first configured
    /// key is the active one.
    ///
    /// # Errors
    ///
    /// Returns an error if a key is malformed, an epoch repeats, or no key
    /// is configured.
    pub fn from_config(config: &CookieConfig) -> SessionResult<Self> {
        Ok(Self::new(Arc::new(key_ring_from_config(config)?)))
    }

    /// The key ring.
    #[must_use]
    pub fn keys(&self) -> &KeyRing {
        &self.keys
    }

    /// Seals `data` under the active key.
    ///
    /// # Errors
    ///
    /// Returns an error if sealing fails.
    pub fn encode(&self, data: &[u8]) -> TransformResult<Vec<u8>> {
        Ok(self.keys.seal(data)?)
    }

    /// Opens a sealed frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is malformed, unknown or tampered with.
    pub fn decode(&self, data: &[u8]) -> TransformResult<Vec<u8>> {
        Ok(self.keys.open(data)?)
    }
}

/// Loads the configured cookie keys into a [`KeyRing`].
///
/// # Errors
///
/// Returns an error if a key is malformed, an epoch repeats, or no key is
/// configured.
pub fn key_ring_from_config(config: &CookieConfig) -> SessionResult<KeyRing> {
    let keys = config
        .keys
        .iter()
        .map(|k| ProtectionKey::from_base64(k.epoch, &k.key_base64))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(KeyRing::new(keys)?)
}

#[cfg(test)]
mod tests {
    use fedauth_core::FederationConfig;

    use super::*;
    use crate::error::{SessionError, TransformError};

    #[test]
    fn from_test_config() {
        let stage = ProtectionStage::from_config(&FederationConfig::for_testing().cookie).unwrap();
        assert_eq!(stage.keys().active_epoch(), 1);

        let sealed = stage.encode(b"ticket").unwrap();
        assert_eq!(stage.decode(&sealed).unwrap(), b"ticket");
    }

    #[test]
    fn bad_key_config_is_rejected() {
        let mut cookie = FederationConfig::for_testing().cookie;
        cookie.keys[0].key_base64 = "c2hvcnQ=".to_string();
        assert!(matches!(
            ProtectionStage::from_config(&cookie),
            Err(SessionError::Keys(_))
        ));

        cookie.keys.clear();
        assert!(ProtectionStage::from_config(&cookie).is_err());
    }

    #[test]
    fn tampering_maps_to_integrity_failure() {
        let stage = ProtectionStage::from_config(&FederationConfig::for_testing().cookie).unwrap();
        let mut sealed = stage.encode(b"ticket").unwrap();
        sealed[10] ^= 0x80;
        assert_eq!(stage.decode(&sealed), Err(TransformError::IntegrityCheckFailed));
    }
}
