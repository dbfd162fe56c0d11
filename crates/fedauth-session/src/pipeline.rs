//! The ordered cookie transform pipeline.
//!
//! Encoding applies the stages first to last; decoding applies them last to
//! first. The stage order is part of the cookie wire format, so changing it
//! requires a new [`PipelineVersion`].

use std::fmt;
use std::sync::Arc;

use fedauth_crypto::KeyRing;

use crate::compression::DeflateStage;
use crate::error::TransformResult;
use crate::protection::ProtectionStage;

/// Identifies the stage order a cookie was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineVersion(u8);

impl PipelineVersion {
    /// Deflate, then authenticated encryption.
    pub const V1: Self = Self(1);

    /// The numeric version.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for PipelineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A reversible byte transform.
#[derive(Debug, Clone)]
pub enum TransformStage {
    /// Raw DEFLATE compression.
    Compress(DeflateStage),
    /// Authenticated encryption.
    Protect(ProtectionStage),
}

impl TransformStage {
    /// Short stage name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Compress(_) => "deflate",
            Self::Protect(_) => "protect",
        }
    }

    /// Applies the forward transform.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage cannot encode `data`.
    pub fn encode(&self, data: &[u8]) -> TransformResult<Vec<u8>> {
        match self {
            Self::Compress(stage) => stage.encode(data),
            Self::Protect(stage) => stage.encode(data),
        }
    }

    /// Applies the inverse transform.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` was not produced by this stage or was
    /// altered.
    pub fn decode(&self, data: &[u8]) -> TransformResult<Vec<u8>> {
        match self {
            Self::Compress(stage) => stage.decode(data),
            Self::Protect(stage) => stage.decode(data),
        }
    }
}

/// An ordered list of transform stages.
#[derive(Debug, Clone)]
pub struct TransformPipeline {
    version: PipelineVersion,
    stages: Vec<TransformStage>,
}

impl TransformPipeline {
    /// Creates a pipeline from explicit stages.
    #[must_use]
    pub fn new(version: PipelineVersion, stages: Vec<TransformStage>) -> Self {
        Self { version, stages }
    }

    /// The standard session cookie pipeline: compress, then protect.
    #[must_use]
    pub fn standard(keys: Arc<KeyRing>) -> Self {
        Self::new(
            PipelineVersion::V1,
            vec![
                TransformStage::Compress(DeflateStage::new()),
                TransformStage::Protect(ProtectionStage::new(keys)),
            ],
        )
    }

    /// The wire format version.
    #[must_use]
    pub const fn version(&self) -> PipelineVersion {
        self.version
    }

    /// The stages in encode order.
    #[must_use]
    pub fn stages(&self) -> &[TransformStage] {
        &self.stages
    }

    /// Runs every stage forward.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure.
    pub fn encode(&self, data: &[u8]) -> TransformResult<Vec<u8>> {
        self.stages
            .iter()
            .try_fold(data.to_vec(), |acc, stage| stage.encode(&acc))
    }

    /// Runs every stage in reverse.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure.
    pub fn decode(&self, data: &[u8]) -> TransformResult<Vec<u8>> {
        self.stages.iter().rev().try_fold(data.to_vec(), |acc, stage| {
            stage.decode(&acc).inspect_err(|e| {
                tracing::debug!(stage = stage.name(), error = %e, "Cookie transform rejected payload");
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use fedauth_crypto::ProtectionKey;

    use super::*;
    use crate::error::TransformError;

    fn ring(epoch: u32, fill: u8) -> Arc<KeyRing> {
        Arc::new(KeyRing::single(
            ProtectionKey::new(epoch, &[fill; fedauth_crypto::KEY_LEN]).unwrap(),
        ))
    }

    #[test]
    fn standard_pipeline_roundtrip() {
        let pipeline = TransformPipeline::standard(ring(1, 3));
        let data = br#"{"user_id":"u1","username":"alice"}"#;

        let encoded = pipeline.encode(data).unwrap();
        assert_ne!(encoded.as_slice(), data.as_slice());
        assert_eq!(pipeline.decode(&encoded).unwrap(), data);
    }

    #[test]
    fn stage_order_is_compress_then_protect() {
        let pipeline = TransformPipeline::standard(ring(1, 3));
        let names: Vec<_> = pipeline.stages().iter().map(TransformStage::name).collect();
        assert_eq!(names, ["deflate", "protect"]);
        assert_eq!(pipeline.version().to_string(), "v1");
    }

    #[test]
    fn reversed_stage_order_cannot_decode() {
        let pipeline = TransformPipeline::standard(ring(1, 3));
        let encoded = pipeline.encode(br#"{"user_id":"u1"}"#).unwrap();

        let reversed = TransformPipeline::new(
            PipelineVersion::V1,
            pipeline.stages().iter().rev().cloned().collect(),
        );
        assert!(reversed.decode(&encoded).is_err());
    }

    #[test]
    fn other_key_cannot_decode() {
        let encoded = TransformPipeline::standard(ring(1, 3)).encode(b"payload").unwrap();
        let stranger = TransformPipeline::standard(ring(1, 4));
        assert_eq!(
            stranger.decode(&encoded),
            Err(TransformError::IntegrityCheckFailed)
        );
    }

    #[test]
    fn empty_pipeline_is_identity() {
        let pipeline = TransformPipeline::new(PipelineVersion::V1, Vec::new());
        assert_eq!(pipeline.decode(&pipeline.encode(b"x").unwrap()).unwrap(), b"x");
    }
}
