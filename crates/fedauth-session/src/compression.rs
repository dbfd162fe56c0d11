//! Raw DEFLATE stage.
//!
//! Decoding is strict: the stream must reach its final block, nothing may
//! follow it, and the inflated size is capped so a small cookie cannot
//! expand into an arbitrarily large allocation.

use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};

use crate::error::{TransformError, TransformResult};

/// Default cap on decompressed output (1 MiB).
pub const DEFAULT_MAX_DECODED_LEN: usize = 1024 * 1024;

/// Compresses on encode and inflates on decode.
#[derive(Debug, Clone)]
pub struct DeflateStage {
    level: Compression,
    max_decoded_len: usize,
}

impl DeflateStage {
    /// Creates a stage with the default level and output cap.
    #[must_use]
    pub fn new() -> Self {
        Self {
            level: Compression::default(),
            max_decoded_len: DEFAULT_MAX_DECODED_LEN,
        }
    }

    /// Overrides the decompressed size cap.
    #[must_use]
    pub fn with_max_decoded_len(mut self, limit: usize) -> Self {
        self.max_decoded_len = limit;
        self
    }

    /// Compresses `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder fails.
    pub fn encode(&self, data: &[u8]) -> TransformResult<Vec<u8>> {
        let mut encoder = DeflateEncoder::new(Vec::new(), self.level);
        encoder
            .write_all(data)
            .map_err(|e| TransformError::EncodeFailed(format!("compression error: {e}")))?;
        encoder
            .finish()
            .map_err(|e| TransformError::EncodeFailed(format!("compression finish error: {e}")))
    }

    /// Inflates `data`.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Truncated`] if the stream ends early,
    /// [`TransformError::TrailingData`] if bytes follow it,
    /// [`TransformError::TooLarge`] if it inflates past the cap and
    /// [`TransformError::Corrupt`] for anything else.
    pub fn decode(&self, data: &[u8]) -> TransformResult<Vec<u8>> {
        let limit = self.max_decoded_len;
        let mut inflater = Decompress::new(false);
        let mut out = Vec::with_capacity(data.len().saturating_mul(4).clamp(64, limit.max(64)));

        loop {
            let consumed = offset(inflater.total_in());
            let produced = inflater.total_out();
            let input = data.get(consumed..).unwrap_or_default();

            let status = inflater
                .decompress_vec(input, &mut out, FlushDecompress::None)
                .map_err(|e| TransformError::Corrupt(e.to_string()))?;

            if out.len() > limit {
                return Err(TransformError::TooLarge { limit });
            }

            match status {
                Status::StreamEnd => break,
                Status::Ok | Status::BufError => {
                    if out.len() == out.capacity() {
                        if out.len() >= limit {
                            return Err(TransformError::TooLarge { limit });
                        }
                        let grow = out.capacity().min(limit - out.len()).max(64);
                        out.reserve(grow);
                    } else if offset(inflater.total_in()) == consumed
                        && inflater.total_out() == produced
                    {
                        return Err(TransformError::Truncated);
                    }
                }
            }
        }

        if offset(inflater.total_in()) != data.len() {
            return Err(TransformError::TrailingData);
        }
        Ok(out)
    }
}

impl Default for DeflateStage {
    fn default() -> Self {
        Self::new()
    }
}

fn offset(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}
