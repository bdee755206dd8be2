//! Whole-payload compression applied before fragmentation.
//!
//! Compression runs exactly once per logical payload: the [`Fragmenter`]
//! compresses the serialized bytes before slicing them, and the
//! [`Reassembler`] decompresses only after the final fragment has arrived.
//! Codecs never see individual fragments.
//!
//! [`Fragmenter`]: crate::fragment::Fragmenter
//! [`Reassembler`]: crate::fragment::Reassembler

use std::io::{self, Read, Write};

use flate2::{Compression as GzLevel, read::GzDecoder, write::GzEncoder};
use thiserror::Error;

/// Gzip level used when no explicit level is configured.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Error raised by a [`Compression`] implementation.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Compressing the serialized payload failed.
    #[error("{codec} compression failed: {source}")]
    Compress {
        codec: &'static str,
        #[source]
        source: io::Error,
    },
    /// Decompressing a reassembled payload failed.
    #[error("{codec} decompression failed: {source}")]
    Decompress {
        codec: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Pluggable whole-payload compression step.
///
/// Implementations must be deterministic for the framing of repeated splits
/// to be identical.
pub trait Compression: Send + Sync {
    /// Short codec name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Compress `input` into a fresh buffer.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Compress`] if the codec cannot encode `input`.
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Reverse [`Compression::compress`].
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decompress`] if `input` is not a valid stream
    /// for this codec.
    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// Gzip codec backed by `flate2`.
///
/// # Examples
///
/// ```
/// use packet_assembly::compression::{Compression, GzipCodec};
///
/// let codec = GzipCodec::default();
/// let packed = codec.compress(b"hello hello hello").expect("compress");
/// assert_eq!(codec.decompress(&packed).expect("decompress"), b"hello hello hello");
/// ```
#[derive(Clone, Copy, Debug)]
pub struct GzipCodec {
    level: GzLevel,
}

impl GzipCodec {
    /// Create a codec with an explicit level in `0..=9`.
    ///
    /// Levels outside that range fall back to [`DEFAULT_COMPRESSION_LEVEL`].
    #[must_use]
    pub fn new(level: u32) -> Self {
        let level = if level <= 9 {
            GzLevel::new(level)
        } else {
            GzLevel::new(DEFAULT_COMPRESSION_LEVEL)
        };
        Self { level }
    }

    /// Return the configured gzip level.
    #[must_use]
    pub fn level(&self) -> u32 { self.level.level() }
}

impl Default for GzipCodec {
    fn default() -> Self { Self::new(DEFAULT_COMPRESSION_LEVEL) }
}

impl Compression for GzipCodec {
    fn name(&self) -> &'static str { "gzip" }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        let wrap = |source| CodecError::Compress {
            codec: self.name(),
            source,
        };
        let mut encoder = GzEncoder::new(Vec::with_capacity(input.len() / 2), self.level);
        encoder.write_all(input).map_err(wrap)?;
        encoder.finish().map_err(wrap)
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut decoder = GzDecoder::new(input);
        let mut out = Vec::with_capacity(input.len().saturating_mul(2));
        decoder
            .read_to_end(&mut out)
            .map_err(|source| CodecError::Decompress {
                codec: self.name(),
                source,
            })?;
        Ok(out)
    }
}

/// Pass-through codec for pre-compressed payloads and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityCodec;

impl Compression for IdentityCodec {
    fn name(&self) -> &'static str { "identity" }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> { Ok(input.to_vec()) }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> { Ok(input.to_vec()) }
}

impl<C: Compression + ?Sized> Compression for Box<C> {
    fn name(&self) -> &'static str { (**self).name() }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> { (**self).compress(input) }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        (**self).decompress(input)
    }
}
