//! Outbound helper that splits payloads into transport fragments.
//!
//! [`Fragmenter`] serializes a [`Message`], compresses the whole serialized
//! stream once with its [`Compression`] codec, and slices the compressed bytes
//! into [`Fragment`]s of at most `fragment_cap` bytes. Every fragment carries
//! the total compressed length and its own offset, so the receiver needs no
//! other context to rebuild the stream.

use std::{
    num::NonZeroUsize,
    sync::atomic::{AtomicU8, Ordering},
};

use derive_more::Display;
use tracing::debug;

use super::{Fragment, FragmentationConfig, FragmentationError};
use crate::{
    compression::{Compression, GzipCodec},
    message::Message,
    metrics,
};

/// Number of distinct values the diagnostic sequence counter cycles through.
pub const SEQUENCE_MODULUS: u8 = 100;

/// Rotating diagnostic counter attached to each [`FragmentBatch`].
///
/// The value correlates log lines for one split. It carries no protocol
/// meaning and never appears on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display)]
#[display("{_0}")]
pub struct SequenceId(u8);

impl SequenceId {
    /// Return the numeric value in `0..SEQUENCE_MODULUS`.
    #[must_use]
    pub const fn get(self) -> u8 { self.0 }
}

/// Splits payloads into fragment-sized records.
#[derive(Debug)]
pub struct Fragmenter<C = GzipCodec> {
    fragment_cap: NonZeroUsize,
    codec: C,
    next_sequence: AtomicU8,
}

impl Fragmenter<GzipCodec> {
    /// Build a gzip fragmenter from `config`.
    #[must_use]
    pub fn from_config(config: &FragmentationConfig) -> Self {
        Self::new(
            config.fragment_cap,
            GzipCodec::new(config.compression_level),
        )
    }
}

impl<C: Compression> Fragmenter<C> {
    /// Create a fragmenter that caps fragment data at `fragment_cap` bytes.
    #[must_use]
    pub const fn new(fragment_cap: NonZeroUsize, codec: C) -> Self {
        Self {
            fragment_cap,
            codec,
            next_sequence: AtomicU8::new(0),
        }
    }

    /// Return the maximum fragment data size in bytes.
    #[must_use]
    pub const fn fragment_cap(&self) -> NonZeroUsize { self.fragment_cap }

    /// Borrow the compression codec.
    #[must_use]
    pub const fn codec(&self) -> &C { &self.codec }

    /// Sequence id the next successful split will carry.
    #[must_use]
    pub fn peek_sequence(&self) -> SequenceId {
        SequenceId(self.next_sequence.load(Ordering::Relaxed))
    }

    /// Serialize, compress and split `message`.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError::Encode`] if serialization fails,
    /// [`FragmentationError::Compress`] if the codec fails, or
    /// [`FragmentationError::PayloadTooLarge`] if the compressed stream does
    /// not fit the `u32` size field. No fragments are produced on error.
    pub fn split<M: Message>(&self, message: &M) -> Result<FragmentBatch, FragmentationError> {
        let serialized = message.to_bytes()?;
        self.split_serialized(&serialized)
    }

    /// Compress already-serialized bytes and split the result.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError::Compress`] if the codec fails, or
    /// [`FragmentationError::PayloadTooLarge`] if the compressed stream does
    /// not fit the `u32` size field.
    pub fn split_serialized(&self, serialized: &[u8]) -> Result<FragmentBatch, FragmentationError> {
        let compressed = self.codec.compress(serialized)?;
        self.split_compressed(&compressed)
    }

    /// Split an already-compressed stream without touching the codec.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError::PayloadTooLarge`] if `compressed` is
    /// longer than `u32::MAX` bytes.
    pub fn split_compressed(&self, compressed: &[u8]) -> Result<FragmentBatch, FragmentationError> {
        let fragments = build_fragments(self.fragment_cap, compressed)?;
        let sequence = self.advance_sequence();
        debug!(
            sequence = sequence.get(),
            fragments = fragments.len(),
            compressed_len = compressed.len(),
            codec = self.codec.name(),
            "split payload into fragments"
        );
        metrics::inc_fragments(metrics::Direction::Outbound, fragments.len());
        Ok(FragmentBatch::new(sequence, fragments))
    }

    fn advance_sequence(&self) -> SequenceId {
        let previous = self
            .next_sequence
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some((current + 1) % SEQUENCE_MODULUS)
            })
            .unwrap_or_else(|current| current);
        SequenceId(previous)
    }
}

fn build_fragments(
    fragment_cap: NonZeroUsize,
    compressed: &[u8],
) -> Result<Vec<Fragment>, FragmentationError> {
    let too_large = |_| FragmentationError::PayloadTooLarge {
        len: compressed.len(),
    };
    let total_size = u32::try_from(compressed.len()).map_err(too_large)?;
    if compressed.is_empty() {
        return Ok(vec![Fragment::new(0, 0, true, Vec::new())]);
    }

    let cap = fragment_cap.get();
    let count = compressed.len().div_ceil(cap);
    let mut fragments = Vec::with_capacity(count);
    for (position, chunk) in compressed.chunks(cap).enumerate() {
        let offset = u32::try_from(position * cap).map_err(too_large)?;
        fragments.push(Fragment::new(
            total_size,
            offset,
            position + 1 == count,
            chunk.to_vec(),
        ));
    }
    Ok(fragments)
}

/// Ordered fragments produced for a single payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentBatch {
    sequence: SequenceId,
    fragments: Vec<Fragment>,
}

impl FragmentBatch {
    fn new(sequence: SequenceId, fragments: Vec<Fragment>) -> Self {
        debug_assert!(!fragments.is_empty(), "fragment batches must not be empty");
        Self {
            sequence,
            fragments,
        }
    }

    /// Diagnostic sequence id of the split that produced this batch.
    #[must_use]
    pub const fn sequence(&self) -> SequenceId { self.sequence }

    /// Length of the compressed payload shared by all fragments.
    #[must_use]
    pub fn total_size(&self) -> u32 { self.fragments.first().map_or(0, Fragment::total_size) }

    /// Return the fragments in transmission order.
    #[must_use]
    pub fn fragments(&self) -> &[Fragment] { self.fragments.as_slice() }

    /// Number of fragments in the batch.
    #[expect(
        clippy::len_without_is_empty,
        reason = "batches are guaranteed non-empty"
    )]
    #[must_use]
    pub fn len(&self) -> usize { self.fragments.len() }

    /// Whether the payload required more than one fragment.
    #[must_use]
    pub fn is_fragmented(&self) -> bool { self.len() > 1 }

    /// Consume the batch, returning all fragments.
    #[must_use]
    pub fn into_fragments(self) -> Vec<Fragment> { self.fragments }
}

impl IntoIterator for FragmentBatch {
    type Item = Fragment;
    type IntoIter = std::vec::IntoIter<Fragment>;

    fn into_iter(self) -> Self::IntoIter { self.fragments.into_iter() }
}

impl<'a> IntoIterator for &'a FragmentBatch {
    type Item = &'a Fragment;
    type IntoIter = std::slice::Iter<'a, Fragment>;

    fn into_iter(self) -> Self::IntoIter { self.fragments.iter() }
}
