//! Error types emitted by the fragmentation layer.
//!
//! Every protocol failure is returned as a value. None of these errors leave
//! partial state behind: a failed split produces no fragments, and a failed
//! reassembly has already discarded the sender's buffer by the time the
//! caller sees it.

use std::num::NonZeroUsize;

use bincode::error::{DecodeError, EncodeError};
use thiserror::Error;

use super::{SenderId, sender::sender_label};
use crate::compression::CodecError;

/// Result of feeding a fragment into a [`Reassembler`](crate::fragment::Reassembler).
#[derive(Debug, PartialEq)]
pub enum ReassemblyOutcome<M> {
    /// The fragment was buffered; more fragments are expected.
    Incomplete,
    /// The fragment completed the transmission.
    Complete(M),
}

impl<M> ReassemblyOutcome<M> {
    /// Whether the transmission finished.
    #[must_use]
    pub const fn is_complete(&self) -> bool { matches!(self, Self::Complete(_)) }

    /// Return the completed payload, if any.
    #[must_use]
    pub fn into_complete(self) -> Option<M> {
        match self {
            Self::Complete(message) => Some(message),
            Self::Incomplete => None,
        }
    }
}

/// Errors produced while splitting an outbound payload.
///
/// Every variant belongs to the encode-failure class: the caller should abort
/// the send and may retry with a fresh attempt.
#[derive(Debug, Error)]
pub enum FragmentationError {
    /// Serialization failed before compression.
    #[error("failed to encode payload: {0}")]
    Encode(#[from] EncodeError),
    /// The codec failed to compress the serialized payload.
    #[error("failed to compress payload: {0}")]
    Compress(#[from] CodecError),
    /// The compressed payload cannot be described by a `u32` size field.
    #[error("compressed payload of {len} bytes exceeds u32::MAX")]
    PayloadTooLarge { len: usize },
}

/// Why a completed buffer could not be turned back into a payload.
#[derive(Debug, Error)]
pub enum DecodeFailure {
    #[error("decompression failed: {0}")]
    Decompress(#[source] CodecError),
    #[error("deserialization failed: {0}")]
    Deserialize(#[source] DecodeError),
}

/// Errors produced while reassembling inbound fragments.
///
/// Each variant is terminal for the affected transmission; the sender must
/// restart from the first fragment.
#[derive(Debug, Error)]
pub enum ReassemblyError {
    /// A fragment declared a different total size than the open buffer.
    #[error(
        "fragment size changed for sender {}: buffer holds {expected} bytes, fragment declares \
         {found}",
        sender_label(.sender)
    )]
    SizeMismatch {
        sender: Option<SenderId>,
        expected: u32,
        found: u32,
    },
    /// A fragment would write past the declared total size while overruns
    /// are rejected.
    #[error(
        "fragment for sender {} overruns payload: offset {offset} + {len} bytes > {total_size}",
        sender_label(.sender)
    )]
    Overrun {
        sender: Option<SenderId>,
        offset: u32,
        len: usize,
        total_size: u32,
    },
    /// The declared total size exceeds the configured cap.
    #[error(
        "sender {} declared {attempted} bytes, above the {limit} byte limit",
        sender_label(.sender)
    )]
    MessageTooLarge {
        sender: Option<SenderId>,
        attempted: usize,
        limit: NonZeroUsize,
    },
    /// The completed buffer failed to decompress or deserialize.
    #[error("failed to decode payload from sender {}: {source}", sender_label(.sender))]
    DecodeFailure {
        sender: Option<SenderId>,
        #[source]
        source: DecodeFailure,
    },
}

impl ReassemblyError {
    /// Identity of the sender whose transmission failed.
    #[must_use]
    pub const fn sender(&self) -> Option<SenderId> {
        match self {
            Self::SizeMismatch { sender, .. }
            | Self::Overrun { sender, .. }
            | Self::MessageTooLarge { sender, .. }
            | Self::DecodeFailure { sender, .. } => *sender,
        }
    }

    /// Whether the completed buffer failed to decode, as opposed to a framing
    /// violation detected before completion.
    #[must_use]
    pub const fn is_decode_failure(&self) -> bool { matches!(self, Self::DecodeFailure { .. }) }

    /// Stable label used for diagnostics and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SizeMismatch { .. } => "size_mismatch",
            Self::Overrun { .. } => "overrun",
            Self::MessageTooLarge { .. } => "message_too_large",
            Self::DecodeFailure { .. } => "decode_failure",
        }
    }
}
