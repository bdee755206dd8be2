//! Inbound helper that stitches fragments back into complete payloads.
//!
//! [`Reassembler`] mirrors the outbound [`Fragmenter`](crate::fragment::Fragmenter).
//! It tracks one in-flight transmission per sender identity in a
//! [`BufferStore`], writes each fragment at its declared offset, and on the
//! final fragment decompresses and deserializes the completed buffer. The
//! buffer leaves the store before decoding starts, so slow decodes never hold
//! a lock another sender could need.
//!
//! The reassembler trusts the transport to deliver each sender's fragments in
//! the order they were produced. Reordered fragments are written where their
//! offsets point and are not detected.
//!
//! There is no timeout: a sender that never finishes keeps its buffer until
//! [`Reassembler::forget`] is called, typically when the peer disconnects.

use std::num::NonZeroUsize;

use tracing::{debug, error, warn};

use super::{
    BufferStore,
    DecodeFailure,
    Fragment,
    FragmentationConfig,
    OverrunPolicy,
    ReassemblyError,
    ReassemblyOutcome,
    SenderId,
    SenderLabel,
    store::{WriteRules, WriteStatus},
};
use crate::{
    compression::{Compression, GzipCodec},
    message::Message,
    metrics,
};

/// Stateful per-sender fragment reassembler.
///
/// All methods take `&self`; share it between receiving threads behind an
/// `Arc` or a scoped borrow.
#[derive(Debug)]
pub struct Reassembler<C = GzipCodec> {
    store: BufferStore,
    codec: C,
    rules: WriteRules,
}

impl Reassembler<GzipCodec> {
    /// Build a gzip reassembler from `config`.
    #[must_use]
    pub fn from_config(config: &FragmentationConfig) -> Self {
        Self::with_config(config, GzipCodec::new(config.compression_level))
    }
}

impl<C: Compression> Reassembler<C> {
    /// Create a reassembler with default limits and lenient overrun handling.
    #[must_use]
    pub fn new(codec: C) -> Self { Self::with_config(&FragmentationConfig::default(), codec) }

    /// Create a reassembler using the limits and overrun policy in `config`.
    #[must_use]
    pub fn with_config(config: &FragmentationConfig, codec: C) -> Self {
        Self {
            store: BufferStore::new(),
            codec,
            rules: WriteRules {
                overrun: config.overrun,
                max_message_size: config.max_message_size,
            },
        }
    }

    /// Active overrun policy.
    #[must_use]
    pub const fn overrun_policy(&self) -> OverrunPolicy { self.rules.overrun }

    /// Largest declared payload size that will be buffered.
    #[must_use]
    pub const fn max_message_size(&self) -> NonZeroUsize { self.rules.max_message_size }

    /// Borrow the underlying buffer store.
    #[must_use]
    pub const fn store(&self) -> &BufferStore { &self.store }

    /// Feed one fragment from `sender` and decode the payload once complete.
    ///
    /// `sender` is `None` for the local sender.
    ///
    /// # Examples
    ///
    /// ```
    /// use packet_assembly::{
    ///     compression::GzipCodec,
    ///     document::{Document, Tag},
    ///     fragment::{Fragmenter, Reassembler, ReassemblyOutcome, SenderId},
    /// };
    /// use std::num::NonZeroUsize;
    ///
    /// let mut doc = Document::new();
    /// doc.insert("quest", Tag::String("Gather wood".into()));
    ///
    /// let fragmenter = Fragmenter::new(NonZeroUsize::new(8).unwrap(), GzipCodec::default());
    /// let reassembler = Reassembler::new(GzipCodec::default());
    /// let sender = Some(SenderId::new(7));
    ///
    /// let mut outcome = ReassemblyOutcome::Incomplete;
    /// for fragment in fragmenter.split(&doc).unwrap() {
    ///     outcome = reassembler.accept::<Document>(sender, fragment).unwrap();
    /// }
    /// assert_eq!(outcome, ReassemblyOutcome::Complete(doc));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::SizeMismatch`] when `fragment` declares a
    /// different total size than the sender's open buffer,
    /// [`ReassemblyError::Overrun`] when overruns are rejected and the
    /// fragment claims bytes past its total size,
    /// [`ReassemblyError::MessageTooLarge`] when a new buffer would exceed the
    /// configured limit, and [`ReassemblyError::DecodeFailure`] when the
    /// completed buffer cannot be decompressed or deserialized. In every case
    /// the sender's buffer is gone and the sender must restart.
    pub fn accept<M: Message>(
        &self,
        sender: Option<SenderId>,
        fragment: Fragment,
    ) -> Result<ReassemblyOutcome<M>, ReassemblyError> {
        match self.accept_serialized(sender, fragment)? {
            ReassemblyOutcome::Incomplete => Ok(ReassemblyOutcome::Incomplete),
            ReassemblyOutcome::Complete(bytes) => match M::from_bytes(&bytes) {
                Ok((message, _)) => Ok(ReassemblyOutcome::Complete(message)),
                Err(err) => Err(self.report(ReassemblyError::DecodeFailure {
                    sender,
                    source: DecodeFailure::Deserialize(err),
                })),
            },
        }
    }

    /// Feed one fragment and return the decompressed, still serialized,
    /// payload once complete.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Reassembler::accept`], except that
    /// deserialization failures cannot occur.
    pub fn accept_serialized(
        &self,
        sender: Option<SenderId>,
        fragment: Fragment,
    ) -> Result<ReassemblyOutcome<Vec<u8>>, ReassemblyError> {
        metrics::inc_fragments(metrics::Direction::Inbound, 1);
        let status = self
            .store
            .write(sender, &fragment, self.rules)
            .map_err(|err| self.report(err))?;

        match status {
            WriteStatus::Buffered { opened } => {
                if opened {
                    debug!(
                        sender = %SenderLabel(sender),
                        total_size = fragment.total_size(),
                        "opened receive buffer"
                    );
                }
                Ok(ReassemblyOutcome::Incomplete)
            }
            WriteStatus::Completed(buffer) => {
                let compressed = buffer.into_bytes();
                let serialized = self.codec.decompress(&compressed).map_err(|err| {
                    self.report(ReassemblyError::DecodeFailure {
                        sender,
                        source: DecodeFailure::Decompress(err),
                    })
                })?;
                debug!(
                    sender = %SenderLabel(sender),
                    compressed_len = compressed.len(),
                    serialized_len = serialized.len(),
                    "reassembled payload"
                );
                Ok(ReassemblyOutcome::Complete(serialized))
            }
        }
    }

    /// Drop any partial transmission from `sender`.
    ///
    /// Call this when a peer disconnects. Returns whether a buffer existed.
    pub fn forget(&self, sender: Option<SenderId>) -> bool {
        let removed = self.store.remove(sender);
        if let Some(buffer) = &removed {
            debug!(
                sender = %SenderLabel(sender),
                expected_size = buffer.expected_size(),
                "evicted partial transmission"
            );
        }
        removed.is_some()
    }

    /// Drop every partial transmission, returning how many were discarded.
    pub fn forget_all(&self) -> usize {
        let dropped = self.store.clear();
        if dropped > 0 {
            debug!(dropped, "evicted all partial transmissions");
        }
        dropped
    }

    /// Whether `sender` has a transmission in flight.
    #[must_use]
    pub fn is_receiving(&self, sender: Option<SenderId>) -> bool { self.store.contains(sender) }

    /// Number of transmissions currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize { self.store.len() }

    fn report(&self, err: ReassemblyError) -> ReassemblyError {
        let sender = SenderLabel(err.sender());
        match &err {
            ReassemblyError::DecodeFailure { .. } => {
                error!(%sender, codec = self.codec.name(), error = %err, "failed to decode reassembled payload");
            }
            ReassemblyError::SizeMismatch {
                expected, found, ..
            } => {
                warn!(%sender, kind = err.kind(), expected, found, "dropped partial transmission");
            }
            _ => warn!(%sender, kind = err.kind(), error = %err, "dropped partial transmission"),
        }
        metrics::inc_errors(err.kind());
        err
    }
}
