//! Transport-facing contract for fragmentation and reassembly.
//!
//! [`FragmentAdapter`] captures the minimal behaviour a transport needs: turn
//! an outbound payload into wire-encoded fragments, feed inbound wire bytes
//! for a sender, and evict a sender's partial state when it goes away.

use bincode::error::{DecodeError, EncodeError};
use thiserror::Error;

use super::{
    FragmentationConfig,
    FragmentationError,
    Fragmenter,
    Reassembler,
    ReassemblyError,
    ReassemblyOutcome,
    SenderId,
    decode_fragment,
    encode_fragment,
};
use crate::{
    compression::{Compression, GzipCodec},
    message::Message,
};

/// Error returned by [`FragmentAdapter::reassemble`].
#[derive(Debug, Error)]
pub enum FragmentAdapterError {
    /// The wire bytes did not hold a valid fragment record.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    /// The fragment violated the reassembly protocol or failed to decode.
    #[error("reassembly error: {0}")]
    Reassembly(#[from] ReassemblyError),
}

/// Adapter contract for transport-level fragmentation and reassembly.
pub trait FragmentAdapter<M: Message>: Send + Sync {
    /// Split `message` into wire-encoded fragments in transmission order.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError`] when serialization, compression or
    /// record encoding fails. No frames are returned on error.
    fn fragment(&self, message: &M) -> Result<Vec<Vec<u8>>, FragmentationError>;

    /// Feed one wire-encoded fragment from `sender`.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentAdapterError`] when the frame is malformed or the
    /// reassembler rejects it.
    fn reassemble(
        &self,
        sender: Option<SenderId>,
        frame: &[u8],
    ) -> Result<ReassemblyOutcome<M>, FragmentAdapterError>;

    /// Drop partial state for `sender`, returning whether any existed.
    fn forget(&self, sender: Option<SenderId>) -> bool;
}

/// Default adapter backed by a [`Fragmenter`] and a [`Reassembler`] that
/// share one codec type.
#[derive(Debug)]
pub struct DefaultFragmentAdapter<C = GzipCodec> {
    fragmenter: Fragmenter<C>,
    reassembler: Reassembler<C>,
}

impl DefaultFragmentAdapter<GzipCodec> {
    /// Create a gzip adapter from `config`.
    #[must_use]
    pub fn new(config: &FragmentationConfig) -> Self {
        Self {
            fragmenter: Fragmenter::from_config(config),
            reassembler: Reassembler::from_config(config),
        }
    }
}

impl<C: Compression + Clone> DefaultFragmentAdapter<C> {
    /// Create an adapter using `codec` in both directions.
    #[must_use]
    pub fn with_codec(config: &FragmentationConfig, codec: C) -> Self {
        Self {
            fragmenter: Fragmenter::new(config.fragment_cap, codec.clone()),
            reassembler: Reassembler::with_config(config, codec),
        }
    }
}

impl<C: Compression> DefaultFragmentAdapter<C> {
    /// Borrow the outbound half.
    #[must_use]
    pub const fn fragmenter(&self) -> &Fragmenter<C> { &self.fragmenter }

    /// Borrow the inbound half.
    #[must_use]
    pub const fn reassembler(&self) -> &Reassembler<C> { &self.reassembler }

    fn fragment_inner<M: Message>(&self, message: &M) -> Result<Vec<Vec<u8>>, FragmentationError> {
        let batch = self.fragmenter.split(message)?;
        batch
            .fragments()
            .iter()
            .map(encode_fragment)
            .collect::<Result<Vec<_>, EncodeError>>()
            .map_err(FragmentationError::from)
    }

    fn reassemble_inner<M: Message>(
        &self,
        sender: Option<SenderId>,
        frame: &[u8],
    ) -> Result<ReassemblyOutcome<M>, FragmentAdapterError> {
        let fragment = decode_fragment(frame)?;
        Ok(self.reassembler.accept(sender, fragment)?)
    }
}

impl<M: Message, C: Compression> FragmentAdapter<M> for DefaultFragmentAdapter<C> {
    fn fragment(&self, message: &M) -> Result<Vec<Vec<u8>>, FragmentationError> {
        self.fragment_inner(message)
    }

    fn reassemble(
        &self,
        sender: Option<SenderId>,
        frame: &[u8],
    ) -> Result<ReassemblyOutcome<M>, FragmentAdapterError> {
        self.reassemble_inner(sender, frame)
    }

    fn forget(&self, sender: Option<SenderId>) -> bool { self.reassembler.forget(sender) }
}
