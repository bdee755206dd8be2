#![doc(html_root_url = "https://docs.rs/packet_assembly/latest")]
//! Public API for the `packet_assembly` library.
//!
//! This crate moves payloads larger than a transport's message ceiling. A
//! [`Fragmenter`] serializes and compresses a payload once, then slices the
//! compressed stream into self-describing [`Fragment`]s. A [`Reassembler`]
//! rebuilds the stream per sender identity and hands back the decoded
//! payload once the final fragment arrives.

pub mod compression;
pub mod document;
pub mod fragment;
pub mod message;
pub mod metrics;

pub use compression::{CodecError, Compression, GzipCodec, IdentityCodec};
pub use document::{Document, MAX_NESTING_DEPTH, Tag};
pub use fragment::{
    BufferStore,
    DEFAULT_FRAGMENT_CAP,
    DEFAULT_MAX_MESSAGE_SIZE,
    DecodeFailure,
    DefaultFragmentAdapter,
    Fragment,
    FragmentAdapter,
    FragmentAdapterError,
    FragmentBatch,
    FragmentationConfig,
    FragmentationError,
    Fragmenter,
    OverrunPolicy,
    Reassembler,
    ReassemblyError,
    ReassemblyOutcome,
    ReceiveBuffer,
    SenderId,
    decode_fragment,
    encode_fragment,
    fragment_overhead,
};
pub use message::Message;
