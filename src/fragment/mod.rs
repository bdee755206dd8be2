//! Fragmentation and per-sender reassembly of compressed payloads.
//!
//! This module collects the domain types used to move a payload larger than
//! the transport's message ceiling. Each sub-module focuses on a single
//! concept to keep the code small and easy to audit while still providing a
//! cohesive API at the crate root.

pub mod adapter;
pub mod config;
pub mod error;
pub mod fragmenter;
pub mod reassembler;
pub mod record;
pub mod sender;
pub mod store;
pub mod wire;

pub use adapter::{DefaultFragmentAdapter, FragmentAdapter, FragmentAdapterError};
pub use config::{
    DEFAULT_FRAGMENT_CAP,
    DEFAULT_MAX_MESSAGE_SIZE,
    FragmentationConfig,
    MAX_DECLARED_SIZE,
    OverrunPolicy,
};
pub use error::{DecodeFailure, FragmentationError, ReassemblyError, ReassemblyOutcome};
pub use fragmenter::{FragmentBatch, Fragmenter, SEQUENCE_MODULUS, SequenceId};
pub use reassembler::Reassembler;
pub use record::Fragment;
pub use sender::{SenderId, SenderLabel};
pub use store::{BufferStore, ReceiveBuffer};
pub use wire::{decode_fragment, encode_fragment, fragment_overhead};
