//! Byte-exact transport encoding for [`Fragment`] records.
//!
//! Each fragment travels as a single transport message laid out as:
//! `[u32 size][u32 index][u8 end][u64 data_len][data]`, all integers
//! big-endian and fixed width. The layout is produced by bincode with a
//! fixed-int, big-endian configuration so the framing stays stable across
//! platforms.

use std::num::NonZeroUsize;

use bincode::{
    config::{self, BigEndian, Configuration, Fixint},
    decode_from_slice,
    encode_to_vec,
    error::{DecodeError, EncodeError},
};

use super::Fragment;

type WireConfig = Configuration<BigEndian, Fixint>;

const fn wire_config() -> WireConfig {
    config::standard()
        .with_big_endian()
        .with_fixed_int_encoding()
}

/// Fixed bytes a wire fragment adds on top of its data.
///
/// # Panics
///
/// Panics if encoding an empty [`Fragment`] fails, which would indicate a
/// programmer error in the wire configuration.
#[must_use]
pub fn fragment_overhead() -> NonZeroUsize {
    let empty = Fragment::new(0, 0, false, Vec::new());
    let encoded = encode_to_vec(&empty, wire_config()).unwrap_or_else(|err| {
        panic!("empty fragment encoding must be infallible: {err}")
    });
    NonZeroUsize::new(encoded.len()).unwrap_or_else(|| {
        panic!("fragment overhead must be non-zero");
    })
}

/// Encode a fragment for transport.
///
/// # Errors
///
/// Returns an [`EncodeError`] if bincode rejects the record.
pub fn encode_fragment(fragment: &Fragment) -> Result<Vec<u8>, EncodeError> {
    encode_to_vec(fragment, wire_config())
}

/// Decode a fragment received from the transport.
///
/// The whole input must be consumed; trailing bytes indicate a framing error
/// on the transport and are rejected.
///
/// # Errors
///
/// Returns a [`DecodeError`] when the bytes are truncated, carry an invalid
/// `end` marker, or contain trailing data.
pub fn decode_fragment(bytes: &[u8]) -> Result<Fragment, DecodeError> {
    let (fragment, consumed) = decode_from_slice::<Fragment, _>(bytes, wire_config())?;
    if consumed != bytes.len() {
        return Err(DecodeError::OtherString(format!(
            "fragment length mismatch: consumed {consumed} of {} bytes",
            bytes.len()
        )));
    }
    Ok(fragment)
}
