//! Tests for Display implementations on error types.

use std::{io, num::NonZeroUsize};

use packet_assembly::{CodecError, DecodeFailure, FragmentationError, ReassemblyError, SenderId};

#[test]
fn reassembly_error_messages_name_the_sender() {
    let mismatch = ReassemblyError::SizeMismatch {
        sender: Some(SenderId::new(0xff)),
        expected: 100,
        found: 200,
    };
    assert_eq!(
        mismatch.to_string(),
        "fragment size changed for sender 000000000000000000000000000000ff: buffer holds 100 \
         bytes, fragment declares 200"
    );

    let too_large = ReassemblyError::MessageTooLarge {
        sender: None,
        attempted: 4_096,
        limit: NonZeroUsize::new(1_024).expect("non-zero"),
    };
    assert_eq!(
        too_large.to_string(),
        "sender local declared 4096 bytes, above the 1024 byte limit"
    );
}

#[test]
fn decode_failure_keeps_codec_context() {
    let err = ReassemblyError::DecodeFailure {
        sender: None,
        source: DecodeFailure::Decompress(CodecError::Decompress {
            codec: "gzip",
            source: io::Error::new(io::ErrorKind::InvalidData, "bad header"),
        }),
    };
    assert!(err.is_decode_failure());
    assert_eq!(err.kind(), "decode_failure");
    assert_eq!(
        err.to_string(),
        "failed to decode payload from sender local: decompression failed: gzip decompression \
         failed: bad header"
    );
}

#[test]
fn fragmentation_error_messages() {
    let err = FragmentationError::PayloadTooLarge { len: 5 };
    assert_eq!(err.to_string(), "compressed payload of 5 bytes exceeds u32::MAX");
}
