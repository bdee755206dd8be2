//! Serializer collaborator for structured payloads.
//!
//! Any type deriving bincode's [`Encode`] and [`Decode`](bincode::Decode)
//! (which also provides [`BorrowDecode`]) automatically implements
//! [`Message`] and can be split by a [`Fragmenter`](crate::fragment::Fragmenter).

use bincode::error::{DecodeError, EncodeError};
use bincode::{BorrowDecode, Encode, borrow_decode_from_slice, config, encode_to_vec};

/// Structured payload that can cross the fragmentation layer.
///
/// The default methods use bincode's standard configuration. Types that
/// encode to zero bytes, such as `()` or a unit struct, are valid payloads
/// and produce an empty serialized stream.
///
/// `from_bytes` runs on bytes supplied by remote senders, so a payload type
/// must fail with a [`DecodeError`] on hostile input rather than recurse
/// without bound. Recursive types need a hand-written decoder that tracks
/// depth, as [`Document`](crate::document::Document) does with
/// [`MAX_NESTING_DEPTH`](crate::document::MAX_NESTING_DEPTH).
pub trait Message: Encode + for<'de> BorrowDecode<'de, ()> {
    /// Serialize the payload into a byte vector.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodeError`] if serialization fails.
    fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> { encode_to_vec(self, config::standard()) }

    /// Deserialize a payload from `bytes`, returning it with the number of
    /// bytes consumed. Trailing bytes are left to the caller.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if deserialization fails.
    fn from_bytes(bytes: &[u8]) -> Result<(Self, usize), DecodeError>
    where
        Self: Sized,
    {
        borrow_decode_from_slice(bytes, config::standard())
    }
}

impl<T> Message for T where for<'de> T: Encode + BorrowDecode<'de, ()> {}

#[cfg(test)]
mod tests {
    use bincode::{Decode, Encode, error::DecodeError};

    use super::Message;
    use crate::document::Document;

    #[derive(Debug, PartialEq, Encode, Decode)]
    struct Marker;

    #[derive(Debug, PartialEq, Encode, Decode)]
    struct Quest {
        id: u32,
        title: String,
    }

    #[test]
    fn unit_payloads_encode_to_nothing() {
        assert!(Marker.to_bytes().expect("encode").is_empty());
        let (decoded, consumed) = Marker::from_bytes(&[]).expect("decode");
        assert_eq!(decoded, Marker);
        assert_eq!(consumed, 0);
    }

    #[test]
    fn from_bytes_reports_consumed_length() {
        let quest = Quest {
            id: 3,
            title: "gather wood".to_owned(),
        };
        let mut bytes = quest.to_bytes().expect("encode");
        let encoded_len = bytes.len();
        bytes.extend_from_slice(&[0xff, 0xff]);

        let (decoded, consumed) = Quest::from_bytes(&bytes).expect("decode");
        assert_eq!(decoded, quest);
        assert_eq!(consumed, encoded_len);
    }

    #[test]
    fn hostile_nesting_fails_without_exhausting_the_stack() {
        let mut bytes = vec![1, 1, b'k'];
        bytes.extend(std::iter::repeat_n([9_u8, 1, 1, b'k'], 100_000).flatten());
        let err = Document::from_bytes(&bytes).expect_err("nesting is bounded");
        assert!(matches!(err, DecodeError::OtherString(_)));
    }
}
