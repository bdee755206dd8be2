//! Self-describing nested key/value payload.
//!
//! [`Document`] is the default structured payload carried over the
//! fragmentation layer. Each value is a [`Tag`] that records its own kind, so
//! a receiver can walk a decoded document without knowing its schema.
//!
//! # Examples
//!
//! ```
//! use packet_assembly::document::{Document, Tag};
//!
//! let mut quest = Document::new();
//! quest.insert("id", Tag::Int(7));
//! quest.insert("name", Tag::String("Gather wood".into()));
//!
//! let mut root = Document::new();
//! root.insert("quest", Tag::Compound(quest));
//!
//! let nested = root.get_compound("quest").expect("compound present");
//! assert_eq!(nested.get_int("id"), Some(7));
//! assert_eq!(nested.get_string("name"), Some("Gather wood"));
//! ```

use std::collections::{BTreeMap, btree_map};

use bincode::{
    BorrowDecode,
    Decode,
    Encode,
    de::{BorrowDecoder, Decoder},
    error::{AllowedEnumVariants, DecodeError},
};
use serde::{Deserialize, Serialize};

/// Deepest nesting of lists and compounds accepted when decoding.
///
/// Deeper input is rejected with a [`DecodeError`] instead of exhausting the
/// stack.
pub const MAX_NESTING_DEPTH: usize = 512;

/// A single typed value inside a [`Document`].
///
/// Variant order is the encoded tag id and must not change.
#[derive(Clone, Debug, PartialEq, Encode, Serialize, Deserialize)]
pub enum Tag {
    /// Signed byte; also used for booleans.
    Byte(i8),
    /// 16-bit integer.
    Short(i16),
    /// 32-bit integer.
    Int(i32),
    /// 64-bit integer.
    Long(i64),
    /// Single-precision float.
    Float(f32),
    /// Double-precision float.
    Double(f64),
    /// Raw bytes.
    ByteArray(Vec<u8>),
    /// UTF-8 string.
    String(String),
    /// Ordered sequence of tags.
    List(Vec<Tag>),
    /// Nested document.
    Compound(Document),
    /// Packed 32-bit integers.
    IntArray(Vec<i32>),
    /// Packed 64-bit integers.
    LongArray(Vec<i64>),
}

impl Tag {
    /// Short name of the tag kind, used in diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Byte(_) => "byte",
            Self::Short(_) => "short",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::ByteArray(_) => "byte_array",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Compound(_) => "compound",
            Self::IntArray(_) => "int_array",
            Self::LongArray(_) => "long_array",
        }
    }
}

/// Ordered map of string keys to [`Tag`] values.
///
/// Keys are kept sorted so encoding the same document twice yields the same
/// bytes.
#[derive(Clone, Debug, Default, PartialEq, Encode, Serialize, Deserialize)]
pub struct Document(BTreeMap<String, Tag>);

impl Document {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Insert `value` under `key`, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: Tag) -> Option<Tag> {
        self.0.insert(key.into(), value)
    }

    /// Borrow the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Tag> { self.0.get(key) }

    /// Remove and return the value stored under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Tag> { self.0.remove(key) }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool { self.0.contains_key(key) }

    /// Number of top-level entries.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Whether the document has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Tag> { self.0.iter() }

    /// Return the `Int` stored under `key`.
    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.get(key)? {
            Tag::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Return the `Long` stored under `key`.
    #[must_use]
    pub fn get_long(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Tag::Long(value) => Some(*value),
            _ => None,
        }
    }

    /// Return the `Byte` stored under `key` as a flag.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Tag::Byte(value) => Some(*value != 0),
            _ => None,
        }
    }

    /// Borrow the `String` stored under `key`.
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            Tag::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Borrow the `ByteArray` stored under `key`.
    #[must_use]
    pub fn get_byte_array(&self, key: &str) -> Option<&[u8]> {
        match self.get(key)? {
            Tag::ByteArray(value) => Some(value.as_slice()),
            _ => None,
        }
    }

    /// Borrow the `List` stored under `key`.
    #[must_use]
    pub fn get_list(&self, key: &str) -> Option<&[Tag]> {
        match self.get(key)? {
            Tag::List(value) => Some(value.as_slice()),
            _ => None,
        }
    }

    /// Borrow the nested document stored under `key`.
    #[must_use]
    pub fn get_compound(&self, key: &str) -> Option<&Document> {
        match self.get(key)? {
            Tag::Compound(value) => Some(value),
            _ => None,
        }
    }
}

impl FromIterator<(String, Tag)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Tag)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Tag);
    type IntoIter = btree_map::Iter<'a, String, Tag>;

    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

// Decoding is written out by hand so nesting depth can be bounded. The layout
// matches the derived `Encode`: a `u32` variant id per tag and a `u64` length
// before every list, array and map.

impl<Context> Decode<Context> for Tag {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        decode_tag(decoder, 0)
    }
}

impl<'de, Context> BorrowDecode<'de, Context> for Tag {
    fn borrow_decode<D: BorrowDecoder<'de, Context = Context>>(
        decoder: &mut D,
    ) -> Result<Self, DecodeError> {
        decode_tag(decoder, 0)
    }
}

impl<Context> Decode<Context> for Document {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        decode_entries(decoder, 0)
    }
}

impl<'de, Context> BorrowDecode<'de, Context> for Document {
    fn borrow_decode<D: BorrowDecoder<'de, Context = Context>>(
        decoder: &mut D,
    ) -> Result<Self, DecodeError> {
        decode_entries(decoder, 0)
    }
}

fn read<T: Decode<D::Context>, D: Decoder>(decoder: &mut D) -> Result<T, DecodeError> {
    T::decode(decoder)
}

fn read_len<D: Decoder>(decoder: &mut D) -> Result<usize, DecodeError> {
    let len: u64 = read(decoder)?;
    usize::try_from(len).map_err(|_| DecodeError::OutsideUsizeRange(len))
}

fn descend(depth: usize) -> Result<usize, DecodeError> {
    let next = depth + 1;
    if next > MAX_NESTING_DEPTH {
        return Err(DecodeError::OtherString(format!(
            "document nesting exceeds {MAX_NESTING_DEPTH} levels"
        )));
    }
    Ok(next)
}

fn decode_entries<D: Decoder>(decoder: &mut D, depth: usize) -> Result<Document, DecodeError> {
    let len = read_len(decoder)?;
    let mut entries = BTreeMap::new();
    for _ in 0..len {
        let key: String = read(decoder)?;
        let value = decode_tag(decoder, depth)?;
        entries.insert(key, value);
    }
    Ok(Document(entries))
}

fn decode_tag<D: Decoder>(decoder: &mut D, depth: usize) -> Result<Tag, DecodeError> {
    let variant: u32 = read(decoder)?;
    let tag = match variant {
        0 => Tag::Byte(read(decoder)?),
        1 => Tag::Short(read(decoder)?),
        2 => Tag::Int(read(decoder)?),
        3 => Tag::Long(read(decoder)?),
        4 => Tag::Float(read(decoder)?),
        5 => Tag::Double(read(decoder)?),
        6 => Tag::ByteArray(read(decoder)?),
        7 => Tag::String(read(decoder)?),
        8 => {
            let depth = descend(depth)?;
            let len = read_len(decoder)?;
            // Length is untrusted; grow as elements actually decode.
            let mut items = Vec::new();
            for _ in 0..len {
                items.push(decode_tag(decoder, depth)?);
            }
            Tag::List(items)
        }
        9 => Tag::Compound(decode_entries(decoder, descend(depth)?)?),
        10 => Tag::IntArray(read(decoder)?),
        11 => Tag::LongArray(read(decoder)?),
        found => {
            return Err(DecodeError::UnexpectedVariant {
                type_name: "Tag",
                allowed: &AllowedEnumVariants::Range { min: 0, max: 11 },
                found,
            });
        }
    };
    Ok(tag)
}
