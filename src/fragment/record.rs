use bincode::{Decode, Encode};

/// One ordered slice of a compressed payload.
///
/// A fragment is self-describing: it carries the length of the whole
/// compressed payload and the offset at which its bytes belong, so a receiver
/// can size its buffer from whichever fragment arrives first.
///
/// Field order matches the wire layout: `size`, `index`, `end`, `data`.
///
/// # Examples
///
/// ```
/// use packet_assembly::fragment::Fragment;
/// let fragment = Fragment::new(10, 4, true, vec![1, 2, 3, 4, 5, 6]);
/// assert_eq!(fragment.total_size(), 10);
/// assert_eq!(fragment.offset(), 4);
/// assert!(fragment.is_final());
/// assert_eq!(fragment.end_offset(), 10);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Encode, Decode)]
pub struct Fragment {
    total_size: u32,
    offset: u32,
    is_final: bool,
    data: Vec<u8>,
}

impl Fragment {
    /// Create a new fragment.
    #[must_use]
    pub const fn new(total_size: u32, offset: u32, is_final: bool, data: Vec<u8>) -> Self {
        Self {
            total_size,
            offset,
            is_final,
            data,
        }
    }

    /// Length of the complete compressed payload.
    #[must_use]
    pub const fn total_size(&self) -> u32 { self.total_size }

    /// Byte offset of this fragment within the payload.
    #[must_use]
    pub const fn offset(&self) -> u32 { self.offset }

    /// Whether this is the last fragment of its transmission.
    #[must_use]
    pub const fn is_final(&self) -> bool { self.is_final }

    /// Borrow the fragment bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] { self.data.as_slice() }

    /// Offset one past the last byte this fragment claims, widened so it
    /// cannot overflow.
    #[must_use]
    pub fn end_offset(&self) -> u64 { u64::from(self.offset) + self.data.len() as u64 }

    /// Whether the fragment claims bytes beyond `total_size`.
    #[must_use]
    pub fn overruns(&self) -> bool { self.end_offset() > u64::from(self.total_size) }

    /// Consume the fragment, returning its bytes.
    #[must_use]
    pub fn into_data(self) -> Vec<u8> { self.data }
}
