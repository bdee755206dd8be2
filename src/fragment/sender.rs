use std::fmt;

use derive_more::{Display, From, Into};

/// Identity of a remote peer whose fragments are being reassembled.
///
/// Hosts typically map a session or player UUID onto the 128-bit value. The
/// distinguished local sender is represented by `None` wherever an
/// `Option<SenderId>` is accepted.
///
/// # Examples
///
/// ```
/// use packet_assembly::fragment::SenderId;
/// let id = SenderId::new(0x2a);
/// assert_eq!(id.get(), 0x2a);
/// assert_eq!(id.to_string(), "0000000000000000000000000000002a");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
#[display("{_0:032x}")]
pub struct SenderId(u128);

impl SenderId {
    /// Create a new identity.
    #[must_use]
    pub const fn new(value: u128) -> Self { Self(value) }

    /// Return the inner numeric identity.
    #[must_use]
    pub const fn get(self) -> u128 { self.0 }
}

/// Display adapter for an optional sender, rendering `None` as `local`.
#[derive(Clone, Copy, Debug)]
pub struct SenderLabel(pub Option<SenderId>);

impl fmt::Display for SenderLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, "{id}"),
            None => f.write_str("local"),
        }
    }
}

#[expect(clippy::ref_option, reason = "called from thiserror format arguments")]
pub(crate) fn sender_label(sender: &Option<SenderId>) -> SenderLabel { SenderLabel(*sender) }
