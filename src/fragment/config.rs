//! Configuration used by fragmentation and reassembly.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use super::fragment_overhead;
use crate::compression::DEFAULT_COMPRESSION_LEVEL;

/// Transport-imposed ceiling on the data carried by one fragment.
pub const DEFAULT_FRAGMENT_CAP: NonZeroUsize = match NonZeroUsize::new(30_000) {
    Some(cap) => cap,
    None => unreachable!(),
};

/// Default cap on the declared size of an inbound payload, 16 MiB.
///
/// The receive buffer is allocated in full from the first fragment, so this
/// bounds what one unauthenticated fragment can make the receiver reserve.
pub const DEFAULT_MAX_MESSAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(16 * 1024 * 1024) {
    Some(limit) => limit,
    None => unreachable!(),
};

/// Largest total size a fragment can declare.
pub const MAX_DECLARED_SIZE: NonZeroUsize = match NonZeroUsize::new(u32::MAX as usize) {
    Some(limit) => limit,
    None => unreachable!(),
};

/// How the reassembler treats a fragment whose data would extend past the
/// declared total size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrunPolicy {
    /// Copy only the bytes that fit and carry on.
    #[default]
    Clamp,
    /// Drop the sender's buffer and report
    /// [`ReassemblyError::Overrun`](crate::fragment::ReassemblyError::Overrun).
    Reject,
}

/// Settings that bound fragment sizes and reassembly resource usage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentationConfig {
    /// Maximum number of compressed payload bytes carried by a single
    /// fragment. The wire encoding adds [`fragment_overhead`] on top.
    pub fragment_cap: NonZeroUsize,
    /// Largest declared `total_size` the reassembler will allocate a buffer
    /// for. Raise it towards [`MAX_DECLARED_SIZE`] to accept bigger payloads.
    pub max_message_size: NonZeroUsize,
    /// Handling of fragments that overrun their declared total size.
    pub overrun: OverrunPolicy,
    /// Gzip level applied to whole payloads.
    pub compression_level: u32,
}

/// Guard bytes reserved for transport framing beyond the encoded fragment.
const ENVELOPE_GUARD_BYTES: usize = 32;

impl Default for FragmentationConfig {
    fn default() -> Self {
        Self {
            fragment_cap: DEFAULT_FRAGMENT_CAP,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            overrun: OverrunPolicy::default(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl FragmentationConfig {
    /// Derive a configuration from the maximum transport message size.
    ///
    /// `frame_budget` should reflect the largest message the transport will
    /// accept. The returned configuration ensures an encoded fragment, plus a
    /// small guard for the transport's own framing, fits within that budget.
    ///
    /// Returns `None` when the budget cannot accommodate the fixed overhead.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::num::NonZeroUsize;
    ///
    /// use packet_assembly::fragment::FragmentationConfig;
    ///
    /// let limit = NonZeroUsize::new(1 << 20).expect("non-zero");
    /// let config = FragmentationConfig::for_frame_budget(32_767, limit).expect("budget fits");
    /// assert!(config.encoded_fragment_ceiling() <= 32_767);
    /// assert!(FragmentationConfig::for_frame_budget(16, limit).is_none());
    /// ```
    #[must_use]
    pub fn for_frame_budget(frame_budget: usize, max_message_size: NonZeroUsize) -> Option<Self> {
        let overhead = fragment_overhead().get();
        if frame_budget <= overhead {
            return None;
        }
        let available = frame_budget.saturating_sub(overhead + ENVELOPE_GUARD_BYTES);
        Some(Self {
            fragment_cap: NonZeroUsize::new(available)?,
            max_message_size: max_message_size.min(MAX_DECLARED_SIZE),
            ..Self::default()
        })
    }

    /// Replace the overrun policy.
    #[must_use]
    pub const fn with_overrun(mut self, overrun: OverrunPolicy) -> Self {
        self.overrun = overrun;
        self
    }

    /// Replace the inbound size limit, capped at [`MAX_DECLARED_SIZE`].
    #[must_use]
    pub fn with_max_message_size(mut self, max_message_size: NonZeroUsize) -> Self {
        self.max_message_size = max_message_size.min(MAX_DECLARED_SIZE);
        self
    }

    /// Replace the fragment cap.
    #[must_use]
    pub const fn with_fragment_cap(mut self, fragment_cap: NonZeroUsize) -> Self {
        self.fragment_cap = fragment_cap;
        self
    }

    /// Largest encoded fragment this configuration can produce.
    #[must_use]
    pub fn encoded_fragment_ceiling(&self) -> usize {
        self.fragment_cap.get() + fragment_overhead().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_transport_ceiling() {
        let config = FragmentationConfig::default();
        assert_eq!(config.fragment_cap.get(), 30_000);
        assert_eq!(config.overrun, OverrunPolicy::Clamp);
        assert_eq!(config.max_message_size.get(), 16 * 1024 * 1024);
    }

    #[test]
    fn frame_budget_leaves_room_for_overhead() {
        let limit = NonZeroUsize::new(4096).expect("non-zero");
        let config = FragmentationConfig::for_frame_budget(1024, limit).expect("budget fits");
        assert_eq!(
            config.fragment_cap.get(),
            1024 - fragment_overhead().get() - ENVELOPE_GUARD_BYTES
        );
        assert_eq!(config.max_message_size, limit);
    }

    #[test]
    fn larger_payloads_are_opt_in() {
        let config = FragmentationConfig::default().with_max_message_size(NonZeroUsize::MAX);
        assert_eq!(config.max_message_size, MAX_DECLARED_SIZE);
    }

    #[test]
    fn config_survives_serde_round_trip() {
        let config = FragmentationConfig::default()
            .with_overrun(OverrunPolicy::Reject)
            .with_fragment_cap(NonZeroUsize::new(512).expect("non-zero"));
        let bytes = bincode::serde::encode_to_vec(config, bincode::config::standard())
            .expect("encode config");
        let (decoded, _): (FragmentationConfig, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
                .expect("decode config");
        assert_eq!(decoded, config);
    }
}
