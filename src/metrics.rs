//! Metric helpers for `packet_assembly`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to nothing.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the counter tracking fragments produced or consumed.
pub const FRAGMENTS_TOTAL: &str = "packet_assembly_fragments_total";
/// Name of the counter tracking dropped transmissions, labelled by `kind`.
pub const ERRORS_TOTAL: &str = "packet_assembly_errors_total";
/// Name of the gauge tracking open receive buffers.
pub const BUFFERS_OPEN: &str = "packet_assembly_buffers_open";

/// Direction of fragment processing.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    /// Fragments accepted by a reassembler.
    Inbound,
    /// Fragments produced by a fragmenter.
    Outbound,
}

impl Direction {
    #[cfg_attr(not(feature = "metrics"), expect(dead_code, reason = "used by metrics only"))]
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Record `count` fragments for the given direction.
#[cfg_attr(not(feature = "metrics"), expect(unused_variables, reason = "no-op without metrics"))]
pub fn inc_fragments(direction: Direction, count: usize) {
    #[cfg(feature = "metrics")]
    counter!(FRAGMENTS_TOTAL, "direction" => direction.as_str())
        .increment(u64::try_from(count).unwrap_or(u64::MAX));
}

/// Record a dropped transmission of the given kind.
#[cfg_attr(not(feature = "metrics"), expect(unused_variables, reason = "no-op without metrics"))]
pub fn inc_errors(kind: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL, "kind" => kind).increment(1);
}

/// Record a newly opened receive buffer.
pub fn inc_open_buffers() {
    #[cfg(feature = "metrics")]
    gauge!(BUFFERS_OPEN).increment(1.0);
}

/// Record `count` receive buffers leaving the store.
#[cfg_attr(not(feature = "metrics"), expect(unused_variables, reason = "no-op without metrics"))]
pub fn dec_open_buffers(count: usize) {
    #[cfg(feature = "metrics")]
    gauge!(BUFFERS_OPEN).decrement(f64::from(u32::try_from(count).unwrap_or(u32::MAX)));
}
