#![cfg(feature = "metrics")]
//! Tests for `packet_assembly` metrics helpers.
//!
//! These tests verify that counters and gauges update as expected using
//! `metrics_util::debugging::DebuggingRecorder`.
use std::{num::NonZeroUsize, thread};

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use packet_assembly::{
    Fragment,
    FragmentationConfig,
    Fragmenter,
    IdentityCodec,
    OverrunPolicy,
    Reassembler,
    SenderId,
    metrics::{self as pa_metrics, Direction},
};
use rstest::rstest;

/// Creates a debugging recorder and snapshotter for metrics testing.
fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

fn counter_with_label(snapshotter: &Snapshotter, name: &str, label: (&str, &str)) -> Option<u64> {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .find_map(|(key, _, _, value)| {
            let matches = key.key().name() == name
                && key
                    .key()
                    .labels()
                    .any(|l| l.key() == label.0 && l.value() == label.1);
            match value {
                DebugValue::Counter(c) if matches => Some(c),
                _ => None,
            }
        })
}

#[rstest]
#[case(Direction::Outbound, "outbound")]
#[case(Direction::Inbound, "inbound")]
fn fragment_metric_increments(#[case] direction: Direction, #[case] label: &str) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || pa_metrics::inc_fragments(direction, 3));

    assert_eq!(
        counter_with_label(&snapshotter, pa_metrics::FRAGMENTS_TOTAL, ("direction", label)),
        Some(3)
    );
}

#[test]
fn split_and_accept_record_both_directions() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let cap = NonZeroUsize::new(4).expect("non-zero");
    let fragmenter = Fragmenter::new(cap, IdentityCodec);
    let reassembler = Reassembler::new(IdentityCodec);

    metrics::with_local_recorder(&recorder, || {
        let batch = fragmenter
            .split_serialized(&[7u8; 10])
            .expect("identity split cannot fail");
        for fragment in batch {
            reassembler
                .accept_serialized(None, fragment)
                .expect("in-order fragments reassemble");
        }
    });

    assert_eq!(
        counter_with_label(&snapshotter, pa_metrics::FRAGMENTS_TOTAL, ("direction", "outbound")),
        Some(3)
    );
    assert_eq!(
        counter_with_label(&snapshotter, pa_metrics::FRAGMENTS_TOTAL, ("direction", "inbound")),
        Some(3)
    );
}

#[test]
fn rejected_overrun_counts_error_kind() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let config = FragmentationConfig::default().with_overrun(OverrunPolicy::Reject);
    let reassembler = Reassembler::with_config(&config, IdentityCodec);
    let sender = Some(SenderId::new(9));

    metrics::with_local_recorder(&recorder, || {
        let err = reassembler
            .accept_serialized(sender, Fragment::new(4, 2, false, vec![0; 5]))
            .expect_err("overrun must be rejected");
        assert_eq!(err.kind(), "overrun");
    });

    assert_eq!(
        counter_with_label(&snapshotter, pa_metrics::ERRORS_TOTAL, ("kind", "overrun")),
        Some(1)
    );
}

fn open_buffers(snapshotter: &Snapshotter) -> Option<f64> {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .find_map(|(key, _, _, value)| match value {
            DebugValue::Gauge(g) if key.key().name() == pa_metrics::BUFFERS_OPEN => {
                Some(g.into_inner())
            }
            _ => None,
        })
}

#[test]
fn open_buffer_gauge_tracks_store() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let reassembler = Reassembler::new(IdentityCodec);

    metrics::with_local_recorder(&recorder, || {
        reassembler
            .accept_serialized(None, Fragment::new(8, 0, false, vec![1; 4]))
            .expect("first fragment buffers");
    });

    assert_eq!(open_buffers(&snapshotter), Some(1.0));
}

#[test]
fn open_buffer_gauge_returns_to_zero_across_threads() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let cap = NonZeroUsize::new(16).expect("non-zero");
    let fragmenter = Fragmenter::new(cap, IdentityCodec);
    let reassembler = Reassembler::new(IdentityCodec);

    thread::scope(|scope| {
        for id in 0..8u128 {
            let (recorder, fragmenter, reassembler) = (&recorder, &fragmenter, &reassembler);
            scope.spawn(move || {
                metrics::with_local_recorder(recorder, || {
                    let sender = Some(SenderId::new(id));
                    for round in 0..20u8 {
                        let batch = fragmenter
                            .split_serialized(&[round; 70])
                            .expect("identity split cannot fail");
                        for fragment in batch {
                            reassembler
                                .accept_serialized(sender, fragment)
                                .expect("in-order fragments reassemble");
                        }
                    }
                });
            });
        }
    });

    assert_eq!(reassembler.in_flight(), 0);
    assert_eq!(open_buffers(&snapshotter), Some(0.0));
}

#[test]
fn open_buffer_gauge_follows_every_removal() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let config = FragmentationConfig::default().with_overrun(OverrunPolicy::Reject);
    let reassembler = Reassembler::with_config(&config, IdentityCodec);
    let open = |id: u128| {
        reassembler
            .accept_serialized(Some(SenderId::new(id)), Fragment::new(8, 0, false, vec![0; 4]))
            .expect("open buffer");
    };

    metrics::with_local_recorder(&recorder, || {
        (0..5).for_each(open);
        reassembler
            .accept_serialized(Some(SenderId::new(0)), Fragment::new(9, 4, false, vec![0; 4]))
            .expect_err("size mismatch");
        reassembler
            .accept_serialized(Some(SenderId::new(1)), Fragment::new(8, 4, true, vec![0; 5]))
            .expect_err("overrun");
        assert!(reassembler.forget(Some(SenderId::new(2))));
    });
    assert_eq!(open_buffers(&snapshotter), Some(2.0));

    metrics::with_local_recorder(&recorder, || assert_eq!(reassembler.forget_all(), 2));
    assert_eq!(open_buffers(&snapshotter), Some(0.0));
}
