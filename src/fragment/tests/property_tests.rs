//! Generated checks for framing invariants and round trips.

use std::num::NonZeroUsize;

use proptest::{collection::vec, prelude::*};

use crate::{
    compression::{GzipCodec, IdentityCodec},
    fragment::{Fragmenter, Reassembler, ReassemblyOutcome, SenderId},
};

fn cap_strategy() -> impl Strategy<Value = NonZeroUsize> {
    (1_usize..512).prop_map(|cap| NonZeroUsize::new(cap).expect("strategy yields non-zero caps"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn fragments_tile_the_compressed_stream(
        payload in vec(any::<u8>(), 0..4096),
        cap in cap_strategy(),
    ) {
        let fragmenter = Fragmenter::new(cap, IdentityCodec);
        let batch = fragmenter.split_compressed(&payload).expect("split payload");
        let total = u32::try_from(payload.len()).expect("payload fits u32");

        let mut expected_offset = 0_u32;
        let mut rebuilt = Vec::with_capacity(payload.len());
        for fragment in batch.fragments() {
            prop_assert_eq!(fragment.total_size(), total);
            prop_assert_eq!(fragment.offset(), expected_offset);
            prop_assert!(fragment.data().len() <= cap.get());
            rebuilt.extend_from_slice(fragment.data());
            expected_offset += u32::try_from(fragment.data().len()).expect("fragment fits u32");
        }
        prop_assert_eq!(rebuilt, payload);
    }

    #[test]
    fn exactly_one_final_fragment_and_it_is_last(
        payload in vec(any::<u8>(), 0..4096),
        cap in cap_strategy(),
    ) {
        let fragmenter = Fragmenter::new(cap, IdentityCodec);
        let batch = fragmenter.split_compressed(&payload).expect("split payload");

        let finals: Vec<usize> = batch
            .fragments()
            .iter()
            .enumerate()
            .filter(|(_, fragment)| fragment.is_final())
            .map(|(position, _)| position)
            .collect();
        prop_assert_eq!(finals, vec![batch.len() - 1]);
        prop_assert_eq!(batch.len(), payload.len().div_ceil(cap.get()).max(1));
    }

    #[test]
    fn gzip_round_trip_yields_original_payload(
        payload in vec(any::<u8>(), 0..8192),
        cap in cap_strategy(),
        sender in any::<Option<u128>>(),
    ) {
        let fragmenter = Fragmenter::new(cap, GzipCodec::default());
        let reassembler = Reassembler::new(GzipCodec::default());
        let sender = sender.map(SenderId::new);

        let mut outcome = ReassemblyOutcome::Incomplete;
        for fragment in fragmenter.split(&payload).expect("split payload") {
            prop_assert_eq!(&outcome, &ReassemblyOutcome::Incomplete);
            outcome = reassembler
                .accept::<Vec<u8>>(sender, fragment)
                .expect("fragment accepted");
        }
        prop_assert_eq!(outcome, ReassemblyOutcome::Complete(payload));
        prop_assert_eq!(reassembler.in_flight(), 0);
    }
}
