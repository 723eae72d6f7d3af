//! Property-based tests for the frame codec.
//!
//! These tests use proptest to verify:
//! - Codec roundtrip for arbitrary frames
//! - Codec never panics on arbitrary input
//! - Arbitrary split points never lose or duplicate frames

#![cfg(test)]

use bytes::BytesMut;
use proptest::prelude::*;

use crate::protocol::{
    Codec, FileChunkPayload, FileOfferPayload, FileRejectPayload, Frame, TextPayload,
};

// =============================================================================
// Arbitrary Generators
// =============================================================================

prop_compose! {
    fn arb_text()(
        sender in ".{0,32}",
        content in ".{0,512}",
        timestamp in any::<u64>(),
    ) -> TextPayload {
        TextPayload { sender, content, timestamp }
    }
}

prop_compose! {
    fn arb_offer()(
        filename in ".{0,64}",
        total_size in any::<u64>(),
        sender in ".{0,32}",
    ) -> FileOfferPayload {
        FileOfferPayload { filename, total_size, sender }
    }
}

prop_compose! {
    fn arb_chunk()(data in prop::collection::vec(any::<u8>(), 0..2048)) -> FileChunkPayload {
        FileChunkPayload { data }
    }
}

fn arb_frame() -> impl Strategy<Value = Frame> {
    prop_oneof![
        arb_text().prop_map(Frame::Text),
        arb_offer().prop_map(Frame::FileOffer),
        Just(Frame::FileAccept),
        proptest::option::of(".{0,64}")
            .prop_map(|reason| Frame::FileReject(FileRejectPayload { reason })),
        arb_chunk().prop_map(Frame::FileChunk),
        Just(Frame::FileEnd),
        Just(Frame::Disconnect),
    ]
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn roundtrip_arbitrary_frame(frame in arb_frame()) {
        let codec = Codec::default();
        let encoded = codec.encode(&frame).unwrap();
        let decoded = codec.decode_slice(&encoded).unwrap().unwrap();
        prop_assert_eq!(frame, decoded);
    }

    #[test]
    fn decode_never_panics(data in prop::collection::vec(any::<u8>(), 0..4096)) {
        let codec = Codec::default();
        let mut buf = BytesMut::from(&data[..]);
        let _ = codec.decode(&mut buf);
    }

    #[test]
    fn split_delivery_preserves_sequence(
        frames in prop::collection::vec(arb_frame(), 1..8),
        split in 1usize..64,
    ) {
        let codec = Codec::default();
        let mut wire = BytesMut::new();
        for frame in &frames {
            codec.encode_into(frame, &mut wire).unwrap();
        }

        let mut buf = BytesMut::new();
        let mut decoded = Vec::new();
        for piece in wire.chunks(split) {
            buf.extend_from_slice(piece);
            while let Some(frame) = codec.decode(&mut buf).unwrap() {
                decoded.push(frame);
            }
        }

        prop_assert!(buf.is_empty());
        prop_assert_eq!(frames, decoded);
    }

    #[test]
    fn prefix_of_a_frame_needs_more_data(frame in arb_frame(), cut in 0usize..1024) {
        let codec = Codec::default();
        let encoded = codec.encode(&frame).unwrap();
        let cut = cut % encoded.len();
        let mut buf = BytesMut::from(&encoded[..cut]);
        prop_assert!(codec.decode(&mut buf).unwrap().is_none());
        prop_assert_eq!(buf.len(), cut);
    }
}
