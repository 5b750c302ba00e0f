//! Property-based tests for frame reassembly
//!
//! Any partition of a stream into non-empty chunks must yield the same frames
//! as feeding the whole stream at once.

use floodboard::frame::{split_all, Frame, FrameReassembler, StreamEvent};
use proptest::prelude::*;

prop_compose! {
    /// A payload without line breaks, sometimes non-ASCII
    fn arb_message()(msg in "[a-zA-Z0-9 .:%é→-]{0,24}") -> String {
        msg
    }
}

prop_compose! {
    /// A stream of log frames, a malformed frame or two and a trailing sentinel
    fn arb_stream()(
        messages in prop::collection::vec(arb_message(), 0..12),
        malformed in prop::collection::vec(any::<bool>(), 12),
        crlf in any::<bool>(),
    ) -> (Vec<u8>, Vec<String>) {
        let delimiter = if crlf { "\r\n\r\n" } else { "\n\n" };
        let mut stream = String::new();
        for (i, msg) in messages.iter().enumerate() {
            if malformed[i] {
                stream.push_str(&format!(": comment {i}{delimiter}"));
            }
            stream.push_str(&format!("data: {msg}{delimiter}"));
        }
        stream.push_str(&format!("data: SIMULATION_COMPLETE{delimiter}"));
        (stream.into_bytes(), messages)
    }
}

/// Feed `stream` cut at `cuts` (sorted, deduplicated byte offsets)
fn feed_partitioned(stream: &[u8], cuts: &[usize]) -> Vec<Frame> {
    let mut reassembler = FrameReassembler::new();
    let mut frames = Vec::new();
    let mut start = 0;
    for &cut in cuts.iter().chain(std::iter::once(&stream.len())) {
        if cut > start {
            frames.extend(reassembler.push(&stream[start..cut]));
            start = cut;
        }
    }
    frames.extend(reassembler.finish());
    frames
}

proptest! {
    #[test]
    fn test_frames_independent_of_chunking(
        (stream, _) in arb_stream(),
        raw_cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..20),
    ) {
        let mut cuts: Vec<usize> = raw_cuts.iter().map(|i| i.index(stream.len() + 1)).collect();
        cuts.sort_unstable();
        cuts.dedup();

        prop_assert_eq!(feed_partitioned(&stream, &cuts), split_all(&stream));
    }

    #[test]
    fn test_byte_by_byte_preserves_order((stream, messages) in arb_stream()) {
        let cuts: Vec<usize> = (1..stream.len()).collect();
        let events: Vec<StreamEvent> = feed_partitioned(&stream, &cuts)
            .iter()
            .filter_map(|f| f.classify().unwrap())
            .collect();

        let mut expected: Vec<StreamEvent> =
            messages.into_iter().map(StreamEvent::Log).collect();
        expected.push(StreamEvent::Complete);
        prop_assert_eq!(events, expected);
    }

    #[test]
    fn test_reassembler_never_panics(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..16), 0..16),
    ) {
        let mut reassembler = FrameReassembler::new();
        for chunk in &chunks {
            for frame in reassembler.push(chunk) {
                let _ = frame.classify();
            }
        }
        let _ = reassembler.finish();
    }
}
