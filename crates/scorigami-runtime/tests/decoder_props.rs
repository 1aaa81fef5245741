//! Property tests for the stream decoder: chunk boundaries never change
//! what is decoded.

use proptest::prelude::*;
use scorigami_runtime::prelude::*;

fn dataset(n: u32) -> GraphDataset {
    let mut nodes = vec![Node::root()];
    let mut edges = Vec::new();
    for id in 1..=n {
        let depth = 1 + id % 4;
        nodes.push(Node {
            id,
            slug: format!("{}-{} ½é", 6, id % 7),
            depth,
            played: id % 5 != 0,
            occurrences: u64::from(id * 3 % 11),
            norm: f64::from(id) / f64::from(n.max(1)),
        });
        edges.push(Edge::new(if depth == 1 { 0 } else { id - 1 }, id));
    }
    GraphDataset::new(nodes, edges)
}

fn stream_bytes(n: u32, node_batch: usize, edge_batch: usize) -> Vec<u8> {
    FrameEncoder::new(EncoderConfig {
        node_batch,
        edge_batch,
        batch_delay_ms: 0,
    })
    .encode_to_vec(&dataset(n))
    .unwrap()
}

fn decode_whole(bytes: &[u8]) -> FrameDecoder {
    let mut d = FrameDecoder::new();
    d.feed(bytes);
    d.finish();
    d
}

proptest! {
    #[test]
    fn arbitrary_splits_decode_identically(
        n in 0u32..60,
        node_batch in 1usize..20,
        edge_batch in 1usize..20,
        cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..24),
    ) {
        let bytes = stream_bytes(n, node_batch, edge_batch);
        let whole = decode_whole(&bytes);

        let mut points: Vec<usize> = cuts.iter().map(|c| c.index(bytes.len() + 1)).collect();
        points.sort_unstable();
        points.dedup();

        let mut split = FrameDecoder::new();
        let mut start = 0;
        for p in points {
            split.feed(&bytes[start..p]);
            start = p;
        }
        split.feed(&bytes[start..]);
        split.finish();

        prop_assert_eq!(split.nodes(), whole.nodes());
        prop_assert_eq!(split.edges(), whole.edges());
        prop_assert_eq!(split.progress(), whole.progress());
        prop_assert_eq!(split.parse_errors(), 0);
        prop_assert!(split.progress().complete);
        prop_assert_eq!(split.nodes().len(), n as usize + 1);
    }

    #[test]
    fn one_byte_at_a_time_matches(n in 0u32..25) {
        let bytes = stream_bytes(n, 3, 4);
        let whole = decode_whole(&bytes);
        let mut trickle = FrameDecoder::new();
        for b in &bytes {
            trickle.feed(std::slice::from_ref(b));
        }
        trickle.finish();
        prop_assert_eq!(trickle.nodes(), whole.nodes());
        prop_assert_eq!(trickle.edges(), whole.edges());
    }
}
