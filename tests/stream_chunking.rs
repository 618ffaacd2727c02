//! Chunk-boundary independence of the event-stream decoder

use futures::stream;
use proptest::prelude::*;
use proptest::sample::Index;
use tokio_util::sync::CancellationToken;
use wp_migrator::migration::consumer::COMPLETION_MESSAGE;
use wp_migrator::migration::{StreamFrame, StreamOutcome, StreamSession, consume};

fn body(payloads: &[String], with_done: bool) -> Vec<u8> {
    let mut body: String = payloads.iter().map(|p| format!("data: {}\n\n", p)).collect();
    if with_done {
        body.push_str("data: [DONE]\n\n");
    }
    body.into_bytes()
}

/// Split `bytes` at the given cut points (any byte offset, including inside
/// a multi-byte character or the blank-line delimiter)
fn split_at<'a>(bytes: &'a [u8], cuts: &[Index]) -> Vec<&'a [u8]> {
    let mut offsets: Vec<usize> = cuts.iter().map(|i| i.index(bytes.len() + 1)).collect();
    offsets.sort_unstable();
    offsets.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for end in offsets {
        chunks.push(&bytes[start..end]);
        start = end;
    }
    chunks.push(&bytes[start..]);
    chunks
}

fn decode(chunks: &[&[u8]]) -> Vec<StreamFrame> {
    let mut session = StreamSession::new();
    let mut frames = Vec::new();
    for chunk in chunks {
        frames.extend(session.feed(chunk));
    }
    frames.extend(session.finish());
    frames
}

fn payload() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 :\\[\\]éü€🦀]{0,24}".prop_filter("sentinel payload", |p| p != "[DONE]")
}

proptest! {
    #[test]
    fn chunking_never_changes_records(
        payloads in prop::collection::vec(payload(), 0..8),
        with_done in any::<bool>(),
        cuts in prop::collection::vec(any::<Index>(), 0..12),
    ) {
        let bytes = body(&payloads, with_done);
        let whole = decode(&[bytes.as_slice()]);
        let chunked = decode(&split_at(&bytes, &cuts));

        let mut expected: Vec<StreamFrame> =
            payloads.iter().cloned().map(StreamFrame::Record).collect();
        if with_done {
            expected.push(StreamFrame::Done);
        }

        prop_assert_eq!(&whole, &expected);
        prop_assert_eq!(&chunked, &expected);
    }

    #[test]
    fn byte_at_a_time_matches_whole(payloads in prop::collection::vec(payload(), 1..5)) {
        let bytes = body(&payloads, true);
        let singles: Vec<&[u8]> = bytes.chunks(1).collect();
        prop_assert_eq!(decode(&singles), decode(&[bytes.as_slice()]));
    }

    #[test]
    fn nothing_survives_the_sentinel(
        before in prop::collection::vec(payload(), 0..4),
        after in prop::collection::vec(payload(), 1..4),
        cuts in prop::collection::vec(any::<Index>(), 0..8),
    ) {
        let mut bytes = body(&before, true);
        bytes.extend(body(&after, false));

        let frames = decode(&split_at(&bytes, &cuts));
        prop_assert_eq!(frames.len(), before.len() + 1);
        prop_assert_eq!(frames.last(), Some(&StreamFrame::Done));
    }
}

#[tokio::test]
async fn consumer_output_is_chunking_independent() {
    let bytes = body(
        &[
            "Logging in to WordPress…".to_string(),
            "[ERROR] Plugin export timed out".to_string(),
            "Creating site 🦀".to_string(),
        ],
        true,
    );

    let single: Vec<wp_migrator::error::Result<Vec<u8>>> = vec![Ok(bytes.clone())];
    let mut whole: Vec<String> = Vec::new();
    let outcome = consume(
        stream::iter(single),
        &mut whole,
        &CancellationToken::new(),
    )
    .await;
    assert_eq!(outcome, StreamOutcome::Completed);

    let pieces: Vec<wp_migrator::error::Result<Vec<u8>>> =
        bytes.chunks(3).map(|c| Ok(c.to_vec())).collect();
    let mut chunked: Vec<String> = Vec::new();
    consume(stream::iter(pieces), &mut chunked, &CancellationToken::new()).await;

    assert_eq!(whole, chunked);
    assert_eq!(whole.last().map(String::as_str), Some(COMPLETION_MESSAGE));
    assert_eq!(whole.len(), 4);
}
