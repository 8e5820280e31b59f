//! Integration test: frame reassembly over an async pipe, consumed the same
//! way the decoder's stdout is.

use futures::StreamExt;
use rotorlink::video::FrameChunkExt;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

#[tokio::test]
async fn frames_reassemble_across_pipe_writes() {
    let (mut tx, rx) = tokio::io::duplex(64);

    let writer = tokio::spawn(async move {
        // 2.5 frames of 12 bytes, delivered in awkward 7-byte writes.
        let data: Vec<u8> = (0u8..30).collect();
        for piece in data.chunks(7) {
            tx.write_all(piece).await.unwrap();
            tx.flush().await.unwrap();
        }
        // Dropping the writer closes the pipe and ends the stream.
    });

    let items: Vec<_> = ReaderStream::new(rx).frames(12).collect().await;
    writer.await.unwrap();

    let frames: Vec<Vec<u8>> =
        items.into_iter().map(|frame| frame.expect("pipe read failed")).collect();
    let expected: Vec<u8> = (0u8..30).collect();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0], &expected[..12]);
    assert_eq!(frames[1], &expected[12..24]);
}

#[tokio::test]
async fn closing_the_pipe_ends_the_stream() {
    let (tx, rx) = tokio::io::duplex(64);
    drop(tx);

    let items: Vec<_> = ReaderStream::new(rx).frames(8).collect().await;
    assert!(items.is_empty());
}
