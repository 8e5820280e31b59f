//! Fixed-size frame reassembly over a chunked byte stream.
//!
//! The external decoder writes decoded pixels to its stdout in whatever
//! chunk sizes the pipe hands us. [`FrameChunker`] regroups that stream into
//! frames of exactly `frame_len` bytes, independent of where the chunk
//! boundaries fall.

use bytes::Bytes;
use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::trace;

/// Extension trait to regroup a chunked byte stream into fixed-size frames.
pub trait FrameChunkExt: Stream<Item = io::Result<Bytes>> {
    /// Reassemble this chunk stream into frames of exactly `frame_len` bytes.
    ///
    /// A chunk may complete one frame and begin the next; every chunk is
    /// consumed fully. Trailing bytes that never fill a frame are dropped
    /// when the inner stream ends.
    fn frames(self, frame_len: usize) -> FrameChunker<Self>
    where
        Self: Sized,
    {
        FrameChunker::new(self, frame_len)
    }
}

impl<S: Stream<Item = io::Result<Bytes>>> FrameChunkExt for S {}

pin_project! {
    /// A stream combinator that regroups byte chunks into fixed-size frames.
    pub struct FrameChunker<S> {
        #[pin]
        stream: S,
        // Reusable fill buffer; its length is the current fill offset.
        buf: Vec<u8>,
        frame_len: usize,
        // Unconsumed remainder of the current chunk.
        pending: Option<Bytes>,
        done: bool,
    }
}

impl<S> FrameChunker<S> {
    /// Create a new frame chunker. `frame_len` must be non-zero.
    pub fn new(stream: S, frame_len: usize) -> Self {
        assert!(frame_len > 0, "frame length must be non-zero");
        Self { stream, buf: Vec::with_capacity(frame_len), frame_len, pending: None, done: false }
    }
}

impl<S: Stream<Item = io::Result<Bytes>>> Stream for FrameChunker<S> {
    type Item = io::Result<Vec<u8>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if *this.done {
                return Poll::Ready(None);
            }

            // Drain the pending chunk before touching the inner stream.
            if let Some(chunk) = this.pending.as_mut() {
                let take = (*this.frame_len - this.buf.len()).min(chunk.len());
                this.buf.extend_from_slice(&chunk.split_to(take));
                if chunk.is_empty() {
                    *this.pending = None;
                }
                if this.buf.len() == *this.frame_len {
                    // Emit an independent copy; the fill buffer is reused.
                    let frame = this.buf.clone();
                    this.buf.clear();
                    return Poll::Ready(Some(Ok(frame)));
                }
                continue;
            }

            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => {
                    if !chunk.is_empty() {
                        *this.pending = Some(chunk);
                    }
                }
                Some(Err(e)) => {
                    *this.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                None => {
                    *this.done = true;
                    if !this.buf.is_empty() {
                        trace!(buffered = this.buf.len(), "discarding trailing partial frame");
                    }
                    return Poll::Ready(None);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use futures::executor::block_on;
    use futures::stream;
    use proptest::prelude::*;

    fn collect_frames(chunks: Vec<Bytes>, frame_len: usize) -> Vec<Vec<u8>> {
        let stream = stream::iter(chunks.into_iter().map(io::Result::Ok));
        block_on(stream.frames(frame_len).collect::<Vec<_>>())
            .into_iter()
            .map(|frame| frame.expect("chunker returned an error"))
            .collect()
    }

    #[test]
    fn chunk_spanning_a_frame_boundary() {
        // 15 bytes complete one 10-byte frame and seed the next; 5 more
        // bytes finish it.
        let data: Vec<u8> = (0u8..20).collect();
        let frames = collect_frames(
            vec![Bytes::copy_from_slice(&data[..15]), Bytes::copy_from_slice(&data[15..])],
            10,
        );
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], &data[..10]);
        assert_eq!(frames[1], &data[10..20]);
    }

    #[test]
    fn one_chunk_spanning_multiple_frames() {
        let data: Vec<u8> = (0u8..25).collect();
        let frames = collect_frames(vec![Bytes::copy_from_slice(&data)], 10);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], &data[..10]);
        assert_eq!(frames[1], &data[10..20]);
        // The trailing 5 bytes never fill a frame and are discarded.
    }

    #[test]
    fn byte_at_a_time_delivery() {
        let data: Vec<u8> = (0u8..6).collect();
        let chunks = data.iter().map(|b| Bytes::copy_from_slice(&[*b])).collect();
        let frames = collect_frames(chunks, 3);
        assert_eq!(frames, vec![vec![0, 1, 2], vec![3, 4, 5]]);
    }

    #[test]
    fn empty_chunks_are_ignored() {
        let frames = collect_frames(
            vec![Bytes::new(), Bytes::from_static(b"abcd"), Bytes::new()],
            4,
        );
        assert_eq!(frames, vec![b"abcd".to_vec()]);
    }

    #[test]
    fn read_error_ends_the_stream() {
        let chunks: Vec<io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"abc")),
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "decoder died")),
        ];
        let items = block_on(stream::iter(chunks).frames(10).collect::<Vec<_>>());
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }

    #[test]
    #[should_panic(expected = "frame length must be non-zero")]
    fn zero_frame_length_is_rejected() {
        let _ = stream::iter(Vec::<io::Result<Bytes>>::new()).frames(0);
    }

    fn data_and_cuts() -> impl Strategy<Value = (usize, Vec<u8>, Vec<usize>)> {
        (1usize..32, 1usize..5).prop_flat_map(|(frame_len, frame_count)| {
            let total = frame_len * frame_count;
            (
                Just(frame_len),
                prop::collection::vec(any::<u8>(), total),
                prop::collection::vec(0..=total, 0..8),
            )
        })
    }

    proptest! {
        // For any re-chunking of a byte sequence whose length is a multiple
        // of the frame size, the emitted frames equal the contiguous slices
        // of the concatenated input.
        #[test]
        fn chunk_boundary_independence((frame_len, data, mut cuts) in data_and_cuts()) {
            cuts.sort_unstable();
            cuts.dedup();

            let mut chunks = Vec::new();
            let mut start = 0;
            for cut in cuts {
                chunks.push(Bytes::copy_from_slice(&data[start..cut]));
                start = cut;
            }
            chunks.push(Bytes::copy_from_slice(&data[start..]));

            let frames = collect_frames(chunks, frame_len);
            prop_assert_eq!(frames.len(), data.len() / frame_len);
            for (i, frame) in frames.iter().enumerate() {
                prop_assert_eq!(&frame[..], &data[i * frame_len..(i + 1) * frame_len]);
            }
        }
    }
}
