//! Video ingestion: raw packets, the external decoder, frame reassembly.

mod chunker;
mod decoder;

pub use chunker::{FrameChunkExt, FrameChunker};
pub use decoder::VideoDecoder;

/// Native width of the drone's video stream, in pixels.
pub const VIDEO_WIDTH: u32 = 960;
/// Native height of the drone's video stream, in pixels.
pub const VIDEO_HEIGHT: u32 = 720;

/// Length of the vendor header prefixed to every video datagram.
const PACKET_HEADER_LEN: usize = 2;

/// One raw video datagram from the drone.
///
/// The payload carries a 2-byte protocol header followed by H.264
/// elementary-stream bytes; [`elementary_stream`](Self::elementary_stream)
/// strips the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoPacket {
    payload: Vec<u8>,
}

impl VideoPacket {
    pub(crate) fn new(payload: Vec<u8>) -> Self {
        Self { payload }
    }

    /// The full datagram payload, header included.
    pub fn raw(&self) -> &[u8] {
        &self.payload
    }

    /// The H.264 elementary-stream bytes, with the protocol header stripped.
    pub fn elementary_stream(&self) -> &[u8] {
        self.payload.get(PACKET_HEADER_LEN..).unwrap_or(&[])
    }
}

/// One decoded RGB24 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Packed RGB24 pixel data, `width * height * 3` bytes.
    pub data: Vec<u8>,
}
