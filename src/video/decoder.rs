//! External decoder process management.
//!
//! The drone's elementary stream is decoded by an external `ffmpeg` process:
//! raw H.264 in on stdin, raw RGB24 out on stdout. Only that byte-in /
//! byte-out / terminate contract is modeled here; the codec itself is
//! ffmpeg's problem.

use std::process::Stdio;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use super::chunker::FrameChunkExt;
use super::{DecodedFrame, VideoPacket};
use crate::error::{LinkError, Result};

/// Read size for the decoder's stdout pipe.
const STDOUT_CHUNK_CAPACITY: usize = 64 * 1024;

/// Bridges drone video packets to an external H.264 decoder process and
/// reassembles its output into fixed-size RGB24 frames.
///
/// Feed every packet from [`Drone::read_video`](crate::Drone::read_video)
/// into [`feed`](Self::feed) and consume decoded images from
/// [`frames`](Self::frames). The two sides are independent and may run on
/// separate tasks.
pub struct VideoDecoder {
    child: Child,
    stdin: ChildStdin,
    // Taken by the first call to frames().
    stdout: Option<ChildStdout>,
    width: u32,
    height: u32,
}

impl VideoDecoder {
    /// Spawn `ffmpeg` decoding raw H.264 at 30 fps into packed RGB24.
    ///
    /// Fails with [`LinkError::Decoder`] if the process cannot be started
    /// or its pipes are unavailable.
    pub fn spawn(width: u32, height: u32) -> Result<Self> {
        let mut child = Command::new("ffmpeg")
            .args([
                "-f", "h264", "-framerate", "30", "-probesize", "32", "-i", "-",
                "-f", "rawvideo", "-pix_fmt", "rgb24", "-",
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LinkError::decoder("failed to spawn ffmpeg", Some(e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| LinkError::decoder("decoder stdin unavailable", None))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LinkError::decoder("decoder stdout unavailable", None))?;

        info!(width, height, "video decoder started");
        Ok(Self { child, stdin, stdout: Some(stdout), width, height })
    }

    /// Spawn a decoder for the drone's native 960x720 stream.
    pub fn spawn_native() -> Result<Self> {
        Self::spawn(super::VIDEO_WIDTH, super::VIDEO_HEIGHT)
    }

    /// Write one video packet's elementary-stream bytes to the decoder.
    ///
    /// The 2-byte protocol header is stripped and the pipe is flushed after
    /// every write; the decoder needs low-latency delivery, so writes are
    /// never batched.
    pub async fn feed(&mut self, packet: &VideoPacket) -> Result<()> {
        let stream = packet.elementary_stream();
        if stream.is_empty() {
            return Ok(());
        }
        self.stdin
            .write_all(stream)
            .await
            .map_err(|e| LinkError::decoder("write to decoder stdin", Some(e)))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| LinkError::decoder("flush decoder stdin", Some(e)))?;
        Ok(())
    }

    /// Decoded frames as a lazy, unbounded stream.
    ///
    /// The stream ends when the decoder closes its stdout; if the pipe fails
    /// mid-stream the final item is a [`LinkError::Decoder`] naming the
    /// cause. Can only be taken once.
    pub fn frames(&mut self) -> Result<BoxStream<'static, Result<DecodedFrame>>> {
        let stdout = self
            .stdout
            .take()
            .ok_or_else(|| LinkError::decoder("decoded frame stream already taken", None))?;

        let frame_len = (self.width * self.height * 3) as usize;
        let (width, height) = (self.width, self.height);
        debug!(frame_len, "starting decoded frame stream");

        let frames = ReaderStream::with_capacity(stdout, STDOUT_CHUNK_CAPACITY)
            .frames(frame_len)
            .map(move |item| match item {
                Ok(data) => Ok(DecodedFrame { width, height, data }),
                Err(e) => Err(LinkError::decoder("decoder output stream failed", Some(e))),
            })
            .boxed();
        Ok(frames)
    }

    /// Terminate the decoder process.
    ///
    /// Teardown failures are logged, never propagated; the process is also
    /// killed on drop as a backstop.
    pub async fn kill(&mut self) {
        // Closing stdin first lets ffmpeg drain and exit on its own.
        if let Err(e) = self.stdin.shutdown().await {
            debug!("closing decoder stdin failed: {e}");
        }
        if let Err(e) = self.child.kill().await {
            warn!("failed to kill video decoder: {e}");
        } else {
            info!("video decoder terminated");
        }
    }
}
