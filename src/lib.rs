//! Modern, type-safe Rust client for quadcopter UDP command, telemetry and
//! video links.
//!
//! Rotorlink speaks the small vendor text protocol used by Tello-class
//! quadcopters: commands with correlated `ok`/`error` acknowledgements,
//! continuous telemetry datagrams, and a raw H.264 video stream decoded by
//! an external `ffmpeg` process into fixed-size RGB24 frames.
//!
//! # Features
//!
//! - **Command session**: one-in-flight request/response over UDP with
//!   timeout and failure classification
//! - **Telemetry**: structured [`FlightState`] snapshots with the firmware's
//!   documented defaults
//! - **Video**: raw packet ingestion plus a decoder pipeline that emits
//!   complete 960x720 RGB24 frames as an async stream
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use rotorlink::{DEFAULT_COMMAND_TIMEOUT, Drone, VideoDecoder};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> rotorlink::Result<()> {
//!     let drone = Drone::connect().await?;
//!     drone.enable(DEFAULT_COMMAND_TIMEOUT).await?;
//!     drone.take_off(DEFAULT_COMMAND_TIMEOUT).await?;
//!
//!     let state = drone.read_state(Duration::from_secs(12)).await?;
//!     println!("battery: {}%", state.bat);
//!
//!     let mut decoder = VideoDecoder::spawn_native()?;
//!     let mut frames = decoder.frames()?;
//!     let packet = drone.read_video(Duration::from_secs(3)).await?;
//!     decoder.feed(&packet).await?;
//!     if let Some(frame) = frames.next().await {
//!         let frame = frame?;
//!         println!("decoded {}x{} frame", frame.width, frame.height);
//!     }
//!
//!     drone.land(DEFAULT_COMMAND_TIMEOUT).await?;
//!     drone.close().await;
//!     Ok(())
//! }
//! ```

mod command;
mod drone;
mod endpoints;
mod error;
mod telemetry;
pub mod video;

pub use drone::{DEFAULT_COMMAND_TIMEOUT, Drone};
pub use endpoints::Endpoints;
pub use error::{LinkError, Result};
pub use telemetry::FlightState;
pub use video::{DecodedFrame, VideoDecoder, VideoPacket};
