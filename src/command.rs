//! Command wire format: request encoding and reply classification.
//!
//! Requests are bare ASCII keywords optionally followed by space-separated
//! integer arguments. Replies begin with `ok` or `error`; anything else from
//! the drone on the command socket is unrelated chatter and the wait for a
//! real reply continues.

use std::fmt;

/// A single control command in the drone's text protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    /// Switch into command mode. Cannot be undone without a reboot.
    Enable,
    /// Stop the motors immediately, without landing.
    Emergency,
    TakeOff,
    Land,
    StreamOn,
    StreamOff,
    /// Cruise speed in cm/s.
    Speed(i32),
    /// Relative axis speeds, `-100..=100` each; `z` is up, `yaw` is
    /// rotation speed in the same range.
    Rc { x: i32, y: i32, z: i32, yaw: i32 },
    /// Rotation in tenths of a degree, range ±3600. Positive is clockwise,
    /// negative is counter-clockwise with the absolute magnitude.
    Rotate(i32),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Command::Enable => f.write_str("command"),
            Command::Emergency => f.write_str("emergency"),
            Command::TakeOff => f.write_str("takeoff"),
            Command::Land => f.write_str("land"),
            Command::StreamOn => f.write_str("streamon"),
            Command::StreamOff => f.write_str("streamoff"),
            Command::Speed(v) => write!(f, "speed {v}"),
            Command::Rc { x, y, z, yaw } => write!(f, "rc {x} {y} {z} {yaw}"),
            Command::Rotate(angle) if angle > 0 => write!(f, "cw {angle}"),
            Command::Rotate(angle) => write!(f, "ccw {}", -angle),
        }
    }
}

impl Command {
    /// The UTF-8 datagram payload for this command.
    pub(crate) fn encode(&self) -> String {
        self.to_string()
    }
}

/// Classification of a datagram received on the command socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reply {
    /// Payload starts with `ok`.
    Ok,
    /// Payload starts with `error`.
    Error,
    /// Anything else; not a reply to our command.
    Unrelated,
}

/// Classify a command-socket payload.
pub(crate) fn classify(payload: &[u8]) -> Reply {
    if payload.starts_with(b"ok") {
        Reply::Ok
    } else if payload.starts_with(b"error") {
        Reply::Error
    } else {
        Reply::Unrelated
    }
}
