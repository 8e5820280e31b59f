//! Telemetry state snapshots.

use std::str::FromStr;
use tracing::warn;

/// One parsed state report from the drone.
///
/// The drone pushes these continuously while in command mode, one datagram
/// per report, as a single line of `;`-separated `key:value` pairs.
///
/// Field defaults are the sentinel values the firmware reports right after
/// power-on (not zeroes): a field missing from a datagram keeps its default
/// in the resulting snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightState {
    /// Pitch angle in degrees.
    pub pitch: i32,
    /// Roll angle in degrees.
    pub roll: i32,
    /// Yaw angle in degrees.
    pub yaw: i32,
    /// Ground speed along x, in dm/s.
    pub vgx: i32,
    /// Ground speed along y, in dm/s.
    pub vgy: i32,
    /// Ground speed along z, in dm/s.
    pub vgz: i32,
    /// Lowest onboard temperature, in °C.
    pub templ: i32,
    /// Highest onboard temperature, in °C.
    pub temph: i32,
    /// Time-of-flight distance, in cm.
    pub tof: i32,
    /// Height above the takeoff point, in cm.
    pub h: i32,
    /// Remaining battery, in percent.
    pub bat: u8,
    /// Barometric altitude, in cm.
    pub baro: f32,
    /// Motor-on time, in seconds.
    pub time: f32,
    /// Acceleration along x, in 0.001g.
    pub agx: f32,
    /// Acceleration along y, in 0.001g.
    pub agy: f32,
    /// Acceleration along z, in 0.001g.
    pub agz: f32,
}

impl Default for FlightState {
    fn default() -> Self {
        Self {
            pitch: 0,
            roll: 0,
            yaw: -45,
            vgx: 0,
            vgy: 0,
            vgz: 0,
            templ: 0,
            temph: 0,
            tof: 0,
            h: 0,
            bat: 92,
            baro: 584.55,
            time: 0.0,
            agx: 0.0,
            agy: 0.0,
            agz: 0.0,
        }
    }
}

impl FlightState {
    /// Parse one telemetry line.
    ///
    /// Unknown keys are skipped, as is a trailing `;`. A known key whose
    /// value fails to parse keeps its default and logs a warning; one bad
    /// field never voids the rest of the snapshot.
    pub fn parse(line: &str) -> Self {
        let mut state = Self::default();
        for pair in line.split(';') {
            let Some((key, value)) = pair.split_once(':') else {
                continue;
            };
            match key {
                "pitch" => apply(&mut state.pitch, key, value),
                "roll" => apply(&mut state.roll, key, value),
                "yaw" => apply(&mut state.yaw, key, value),
                "vgx" => apply(&mut state.vgx, key, value),
                "vgy" => apply(&mut state.vgy, key, value),
                "vgz" => apply(&mut state.vgz, key, value),
                "templ" => apply(&mut state.templ, key, value),
                "temph" => apply(&mut state.temph, key, value),
                "tof" => apply(&mut state.tof, key, value),
                "h" => apply(&mut state.h, key, value),
                "bat" => apply(&mut state.bat, key, value),
                "baro" => apply(&mut state.baro, key, value),
                "time" => apply(&mut state.time, key, value),
                "agx" => apply(&mut state.agx, key, value),
                "agy" => apply(&mut state.agy, key, value),
                "agz" => apply(&mut state.agz, key, value),
                _ => {}
            }
        }
        state
    }
}

/// Overwrite `field` with the parsed value, keeping the default on failure.
fn apply<T: FromStr>(field: &mut T, key: &str, value: &str) {
    match value.parse::<T>() {
        Ok(parsed) => *field = parsed,
        Err(_) => warn!(key, value, "ignoring unparseable telemetry value"),
    }
}
