//! Network endpoints for a drone session.

use serde::Deserialize;
use std::net::SocketAddr;

/// Addresses used by a drone session.
///
/// All four are fixed at construction. The defaults match the vendor
/// protocol: the drone serves commands on `192.168.10.1:8889` and sends
/// telemetry to local port `8890` and video to local port `11111`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Address the drone listens on for commands. Replies and telemetry
    /// originate from this address; it is constant for the session.
    pub command_peer: SocketAddr,

    /// Local address the command socket binds to.
    pub command_bind: SocketAddr,

    /// Local address telemetry datagrams arrive on.
    pub telemetry_bind: SocketAddr,

    /// Local address video datagrams arrive on.
    pub video_bind: SocketAddr,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            command_peer: SocketAddr::from(([192, 168, 10, 1], 8889)),
            command_bind: SocketAddr::from(([0, 0, 0, 0], 8889)),
            telemetry_bind: SocketAddr::from(([0, 0, 0, 0], 8890)),
            video_bind: SocketAddr::from(([0, 0, 0, 0], 11111)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_vendor_protocol() {
        let ep = Endpoints::default();
        assert_eq!(ep.command_peer, "192.168.10.1:8889".parse().unwrap());
        assert_eq!(ep.command_bind, "0.0.0.0:8889".parse().unwrap());
        assert_eq!(ep.telemetry_bind, "0.0.0.0:8890".parse().unwrap());
        assert_eq!(ep.video_bind, "0.0.0.0:11111".parse().unwrap());
    }
}
