//! Drone client: command session, telemetry and video listeners.

use std::net::SocketAddr;
use std::str;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::command::{Command, Reply, classify};
use crate::endpoints::Endpoints;
use crate::error::{LinkError, Result};
use crate::telemetry::FlightState;
use crate::video::VideoPacket;

/// Default budget for one command round trip.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(12);

/// Budget for the best-effort `streamoff` issued by [`Drone::close`].
const CLOSE_STREAM_OFF_TIMEOUT: Duration = Duration::from_secs(1);

/// Largest datagram any of the three sockets is expected to carry. Command
/// replies and telemetry lines are short; video datagrams top out around
/// the path MTU.
const MAX_DATAGRAM: usize = 2048;

/// Client for a quadcopter speaking the vendor UDP text protocol.
///
/// One `Drone` owns three sockets: a command socket bound at construction,
/// and telemetry/video sockets bound lazily on first use. All methods take
/// `&self`; telemetry polling, video polling and command issuance may run
/// concurrently, but command round trips themselves serialize because the
/// protocol allows only one outstanding command.
///
/// Start with [`enable`](Self::enable) to put the drone into command mode,
/// and call [`close`](Self::close) when done.
pub struct Drone {
    endpoints: Endpoints,
    cmd_socket: UdpSocket,
    // Serializes send-then-await-reply so interleaved commands never
    // consume each other's replies.
    cmd_lock: Mutex<()>,
    state_socket: OnceCell<UdpSocket>,
    video_socket: OnceCell<UdpSocket>,
    // Claimed by the close() call that performs the shutdown.
    closing: AtomicBool,
    cancel: CancellationToken,
}

impl Drone {
    /// Connect using the vendor default endpoints.
    pub async fn connect() -> Result<Self> {
        Self::connect_with(Endpoints::default()).await
    }

    /// Bind the command socket and fix the command peer for this session.
    ///
    /// Fails with [`LinkError::Bind`] if the local command port is taken.
    /// The telemetry and video sockets are not touched until first use.
    pub async fn connect_with(endpoints: Endpoints) -> Result<Self> {
        let cmd_socket = UdpSocket::bind(endpoints.command_bind)
            .await
            .map_err(|e| LinkError::bind(endpoints.command_bind, e))?;

        info!(peer = %endpoints.command_peer, "command link ready");
        Ok(Self {
            endpoints,
            cmd_socket,
            cmd_lock: Mutex::new(()),
            state_socket: OnceCell::new(),
            video_socket: OnceCell::new(),
            closing: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        })
    }

    /// The endpoints this session was built with.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Local address of the command socket.
    pub fn command_local_addr(&self) -> Result<SocketAddr> {
        self.cmd_socket.local_addr().map_err(|e| LinkError::io("command socket address", e))
    }

    /// Local address of the telemetry socket, if it has been bound yet.
    pub fn telemetry_local_addr(&self) -> Option<SocketAddr> {
        self.state_socket.get().and_then(|s| s.local_addr().ok())
    }

    /// Local address of the video socket, if it has been bound yet.
    pub fn video_local_addr(&self) -> Option<SocketAddr> {
        self.video_socket.get().and_then(|s| s.local_addr().ok())
    }

    /// Whether [`close`](Self::close) has shut the session down.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    // ---- basic commands ----------------------------------------------

    /// Switch the drone into command mode. Must be the first command after
    /// power-on; it cannot be undone without a reboot.
    pub async fn enable(&self, timeout: Duration) -> Result<()> {
        self.send_command(Command::Enable, timeout).await
    }

    /// Stop the motors immediately, without landing.
    pub async fn emergency(&self, timeout: Duration) -> Result<()> {
        self.send_command(Command::Emergency, timeout).await
    }

    /// Take off and hover.
    pub async fn take_off(&self, timeout: Duration) -> Result<()> {
        self.send_command(Command::TakeOff, timeout).await
    }

    /// Land at the current position.
    pub async fn land(&self, timeout: Duration) -> Result<()> {
        self.send_command(Command::Land, timeout).await
    }

    /// Start video streaming. The drone tolerates repeated `streamon`.
    pub async fn stream_on(&self, timeout: Duration) -> Result<()> {
        self.send_command(Command::StreamOn, timeout).await
    }

    /// Stop video streaming.
    pub async fn stream_off(&self, timeout: Duration) -> Result<()> {
        self.send_command(Command::StreamOff, timeout).await
    }

    /// Set the cruise speed in cm/s.
    pub async fn set_speed(&self, speed: i32, timeout: Duration) -> Result<()> {
        self.send_command(Command::Speed(speed), timeout).await
    }

    /// Set the relative movement speed on each axis, `-100..=100` with z up;
    /// `yaw` is the rotation speed in the same range.
    pub async fn set_rc(&self, x: i32, y: i32, z: i32, yaw: i32, timeout: Duration) -> Result<()> {
        self.send_command(Command::Rc { x, y, z, yaw }, timeout).await
    }

    /// Rotate by `angle` tenths of a degree, range ±3600. Positive angles
    /// rotate clockwise, negative counter-clockwise.
    pub async fn rotate(&self, angle: i32, timeout: Duration) -> Result<()> {
        self.send_command(Command::Rotate(angle), timeout).await
    }

    // ---- telemetry ----------------------------------------------------

    /// Wait for the next telemetry datagram from the drone and parse it.
    ///
    /// Binds the telemetry socket on first use. Datagrams from senders other
    /// than the command peer are ignored and the wait continues. Should be
    /// polled continuously while flying; battery is in here.
    pub async fn read_state(&self, timeout: Duration) -> Result<FlightState> {
        if self.is_closed() {
            return Err(LinkError::Closed);
        }
        let socket = self
            .state_socket
            .get_or_try_init(|| async {
                debug!(addr = %self.endpoints.telemetry_bind, "binding telemetry socket");
                UdpSocket::bind(self.endpoints.telemetry_bind)
                    .await
                    .map_err(|e| LinkError::bind(self.endpoints.telemetry_bind, e))
            })
            .await?;

        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; MAX_DATAGRAM];
        loop {
            let (len, from) = self.recv_until(socket, &mut buf, deadline, timeout).await?;
            if from != self.endpoints.command_peer {
                trace!(%from, "ignoring telemetry from unexpected sender");
                continue;
            }
            let line = str::from_utf8(&buf[..len]).map_err(|_| LinkError::MalformedTelemetry {
                details: format!("non-text payload of {len} bytes"),
            })?;
            trace!(line, "state datagram");
            return Ok(FlightState::parse(line));
        }
    }

    // ---- video ----------------------------------------------------------

    /// Wait for the next raw video datagram.
    ///
    /// Binds the video socket on first use and issues `streamon` on every
    /// call before receiving; the drone tolerates repeated `streamon`, and a
    /// rejection is ignored. The whole call shares one deadline. The sender
    /// is not checked, since the video port receives nothing else by
    /// construction of the network path.
    pub async fn read_video(&self, timeout: Duration) -> Result<VideoPacket> {
        if self.is_closed() {
            return Err(LinkError::Closed);
        }
        let socket = self
            .video_socket
            .get_or_try_init(|| async {
                debug!(addr = %self.endpoints.video_bind, "binding video socket");
                UdpSocket::bind(self.endpoints.video_bind)
                    .await
                    .map_err(|e| LinkError::bind(self.endpoints.video_bind, e))
            })
            .await?;

        let deadline = Instant::now() + timeout;
        match self.send_command_until(Command::StreamOn, deadline, timeout).await {
            Ok(()) => {}
            Err(LinkError::CommandRejected { reply, .. }) => {
                debug!(reply = %reply, "streamon rejected, reading anyway");
            }
            Err(e) => return Err(e),
        }

        let mut buf = [0u8; MAX_DATAGRAM];
        let (len, _) = self.recv_until(socket, &mut buf, deadline, timeout).await?;
        Ok(VideoPacket::new(buf[..len].to_vec()))
    }

    // ---- shutdown -------------------------------------------------------

    /// Shut the session down. Idempotent, including under concurrent calls.
    ///
    /// Exactly one caller performs the shutdown: it sends a best-effort
    /// `streamoff` (the short budget covers the whole attempt, waiting for
    /// the command lock included, so an in-flight command cannot stall the
    /// shutdown), then cancels the session token so any pending receive on
    /// any socket returns [`LinkError::Closed`] promptly. Every other call
    /// waits for the token to fall and returns. The sockets themselves are
    /// released when the `Drone` is dropped.
    ///
    /// Safe to call even if streaming or telemetry were never started.
    pub async fn close(&self) {
        if self.closing.swap(true, Ordering::SeqCst) {
            // Shutdown already under way on another call.
            self.cancel.cancelled().await;
            debug!("close: already closed");
            return;
        }
        let stream_off = self.send_command(Command::StreamOff, CLOSE_STREAM_OFF_TIMEOUT);
        match time::timeout(CLOSE_STREAM_OFF_TIMEOUT, stream_off).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("streamoff on close failed: {e}"),
            Err(_) => debug!("streamoff on close could not acquire the command lock in time"),
        }
        self.cancel.cancel();
        info!("drone link closed");
    }

    // ---- internals ------------------------------------------------------

    /// One command round trip bounded by `timeout`.
    async fn send_command(&self, command: Command, timeout: Duration) -> Result<()> {
        self.send_command_until(command, Instant::now() + timeout, timeout).await
    }

    /// One command round trip bounded by an absolute deadline.
    ///
    /// Holds the command lock from send until the correlated reply so
    /// concurrent calls cannot consume each other's replies. `budget` is
    /// only reported in the timeout error.
    async fn send_command_until(
        &self,
        command: Command,
        deadline: Instant,
        budget: Duration,
    ) -> Result<()> {
        if self.is_closed() {
            return Err(LinkError::Closed);
        }
        let _guard = self.cmd_lock.lock().await;

        let text = command.encode();
        debug!(command = %text, "sending");
        self.cmd_socket
            .send_to(text.as_bytes(), self.endpoints.command_peer)
            .await
            .map_err(|e| LinkError::io("send command", e))?;

        let mut buf = [0u8; MAX_DATAGRAM];
        loop {
            let (len, from) = self.recv_until(&self.cmd_socket, &mut buf, deadline, budget).await?;
            if from != self.endpoints.command_peer {
                trace!(%from, "ignoring datagram from unexpected sender");
                continue;
            }
            match classify(&buf[..len]) {
                Reply::Ok => {
                    debug!(command = %text, "acknowledged");
                    return Ok(());
                }
                Reply::Error => {
                    let reply = String::from_utf8_lossy(&buf[..len]).into_owned();
                    debug!(command = %text, reply = %reply, "rejected");
                    return Err(LinkError::rejected(text, reply));
                }
                Reply::Unrelated => {
                    trace!("ignoring unrelated payload on command socket");
                }
            }
        }
    }

    /// Receive one datagram before `deadline`, waking early if the session
    /// closes. Timeout expiry has no side effect on the socket.
    async fn recv_until(
        &self,
        socket: &UdpSocket,
        buf: &mut [u8],
        deadline: Instant,
        budget: Duration,
    ) -> Result<(usize, SocketAddr)> {
        let recv = time::timeout_at(deadline, async {
            tokio::select! {
                _ = self.cancel.cancelled() => Err(LinkError::Closed),
                received = socket.recv_from(buf) => {
                    received.map_err(|e| LinkError::io("receive datagram", e))
                }
            }
        });
        match recv.await {
            Ok(result) => result,
            Err(_) => Err(LinkError::timeout(budget)),
        }
    }
}
