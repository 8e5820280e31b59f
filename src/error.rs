//! Error types for the drone link.
//!
//! Protocol-level failures (`Timeout`, `CommandRejected`) are part of normal
//! operation: the socket stays open and the call may simply be retried.
//! Resource failures (`Bind`, `Decoder`) are fatal to the component that
//! raised them. Use [`LinkError::is_retryable`] to tell the two apart.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for drone link operations.
pub type Result<T, E = LinkError> = std::result::Result<T, E>;

/// Main error type for drone link operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LinkError {
    /// No correlated reply or datagram arrived within the budget.
    ///
    /// Fatal for the call, not for the session: the underlying socket
    /// remains open and usable by the next call.
    #[error("no reply from the drone within {duration:?}")]
    Timeout { duration: Duration },

    /// The drone answered `error` to a command.
    #[error("drone rejected `{command}`: {reply}")]
    CommandRejected { command: String, reply: String },

    /// A local socket could not be bound (typically the port is in use).
    #[error("failed to bind {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// A telemetry datagram could not be decoded as text.
    #[error("malformed telemetry datagram: {details}")]
    MalformedTelemetry { details: String },

    /// The external video decoder failed to start or died mid-stream.
    #[error("video decoder unavailable: {context}")]
    Decoder {
        context: String,
        #[source]
        source: Option<io::Error>,
    },

    /// The operation raced with, or followed, [`close`](crate::Drone::close).
    #[error("drone link closed")]
    Closed,

    /// Any other socket I/O failure.
    #[error("{context}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },
}

impl LinkError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            LinkError::Timeout { .. } => true,
            LinkError::CommandRejected { .. } => true,
            LinkError::MalformedTelemetry { .. } => true,
            LinkError::Bind { .. } => false,
            LinkError::Decoder { .. } => false,
            LinkError::Closed => false,
            LinkError::Io { .. } => false,
        }
    }

    /// Helper constructor for timeout errors.
    pub(crate) fn timeout(duration: Duration) -> Self {
        LinkError::Timeout { duration }
    }

    /// Helper constructor for rejected commands.
    pub(crate) fn rejected(command: impl Into<String>, reply: impl Into<String>) -> Self {
        LinkError::CommandRejected { command: command.into(), reply: reply.into() }
    }

    /// Helper constructor for bind failures.
    pub(crate) fn bind(addr: SocketAddr, source: io::Error) -> Self {
        LinkError::Bind { addr, source }
    }

    /// Helper constructor for decoder failures.
    pub(crate) fn decoder(context: impl Into<String>, source: Option<io::Error>) -> Self {
        LinkError::Decoder { context: context.into(), source }
    }

    /// Helper constructor for socket I/O failures.
    pub(crate) fn io(context: &'static str, source: io::Error) -> Self {
        LinkError::Io { context, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_traits_validation() {
        // Compile-time check: LinkError must be Send + Sync + 'static
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<LinkError>();

        let error = LinkError::timeout(Duration::from_secs(1));
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retryability_classification() {
        assert!(LinkError::timeout(Duration::from_secs(12)).is_retryable());
        assert!(LinkError::rejected("takeoff", "error").is_retryable());
        assert!(
            LinkError::MalformedTelemetry { details: "non-text payload".into() }.is_retryable()
        );

        let addr: SocketAddr = "0.0.0.0:8890".parse().unwrap();
        let bind = LinkError::bind(addr, io::Error::new(io::ErrorKind::AddrInUse, "in use"));
        assert!(!bind.is_retryable());
        assert!(!LinkError::decoder("spawn failed", None).is_retryable());
        assert!(!LinkError::Closed.is_retryable());
    }

    #[test]
    fn messages_carry_context() {
        let rejected = LinkError::rejected("land", "error no reason");
        assert!(rejected.to_string().contains("land"));
        assert!(rejected.to_string().contains("error no reason"));

        let addr: SocketAddr = "0.0.0.0:11111".parse().unwrap();
        let bind = LinkError::bind(addr, io::Error::new(io::ErrorKind::AddrInUse, "in use"));
        assert!(bind.to_string().contains("0.0.0.0:11111"));
        // Source chain preserved
        assert!(std::error::Error::source(&bind).is_some());
    }
}
