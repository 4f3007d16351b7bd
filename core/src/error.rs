//! Error types for the line socket and the HTTP exchange.
//!
//! # Design
//! Transport failures carry a structured reason (`ConnectFailure`,
//! `WriteFailure`) so callers can pattern-match on what went wrong instead of
//! inspecting raw OS error codes. A non-200 response is not an error; it is
//! returned as data by the exchange functions.

use std::io;

use thiserror::Error;

/// Why a connection attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailure {
    /// The peer actively refused the connection (nothing listening).
    Refused,
    /// The handshake did not complete within the connect timeout.
    TimedOut,
    /// The host name did not resolve to any address.
    Unresolved,
    Other,
}

impl ConnectFailure {
    pub(crate) fn classify(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => ConnectFailure::Refused,
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ConnectFailure::TimedOut,
            io::ErrorKind::NotFound | io::ErrorKind::InvalidInput => ConnectFailure::Unresolved,
            _ => ConnectFailure::Other,
        }
    }
}

/// Why a write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFailure {
    /// The peer closed its end while we were still sending.
    BrokenPipe,
    /// The peer reset the connection.
    Reset,
    /// The write blocked longer than the I/O timeout.
    TimedOut,
    Other,
}

impl WriteFailure {
    pub(crate) fn classify(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::BrokenPipe => WriteFailure::BrokenPipe,
            io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => WriteFailure::Reset,
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => WriteFailure::TimedOut,
            _ => WriteFailure::Other,
        }
    }

    /// Whether the socket is unusable after this failure and must be closed.
    pub(crate) fn closes_connection(self) -> bool {
        !matches!(self, WriteFailure::Other)
    }
}

/// Errors returned by `LineSocket` operations and the exchange functions.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to connect to {host}:{port} ({reason:?}): {source}")]
    Connect {
        host: String,
        port: u16,
        reason: ConnectFailure,
        #[source]
        source: io::Error,
    },

    #[error("write failed ({reason:?}): {source}")]
    Write {
        reason: WriteFailure,
        #[source]
        source: io::Error,
    },

    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    /// The peer closed the connection before a complete line arrived.
    #[error("unexpected end of stream")]
    EndOfStream,

    /// The socket was already closed when the operation was attempted.
    #[error("connection is closed")]
    Closed,

    #[error("malformed status line: {0:?}")]
    MalformedStatusLine(String),

    #[error("invalid chunk size line: {0:?}")]
    InvalidChunkSize(String),
}
