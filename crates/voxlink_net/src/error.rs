//! # Network Error Types
//!
//! Every failure the protocol engine can report. All of them except
//! `InvalidConfig` end the connection: there is no retry and no reconnect.

use std::io;
use thiserror::Error;

/// Errors that can occur in the network layer.
#[derive(Error, Debug)]
pub enum NetError {
    /// The TCP connection could not be established.
    #[error("cannot connect to {addr}: {source}")]
    Connect {
        /// Address we tried to reach.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// The peer closed the socket or an I/O call failed mid-stream.
    #[error("connection broken: {reason}")]
    ConnectionBroken {
        /// What broke.
        reason: String,
    },

    /// A payload did not have the width its packet id requires.
    #[error("malformed {packet} packet: expected {expected} bytes, got {actual}")]
    MalformedPacket {
        /// Packet name.
        packet: &'static str,
        /// Width required by the packet id.
        expected: usize,
        /// Width actually supplied.
        actual: usize,
    },

    /// The server sent a packet id this client does not know.
    ///
    /// Payload width is implied by the id, so the stream cannot be resynced.
    #[error("unknown packet id 0x{0:02x}")]
    UnknownPacketId(u8),

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl NetError {
    /// Builds a `ConnectionBroken` from an I/O error.
    #[must_use]
    pub fn broken(err: &io::Error) -> Self {
        Self::ConnectionBroken {
            reason: err.to_string(),
        }
    }

    /// Builds a `ConnectionBroken` for a peer that closed the stream.
    #[must_use]
    pub fn closed_by_peer() -> Self {
        Self::ConnectionBroken {
            reason: "peer closed the connection".to_string(),
        }
    }

    /// Returns true if this error ended the connection rather than the caller's setup.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidConfig(_) | Self::Connect { .. })
    }
}

/// Result type for network operations.
pub type NetResult<T> = Result<T, NetError>;
