//! # Transport Layer
//!
//! Blocking TCP transport with exact-length reads and serialized writes.
//!
//! ## Design
//!
//! - One socket, split into a read half (owned by the receive loop) and a
//!   write half (shared behind a lock)
//! - Reads loop over short reads until the packet is complete
//! - Closing shuts the socket down in both directions, which unblocks a read
//!   stuck in another thread
//! - A closed connection is never reopened

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::ClientConfig;
use crate::error::{NetError, NetResult};

/// Lifecycle of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Closed, or never opened. Terminal once left `Connected`.
    Disconnected = 0,
    /// Socket open.
    Connected = 1,
}

/// Transport statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Packets sent.
    pub packets_sent: u64,
    /// Packets received.
    pub packets_received: u64,
    /// Bytes sent.
    pub bytes_sent: u64,
    /// Bytes received.
    pub bytes_received: u64,
    /// Send errors.
    pub send_errors: u64,
    /// Receive errors.
    pub recv_errors: u64,
}

/// Live counters behind [`TransportStats`], shared by both halves.
#[derive(Debug, Default)]
struct StatCounters {
    packets_sent: AtomicU64,
    packets_received: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    send_errors: AtomicU64,
    recv_errors: AtomicU64,
}

impl StatCounters {
    fn snapshot(&self) -> TransportStats {
        TransportStats {
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
            recv_errors: self.recv_errors.load(Ordering::Relaxed),
        }
    }
}

/// Read half of a connection.
///
/// Generic over the byte source so partial delivery can be exercised without
/// a socket.
#[derive(Debug)]
pub struct PacketReader<R> {
    inner: R,
    stats: Arc<StatCounters>,
}

impl<R: Read> PacketReader<R> {
    /// Wraps a byte source.
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            stats: Arc::new(StatCounters::default()),
        }
    }

    /// Fills `buf` completely.
    ///
    /// A read of zero bytes means the peer closed the stream and is reported
    /// as `ConnectionBroken`, never as a short result.
    pub fn read_into(&mut self, buf: &mut [u8]) -> NetResult<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => return Err(NetError::closed_by_peer()),
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.stats.recv_errors.fetch_add(1, Ordering::Relaxed);
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) {
                        return Err(NetError::ConnectionBroken {
                            reason: "read deadline expired".to_string(),
                        });
                    }
                    return Err(NetError::broken(&e));
                }
            }
        }
        self.stats
            .bytes_received
            .fetch_add(buf.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Reads exactly `len` bytes.
    pub fn read_exact(&mut self, len: usize) -> NetResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_into(&mut buf)?;
        Ok(buf)
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> NetResult<u8> {
        let mut byte = [0u8; 1];
        self.read_into(&mut byte)?;
        Ok(byte[0])
    }

    /// Counts one fully received packet.
    pub fn mark_packet(&self) {
        self.stats.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns statistics for this reader.
    #[must_use]
    pub fn stats(&self) -> TransportStats {
        self.stats.snapshot()
    }

    /// Unwraps the byte source.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// A TCP connection to the game server.
///
/// Shared between the receive loop (which takes the read half once) and any
/// number of outbound senders.
#[derive(Debug)]
pub struct Connection {
    /// Server address.
    peer: SocketAddr,
    /// Write half. The lock keeps whole packets together.
    writer: Mutex<TcpStream>,
    /// Read half, until the receive loop takes it.
    reader: Mutex<Option<PacketReader<TcpStream>>>,
    /// Handle used only to shut the socket down.
    control: TcpStream,
    /// Set once by `close()`.
    closed: AtomicBool,
    /// Statistics.
    stats: Arc<StatCounters>,
}

impl Connection {
    /// Opens a TCP connection to the configured server.
    ///
    /// Every resolved address is tried in turn; the last failure is reported.
    pub fn connect(config: &ClientConfig) -> NetResult<Self> {
        config.validate()?;
        let addr = config.socket_addr_string();

        let candidates = addr
            .to_socket_addrs()
            .map_err(|source| NetError::Connect {
                addr: addr.clone(),
                source,
            })?;

        let mut last_error = None;
        for candidate in candidates {
            match TcpStream::connect_timeout(&candidate, config.connect_timeout()) {
                Ok(stream) => {
                    return Self::from_stream(stream, config.read_timeout()).map_err(|source| {
                        NetError::Connect {
                            addr: addr.clone(),
                            source,
                        }
                    });
                }
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", candidate, e);
                    last_error = Some(e);
                }
            }
        }

        Err(NetError::Connect {
            source: last_error.unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
            }),
            addr,
        })
    }

    /// Wraps an already connected stream.
    pub fn from_stream(stream: TcpStream, read_timeout: Option<Duration>) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        stream.set_read_timeout(read_timeout)?;
        let peer = stream.peer_addr()?;

        let stats = Arc::new(StatCounters::default());
        let reader = PacketReader {
            inner: stream.try_clone()?,
            stats: Arc::clone(&stats),
        };
        let control = stream.try_clone()?;

        tracing::info!("Connected to the server at {}", peer);

        Ok(Self {
            peer,
            writer: Mutex::new(stream),
            reader: Mutex::new(Some(reader)),
            control,
            closed: AtomicBool::new(false),
            stats,
        })
    }

    /// Returns the server address.
    #[inline]
    #[must_use]
    pub const fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        if self.closed.load(Ordering::Acquire) {
            ConnectionState::Disconnected
        } else {
            ConnectionState::Connected
        }
    }

    /// Returns true until `close()` has been called.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Takes the read half. Only the first call gets it.
    pub fn take_reader(&self) -> Option<PacketReader<TcpStream>> {
        self.reader.lock().take()
    }

    /// Sends `bytes` as one uninterrupted write.
    ///
    /// Concurrent callers are serialized, so two packets never interleave.
    pub fn write_all(&self, bytes: &[u8]) -> NetResult<()> {
        if !self.is_open() {
            return Err(NetError::ConnectionBroken {
                reason: "connection already closed".to_string(),
            });
        }

        let result = {
            let mut stream = self.writer.lock();
            stream.write_all(bytes).and_then(|()| stream.flush())
        };
        match result {
            Ok(()) => {
                self.stats.packets_sent.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .bytes_sent
                    .fetch_add(bytes.len() as u64, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.stats.send_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Send failed, closing connection: {}", e);
                // Also wakes the receive loop, which reports the disconnect.
                self.close();
                Err(NetError::broken(&e))
            }
        }
    }

    /// Closes the socket in both directions. Safe to call repeatedly and
    /// while another thread is blocked reading.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.control.shutdown(Shutdown::Both) {
            // NotConnected just means the peer got there first.
            if e.kind() != io::ErrorKind::NotConnected {
                tracing::warn!("Socket shutdown failed: {}", e);
            }
        }
        tracing::info!("Disconnected from the server at {}", self.peer);
    }

    /// Returns statistics for both directions.
    #[must_use]
    pub fn stats(&self) -> TransportStats {
        self.stats.snapshot()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}
