//! # Network Client
//!
//! Owns the connection and the receive thread.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      NETWORK CLIENT                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐       │
//! │  │ Receive      │  │ Event Queue  │  │ Outbound     │       │
//! │  │ (own thread) │──│ (unbounded)  │  │ (any thread) │       │
//! │  └──────────────┘  └──────────────┘  └──────────────┘       │
//! │         │                 │                 │               │
//! │         └─────────────────┼─────────────────┘               │
//! │                           │                                 │
//! │               ┌───────────▼───────────┐                     │
//! │               │  Connection (TCP)     │                     │
//! │               └───────────────────────┘                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Loop States
//!
//! `Idle → Running → Stopping → Stopped`, or `Running → Stopped` when the
//! connection breaks on its own. The receive thread makes the `Idle → Running`
//! move itself; a stop requested before that goes straight to `Stopping`. The stop flag is only checked between
//! packets; closing the socket is what actually interrupts a blocked read.
//!
//! A stalled server that keeps the socket open blocks the loop until
//! `stop()` is called, unless `read_timeout_ms` is configured.

use std::net::TcpStream;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::config::ClientConfig;
use crate::dispatch::Dispatcher;
use crate::error::{NetError, NetResult};
use crate::events::{EventQueue, EventReceiver, EventSender, NetworkEvent};
use crate::outbound::Outbound;
use crate::transport::{Connection, PacketReader, TransportStats};

/// Receive loop state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LoopState {
    /// Thread spawned but not yet reading.
    Idle = 0,
    /// Reading packets.
    Running = 1,
    /// Stop requested, waiting for the thread to exit.
    Stopping = 2,
    /// Thread finished. Terminal.
    Stopped = 3,
}

impl LoopState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// State shared between the client handle and its receive thread.
struct LoopShared {
    state: AtomicU8,
    /// Last entity id seen by the loop's dispatcher.
    entity_id: Mutex<Option<u32>>,
}

impl LoopShared {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(LoopState::Idle as u8),
            entity_id: Mutex::new(None),
        }
    }

    fn state(&self) -> LoopState {
        LoopState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: LoopState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn transition(&self, from: LoopState, to: LoopState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Idle or Running → Stopping. Returns false if a stop is already under way.
    fn request_stop(&self) -> bool {
        self.transition(LoopState::Running, LoopState::Stopping)
            || self.transition(LoopState::Idle, LoopState::Stopping)
    }
}

/// Client for one server connection.
///
/// Create a new client to reconnect; a stopped client stays stopped.
pub struct NetworkClient {
    /// Shared socket.
    connection: Arc<Connection>,
    /// Loop state and session info.
    shared: Arc<LoopShared>,
    /// Consumer end of the event queue.
    events: EventReceiver,
    /// Receive thread, until joined.
    thread: Option<JoinHandle<()>>,
}

impl NetworkClient {
    /// Connects to the configured server and starts the receive thread.
    ///
    /// Connection failures are returned here, on the caller's thread.
    pub fn connect(config: &ClientConfig) -> NetResult<Self> {
        let connection = Arc::new(Connection::connect(config)?);
        Self::start(connection, &config.thread_name)
    }

    /// Starts the receive thread on an open connection.
    pub fn start(connection: Arc<Connection>, thread_name: &str) -> NetResult<Self> {
        let reader = connection
            .take_reader()
            .ok_or_else(|| NetError::ConnectionBroken {
                reason: "read half already taken by another receive loop".to_string(),
            })?;

        let (sender, events) = EventQueue::unbounded();
        let shared = Arc::new(LoopShared::new());

        let thread = {
            let connection = Arc::clone(&connection);
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(thread_name.to_string())
                .spawn(move || receive_loop(reader, &connection, &shared, &sender))
                .map_err(|e| NetError::broken(&e))?
        };

        Ok(Self {
            connection,
            shared,
            events,
            thread: Some(thread),
        })
    }

    /// Returns the current loop state.
    #[must_use]
    pub fn state(&self) -> LoopState {
        self.shared.state()
    }

    /// Returns true while the receive loop is reading.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    /// Our entity id, once the server has identified us.
    #[must_use]
    pub fn entity_id(&self) -> Option<u32> {
        *self.shared.entity_id.lock()
    }

    /// Consumer end of the event queue. Poll it; it never blocks.
    #[must_use]
    pub const fn events(&self) -> &EventReceiver {
        &self.events
    }

    /// A sender usable from any thread.
    #[must_use]
    pub fn outbound(&self) -> Outbound {
        Outbound::new(Arc::clone(&self.connection))
    }

    /// Transport statistics.
    #[must_use]
    pub fn stats(&self) -> TransportStats {
        self.connection.stats()
    }

    /// Stops the receive loop, closes the socket and joins the thread.
    ///
    /// No `Disconnected` event is queued for a requested stop. Safe to call
    /// more than once.
    pub fn stop(&mut self) {
        if self.shared.request_stop() {
            tracing::info!("Stopping receive loop");
        }
        self.connection.close();

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Receive thread panicked");
            }
        }
        self.shared.set_state(LoopState::Stopped);
    }
}

impl Drop for NetworkClient {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the receive thread.
fn receive_loop(
    mut reader: PacketReader<TcpStream>,
    connection: &Connection,
    shared: &LoopShared,
    events: &EventSender,
) {
    if !shared.transition(LoopState::Idle, LoopState::Running) {
        // Stopped before the first read.
        connection.close();
        shared.set_state(LoopState::Stopped);
        return;
    }

    let mut dispatcher = Dispatcher::new();
    let mut published = None;
    tracing::debug!("Receive loop started");

    let failure = loop {
        if shared.state() != LoopState::Running {
            break None;
        }
        match dispatcher.read_packet(&mut reader) {
            Ok(event) => {
                if dispatcher.entity_id() != published {
                    published = dispatcher.entity_id();
                    *shared.entity_id.lock() = published;
                }
                if shared.state() != LoopState::Running {
                    break None;
                }
                if !events.push(event) {
                    tracing::debug!("Event receiver dropped, discarding event");
                }
            }
            Err(e) => break Some(e),
        }
    };

    let stop_requested = shared.state() == LoopState::Stopping;
    match failure {
        Some(e) if !stop_requested => {
            tracing::warn!("Receive loop terminated: {}", e);
            events.push(NetworkEvent::Disconnected {
                reason: e.to_string(),
            });
        }
        Some(e) => tracing::debug!("Receive loop interrupted by stop: {}", e),
        None => {}
    }

    connection.close();
    shared.set_state(LoopState::Stopped);
    tracing::debug!(
        "Receive loop exited after {} packets",
        dispatcher.packets()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;
    use std::time::{Duration, Instant};

    fn server() -> (TcpListener, ClientConfig) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, ClientConfig::new("127.0.0.1", port))
    }

    fn wait_for(client: &NetworkClient) -> NetworkEvent {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(event) = client.events().poll() {
                return event;
            }
            assert!(Instant::now() < deadline, "no event within 5s");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_state_roundtrip() {
        for state in [
            LoopState::Idle,
            LoopState::Running,
            LoopState::Stopping,
            LoopState::Stopped,
        ] {
            assert_eq!(LoopState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn test_identification_updates_entity_id() {
        let (listener, config) = server();
        let client = NetworkClient::connect(&config).unwrap();
        let (mut peer, _) = listener.accept().unwrap();

        peer.write_all(&[0x00, 0, 0, 0, 7]).unwrap();
        assert_eq!(wait_for(&client), NetworkEvent::Identified { entity_id: 7 });
        assert_eq!(client.entity_id(), Some(7));
        assert!(client.is_running());
    }

    #[test]
    fn test_stop_before_first_read() {
        let shared = LoopShared::new();
        assert_eq!(shared.state(), LoopState::Idle);
        assert!(shared.request_stop());
        assert_eq!(shared.state(), LoopState::Stopping);
        assert!(!shared.transition(LoopState::Idle, LoopState::Running));
        assert!(!shared.request_stop());
    }

    #[test]
    fn test_reidentification_replaces_entity_id() {
        let (listener, config) = server();
        let client = NetworkClient::connect(&config).unwrap();
        let (mut peer, _) = listener.accept().unwrap();

        peer.write_all(&[0x00, 0, 0, 0, 7, 0x00, 0, 0, 0, 9]).unwrap();
        assert_eq!(wait_for(&client), NetworkEvent::Identified { entity_id: 7 });
        assert_eq!(wait_for(&client), NetworkEvent::Identified { entity_id: 9 });
        assert_eq!(client.entity_id(), Some(9));
    }

    #[test]
    fn test_peer_close_emits_disconnected() {
        let (listener, config) = server();
        let client = NetworkClient::connect(&config).unwrap();
        let (peer, _) = listener.accept().unwrap();
        drop(peer);

        assert!(wait_for(&client).is_terminal());
        let deadline = Instant::now() + Duration::from_secs(5);
        while client.state() != LoopState::Stopped {
            assert!(Instant::now() < deadline);
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!client.outbound().is_open());
    }

    #[test]
    fn test_stop_is_silent_and_idempotent() {
        let (listener, config) = server();
        let mut client = NetworkClient::connect(&config).unwrap();
        let (_peer, _) = listener.accept().unwrap();

        client.stop();
        client.stop();
        assert_eq!(client.state(), LoopState::Stopped);
        assert!(client.events().poll().is_none());
    }

    #[test]
    fn test_reader_can_only_be_taken_once() {
        let (listener, config) = server();
        let connection = Arc::new(Connection::connect(&config).unwrap());
        let (_peer, _) = listener.accept().unwrap();

        let _first = NetworkClient::start(Arc::clone(&connection), "first").unwrap();
        assert!(matches!(
            NetworkClient::start(connection, "second"),
            Err(NetError::ConnectionBroken { .. })
        ));
    }
}
