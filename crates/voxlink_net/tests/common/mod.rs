//! Shared helpers: a scripted loopback server and event polling.

#![allow(dead_code)]

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use voxlink_net::{ClientConfig, LoopState, NetworkClient, NetworkEvent};

/// How long any single wait may take before the test fails.
pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Loopback listener standing in for the game server.
pub struct TestServer {
    listener: TcpListener,
}

impl TestServer {
    pub fn bind() -> Self {
        Self {
            listener: TcpListener::bind("127.0.0.1:0").unwrap(),
        }
    }

    /// Client config pointing at this server.
    pub fn config(&self) -> ClientConfig {
        let port = self.listener.local_addr().unwrap().port();
        ClientConfig::new("127.0.0.1", port)
    }

    pub fn accept(&self) -> TcpStream {
        let (stream, _) = self.listener.accept().unwrap();
        stream.set_nodelay(true).unwrap();
        stream
    }

    /// Connects a client and returns it with the server side of the socket.
    pub fn connect_client(&self) -> (NetworkClient, TcpStream) {
        let client = NetworkClient::connect(&self.config()).unwrap();
        let peer = self.accept();
        (client, peer)
    }
}

/// Writes `bytes` in the given segment sizes, flushing and pausing after each.
pub fn write_segmented(peer: &mut TcpStream, bytes: &[u8], segments: &[usize]) {
    let mut offset = 0;
    for &len in segments {
        let end = (offset + len).min(bytes.len());
        peer.write_all(&bytes[offset..end]).unwrap();
        peer.flush().unwrap();
        offset = end;
        thread::sleep(Duration::from_micros(50));
    }
    peer.write_all(&bytes[offset..]).unwrap();
    peer.flush().unwrap();
}

/// Polls until an event arrives or [`TIMEOUT`] passes.
pub fn next_event(client: &NetworkClient) -> NetworkEvent {
    let deadline = Instant::now() + TIMEOUT;
    loop {
        if let Some(event) = client.events().poll() {
            return event;
        }
        assert!(Instant::now() < deadline, "no event within {TIMEOUT:?}");
        thread::sleep(Duration::from_millis(2));
    }
}

/// Waits for the receive loop to reach `Stopped`.
pub fn wait_stopped(client: &NetworkClient) {
    let deadline = Instant::now() + TIMEOUT;
    while client.state() != LoopState::Stopped {
        assert!(Instant::now() < deadline, "receive loop still {:?}", client.state());
        thread::sleep(Duration::from_millis(2));
    }
}

/// Gives the receive loop a moment, then asserts nothing else was queued.
pub fn assert_quiet(client: &NetworkClient) {
    thread::sleep(Duration::from_millis(50));
    let extra = client.events().drain();
    assert!(extra.is_empty(), "unexpected events: {extra:?}");
}
