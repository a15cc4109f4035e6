//! # Network Events
//!
//! Everything the receive loop hands to the consumer.
//!
//! ## Event Flow
//! ```text
//! 1. Receive thread: read id + payload, decode
//! 2. Receive thread: EventSender::push (never blocks, never runs consumer code)
//! 3. Render thread:  EventReceiver::drain / pump, once per frame
//! 4. Render thread:  ChunkHandler::on_chunk writes the voxel grid
//! ```
//!
//! Voxel data is therefore only ever mutated on the consumer's thread.

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

use crate::protocol::{
    ChunkData, ChunkPosition, ClientboundPacket, EntityMetadata, EntityPose, EntityState,
    MonoTypeChunk,
};
use crate::CHUNK_VOLUME;

/// Events delivered from the receive loop to the consumer.
#[derive(Clone, Debug, PartialEq)]
pub enum NetworkEvent {
    /// The server told us our entity id.
    Identified {
        /// Our entity id.
        entity_id: u32,
    },
    /// A named entity came into view.
    EntityAdded(EntityState),
    /// An entity left.
    EntityRemoved {
        /// Entity that left.
        entity_id: u32,
    },
    /// An entity moved or turned.
    EntityUpdated(EntityPose),
    /// Full block data for a chunk.
    ChunkReceived(ChunkData),
    /// A uniform chunk.
    MonoTypeChunk(MonoTypeChunk),
    /// A chat line.
    Chat {
        /// Message text.
        text: String,
    },
    /// An entity was renamed.
    EntityMetadata(EntityMetadata),
    /// The connection ended without `stop()` being requested.
    ///
    /// Always the last event of a connection.
    Disconnected {
        /// Why the receive loop ended.
        reason: String,
    },
}

impl NetworkEvent {
    /// Returns true for the terminal event.
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Disconnected { .. })
    }
}

impl From<ClientboundPacket> for NetworkEvent {
    fn from(packet: ClientboundPacket) -> Self {
        match packet {
            ClientboundPacket::Identification { entity_id } => Self::Identified { entity_id },
            ClientboundPacket::AddEntity(state) => Self::EntityAdded(state),
            ClientboundPacket::RemoveEntity { entity_id } => Self::EntityRemoved { entity_id },
            ClientboundPacket::UpdateEntity(pose) => Self::EntityUpdated(pose),
            ClientboundPacket::ChunkData(chunk) => Self::ChunkReceived(chunk),
            ClientboundPacket::MonoTypeChunk(mono) => Self::MonoTypeChunk(mono),
            ClientboundPacket::Chat { text } => Self::Chat { text },
            ClientboundPacket::EntityMetadata(meta) => Self::EntityMetadata(meta),
        }
    }
}

/// Consumer-side handler for chunk data.
///
/// Called from [`EventReceiver::pump`], i.e. on the consumer's own thread.
pub trait ChunkHandler {
    /// A full chunk arrived.
    fn on_chunk(&mut self, position: ChunkPosition, blocks: &[u8; CHUNK_VOLUME]);

    /// A uniform chunk arrived. Ignored unless overridden.
    fn on_mono_chunk(&mut self, _chunk: MonoTypeChunk) {}
}

impl<F> ChunkHandler for F
where
    F: FnMut(ChunkPosition, &[u8; CHUNK_VOLUME]),
{
    fn on_chunk(&mut self, position: ChunkPosition, blocks: &[u8; CHUNK_VOLUME]) {
        self(position, blocks);
    }
}

/// Constructor for the receive loop → consumer channel.
pub struct EventQueue;

impl EventQueue {
    /// Creates an unbounded FIFO queue.
    #[must_use]
    pub fn unbounded() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (EventSender { sender }, EventReceiver { receiver })
    }
}

/// Producer half, owned by the receive loop.
#[derive(Clone, Debug)]
pub struct EventSender {
    sender: Sender<NetworkEvent>,
}

impl EventSender {
    /// Queues an event. Never blocks.
    ///
    /// Returns false if every receiver is gone.
    pub fn push(&self, event: NetworkEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

/// Consumer half. Cheap to clone; clones share one queue.
#[derive(Clone, Debug)]
pub struct EventReceiver {
    receiver: Receiver<NetworkEvent>,
}

impl EventReceiver {
    /// Takes the next event if one is ready. Never blocks.
    #[must_use]
    pub fn poll(&self) -> Option<NetworkEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Takes every event queued right now.
    ///
    /// Events arriving during the drain are left for the next call, so a
    /// busy network cannot hold the frame hostage.
    #[must_use]
    pub fn drain(&self) -> Vec<NetworkEvent> {
        let pending = self.receiver.len();
        let mut events = Vec::with_capacity(pending);
        for _ in 0..pending {
            match self.poll() {
                Some(event) => events.push(event),
                None => break,
            }
        }
        events
    }

    /// Drains the queue, feeding chunk events to `handler`.
    ///
    /// Every other event is returned in arrival order.
    pub fn pump<H: ChunkHandler + ?Sized>(&self, handler: &mut H) -> Vec<NetworkEvent> {
        let mut rest = Vec::new();
        for event in self.drain() {
            match event {
                NetworkEvent::ChunkReceived(chunk) => {
                    handler.on_chunk(chunk.position, &chunk.blocks);
                }
                NetworkEvent::MonoTypeChunk(mono) => handler.on_mono_chunk(mono),
                other => rest.push(other),
            }
        }
        rest
    }

    /// Number of events waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns true if nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
