//! # Packet Dispatch
//!
//! Maps a packet id to its payload width, decodes it and turns it into a
//! [`NetworkEvent`].
//!
//! ## Unknown Ids
//!
//! The wire has no length field, so a packet id we do not know leaves us with
//! no idea where its payload ends. Continuing would reinterpret payload bytes
//! as the next id. The dispatcher therefore fails with
//! [`NetError::UnknownPacketId`] without reading anything further, and the
//! receive loop closes the connection.

use std::io::Read;

use crate::error::NetResult;
use crate::events::NetworkEvent;
use crate::protocol::{decode_clientbound, ClientboundId, ClientboundPacket};
use crate::transport::PacketReader;

/// Decodes clientbound packets and tracks per-connection session state.
#[derive(Debug, Default)]
pub struct Dispatcher {
    /// Our entity id, once identification has arrived.
    entity_id: Option<u32>,
    /// Packets dispatched so far.
    packets: u64,
}

impl Dispatcher {
    /// Creates a dispatcher for a fresh connection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entity_id: None,
            packets: 0,
        }
    }

    /// Returns our entity id, if identified.
    #[inline]
    #[must_use]
    pub const fn entity_id(&self) -> Option<u32> {
        self.entity_id
    }

    /// Returns the number of packets dispatched.
    #[inline]
    #[must_use]
    pub const fn packets(&self) -> u64 {
        self.packets
    }

    /// Reads one id byte and dispatches the packet behind it.
    pub fn read_packet<R: Read>(&mut self, reader: &mut PacketReader<R>) -> NetResult<NetworkEvent> {
        let id = reader.read_u8()?;
        self.handle(id, reader)
    }

    /// Reads and decodes the payload for `id`.
    ///
    /// Fails before reading any payload if `id` is unknown.
    pub fn handle<R: Read>(&mut self, id: u8, reader: &mut PacketReader<R>) -> NetResult<NetworkEvent> {
        let id = ClientboundId::try_from(id).map_err(|e| {
            tracing::error!("Unknown packet ID: {}, stream cannot be resynced", id);
            e
        })?;

        let payload = reader.read_exact(id.payload_len())?;
        let packet = decode_clientbound(id, &payload).map_err(|e| {
            tracing::error!("Failed to decode {} packet: {}", id.name(), e);
            e
        })?;

        reader.mark_packet();
        self.packets += 1;
        Self::log(&packet);

        if let ClientboundPacket::Identification { entity_id } = packet {
            self.entity_id = Some(entity_id);
        }
        Ok(packet.into())
    }

    fn log(packet: &ClientboundPacket) {
        match packet {
            ClientboundPacket::Identification { entity_id } => {
                tracing::info!("Identification received, entity ID: {}", entity_id);
            }
            ClientboundPacket::AddEntity(state) => {
                let p = &state.pose;
                tracing::info!(
                    "Add Entity: ID={}, X={}, Y={}, Z={}, Yaw={}, Pitch={}, Name={}",
                    p.entity_id, p.x, p.y, p.z, p.yaw, p.pitch, state.name
                );
            }
            ClientboundPacket::RemoveEntity { entity_id } => {
                tracing::info!("Remove Entity: ID={}", entity_id);
            }
            ClientboundPacket::UpdateEntity(p) => {
                tracing::debug!(
                    "Update Entity: ID={}, X={:.2}, Y={:.2}, Z={:.2}, Yaw={:.2}, Pitch={:.2}",
                    p.entity_id, p.x, p.y, p.z, p.yaw, p.pitch
                );
            }
            ClientboundPacket::ChunkData(chunk) => {
                let c = chunk.position;
                tracing::info!("Received Chunk: X={}, Y={}, Z={}", c.x, c.y, c.z);
            }
            ClientboundPacket::MonoTypeChunk(mono) => {
                let c = mono.position;
                tracing::info!(
                    "Received Mono Type Chunk: X={}, Y={}, Z={}, BlockType={}",
                    c.x, c.y, c.z, mono.block_type
                );
            }
            ClientboundPacket::Chat { text } => {
                tracing::info!("Chat Message Received: {}", text);
            }
            ClientboundPacket::EntityMetadata(meta) => {
                tracing::info!(
                    "Update Entity Metadata: ID={}, Name={}",
                    meta.entity_id, meta.name
                );
            }
        }
    }
}
