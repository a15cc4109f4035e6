//! # Outbound Packets
//!
//! One send function per client → server packet.
//!
//! Every call encodes the whole frame (`[id] + payload`) first and hands it to
//! [`Connection::write_all`] in a single call, so frames from different
//! threads never interleave on the wire.

use std::sync::Arc;

use crate::error::NetResult;
use crate::protocol::{frame_serverbound, BlockEdit, ClientMetadata, PlayerPose, ServerboundPacket};
use crate::transport::Connection;

/// Cloneable sender for client → server packets.
#[derive(Clone)]
pub struct Outbound {
    connection: Arc<Connection>,
}

impl Outbound {
    /// Creates a sender over a shared connection.
    #[must_use]
    pub fn new(connection: Arc<Connection>) -> Self {
        Self { connection }
    }

    /// Encodes and sends any serverbound packet.
    pub fn send(&self, packet: &ServerboundPacket) -> NetResult<()> {
        let frame = frame_serverbound(packet)?;
        self.connection.write_all(&frame)
    }

    /// Sends our position and look direction.
    pub fn send_update_entity(&self, pose: PlayerPose) -> NetResult<()> {
        self.send(&ServerboundPacket::UpdateEntity(pose))?;
        tracing::debug!(
            "Sent Update Entity: X={}, Y={}, Z={}, Yaw={}, Pitch={}",
            pose.x, pose.y, pose.z, pose.yaw, pose.pitch
        );
        Ok(())
    }

    /// Sets a single block.
    pub fn send_update_block(&self, edit: BlockEdit) -> NetResult<()> {
        self.send(&ServerboundPacket::UpdateBlock(edit))?;
        tracing::debug!(
            "Sent Update Block: BlockType={}, X={}, Y={}, Z={}",
            edit.block_type, edit.x, edit.y, edit.z
        );
        Ok(())
    }

    /// Sets many blocks in one packet.
    pub fn send_block_bulk_edit(&self, edits: &[BlockEdit]) -> NetResult<()> {
        self.send(&ServerboundPacket::BlockBulkEdit(edits.to_vec()))?;
        tracing::debug!("Sent Block Bulk Edit: BlockCount={}", edits.len());
        Ok(())
    }

    /// Sends a chat line. Text past 4096 bytes is cut off.
    pub fn send_chat(&self, message: &str) -> NetResult<()> {
        self.send(&ServerboundPacket::Chat {
            text: message.to_string(),
        })?;
        tracing::info!("Sent Chat Message: {}", message);
        Ok(())
    }

    /// Announces render distance and player name. Names past 64 bytes are cut off.
    pub fn send_client_metadata(&self, render_distance: u8, name: &str) -> NetResult<()> {
        self.send(&ServerboundPacket::ClientMetadata(ClientMetadata {
            render_distance,
            name: name.to_string(),
        }))?;
        tracing::info!(
            "Sent Client Metadata: RenderDistance={}, Name={}",
            render_distance, name
        );
        Ok(())
    }

    /// Returns true while the connection is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.connection.is_open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::error::NetError;
    use crate::protocol::{decode_serverbound, ServerboundId};
    use std::io::Read;
    use std::net::TcpListener;

    fn pair() -> (Outbound, std::net::TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let conn = Connection::connect(&ClientConfig::new("127.0.0.1", port)).unwrap();
        let (server, _) = listener.accept().unwrap();
        (Outbound::new(Arc::new(conn)), server)
    }

    #[test]
    fn test_update_entity_on_the_wire() {
        let (outbound, mut server) = pair();
        let pose = PlayerPose {
            x: 1.5,
            y: 2.0,
            z: 3.25,
            yaw: 90.0,
            pitch: -10.0,
        };
        outbound.send_update_entity(pose).unwrap();

        let mut frame = [0u8; 21];
        server.read_exact(&mut frame).unwrap();
        assert_eq!(frame[0], ServerboundId::UpdateEntity as u8);
        assert_eq!(
            decode_serverbound(ServerboundId::UpdateEntity, &frame[1..]).unwrap(),
            ServerboundPacket::UpdateEntity(pose)
        );
    }

    #[test]
    fn test_metadata_name_is_padded() {
        let (outbound, mut server) = pair();
        outbound.send_client_metadata(12, "steve").unwrap();

        let mut frame = [0u8; 66];
        server.read_exact(&mut frame).unwrap();
        assert_eq!(frame[0], 0x04);
        assert_eq!(frame[1], 12);
        assert_eq!(&frame[2..7], b"steve");
        assert!(frame[7..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_bulk_edit_on_the_wire() {
        let (outbound, mut server) = pair();
        let edits = [BlockEdit::new(1, 0, 1, 2), BlockEdit::new(2, -5, 64, 9)];
        outbound.send_block_bulk_edit(&edits).unwrap();

        let mut frame = vec![0u8; 1 + 4 + 2 * BlockEdit::SIZE];
        server.read_exact(&mut frame).unwrap();
        assert_eq!(frame[0], 0x02);
        assert_eq!(
            decode_serverbound(ServerboundId::BlockBulkEdit, &frame[1..]).unwrap(),
            ServerboundPacket::BlockBulkEdit(edits.to_vec())
        );
    }

    #[test]
    fn test_send_after_close_fails() {
        let (outbound, _server) = pair();
        outbound.connection.close();
        assert!(!outbound.is_open());
        assert!(matches!(
            outbound.send_chat("anyone?"),
            Err(NetError::ConnectionBroken { .. })
        ));
    }
}
