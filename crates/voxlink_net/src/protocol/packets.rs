//! # Packet Definitions
//!
//! Every packet in the protocol, in both directions.
//!
//! ## Fixed-Width Design
//!
//! There is no length prefix on the wire: the id byte alone decides how many
//! payload bytes follow. Every payload type therefore carries a `SIZE`
//! constant, and the id enums know the width of each packet.

use crate::error::NetError;
use crate::{CHAT_LEN, CHUNK_EDGE, CHUNK_VOLUME, NAME_LEN};

/// Ids of server → client packets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ClientboundId {
    /// Server assigns our entity id.
    Identification = 0x00,
    /// A named entity entered view.
    AddEntity = 0x01,
    /// An entity left view.
    RemoveEntity = 0x02,
    /// An entity moved or turned.
    UpdateEntity = 0x03,
    /// Full block data for one chunk.
    ChunkData = 0x04,
    /// A chunk made of a single block type.
    MonoTypeChunk = 0x05,
    /// Chat line.
    Chat = 0x06,
    /// An entity changed its display name.
    EntityMetadata = 0x07,
}

impl ClientboundId {
    /// All clientbound ids in wire order.
    pub const ALL: [Self; 8] = [
        Self::Identification,
        Self::AddEntity,
        Self::RemoveEntity,
        Self::UpdateEntity,
        Self::ChunkData,
        Self::MonoTypeChunk,
        Self::Chat,
        Self::EntityMetadata,
    ];

    /// Payload width in bytes, excluding the id byte.
    #[must_use]
    pub const fn payload_len(self) -> usize {
        match self {
            Self::Identification | Self::RemoveEntity => 4,
            Self::AddEntity => EntityState::SIZE,
            Self::UpdateEntity => EntityPose::SIZE,
            Self::ChunkData => ChunkData::SIZE,
            Self::MonoTypeChunk => MonoTypeChunk::SIZE,
            Self::Chat => CHAT_LEN,
            Self::EntityMetadata => EntityMetadata::SIZE,
        }
    }

    /// Human-readable packet name for logs and errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Identification => "identification",
            Self::AddEntity => "add entity",
            Self::RemoveEntity => "remove entity",
            Self::UpdateEntity => "update entity",
            Self::ChunkData => "chunk data",
            Self::MonoTypeChunk => "mono type chunk",
            Self::Chat => "chat",
            Self::EntityMetadata => "entity metadata",
        }
    }
}

impl TryFrom<u8> for ClientboundId {
    type Error = NetError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|id| *id as u8 == value)
            .ok_or(NetError::UnknownPacketId(value))
    }
}

/// Ids of client → server packets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ServerboundId {
    /// Our own position and look direction.
    UpdateEntity = 0x00,
    /// Set a single block.
    UpdateBlock = 0x01,
    /// Set many blocks at once.
    BlockBulkEdit = 0x02,
    /// Chat line.
    Chat = 0x03,
    /// Render distance and player name.
    ClientMetadata = 0x04,
}

impl ServerboundId {
    /// All serverbound ids in wire order.
    pub const ALL: [Self; 5] = [
        Self::UpdateEntity,
        Self::UpdateBlock,
        Self::BlockBulkEdit,
        Self::Chat,
        Self::ClientMetadata,
    ];

    /// Payload width in bytes, or `None` for the count-prefixed bulk edit.
    #[must_use]
    pub const fn payload_len(self) -> Option<usize> {
        match self {
            Self::UpdateEntity => Some(PlayerPose::SIZE),
            Self::UpdateBlock => Some(BlockEdit::SIZE),
            Self::BlockBulkEdit => None,
            Self::Chat => Some(CHAT_LEN),
            Self::ClientMetadata => Some(ClientMetadata::SIZE),
        }
    }

    /// Human-readable packet name for logs and errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UpdateEntity => "update entity",
            Self::UpdateBlock => "update block",
            Self::BlockBulkEdit => "block bulk edit",
            Self::Chat => "chat",
            Self::ClientMetadata => "client metadata",
        }
    }
}

impl TryFrom<u8> for ServerboundId {
    type Error = NetError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|id| *id as u8 == value)
            .ok_or(NetError::UnknownPacketId(value))
    }
}

/// Position and look direction of a server entity.
///
/// Size: 24 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EntityPose {
    /// Server-assigned entity id.
    pub entity_id: u32,
    /// Position X.
    pub x: f32,
    /// Position Y.
    pub y: f32,
    /// Position Z.
    pub z: f32,
    /// Yaw in degrees.
    pub yaw: f32,
    /// Pitch in degrees.
    pub pitch: f32,
}

impl EntityPose {
    /// Size in bytes.
    pub const SIZE: usize = 24;
}

/// A named entity as announced by the server.
///
/// Size: 88 bytes (pose + 64-byte name)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityState {
    /// Where the entity is.
    pub pose: EntityPose,
    /// Display name.
    pub name: String,
}

impl EntityState {
    /// Size in bytes.
    pub const SIZE: usize = EntityPose::SIZE + NAME_LEN;
}

/// Display name change for an entity.
///
/// Size: 68 bytes
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityMetadata {
    /// Entity whose name changed.
    pub entity_id: u32,
    /// New display name.
    pub name: String,
}

impl EntityMetadata {
    /// Size in bytes.
    pub const SIZE: usize = 4 + NAME_LEN;
}

/// Chunk coordinates, in chunk units (not blocks).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChunkPosition {
    /// Chunk X.
    pub x: i32,
    /// Chunk Y.
    pub y: i32,
    /// Chunk Z.
    pub z: i32,
}

impl ChunkPosition {
    /// Size in bytes.
    pub const SIZE: usize = 12;

    /// Creates a chunk position.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// Dense block data for one 16³ chunk.
///
/// Blocks are one byte each, X fastest, then Y, then Z.
///
/// Size: 4108 bytes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkData {
    /// Which chunk this is.
    pub position: ChunkPosition,
    /// Block types.
    pub blocks: Box<[u8; CHUNK_VOLUME]>,
}

impl ChunkData {
    /// Size in bytes.
    pub const SIZE: usize = ChunkPosition::SIZE + CHUNK_VOLUME;

    /// Creates a chunk where every block has the same type.
    #[must_use]
    pub fn filled(position: ChunkPosition, block: u8) -> Self {
        Self {
            position,
            blocks: Box::new([block; CHUNK_VOLUME]),
        }
    }

    /// Returns the block at local coordinates, or `None` outside the chunk.
    #[must_use]
    pub fn block_at(&self, x: usize, y: usize, z: usize) -> Option<u8> {
        if x >= CHUNK_EDGE || y >= CHUNK_EDGE || z >= CHUNK_EDGE {
            return None;
        }
        Some(self.blocks[x + CHUNK_EDGE * (y + CHUNK_EDGE * z)])
    }
}

/// A chunk made entirely of one block type.
///
/// Size: 13 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MonoTypeChunk {
    /// Which chunk this is.
    pub position: ChunkPosition,
    /// The single block type (signed on the wire).
    pub block_type: i8,
}

impl MonoTypeChunk {
    /// Size in bytes.
    pub const SIZE: usize = ChunkPosition::SIZE + 1;
}

/// Our own position, sent to the server.
///
/// The server knows who we are, so no entity id is carried.
///
/// Size: 20 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlayerPose {
    /// Position X.
    pub x: f32,
    /// Position Y.
    pub y: f32,
    /// Position Z.
    pub z: f32,
    /// Yaw in degrees.
    pub yaw: f32,
    /// Pitch in degrees.
    pub pitch: f32,
}

impl PlayerPose {
    /// Size in bytes.
    pub const SIZE: usize = 20;
}

/// One block change. Also the record type of a bulk edit.
///
/// Size: 13 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockEdit {
    /// New block type.
    pub block_type: u8,
    /// Block X in world coordinates.
    pub x: i32,
    /// Block Y.
    pub y: i32,
    /// Block Z.
    pub z: i32,
}

impl BlockEdit {
    /// Size in bytes.
    pub const SIZE: usize = 13;

    /// Creates a block edit.
    #[inline]
    #[must_use]
    pub const fn new(block_type: u8, x: i32, y: i32, z: i32) -> Self {
        Self { block_type, x, y, z }
    }
}

/// Client settings announced to the server.
///
/// Size: 65 bytes
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientMetadata {
    /// View distance in chunks.
    pub render_distance: u8,
    /// Player name (truncated to 64 bytes on the wire).
    pub name: String,
}

impl ClientMetadata {
    /// Size in bytes.
    pub const SIZE: usize = 1 + NAME_LEN;
}

/// A decoded server → client packet.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientboundPacket {
    /// Our entity id.
    Identification {
        /// Id the server assigned to us.
        entity_id: u32,
    },
    /// A named entity appeared.
    AddEntity(EntityState),
    /// An entity disappeared.
    RemoveEntity {
        /// Entity that left.
        entity_id: u32,
    },
    /// An entity moved.
    UpdateEntity(EntityPose),
    /// Full chunk data.
    ChunkData(ChunkData),
    /// Uniform chunk.
    MonoTypeChunk(MonoTypeChunk),
    /// Chat line.
    Chat {
        /// Message text, NUL padding removed.
        text: String,
    },
    /// Entity renamed.
    EntityMetadata(EntityMetadata),
}

impl ClientboundPacket {
    /// The id byte for this packet.
    #[must_use]
    pub const fn id(&self) -> ClientboundId {
        match self {
            Self::Identification { .. } => ClientboundId::Identification,
            Self::AddEntity(_) => ClientboundId::AddEntity,
            Self::RemoveEntity { .. } => ClientboundId::RemoveEntity,
            Self::UpdateEntity(_) => ClientboundId::UpdateEntity,
            Self::ChunkData(_) => ClientboundId::ChunkData,
            Self::MonoTypeChunk(_) => ClientboundId::MonoTypeChunk,
            Self::Chat { .. } => ClientboundId::Chat,
            Self::EntityMetadata(_) => ClientboundId::EntityMetadata,
        }
    }
}

/// A client → server packet.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerboundPacket {
    /// Our position and look direction.
    UpdateEntity(PlayerPose),
    /// Single block change.
    UpdateBlock(BlockEdit),
    /// Many block changes.
    BlockBulkEdit(Vec<BlockEdit>),
    /// Chat line.
    Chat {
        /// Message text (truncated to 4096 bytes on the wire).
        text: String,
    },
    /// Client settings.
    ClientMetadata(ClientMetadata),
}

impl ServerboundPacket {
    /// The id byte for this packet.
    #[must_use]
    pub const fn id(&self) -> ServerboundId {
        match self {
            Self::UpdateEntity(_) => ServerboundId::UpdateEntity,
            Self::UpdateBlock(_) => ServerboundId::UpdateBlock,
            Self::BlockBulkEdit(_) => ServerboundId::BlockBulkEdit,
            Self::Chat { .. } => ServerboundId::Chat,
            Self::ClientMetadata(_) => ServerboundId::ClientMetadata,
        }
    }

    /// Payload width of this particular packet.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        match self {
            Self::BlockBulkEdit(edits) => 4 + edits.len() * BlockEdit::SIZE,
            other => other.id().payload_len().unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clientbound_widths() {
        assert_eq!(ClientboundId::Identification.payload_len(), 4);
        assert_eq!(ClientboundId::AddEntity.payload_len(), 88);
        assert_eq!(ClientboundId::RemoveEntity.payload_len(), 4);
        assert_eq!(ClientboundId::UpdateEntity.payload_len(), 24);
        assert_eq!(ClientboundId::ChunkData.payload_len(), 4108);
        assert_eq!(ClientboundId::MonoTypeChunk.payload_len(), 13);
        assert_eq!(ClientboundId::Chat.payload_len(), 4096);
        assert_eq!(ClientboundId::EntityMetadata.payload_len(), 68);
    }

    #[test]
    fn test_serverbound_widths() {
        assert_eq!(ServerboundId::UpdateEntity.payload_len(), Some(20));
        assert_eq!(ServerboundId::UpdateBlock.payload_len(), Some(13));
        assert_eq!(ServerboundId::BlockBulkEdit.payload_len(), None);
        assert_eq!(ServerboundId::Chat.payload_len(), Some(4096));
        assert_eq!(ServerboundId::ClientMetadata.payload_len(), Some(65));

        let bulk = ServerboundPacket::BlockBulkEdit(vec![BlockEdit::default(); 3]);
        assert_eq!(bulk.payload_len(), 4 + 3 * 13);
    }

    #[test]
    fn test_id_lookup() {
        for id in ClientboundId::ALL {
            assert_eq!(ClientboundId::try_from(id as u8).unwrap(), id);
        }
        assert!(matches!(
            ClientboundId::try_from(0x08),
            Err(NetError::UnknownPacketId(0x08))
        ));
        assert!(matches!(
            ServerboundId::try_from(0xff),
            Err(NetError::UnknownPacketId(0xff))
        ));
    }

    #[test]
    fn test_block_at() {
        let mut chunk = ChunkData::filled(ChunkPosition::new(0, 0, 0), 0);
        chunk.blocks[1 + 16 * (2 + 16 * 3)] = 9;

        assert_eq!(chunk.block_at(1, 2, 3), Some(9));
        assert_eq!(chunk.block_at(0, 0, 0), Some(0));
        assert_eq!(chunk.block_at(16, 0, 0), None);
    }
}
