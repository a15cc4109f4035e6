//! # Wire Codec
//!
//! Pure encode/decode functions for every packet payload.
//!
//! ## Design
//!
//! - Big-endian for every integer and float field
//! - Decode checks the exact payload width before touching a field
//! - Strings are NUL padded to their field and truncated on a char boundary
//! - No I/O and no shared state: bytes in, packet out

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};

use super::packets::{
    BlockEdit, ChunkData, ChunkPosition, ClientMetadata, ClientboundId, ClientboundPacket,
    EntityMetadata, EntityPose, EntityState, MonoTypeChunk, PlayerPose, ServerboundId,
    ServerboundPacket,
};
use crate::error::{NetError, NetResult};
use crate::{CHAT_LEN, CHUNK_VOLUME, NAME_LEN};

/// Payload writer - appends big-endian fields to a growable buffer.
pub struct PayloadWriter {
    buffer: Vec<u8>,
}

impl PayloadWriter {
    /// Creates a writer with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Writes a single byte.
    #[inline]
    pub fn put_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Writes a signed byte.
    #[inline]
    pub fn put_i8(&mut self, value: i8) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes a u32 in big-endian format.
    #[inline]
    pub fn put_u32(&mut self, value: u32) {
        let mut bytes = [0u8; 4];
        BigEndian::write_u32(&mut bytes, value);
        self.buffer.extend_from_slice(&bytes);
    }

    /// Writes an i32 in big-endian format.
    #[inline]
    pub fn put_i32(&mut self, value: i32) {
        let mut bytes = [0u8; 4];
        BigEndian::write_i32(&mut bytes, value);
        self.buffer.extend_from_slice(&bytes);
    }

    /// Writes an f32 in big-endian format.
    #[inline]
    pub fn put_f32(&mut self, value: f32) {
        let mut bytes = [0u8; 4];
        BigEndian::write_f32(&mut bytes, value);
        self.buffer.extend_from_slice(&bytes);
    }

    /// Writes raw bytes.
    #[inline]
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Writes a string into a fixed-width, NUL padded field.
    pub fn put_fixed_str(&mut self, text: &str, width: usize) {
        let bytes = truncate_utf8(text, width);
        self.buffer.extend_from_slice(bytes);
        self.buffer.resize(self.buffer.len() + (width - bytes.len()), 0);
    }

    /// Consumes the writer and returns the bytes.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

/// Payload reader - reads big-endian fields from a payload of known width.
pub struct PayloadReader<'a> {
    packet: &'static str,
    total: usize,
    buffer: &'a [u8],
}

impl<'a> PayloadReader<'a> {
    /// Creates a reader, failing unless `payload` is exactly `expected` bytes.
    pub fn exact(packet: &'static str, expected: usize, payload: &'a [u8]) -> NetResult<Self> {
        if payload.len() != expected {
            return Err(NetError::MalformedPacket {
                packet,
                expected,
                actual: payload.len(),
            });
        }
        Ok(Self {
            packet,
            total: payload.len(),
            buffer: payload,
        })
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len()
    }

    fn short(&self, wanted: usize) -> NetError {
        NetError::MalformedPacket {
            packet: self.packet,
            expected: self.total - self.buffer.len() + wanted,
            actual: self.total,
        }
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> NetResult<u8> {
        self.buffer.read_u8().map_err(|_| self.short(1))
    }

    /// Reads a signed byte.
    pub fn read_i8(&mut self) -> NetResult<i8> {
        self.buffer.read_i8().map_err(|_| self.short(1))
    }

    /// Reads a u32 in big-endian format.
    pub fn read_u32(&mut self) -> NetResult<u32> {
        self.buffer
            .read_u32::<BigEndian>()
            .map_err(|_| self.short(4))
    }

    /// Reads an i32 in big-endian format.
    pub fn read_i32(&mut self) -> NetResult<i32> {
        self.buffer
            .read_i32::<BigEndian>()
            .map_err(|_| self.short(4))
    }

    /// Reads an f32 in big-endian format.
    pub fn read_f32(&mut self) -> NetResult<f32> {
        self.buffer
            .read_f32::<BigEndian>()
            .map_err(|_| self.short(4))
    }

    /// Borrows the next `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> NetResult<&'a [u8]> {
        if self.buffer.len() < len {
            return Err(self.short(len));
        }
        let buffer: &'a [u8] = self.buffer;
        let (head, tail) = buffer.split_at(len);
        self.buffer = tail;
        Ok(head)
    }

    /// Reads a fixed-width, NUL padded string field.
    pub fn read_fixed_str(&mut self, width: usize) -> NetResult<String> {
        self.read_bytes(width).map(decode_fixed_str)
    }
}

/// Cuts `text` to at most `width` bytes without splitting a character.
fn truncate_utf8(text: &str, width: usize) -> &[u8] {
    if text.len() <= width {
        return text.as_bytes();
    }
    let mut end = width;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text.as_bytes()[..end]
}

/// Decodes a NUL padded field, dropping trailing NULs.
///
/// Invalid UTF-8 is replaced rather than rejected.
#[must_use]
pub fn decode_fixed_str(field: &[u8]) -> String {
    let end = field.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

fn read_chunk_position(reader: &mut PayloadReader<'_>) -> NetResult<ChunkPosition> {
    Ok(ChunkPosition::new(
        reader.read_i32()?,
        reader.read_i32()?,
        reader.read_i32()?,
    ))
}

fn put_chunk_position(writer: &mut PayloadWriter, position: ChunkPosition) {
    writer.put_i32(position.x);
    writer.put_i32(position.y);
    writer.put_i32(position.z);
}

fn read_entity_pose(reader: &mut PayloadReader<'_>) -> NetResult<EntityPose> {
    Ok(EntityPose {
        entity_id: reader.read_u32()?,
        x: reader.read_f32()?,
        y: reader.read_f32()?,
        z: reader.read_f32()?,
        yaw: reader.read_f32()?,
        pitch: reader.read_f32()?,
    })
}

fn put_entity_pose(writer: &mut PayloadWriter, pose: &EntityPose) {
    writer.put_u32(pose.entity_id);
    writer.put_f32(pose.x);
    writer.put_f32(pose.y);
    writer.put_f32(pose.z);
    writer.put_f32(pose.yaw);
    writer.put_f32(pose.pitch);
}

fn read_block_edit(reader: &mut PayloadReader<'_>) -> NetResult<BlockEdit> {
    Ok(BlockEdit {
        block_type: reader.read_u8()?,
        x: reader.read_i32()?,
        y: reader.read_i32()?,
        z: reader.read_i32()?,
    })
}

fn put_block_edit(writer: &mut PayloadWriter, edit: &BlockEdit) {
    writer.put_u8(edit.block_type);
    writer.put_i32(edit.x);
    writer.put_i32(edit.y);
    writer.put_i32(edit.z);
}

// ============================================================================
// SERVER → CLIENT
// ============================================================================

/// Decodes a clientbound payload (without its id byte).
pub fn decode_clientbound(id: ClientboundId, payload: &[u8]) -> NetResult<ClientboundPacket> {
    let mut reader = PayloadReader::exact(id.name(), id.payload_len(), payload)?;

    let packet = match id {
        ClientboundId::Identification => ClientboundPacket::Identification {
            entity_id: reader.read_u32()?,
        },
        ClientboundId::AddEntity => {
            let pose = read_entity_pose(&mut reader)?;
            let name = reader.read_fixed_str(NAME_LEN)?;
            ClientboundPacket::AddEntity(EntityState { pose, name })
        }
        ClientboundId::RemoveEntity => ClientboundPacket::RemoveEntity {
            entity_id: reader.read_u32()?,
        },
        ClientboundId::UpdateEntity => {
            ClientboundPacket::UpdateEntity(read_entity_pose(&mut reader)?)
        }
        ClientboundId::ChunkData => {
            let position = read_chunk_position(&mut reader)?;
            let mut blocks = Box::new([0u8; CHUNK_VOLUME]);
            blocks.copy_from_slice(reader.read_bytes(CHUNK_VOLUME)?);
            ClientboundPacket::ChunkData(ChunkData { position, blocks })
        }
        ClientboundId::MonoTypeChunk => ClientboundPacket::MonoTypeChunk(MonoTypeChunk {
            position: read_chunk_position(&mut reader)?,
            block_type: reader.read_i8()?,
        }),
        ClientboundId::Chat => ClientboundPacket::Chat {
            text: reader.read_fixed_str(CHAT_LEN)?,
        },
        ClientboundId::EntityMetadata => ClientboundPacket::EntityMetadata(EntityMetadata {
            entity_id: reader.read_u32()?,
            name: reader.read_fixed_str(NAME_LEN)?,
        }),
    };

    Ok(packet)
}

fn write_clientbound(writer: &mut PayloadWriter, packet: &ClientboundPacket) {
    match packet {
        ClientboundPacket::Identification { entity_id }
        | ClientboundPacket::RemoveEntity { entity_id } => writer.put_u32(*entity_id),
        ClientboundPacket::AddEntity(state) => {
            put_entity_pose(writer, &state.pose);
            writer.put_fixed_str(&state.name, NAME_LEN);
        }
        ClientboundPacket::UpdateEntity(pose) => put_entity_pose(writer, pose),
        ClientboundPacket::ChunkData(chunk) => {
            put_chunk_position(writer, chunk.position);
            writer.put_bytes(&chunk.blocks[..]);
        }
        ClientboundPacket::MonoTypeChunk(mono) => {
            put_chunk_position(writer, mono.position);
            writer.put_i8(mono.block_type);
        }
        ClientboundPacket::Chat { text } => writer.put_fixed_str(text, CHAT_LEN),
        ClientboundPacket::EntityMetadata(meta) => {
            writer.put_u32(meta.entity_id);
            writer.put_fixed_str(&meta.name, NAME_LEN);
        }
    }
}

/// Encodes a clientbound payload (without its id byte).
#[must_use]
pub fn encode_clientbound(packet: &ClientboundPacket) -> Vec<u8> {
    let mut writer = PayloadWriter::with_capacity(packet.id().payload_len());
    write_clientbound(&mut writer, packet);
    writer.into_inner()
}

/// Encodes a clientbound packet with its leading id byte.
#[must_use]
pub fn frame_clientbound(packet: &ClientboundPacket) -> Vec<u8> {
    let mut writer = PayloadWriter::with_capacity(1 + packet.id().payload_len());
    writer.put_u8(packet.id() as u8);
    write_clientbound(&mut writer, packet);
    writer.into_inner()
}

// ============================================================================
// CLIENT → SERVER
// ============================================================================

/// Decodes a serverbound payload (without its id byte).
///
/// A bulk edit must be exactly `4 + 13 * count` bytes.
pub fn decode_serverbound(id: ServerboundId, payload: &[u8]) -> NetResult<ServerboundPacket> {
    let Some(width) = id.payload_len() else {
        return decode_bulk_edit(payload);
    };
    let mut reader = PayloadReader::exact(id.name(), width, payload)?;

    let packet = match id {
        ServerboundId::UpdateEntity => ServerboundPacket::UpdateEntity(PlayerPose {
            x: reader.read_f32()?,
            y: reader.read_f32()?,
            z: reader.read_f32()?,
            yaw: reader.read_f32()?,
            pitch: reader.read_f32()?,
        }),
        ServerboundId::UpdateBlock => ServerboundPacket::UpdateBlock(read_block_edit(&mut reader)?),
        ServerboundId::BlockBulkEdit => return decode_bulk_edit(payload),
        ServerboundId::Chat => ServerboundPacket::Chat {
            text: reader.read_fixed_str(CHAT_LEN)?,
        },
        ServerboundId::ClientMetadata => ServerboundPacket::ClientMetadata(ClientMetadata {
            render_distance: reader.read_u8()?,
            name: reader.read_fixed_str(NAME_LEN)?,
        }),
    };

    Ok(packet)
}

fn decode_bulk_edit(payload: &[u8]) -> NetResult<ServerboundPacket> {
    let packet = ServerboundId::BlockBulkEdit.name();
    if payload.len() < 4 {
        return Err(NetError::MalformedPacket {
            packet,
            expected: 4,
            actual: payload.len(),
        });
    }

    let count = BigEndian::read_u32(&payload[..4]);
    let expected = usize::try_from(count)
        .ok()
        .and_then(|n| n.checked_mul(BlockEdit::SIZE))
        .and_then(|n| n.checked_add(4))
        .unwrap_or(usize::MAX);

    let mut reader = PayloadReader::exact(packet, expected, payload)?;
    reader.read_u32()?;

    let mut edits = Vec::with_capacity(reader.remaining() / BlockEdit::SIZE);
    while reader.remaining() > 0 {
        edits.push(read_block_edit(&mut reader)?);
    }
    Ok(ServerboundPacket::BlockBulkEdit(edits))
}

fn write_serverbound(writer: &mut PayloadWriter, packet: &ServerboundPacket) -> NetResult<()> {
    match packet {
        ServerboundPacket::UpdateEntity(pose) => {
            writer.put_f32(pose.x);
            writer.put_f32(pose.y);
            writer.put_f32(pose.z);
            writer.put_f32(pose.yaw);
            writer.put_f32(pose.pitch);
        }
        ServerboundPacket::UpdateBlock(edit) => put_block_edit(writer, edit),
        ServerboundPacket::BlockBulkEdit(edits) => {
            let count = u32::try_from(edits.len()).map_err(|_| NetError::MalformedPacket {
                packet: ServerboundId::BlockBulkEdit.name(),
                expected: u32::MAX as usize,
                actual: edits.len(),
            })?;
            writer.put_u32(count);
            for edit in edits {
                put_block_edit(writer, edit);
            }
        }
        ServerboundPacket::Chat { text } => writer.put_fixed_str(text, CHAT_LEN),
        ServerboundPacket::ClientMetadata(meta) => {
            writer.put_u8(meta.render_distance);
            writer.put_fixed_str(&meta.name, NAME_LEN);
        }
    }
    Ok(())
}

/// Encodes a serverbound payload (without its id byte).
///
/// Only a bulk edit with more than `u32::MAX` records can fail.
pub fn encode_serverbound(packet: &ServerboundPacket) -> NetResult<Vec<u8>> {
    let mut writer = PayloadWriter::with_capacity(packet.payload_len());
    write_serverbound(&mut writer, packet)?;
    Ok(writer.into_inner())
}

/// Encodes a serverbound packet with its leading id byte.
pub fn frame_serverbound(packet: &ServerboundPacket) -> NetResult<Vec<u8>> {
    let mut writer = PayloadWriter::with_capacity(1 + packet.payload_len());
    writer.put_u8(packet.id() as u8);
    write_serverbound(&mut writer, packet)?;
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_clientbound(packet: &ClientboundPacket) {
        let bytes = encode_clientbound(packet);
        assert_eq!(bytes.len(), packet.id().payload_len());
        assert_eq!(&decode_clientbound(packet.id(), &bytes).unwrap(), packet);
    }

    fn roundtrip_serverbound(packet: &ServerboundPacket) {
        let bytes = encode_serverbound(packet).unwrap();
        assert_eq!(bytes.len(), packet.payload_len());
        assert_eq!(&decode_serverbound(packet.id(), &bytes).unwrap(), packet);
    }

    #[test]
    fn test_clientbound_roundtrip() {
        let mut chunk = ChunkData::filled(ChunkPosition::new(3, -2, 7), 0);
        for (i, block) in chunk.blocks.iter_mut().enumerate() {
            *block = (i % 251) as u8;
        }

        let packets = [
            ClientboundPacket::Identification { entity_id: 42 },
            ClientboundPacket::AddEntity(EntityState {
                pose: EntityPose {
                    entity_id: 9,
                    x: 10.5,
                    y: 64.0,
                    z: -3.25,
                    yaw: 180.0,
                    pitch: 12.5,
                },
                name: "alex".to_string(),
            }),
            ClientboundPacket::RemoveEntity { entity_id: 9 },
            ClientboundPacket::UpdateEntity(EntityPose {
                entity_id: 9,
                x: 11.0,
                y: 64.0,
                z: -3.0,
                yaw: 90.0,
                pitch: 0.0,
            }),
            ClientboundPacket::ChunkData(chunk),
            ClientboundPacket::MonoTypeChunk(MonoTypeChunk {
                position: ChunkPosition::new(0, -1, 0),
                block_type: -3,
            }),
            ClientboundPacket::Chat {
                text: "welcome to the server".to_string(),
            },
            ClientboundPacket::EntityMetadata(EntityMetadata {
                entity_id: 9,
                name: "alex the builder".to_string(),
            }),
        ];

        for packet in &packets {
            roundtrip_clientbound(packet);
        }
    }

    #[test]
    fn test_serverbound_roundtrip() {
        let packets = [
            ServerboundPacket::UpdateEntity(PlayerPose {
                x: 1.5,
                y: 2.0,
                z: 3.25,
                yaw: 90.0,
                pitch: -10.0,
            }),
            ServerboundPacket::UpdateBlock(BlockEdit::new(4, -10, 70, 300)),
            ServerboundPacket::BlockBulkEdit(vec![
                BlockEdit::new(1, 0, 0, 0),
                BlockEdit::new(2, -1, 5, i32::MAX),
            ]),
            ServerboundPacket::BlockBulkEdit(Vec::new()),
            ServerboundPacket::Chat {
                text: "hello".to_string(),
            },
            ServerboundPacket::ClientMetadata(ClientMetadata {
                render_distance: 12,
                name: "steve".to_string(),
            }),
        ];

        for packet in &packets {
            roundtrip_serverbound(packet);
        }
    }

    #[test]
    fn test_big_endian_layout() {
        let bytes = encode_clientbound(&ClientboundPacket::MonoTypeChunk(MonoTypeChunk {
            position: ChunkPosition::new(1, -1, 256),
            block_type: -1,
        }));
        assert_eq!(
            bytes,
            [0, 0, 0, 1, 0xff, 0xff, 0xff, 0xff, 0, 0, 1, 0, 0xff]
        );

        let frame = frame_serverbound(&ServerboundPacket::UpdateBlock(BlockEdit::new(7, 1, 2, 3)))
            .unwrap();
        assert_eq!(frame, [0x01, 7, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3]);
    }

    #[test]
    fn test_player_pose_bytes() {
        let frame = frame_serverbound(&ServerboundPacket::UpdateEntity(PlayerPose {
            x: 1.5,
            y: 0.0,
            z: 0.0,
            yaw: 0.0,
            pitch: 0.0,
        }))
        .unwrap();
        assert_eq!(frame.len(), 21);
        assert_eq!(frame[0], 0x00);
        // 1.5f32 == 0x3FC00000
        assert_eq!(&frame[1..5], &[0x3f, 0xc0, 0x00, 0x00]);
    }

    #[test]
    fn test_wrong_width_is_malformed() {
        let err = decode_clientbound(ClientboundId::ChunkData, &[0u8; 12]).unwrap_err();
        assert!(matches!(
            err,
            NetError::MalformedPacket {
                expected: 4108,
                actual: 12,
                ..
            }
        ));

        let err = decode_clientbound(ClientboundId::Identification, &[0u8; 5]).unwrap_err();
        assert!(matches!(err, NetError::MalformedPacket { expected: 4, .. }));
    }

    #[test]
    fn test_bulk_edit_count_mismatch() {
        // Claims two records, carries one.
        let mut payload = vec![0, 0, 0, 2];
        payload.extend_from_slice(&[0u8; 13]);
        let err = decode_serverbound(ServerboundId::BlockBulkEdit, &payload).unwrap_err();
        assert!(matches!(
            err,
            NetError::MalformedPacket {
                expected: 30,
                actual: 17,
                ..
            }
        ));

        let err = decode_serverbound(ServerboundId::BlockBulkEdit, &[0, 0]).unwrap_err();
        assert!(matches!(err, NetError::MalformedPacket { expected: 4, .. }));
    }

    #[test]
    fn test_fixed_str_padding() {
        let mut writer = PayloadWriter::with_capacity(NAME_LEN);
        writer.put_fixed_str("bob", NAME_LEN);
        let field = writer.into_inner();

        assert_eq!(field.len(), NAME_LEN);
        assert_eq!(&field[..3], b"bob");
        assert!(field[3..].iter().all(|&b| b == 0));
        assert_eq!(decode_fixed_str(&field), "bob");
    }

    #[test]
    fn test_fixed_str_truncates_on_char_boundary() {
        // 63 ASCII bytes followed by a 2-byte char: the char must be dropped whole.
        let name = format!("{}é", "a".repeat(63));
        let mut writer = PayloadWriter::with_capacity(NAME_LEN);
        writer.put_fixed_str(&name, NAME_LEN);
        let field = writer.into_inner();

        assert_eq!(field.len(), NAME_LEN);
        assert_eq!(field[63], 0);
        assert_eq!(decode_fixed_str(&field), "a".repeat(63));
    }

    #[test]
    fn test_long_chat_is_truncated_not_rejected() {
        let text = "x".repeat(CHAT_LEN + 100);
        let bytes = encode_serverbound(&ServerboundPacket::Chat { text }).unwrap();
        assert_eq!(bytes.len(), CHAT_LEN);

        let decoded = decode_serverbound(ServerboundId::Chat, &bytes).unwrap();
        assert_eq!(
            decoded,
            ServerboundPacket::Chat {
                text: "x".repeat(CHAT_LEN)
            }
        );
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let mut field = vec![0u8; NAME_LEN];
        field[0] = b'o';
        field[1] = 0xff;
        field[2] = b'k';
        assert_eq!(decode_fixed_str(&field), "o\u{fffd}k");
    }
}
