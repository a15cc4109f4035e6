//! # Network Protocol
//!
//! Fixed-width binary packets over a single TCP stream.
//!
//! ## Packet Structure
//!
//! ```text
//! ┌──────────┬───────────────────────────────────────────────────┐
//! │ Id (1)   │ Payload (width implied by id, no length prefix)   │
//! └──────────┴───────────────────────────────────────────────────┘
//! ```
//!
//! ## Server → Client
//!
//! | Id   | Packet          | Payload                                        | Bytes |
//! |------|-----------------|------------------------------------------------|-------|
//! | 0x00 | identification  | entity_id:u32                                  | 4     |
//! | 0x01 | add entity      | entity_id:u32, x,y,z,yaw,pitch:f32, name:64B   | 88    |
//! | 0x02 | remove entity   | entity_id:u32                                  | 4     |
//! | 0x03 | update entity   | entity_id:u32, x,y,z,yaw,pitch:f32             | 24    |
//! | 0x04 | chunk data      | x,y,z:i32, blocks:4096B                        | 4108  |
//! | 0x05 | mono type chunk | x,y,z:i32, block_type:i8                       | 13    |
//! | 0x06 | chat            | message:4096B                                  | 4096  |
//! | 0x07 | entity metadata | entity_id:u32, name:64B                        | 68    |
//!
//! ## Client → Server
//!
//! | Id   | Packet          | Payload                                        | Bytes   |
//! |------|-----------------|------------------------------------------------|---------|
//! | 0x00 | update entity   | x,y,z,yaw,pitch:f32                            | 20      |
//! | 0x01 | update block    | block_type:u8, x,y,z:i32                       | 13      |
//! | 0x02 | block bulk edit | count:u32, count × {block_type:u8, x,y,z:i32}  | 4 + 13n |
//! | 0x03 | chat            | message:4096B                                  | 4096    |
//! | 0x04 | client metadata | render_distance:u8, name:64B                   | 65      |
//!
//! All multi-byte fields are big-endian. Text fields are UTF-8, NUL padded.
//! Chunks are 16³ blocks, one byte per block.

mod codec;
mod packets;

pub use codec::{
    decode_clientbound, decode_fixed_str, decode_serverbound, encode_clientbound,
    encode_serverbound, frame_clientbound, frame_serverbound, PayloadReader, PayloadWriter,
};
pub use packets::{
    BlockEdit, ChunkData, ChunkPosition, ClientMetadata, ClientboundId, ClientboundPacket,
    EntityMetadata, EntityPose, EntityState, MonoTypeChunk, PlayerPose, ServerboundId,
    ServerboundPacket,
};
