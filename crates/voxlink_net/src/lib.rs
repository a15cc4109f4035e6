//! # VOXLINK Net - The Protocol Engine
//!
//! Client-side networking for the voxel client: one TCP connection, a fixed
//! binary packet protocol, and a background receive loop that hands decoded
//! events to the render loop without ever blocking it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   bytes   ┌──────────────┐  packet  ┌──────────────┐
//! │  Connection  │ ────────▶ │  Dispatcher  │ ───────▶ │ Event Queue  │ ──▶ Render loop
//! │  (TCP read)  │           │ (id → codec) │          │ (unbounded)  │     (poll/drain)
//! └──────────────┘           └──────────────┘          └──────────────┘
//!        ▲
//!        │ write_all (serialized)
//! ┌──────────────┐
//! │   Outbound   │ ◀── any thread
//! └──────────────┘
//! ```
//!
//! - **Protocol**: packet ids, payload structs, big-endian codec
//! - **Transport**: TCP socket with exact-length reads and locked writes
//! - **Dispatch**: packet id → payload width → decoded event
//! - **Client**: receive thread, lifecycle, cooperative shutdown
//! - **Outbound**: one send function per client → server packet
//!
//! ## Threading Model
//!
//! The receive thread owns the read half of the socket. Writes may come from
//! any thread and are serialized by a single lock. Decoded packets cross to the
//! consumer through an unbounded FIFO channel; consumer code never runs on the
//! receive thread.
//!
//! ## Example
//!
//! ```rust,ignore
//! use voxlink_net::{ClientConfig, NetworkClient, NetworkEvent};
//!
//! let client = NetworkClient::connect(&ClientConfig::default())?;
//! client.outbound().send_client_metadata(8, "steve")?;
//!
//! // Once per frame:
//! for event in client.events().drain() {
//!     if let NetworkEvent::ChunkReceived(chunk) = event {
//!         upload(chunk.position, &chunk.blocks);
//!     }
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod outbound;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use client::{LoopState, NetworkClient};
pub use config::ClientConfig;
pub use dispatch::Dispatcher;
pub use error::{NetError, NetResult};
pub use events::{ChunkHandler, EventQueue, EventReceiver, EventSender, NetworkEvent};
pub use outbound::Outbound;
pub use protocol::{
    BlockEdit, ChunkData, ChunkPosition, ClientMetadata, ClientboundId, ClientboundPacket,
    EntityPose, EntityState, MonoTypeChunk, PlayerPose, ServerboundId, ServerboundPacket,
};
pub use transport::{Connection, ConnectionState, PacketReader, TransportStats};

/// Edge length of a network chunk in blocks.
///
/// The wire carries 16³ chunks. Mapping them into a larger voxel grid is the
/// consumer's job.
pub const CHUNK_EDGE: usize = 16;

/// Number of block bytes in a chunk payload (16³).
pub const CHUNK_VOLUME: usize = CHUNK_EDGE * CHUNK_EDGE * CHUNK_EDGE;

/// Width of every name field on the wire.
pub const NAME_LEN: usize = 64;

/// Width of the chat message field on the wire.
pub const CHAT_LEN: usize = 4096;
