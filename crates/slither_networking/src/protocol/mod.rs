//! # Network Protocol
//!
//! Tagged little-endian binary frames over a message-framed transport.
//!
//! ## Frame Structure
//!
//! ```text
//! ┌──────────┬───────────────────────────────────────────────┐
//! │ Tag (1)  │ Tag-specific body (fixed or length-prefixed)  │
//! └──────────┴───────────────────────────────────────────────┘
//! ```
//!
//! Client tags are `0..=3`, server tags are `10`, `11` and `13`. A decoder
//! only accepts the tags of the direction it is reading.
//!
//! ## Design Philosophy
//!
//! - One linear pass per frame, no backtracking
//! - Malformed input degrades to a partial or unrecognized result, never an error
//! - Counts on the wire are untrusted

mod packets;
mod serialization;

pub use packets::{
    ClientMessage, Color, Direction, FoodState, KillEvent, PacketType, PickupIcon, ServerMessage,
    SnakeState, WorldSnapshot, CONTROL_FRAME_SIZE, INIT_FRAME_MIN, UPDATE_FRAME_MIN,
};
pub use serialization::{
    decode_client_frame, decode_server_frame, truncate_utf8, PacketDeserializer, PacketSerializer,
};
