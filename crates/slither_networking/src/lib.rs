//! # Slither Networking
//!
//! Client-side networking for a multiplayer snake arena: the binary wire
//! protocol, the connection session, and the world view the renderer reads.
//!
//! ## Architecture
//!
//! ```text
//!   transport events ─┐
//!   input events ─────┼──▶ GameClient ──▶ WorldView ──▶ renderer / HUD
//!   frame clock ──────┘        │
//!                              └──▶ Transport::send (JOIN, INPUT, BOOST)
//! ```
//!
//! - **Protocol**: tagged little-endian frames, decoded in one bounds-checked pass
//! - **Session**: `Connecting → Open → Closed`, one INPUT per rendered frame,
//!   boost sent on edges only
//! - **View**: latest snapshot replaced wholesale, score-driven camera zoom,
//!   edge-triggered defeat
//!
//! ## Features
//!
//! - `simulation`: `LoopbackArena`, an in-process server for demos and
//!   integration tests. Off by default.
//!
//! The server is authoritative. The client never predicts or interpolates;
//! it draws the last snapshot it received.
//!
//! ## Example
//!
//! ```rust,ignore
//! use slither_networking::{loopback, ClientConfig, GameClient, TransportEvent};
//!
//! let (transport, peer, mut events) = loopback(64);
//! let mut client = GameClient::new(ClientConfig::default(), transport, ());
//! peer.open();
//! while let Ok(event) = events.try_recv() {
//!     client.handle_transport_event(event);
//! }
//! client.tick_frame();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
#[cfg(feature = "simulation")]
pub mod simulation;
pub mod transport;
pub mod view;

pub use client::{
    driver, ClientState, CloseReason, GameClient, InputEvent, InputState, SessionEvent,
    SessionObserver, SessionStats,
};
pub use config::{CameraConfig, ClientConfig, Viewport};
pub use error::{ConfigError, ConfigResult, TransportError, TransportResult};
pub use protocol::{
    decode_client_frame, decode_server_frame, ClientMessage, Color, FoodState, KillEvent,
    PacketType, PickupIcon, ServerMessage, SnakeState, WorldSnapshot,
};
#[cfg(feature = "simulation")]
pub use simulation::LoopbackArena;
pub use transport::{
    loopback, websocket, ChannelTransport, LoopbackPeer, Transport, TransportEvent,
    WebSocketTransport,
};
pub use view::{target_zoom, Camera, WorldView};
