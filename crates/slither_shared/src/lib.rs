//! # Slither Shared
//!
//! Common types used by both the client and any server speaking the Slither
//! wire protocol.
//!
//! This crate does no I/O. Rendering, transport and async runtimes belong in
//! other crates.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod math;

pub use constants::{
    BASE_RADIUS, BASE_SPEED, BOOST_SPEED, DEFAULT_SERVER_URL, MAX_NAME_BYTES, SEGMENT_DISTANCE,
    TURN_SPEED, WORLD_SIZE,
};
pub use math::Vec2;
