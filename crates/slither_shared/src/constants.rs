//! # Game Constants
//!
//! Values both sides of the wire agree on. Changing any of these requires
//! a matching server change.

// =============================================================================
// NETWORK CONFIGURATION
// =============================================================================

/// Default game server endpoint.
pub const DEFAULT_SERVER_URL: &str = "wss://snake-server-3bnw.onrender.com";

/// Longest display name (in UTF-8 bytes) a JOIN frame may carry.
pub const MAX_NAME_BYTES: usize = 20;

// =============================================================================
// WORLD CONFIGURATION
// =============================================================================

/// Side length of the square arena, in world units.
///
/// Positions are conventionally within `0..WORLD_SIZE` on both axes; the wire
/// format does not enforce it.
pub const WORLD_SIZE: f64 = 4000.0;

/// Radius of a snake with zero score.
pub const BASE_RADIUS: f64 = 10.0;

/// Maximum heading change per server tick, in radians.
pub const TURN_SPEED: f64 = 0.08;

/// Distance travelled per tick when cruising.
pub const BASE_SPEED: f64 = 4.0;

/// Distance travelled per tick while boosting.
pub const BOOST_SPEED: f64 = 8.0;

/// Spacing between consecutive trail points.
pub const SEGMENT_DISTANCE: f64 = 7.0;
