//! # Packet Definitions
//!
//! Every frame on the wire and every record a frame can carry.
//!
//! ## Frame Layouts
//!
//! All multi-byte numbers are little-endian. Byte 0 is always the tag.
//!
//! ```text
//! client -> server
//!   INPUT        [0][angle:f64]
//!   JOIN         [1][len:u8][name: len bytes]
//!   BOOST_START  [2][1][pad:7]
//!   BOOST_END    [3][0][pad:7]
//!
//! server -> client
//!   INIT         [10][player_id:u32]
//!   UPDATE       [11][snakes:u16][snake]*[foods:u16][food]*
//!   KILL_FEED    [13][len:u8][killer][len:u8][victim]
//!
//! snake  [id:u32][x:f64][y:f64][angle:f64][score:f32][r][g][b]
//!        [name_len:u8][name][trail_len:u16][x:f64,y:f64]*
//! food   [x:f64][y:f64][value:f32][kind:u8]
//! ```

use slither_shared::{Vec2, BASE_RADIUS};

/// Which way a frame travels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Client -> Server.
    ClientToServer,
    /// Server -> Client.
    ServerToClient,
}

/// Frame tags. The two directions use disjoint values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    /// Client -> Server: latched steering angle, sent once per rendered frame.
    Input = 0,
    /// Client -> Server: display name, sent once when the connection opens.
    Join = 1,
    /// Client -> Server: boost pressed.
    BoostStart = 2,
    /// Client -> Server: boost released.
    BoostEnd = 3,
    /// Server -> Client: locally controlled snake id.
    Init = 10,
    /// Server -> Client: full world snapshot.
    Update = 11,
    /// Server -> Client: someone killed someone.
    KillFeed = 13,
}

impl PacketType {
    /// Parses a tag byte. Unknown tags return `None`.
    #[inline]
    #[must_use]
    pub const fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Input),
            1 => Some(Self::Join),
            2 => Some(Self::BoostStart),
            3 => Some(Self::BoostEnd),
            10 => Some(Self::Init),
            11 => Some(Self::Update),
            13 => Some(Self::KillFeed),
            _ => None,
        }
    }

    /// Direction this tag is valid for.
    #[inline]
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Input | Self::Join | Self::BoostStart | Self::BoostEnd => {
                Direction::ClientToServer
            }
            Self::Init | Self::Update | Self::KillFeed => Direction::ServerToClient,
        }
    }
}

/// Size of INPUT / BOOST_START / BOOST_END frames: tag plus 8 payload bytes.
pub const CONTROL_FRAME_SIZE: usize = 9;

/// Smallest INIT frame: tag plus u32 id.
pub const INIT_FRAME_MIN: usize = 5;

/// Smallest UPDATE frame: tag plus the u16 snake count.
pub const UPDATE_FRAME_MIN: usize = 3;

/// Snake body color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Creates a color.
    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// CSS `rgb(r,g,b)` string.
    #[must_use]
    pub fn css(&self) -> String {
        format!("rgb({},{},{})", self.r, self.g, self.b)
    }
}

/// One snake as of the latest snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct SnakeState {
    /// Server-assigned id, unique within the connection.
    pub id: u32,
    /// Head position in world units.
    pub position: Vec2,
    /// Heading in radians. Not normalized.
    pub heading: f64,
    /// Current score (mass).
    pub score: f32,
    /// Body color.
    pub color: Color,
    /// Display name.
    pub name: String,
    /// Recent body positions, in server order.
    pub trail: Vec<Vec2>,
}

impl SnakeState {
    /// Bytes of a snake record with an empty name and empty trail.
    pub const MIN_SIZE: usize = 4 + 8 + 8 + 8 + 4 + 3 + 1 + 2;

    /// Bytes of one trail point.
    pub const TRAIL_POINT_SIZE: usize = 16;

    /// Drawn body radius. Grows with the square root of score.
    #[inline]
    #[must_use]
    pub fn radius(&self) -> f64 {
        BASE_RADIUS + f64::from(self.score.max(0.0)).sqrt() * 0.5
    }

    /// A score at or below zero means the snake is dead.
    #[inline]
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.score <= 0.0
    }
}

/// Icons drawn over special pickups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickupIcon {
    /// Kind 1.
    Speed,
    /// Kind 2.
    Magnet,
    /// Kind 3.
    ScoreX2,
    /// Kind 4.
    ScoreX5,
}

impl PickupIcon {
    /// Icon for a raw pickup kind. Kind 0 and every unknown kind have none.
    #[inline]
    #[must_use]
    pub const fn from_kind(kind: u8) -> Option<Self> {
        match kind {
            1 => Some(Self::Speed),
            2 => Some(Self::Magnet),
            3 => Some(Self::ScoreX2),
            4 => Some(Self::ScoreX5),
            _ => None,
        }
    }
}

/// One food or pickup as of the latest snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FoodState {
    /// Position in world units.
    pub position: Vec2,
    /// Nutritional value, drives the drawn radius.
    pub value: f32,
    /// Raw kind tag. 0 is plain food; the space is open.
    pub kind: u8,
}

impl FoodState {
    /// Bytes of a food record.
    pub const SIZE: usize = 8 + 8 + 4 + 1;

    /// Radius at value 1.
    pub const BASE_RADIUS: f64 = 5.0;

    /// Radius growth per doubling of value.
    pub const RADIUS_PER_DOUBLING: f64 = 2.0;

    /// Drawn radius: `5 + 2·log2(value)`. Non-positive values count as 1.
    #[must_use]
    pub fn radius(&self) -> f64 {
        let value = f64::from(self.value);
        let value = if value.is_finite() && value > 0.0 { value } else { 1.0 };
        Self::BASE_RADIUS + value.log2() * Self::RADIUS_PER_DOUBLING
    }

    /// Hue in degrees for plain food, derived from position so it is stable
    /// across snapshots.
    #[must_use]
    pub fn hue(&self) -> f64 {
        let hue = (self.position.x + self.position.y).rem_euclid(360.0);
        if hue.is_finite() {
            hue
        } else {
            0.0
        }
    }

    /// Pickup icon, if this kind has one.
    #[inline]
    #[must_use]
    pub const fn icon(&self) -> Option<PickupIcon> {
        PickupIcon::from_kind(self.kind)
    }

    /// Whether this is a recognized special pickup. Unknown kinds are plain food.
    #[inline]
    #[must_use]
    pub const fn is_special(&self) -> bool {
        self.icon().is_some()
    }
}

/// Everything one UPDATE frame carried.
///
/// Immutable once decoded; a newer snapshot replaces it wholesale.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorldSnapshot {
    /// Snakes in transmission order.
    pub snakes: Vec<SnakeState>,
    /// Foods in transmission order.
    pub foods: Vec<FoodState>,
}

impl WorldSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            snakes: Vec::new(),
            foods: Vec::new(),
        }
    }

    /// Returns true if there are no snakes and no foods.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snakes.is_empty() && self.foods.is_empty()
    }

    /// Finds a snake by id.
    #[must_use]
    pub fn snake(&self, id: u32) -> Option<&SnakeState> {
        self.snakes.iter().find(|s| s.id == id)
    }
}

/// A kill notification. Shown once, never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KillEvent {
    /// Name of the snake that got the kill.
    pub killer: String,
    /// Name of the snake that died.
    pub victim: String,
}

/// A decoded server -> client frame.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerMessage {
    /// Our snake's id.
    Init(u32),
    /// New world state.
    Update(WorldSnapshot),
    /// Kill notification.
    KillFeed(KillEvent),
    /// Too short, wrong direction or unknown tag.
    Unrecognized,
}

/// A decoded client -> server frame.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientMessage {
    /// Steering angle in radians.
    Input {
        /// Angle relative to the screen center.
        angle: f64,
    },
    /// Join with a display name.
    Join {
        /// Display name.
        name: String,
    },
    /// Boost pressed.
    BoostStart,
    /// Boost released.
    BoostEnd,
    /// Too short, wrong direction or unknown tag.
    Unrecognized,
}
