//! # Packet Serialization
//!
//! Encoding into a reused buffer and single-pass decoding from untrusted bytes.
//!
//! ## Design
//!
//! - One growable buffer per serializer, cleared between frames
//! - Every decode read goes through [`PacketDeserializer::take`], the only
//!   place that compares the cursor against the buffer length
//! - Declared counts are untrusted: pre-allocation is capped by what the
//!   remaining bytes could possibly hold

use super::packets::{
    ClientMessage, Color, Direction, FoodState, KillEvent, PacketType, ServerMessage, SnakeState,
    WorldSnapshot, CONTROL_FRAME_SIZE,
};
use slither_shared::{Vec2, MAX_NAME_BYTES};

/// Longest string a u8 length prefix can describe.
const MAX_PREFIXED_STR: usize = u8::MAX as usize;

/// Returns the longest prefix of `s` that fits in `max_bytes` without splitting
/// a code point.
#[must_use]
pub fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Packet serializer - writes frames into a reused buffer.
///
/// Each `serialize_*` call resets the buffer and returns the finished frame.
#[derive(Debug, Default)]
pub struct PacketSerializer {
    buffer: Vec<u8>,
}

impl PacketSerializer {
    /// Creates a new serializer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(64),
        }
    }

    /// Resets the serializer for reuse.
    #[inline]
    pub fn reset(&mut self) {
        self.buffer.clear();
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

    /// Returns a slice of the written data.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Writes a u16 in little-endian format.
    #[inline]
    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a u32 in little-endian format.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a f32 in little-endian format.
    #[inline]
    pub fn write_f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a f64 in little-endian format.
    #[inline]
    pub fn write_f64(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a point as two f64s.
    #[inline]
    pub fn write_vec2(&mut self, value: Vec2) {
        self.write_f64(value.x);
        self.write_f64(value.y);
    }

    /// Writes a u8-length-prefixed string, truncated to `max_bytes` on a
    /// code-point boundary.
    pub fn write_str_u8(&mut self, value: &str, max_bytes: usize) {
        let value = truncate_utf8(value, max_bytes.min(MAX_PREFIXED_STR));
        self.write_u8(value.len() as u8);
        self.buffer.extend_from_slice(value.as_bytes());
    }

    fn write_control(&mut self, tag: PacketType, payload: [u8; CONTROL_FRAME_SIZE - 1]) -> &[u8] {
        self.reset();
        self.write_u8(tag as u8);
        self.buffer.extend_from_slice(&payload);
        self.as_slice()
    }

    /// Serializes an INPUT frame.
    pub fn serialize_input(&mut self, angle: f64) -> &[u8] {
        self.write_control(PacketType::Input, angle.to_le_bytes())
    }

    /// Serializes BOOST_START (`true`) or BOOST_END (`false`).
    pub fn serialize_boost(&mut self, boosting: bool) -> &[u8] {
        let (tag, flag) = if boosting {
            (PacketType::BoostStart, 1)
        } else {
            (PacketType::BoostEnd, 0)
        };
        let mut payload = [0u8; CONTROL_FRAME_SIZE - 1];
        payload[0] = flag;
        self.write_control(tag, payload)
    }

    /// Serializes a JOIN frame. Names over [`MAX_NAME_BYTES`] are truncated.
    pub fn serialize_join(&mut self, name: &str) -> &[u8] {
        self.reset();
        self.write_u8(PacketType::Join as u8);
        self.write_str_u8(name, MAX_NAME_BYTES);
        self.as_slice()
    }

    /// Serializes an INIT frame.
    pub fn serialize_init(&mut self, player_id: u32) -> &[u8] {
        self.reset();
        self.write_u8(PacketType::Init as u8);
        self.write_u32(player_id);
        self.as_slice()
    }

    /// Serializes a KILL_FEED frame.
    pub fn serialize_kill_feed(&mut self, event: &KillEvent) -> &[u8] {
        self.reset();
        self.write_u8(PacketType::KillFeed as u8);
        self.write_str_u8(&event.killer, MAX_PREFIXED_STR);
        self.write_str_u8(&event.victim, MAX_PREFIXED_STR);
        self.as_slice()
    }

    /// Serializes an UPDATE frame.
    ///
    /// Lists and trails longer than a u16 count can describe are cut to fit.
    pub fn serialize_update(&mut self, snapshot: &WorldSnapshot) -> &[u8] {
        self.reset();
        self.write_u8(PacketType::Update as u8);

        let snake_count = snapshot.snakes.len().min(u16::MAX as usize);
        self.write_u16(snake_count as u16);
        for snake in &snapshot.snakes[..snake_count] {
            self.write_snake(snake);
        }

        let food_count = snapshot.foods.len().min(u16::MAX as usize);
        self.write_u16(food_count as u16);
        for food in &snapshot.foods[..food_count] {
            self.write_food(food);
        }

        self.as_slice()
    }

    fn write_snake(&mut self, snake: &SnakeState) {
        self.write_u32(snake.id);
        self.write_vec2(snake.position);
        self.write_f64(snake.heading);
        self.write_f32(snake.score);
        self.write_u8(snake.color.r);
        self.write_u8(snake.color.g);
        self.write_u8(snake.color.b);
        self.write_str_u8(&snake.name, MAX_PREFIXED_STR);

        let trail_len = snake.trail.len().min(u16::MAX as usize);
        self.write_u16(trail_len as u16);
        for point in &snake.trail[..trail_len] {
            self.write_vec2(*point);
        }
    }

    fn write_food(&mut self, food: &FoodState) {
        self.write_vec2(food.position);
        self.write_f32(food.value);
        self.write_u8(food.kind);
    }
}

/// Packet deserializer - a bounds-checked cursor over one frame.
///
/// Reads return `None` once the buffer cannot satisfy them, and the cursor
/// never moves past the end.
pub struct PacketDeserializer<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> PacketDeserializer<'a> {
    /// Creates a new deserializer from a buffer.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Current cursor offset.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Reads exactly `len` bytes or nothing.
    #[inline]
    pub fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.position.checked_add(len)?;
        let bytes = self.buffer.get(self.position..end)?;
        self.position = end;
        Some(bytes)
    }

    #[inline]
    fn take_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.take(N)?.try_into().ok()
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        self.take_array::<1>().map(|[b]| b)
    }

    /// Reads a u16 in little-endian format.
    #[inline]
    pub fn read_u16(&mut self) -> Option<u16> {
        self.take_array().map(u16::from_le_bytes)
    }

    /// Reads a u32 in little-endian format.
    #[inline]
    pub fn read_u32(&mut self) -> Option<u32> {
        self.take_array().map(u32::from_le_bytes)
    }

    /// Reads a f32 in little-endian format.
    #[inline]
    pub fn read_f32(&mut self) -> Option<f32> {
        self.take_array().map(f32::from_le_bytes)
    }

    /// Reads a f64 in little-endian format.
    #[inline]
    pub fn read_f64(&mut self) -> Option<f64> {
        self.take_array().map(f64::from_le_bytes)
    }

    /// Reads a point as two f64s.
    #[inline]
    pub fn read_vec2(&mut self) -> Option<Vec2> {
        let x = self.read_f64()?;
        let y = self.read_f64()?;
        Some(Vec2::new(x, y))
    }

    /// Reads a u8-length-prefixed string. Invalid UTF-8 is replaced, not rejected.
    pub fn read_str_u8(&mut self) -> Option<String> {
        let len = self.read_u8()?;
        let bytes = self.take(usize::from(len))?;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Capacity to reserve for `declared` records of at least `min_size` bytes.
    #[inline]
    fn bounded_capacity(&self, declared: u16, min_size: usize) -> usize {
        usize::from(declared).min(self.remaining() / min_size)
    }

    /// Decodes a server -> client frame.
    pub fn deserialize_server(&mut self) -> ServerMessage {
        let Some(ty) = self.read_u8().and_then(PacketType::from_u8) else {
            return ServerMessage::Unrecognized;
        };
        if ty.direction() != Direction::ServerToClient {
            return ServerMessage::Unrecognized;
        }

        let message = match ty {
            PacketType::Init => self.read_u32().map(ServerMessage::Init),
            PacketType::Update => self.read_update().map(ServerMessage::Update),
            PacketType::KillFeed => self.read_kill_event().map(ServerMessage::KillFeed),
            PacketType::Input | PacketType::Join | PacketType::BoostStart | PacketType::BoostEnd => {
                None
            }
        };
        message.unwrap_or(ServerMessage::Unrecognized)
    }

    /// Decodes a client -> server frame.
    pub fn deserialize_client(&mut self) -> ClientMessage {
        let Some(ty) = self.read_u8().and_then(PacketType::from_u8) else {
            return ClientMessage::Unrecognized;
        };
        if ty.direction() != Direction::ClientToServer {
            return ClientMessage::Unrecognized;
        }

        let message = match ty {
            PacketType::Input => self.read_f64().map(|angle| ClientMessage::Input { angle }),
            PacketType::Join => self.read_str_u8().map(|name| ClientMessage::Join { name }),
            PacketType::BoostStart => self
                .take(CONTROL_FRAME_SIZE - 1)
                .map(|_| ClientMessage::BoostStart),
            PacketType::BoostEnd => self
                .take(CONTROL_FRAME_SIZE - 1)
                .map(|_| ClientMessage::BoostEnd),
            PacketType::Init | PacketType::Update | PacketType::KillFeed => None,
        };
        message.unwrap_or(ClientMessage::Unrecognized)
    }

    fn read_kill_event(&mut self) -> Option<KillEvent> {
        let killer = self.read_str_u8()?;
        let victim = self.read_str_u8()?;
        Some(KillEvent { killer, victim })
    }

    /// Reads an UPDATE body. `None` only if the snake count itself is missing;
    /// any later overrun keeps the records read so far.
    fn read_update(&mut self) -> Option<WorldSnapshot> {
        let snake_count = self.read_u16()?;
        let mut snapshot = WorldSnapshot {
            snakes: Vec::with_capacity(self.bounded_capacity(snake_count, SnakeState::MIN_SIZE)),
            foods: Vec::new(),
        };

        for _ in 0..snake_count {
            match self.read_snake() {
                Some(snake) => snapshot.snakes.push(snake),
                // The food list sits behind the broken record and is unreachable.
                None => return Some(snapshot),
            }
        }

        let Some(food_count) = self.read_u16() else {
            return Some(snapshot);
        };
        snapshot
            .foods
            .reserve_exact(self.bounded_capacity(food_count, FoodState::SIZE));
        for _ in 0..food_count {
            match self.read_food() {
                Some(food) => snapshot.foods.push(food),
                None => break,
            }
        }

        Some(snapshot)
    }

    fn read_snake(&mut self) -> Option<SnakeState> {
        let id = self.read_u32()?;
        let position = self.read_vec2()?;
        let heading = self.read_f64()?;
        let score = self.read_f32()?;
        let [r, g, b] = self.take_array::<3>()?;
        let name = self.read_str_u8()?;

        let trail_len = self.read_u16()?;
        let mut trail =
            Vec::with_capacity(self.bounded_capacity(trail_len, SnakeState::TRAIL_POINT_SIZE));
        for _ in 0..trail_len {
            trail.push(self.read_vec2()?);
        }

        Some(SnakeState {
            id,
            position,
            heading,
            score,
            color: Color::new(r, g, b),
            name,
            trail,
        })
    }

    fn read_food(&mut self) -> Option<FoodState> {
        let position = self.read_vec2()?;
        let value = self.read_f32()?;
        let kind = self.read_u8()?;
        Some(FoodState {
            position,
            value,
            kind,
        })
    }
}

/// Decodes one inbound frame. Never fails; see [`ServerMessage::Unrecognized`].
#[must_use]
pub fn decode_server_frame(data: &[u8]) -> ServerMessage {
    PacketDeserializer::new(data).deserialize_server()
}

/// Decodes one outbound frame, as a server would.
#[must_use]
pub fn decode_client_frame(data: &[u8]) -> ClientMessage {
    PacketDeserializer::new(data).deserialize_client()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::INIT_FRAME_MIN;

    fn bob() -> SnakeState {
        SnakeState {
            id: 7,
            position: Vec2::new(100.0, 200.0),
            heading: 0.0,
            score: 50.0,
            color: Color::new(10, 20, 30),
            name: "Bob".to_string(),
            trail: Vec::new(),
        }
    }

    /// Builds the snake record by hand so the layout is checked independently
    /// of the serializer.
    fn bob_record() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.extend_from_slice(&100.0f64.to_le_bytes());
        bytes.extend_from_slice(&200.0f64.to_le_bytes());
        bytes.extend_from_slice(&0.0f64.to_le_bytes());
        bytes.extend_from_slice(&50.0f32.to_le_bytes());
        bytes.extend_from_slice(&[10, 20, 30]);
        bytes.push(3);
        bytes.extend_from_slice(b"Bob");
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes
    }

    #[test]
    fn test_update_with_one_snake_and_no_food() {
        let mut frame = vec![11, 0x01, 0x00];
        frame.extend_from_slice(&bob_record());
        frame.extend_from_slice(&[0x00, 0x00]);

        match decode_server_frame(&frame) {
            ServerMessage::Update(snapshot) => {
                assert_eq!(snapshot.snakes, vec![bob()]);
                assert!(snapshot.foods.is_empty());
            }
            other => panic!("Expected Update, got {other:?}"),
        }
    }

    #[test]
    fn test_serializer_matches_hand_built_layout() {
        let snapshot = WorldSnapshot {
            snakes: vec![bob()],
            foods: Vec::new(),
        };
        let mut expected = vec![11, 0x01, 0x00];
        expected.extend_from_slice(&bob_record());
        expected.extend_from_slice(&[0x00, 0x00]);

        let mut serializer = PacketSerializer::new();
        assert_eq!(serializer.serialize_update(&snapshot), expected.as_slice());
    }

    #[test]
    fn test_kill_feed() {
        let frame = [13, 3, b'B', b'o', b'b', 5, b'A', b'l', b'i', b'c', b'e'];
        assert_eq!(
            decode_server_frame(&frame),
            ServerMessage::KillFeed(KillEvent {
                killer: "Bob".to_string(),
                victim: "Alice".to_string(),
            })
        );
    }

    #[test]
    fn test_kill_feed_missing_victim_is_dropped() {
        let frame = [13, 3, b'B', b'o', b'b', 5, b'A', b'l'];
        assert_eq!(decode_server_frame(&frame), ServerMessage::Unrecognized);
        assert_eq!(decode_server_frame(&frame[..5]), ServerMessage::Unrecognized);
    }

    #[test]
    fn test_init() {
        let frame = PacketSerializer::new().serialize_init(42).to_vec();
        assert_eq!(frame, vec![10, 0x2A, 0, 0, 0]);
        assert_eq!(frame.len(), INIT_FRAME_MIN);
        assert_eq!(decode_server_frame(&frame), ServerMessage::Init(42));
        assert_eq!(
            decode_server_frame(&frame[..INIT_FRAME_MIN - 1]),
            ServerMessage::Unrecognized
        );
    }

    #[test]
    fn test_short_and_unknown_frames() {
        assert_eq!(decode_server_frame(&[]), ServerMessage::Unrecognized);
        assert_eq!(decode_server_frame(&[11]), ServerMessage::Unrecognized);
        assert_eq!(decode_server_frame(&[11, 0]), ServerMessage::Unrecognized);
        assert_eq!(decode_server_frame(&[12, 0, 0, 0, 0]), ServerMessage::Unrecognized);
        assert_eq!(decode_server_frame(&[0xFF; 32]), ServerMessage::Unrecognized);
    }

    #[test]
    fn test_cross_direction_tags_are_rejected() {
        let mut serializer = PacketSerializer::new();
        let join = serializer.serialize_join("Alice").to_vec();
        assert_eq!(decode_server_frame(&join), ServerMessage::Unrecognized);

        let init = serializer.serialize_init(3).to_vec();
        assert_eq!(decode_client_frame(&init), ClientMessage::Unrecognized);
    }

    #[test]
    fn test_missing_food_count_keeps_snakes() {
        let mut frame = vec![11, 0x01, 0x00];
        frame.extend_from_slice(&bob_record());
        frame.push(0x05);

        match decode_server_frame(&frame) {
            ServerMessage::Update(snapshot) => {
                assert_eq!(snapshot.snakes.len(), 1);
                assert!(snapshot.foods.is_empty());
            }
            other => panic!("Expected Update, got {other:?}"),
        }
    }

    #[test]
    fn test_overrunning_trail_discards_snake_and_rest() {
        let mut second = bob_record();
        let trail_at = second.len() - 2;
        second[trail_at..].copy_from_slice(&1000u16.to_le_bytes());
        second.extend_from_slice(&[0u8; 40]);

        let mut frame = vec![11, 0x02, 0x00];
        frame.extend_from_slice(&bob_record());
        frame.extend_from_slice(&second);

        match decode_server_frame(&frame) {
            ServerMessage::Update(snapshot) => {
                assert_eq!(snapshot.snakes, vec![bob()]);
                assert!(snapshot.foods.is_empty());
            }
            other => panic!("Expected Update, got {other:?}"),
        }
    }

    #[test]
    fn test_huge_declared_counts_do_not_over_allocate() {
        let frame = [11, 0xFF, 0xFF];
        match decode_server_frame(&frame) {
            ServerMessage::Update(snapshot) => {
                assert!(snapshot.snakes.is_empty());
                assert_eq!(snapshot.snakes.capacity(), 0);
            }
            other => panic!("Expected Update, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_utf8_name_is_replaced() {
        let frame = [13, 2, 0xFF, 0xFE, 1, b'x'];
        match decode_server_frame(&frame) {
            ServerMessage::KillFeed(event) => {
                assert_eq!(event.killer, "\u{FFFD}\u{FFFD}");
                assert_eq!(event.victim, "x");
            }
            other => panic!("Expected KillFeed, got {other:?}"),
        }
    }

    #[test]
    fn test_control_frames_are_fixed_size() {
        let mut serializer = PacketSerializer::new();

        let input = serializer.serialize_input(1.5).to_vec();
        assert_eq!(input.len(), CONTROL_FRAME_SIZE);
        assert_eq!(input[0], 0);
        assert_eq!(&input[1..], &1.5f64.to_le_bytes());

        let start = serializer.serialize_boost(true).to_vec();
        assert_eq!(start, vec![2, 1, 0, 0, 0, 0, 0, 0, 0]);

        let end = serializer.serialize_boost(false).to_vec();
        assert_eq!(end, vec![3, 0, 0, 0, 0, 0, 0, 0, 0]);

        assert_eq!(decode_client_frame(&input), ClientMessage::Input { angle: 1.5 });
        assert_eq!(decode_client_frame(&start), ClientMessage::BoostStart);
        assert_eq!(decode_client_frame(&end), ClientMessage::BoostEnd);
        assert_eq!(decode_client_frame(&end[..4]), ClientMessage::Unrecognized);
    }

    #[test]
    fn test_join_truncates_on_code_point_boundary() {
        let mut serializer = PacketSerializer::new();

        let frame = serializer.serialize_join("Alice").to_vec();
        assert_eq!(frame, b"\x01\x05Alice".to_vec());

        // 19 ASCII bytes then a 2-byte code point: 21 bytes total.
        let name = format!("{}é", "a".repeat(19));
        let frame = serializer.serialize_join(&name).to_vec();
        assert_eq!(frame[1], 19);
        assert_eq!(frame.len(), 2 + 19);

        let frame = serializer.serialize_join("ééééééééééééé").to_vec();
        assert_eq!(frame[1], 20);
        assert_eq!(
            decode_client_frame(&frame),
            ClientMessage::Join {
                name: "éééééééééé".to_string()
            }
        );
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate_utf8("hello", 10), "hello");
        assert_eq!(truncate_utf8("hello", 3), "hel");
        assert_eq!(truncate_utf8("añb", 2), "a");
        assert_eq!(truncate_utf8("🐍🐍", 5), "🐍");
        assert_eq!(truncate_utf8("🐍", 0), "");
    }

    #[test]
    fn test_cursor_never_passes_end() {
        let data = [1, 2, 3];
        let mut cursor = PacketDeserializer::new(&data);
        assert_eq!(cursor.read_u16(), Some(0x0201));
        assert_eq!(cursor.read_u16(), None);
        assert_eq!(cursor.position(), 2);
        assert_eq!(cursor.take(usize::MAX), None);
        assert_eq!(cursor.read_u8(), Some(3));
        assert_eq!(cursor.remaining(), 0);
        assert_eq!(cursor.read_u8(), None);
    }
}
