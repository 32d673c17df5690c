//! # Loopback Arena
//!
//! A tiny in-process stand-in for the game server, speaking the real wire
//! protocol over a [`LoopbackPeer`]. Used by the demo binary and by session
//! tests that need a live counterpart. Built only with the `simulation`
//! feature.
//!
//! ## Per step
//!
//! 1. Drain client frames (JOIN, INPUT, BOOST_START, BOOST_END)
//! 2. Steer and move every snake, extend trails, eat food
//! 3. Broadcast one UPDATE frame
//! 4. Drop snakes that went into the UPDATE defeated
//!
//! Collisions between snakes are not simulated; [`LoopbackArena::defeat_player`]
//! stands in for them.

use std::f64::consts::{PI, TAU};

use slither_shared::{BASE_SPEED, BOOST_SPEED, SEGMENT_DISTANCE, TURN_SPEED, WORLD_SIZE};
use slither_shared::Vec2;
use tracing::{debug, info};

use crate::protocol::{
    decode_client_frame, ClientMessage, Color, FoodState, KillEvent, PacketSerializer, SnakeState,
    WorldSnapshot,
};
use crate::transport::LoopbackPeer;

/// Score a new snake spawns with.
const SPAWN_SCORE: f32 = 10.0;
/// Score lost per step while boosting.
const BOOST_COST: f32 = 0.25;
/// Boosting stops paying below this score.
const MIN_BOOST_SCORE: f32 = 1.0;
/// Trail points kept per point of score.
const TRAIL_PER_SCORE: f32 = 0.5;
/// Longest trail sent for any snake.
const MAX_TRAIL: usize = 200;
/// Bot turn per step; bots circle.
const BOT_TURN: f64 = 0.03;
/// First id handed to bots. Players count up from 1.
const BOT_ID_BASE: u32 = 1000;

/// MINSTD generator for reproducible spawns.
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    const MODULUS: u64 = 2_147_483_647;

    const fn new(seed: u64) -> Self {
        // Zero is a fixed point.
        Self {
            state: seed % Self::MODULUS | 1,
        }
    }

    fn next(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(48_271) % Self::MODULUS;
        self.state as u32
    }

    fn next_f64(&mut self) -> f64 {
        f64::from(self.next()) / Self::MODULUS as f64
    }

    fn range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }
}

struct ArenaSnake {
    state: SnakeState,
    target: f64,
    boosting: bool,
    bot: bool,
}

impl ArenaSnake {
    fn spawn(id: u32, name: String, position: Vec2, heading: f64, color: Color, bot: bool) -> Self {
        Self {
            state: SnakeState {
                id,
                position,
                heading,
                score: SPAWN_SCORE,
                color,
                name,
                trail: vec![position],
            },
            target: heading,
            boosting: false,
            bot,
        }
    }

    fn step(&mut self) {
        if self.bot {
            self.target = wrap_angle(self.target + BOT_TURN);
        }

        let turn = wrap_angle(self.target - self.state.heading).clamp(-TURN_SPEED, TURN_SPEED);
        self.state.heading = wrap_angle(self.state.heading + turn);

        let boosting = self.boosting && self.state.score > MIN_BOOST_SCORE;
        let speed = if boosting { BOOST_SPEED } else { BASE_SPEED };
        if boosting {
            self.state.score = (self.state.score - BOOST_COST).max(MIN_BOOST_SCORE);
        }

        let next = self.state.position + Vec2::from_angle(self.state.heading) * speed;
        self.state.position = Vec2::new(next.x.clamp(0.0, WORLD_SIZE), next.y.clamp(0.0, WORLD_SIZE));

        let last = self.state.trail.first().copied().unwrap_or(self.state.position);
        if last.distance(self.state.position) >= SEGMENT_DISTANCE {
            self.state.trail.insert(0, self.state.position);
        }
        let keep = ((self.state.score * TRAIL_PER_SCORE) as usize).clamp(1, MAX_TRAIL);
        self.state.trail.truncate(keep);
    }
}

/// Wraps into `(-PI, PI]`.
fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// In-process game server speaking over a loopback connection.
pub struct LoopbackArena {
    peer: LoopbackPeer,
    serializer: PacketSerializer,
    snakes: Vec<ArenaSnake>,
    foods: Vec<FoodState>,
    player: Option<u32>,
    next_player_id: u32,
    rng: SimpleRng,
    ticks: u64,
}

impl LoopbackArena {
    /// Creates an arena with `bots` circling bots and `food` food items.
    #[must_use]
    pub fn new(peer: LoopbackPeer, bots: usize, food: usize) -> Self {
        let mut rng = SimpleRng::new(42);
        let margin = WORLD_SIZE * 0.1;

        let snakes = (0..bots)
            .map(|i| {
                let position = Vec2::new(
                    rng.range(margin, WORLD_SIZE - margin),
                    rng.range(margin, WORLD_SIZE - margin),
                );
                let color = Color::new(rng.next() as u8, rng.next() as u8, rng.next() as u8);
                ArenaSnake::spawn(
                    BOT_ID_BASE + i as u32,
                    format!("Bot {}", i + 1),
                    position,
                    rng.range(-PI, PI),
                    color,
                    true,
                )
            })
            .collect();

        let foods = (0..food).map(|i| Self::make_food(&mut rng, i)).collect();

        Self {
            peer,
            serializer: PacketSerializer::new(),
            snakes,
            foods,
            player: None,
            next_player_id: 1,
            rng,
            ticks: 0,
        }
    }

    /// Every eighth food is a pickup (kinds 1-4); the rest are plain.
    fn make_food(rng: &mut SimpleRng, index: usize) -> FoodState {
        let kind = if index % 8 == 7 {
            (index / 8 % 4 + 1) as u8
        } else {
            0
        };
        FoodState {
            position: Vec2::new(rng.range(0.0, WORLD_SIZE), rng.range(0.0, WORLD_SIZE)),
            value: rng.range(1.0, 5.0) as f32,
            kind,
        }
    }

    /// Server side of the connection.
    #[inline]
    #[must_use]
    pub const fn peer(&self) -> &LoopbackPeer {
        &self.peer
    }

    /// Id assigned to the joined player, while alive.
    #[inline]
    #[must_use]
    pub const fn player_id(&self) -> Option<u32> {
        self.player
    }

    /// Steps run so far.
    #[inline]
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Current world as it would be broadcast.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            snakes: self.snakes.iter().map(|s| s.state.clone()).collect(),
            foods: self.foods.clone(),
        }
    }

    /// Runs one server tick.
    pub fn step(&mut self) {
        self.ticks += 1;
        self.process_client_frames();

        for snake in &mut self.snakes {
            if !snake.state.is_defeated() {
                snake.step();
            }
        }
        self.eat();

        let snapshot = self.snapshot();
        let frame = self.serializer.serialize_update(&snapshot);
        self.peer.deliver(frame);

        self.snakes.retain(|s| !s.state.is_defeated());
        if self.player.is_some_and(|id| !self.snakes.iter().any(|s| s.state.id == id)) {
            self.player = None;
        }
    }

    /// Drains and applies every frame the client has sent.
    pub fn process_client_frames(&mut self) {
        for frame in self.peer.drain() {
            match decode_client_frame(&frame) {
                ClientMessage::Join { name } => self.join(name),
                ClientMessage::Input { angle } => {
                    if let Some(snake) = self.player_mut() {
                        snake.target = wrap_angle(angle);
                    }
                }
                ClientMessage::BoostStart => {
                    if let Some(snake) = self.player_mut() {
                        snake.boosting = true;
                    }
                }
                ClientMessage::BoostEnd => {
                    if let Some(snake) = self.player_mut() {
                        snake.boosting = false;
                    }
                }
                ClientMessage::Unrecognized => debug!(len = frame.len(), "arena ignored frame"),
            }
        }
    }

    fn join(&mut self, name: String) {
        let id = self.next_player_id;
        self.next_player_id += 1;

        let center = Vec2::new(WORLD_SIZE / 2.0, WORLD_SIZE / 2.0);
        let color = Color::new(rng_byte(&mut self.rng), 200, rng_byte(&mut self.rng));
        self.snakes
            .push(ArenaSnake::spawn(id, name.clone(), center, 0.0, color, false));
        self.player = Some(id);

        info!(player_id = id, %name, "player joined arena");
        let frame = self.serializer.serialize_init(id);
        self.peer.deliver(frame);
    }

    fn player_mut(&mut self) -> Option<&mut ArenaSnake> {
        let id = self.player?;
        self.snakes.iter_mut().find(|s| s.state.id == id)
    }

    fn eat(&mut self) {
        let Self {
            snakes, foods, rng, ..
        } = self;
        for snake in snakes.iter_mut().filter(|s| !s.state.is_defeated()) {
            let reach = snake.state.radius();
            for (index, food) in foods.iter_mut().enumerate() {
                if food.position.distance(snake.state.position) <= reach + food.radius() {
                    snake.state.score += food.value;
                    *food = Self::make_food(rng, index);
                }
            }
        }
    }

    /// Defeats the joined player and announces it in the kill feed.
    ///
    /// The next UPDATE carries the player with score zero; the one after
    /// omits it.
    pub fn defeat_player(&mut self, killer: &str) {
        let Some(snake) = self.player_mut() else {
            return;
        };
        snake.state.score = 0.0;
        let event = KillEvent {
            killer: killer.to_string(),
            victim: snake.state.name.clone(),
        };
        info!(killer = %event.killer, victim = %event.victim, "player defeated");
        let frame = self.serializer.serialize_kill_feed(&event);
        self.peer.deliver(frame);
    }
}

fn rng_byte(rng: &mut SimpleRng) -> u8 {
    (rng.next() >> 8) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode_server_frame, PacketSerializer, ServerMessage};
    use crate::transport::{loopback, ChannelTransport, Transport, TransportEvent};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn arena(bots: usize) -> (LoopbackArena, ChannelTransport, UnboundedReceiver<TransportEvent>) {
        let (transport, peer, events) = loopback(64);
        (LoopbackArena::new(peer, bots, 16), transport, events)
    }

    fn next_message(events: &mut UnboundedReceiver<TransportEvent>) -> ServerMessage {
        match events.try_recv() {
            Ok(TransportEvent::Message(frame)) => decode_server_frame(&frame),
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(3.0 * PI) - PI).abs() < 1e-9);
        assert!((wrap_angle(-PI) - PI).abs() < 1e-9);
        assert!((wrap_angle(0.5) - 0.5).abs() < 1e-12);
        assert!((wrap_angle(-0.5 - TAU) + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_join_answers_init() {
        let (mut arena, mut transport, mut events) = arena(0);
        let mut serializer = PacketSerializer::new();
        transport.send(serializer.serialize_join("Bob")).unwrap();

        arena.process_client_frames();
        assert_eq!(next_message(&mut events), ServerMessage::Init(1));
        assert_eq!(arena.player_id(), Some(1));
    }

    #[test]
    fn test_step_broadcasts_update() {
        let (mut arena, _transport, mut events) = arena(3);
        arena.step();

        let ServerMessage::Update(snapshot) = next_message(&mut events) else {
            panic!("expected update");
        };
        assert_eq!(snapshot.snakes.len(), 3);
        assert_eq!(snapshot.foods.len(), 16);
        assert!(snapshot.foods.iter().any(FoodState::is_special));
    }

    #[test]
    fn test_player_steers_toward_input() {
        let (mut arena, mut transport, _events) = arena(0);
        let mut serializer = PacketSerializer::new();
        transport.send(serializer.serialize_join("Bob")).unwrap();
        transport.send(serializer.serialize_input(PI / 2.0)).unwrap();

        arena.step();
        let heading = arena.snapshot().snakes[0].heading;
        assert!((heading - TURN_SPEED).abs() < 1e-9);

        for _ in 0..50 {
            arena.step();
        }
        let heading = arena.snapshot().snakes[0].heading;
        assert!((heading - PI / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_boost_moves_faster() {
        let (mut arena, mut transport, _events) = arena(0);
        let mut serializer = PacketSerializer::new();
        transport.send(serializer.serialize_join("Bob")).unwrap();
        arena.step();
        let before = arena.snapshot().snakes[0].position;

        transport.send(serializer.serialize_boost(true)).unwrap();
        arena.step();
        let after = arena.snapshot().snakes[0].position;
        assert!((after.distance(before) - BOOST_SPEED).abs() < 1e-9);

        transport.send(serializer.serialize_boost(false)).unwrap();
        arena.step();
        let last = arena.snapshot().snakes[0].position;
        assert!((last.distance(after) - BASE_SPEED).abs() < 1e-9);
    }

    #[test]
    fn test_defeat_then_removal() {
        let (mut arena, mut transport, mut events) = arena(0);
        let mut serializer = PacketSerializer::new();
        transport.send(serializer.serialize_join("Bob")).unwrap();
        arena.step();
        while events.try_recv().is_ok() {}

        arena.defeat_player("Alice");
        assert_eq!(
            next_message(&mut events),
            ServerMessage::KillFeed(KillEvent {
                killer: "Alice".into(),
                victim: "Bob".into(),
            })
        );

        arena.step();
        let ServerMessage::Update(snapshot) = next_message(&mut events) else {
            panic!("expected update");
        };
        assert!(snapshot.snake(1).is_some_and(SnakeState::is_defeated));
        assert_eq!(arena.player_id(), None);

        arena.step();
        let ServerMessage::Update(snapshot) = next_message(&mut events) else {
            panic!("expected update");
        };
        assert!(snapshot.snake(1).is_none());
    }

    #[test]
    fn test_trail_respects_spacing() {
        let (mut arena, _transport, _events) = arena(1);
        for _ in 0..40 {
            arena.step();
        }
        let snake = &arena.snapshot().snakes[0];
        assert!(snake.trail.len() > 1);
        for pair in snake.trail.windows(2) {
            assert!(pair[0].distance(pair[1]) >= SEGMENT_DISTANCE - 1e-9);
        }
    }
}
