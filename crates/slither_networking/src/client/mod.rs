//! # Game Client
//!
//! One player's session: connection lifecycle, decoded server state and
//! local input, mediated between a transport and the render/HUD layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      GAME CLIENT                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐       │
//! │  │ Transport    │  │ Input latch  │  │ Frame tick   │       │
//! │  │ events       │  │ (pointer,    │  │ (INPUT send, │       │
//! │  │ (decode)     │  │  boost)      │  │  camera)     │       │
//! │  └──────────────┘  └──────────────┘  └──────────────┘       │
//! │         │                 │                 │               │
//! │         └─────────────────┼─────────────────┘               │
//! │                           │                                 │
//! │               ┌───────────▼───────────┐                     │
//! │               │  WorldView            │──▶ SessionObserver  │
//! │               │  (latest snapshot)    │                     │
//! │               └───────────────────────┘                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every handler runs on the caller's task; the session owns its state and
//! never shares it mutably. [`driver::run`] multiplexes the three event
//! sources on a single task.

pub mod driver;
mod input;

pub use input::{InputEvent, InputState};

use std::sync::Arc;

use crossbeam_channel::Sender;
use tracing::{debug, info, trace, warn};

use crate::config::{ClientConfig, Viewport};
use crate::protocol::{decode_server_frame, KillEvent, PacketSerializer, ServerMessage, WorldSnapshot};
use crate::transport::{Transport, TransportEvent};
use crate::view::{Camera, WorldView};

/// Session state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClientState {
    /// Waiting for the transport to open.
    #[default]
    Connecting,
    /// Frames flow both ways.
    Open,
    /// Terminal. Nothing is sent; inbound frames are ignored.
    Closed,
}

/// Why the session closed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// [`GameClient::close`] was called.
    Local,
    /// The server closed the connection.
    Remote,
    /// The connection failed.
    Error(String),
}

/// Session counters.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionStats {
    /// Frames handed to the transport.
    pub frames_sent: u64,
    /// Bytes handed to the transport.
    pub bytes_sent: u64,
    /// Outbound frames dropped (not open, or refused by the transport).
    pub frames_dropped: u64,
    /// Inbound frames.
    pub frames_received: u64,
    /// Inbound bytes.
    pub bytes_received: u64,
    /// Inbound frames that decoded to nothing.
    pub frames_unrecognized: u64,
    /// UPDATE frames applied.
    pub updates_applied: u64,
}

/// Receives session notifications for the render and HUD layer.
///
/// Every method has an empty default so observers only implement what they
/// draw.
pub trait SessionObserver {
    /// The server assigned the local player id.
    fn on_init(&mut self, _local_id: u32) {}

    /// A new snapshot replaced the previous one.
    fn on_update(&mut self, _snapshot: &Arc<WorldSnapshot>) {}

    /// One kill feed entry.
    fn on_kill_feed(&mut self, _event: &KillEvent) {}

    /// The local player was defeated. Fires once per defeat.
    fn on_defeated(&mut self) {}

    /// One render frame elapsed. `camera` is `None` when nothing is drawable.
    fn on_frame(&mut self, _camera: Option<Camera>, _view: &WorldView) {}

    /// The session closed. Fires once.
    fn on_closed(&mut self, _reason: &CloseReason) {}
}

impl SessionObserver for () {}

/// Session notification as a value, for observers on another thread.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// Local player id assigned.
    Init(u32),
    /// Snapshot replaced.
    Update(Arc<WorldSnapshot>),
    /// Kill feed entry.
    KillFeed(KillEvent),
    /// Local player defeated.
    Defeated,
    /// Session closed.
    Closed(CloseReason),
}

impl SessionObserver for Sender<SessionEvent> {
    fn on_init(&mut self, local_id: u32) {
        let _ = self.send(SessionEvent::Init(local_id));
    }

    fn on_update(&mut self, snapshot: &Arc<WorldSnapshot>) {
        let _ = self.send(SessionEvent::Update(Arc::clone(snapshot)));
    }

    fn on_kill_feed(&mut self, event: &KillEvent) {
        let _ = self.send(SessionEvent::KillFeed(event.clone()));
    }

    fn on_defeated(&mut self) {
        let _ = self.send(SessionEvent::Defeated);
    }

    fn on_closed(&mut self, reason: &CloseReason) {
        let _ = self.send(SessionEvent::Closed(reason.clone()));
    }
}

impl SessionObserver for Vec<SessionEvent> {
    fn on_init(&mut self, local_id: u32) {
        self.push(SessionEvent::Init(local_id));
    }

    fn on_update(&mut self, snapshot: &Arc<WorldSnapshot>) {
        self.push(SessionEvent::Update(Arc::clone(snapshot)));
    }

    fn on_kill_feed(&mut self, event: &KillEvent) {
        self.push(SessionEvent::KillFeed(event.clone()));
    }

    fn on_defeated(&mut self) {
        self.push(SessionEvent::Defeated);
    }

    fn on_closed(&mut self, reason: &CloseReason) {
        self.push(SessionEvent::Closed(reason.clone()));
    }
}

/// Game client session.
pub struct GameClient<T: Transport, O: SessionObserver> {
    config: ClientConfig,
    state: ClientState,
    transport: T,
    observer: O,
    view: WorldView,
    input: InputState,
    /// Reused for every outbound frame.
    serializer: PacketSerializer,
    stats: SessionStats,
}

impl<T: Transport, O: SessionObserver> GameClient<T, O> {
    /// Creates a session in [`ClientState::Connecting`].
    #[must_use]
    pub fn new(config: ClientConfig, transport: T, observer: O) -> Self {
        Self {
            view: WorldView::new(config.camera),
            input: InputState::new(config.viewport),
            config,
            state: ClientState::Connecting,
            transport,
            observer,
            serializer: PacketSerializer::new(),
            stats: SessionStats::default(),
        }
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> ClientState {
        self.state
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the server-assigned player id, once known.
    #[inline]
    #[must_use]
    pub const fn local_id(&self) -> Option<u32> {
        self.view.local_id()
    }

    /// Returns the world view.
    #[inline]
    #[must_use]
    pub const fn view(&self) -> &WorldView {
        &self.view
    }

    /// Returns the input latch.
    #[inline]
    #[must_use]
    pub const fn input(&self) -> &InputState {
        &self.input
    }

    /// Returns the counters.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Returns the transport.
    #[inline]
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the observer.
    #[inline]
    #[must_use]
    pub const fn observer(&self) -> &O {
        &self.observer
    }

    /// Returns the observer mutably.
    #[inline]
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Handles one transport event.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => self.on_opened(),
            TransportEvent::Message(frame) => self.handle_frame(&frame),
            TransportEvent::Error(reason) => {
                warn!(%reason, "connection failed");
                self.shutdown(CloseReason::Error(reason));
            }
            TransportEvent::Closed => self.shutdown(CloseReason::Remote),
        }
    }

    fn on_opened(&mut self) {
        if self.state != ClientState::Connecting {
            debug!(state = ?self.state, "ignoring open");
            return;
        }
        self.state = ClientState::Open;
        info!(server = %self.config.server_url, name = %self.config.player_name, "connected, joining");

        let frame = self.serializer.serialize_join(&self.config.player_name);
        Self::dispatch(&mut self.transport, &mut self.stats, self.state, frame);

        // Boost held while connecting was never sent.
        if self.input.boosting() {
            let frame = self.serializer.serialize_boost(true);
            Self::dispatch(&mut self.transport, &mut self.stats, self.state, frame);
        }
    }

    /// Decodes and applies one inbound frame.
    pub fn handle_frame(&mut self, frame: &[u8]) {
        if self.state == ClientState::Closed {
            return;
        }
        self.stats.frames_received += 1;
        self.stats.bytes_received += frame.len() as u64;

        match decode_server_frame(frame) {
            ServerMessage::Init(id) => {
                info!(player_id = id, "assigned player id");
                self.view.set_local_id(id);
                self.observer.on_init(id);
            }
            ServerMessage::Update(snapshot) => {
                let defeated = self.view.apply_snapshot(snapshot);
                self.stats.updates_applied += 1;
                self.observer.on_update(self.view.snapshot_handle());
                if defeated {
                    info!(player_id = ?self.view.local_id(), "local player defeated");
                    self.observer.on_defeated();
                }
            }
            ServerMessage::KillFeed(event) => {
                debug!(killer = %event.killer, victim = %event.victim, "kill feed");
                self.observer.on_kill_feed(&event);
            }
            ServerMessage::Unrecognized => {
                self.stats.frames_unrecognized += 1;
                debug!(len = frame.len(), tag = ?frame.first(), "unrecognized frame");
            }
        }
    }

    /// Handles one input device event.
    pub fn handle_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerMoved { x, y } => self.input.pointer_moved(x, y),
            InputEvent::Boost(boosting) => self.set_boost(boosting),
            InputEvent::Resized(viewport) => self.resize(viewport),
        }
    }

    /// Latches the boost state, sending BOOST_START or BOOST_END on a change.
    pub fn set_boost(&mut self, boosting: bool) {
        if !self.input.set_boost(boosting) {
            return;
        }
        let frame = self.serializer.serialize_boost(boosting);
        Self::dispatch(&mut self.transport, &mut self.stats, self.state, frame);
    }

    /// Updates the canvas used for steering and culling.
    pub fn resize(&mut self, viewport: Viewport) {
        self.config.viewport = viewport;
        self.input.resize(viewport);
    }

    /// Runs one render frame: sends the latched angle and advances the camera.
    pub fn tick_frame(&mut self) -> Option<Camera> {
        if self.state == ClientState::Open {
            let frame = self.serializer.serialize_input(self.input.angle());
            Self::dispatch(&mut self.transport, &mut self.stats, self.state, frame);
        }
        let camera = self.view.advance_camera();
        self.observer.on_frame(camera, &self.view);
        camera
    }

    /// Closes the session locally.
    pub fn close(&mut self) {
        self.shutdown(CloseReason::Local);
    }

    fn shutdown(&mut self, reason: CloseReason) {
        if self.state == ClientState::Closed {
            return;
        }
        self.state = ClientState::Closed;
        self.transport.close();
        info!(?reason, sent = self.stats.frames_sent, received = self.stats.frames_received, "session closed");
        self.observer.on_closed(&reason);
    }

    /// Hands a frame to the transport, dropping it unless the session is open.
    fn dispatch(transport: &mut T, stats: &mut SessionStats, state: ClientState, frame: &[u8]) {
        if state != ClientState::Open {
            stats.frames_dropped += 1;
            trace!(tag = ?frame.first(), ?state, "dropping frame");
            return;
        }
        match transport.send(frame) {
            Ok(()) => {
                stats.frames_sent += 1;
                stats.bytes_sent += frame.len() as u64;
            }
            Err(error) => {
                stats.frames_dropped += 1;
                trace!(tag = ?frame.first(), %error, "dropping frame");
            }
        }
    }
}
