//! # Transport Layer
//!
//! The session talks to an ordered, reliable, message-framed duplex
//! connection (WebSocket-class) through two halves:
//!
//! - outbound: [`Transport::send`], non-blocking, may refuse
//! - inbound: a stream of [`TransportEvent`]s fed to the session driver
//!
//! ## Design
//!
//! - Sends never block; a full queue refuses the frame
//! - Events arrive in delivery order and are never coalesced
//! - [`websocket::connect`] runs the real connection on a socket task
//! - [`loopback`] wires both halves to in-process channels for tests and
//!   demos

pub mod websocket;

pub use websocket::WebSocketTransport;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::error::{TransportError, TransportResult};

/// Something that happened on the connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake finished; binary frames may flow.
    Opened,
    /// One complete binary frame from the server.
    Message(Vec<u8>),
    /// The connection failed.
    Error(String),
    /// The connection closed.
    Closed,
}

/// Outbound half of a connection.
pub trait Transport {
    /// Queues one frame for delivery without blocking.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the frame was not queued. Callers
    /// treat this as a dropped frame.
    fn send(&mut self, frame: &[u8]) -> TransportResult<()>;

    /// Closes the connection. Later sends fail with [`TransportError::NotOpen`].
    fn close(&mut self);
}

/// Transport statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransportStats {
    /// Frames sent.
    pub frames_sent: u64,
    /// Bytes sent.
    pub bytes_sent: u64,
    /// Send errors.
    pub send_errors: u64,
}

impl TransportStats {
    /// Counts one send attempt of `len` bytes and passes the result through.
    fn record(&mut self, len: usize, result: TransportResult<()>) -> TransportResult<()> {
        match result {
            Ok(()) => {
                self.frames_sent += 1;
                self.bytes_sent += len as u64;
            }
            Err(_) => self.send_errors += 1,
        }
        result
    }
}

/// Outbound half backed by a bounded channel.
///
/// Whatever drains the other end (a socket task, a test, the loopback arena)
/// owns the actual I/O.
pub struct ChannelTransport {
    /// `None` once closed.
    outbound: Option<Sender<Vec<u8>>>,
    /// Statistics.
    stats: TransportStats,
}

impl ChannelTransport {
    /// Wraps an existing sender.
    #[must_use]
    pub fn new(outbound: Sender<Vec<u8>>) -> Self {
        Self {
            outbound: Some(outbound),
            stats: TransportStats::default(),
        }
    }

    /// Returns statistics.
    #[must_use]
    pub const fn stats(&self) -> &TransportStats {
        &self.stats
    }

    /// Returns true until [`Transport::close`] is called.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.outbound.is_some()
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, frame: &[u8]) -> TransportResult<()> {
        let result = match &self.outbound {
            None => Err(TransportError::NotOpen),
            Some(outbound) => outbound.try_send(frame.to_vec()).map_err(|e| match e {
                TrySendError::Full(_) => TransportError::Backpressure,
                TrySendError::Disconnected(_) => TransportError::Disconnected,
            }),
        };
        self.stats.record(frame.len(), result)
    }

    fn close(&mut self) {
        self.outbound = None;
    }
}

/// The far side of a [`loopback`] connection.
pub struct LoopbackPeer {
    outbound_rx: Receiver<Vec<u8>>,
    events_tx: UnboundedSender<TransportEvent>,
}

impl LoopbackPeer {
    fn push(&self, event: TransportEvent) {
        // A dropped receiver means the session is gone; nothing to notify.
        let _ = self.events_tx.send(event);
    }

    /// Completes the handshake.
    pub fn open(&self) {
        self.push(TransportEvent::Opened);
    }

    /// Delivers one frame to the client.
    pub fn deliver(&self, frame: &[u8]) {
        self.push(TransportEvent::Message(frame.to_vec()));
    }

    /// Fails the connection.
    pub fn fail(&self, reason: impl Into<String>) {
        self.push(TransportEvent::Error(reason.into()));
    }

    /// Closes the connection from the server side.
    pub fn close(&self) {
        self.push(TransportEvent::Closed);
    }

    /// Next frame the client sent, if any.
    ///
    /// # Errors
    ///
    /// Returns [`TryRecvError::Disconnected`] once the client closed and the
    /// queue is drained.
    pub fn try_recv(&self) -> Result<Vec<u8>, TryRecvError> {
        self.outbound_rx.try_recv()
    }

    /// Every frame the client has sent since the last drain, in order.
    #[must_use]
    pub fn drain(&self) -> Vec<Vec<u8>> {
        self.outbound_rx.try_iter().collect()
    }

    /// Returns true once the client closed its outbound half and every queued
    /// frame has been drained.
    #[must_use]
    pub fn client_closed(&self) -> bool {
        self.outbound_rx.is_empty()
            && matches!(self.outbound_rx.try_recv(), Err(TryRecvError::Disconnected))
    }
}

/// Creates an in-process connection.
///
/// Returns the client's outbound half, the server-side peer, and the event
/// stream the session driver consumes.
#[must_use]
pub fn loopback(
    capacity: usize,
) -> (ChannelTransport, LoopbackPeer, UnboundedReceiver<TransportEvent>) {
    let (outbound_tx, outbound_rx) = bounded(capacity);
    let (events_tx, events_rx) = unbounded_channel();
    (
        ChannelTransport::new(outbound_tx),
        LoopbackPeer {
            outbound_rx,
            events_tx,
        },
        events_rx,
    )
}
