//! # WebSocket Transport
//!
//! Binary-message WebSocket connection to the game server.
//!
//! ```text
//! GameClient ──send──▶ [bounded queue] ──▶ socket task ──▶ server
//! driver ◀── TransportEvent ◀─────────────  socket task ◀── server
//! ```
//!
//! The socket task owns the connection. It reports `Opened` once the
//! handshake finishes, one `Message` per binary frame, and exactly one of
//! `Error` or `Closed` at the end. Text, ping and pong messages are not
//! game frames and are skipped. Closing the [`WebSocketTransport`] sends a
//! close frame and ends the task without reporting anything.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{self, unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};

use super::{Transport, TransportEvent, TransportStats};
use crate::error::{TransportError, TransportResult};

/// Outbound half of a WebSocket connection.
pub struct WebSocketTransport {
    /// `None` once closed.
    outbound: Option<mpsc::Sender<Vec<u8>>>,
    /// Statistics.
    stats: TransportStats,
}

impl WebSocketTransport {
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

impl Transport for WebSocketTransport {
    fn send(&mut self, frame: &[u8]) -> TransportResult<()> {
        let result = match &self.outbound {
            None => Err(TransportError::NotOpen),
            Some(outbound) => outbound.try_send(frame.to_vec()).map_err(|e| match e {
                TrySendError::Full(_) => TransportError::Backpressure,
                TrySendError::Closed(_) => TransportError::Disconnected,
            }),
        };
        self.stats.record(frame.len(), result)
    }

    fn close(&mut self) {
        self.outbound = None;
    }
}

/// Connects to `url` on a spawned task.
///
/// Returns the outbound half, the event stream for the session driver, and
/// the socket task. At most `capacity` outbound frames wait for the socket;
/// beyond that, sends are refused.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
#[must_use]
pub fn connect(
    url: &str,
    capacity: usize,
) -> (WebSocketTransport, UnboundedReceiver<TransportEvent>, JoinHandle<()>) {
    let (outbound_tx, outbound_rx) = mpsc::channel(capacity.max(1));
    let (events_tx, events_rx) = unbounded_channel();
    let task = tokio::spawn(run_socket(url.to_string(), outbound_rx, events_tx));
    (
        WebSocketTransport {
            outbound: Some(outbound_tx),
            stats: TransportStats::default(),
        },
        events_rx,
        task,
    )
}

async fn run_socket(
    url: String,
    mut outbound: mpsc::Receiver<Vec<u8>>,
    events: UnboundedSender<TransportEvent>,
) {
    let socket = match connect_async(url.as_str()).await {
        Ok((socket, _response)) => socket,
        Err(e) => {
            warn!(%url, error = %e, "websocket connect failed");
            let _ = events.send(TransportEvent::Error(e.to_string()));
            return;
        }
    };
    info!(%url, "websocket open");
    if events.send(TransportEvent::Opened).is_err() {
        return;
    }

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            biased;

            inbound = stream.next() => match inbound {
                Some(Ok(Message::Binary(frame))) => {
                    if events.send(TransportEvent::Message(frame)).is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "server closed websocket");
                    let _ = events.send(TransportEvent::Closed);
                    break;
                }
                Some(Ok(other)) => trace!(len = other.len(), "skipping non-binary message"),
                Some(Err(e)) => {
                    warn!(error = %e, "websocket read failed");
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    break;
                }
                None => {
                    let _ = events.send(TransportEvent::Closed);
                    break;
                }
            },
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = sink.send(Message::Binary(frame)).await {
                        warn!(error = %e, "websocket write failed");
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                        break;
                    }
                }
                None => {
                    debug!("client closed websocket");
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    async fn listen() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        (listener, url)
    }

    #[tokio::test]
    async fn test_binary_frames_both_ways() {
        let (listener, url) = listen().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut socket = accept_async(stream).await.unwrap();
            let first = socket.next().await.unwrap().unwrap();
            socket.send(Message::Text("motd".into())).await.unwrap();
            socket.send(Message::Binary(vec![10, 7, 0, 0, 0])).await.unwrap();
            socket.close(None).await.unwrap();
            first
        });

        let (mut transport, mut events, task) = connect(&url, 8);
        assert_eq!(events.recv().await, Some(TransportEvent::Opened));

        transport.send(&[1, 3, b'B', b'o', b'b']).unwrap();
        assert_eq!(
            events.recv().await,
            Some(TransportEvent::Message(vec![10, 7, 0, 0, 0]))
        );
        assert_eq!(events.recv().await, Some(TransportEvent::Closed));

        assert_eq!(
            server.await.unwrap(),
            Message::Binary(vec![1, 3, b'B', b'o', b'b'])
        );
        task.await.unwrap();
        assert_eq!(transport.stats().frames_sent, 1);
        assert_eq!(transport.stats().bytes_sent, 5);
    }

    #[tokio::test]
    async fn test_local_close_sends_close_frame() {
        let (listener, url) = listen().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut socket = accept_async(stream).await.unwrap();
            socket.next().await.unwrap().unwrap()
        });

        let (mut transport, mut events, task) = connect(&url, 8);
        assert_eq!(events.recv().await, Some(TransportEvent::Opened));
        transport.close();

        assert!(server.await.unwrap().is_close());
        task.await.unwrap();
        assert!(!transport.is_open());
        assert_eq!(transport.send(&[0; 9]), Err(TransportError::NotOpen));
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn test_refused_connection_reports_error() {
        let (listener, url) = listen().await;
        drop(listener);

        let (mut transport, mut events, task) = connect(&url, 8);
        assert!(matches!(events.recv().await, Some(TransportEvent::Error(_))));
        task.await.unwrap();

        assert_eq!(transport.send(&[0; 9]), Err(TransportError::Disconnected));
        assert_eq!(transport.stats().send_errors, 1);
    }
}
