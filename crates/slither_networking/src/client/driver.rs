//! Single-task session driver.
//!
//! Multiplexes transport events, input events and the frame clock with
//! `tokio::select!`, so every session handler runs on one task and none of
//! them overlap.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use super::{ClientState, GameClient, InputEvent, SessionObserver};
use crate::transport::{Transport, TransportEvent};

/// Drives `client` until it closes or `max_frames` frames have rendered.
/// `Some(0)` returns at once without touching the session.
///
/// A dropped event stream counts as a remote close. A dropped input stream
/// just stops input. Returns the number of rendered frames.
pub async fn run<T: Transport, O: SessionObserver>(
    client: &mut GameClient<T, O>,
    events: &mut UnboundedReceiver<TransportEvent>,
    inputs: &mut UnboundedReceiver<InputEvent>,
    max_frames: Option<u64>,
) -> u64 {
    let period = Duration::from_secs_f64(1.0 / f64::from(client.config().frame_rate.max(1)));
    let mut frames = interval(period);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut inputs_open = true;
    let mut rendered = 0u64;

    while client.state() != ClientState::Closed
        && max_frames.map_or(true, |max| rendered < max)
    {
        tokio::select! {
            biased;

            event = events.recv() => {
                client.handle_transport_event(event.unwrap_or(TransportEvent::Closed));
            }
            input = inputs.recv(), if inputs_open => match input {
                Some(input) => client.handle_input(input),
                None => {
                    debug!("input stream ended");
                    inputs_open = false;
                }
            },
            _ = frames.tick() => {
                client.tick_frame();
                rendered += 1;
            }
        }
    }

    debug!(rendered, state = ?client.state(), "driver stopped");
    rendered
}
