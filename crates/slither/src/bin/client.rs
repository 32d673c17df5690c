//! # Slither Client
//!
//! Plays one session against the configured server, or against the
//! in-process arena with `--loopback`, and reports the HUD through the log.
//!
//! ## Usage
//!
//! ```bash
//! slither_client [CONFIG.toml] --frames 3600
//! slither_client --loopback --frames 600 --bots 8
//! RUST_LOG=slither_networking=debug slither_client
//! ```
//!
//! ## Config
//!
//! Every key is optional.
//!
//! ```toml
//! server_url = "wss://example.com"
//! player_name = "Bob"
//! frame_rate = 60
//! outbound_queue = 64
//!
//! [viewport]
//! width = 1280.0
//! height = 720.0
//!
//! [camera]
//! min_zoom = 0.3
//! smoothing = 0.05
//! ```

use std::f64::consts::TAU;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use slither_networking::{
    driver, loopback, websocket, Camera, ClientConfig, CloseReason, GameClient, InputEvent,
    KillEvent, LoopbackArena, SessionEvent, SessionObserver, Transport, TransportEvent,
    WorldSnapshot, WorldView,
};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::{interval, timeout};
use tracing::{error, info, warn};

/// Arena tick period (20 Hz).
const ARENA_TICK: Duration = Duration::from_millis(50);
/// Arena ticks before the player is defeated.
const DEFEAT_AFTER_TICKS: u64 = 160;
/// Arena ticks between the defeat and the server closing.
const CLOSE_AFTER_DEFEAT: u64 = 20;
/// Food items in the arena.
const ARENA_FOOD: usize = 300;
/// Leaderboard rows.
const LEADERBOARD_SIZE: usize = 5;
/// Frame budget for loopback runs without `--frames`.
const LOOPBACK_FRAMES: u64 = 600;
/// How long the socket task gets to send its close frame.
const SOCKET_LINGER: Duration = Duration::from_secs(2);

struct Options {
    config_path: Option<String>,
    frames: Option<u64>,
    bots: usize,
    loopback: bool,
}

enum Command {
    Run(Options),
    Help,
}

fn parse_value<T: FromStr>(flag: &str, value: &str) -> Option<T> {
    let parsed: Option<T> = value.parse().ok();
    if parsed.is_none() {
        warn!(flag, value, "ignoring unparsable value");
    }
    parsed
}

fn parse_args(args: &[String]) -> Command {
    let mut options = Options {
        config_path: None,
        frames: None,
        bots: 8,
        loopback: false,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            flag @ ("--frames" | "-f") => {
                if let Some(value) = args.get(i + 1) {
                    options.frames = parse_value(flag, value).or(options.frames);
                    i += 1;
                }
            }
            flag @ ("--bots" | "-b") => {
                if let Some(value) = args.get(i + 1) {
                    options.bots = parse_value(flag, value).unwrap_or(options.bots);
                    i += 1;
                }
            }
            "--loopback" | "-l" => options.loopback = true,
            "--help" | "-h" => return Command::Help,
            path if !path.starts_with('-') => options.config_path = Some(path.to_string()),
            other => warn!(arg = other, "ignoring unknown argument"),
        }
        i += 1;
    }
    Command::Run(options)
}

fn print_help() {
    println!("Usage: slither_client [CONFIG.toml] [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -f, --frames <N>    Stop after N rendered frames (default: until closed;");
    println!("                      600 with --loopback)");
    println!("  -l, --loopback      Play the in-process arena instead of server_url");
    println!("  -b, --bots <N>      Bots in the loopback arena (default: 8)");
    println!("  -h, --help          Show this help");
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Forwards session events to the HUD thread and logs a summary once per
/// second of frames.
struct Hud {
    events: Sender<SessionEvent>,
    frames: u64,
    frame_rate: u64,
    config: ClientConfig,
}

impl SessionObserver for Hud {
    fn on_init(&mut self, local_id: u32) {
        self.events.on_init(local_id);
    }

    fn on_update(&mut self, snapshot: &Arc<WorldSnapshot>) {
        self.events.on_update(snapshot);
    }

    fn on_kill_feed(&mut self, event: &KillEvent) {
        self.events.on_kill_feed(event);
    }

    fn on_defeated(&mut self) {
        self.events.on_defeated();
    }

    fn on_frame(&mut self, camera: Option<Camera>, view: &WorldView) {
        self.frames += 1;
        if self.frames % self.frame_rate != 0 {
            return;
        }
        let Some(camera) = camera else {
            info!(frame = self.frames, "nothing to draw");
            return;
        };

        let visible = view.visible_foods(camera, self.config.viewport).count();
        let leaders: Vec<String> = view
            .leaderboard(LEADERBOARD_SIZE)
            .iter()
            .map(|snake| format!("{} ({:.0})", snake.name, snake.score))
            .collect();
        info!(
            frame = self.frames,
            x = camera.center.x,
            y = camera.center.y,
            zoom = camera.zoom,
            score = ?view.local_score(),
            visible_food = visible,
            leaderboard = %leaders.join(", "),
            "frame"
        );
    }

    fn on_closed(&mut self, reason: &CloseReason) {
        self.events.on_closed(reason);
    }
}

fn run_hud(events: &Receiver<SessionEvent>) -> u64 {
    let mut updates = 0;
    for event in events {
        match event {
            SessionEvent::Init(id) => info!(player_id = id, "joined"),
            SessionEvent::Update(_) => updates += 1,
            SessionEvent::KillFeed(kill) => info!("{} ate {}", kill.killer, kill.victim),
            SessionEvent::Defeated => warn!("you were eaten"),
            SessionEvent::Closed(reason) => info!(?reason, "disconnected"),
        }
    }
    updates
}

/// Sweeps the pointer around the screen center and pulses boost.
async fn steer(inputs: UnboundedSender<InputEvent>, config: ClientConfig) {
    let mut ticks = interval(Duration::from_millis(100));
    let radius = config.viewport.height / 4.0;
    for step in 0u32.. {
        ticks.tick().await;
        let angle = f64::from(step) * TAU / 64.0;
        let pointer = InputEvent::PointerMoved {
            x: config.viewport.half_width() + angle.cos() * radius,
            y: config.viewport.half_height() + angle.sin() * radius,
        };
        let boost = InputEvent::Boost(step % 40 >= 30);
        if inputs.send(pointer).is_err() || inputs.send(boost).is_err() {
            break;
        }
    }
}

async fn serve(mut arena: LoopbackArena) {
    let mut ticks = interval(ARENA_TICK);
    ticks.tick().await;
    arena.peer().open();

    loop {
        ticks.tick().await;
        arena.step();
        if arena.ticks() == DEFEAT_AFTER_TICKS {
            arena.defeat_player("Bot 1");
        }
        if arena.ticks() == DEFEAT_AFTER_TICKS + CLOSE_AFTER_DEFEAT {
            info!(ticks = arena.ticks(), "arena closing");
            arena.peer().close();
            break;
        }
    }
}

async fn play(config: ClientConfig, options: &Options) -> u64 {
    info!(
        name = %config.player_name,
        frame_rate = config.frame_rate,
        loopback = options.loopback,
        "starting session"
    );

    if options.loopback {
        let (transport, peer, events) = loopback(config.outbound_queue);
        let server = tokio::spawn(serve(LoopbackArena::new(peer, options.bots, ARENA_FOOD)));
        let frames = options.frames.unwrap_or(LOOPBACK_FRAMES);
        let rendered = session(config, transport, events, Some(frames)).await;
        server.abort();
        rendered
    } else {
        info!(server = %config.server_url, "connecting");
        let (transport, events, mut socket) =
            websocket::connect(&config.server_url, config.outbound_queue);
        let rendered = session(config, transport, events, options.frames).await;
        match timeout(SOCKET_LINGER, &mut socket).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("socket task failed: {e}"),
            Err(_) => {
                warn!("socket task still running, aborting");
                socket.abort();
            }
        }
        rendered
    }
}

async fn session<T: Transport>(
    config: ClientConfig,
    transport: T,
    mut events: UnboundedReceiver<TransportEvent>,
    max_frames: Option<u64>,
) -> u64 {
    let (input_tx, mut inputs) = unbounded_channel();
    let (hud_tx, hud_rx) = crossbeam_channel::unbounded();

    let hud_thread = thread::spawn(move || run_hud(&hud_rx));
    let hud = Hud {
        events: hud_tx,
        frames: 0,
        frame_rate: u64::from(config.frame_rate.max(1)),
        config: config.clone(),
    };
    let pointer = tokio::spawn(steer(input_tx, config.clone()));

    let mut client = GameClient::new(config, transport, hud);
    let rendered = driver::run(&mut client, &mut events, &mut inputs, max_frames).await;
    client.close();

    let stats = *client.stats();
    pointer.abort();
    drop(client);

    let updates = hud_thread.join().unwrap_or_else(|_| {
        error!("hud thread panicked");
        0
    });
    info!(
        rendered,
        updates,
        sent = stats.frames_sent,
        dropped = stats.frames_dropped,
        received = stats.frames_received,
        unrecognized = stats.frames_unrecognized,
        "session finished"
    );
    rendered
}

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Command::Run(options) => options,
        Command::Help => {
            print_help();
            return ExitCode::SUCCESS;
        }
    };

    let config = match &options.config_path {
        Some(path) => {
            info!(%path, "loading configuration");
            match ClientConfig::load(path) {
                Ok(config) => config,
                Err(e) => {
                    error!("{e}");
                    return ExitCode::FAILURE;
                }
            }
        }
        None => ClientConfig::default(),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(play(config, &options));
    ExitCode::SUCCESS
}
